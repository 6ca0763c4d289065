//! Trade loop status events and state snapshot

use digitbot_types::{ContractId, Digit, DigitStrategy, InstrumentId, TradeOutcome};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Why a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StopReason {
    Requested,
    StopLoss,
    TakeProfit,
    Authorization,
    PurchaseRejected,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            StopReason::Requested => "stop requested",
            StopReason::StopLoss => "stop-loss reached",
            StopReason::TakeProfit => "take-profit reached",
            StopReason::Authorization => "authorization failed",
            StopReason::PurchaseRejected => "purchase rejected",
        };
        f.write_str(text)
    }
}

/// Events broadcast as the loop runs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum LoopStatus {
    Started,
    /// Auto mode switched to a new instrument/strategy; stake reset to base
    TargetChanged {
        instrument: InstrumentId,
        strategy: DigitStrategy,
    },
    /// Auto mode has nothing to trade
    Idle,
    PurchaseSent {
        contract_id: ContractId,
        instrument: InstrumentId,
        strategy: DigitStrategy,
        stake: Decimal,
        prediction: Option<Digit>,
    },
    Settled {
        contract_id: ContractId,
        outcome: TradeOutcome,
        profit: Decimal,
        cumulative_profit: Decimal,
        next_stake: Decimal,
    },
    /// Settlement that arrived after a stop; never touches the stake ladder
    LateSettlement {
        contract_id: ContractId,
        profit: Decimal,
        cumulative_profit: Decimal,
    },
    Backoff {
        message: String,
        retry_in: Duration,
    },
    PurchaseRejected {
        code: String,
        message: String,
    },
    PurchaseFailed {
        message: String,
    },
    MonitorFailed {
        contract_id: ContractId,
        message: String,
    },
    LimitReached {
        reason: StopReason,
        cumulative_profit: Decimal,
    },
    Stopped {
        reason: StopReason,
    },
}

impl fmt::Display for LoopStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoopStatus::Started => write!(f, "loop started"),
            LoopStatus::TargetChanged {
                instrument,
                strategy,
            } => write!(f, "now trading {} {}", instrument, strategy),
            LoopStatus::Idle => write!(f, "waiting for a recommendation"),
            LoopStatus::PurchaseSent {
                contract_id,
                instrument,
                strategy,
                stake,
                prediction,
            } => match prediction {
                Some(digit) => write!(
                    f,
                    "bought {} {} {} {} for {}",
                    contract_id, instrument, strategy, digit, stake
                ),
                None => write!(
                    f,
                    "bought {} {} {} for {}",
                    contract_id, instrument, strategy, stake
                ),
            },
            LoopStatus::Settled {
                contract_id,
                outcome,
                profit,
                cumulative_profit,
                next_stake,
            } => write!(
                f,
                "{} {} {} (total {}, next stake {})",
                contract_id, outcome, profit, cumulative_profit, next_stake
            ),
            LoopStatus::LateSettlement {
                contract_id,
                profit,
                cumulative_profit,
            } => write!(
                f,
                "{} settled after stop: {} (total {})",
                contract_id, profit, cumulative_profit
            ),
            LoopStatus::Backoff { message, retry_in } => {
                write!(f, "{}; retrying in {:?}", message, retry_in)
            }
            LoopStatus::PurchaseRejected { code, message } => {
                write!(f, "purchase rejected ({}): {}", code, message)
            }
            LoopStatus::PurchaseFailed { message } => write!(f, "purchase failed: {}", message),
            LoopStatus::MonitorFailed {
                contract_id,
                message,
            } => write!(f, "lost track of {}: {}", contract_id, message),
            LoopStatus::LimitReached {
                reason,
                cumulative_profit,
            } => write!(f, "{} at {}", reason, cumulative_profit),
            LoopStatus::Stopped { reason } => write!(f, "loop stopped: {}", reason),
        }
    }
}

/// Snapshot of the loop's book-keeping
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeLoopState {
    pub is_running: bool,
    pub stop_requested: bool,
    /// A purchase request is awaiting the broker's reply
    pub contract_in_flight: bool,
    pub cumulative_profit: Decimal,
    /// 0 disables
    pub stop_loss_limit: Decimal,
    /// 0 disables
    pub take_profit_limit: Decimal,
    /// Bought but not yet settled
    pub open_contracts: usize,
    pub last_result: Option<TradeOutcome>,
    pub purchases: u64,
    pub settlements: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_status_display() {
        let status = LoopStatus::Settled {
            contract_id: ContractId::new(7),
            outcome: TradeOutcome::Loss,
            profit: dec!(-2.00),
            cumulative_profit: dec!(-3.00),
            next_stake: dec!(4.00),
        };
        let text = status.to_string();
        assert!(text.contains("LOSS"));
        assert!(text.contains("-3.00"));

        assert_eq!(
            LoopStatus::Stopped {
                reason: StopReason::StopLoss
            }
            .to_string(),
            "loop stopped: stop-loss reached"
        );
    }

    #[test]
    fn test_status_serializes_for_operators() {
        let status = LoopStatus::LateSettlement {
            contract_id: ContractId::new(12),
            profit: dec!(0.95),
            cumulative_profit: dec!(-1.05),
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["LateSettlement"]["contract_id"], 12);
        assert_eq!(json["LateSettlement"]["profit"], "0.95");
        assert_eq!(serde_json::to_value(StopReason::TakeProfit).unwrap(), "TakeProfit");
    }
}

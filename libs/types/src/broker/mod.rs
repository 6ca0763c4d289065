//! Brokerage interfaces consumed by the signal and execution services
//!
//! The core never speaks the brokerage wire protocol. It sees exactly four
//! operations, split over two traits:
//!
//! ```text
//! TickSource      subscribe_ticks(instrument, history) -> history + incremental ticks
//!                 unsubscribe(subscription)
//! ContractBroker  purchase_contract(request) -> contract id
//!                 monitor_contract(contract) -> status updates until settlement
//! ```
//!
//! Incoming frames on a shared connection are demultiplexed to per-id
//! receivers by [`router::MessageRouter`].

pub mod router;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::common::digit::{Digit, DigitStrategy};
use crate::common::identifiers::{ContractId, InstrumentId, SubscriptionId};

/// A tick as delivered upstream: float quote plus epoch seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawTick {
    pub quote: f64,
    pub epoch: i64,
}

/// Frames on a tick subscription: one bulk history reply, then pushes
#[derive(Debug, Clone, PartialEq)]
pub enum TickMessage {
    History(Vec<RawTick>),
    Tick(RawTick),
}

/// Live tick subscription handed back by [`TickSource::subscribe_ticks`]
#[derive(Debug)]
pub struct TickSubscription {
    pub id: SubscriptionId,
    pub instrument: InstrumentId,
    /// Decimals the venue quotes this instrument at, when it says so
    pub pip_size: Option<u32>,
    pub updates: mpsc::UnboundedReceiver<TickMessage>,
}

/// Buy request for one digit contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseRequest {
    pub instrument: InstrumentId,
    pub strategy: DigitStrategy,
    pub stake: Decimal,
    pub duration_ticks: u32,
    /// Barrier digit for over/under/matches/differs
    pub prediction: Option<Digit>,
}

impl PurchaseRequest {
    pub fn contract_type(&self) -> &'static str {
        self.strategy.contract_type()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseReceipt {
    pub contract_id: ContractId,
    pub buy_price: Decimal,
    pub payout: Decimal,
    pub purchased_at: DateTime<Utc>,
}

/// Contract status push; `profit` is signed and final once `is_settled`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractUpdate {
    pub contract_id: ContractId,
    pub is_settled: bool,
    pub profit: Decimal,
    pub current_spot: Option<Decimal>,
}

pub type ContractStream = mpsc::UnboundedReceiver<ContractUpdate>;

/// Errors surfaced by a brokerage client
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BrokerError {
    #[error("Rate limited: {message}")]
    RateLimited {
        message: String,
        retry_after: Option<Duration>,
    },

    #[error("Connection lost: {0}")]
    Disconnected(String),

    #[error("Authorization failed: {0}")]
    Authorization(String),

    #[error("Purchase rejected ({code}): {message}")]
    PurchaseRejected { code: String, message: String },

    #[error("Unknown contract: {0}")]
    UnknownContract(ContractId),

    #[error("Unknown subscription: {0}")]
    UnknownSubscription(SubscriptionId),

    #[error("Broker error: {0}")]
    Other(String),
}

impl BrokerError {
    /// Rate limits and dropped connections clear up on their own
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            BrokerError::RateLimited { .. } | BrokerError::Disconnected(_)
        )
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            BrokerError::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

/// Tick-quote feed
#[async_trait]
pub trait TickSource: Send + Sync {
    /// Subscribe to an instrument; the first frame is a `History` of up to
    /// `history_count` ticks
    async fn subscribe_ticks(
        &self,
        instrument: &InstrumentId,
        history_count: usize,
    ) -> Result<TickSubscription, BrokerError>;

    async fn unsubscribe(&self, subscription: SubscriptionId) -> Result<(), BrokerError>;
}

/// Buy / monitor-contract command interface
#[async_trait]
pub trait ContractBroker: Send + Sync {
    async fn purchase_contract(
        &self,
        request: &PurchaseRequest,
    ) -> Result<PurchaseReceipt, BrokerError>;

    /// Stream of status updates for one contract, ending after settlement
    async fn monitor_contract(&self, contract: ContractId) -> Result<ContractStream, BrokerError>;

    /// Release the monitor subscription for a contract
    async fn forget(&self, contract: ContractId) -> Result<(), BrokerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        let limited = BrokerError::RateLimited {
            message: "too many requests".to_string(),
            retry_after: Some(Duration::from_secs(5)),
        };
        assert!(limited.is_transient());
        assert_eq!(limited.retry_after(), Some(Duration::from_secs(5)));
        assert!(BrokerError::Disconnected("socket closed".into()).is_transient());
        assert!(!BrokerError::Authorization("invalid token".into()).is_transient());
        assert!(!BrokerError::PurchaseRejected {
            code: "StakeTooLow".into(),
            message: "stake below minimum".into(),
        }
        .is_transient());
    }
}

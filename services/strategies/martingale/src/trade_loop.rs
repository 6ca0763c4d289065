//! # Trade Loop Controller
//!
//! Cooperative purchase loop driving the martingale stake ladder.
//!
//! ## Run Lifecycle
//!
//! ```text
//! start(selection) ──► [stop?] ──► next stake/prediction ──► purchase ──► spawn monitor
//!                        ▲                                                    │
//!                        └──────────── cooldown (wakes on stop) ◄─────────────┘
//!
//! monitor(contract) ──► settled ──► on_win/on_loss ──► cumulative profit ──► limits ──► stop?
//! ```
//!
//! Only one purchase request is outstanding at a time. Contracts are not
//! awaited by default: each gets its own monitor task and the loop moves on
//! after the cooldown. Every run owns a fresh [`CancellationToken`]; a
//! monitor whose run was cancelled never touches the stake ladder, so a late
//! settlement can neither start a purchase nor skew the next stake. Each
//! contract also remembers the ladder epoch it was bought in; once a target
//! change resets the ladder, older contracts still count towards profit and
//! limits but no longer move the stake.

use digit_signals::TopRecommendation;
use digitbot_config::{LoopConfig, RejectionPolicy, TradingConfig};
use digitbot_strategy_shared::{
    log_backoff, log_error, log_execution, log_metrics, log_profit, log_stop, log_warning,
    LoopMetrics, LoopMetricsCollector,
};
use digitbot_types::{
    BrokerError, ContractBroker, ContractId, Digit, DigitStrategy, InstrumentId, PurchaseRequest,
    TradeOutcome,
};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::error::{Result, StrategyError};
use crate::stake::{StakeController, StakeState};
use crate::status::{LoopStatus, StopReason, TradeLoopState};

/// What fixed mode buys every iteration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeTemplate {
    pub instrument: InstrumentId,
    pub strategy: DigitStrategy,
    pub duration_ticks: u32,
}

impl TradeTemplate {
    pub fn from_config(config: &TradingConfig) -> Self {
        Self {
            instrument: config.instrument.clone(),
            strategy: config.strategy,
            duration_ticks: config.duration_ticks,
        }
    }
}

/// How each iteration decides what to buy
pub enum TradeSelection {
    Fixed(TradeTemplate),
    /// Follow the published top recommendation
    Auto {
        recommendations: watch::Receiver<TopRecommendation>,
        duration_ticks: u32,
    },
}

/// Instrument, strategy and barrier for one purchase
#[derive(Debug, Clone, PartialEq, Eq)]
struct Target {
    instrument: InstrumentId,
    strategy: DigitStrategy,
    barrier: Option<Digit>,
    duration_ticks: u32,
}

impl TradeSelection {
    fn current(&self) -> Option<Target> {
        match self {
            TradeSelection::Fixed(template) => Some(Target {
                instrument: template.instrument.clone(),
                strategy: template.strategy,
                barrier: None,
                duration_ticks: template.duration_ticks,
            }),
            TradeSelection::Auto {
                recommendations,
                duration_ticks,
            } => recommendations.borrow().as_ref().map(|rec| Target {
                instrument: rec.instrument.clone(),
                strategy: rec.strategy,
                barrier: rec.prediction(),
                duration_ticks: *duration_ticks,
            }),
        }
    }
}

/// Mutable book-keeping shared by the driver and monitors
#[derive(Debug, Default)]
struct Book {
    is_running: bool,
    stop_requested: bool,
    contract_in_flight: bool,
    cumulative_profit: Decimal,
    stop_loss_limit: Decimal,
    take_profit_limit: Decimal,
    /// Open contracts and the ladder epoch each was bought in
    open_contracts: HashMap<ContractId, u64>,
    last_result: Option<TradeOutcome>,
    purchases: u64,
    settlements: u64,
    stop_reason: Option<StopReason>,
    token: Option<CancellationToken>,
}

struct Shared {
    broker: Arc<dyn ContractBroker>,
    config: LoopConfig,
    stake: Mutex<StakeController>,
    book: Mutex<Book>,
    status_tx: broadcast::Sender<LoopStatus>,
    metrics: LoopMetricsCollector,
}

impl Shared {
    fn emit(&self, status: LoopStatus) {
        trace!("Status: {}", status);
        // No subscribers is fine
        let _ = self.status_tx.send(status);
    }

    /// Cancel the active run; the first reason recorded wins
    fn request_stop(&self, reason: StopReason) {
        let token = {
            let mut book = self.book.lock();
            book.stop_requested = true;
            if book.stop_reason.is_none() {
                book.stop_reason = Some(reason);
            }
            book.token.clone()
        };
        if let Some(token) = token {
            token.cancel();
        }
    }

    fn set_in_flight(&self, in_flight: bool) {
        self.book.lock().contract_in_flight = in_flight;
    }

    /// Drop a contract from the open set; false if already settled
    fn release(&self, contract_id: ContractId) -> bool {
        self.book.lock().open_contracts.remove(&contract_id).is_some()
    }

    fn apply_settlement(&self, contract_id: ContractId, profit: Decimal, run: &CancellationToken) {
        let outcome = TradeOutcome::from_profit(profit);

        // `stop_requested` only changes under this lock: a settlement lands
        // wholly before or wholly after a stop
        let (cumulative, next, limit_hit) = {
            let mut book = self.book.lock();
            let Some(epoch) = book.open_contracts.remove(&contract_id) else {
                debug!("{} already settled, ignoring duplicate", contract_id);
                return;
            };
            book.cumulative_profit += profit;
            book.settlements += 1;
            book.last_result = Some(outcome);
            let cumulative = book.cumulative_profit;

            if run.is_cancelled() || book.stop_requested {
                (cumulative, None, None)
            } else {
                let next = {
                    let mut stake = self.stake.lock();
                    if stake.epoch() == epoch {
                        stake.record(outcome)
                    } else {
                        // Bought for a previous target; the ladder was reset since
                        debug!("{} predates the current ladder, stake unchanged", contract_id);
                        stake.snapshot()
                    }
                };
                let limit_hit = if book.stop_loss_limit > Decimal::ZERO
                    && cumulative <= -book.stop_loss_limit
                {
                    Some(StopReason::StopLoss)
                } else if book.take_profit_limit > Decimal::ZERO
                    && cumulative >= book.take_profit_limit
                {
                    Some(StopReason::TakeProfit)
                } else {
                    None
                };
                (cumulative, Some(next), limit_hit)
            }
        };
        self.metrics.record_settlement(outcome == TradeOutcome::Win);

        let Some(next) = next else {
            log_profit!(
                "{} settled after stop: {} (total {})",
                contract_id,
                profit,
                cumulative
            );
            self.emit(LoopStatus::LateSettlement {
                contract_id,
                profit,
                cumulative_profit: cumulative,
            });
            return;
        };

        log_profit!(
            "{} {} {} (total {}, next stake {})",
            contract_id,
            outcome,
            profit,
            cumulative,
            next.current_stake
        );
        self.emit(LoopStatus::Settled {
            contract_id,
            outcome,
            profit,
            cumulative_profit: cumulative,
            next_stake: next.current_stake,
        });

        if let Some(reason) = limit_hit {
            log_stop!("{} at cumulative profit {}", reason, cumulative);
            self.emit(LoopStatus::LimitReached {
                reason,
                cumulative_profit: cumulative,
            });
            self.request_stop(reason);
        }
    }
}

/// Cloneable stop entry point; safe to call from anywhere, any number of times
#[derive(Clone)]
pub struct StopHandle {
    shared: Arc<Shared>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.shared.request_stop(StopReason::Requested);
    }

    /// Stop once `signal` fires; a listener that fails to install leaves the
    /// run going
    pub async fn stop_on<F>(self, signal: F)
    where
        F: Future<Output = std::io::Result<()>>,
    {
        match signal.await {
            Ok(()) => {
                info!("Shutdown signal received, stopping");
                self.stop();
            }
            Err(e) => log_error!("Failed to listen for shutdown signal: {}", e),
        }
    }
}

/// A running loop
pub struct LoopHandle {
    stop: StopHandle,
    join: JoinHandle<Result<StopReason>>,
}

impl LoopHandle {
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn stop(&self) {
        self.stop.stop();
    }

    /// Wait for the driver to finish; monitors may still be settling
    pub async fn wait(self) -> Result<StopReason> {
        self.join
            .await
            .map_err(|e| StrategyError::TaskFailed(e.to_string()))?
    }
}

pub struct TradeLoopController {
    shared: Arc<Shared>,
}

impl TradeLoopController {
    pub fn new(
        broker: Arc<dyn ContractBroker>,
        trading: &TradingConfig,
        config: &LoopConfig,
    ) -> Result<Self> {
        trading.validate()?;
        config.validate()?;
        let stake = StakeController::new(trading)?;
        let (status_tx, _) = broadcast::channel(config.status_buffer);

        Ok(Self {
            shared: Arc::new(Shared {
                broker,
                config: config.clone(),
                stake: Mutex::new(stake),
                book: Mutex::new(Book {
                    stop_loss_limit: trading.stop_loss_limit,
                    take_profit_limit: trading.take_profit_limit,
                    ..Book::default()
                }),
                status_tx,
                metrics: LoopMetricsCollector::new(),
            }),
        })
    }

    /// Begin a run; fails with `AlreadyRunning` if one is active
    pub fn start(&self, selection: TradeSelection) -> Result<LoopHandle> {
        let token = CancellationToken::new();
        {
            let mut book = self.shared.book.lock();
            if book.is_running {
                return Err(StrategyError::AlreadyRunning);
            }
            book.is_running = true;
            book.stop_requested = false;
            book.stop_reason = None;
            book.token = Some(token.clone());
        }

        info!("Trade loop starting");
        self.shared.emit(LoopStatus::Started);

        let shared = Arc::clone(&self.shared);
        let join = tokio::spawn(async move {
            let result = drive(Arc::clone(&shared), token, selection).await;
            finish(&shared, &result);
            result
        });

        Ok(LoopHandle {
            stop: self.stop_handle(),
            join,
        })
    }

    /// Request the active run to stop; a no-op when idle
    pub fn stop(&self) {
        self.shared.request_stop(StopReason::Requested);
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn subscribe_status(&self) -> broadcast::Receiver<LoopStatus> {
        self.shared.status_tx.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.shared.book.lock().is_running
    }

    pub fn state(&self) -> TradeLoopState {
        let book = self.shared.book.lock();
        TradeLoopState {
            is_running: book.is_running,
            stop_requested: book.stop_requested,
            contract_in_flight: book.contract_in_flight,
            cumulative_profit: book.cumulative_profit,
            stop_loss_limit: book.stop_loss_limit,
            take_profit_limit: book.take_profit_limit,
            open_contracts: book.open_contracts.len(),
            last_result: book.last_result,
            purchases: book.purchases,
            settlements: book.settlements,
        }
    }

    pub fn stake_state(&self) -> StakeState {
        self.shared.stake.lock().snapshot()
    }

    /// Replace the base stake between runs or mid-run; the ladder restarts
    pub fn set_base_stake(&self, base_stake: Decimal) -> Result<()> {
        self.shared.stake.lock().set_base_stake(base_stake)
    }

    /// Update session limits; 0 disables either
    pub fn set_limits(&self, stop_loss_limit: Decimal, take_profit_limit: Decimal) {
        let mut book = self.shared.book.lock();
        book.stop_loss_limit = stop_loss_limit.max(Decimal::ZERO);
        book.take_profit_limit = take_profit_limit.max(Decimal::ZERO);
    }

    /// Zero the session profit, e.g. before a fresh session
    pub fn reset_profit(&self) {
        self.shared.book.lock().cumulative_profit = Decimal::ZERO;
    }

    pub fn metrics(&self) -> LoopMetrics {
        self.shared.metrics.get_metrics()
    }
}

fn finish(shared: &Shared, result: &Result<StopReason>) {
    let reason = match result {
        Ok(reason) => *reason,
        Err(StrategyError::Authorization(_)) => StopReason::Authorization,
        Err(StrategyError::PurchaseRejected { .. }) => StopReason::PurchaseRejected,
        Err(_) => StopReason::Requested,
    };
    {
        let mut book = shared.book.lock();
        book.is_running = false;
        book.contract_in_flight = false;
        if let Some(token) = book.token.take() {
            // Late monitors of this run must see it as stopped
            token.cancel();
        }
    }

    let metrics = shared.metrics.get_metrics();
    log_metrics!(
        "Trade loop finished ({}): {} purchases, {} settled, {} wins, {} losses",
        reason,
        metrics.purchases_sent,
        metrics.contracts_settled,
        metrics.wins,
        metrics.losses
    );
    shared.emit(LoopStatus::Stopped { reason });
}

/// Sleep for `duration` unless the run is cancelled first; false on cancel
async fn pause(duration: Duration, token: &CancellationToken) -> bool {
    tokio::select! {
        _ = token.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}

async fn drive(
    shared: Arc<Shared>,
    token: CancellationToken,
    selection: TradeSelection,
) -> Result<StopReason> {
    let cooldown = shared.config.cooldown();
    let mut active: Option<(InstrumentId, DigitStrategy)> = None;
    let mut idle = false;

    loop {
        if token.is_cancelled() {
            break;
        }

        let Some(target) = selection.current() else {
            if !idle {
                info!("No recommendation available, idling");
                shared.emit(LoopStatus::Idle);
                idle = true;
            }
            if !pause(cooldown, &token).await {
                break;
            }
            continue;
        };
        idle = false;

        let key = (target.instrument.clone(), target.strategy);
        if active.as_ref() != Some(&key) {
            if active.is_some() {
                shared.stake.lock().reset();
                info!(
                    "Target changed to {} {}, stake reset to base",
                    target.instrument, target.strategy
                );
            }
            shared.emit(LoopStatus::TargetChanged {
                instrument: target.instrument.clone(),
                strategy: target.strategy,
            });
            active = Some(key);
        }

        let (stake, ladder_prediction, epoch) = {
            let controller = shared.stake.lock();
            (
                controller.next_stake(),
                controller.next_prediction(),
                controller.epoch(),
            )
        };
        let prediction = target
            .strategy
            .requires_barrier()
            .then(|| target.barrier.unwrap_or(ladder_prediction));

        if token.is_cancelled() {
            break;
        }

        let request = PurchaseRequest {
            instrument: target.instrument.clone(),
            strategy: target.strategy,
            stake,
            duration_ticks: target.duration_ticks,
            prediction,
        };

        shared.set_in_flight(true);
        let outcome = shared.broker.purchase_contract(&request).await;
        shared.set_in_flight(false);

        match outcome {
            Ok(receipt) => {
                let contract_id = receipt.contract_id;
                {
                    let mut book = shared.book.lock();
                    book.purchases += 1;
                    book.open_contracts.insert(contract_id, epoch);
                }
                shared.metrics.increment_purchases();
                log_execution!(
                    "Bought {} {} {} {:?} stake {} payout {}",
                    contract_id,
                    request.instrument,
                    request.contract_type(),
                    prediction,
                    stake,
                    receipt.payout
                );
                shared.emit(LoopStatus::PurchaseSent {
                    contract_id,
                    instrument: request.instrument.clone(),
                    strategy: request.strategy,
                    stake,
                    prediction,
                });

                let mut monitor = tokio::spawn(monitor_contract(
                    Arc::clone(&shared),
                    token.clone(),
                    contract_id,
                ));

                if shared.config.await_settlement {
                    tokio::select! {
                        _ = &mut monitor => {}
                        _ = token.cancelled() => break,
                    }
                }
            }
            Err(BrokerError::Authorization(message)) => {
                shared.metrics.increment_failures();
                log_error!("Authorization failed, stopping: {}", message);
                shared.request_stop(StopReason::Authorization);
                return Err(StrategyError::Authorization(message));
            }
            Err(err) if err.is_transient() => {
                shared.metrics.increment_rate_limits();
                // Never retry sooner than the configured floor
                let floor = shared.config.rate_limit_backoff();
                let retry_in = err.retry_after().map_or(floor, |after| after.max(floor));
                log_backoff!("{}; retrying in {:?}", err, retry_in);
                shared.emit(LoopStatus::Backoff {
                    message: err.to_string(),
                    retry_in,
                });
                if !pause(retry_in, &token).await {
                    break;
                }
                continue;
            }
            Err(BrokerError::PurchaseRejected { code, message }) => {
                shared.metrics.increment_failures();
                log_warning!("Purchase rejected ({}): {}", code, message);
                shared.emit(LoopStatus::PurchaseRejected {
                    code: code.clone(),
                    message: message.clone(),
                });
                if shared.config.rejection_policy == RejectionPolicy::Stop {
                    shared.request_stop(StopReason::PurchaseRejected);
                    return Err(StrategyError::PurchaseRejected { code, message });
                }
            }
            Err(err) => {
                shared.metrics.increment_failures();
                log_error!("Purchase failed: {}", err);
                shared.emit(LoopStatus::PurchaseFailed {
                    message: err.to_string(),
                });
            }
        }

        if !pause(cooldown, &token).await {
            break;
        }
    }

    let reason = shared
        .book
        .lock()
        .stop_reason
        .unwrap_or(StopReason::Requested);
    log_stop!("Trade loop stopping: {}", reason);
    Ok(reason)
}

/// Follow one contract to settlement
async fn monitor_contract(shared: Arc<Shared>, run: CancellationToken, contract_id: ContractId) {
    let mut updates = match shared.broker.monitor_contract(contract_id).await {
        Ok(updates) => updates,
        Err(e) => {
            log_error!("Cannot monitor {}: {}", contract_id, e);
            shared.release(contract_id);
            shared.emit(LoopStatus::MonitorFailed {
                contract_id,
                message: e.to_string(),
            });
            return;
        }
    };

    let account_after_stop = shared.config.account_after_stop;
    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Some(update) if update.is_settled => {
                    shared.apply_settlement(contract_id, update.profit, &run);
                    break;
                }
                Some(update) => {
                    trace!("{} open, spot {:?}", contract_id, update.current_spot);
                }
                None => {
                    if shared.release(contract_id) {
                        log_warning!("Update stream for {} ended before settlement", contract_id);
                        shared.emit(LoopStatus::MonitorFailed {
                            contract_id,
                            message: "update stream ended before settlement".to_string(),
                        });
                    }
                    break;
                }
            },
            _ = run.cancelled(), if !account_after_stop => {
                debug!("Run stopped, abandoning {}", contract_id);
                shared.release(contract_id);
                break;
            }
        }
    }

    if let Err(e) = shared.broker.forget(contract_id).await {
        debug!("Forget {} failed: {}", contract_id, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_selection_has_no_barrier() {
        let selection = TradeSelection::Fixed(TradeTemplate::from_config(&TradingConfig::default()));
        let target = selection.current().unwrap();
        assert_eq!(target.instrument, InstrumentId::new("R_100"));
        assert_eq!(target.strategy, DigitStrategy::Over);
        assert_eq!(target.barrier, None);
    }

    #[test]
    fn test_auto_selection_empty_until_published() {
        let (tx, rx) = watch::channel(None);
        let selection = TradeSelection::Auto {
            recommendations: rx,
            duration_ticks: 1,
        };
        assert!(selection.current().is_none());

        tx.send_replace(Some(Arc::new(digit_signals::TradeRecommendation {
            instrument: InstrumentId::new("R_50"),
            strategy: DigitStrategy::Under,
            barrier: digitbot_types::Barrier::Digit(Digit::new(5).unwrap()),
            confidence_pct: Decimal::from(70),
            reason: String::new(),
            generated_at: chrono::Utc::now(),
            sample_size: 100,
        })));

        let target = selection.current().unwrap();
        assert_eq!(target.strategy, DigitStrategy::Under);
        assert_eq!(target.barrier, Some(Digit::new(5).unwrap()));
    }
}

//! Simulated brokerage for paper trading
//!
//! Streams random-walk ticks per instrument and settles digit contracts on
//! the exit tick's last digit, so the full signal → stake → loop pipeline can
//! run without a live account.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use digitbot_config::TradingConfig;
use digitbot_types::{
    BrokerError, ContractBroker, ContractId, ContractStream, ContractUpdate, InstrumentId,
    MessageRouter, PurchaseReceipt, PurchaseRequest, Quote, RawTick, SubscriptionId, TickMessage,
    TickSource, TickSubscription,
};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

#[derive(Debug, Clone)]
pub struct PaperConfig {
    pub tick_interval: Duration,
    /// Decimals every simulated instrument quotes at
    pub pip_size: u32,
    pub start_price: Decimal,
    /// Largest single-tick move, in pips
    pub max_step_pips: i64,
    /// Share of fair odds withheld from every payout
    pub house_edge: Decimal,
    pub min_stake: Decimal,
    /// Fixed seed for reproducible runs
    pub seed: Option<u64>,
}

impl Default for PaperConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            pip_size: 2,
            start_price: dec!(1000.00),
            max_step_pips: 250,
            house_edge: dec!(0.05),
            min_stake: dec!(0.35),
            seed: None,
        }
    }
}

impl PaperConfig {
    pub fn from_trading(config: &TradingConfig) -> Self {
        Self {
            min_stake: config.min_stake,
            ..Self::default()
        }
    }
}

/// Random-walk price generator for one instrument
struct PriceWalk {
    price: Decimal,
    rng: StdRng,
}

impl PriceWalk {
    fn step(&mut self, config: &PaperConfig) -> Decimal {
        let pips = self
            .rng
            .gen_range(-config.max_step_pips..=config.max_step_pips);
        let floor = Decimal::new(1, config.pip_size);
        self.price = (self.price + Decimal::new(pips, config.pip_size)).max(floor);
        self.price
    }
}

struct PaperInner {
    config: PaperConfig,
    next_subscription: AtomicU64,
    next_contract: AtomicU64,
    walks: DashMap<InstrumentId, Arc<Mutex<PriceWalk>>>,
    tick_routes: MessageRouter<SubscriptionId, TickMessage>,
    contract_routes: MessageRouter<ContractId, ContractUpdate>,
    /// Settlements not yet delivered to a monitor
    settled: DashMap<ContractId, ContractUpdate>,
    feeds: DashMap<SubscriptionId, JoinHandle<()>>,
}

impl PaperInner {
    fn walk(&self, instrument: &InstrumentId) -> Arc<Mutex<PriceWalk>> {
        let walk = self.walks.entry(instrument.clone()).or_insert_with(|| {
            let rng = match self.config.seed {
                Some(seed) => {
                    // Distinct but reproducible stream per instrument
                    let salt = instrument.as_str().bytes().fold(0u64, |h, b| {
                        h.wrapping_mul(31).wrapping_add(b as u64)
                    });
                    StdRng::seed_from_u64(seed ^ salt)
                }
                None => StdRng::from_entropy(),
            };
            Arc::new(Mutex::new(PriceWalk {
                price: self.config.start_price,
                rng,
            }))
        });
        Arc::clone(walk.value())
    }

    fn next_tick(&self, instrument: &InstrumentId) -> (Decimal, RawTick) {
        let price = self.walk(instrument).lock().step(&self.config);
        let tick = RawTick {
            quote: price.to_f64().unwrap_or_default(),
            epoch: Utc::now().timestamp(),
        };
        (price, tick)
    }

    fn settle(&self, contract_id: ContractId, request: &PurchaseRequest, exit: Decimal) {
        let exit_digit = match Quote::from_decimal(exit) {
            Ok(quote) => quote.last_digit(),
            Err(_) => return,
        };
        let won = request.strategy.wins(exit_digit, request.prediction);
        let profit = if won {
            win_profit(request, self.config.house_edge)
        } else {
            -request.stake
        };
        debug!(
            "Paper {} exit {} digit {} → {}",
            contract_id, exit, exit_digit, profit
        );

        let update = ContractUpdate {
            contract_id,
            is_settled: true,
            profit,
            current_spot: Some(exit),
        };
        // Park first so a monitor registering concurrently still finds it
        self.settled.insert(contract_id, update.clone());
        if self.contract_routes.dispatch(&contract_id, update) {
            self.settled.remove(&contract_id);
        }
    }
}

/// Digits that win the contract, out of ten
fn winning_digits(request: &PurchaseRequest) -> u32 {
    digitbot_types::Digit::all()
        .filter(|digit| request.strategy.wins(*digit, request.prediction))
        .count() as u32
}

/// Profit on a win: fair odds less the house edge, to the cent
fn win_profit(request: &PurchaseRequest, house_edge: Decimal) -> Decimal {
    let winners = Decimal::from(winning_digits(request).max(1));
    let fair_multiple = Decimal::TEN / winners;
    (request.stake * (fair_multiple * (Decimal::ONE - house_edge) - Decimal::ONE)).round_dp(2)
}

/// Clone-cheap handle; every clone drives the same simulated venue
#[derive(Clone)]
pub struct PaperBroker {
    inner: Arc<PaperInner>,
}

impl PaperBroker {
    pub fn new(config: PaperConfig) -> Self {
        info!(
            "Paper broker: {} decimals, tick every {:?}",
            config.pip_size, config.tick_interval
        );
        Self {
            inner: Arc::new(PaperInner {
                config,
                next_subscription: AtomicU64::new(1),
                next_contract: AtomicU64::new(1),
                walks: DashMap::new(),
                tick_routes: MessageRouter::new(),
                contract_routes: MessageRouter::new(),
                settled: DashMap::new(),
                feeds: DashMap::new(),
            }),
        }
    }

    pub fn active_feeds(&self) -> usize {
        self.inner.feeds.len()
    }
}

impl Default for PaperBroker {
    fn default() -> Self {
        Self::new(PaperConfig::default())
    }
}

#[async_trait]
impl TickSource for PaperBroker {
    async fn subscribe_ticks(
        &self,
        instrument: &InstrumentId,
        history_count: usize,
    ) -> Result<TickSubscription, BrokerError> {
        let id = SubscriptionId::new(self.inner.next_subscription.fetch_add(1, Ordering::Relaxed));
        let updates = self.inner.tick_routes.register(id);

        let history: Vec<RawTick> = (0..history_count)
            .map(|_| self.inner.next_tick(instrument).1)
            .collect();
        self.inner.tick_routes.dispatch(&id, TickMessage::History(history));

        let inner = Arc::clone(&self.inner);
        let symbol = instrument.clone();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(inner.config.tick_interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let (_, tick) = inner.next_tick(&symbol);
                if !inner.tick_routes.dispatch(&id, TickMessage::Tick(tick)) {
                    trace!("Paper feed {} has no listener, stopping", id);
                    break;
                }
            }
        });
        self.inner.feeds.insert(id, task);

        Ok(TickSubscription {
            id,
            instrument: instrument.clone(),
            pip_size: Some(self.inner.config.pip_size),
            updates,
        })
    }

    async fn unsubscribe(&self, subscription: SubscriptionId) -> Result<(), BrokerError> {
        self.inner.tick_routes.deregister(&subscription);
        match self.inner.feeds.remove(&subscription) {
            Some((_, task)) => {
                task.abort();
                Ok(())
            }
            None => Err(BrokerError::UnknownSubscription(subscription)),
        }
    }
}

#[async_trait]
impl ContractBroker for PaperBroker {
    async fn purchase_contract(
        &self,
        request: &PurchaseRequest,
    ) -> Result<PurchaseReceipt, BrokerError> {
        if request.stake < self.inner.config.min_stake {
            return Err(BrokerError::PurchaseRejected {
                code: "StakeTooLow".to_string(),
                message: format!(
                    "stake {} is below the minimum {}",
                    request.stake, self.inner.config.min_stake
                ),
            });
        }
        if request.strategy.requires_barrier() && request.prediction.is_none() {
            return Err(BrokerError::PurchaseRejected {
                code: "MissingBarrier".to_string(),
                message: format!("{} needs a barrier digit", request.contract_type()),
            });
        }
        if winning_digits(request) == 0 {
            return Err(BrokerError::PurchaseRejected {
                code: "InvalidBarrier".to_string(),
                message: format!(
                    "{} {:?} can never win",
                    request.contract_type(),
                    request.prediction
                ),
            });
        }

        let contract_id = ContractId::new(self.inner.next_contract.fetch_add(1, Ordering::Relaxed));
        let receipt = PurchaseReceipt {
            contract_id,
            buy_price: request.stake,
            payout: request.stake + win_profit(request, self.inner.config.house_edge),
            purchased_at: Utc::now(),
        };

        let inner = Arc::clone(&self.inner);
        let request = request.clone();
        tokio::spawn(async move {
            let mut exit = Decimal::ZERO;
            for _ in 0..request.duration_ticks.max(1) {
                tokio::time::sleep(inner.config.tick_interval).await;
                exit = inner.next_tick(&request.instrument).0;
            }
            inner.settle(contract_id, &request, exit);
        });

        Ok(receipt)
    }

    async fn monitor_contract(&self, contract: ContractId) -> Result<ContractStream, BrokerError> {
        let updates = self.inner.contract_routes.register(contract);
        if let Some((_, update)) = self.inner.settled.remove(&contract) {
            self.inner.contract_routes.dispatch(&contract, update);
        }
        Ok(updates)
    }

    async fn forget(&self, contract: ContractId) -> Result<(), BrokerError> {
        self.inner.contract_routes.deregister(&contract);
        self.inner.settled.remove(&contract);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use digitbot_types::{Digit, DigitStrategy};

    fn request(strategy: DigitStrategy, prediction: Option<u8>, stake: Decimal) -> PurchaseRequest {
        PurchaseRequest {
            instrument: InstrumentId::new("R_100"),
            strategy,
            stake,
            duration_ticks: 1,
            prediction: prediction.map(|d| Digit::new(d).unwrap()),
        }
    }

    #[test]
    fn test_win_profit_scales_with_odds() {
        let edge = dec!(0.05);
        assert_eq!(win_profit(&request(DigitStrategy::Even, None, dec!(1)), edge), dec!(0.90));
        assert_eq!(win_profit(&request(DigitStrategy::Over, Some(4), dec!(1)), edge), dec!(0.90));
        assert_eq!(win_profit(&request(DigitStrategy::Matches, Some(7), dec!(1)), edge), dec!(8.50));
        // Nine winners leave little after the edge
        assert_eq!(win_profit(&request(DigitStrategy::Differs, Some(7), dec!(1)), edge), dec!(0.06));
    }

    #[tokio::test]
    async fn test_purchase_validation() {
        let broker = PaperBroker::default();

        let low = broker
            .purchase_contract(&request(DigitStrategy::Even, None, dec!(0.10)))
            .await;
        assert!(matches!(low, Err(BrokerError::PurchaseRejected { ref code, .. }) if code == "StakeTooLow"));

        let missing = broker
            .purchase_contract(&request(DigitStrategy::Under, None, dec!(1)))
            .await;
        assert!(matches!(missing, Err(BrokerError::PurchaseRejected { ref code, .. }) if code == "MissingBarrier"));

        let impossible = broker
            .purchase_contract(&request(DigitStrategy::Over, Some(9), dec!(1)))
            .await;
        assert!(matches!(impossible, Err(BrokerError::PurchaseRejected { ref code, .. }) if code == "InvalidBarrier"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_contract_settles_after_duration() {
        let broker = PaperBroker::new(PaperConfig {
            seed: Some(7),
            ..PaperConfig::default()
        });
        let receipt = broker
            .purchase_contract(&request(DigitStrategy::Odd, None, dec!(2)))
            .await
            .unwrap();
        assert_eq!(receipt.buy_price, dec!(2));
        assert_eq!(receipt.payout, dec!(3.80));

        let mut updates = broker.monitor_contract(receipt.contract_id).await.unwrap();
        let update = updates.recv().await.unwrap();
        assert!(update.is_settled);
        assert!(update.profit == dec!(1.80) || update.profit == dec!(-2));
        broker.forget(receipt.contract_id).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_feed_starts_with_history() {
        let broker = PaperBroker::default();
        let instrument = InstrumentId::new("R_10");
        let mut sub = broker.subscribe_ticks(&instrument, 20).await.unwrap();

        match sub.updates.recv().await.unwrap() {
            TickMessage::History(ticks) => assert_eq!(ticks.len(), 20),
            other => panic!("expected history, got {:?}", other),
        }
        assert!(matches!(sub.updates.recv().await, Some(TickMessage::Tick(_))));

        broker.unsubscribe(sub.id).await.unwrap();
        assert_eq!(broker.active_feeds(), 0);
        assert!(broker.unsubscribe(sub.id).await.is_err());
    }
}

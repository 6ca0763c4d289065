//! Periodic recompute of statistics and scores across all feeds

use chrono::Utc;
use digitbot_config::AppConfig;
use digitbot_strategy_shared::{log_metrics, log_search};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::feed::TickFeedManager;
use crate::scorer::{PublishDecision, RecommendationPublisher, SignalScorer};
use crate::signals::{SignalStats, TradeRecommendation};
use crate::statistics::StatisticsParams;

/// Published top pick; `None` while nothing clears the thresholds
pub type TopRecommendation = Option<Arc<TradeRecommendation>>;

/// Scores every subscribed window on a fixed cadence and publishes the
/// ranked list plus a stable top recommendation
pub struct SignalEngine {
    feeds: Arc<TickFeedManager>,
    scorer: SignalScorer,
    params: StatisticsParams,
    interval: Duration,
    publisher: Mutex<RecommendationPublisher>,
    stats: Mutex<SignalStats>,
    top_tx: watch::Sender<TopRecommendation>,
    ranked_tx: watch::Sender<Arc<Vec<TradeRecommendation>>>,
}

impl SignalEngine {
    pub fn new(feeds: Arc<TickFeedManager>, config: &AppConfig) -> Self {
        let (top_tx, _) = watch::channel(None);
        let (ranked_tx, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            feeds,
            scorer: SignalScorer::new(config.scorer.clone()),
            params: StatisticsParams::from_config(&config.scorer, &config.trading),
            interval: config.feed.recompute_interval(),
            publisher: Mutex::new(RecommendationPublisher::new(&config.scorer)),
            stats: Mutex::new(SignalStats::default()),
            top_tx,
            ranked_tx,
        }
    }

    pub fn subscribe_top(&self) -> watch::Receiver<TopRecommendation> {
        self.top_tx.subscribe()
    }

    pub fn subscribe_ranked(&self) -> watch::Receiver<Arc<Vec<TradeRecommendation>>> {
        self.ranked_tx.subscribe()
    }

    pub fn current_top(&self) -> TopRecommendation {
        self.publisher.lock().current()
    }

    pub fn stats(&self) -> SignalStats {
        self.stats.lock().clone()
    }

    /// One scoring pass over every window
    pub fn evaluate_once(&self, now: Instant) -> PublishDecision {
        let all_stats = self.feeds.statistics(&self.params);
        let insufficient = all_stats.iter().filter(|s| !s.sample_sufficient).count();
        let ranked = self.scorer.rank(&all_stats);

        let (decision, top) = {
            let mut publisher = self.publisher.lock();
            let decision = publisher.offer(ranked.first().cloned(), now);
            (decision, publisher.current())
        };

        if decision.changed() {
            match &top {
                Some(rec) => log_search!(
                    "Top pick {} {} {} at {}%: {}",
                    rec.instrument,
                    rec.strategy,
                    rec.barrier,
                    rec.confidence_pct,
                    rec.reason
                ),
                None => info!("No recommendation clears the thresholds"),
            }
            self.top_tx.send_replace(top);
            self.stats.lock().record_top_change();
        }

        debug!(
            "Evaluated {} instrument(s): {} recommendation(s), {} below minimum sample",
            all_stats.len(),
            ranked.len(),
            insufficient
        );
        self.stats
            .lock()
            .record_evaluation(&ranked, insufficient, Utc::now());
        self.ranked_tx.send_replace(Arc::new(ranked));

        decision
    }

    /// Evaluate every interval until `token` is cancelled
    pub async fn run(&self, token: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!("Signal engine running every {:?}", self.interval);

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                tick = ticker.tick() => {
                    self.evaluate_once(tick.into_std());
                }
            }
        }

        let stats = self.stats();
        log_metrics!(
            "Signal engine stopped after {} evaluations, {} top changes",
            stats.evaluations,
            stats.top_changes
        );
    }
}

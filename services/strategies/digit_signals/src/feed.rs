//! Tick subscriptions feeding per-instrument windows
//!
//! At most one live subscription exists per instrument: subscribing again
//! tears the previous one down first, so two streams can never interleave
//! ticks into the same window.

use digitbot_strategy_shared::{log_network, log_warning};
use digitbot_types::{InstrumentId, SubscriptionId, TickMessage, TickSource};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{Result, SignalError};
use crate::statistics::{DigitStatistics, StatisticsParams};
use crate::tick_window::TickWindow;

pub type SharedWindow = Arc<RwLock<TickWindow>>;

struct ActiveFeed {
    subscription: SubscriptionId,
    window: SharedWindow,
    task: JoinHandle<()>,
}

pub struct TickFeedManager {
    source: Arc<dyn TickSource>,
    window_capacity: usize,
    history_count: usize,
    feeds: Mutex<HashMap<InstrumentId, ActiveFeed>>,
}

impl TickFeedManager {
    pub fn new(source: Arc<dyn TickSource>, window_capacity: usize, history_count: usize) -> Self {
        Self {
            source,
            window_capacity,
            history_count,
            feeds: Mutex::new(HashMap::new()),
        }
    }

    /// Start (or restart) the feed for `instrument`
    pub async fn subscribe(&self, instrument: &InstrumentId) -> Result<SharedWindow> {
        let previous = self.feeds.lock().remove(instrument);
        if let Some(feed) = previous {
            self.teardown(instrument, feed).await;
        }

        let subscription = self
            .source
            .subscribe_ticks(instrument, self.history_count)
            .await?;

        let window = Arc::new(RwLock::new(
            TickWindow::new(instrument.clone(), self.window_capacity)
                .with_pip_size(subscription.pip_size),
        ));
        let task = tokio::spawn(pump(
            instrument.clone(),
            Arc::clone(&window),
            subscription.updates,
        ));

        log_network!(
            "Subscribed to {} ({}, pip size {:?})",
            instrument,
            subscription.id,
            subscription.pip_size
        );

        let raced = self.feeds.lock().insert(
            instrument.clone(),
            ActiveFeed {
                subscription: subscription.id,
                window: Arc::clone(&window),
                task,
            },
        );
        // A concurrent subscribe for the same instrument lost the race
        if let Some(feed) = raced {
            self.teardown(instrument, feed).await;
        }

        Ok(window)
    }

    pub async fn unsubscribe(&self, instrument: &InstrumentId) -> Result<()> {
        let feed = self
            .feeds
            .lock()
            .remove(instrument)
            .ok_or_else(|| SignalError::UnknownInstrument(instrument.clone()))?;

        feed.task.abort();
        self.source.unsubscribe(feed.subscription).await?;
        log_network!("Unsubscribed from {}", instrument);
        Ok(())
    }

    pub async fn unsubscribe_all(&self) {
        let feeds: Vec<(InstrumentId, ActiveFeed)> = self.feeds.lock().drain().collect();
        for (instrument, feed) in feeds {
            self.teardown(&instrument, feed).await;
        }
    }

    pub fn window(&self, instrument: &InstrumentId) -> Option<SharedWindow> {
        self.feeds
            .lock()
            .get(instrument)
            .map(|feed| Arc::clone(&feed.window))
    }

    /// Subscribed instruments in lexical order
    pub fn instruments(&self) -> Vec<InstrumentId> {
        let mut instruments: Vec<InstrumentId> = self.feeds.lock().keys().cloned().collect();
        instruments.sort();
        instruments
    }

    /// Statistics snapshot for every subscribed instrument, in lexical order
    pub fn statistics(&self, params: &StatisticsParams) -> Vec<DigitStatistics> {
        let windows: Vec<SharedWindow> = {
            let feeds = self.feeds.lock();
            let mut entries: Vec<(&InstrumentId, &ActiveFeed)> = feeds.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            entries
                .into_iter()
                .map(|(_, feed)| Arc::clone(&feed.window))
                .collect()
        };

        windows
            .iter()
            .map(|window| DigitStatistics::compute(&window.read(), params))
            .collect()
    }

    async fn teardown(&self, instrument: &InstrumentId, feed: ActiveFeed) {
        feed.task.abort();
        if let Err(e) = self.source.unsubscribe(feed.subscription).await {
            log_warning!("Failed to unsubscribe {} ({}): {}", instrument, feed.subscription, e);
        } else {
            debug!("Tore down feed {} for {}", feed.subscription, instrument);
        }
    }
}

async fn pump(
    instrument: InstrumentId,
    window: SharedWindow,
    mut updates: mpsc::UnboundedReceiver<TickMessage>,
) {
    while let Some(message) = updates.recv().await {
        match message {
            TickMessage::History(ticks) => {
                window.write().push_history(&ticks);
            }
            TickMessage::Tick(tick) => {
                let pushed = window.write().push_tick(tick);
                if let Err(source) = pushed {
                    let err = SignalError::DataQuality {
                        instrument: instrument.clone(),
                        source,
                    };
                    warn!("{}", err);
                }
            }
        }
    }
    debug!("Tick stream for {} ended", instrument);
}

//! Martingale Paper Trading Entry Point

use anyhow::{Context, Result};
use digit_signals::{SignalEngine, TickFeedManager};
use digitbot_config::{resolve_config_path, AppConfig, TradeMode};
use digitbot_strategy_shared::init_strategy_logging;
use martingale::{
    PaperBroker, PaperConfig, StopReason, TradeLoopController, TradeSelection, TradeTemplate,
};
use std::sync::Arc;
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = resolve_config_path("DIGITBOT_CONFIG_PATH", "configs/digitbot.toml");
    let config = AppConfig::load(Some(&config_path))
        .context("Failed to load digitbot configuration")?;

    init_strategy_logging("martingale_paper", &config.logging)?;
    info!("Starting martingale paper trader ({:?} mode)", config.trading.mode);

    let broker = Arc::new(PaperBroker::new(PaperConfig::from_trading(&config.trading)));

    let feeds = Arc::new(TickFeedManager::new(
        broker.clone(),
        config.feed.window_capacity,
        config.feed.history_count,
    ));
    for instrument in &config.feed.instruments {
        feeds
            .subscribe(instrument)
            .await
            .with_context(|| format!("Failed to subscribe to {}", instrument))?;
    }

    let engine = Arc::new(SignalEngine::new(Arc::clone(&feeds), &config));
    let shutdown = CancellationToken::new();
    let engine_task = {
        let engine = Arc::clone(&engine);
        let token = shutdown.clone();
        tokio::spawn(async move { engine.run(token).await })
    };

    let controller = TradeLoopController::new(broker, &config.trading, &config.trade_loop)
        .context("Invalid trading configuration")?;

    let mut status = controller.subscribe_status();
    let status_task = tokio::spawn(async move {
        loop {
            match status.recv().await {
                Ok(event) => info!("{}", event),
                Err(RecvError::Lagged(skipped)) => warn!("Status stream lagged by {}", skipped),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let selection = match config.trading.mode {
        TradeMode::Auto => TradeSelection::Auto {
            recommendations: engine.subscribe_top(),
            duration_ticks: config.trading.duration_ticks,
        },
        TradeMode::Fixed => TradeSelection::Fixed(TradeTemplate::from_config(&config.trading)),
    };
    let handle = controller.start(selection)?;

    tokio::spawn(handle.stop_handle().stop_on(signal::ctrl_c()));

    info!("Martingale paper trader running. Press Ctrl+C to stop.");
    let outcome = handle.wait().await;

    shutdown.cancel();
    engine_task.await.context("Signal engine task failed")?;
    feeds.unsubscribe_all().await;

    let state = controller.state();
    info!(
        "Session over: {} purchases, {} settled, cumulative profit {}",
        state.purchases, state.settlements, state.cumulative_profit
    );
    status_task.abort();

    match outcome {
        Ok(StopReason::Requested) => Ok(()),
        Ok(reason) => {
            info!("Stopped: {}", reason);
            Ok(())
        }
        Err(e) => Err(e).context("Trade loop ended with an error"),
    }
}

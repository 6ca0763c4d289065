//! Logging setup and standardized emoji logging for trading services
//!
//! Operators watch these logs to know whether real money is at risk, so the
//! trade-lifecycle events use a fixed emoji vocabulary that is easy to scan.

use anyhow::Result;
use digitbot_config::LoggingConfig;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[doc(hidden)]
pub use tracing as __tracing;

/// Install the global subscriber. `RUST_LOG` wins over `config.level`.
pub fn init_strategy_logging(service_name: &str, config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(config.json.then(|| fmt::layer().json().with_target(true)))
        .with((!config.json).then(|| fmt::layer().with_target(false)))
        .try_init()?;

    tracing::info!("{} Logging initialised for {}", LogEmoji::INFO, service_name);
    Ok(())
}

/// Standard emoji set for trade lifecycle logging
pub struct LogEmoji;

impl LogEmoji {
    // Status indicators
    pub const SUCCESS: &'static str = "✅"; // Operation succeeded
    pub const ERROR: &'static str = "❌"; // Operation failed
    pub const WARNING: &'static str = "⚠️"; // Warning or caution
    pub const INFO: &'static str = "ℹ️"; // Information

    // Trade lifecycle
    pub const SEARCH: &'static str = "🔍"; // Scoring/analyzing
    pub const CHART: &'static str = "📊"; // Statistics/metrics
    pub const EXECUTE: &'static str = "⚡"; // Purchase sent
    pub const MONEY: &'static str = "💰"; // Settlement/profit
    pub const NETWORK: &'static str = "🌐"; // Subscription/connection
    pub const CLOCK: &'static str = "⏱️"; // Backoff/cooldown
    pub const STOP: &'static str = "🛑"; // Stop requested
}

#[macro_export]
macro_rules! log_success {
    ($($arg:tt)*) => {
        $crate::logging::__tracing::info!("{} {}", $crate::logging::LogEmoji::SUCCESS, format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::logging::__tracing::error!("{} {}", $crate::logging::LogEmoji::ERROR, format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_warning {
    ($($arg:tt)*) => {
        $crate::logging::__tracing::warn!("{} {}", $crate::logging::LogEmoji::WARNING, format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_search {
    ($($arg:tt)*) => {
        $crate::logging::__tracing::info!("{} {}", $crate::logging::LogEmoji::SEARCH, format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_metrics {
    ($($arg:tt)*) => {
        $crate::logging::__tracing::info!("{} {}", $crate::logging::LogEmoji::CHART, format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_execution {
    ($($arg:tt)*) => {
        $crate::logging::__tracing::info!("{} {}", $crate::logging::LogEmoji::EXECUTE, format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_profit {
    ($($arg:tt)*) => {
        $crate::logging::__tracing::info!("{} {}", $crate::logging::LogEmoji::MONEY, format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_network {
    ($($arg:tt)*) => {
        $crate::logging::__tracing::info!("{} {}", $crate::logging::LogEmoji::NETWORK, format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_backoff {
    ($($arg:tt)*) => {
        $crate::logging::__tracing::warn!("{} {}", $crate::logging::LogEmoji::CLOCK, format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_stop {
    ($($arg:tt)*) => {
        $crate::logging::__tracing::warn!("{} {}", $crate::logging::LogEmoji::STOP, format!($($arg)*))
    };
}

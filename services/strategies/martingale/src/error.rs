//! Error types for the martingale trade loop

use digit_signals::SignalError;
use digitbot_config::ConfigError;
use digitbot_types::BrokerError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Trade loop is already running")]
    AlreadyRunning,

    #[error("Authorization failed: {0}")]
    Authorization(String),

    #[error("Purchase rejected ({code}): {message}")]
    PurchaseRejected { code: String, message: String },

    #[error("Broker error: {0}")]
    Broker(#[from] BrokerError),

    #[error("Signal error: {0}")]
    Signals(#[from] SignalError),

    #[error("Trade loop task failed: {0}")]
    TaskFailed(String),
}

pub type Result<T> = std::result::Result<T, StrategyError>;

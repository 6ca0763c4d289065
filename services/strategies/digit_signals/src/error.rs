//! Error types for the digit signals strategy

use digitbot_types::{BrokerError, InstrumentId, TickError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SignalError {
    #[error("Tick rejected for {instrument}: {source}")]
    DataQuality {
        instrument: InstrumentId,
        #[source]
        source: TickError,
    },

    #[error("Broker error: {0}")]
    Broker(#[from] BrokerError),

    #[error("Unknown instrument: {0}")]
    UnknownInstrument(InstrumentId),

    #[error("Configuration error: {0}")]
    Configuration(#[from] digitbot_config::ConfigError),
}

pub type Result<T> = std::result::Result<T, SignalError>;

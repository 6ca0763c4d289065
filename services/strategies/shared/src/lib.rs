//! Shared Strategy Framework
//!
//! Logging setup, operator-facing log macros and metrics collection used by
//! the signal and execution services.

pub mod logging;
pub mod metrics;

pub use logging::{init_strategy_logging, LogEmoji};
pub use metrics::{LoopMetrics, LoopMetricsCollector};

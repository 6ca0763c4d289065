//! # Digitbot Centralized Configuration
//!
//! Configuration sections, defaults and validation for all digitbot services.
//!
//! ## Features
//!
//! - **Defaults**: heuristic scorer constants, pacing, platform limits
//! - **Layered Loading**: defaults → TOML file → `DIGITBOT__*` environment
//! - **Validation**: invalid trading parameters fail fast at startup
//!
//! ## Usage
//!
//! ```rust,no_run
//! use digitbot_config::{resolve_config_path, AppConfig};
//!
//! let path = resolve_config_path("DIGITBOT_CONFIG_PATH", "configs/digitbot.toml");
//! let config = AppConfig::load(Some(&path)).expect("valid configuration");
//! println!("base stake {}", config.trading.stake);
//! ```

pub mod app_config;
pub mod defaults;

// Re-export commonly used types
pub use app_config::{
    load_config, resolve_config_path, AppConfig, ConfigError, FeedConfig, LoggingConfig,
    LoopConfig, RejectionPolicy, ScorerConfig, TradeMode, TradingConfig,
};

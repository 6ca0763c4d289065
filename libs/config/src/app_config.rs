//! Application Configuration Module
//!
//! Loads the trading, scoring, feed and loop sections from an optional TOML
//! file layered over built-in defaults, with `DIGITBOT__SECTION__FIELD`
//! environment overrides on top. Every section is validated before use; an
//! invalid value (a multiplier below 1, a stake under the platform minimum)
//! is a fatal configuration error rather than something clamped silently.

use config_crate::{Config, Environment, File};
use digitbot_types::{Digit, DigitStrategy, InstrumentId};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::defaults;

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "DIGITBOT";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {field} {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("Failed to load configuration: {0}")]
    Load(#[from] config_crate::ConfigError),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub trading: TradingConfig,
    pub scorer: ScorerConfig,
    pub feed: FeedConfig,
    pub trade_loop: LoopConfig,
    pub logging: LoggingConfig,
}

/// How the trade loop picks what to buy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeMode {
    /// Follow the published top recommendation
    Auto,
    /// Always trade `TradingConfig::instrument` with `TradingConfig::strategy`
    Fixed,
}

/// What the loop does after a business-rule purchase rejection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RejectionPolicy {
    /// Stop the loop; the same request would be rejected again
    Stop,
    /// Report and try again after the cooldown
    Continue,
}

/// Stake progression and session limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TradingConfig {
    /// Base stake, restored after every win
    pub stake: Decimal,
    pub martingale_multiplier: Decimal,
    /// Barrier digit used while not recovering from a loss
    pub prediction_pre_loss: Digit,
    /// Barrier digit used after a loss
    pub prediction_post_loss: Digit,
    /// Stop once cumulative profit ≤ -limit; 0 disables
    pub stop_loss_limit: Decimal,
    /// Stop once cumulative profit ≥ limit; 0 disables
    pub take_profit_limit: Decimal,
    pub min_sample_size: usize,
    /// Loss streak length after which the stake stops growing
    pub loss_cap: u32,
    /// Platform minimum stake
    pub min_stake: Decimal,
    pub duration_ticks: u32,
    pub mode: TradeMode,
    /// Fixed-mode instrument
    pub instrument: InstrumentId,
    /// Fixed-mode strategy
    pub strategy: DigitStrategy,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            stake: defaults::trading::BASE_STAKE,
            martingale_multiplier: defaults::trading::MARTINGALE_MULTIPLIER,
            prediction_pre_loss: Digit::clamped(2),
            prediction_post_loss: Digit::clamped(4),
            stop_loss_limit: Decimal::ZERO,
            take_profit_limit: Decimal::ZERO,
            min_sample_size: defaults::trading::MIN_SAMPLE_SIZE,
            loss_cap: defaults::trading::LOSS_CAP,
            min_stake: defaults::trading::MIN_STAKE,
            duration_ticks: defaults::trading::DURATION_TICKS,
            mode: TradeMode::Auto,
            instrument: InstrumentId::new("R_100"),
            strategy: DigitStrategy::Over,
        }
    }
}

impl TradingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.min_stake <= Decimal::ZERO {
            return Err(invalid("trading.min_stake", "must be > 0"));
        }
        if self.stake <= Decimal::ZERO {
            return Err(invalid("trading.stake", "must be > 0"));
        }
        if self.stake < self.min_stake {
            return Err(invalid(
                "trading.stake",
                format!("{} is below the platform minimum {}", self.stake, self.min_stake),
            ));
        }
        if self.martingale_multiplier < Decimal::ONE {
            return Err(invalid(
                "trading.martingale_multiplier",
                format!("must be ≥ 1, got {}", self.martingale_multiplier),
            ));
        }
        if self.stop_loss_limit < Decimal::ZERO {
            return Err(invalid("trading.stop_loss_limit", "must be ≥ 0"));
        }
        if self.take_profit_limit < Decimal::ZERO {
            return Err(invalid("trading.take_profit_limit", "must be ≥ 0"));
        }
        if self.min_sample_size == 0 {
            return Err(invalid("trading.min_sample_size", "must be > 0"));
        }
        if self.loss_cap == 0 {
            return Err(invalid("trading.loss_cap", "must be ≥ 1"));
        }
        if !(1..=10).contains(&self.duration_ticks) {
            return Err(invalid(
                "trading.duration_ticks",
                format!("must be within 1..=10, got {}", self.duration_ticks),
            ));
        }
        if self.mode == TradeMode::Fixed {
            for (field, prediction) in [
                ("trading.prediction_pre_loss", self.prediction_pre_loss),
                ("trading.prediction_post_loss", self.prediction_post_loss),
            ] {
                // Over 9 and under 0 can never win
                let unwinnable = match self.strategy {
                    DigitStrategy::Over => prediction == Digit::NINE,
                    DigitStrategy::Under => prediction == Digit::ZERO,
                    _ => false,
                };
                if unwinnable {
                    return Err(invalid(
                        field,
                        format!("{} {} can never settle as a win", self.strategy, prediction),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Signal scorer constants; all heuristic and tunable
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScorerConfig {
    pub threshold_pct: Decimal,
    pub damping_factor: Decimal,
    pub confidence_cap_pct: Decimal,
    pub matches_threshold_pct: Decimal,
    pub differs_threshold_pct: Decimal,
    pub digit_deviation_weight: Decimal,
    pub hysteresis_pct: Decimal,
    pub max_staleness_ms: u64,
    pub over_barrier: Digit,
    pub under_barrier: Digit,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            threshold_pct: defaults::scorer::THRESHOLD_PCT,
            damping_factor: defaults::scorer::DAMPING_FACTOR,
            confidence_cap_pct: defaults::scorer::CONFIDENCE_CAP_PCT,
            matches_threshold_pct: defaults::scorer::MATCHES_THRESHOLD_PCT,
            differs_threshold_pct: defaults::scorer::DIFFERS_THRESHOLD_PCT,
            digit_deviation_weight: defaults::scorer::DIGIT_DEVIATION_WEIGHT,
            hysteresis_pct: defaults::scorer::HYSTERESIS_PCT,
            max_staleness_ms: defaults::scorer::MAX_STALENESS_MS,
            over_barrier: Digit::clamped(defaults::scorer::OVER_BARRIER),
            under_barrier: Digit::clamped(defaults::scorer::UNDER_BARRIER),
        }
    }
}

impl ScorerConfig {
    pub fn max_staleness(&self) -> Duration {
        Duration::from_millis(self.max_staleness_ms)
    }

    pub fn validate(&self) -> Result<()> {
        let hundred = dec!(100);
        if self.threshold_pct < dec!(50) || self.threshold_pct >= hundred {
            return Err(invalid("scorer.threshold_pct", "must be within [50, 100)"));
        }
        if self.damping_factor < Decimal::ZERO {
            return Err(invalid("scorer.damping_factor", "must be ≥ 0"));
        }
        if self.confidence_cap_pct <= Decimal::ZERO || self.confidence_cap_pct > hundred {
            return Err(invalid("scorer.confidence_cap_pct", "must be within (0, 100]"));
        }
        if self.matches_threshold_pct <= dec!(10) || self.matches_threshold_pct > hundred {
            return Err(invalid(
                "scorer.matches_threshold_pct",
                "must be above the 10% uniform expectation",
            ));
        }
        if self.differs_threshold_pct < Decimal::ZERO || self.differs_threshold_pct >= dec!(10) {
            return Err(invalid(
                "scorer.differs_threshold_pct",
                "must be below the 10% uniform expectation",
            ));
        }
        if self.digit_deviation_weight < Decimal::ZERO {
            return Err(invalid("scorer.digit_deviation_weight", "must be ≥ 0"));
        }
        if self.hysteresis_pct < Decimal::ZERO {
            return Err(invalid("scorer.hysteresis_pct", "must be ≥ 0"));
        }
        if self.over_barrier == Digit::NINE {
            return Err(invalid("scorer.over_barrier", "no digit is over 9"));
        }
        if self.under_barrier == Digit::ZERO {
            return Err(invalid("scorer.under_barrier", "no digit is under 0"));
        }
        Ok(())
    }
}

/// Tick subscriptions and analysis cadence
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub instruments: Vec<InstrumentId>,
    pub window_capacity: usize,
    pub history_count: usize,
    pub recompute_interval_ms: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            instruments: defaults::feed::INSTRUMENTS
                .iter()
                .map(|symbol| InstrumentId::new(*symbol))
                .collect(),
            window_capacity: defaults::feed::WINDOW_CAPACITY,
            history_count: defaults::feed::HISTORY_COUNT,
            recompute_interval_ms: defaults::feed::RECOMPUTE_INTERVAL_MS,
        }
    }
}

impl FeedConfig {
    pub fn recompute_interval(&self) -> Duration {
        Duration::from_millis(self.recompute_interval_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.instruments.is_empty() {
            return Err(invalid("feed.instruments", "at least one instrument is required"));
        }
        if self.window_capacity == 0 {
            return Err(invalid("feed.window_capacity", "must be > 0"));
        }
        if self.recompute_interval_ms == 0 {
            return Err(invalid("feed.recompute_interval_ms", "must be > 0"));
        }
        Ok(())
    }
}

/// Trade loop pacing and failure policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    pub cooldown_ms: u64,
    pub rate_limit_backoff_ms: u64,
    /// Wait for each contract to settle before the next purchase
    pub await_settlement: bool,
    /// Record profit of contracts that settle after a stop
    pub account_after_stop: bool,
    pub rejection_policy: RejectionPolicy,
    pub status_buffer: usize,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: defaults::trade_loop::COOLDOWN_MS,
            rate_limit_backoff_ms: defaults::trade_loop::RATE_LIMIT_BACKOFF_MS,
            await_settlement: false,
            account_after_stop: true,
            rejection_policy: RejectionPolicy::Stop,
            status_buffer: defaults::trade_loop::STATUS_BUFFER,
        }
    }
}

impl LoopConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    pub fn rate_limit_backoff(&self) -> Duration {
        Duration::from_millis(self.rate_limit_backoff_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.cooldown_ms == 0 {
            return Err(invalid("trade_loop.cooldown_ms", "must be > 0"));
        }
        if self.status_buffer == 0 {
            return Err(invalid("trade_loop.status_buffer", "must be > 0"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load defaults, then `path` (if it exists), then environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&AppConfig::default())?);

        if let Some(path) = path {
            if path.exists() {
                info!("Loading configuration file: {:?}", path);
                builder = builder.add_source(File::from(path).required(true));
            } else {
                warn!("Configuration file not found: {:?}, using defaults", path);
            }
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        debug!("Configuration validated: {:?}", config);
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.trading.validate()?;
        self.scorer.validate()?;
        self.feed.validate()?;
        self.trade_loop.validate()?;
        Ok(())
    }
}

/// Path from `env_var` if set, else `default`
pub fn resolve_config_path(env_var: &str, default: &str) -> PathBuf {
    std::env::var(env_var)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(default))
}

/// Convenience function to load configuration from an explicit path
pub fn load_config(path: impl AsRef<Path>) -> Result<AppConfig> {
    AppConfig::load(Some(path.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_are_valid() {
        AppConfig::default().validate().unwrap();
    }

    #[test]
    fn test_load_file_overrides_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("digitbot.toml");

        let config_content = r#"
[trading]
stake = "2.50"
martingale_multiplier = 2.1
prediction_pre_loss = 1
prediction_post_loss = 5
stop_loss_limit = "25"
mode = "fixed"
instrument = "R_50"
strategy = "under"

[scorer]
threshold_pct = "60"

[feed]
instruments = ["R_10", "R_50"]
window_capacity = 200
"#;

        fs::write(&config_path, config_content).unwrap();

        let config = AppConfig::load(Some(&config_path)).unwrap();

        assert_eq!(config.trading.stake, dec!(2.50));
        assert_eq!(config.trading.martingale_multiplier, dec!(2.1));
        assert_eq!(config.trading.prediction_post_loss.value(), 5);
        assert_eq!(config.trading.stop_loss_limit, dec!(25));
        assert_eq!(config.trading.mode, TradeMode::Fixed);
        assert_eq!(config.trading.strategy, DigitStrategy::Under);
        assert_eq!(config.trading.instrument, InstrumentId::new("R_50"));
        assert_eq!(config.scorer.threshold_pct, dec!(60));
        assert_eq!(config.feed.window_capacity, 200);
        assert_eq!(config.feed.instruments.len(), 2);
        // Untouched fields keep defaults
        assert_eq!(config.scorer.damping_factor, dec!(0.5));
        assert_eq!(config.trade_loop.cooldown_ms, 1_100);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let config = AppConfig::load(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config.trading.stake, dec!(1.00));
        assert_eq!(config.feed.instruments.len(), 5);
    }

    #[test]
    fn test_multiplier_below_one_rejected() {
        let mut config = AppConfig::default();
        config.trading.martingale_multiplier = dec!(0.9);
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "trading.martingale_multiplier",
                ..
            }
        ));
    }

    #[test]
    fn test_stake_below_platform_minimum_rejected() {
        let mut trading = TradingConfig::default();
        trading.stake = dec!(0.20);
        assert!(trading.validate().is_err());
    }

    #[test]
    fn test_unwinnable_fixed_prediction_rejected() {
        let mut trading = TradingConfig::default();
        trading.mode = TradeMode::Fixed;
        trading.strategy = DigitStrategy::Over;
        trading.prediction_post_loss = Digit::NINE;
        assert!(trading.validate().is_err());

        trading.strategy = DigitStrategy::Even;
        assert!(trading.validate().is_ok());
    }

    #[test]
    fn test_scorer_bounds() {
        let mut scorer = ScorerConfig::default();
        scorer.threshold_pct = dec!(45);
        assert!(scorer.validate().is_err());

        let mut scorer = ScorerConfig::default();
        scorer.differs_threshold_pct = dec!(12);
        assert!(scorer.validate().is_err());
    }

    #[test]
    fn test_duration_accessors() {
        let config = AppConfig::default();
        assert_eq!(config.trade_loop.cooldown(), Duration::from_millis(1_100));
        assert_eq!(config.scorer.max_staleness(), Duration::from_secs(30));
        assert_eq!(config.feed.recompute_interval(), Duration::from_secs(1));
    }
}

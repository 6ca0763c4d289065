//! Martingale stake progression
//!
//! Two states: `Base` and `Recovering(n)`. A win always returns to base; a
//! loss moves to `Recovering(min(n + 1, loss_cap))`. The stake in any state is
//! `base * multiplier^n`, so it never drifts from the loss count.

use digitbot_config::{ConfigError, TradingConfig};
use digitbot_types::{Digit, TradeOutcome};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

use crate::error::{Result, StrategyError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StakePhase {
    Base,
    Recovering(u32),
}

/// Read-only view of the controller
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StakeState {
    pub base_stake: Decimal,
    pub current_stake: Decimal,
    pub martingale_multiplier: Decimal,
    pub consecutive_losses: u32,
    pub last_outcome_was_loss: bool,
    pub active_prediction: Digit,
    pub phase: StakePhase,
}

#[derive(Debug, Clone)]
pub struct StakeController {
    base_stake: Decimal,
    multiplier: Decimal,
    loss_cap: u32,
    min_stake: Decimal,
    prediction_pre_loss: Digit,
    prediction_post_loss: Digit,
    consecutive_losses: u32,
    last_outcome_was_loss: bool,
    /// Bumped on every reset; outcomes of contracts bought in an older
    /// epoch no longer belong to this ladder
    epoch: u64,
}

fn invalid(field: &'static str, reason: impl Into<String>) -> StrategyError {
    StrategyError::Configuration(ConfigError::Invalid {
        field,
        reason: reason.into(),
    })
}

impl StakeController {
    pub fn new(config: &TradingConfig) -> Result<Self> {
        let controller = Self {
            base_stake: config.stake,
            multiplier: config.martingale_multiplier,
            loss_cap: config.loss_cap,
            min_stake: config.min_stake,
            prediction_pre_loss: config.prediction_pre_loss,
            prediction_post_loss: config.prediction_post_loss,
            consecutive_losses: 0,
            last_outcome_was_loss: false,
            epoch: 0,
        };
        controller.validate()?;
        Ok(controller)
    }

    fn validate(&self) -> Result<()> {
        if self.multiplier < Decimal::ONE {
            return Err(invalid(
                "trading.martingale_multiplier",
                format!("must be ≥ 1, got {}", self.multiplier),
            ));
        }
        if self.loss_cap == 0 {
            return Err(invalid("trading.loss_cap", "must be ≥ 1"));
        }
        Self::check_base(self.base_stake, self.min_stake)?;
        if self.stake_at(self.loss_cap).is_none() {
            return Err(invalid(
                "trading.loss_cap",
                format!(
                    "{} x {}^{} does not fit a decimal",
                    self.base_stake, self.multiplier, self.loss_cap
                ),
            ));
        }
        Ok(())
    }

    fn check_base(base: Decimal, min_stake: Decimal) -> Result<()> {
        if base <= Decimal::ZERO {
            return Err(invalid("trading.stake", "must be > 0"));
        }
        if base < min_stake {
            return Err(invalid(
                "trading.stake",
                format!("{} is below the platform minimum {}", base, min_stake),
            ));
        }
        Ok(())
    }

    fn stake_at(&self, losses: u32) -> Option<Decimal> {
        (0..losses).try_fold(self.base_stake, |stake, _| stake.checked_mul(self.multiplier))
    }

    /// Apply a settled outcome
    pub fn record(&mut self, outcome: TradeOutcome) -> StakeState {
        match outcome {
            TradeOutcome::Win => self.on_win(),
            TradeOutcome::Loss => self.on_loss(),
        }
    }

    pub fn on_win(&mut self) -> StakeState {
        self.consecutive_losses = 0;
        self.last_outcome_was_loss = false;
        debug!("Win: stake back to base {}", self.base_stake);
        self.snapshot()
    }

    pub fn on_loss(&mut self) -> StakeState {
        self.consecutive_losses = (self.consecutive_losses + 1).min(self.loss_cap);
        self.last_outcome_was_loss = true;
        debug!(
            "Loss #{}: next stake {}",
            self.consecutive_losses,
            self.next_stake()
        );
        self.snapshot()
    }

    /// Back to base without an outcome, e.g. when the traded target changes
    pub fn reset(&mut self) {
        self.consecutive_losses = 0;
        self.last_outcome_was_loss = false;
        self.epoch = self.epoch.wrapping_add(1);
    }

    /// Ladder generation, advanced by `reset`
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Replace the base stake; the ladder restarts from the new base
    pub fn set_base_stake(&mut self, base_stake: Decimal) -> Result<()> {
        Self::check_base(base_stake, self.min_stake)?;
        let previous = self.base_stake;
        self.base_stake = base_stake;
        if self.stake_at(self.loss_cap).is_none() {
            self.base_stake = previous;
            return Err(invalid("trading.stake", "stake ladder overflows at the loss cap"));
        }
        self.reset();
        Ok(())
    }

    pub fn next_stake(&self) -> Decimal {
        // Construction checked the ladder fits at the cap
        self.stake_at(self.consecutive_losses)
            .unwrap_or(Decimal::MAX)
    }

    pub fn next_prediction(&self) -> Digit {
        if self.last_outcome_was_loss {
            self.prediction_post_loss
        } else {
            self.prediction_pre_loss
        }
    }

    pub fn phase(&self) -> StakePhase {
        match self.consecutive_losses {
            0 => StakePhase::Base,
            n => StakePhase::Recovering(n),
        }
    }

    pub fn consecutive_losses(&self) -> u32 {
        self.consecutive_losses
    }

    pub fn base_stake(&self) -> Decimal {
        self.base_stake
    }

    pub fn loss_cap(&self) -> u32 {
        self.loss_cap
    }

    pub fn snapshot(&self) -> StakeState {
        StakeState {
            base_stake: self.base_stake,
            current_stake: self.next_stake(),
            martingale_multiplier: self.multiplier,
            consecutive_losses: self.consecutive_losses,
            last_outcome_was_loss: self.last_outcome_was_loss,
            active_prediction: self.next_prediction(),
            phase: self.phase(),
        }
    }
}

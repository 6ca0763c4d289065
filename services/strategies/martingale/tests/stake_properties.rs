//! Stake Ladder Property Tests
//!
//! The stake must equal `base * multiplier^min(losses, cap)` after any
//! sequence of outcomes, and a win must always restore the base stake.

use digitbot_config::TradingConfig;
use digitbot_types::TradeOutcome;
use martingale::{StakeController, StakePhase};
use proptest::prelude::*;
use rust_decimal::Decimal;

fn outcome_strategy() -> impl Strategy<Value = TradeOutcome> {
    prop_oneof![Just(TradeOutcome::Win), Just(TradeOutcome::Loss)]
}

fn config(base_cents: i64, multiplier_tenths: i64, loss_cap: u32) -> TradingConfig {
    TradingConfig {
        stake: Decimal::new(base_cents, 2),
        martingale_multiplier: Decimal::new(multiplier_tenths, 1),
        loss_cap,
        ..TradingConfig::default()
    }
}

fn expected_stake(base: Decimal, multiplier: Decimal, losses: u32) -> Decimal {
    (0..losses).fold(base, |stake, _| stake * multiplier)
}

proptest! {
    /// Property: stake follows the closed form after every outcome
    #[test]
    fn stake_matches_closed_form(
        base_cents in 35i64..10_000,
        multiplier_tenths in 10i64..=30,
        loss_cap in 1u32..=12,
        outcomes in prop::collection::vec(outcome_strategy(), 0..60),
    ) {
        let config = config(base_cents, multiplier_tenths, loss_cap);
        let mut stake = StakeController::new(&config).unwrap();
        let mut losses = 0u32;

        for outcome in outcomes {
            stake.record(outcome);
            losses = match outcome {
                TradeOutcome::Win => 0,
                TradeOutcome::Loss => (losses + 1).min(loss_cap),
            };

            let state = stake.snapshot();
            prop_assert_eq!(state.consecutive_losses, losses);
            prop_assert_eq!(
                state.current_stake,
                expected_stake(config.stake, config.martingale_multiplier, losses)
            );
            prop_assert!(state.current_stake >= config.min_stake);
            prop_assert!(state.current_stake > Decimal::ZERO);
        }
    }

    /// Property: a win restores base stake and pre-loss prediction from any state
    #[test]
    fn win_always_resets(
        outcomes in prop::collection::vec(outcome_strategy(), 0..40),
    ) {
        let config = TradingConfig::default();
        let mut stake = StakeController::new(&config).unwrap();
        for outcome in outcomes {
            stake.record(outcome);
        }

        let state = stake.on_win();
        prop_assert_eq!(state.current_stake, config.stake);
        prop_assert_eq!(state.active_prediction, config.prediction_pre_loss);
        prop_assert_eq!(state.phase, StakePhase::Base);
    }

    /// Property: the prediction depends only on the last outcome
    #[test]
    fn prediction_tracks_last_outcome(
        outcomes in prop::collection::vec(outcome_strategy(), 1..40),
    ) {
        let config = TradingConfig::default();
        let mut stake = StakeController::new(&config).unwrap();
        for outcome in &outcomes {
            stake.record(*outcome);
        }

        let expected = match outcomes.last() {
            Some(TradeOutcome::Loss) => config.prediction_post_loss,
            _ => config.prediction_pre_loss,
        };
        prop_assert_eq!(stake.next_prediction(), expected);
    }
}

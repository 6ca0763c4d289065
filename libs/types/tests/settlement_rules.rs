//! Settlement Rule Validation
//!
//! Checks the digit contract rules and the quote digit extraction together,
//! the way a settled tick is actually judged.

use digitbot_types::{Digit, DigitStrategy, Quote, TradeOutcome};
use proptest::prelude::*;
use rust_decimal_macros::dec;

fn winners(strategy: DigitStrategy, barrier: Option<Digit>) -> usize {
    Digit::all().filter(|d| strategy.wins(*d, barrier)).count()
}

#[test]
fn test_winning_digit_counts() {
    for b in 0..=9u8 {
        let barrier = Some(Digit::new(b).unwrap());
        assert_eq!(winners(DigitStrategy::Over, barrier), 9 - b as usize);
        assert_eq!(winners(DigitStrategy::Under, barrier), b as usize);
        assert_eq!(winners(DigitStrategy::Matches, barrier), 1);
        assert_eq!(winners(DigitStrategy::Differs, barrier), 9);
    }
    assert_eq!(winners(DigitStrategy::Even, None), 5);
    assert_eq!(winners(DigitStrategy::Odd, None), 5);
}

#[test]
fn test_barrier_contract_without_barrier_never_wins() {
    for strategy in [
        DigitStrategy::Over,
        DigitStrategy::Under,
        DigitStrategy::Matches,
        DigitStrategy::Differs,
    ] {
        assert!(strategy.requires_barrier());
        assert_eq!(winners(strategy, None), 0);
    }
}

#[test]
fn test_trailing_zero_quote_settles_on_zero() {
    // 1234.5 quoted at two decimals is 1234.50
    let quote = Quote::from_f64(1234.5, Some(2)).unwrap();
    assert!(DigitStrategy::Even.wins(quote.last_digit(), None));

    let three_dp = Quote::from_f64(987.125, Some(3)).unwrap();
    assert_eq!(three_dp.last_digit().value(), 5);
}

#[test]
fn test_break_even_is_a_loss() {
    assert_eq!(TradeOutcome::from_profit(dec!(0)), TradeOutcome::Loss);
    assert_eq!(TradeOutcome::from_profit(dec!(0.01)), TradeOutcome::Win);
}

proptest! {
    /// Property: the last digit of a two-decimal quote is its cents modulo 10
    #[test]
    fn quote_digit_matches_cents(cents in 1u64..100_000_000) {
        let quote = Quote::from_f64(cents as f64 / 100.0, Some(2)).unwrap();
        prop_assert_eq!(quote.scale(), 2);
        prop_assert_eq!(quote.last_digit().value() as u64, cents % 10);
    }

    /// Property: even and odd partition every exit digit
    #[test]
    fn parity_is_exclusive(d in 0u8..=9) {
        let digit = Digit::new(d).unwrap();
        prop_assert!(DigitStrategy::Even.wins(digit, None) != DigitStrategy::Odd.wins(digit, None));
    }
}

//! Digits, digit-contract strategies and settlement outcomes

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::errors::ValidationError;

/// A single decimal digit, 0 through 9
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Digit(u8);

impl Digit {
    pub const ZERO: Digit = Digit(0);
    pub const NINE: Digit = Digit(9);

    pub fn new(value: u8) -> Result<Self, ValidationError> {
        if value > 9 {
            return Err(ValidationError::ValueOutOfRange {
                value: value as i64,
                min: 0,
                max: 9,
            });
        }
        Ok(Self(value))
    }

    /// Values above 9 clamp to 9; for compile-time defaults
    pub const fn clamped(value: u8) -> Self {
        if value > 9 {
            Digit(9)
        } else {
            Digit(value)
        }
    }

    /// Reduce any integer to its last decimal digit
    pub(crate) fn from_mantissa(mantissa: i128) -> Self {
        Self((mantissa.unsigned_abs() % 10) as u8)
    }

    #[inline(always)]
    pub const fn value(&self) -> u8 {
        self.0
    }

    #[inline(always)]
    pub const fn index(&self) -> usize {
        self.0 as usize
    }

    pub fn is_even(&self) -> bool {
        self.0 % 2 == 0
    }

    /// All ten digits in ascending order
    pub fn all() -> impl Iterator<Item = Digit> {
        (0u8..=9).map(Digit)
    }
}

impl TryFrom<u8> for Digit {
    type Error = ValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Digit::new(value)
    }
}

impl From<Digit> for u8 {
    fn from(digit: Digit) -> u8 {
        digit.0
    }
}

impl fmt::Display for Digit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Digit-contract family
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigitStrategy {
    Over,
    Under,
    Even,
    Odd,
    Matches,
    Differs,
}

impl DigitStrategy {
    /// Contract type code the brokerage expects on purchase
    pub fn contract_type(&self) -> &'static str {
        match self {
            DigitStrategy::Over => "DIGITOVER",
            DigitStrategy::Under => "DIGITUNDER",
            DigitStrategy::Even => "DIGITEVEN",
            DigitStrategy::Odd => "DIGITODD",
            DigitStrategy::Matches => "DIGITMATCH",
            DigitStrategy::Differs => "DIGITDIFF",
        }
    }

    /// Whether the contract needs a barrier digit (the prediction)
    pub fn requires_barrier(&self) -> bool {
        !matches!(self, DigitStrategy::Even | DigitStrategy::Odd)
    }

    /// Settlement rule: does `exit_digit` win against `barrier`?
    ///
    /// Returns false when a barrier is required but missing.
    pub fn wins(&self, exit_digit: Digit, barrier: Option<Digit>) -> bool {
        match (self, barrier) {
            (DigitStrategy::Even, _) => exit_digit.is_even(),
            (DigitStrategy::Odd, _) => !exit_digit.is_even(),
            (DigitStrategy::Over, Some(b)) => exit_digit > b,
            (DigitStrategy::Under, Some(b)) => exit_digit < b,
            (DigitStrategy::Matches, Some(b)) => exit_digit == b,
            (DigitStrategy::Differs, Some(b)) => exit_digit != b,
            _ => false,
        }
    }
}

impl fmt::Display for DigitStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DigitStrategy::Over => "over",
            DigitStrategy::Under => "under",
            DigitStrategy::Even => "even",
            DigitStrategy::Odd => "odd",
            DigitStrategy::Matches => "matches",
            DigitStrategy::Differs => "differs",
        };
        f.write_str(name)
    }
}

/// Threshold a recommendation is evaluated against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Barrier {
    Digit(Digit),
    /// Category marker for even/odd, which have no digit barrier
    Parity,
}

impl Barrier {
    pub fn digit(&self) -> Option<Digit> {
        match self {
            Barrier::Digit(d) => Some(*d),
            Barrier::Parity => None,
        }
    }
}

impl fmt::Display for Barrier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Barrier::Digit(d) => write!(f, "{}", d),
            Barrier::Parity => f.write_str("parity"),
        }
    }
}

/// Result of a settled contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeOutcome {
    Win,
    Loss,
}

impl TradeOutcome {
    /// Strictly positive profit is a win; break-even counts as a loss
    pub fn from_profit(profit: Decimal) -> Self {
        if profit > Decimal::ZERO {
            TradeOutcome::Win
        } else {
            TradeOutcome::Loss
        }
    }
}

impl fmt::Display for TradeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeOutcome::Win => f.write_str("WIN"),
            TradeOutcome::Loss => f.write_str("LOSS"),
        }
    }
}

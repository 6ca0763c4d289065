//! Last-digit distribution statistics over a tick window

use digitbot_config::{ScorerConfig, TradingConfig};
use digitbot_types::{Digit, DigitStrategy, InstrumentId};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::tick_window::TickWindow;

/// Category boundaries and the reliability floor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatisticsParams {
    /// Over category is `digit > over_barrier`
    pub over_barrier: Digit,
    /// Under category is `digit < under_barrier`
    pub under_barrier: Digit,
    pub min_sample_size: usize,
}

impl StatisticsParams {
    pub fn from_config(scorer: &ScorerConfig, trading: &TradingConfig) -> Self {
        Self {
            over_barrier: scorer.over_barrier,
            under_barrier: scorer.under_barrier,
            min_sample_size: trading.min_sample_size,
        }
    }
}

impl Default for StatisticsParams {
    fn default() -> Self {
        Self::from_config(&ScorerConfig::default(), &TradingConfig::default())
    }
}

/// Run lengths ending at the newest tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Streaks {
    pub even: usize,
    pub odd: usize,
    pub over: usize,
    pub under: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DigitStatistics {
    pub instrument: InstrumentId,
    pub total: usize,
    /// Occurrences per digit, indexed by digit value
    pub frequency: [usize; 10],
    pub streaks: Streaks,
    pub most_frequent: Option<Digit>,
    pub least_frequent: Option<Digit>,
    pub over_barrier: Digit,
    pub under_barrier: Digit,
    /// False when `total < min_sample_size`; the numbers are then unreliable
    pub sample_sufficient: bool,
    pub last_digit: Option<Digit>,
}

impl DigitStatistics {
    pub fn compute(window: &TickWindow, params: &StatisticsParams) -> Self {
        Self::from_digits(window.instrument().clone(), &window.last_digits(), params)
    }

    /// Build from last digits ordered oldest first
    pub fn from_digits(instrument: InstrumentId, digits: &[Digit], params: &StatisticsParams) -> Self {
        let mut frequency = [0usize; 10];
        for digit in digits {
            frequency[digit.index()] += 1;
        }

        let streaks = Streaks {
            even: run_length(digits, |d| d.is_even()),
            odd: run_length(digits, |d| !d.is_even()),
            over: run_length(digits, |d| d > params.over_barrier),
            under: run_length(digits, |d| d < params.under_barrier),
        };

        // Strict comparisons keep the lowest digit on ties
        let (most_frequent, least_frequent) = if digits.is_empty() {
            (None, None)
        } else {
            let mut most = Digit::ZERO;
            let mut least = Digit::ZERO;
            for digit in Digit::all() {
                if frequency[digit.index()] > frequency[most.index()] {
                    most = digit;
                }
                if frequency[digit.index()] < frequency[least.index()] {
                    least = digit;
                }
            }
            (Some(most), Some(least))
        };

        Self {
            instrument,
            total: digits.len(),
            frequency,
            streaks,
            most_frequent,
            least_frequent,
            over_barrier: params.over_barrier,
            under_barrier: params.under_barrier,
            sample_sufficient: digits.len() >= params.min_sample_size,
            last_digit: digits.last().copied(),
        }
    }

    pub fn count(&self, digit: Digit) -> usize {
        self.frequency[digit.index()]
    }

    pub fn even_count(&self) -> usize {
        Digit::all().filter(Digit::is_even).map(|d| self.count(d)).sum()
    }

    pub fn odd_count(&self) -> usize {
        self.total - self.even_count()
    }

    pub fn over_count(&self) -> usize {
        Digit::all()
            .filter(|d| *d > self.over_barrier)
            .map(|d| self.count(d))
            .sum()
    }

    pub fn under_count(&self) -> usize {
        Digit::all()
            .filter(|d| *d < self.under_barrier)
            .map(|d| self.count(d))
            .sum()
    }

    /// Share of the window, in percent, falling in a binary category.
    ///
    /// `None` for matches/differs, which are per-digit; see [`Self::digit_share_pct`].
    pub fn share_pct(&self, category: DigitStrategy) -> Option<Decimal> {
        let count = match category {
            DigitStrategy::Even => self.even_count(),
            DigitStrategy::Odd => self.odd_count(),
            DigitStrategy::Over => self.over_count(),
            DigitStrategy::Under => self.under_count(),
            DigitStrategy::Matches | DigitStrategy::Differs => return None,
        };
        Some(self.pct(count))
    }

    pub fn digit_share_pct(&self, digit: Digit) -> Decimal {
        self.pct(self.count(digit))
    }

    /// Frequency keyed by digit, all ten present
    pub fn frequency_map(&self) -> BTreeMap<Digit, usize> {
        Digit::all().map(|d| (d, self.count(d))).collect()
    }

    fn pct(&self, count: usize) -> Decimal {
        if self.total == 0 {
            return Decimal::ZERO;
        }
        Decimal::from(count as u64) * Decimal::ONE_HUNDRED / Decimal::from(self.total as u64)
    }
}

/// Consecutive matches counted back from the newest digit
fn run_length(digits: &[Digit], predicate: impl Fn(Digit) -> bool) -> usize {
    digits.iter().rev().take_while(|d| predicate(**d)).count()
}

//! Trade recommendation definitions

use chrono::{DateTime, Utc};
use digitbot_types::{Barrier, Digit, DigitStrategy, InstrumentId};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use std::cmp::Ordering;
use std::time::Duration;

/// A scored instrument/contract-type pick
///
/// Recommendations are never mutated once built; a better pick supersedes
/// the old one instead.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeRecommendation {
    pub instrument: InstrumentId,
    pub strategy: DigitStrategy,
    pub barrier: Barrier,

    /// Confidence in percent, within [0, cap]
    pub confidence_pct: Decimal,

    /// Human-readable reason for the pick
    pub reason: String,

    pub generated_at: DateTime<Utc>,

    /// Window size the statistics were computed over
    pub sample_size: usize,
}

impl TradeRecommendation {
    /// Barrier digit to send as the contract prediction, if the strategy takes one
    pub fn prediction(&self) -> Option<Digit> {
        self.barrier.digit()
    }

    /// Same instrument and strategy as `other`
    pub fn same_target(&self, other: &TradeRecommendation) -> bool {
        self.instrument == other.instrument && self.strategy == other.strategy
    }

    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.generated_at).to_std().unwrap_or(Duration::ZERO)
    }

    pub fn strength(&self) -> SignalStrength {
        match self.confidence_pct {
            c if c >= dec!(85) => SignalStrength::VeryStrong,
            c if c >= dec!(75) => SignalStrength::Strong,
            c if c >= dec!(65) => SignalStrength::Moderate,
            c if c >= dec!(55) => SignalStrength::Weak,
            _ => SignalStrength::VeryWeak,
        }
    }

    /// Ranking order: confidence descending, then instrument, then strategy
    pub fn rank_cmp(&self, other: &TradeRecommendation) -> Ordering {
        other
            .confidence_pct
            .cmp(&self.confidence_pct)
            .then_with(|| self.instrument.cmp(&other.instrument))
            .then_with(|| self.strategy.cmp(&other.strategy))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum SignalStrength {
    VeryWeak,
    Weak,
    Moderate,
    Strong,
    VeryStrong,
}

/// Scoring pass statistics
#[derive(Debug, Default, Clone)]
pub struct SignalStats {
    pub evaluations: u64,
    /// Passes that produced at least one recommendation
    pub scored_passes: u64,
    pub recommendations: u64,
    pub top_changes: u64,
    pub insufficient_samples: u64,
    pub avg_top_confidence: Decimal,
    pub last_evaluation: Option<DateTime<Utc>>,
}

impl SignalStats {
    /// Update with one evaluation pass
    pub fn record_evaluation(
        &mut self,
        ranked: &[TradeRecommendation],
        insufficient: usize,
        at: DateTime<Utc>,
    ) {
        self.evaluations += 1;
        self.recommendations += ranked.len() as u64;
        self.insufficient_samples += insufficient as u64;

        if let Some(top) = ranked.first() {
            self.scored_passes += 1;
            let scored = Decimal::from(self.scored_passes);
            self.avg_top_confidence =
                (self.avg_top_confidence * (scored - Decimal::ONE) + top.confidence_pct) / scored;
        }

        self.last_evaluation = Some(at);
    }

    pub fn record_top_change(&mut self) {
        self.top_changes += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recommendation(instrument: &str, strategy: DigitStrategy, confidence: Decimal) -> TradeRecommendation {
        TradeRecommendation {
            instrument: InstrumentId::new(instrument),
            strategy,
            barrier: Barrier::Parity,
            confidence_pct: confidence,
            reason: "test".to_string(),
            generated_at: Utc::now(),
            sample_size: 100,
        }
    }

    #[test]
    fn test_strength_bands() {
        assert_eq!(
            recommendation("R_10", DigitStrategy::Even, dec!(90)).strength(),
            SignalStrength::VeryStrong
        );
        assert_eq!(
            recommendation("R_10", DigitStrategy::Even, dec!(80)).strength(),
            SignalStrength::Strong
        );
        assert_eq!(
            recommendation("R_10", DigitStrategy::Even, dec!(57.5)).strength(),
            SignalStrength::Weak
        );
    }

    #[test]
    fn test_rank_order_breaks_ties_by_instrument() {
        let a = recommendation("R_10", DigitStrategy::Odd, dec!(70));
        let b = recommendation("R_25", DigitStrategy::Even, dec!(70));
        let c = recommendation("R_50", DigitStrategy::Even, dec!(75));

        let mut ranked = vec![b.clone(), a.clone(), c.clone()];
        ranked.sort_by(TradeRecommendation::rank_cmp);

        assert_eq!(ranked, vec![c, a, b]);
    }

    #[test]
    fn test_signal_stats() {
        let mut stats = SignalStats::default();
        let now = Utc::now();

        stats.record_evaluation(&[recommendation("R_10", DigitStrategy::Even, dec!(80))], 0, now);
        stats.record_evaluation(&[], 5, now);
        stats.record_evaluation(&[recommendation("R_10", DigitStrategy::Even, dec!(60))], 2, now);

        assert_eq!(stats.evaluations, 3);
        assert_eq!(stats.scored_passes, 2);
        assert_eq!(stats.recommendations, 2);
        assert_eq!(stats.insufficient_samples, 7);
        assert_eq!(stats.avg_top_confidence, dec!(70));
    }
}

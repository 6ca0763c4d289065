//! Digit-distribution scoring and the published top pick
//!
//! Scoring is a pure function of [`DigitStatistics`]. Every constant involved
//! (threshold, damping, cap, matches/differs bands, hysteresis) is heuristic
//! and lives in [`ScorerConfig`] so it can be tuned without a rebuild.

use chrono::Utc;
use digitbot_config::ScorerConfig;
use digitbot_types::{Barrier, Digit, DigitStrategy};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, trace};

use crate::signals::TradeRecommendation;
use crate::statistics::DigitStatistics;

const FIFTY: Decimal = dec!(50);
/// Expected share of any single digit under a uniform distribution
const UNIFORM_DIGIT_PCT: Decimal = dec!(10);

/// Binary categories scored on their share of the window
const BINARY_CATEGORIES: [DigitStrategy; 4] = [
    DigitStrategy::Even,
    DigitStrategy::Odd,
    DigitStrategy::Over,
    DigitStrategy::Under,
];

#[derive(Debug, Clone)]
pub struct SignalScorer {
    config: ScorerConfig,
}

impl SignalScorer {
    pub fn new(config: ScorerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScorerConfig {
        &self.config
    }

    /// Confidence for a binary split whose dominant side holds `share_pct`.
    ///
    /// `None` at or below the threshold.
    pub fn binary_confidence(&self, share_pct: Decimal) -> Option<Decimal> {
        if share_pct <= self.config.threshold_pct {
            return None;
        }
        let raw = share_pct + (share_pct - FIFTY) * self.config.damping_factor;
        Some(self.clamp(raw))
    }

    /// Confidence for a single digit that deviates from the 10% expectation
    pub fn digit_confidence(&self, share_pct: Decimal) -> Decimal {
        let deviation = (share_pct - UNIFORM_DIGIT_PCT).abs();
        self.clamp(FIFTY + deviation * self.config.digit_deviation_weight)
    }

    /// All viable recommendations for one instrument, best first.
    ///
    /// Empty when the sample is below the configured minimum.
    pub fn score(&self, stats: &DigitStatistics) -> Vec<TradeRecommendation> {
        if !stats.sample_sufficient {
            trace!(
                "Skipping {}: {} ticks is below the minimum sample",
                stats.instrument,
                stats.total
            );
            return Vec::new();
        }

        let generated_at = Utc::now();
        let mut recommendations = Vec::new();

        for category in BINARY_CATEGORIES {
            let Some(share) = stats.share_pct(category) else {
                continue;
            };
            let Some(confidence) = self.binary_confidence(share) else {
                continue;
            };
            let barrier = match category {
                DigitStrategy::Over => Barrier::Digit(stats.over_barrier),
                DigitStrategy::Under => Barrier::Digit(stats.under_barrier),
                _ => Barrier::Parity,
            };
            recommendations.push(TradeRecommendation {
                instrument: stats.instrument.clone(),
                strategy: category,
                barrier,
                confidence_pct: confidence,
                reason: format!(
                    "{} {}% of last {} ticks (threshold {}%)",
                    category_label(category, barrier),
                    share.round_dp(1),
                    stats.total,
                    self.config.threshold_pct
                ),
                generated_at,
                sample_size: stats.total,
            });
        }

        if let Some(digit) = stats.most_frequent {
            let share = stats.digit_share_pct(digit);
            if share > self.config.matches_threshold_pct {
                recommendations.push(self.digit_recommendation(
                    stats,
                    DigitStrategy::Matches,
                    digit,
                    share,
                    generated_at,
                ));
            }
        }

        if let Some(digit) = stats.least_frequent {
            let share = stats.digit_share_pct(digit);
            if share < self.config.differs_threshold_pct {
                recommendations.push(self.digit_recommendation(
                    stats,
                    DigitStrategy::Differs,
                    digit,
                    share,
                    generated_at,
                ));
            }
        }

        recommendations.sort_by(TradeRecommendation::rank_cmp);
        debug!(
            "Scored {}: {} recommendation(s) from {} ticks",
            stats.instrument,
            recommendations.len(),
            stats.total
        );
        recommendations
    }

    /// Score several instruments and merge into one ranking
    pub fn rank(&self, all_stats: &[DigitStatistics]) -> Vec<TradeRecommendation> {
        let mut ranked: Vec<TradeRecommendation> =
            all_stats.iter().flat_map(|stats| self.score(stats)).collect();
        ranked.sort_by(TradeRecommendation::rank_cmp);
        ranked
    }

    fn digit_recommendation(
        &self,
        stats: &DigitStatistics,
        strategy: DigitStrategy,
        digit: Digit,
        share: Decimal,
        generated_at: chrono::DateTime<Utc>,
    ) -> TradeRecommendation {
        let reason = match strategy {
            DigitStrategy::Matches => format!(
                "digit {} hot at {}% of last {} ticks",
                digit,
                share.round_dp(1),
                stats.total
            ),
            _ => format!(
                "digit {} cold at {}% of last {} ticks",
                digit,
                share.round_dp(1),
                stats.total
            ),
        };
        TradeRecommendation {
            instrument: stats.instrument.clone(),
            strategy,
            barrier: Barrier::Digit(digit),
            confidence_pct: self.digit_confidence(share),
            reason,
            generated_at,
            sample_size: stats.total,
        }
    }

    fn clamp(&self, confidence: Decimal) -> Decimal {
        confidence
            .min(self.config.confidence_cap_pct)
            .max(Decimal::ZERO)
    }
}

fn category_label(category: DigitStrategy, barrier: Barrier) -> String {
    match barrier {
        Barrier::Digit(digit) => format!("{} {}", category, digit),
        Barrier::Parity => category.to_string(),
    }
}

/// Why a published recommendation was superseded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceReason {
    InstrumentChanged,
    StrategyChanged,
    ConfidenceShift,
    Stale,
}

/// Outcome of offering a candidate to the publisher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishDecision {
    /// First recommendation after an empty state
    Initial,
    Replaced(ReplaceReason),
    /// Candidate too similar; the previous recommendation stays published
    Retained,
    /// No candidate and the previous one went stale
    Cleared,
    /// Nothing published, nothing offered
    Empty,
}

impl PublishDecision {
    /// Whether the published value changed
    pub fn changed(&self) -> bool {
        matches!(
            self,
            PublishDecision::Initial | PublishDecision::Replaced(_) | PublishDecision::Cleared
        )
    }
}

/// Holds the top recommendation and suppresses flicker between near-equal picks
#[derive(Debug)]
pub struct RecommendationPublisher {
    hysteresis_pct: Decimal,
    max_staleness: std::time::Duration,
    current: Option<(Arc<TradeRecommendation>, Instant)>,
}

impl RecommendationPublisher {
    pub fn new(config: &ScorerConfig) -> Self {
        Self {
            hysteresis_pct: config.hysteresis_pct,
            max_staleness: config.max_staleness(),
            current: None,
        }
    }

    pub fn current(&self) -> Option<Arc<TradeRecommendation>> {
        self.current.as_ref().map(|(rec, _)| Arc::clone(rec))
    }

    /// Offer the latest best candidate; replaces the published value only
    /// when the target changed, confidence moved past the hysteresis band,
    /// or the published value is stale
    pub fn offer(&mut self, candidate: Option<TradeRecommendation>, now: Instant) -> PublishDecision {
        let decision = match (&self.current, &candidate) {
            (None, None) => PublishDecision::Empty,
            (None, Some(_)) => PublishDecision::Initial,
            (Some((_, published_at)), None) => {
                if self.is_stale(*published_at, now) {
                    PublishDecision::Cleared
                } else {
                    PublishDecision::Retained
                }
            }
            (Some((published, published_at)), Some(next)) => {
                match self.replace_reason(published, *published_at, next, now) {
                    Some(reason) => PublishDecision::Replaced(reason),
                    None => PublishDecision::Retained,
                }
            }
        };

        match decision {
            PublishDecision::Initial | PublishDecision::Replaced(_) => {
                if let Some(next) = candidate {
                    debug!(
                        "Publishing {} {} at {}% ({:?})",
                        next.instrument, next.strategy, next.confidence_pct, decision
                    );
                    self.current = Some((Arc::new(next), now));
                }
            }
            PublishDecision::Cleared => {
                debug!("Clearing stale recommendation");
                self.current = None;
            }
            PublishDecision::Retained | PublishDecision::Empty => {}
        }
        decision
    }

    pub fn clear(&mut self) {
        self.current = None;
    }

    fn replace_reason(
        &self,
        published: &TradeRecommendation,
        published_at: Instant,
        next: &TradeRecommendation,
        now: Instant,
    ) -> Option<ReplaceReason> {
        if published.instrument != next.instrument {
            return Some(ReplaceReason::InstrumentChanged);
        }
        if published.strategy != next.strategy {
            return Some(ReplaceReason::StrategyChanged);
        }
        if (next.confidence_pct - published.confidence_pct).abs() > self.hysteresis_pct {
            return Some(ReplaceReason::ConfidenceShift);
        }
        if self.is_stale(published_at, now) {
            return Some(ReplaceReason::Stale);
        }
        None
    }

    fn is_stale(&self, published_at: Instant, now: Instant) -> bool {
        now.saturating_duration_since(published_at) >= self.max_staleness
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statistics::StatisticsParams;
    use digitbot_types::InstrumentId;
    use std::time::Duration;

    fn d(v: u8) -> Digit {
        Digit::new(v).unwrap()
    }

    fn stats_from(instrument: &str, values: &[u8]) -> DigitStatistics {
        let digits: Vec<Digit> = values.iter().map(|v| d(*v)).collect();
        let params = StatisticsParams {
            over_barrier: d(4),
            under_barrier: d(5),
            min_sample_size: 10,
        };
        DigitStatistics::from_digits(InstrumentId::new(instrument), &digits, &params)
    }

    fn recommendation(instrument: &str, strategy: DigitStrategy, confidence: Decimal) -> TradeRecommendation {
        TradeRecommendation {
            instrument: InstrumentId::new(instrument),
            strategy,
            barrier: Barrier::Parity,
            confidence_pct: confidence,
            reason: String::new(),
            generated_at: Utc::now(),
            sample_size: 100,
        }
    }

    #[test]
    fn test_binary_confidence_formula() {
        let scorer = SignalScorer::new(ScorerConfig::default());

        assert_eq!(scorer.binary_confidence(dec!(70)), Some(dec!(80)));
        assert_eq!(scorer.binary_confidence(dec!(60)), Some(dec!(65)));
        // At the threshold nothing is emitted
        assert_eq!(scorer.binary_confidence(dec!(55)), None);
        // 100% dominance is capped
        assert_eq!(scorer.binary_confidence(dec!(100)), Some(dec!(90)));
    }

    #[test]
    fn test_seventy_thirty_even_split_scores_eighty() {
        // 70 even digits, 30 odd; evens spread over 0/2/4/6/8 and odds over 1/3/5/7/9
        // keep the over/under split near 50/50 and no single digit extreme
        let mut values = Vec::new();
        for i in 0..70u8 {
            values.push((i % 5) * 2);
        }
        for i in 0..30u8 {
            values.push((i % 5) * 2 + 1);
        }
        let stats = stats_from("R_100", &values);
        let scorer = SignalScorer::new(ScorerConfig::default());

        let recs = scorer.score(&stats);
        let even = recs
            .iter()
            .find(|r| r.strategy == DigitStrategy::Even)
            .expect("even recommendation");

        assert_eq!(even.confidence_pct, dec!(80));
        assert_eq!(even.barrier, Barrier::Parity);
        assert!(recs.iter().all(|r| r.strategy != DigitStrategy::Odd));
        assert_eq!(recs[0].strategy, DigitStrategy::Even);
    }

    #[test]
    fn test_zero_variance_window_is_capped() {
        let stats = stats_from("R_10", &[6; 40]);
        let scorer = SignalScorer::new(ScorerConfig::default());

        let recs = scorer.score(&stats);
        assert!(!recs.is_empty());
        assert!(recs.iter().all(|r| r.confidence_pct <= dec!(90)));

        let matches = recs.iter().find(|r| r.strategy == DigitStrategy::Matches).unwrap();
        assert_eq!(matches.barrier, Barrier::Digit(d(6)));
        let differs = recs.iter().find(|r| r.strategy == DigitStrategy::Differs).unwrap();
        // Lowest absent digit
        assert_eq!(differs.barrier, Barrier::Digit(d(0)));
        assert_eq!(differs.confidence_pct, dec!(75));
    }

    #[test]
    fn test_insufficient_sample_emits_nothing() {
        let stats = stats_from("R_10", &[2; 5]);
        let scorer = SignalScorer::new(ScorerConfig::default());
        assert!(scorer.score(&stats).is_empty());
    }

    #[test]
    fn test_uniform_window_emits_nothing() {
        let values: Vec<u8> = (0..100u8).map(|i| i % 10).collect();
        let stats = stats_from("R_25", &values);
        let scorer = SignalScorer::new(ScorerConfig::default());
        assert!(scorer.score(&stats).is_empty());
    }

    #[test]
    fn test_digit_confidence_monotonic() {
        let scorer = SignalScorer::new(ScorerConfig::default());
        assert!(scorer.digit_confidence(dec!(20)) > scorer.digit_confidence(dec!(16)));
        assert!(scorer.digit_confidence(dec!(2)) > scorer.digit_confidence(dec!(7)));
    }

    #[test]
    fn test_rank_merges_instruments() {
        let scorer = SignalScorer::new(ScorerConfig::default());
        let strong = stats_from("R_50", &[2; 20]);
        let mut weaker_values = vec![2u8; 13];
        weaker_values.extend([1u8, 3, 5, 7, 9, 1, 3]);
        let weaker = stats_from("R_75", &weaker_values);

        let ranked = scorer.rank(&[weaker, strong]);
        // Both reach the cap somewhere; equal confidence falls back to instrument order
        assert_eq!(ranked[0].instrument, InstrumentId::new("R_50"));
        assert!(ranked.iter().any(|r| r.instrument == InstrumentId::new("R_75")));
        for pair in ranked.windows(2) {
            assert!(pair[0].confidence_pct >= pair[1].confidence_pct);
        }
    }

    #[test]
    fn test_publisher_retains_within_hysteresis() {
        let mut publisher = RecommendationPublisher::new(&ScorerConfig::default());
        let t0 = Instant::now();

        let first = recommendation("R_100", DigitStrategy::Even, dec!(70));
        assert_eq!(publisher.offer(Some(first), t0), PublishDecision::Initial);
        let published = publisher.current().unwrap();

        let close = recommendation("R_100", DigitStrategy::Even, dec!(74));
        assert_eq!(
            publisher.offer(Some(close), t0 + Duration::from_secs(1)),
            PublishDecision::Retained
        );
        assert!(Arc::ptr_eq(&published, &publisher.current().unwrap()));

        let shifted = recommendation("R_100", DigitStrategy::Even, dec!(76));
        assert_eq!(
            publisher.offer(Some(shifted), t0 + Duration::from_secs(2)),
            PublishDecision::Replaced(ReplaceReason::ConfidenceShift)
        );
    }

    #[test]
    fn test_publisher_replaces_on_target_change() {
        let mut publisher = RecommendationPublisher::new(&ScorerConfig::default());
        let t0 = Instant::now();
        publisher.offer(Some(recommendation("R_100", DigitStrategy::Even, dec!(70))), t0);

        assert_eq!(
            publisher.offer(Some(recommendation("R_50", DigitStrategy::Even, dec!(70))), t0),
            PublishDecision::Replaced(ReplaceReason::InstrumentChanged)
        );
        assert_eq!(
            publisher.offer(Some(recommendation("R_50", DigitStrategy::Odd, dec!(70))), t0),
            PublishDecision::Replaced(ReplaceReason::StrategyChanged)
        );
    }

    #[test]
    fn test_publisher_staleness() {
        let mut publisher = RecommendationPublisher::new(&ScorerConfig::default());
        let t0 = Instant::now();
        publisher.offer(Some(recommendation("R_100", DigitStrategy::Even, dec!(70))), t0);

        // Missing candidate keeps the old pick until stale
        assert_eq!(publisher.offer(None, t0 + Duration::from_secs(10)), PublishDecision::Retained);
        assert!(publisher.current().is_some());

        assert_eq!(
            publisher.offer(
                Some(recommendation("R_100", DigitStrategy::Even, dec!(71))),
                t0 + Duration::from_secs(31)
            ),
            PublishDecision::Replaced(ReplaceReason::Stale)
        );

        assert_eq!(publisher.offer(None, t0 + Duration::from_secs(62)), PublishDecision::Cleared);
        assert!(publisher.current().is_none());
        assert_eq!(publisher.offer(None, t0 + Duration::from_secs(63)), PublishDecision::Empty);
    }
}

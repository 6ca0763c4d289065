//! # Digit Signals Strategy - Last-Digit Distribution Scoring
//!
//! ## Purpose
//!
//! Watches rolling windows of synthetic-index ticks, measures how the final
//! digit of each quote is distributed, and turns statistically lopsided
//! windows into ranked trade recommendations (instrument, contract type,
//! barrier, confidence) for the execution loop.
//!
//! ## Architecture Role
//!
//! ```text
//! TickSource → [TickFeedManager] → [TickWindow] → [DigitStatistics] → [SignalScorer]
//!                                                                          ↓
//!                    TradeLoopController ← watch ← [RecommendationPublisher]
//! ```
//!
//! ## Components
//!
//! - **TickWindow**: bounded FIFO of quotes at native precision
//! - **DigitStatistics**: frequency table, streaks, hot/cold digits
//! - **SignalScorer**: even/odd, over/under, matches/differs confidence
//! - **RecommendationPublisher**: hysteresis and staleness on the top pick
//! - **TickFeedManager**: one live subscription per instrument
//! - **SignalEngine**: fixed-cadence recompute and `watch` publication
//!
//! ## Examples
//!
//! ```rust
//! use digit_signals::{DigitStatistics, SignalScorer, StatisticsParams, TickWindow};
//! use digitbot_config::ScorerConfig;
//! use digitbot_types::{InstrumentId, RawTick};
//!
//! let mut window = TickWindow::new(InstrumentId::new("R_100"), 100).with_pip_size(Some(2));
//! for i in 0..60 {
//!     window.push_tick(RawTick { quote: 100.0 + (i % 3) as f64 * 0.02, epoch: i }).unwrap();
//! }
//!
//! let stats = DigitStatistics::compute(&window, &StatisticsParams::default());
//! let recommendations = SignalScorer::new(ScorerConfig::default()).score(&stats);
//! assert!(recommendations.iter().all(|r| r.confidence_pct <= rust_decimal::Decimal::from(90)));
//! ```

pub mod engine;
pub mod error;
pub mod feed;
pub mod scorer;
pub mod signals;
pub mod statistics;
pub mod tick_window;

pub use engine::{SignalEngine, TopRecommendation};
pub use error::{Result, SignalError};
pub use feed::{SharedWindow, TickFeedManager};
pub use scorer::{PublishDecision, RecommendationPublisher, ReplaceReason, SignalScorer};
pub use signals::{SignalStats, SignalStrength, TradeRecommendation};
pub use statistics::{DigitStatistics, StatisticsParams, Streaks};
pub use tick_window::TickWindow;

//! Fixed-capacity rolling window of tick quotes per instrument

use digitbot_types::{Digit, InstrumentId, Quote, RawTick, TickError};
use std::collections::VecDeque;
use tracing::{debug, warn};

/// Most recent quotes for one instrument, oldest first
///
/// `last_digits()[i]` is always the last digit of `quotes()[i]`.
#[derive(Debug, Clone)]
pub struct TickWindow {
    instrument: InstrumentId,
    capacity: usize,
    pip_size: Option<u32>,
    quotes: VecDeque<Quote>,
    last_epoch: Option<i64>,
}

impl TickWindow {
    pub fn new(instrument: InstrumentId, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            instrument,
            capacity,
            pip_size: None,
            quotes: VecDeque::with_capacity(capacity),
            last_epoch: None,
        }
    }

    /// Quote precision to format float ticks at
    pub fn with_pip_size(mut self, pip_size: Option<u32>) -> Self {
        self.pip_size = pip_size;
        self
    }

    /// Replace the window with `ticks`, keeping only the newest `capacity`.
    ///
    /// Malformed entries are dropped; returns how many were rejected.
    pub fn push_history(&mut self, ticks: &[RawTick]) -> usize {
        let skip = ticks.len().saturating_sub(self.capacity);
        let mut rejected = 0;

        self.quotes.clear();
        self.last_epoch = None;
        for tick in &ticks[skip..] {
            match Quote::from_f64(tick.quote, self.pip_size) {
                Ok(quote) => {
                    self.quotes.push_back(quote);
                    self.last_epoch = Some(tick.epoch);
                }
                Err(e) => {
                    warn!("Dropping malformed history tick for {}: {}", self.instrument, e);
                    rejected += 1;
                }
            }
        }

        debug!(
            "Backfilled {} with {} ticks ({} rejected)",
            self.instrument,
            self.quotes.len(),
            rejected
        );
        rejected
    }

    /// Append one tick, evicting the oldest when full.
    ///
    /// A malformed quote leaves the window untouched.
    pub fn push_tick(&mut self, tick: RawTick) -> Result<Digit, TickError> {
        let quote = Quote::from_f64(tick.quote, self.pip_size)?;
        self.last_epoch = Some(tick.epoch);
        Ok(self.push_quote(quote))
    }

    /// Append an already-validated quote
    pub fn push_quote(&mut self, quote: Quote) -> Digit {
        if self.quotes.len() == self.capacity {
            self.quotes.pop_front();
        }
        self.quotes.push_back(quote);
        quote.last_digit()
    }

    /// Last digits, oldest first
    pub fn last_digits(&self) -> Vec<Digit> {
        self.quotes.iter().map(Quote::last_digit).collect()
    }

    /// Last digits, newest first
    pub fn digits_newest_first(&self) -> impl Iterator<Item = Digit> + '_ {
        self.quotes.iter().rev().map(Quote::last_digit)
    }

    pub fn quotes(&self) -> impl Iterator<Item = &Quote> {
        self.quotes.iter()
    }

    pub fn latest(&self) -> Option<&Quote> {
        self.quotes.back()
    }

    pub fn last_epoch(&self) -> Option<i64> {
        self.last_epoch
    }

    pub fn instrument(&self) -> &InstrumentId {
        &self.instrument
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn pip_size(&self) -> Option<u32> {
        self.pip_size
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tick(quote: f64) -> RawTick {
        RawTick { quote, epoch: 0 }
    }

    fn digits(window: &TickWindow) -> Vec<u8> {
        window.last_digits().iter().map(|d| d.value()).collect()
    }

    #[test]
    fn test_fifo_eviction_keeps_newest() {
        let mut window = TickWindow::new(InstrumentId::new("R_100"), 5).with_pip_size(Some(2));
        for i in 1..=7 {
            window.push_tick(tick(100.0 + i as f64 / 100.0)).unwrap();
        }

        assert_eq!(window.len(), 5);
        assert_eq!(digits(&window), vec![3, 4, 5, 6, 7]);
    }

    #[test]
    fn test_history_truncated_to_capacity() {
        let mut window = TickWindow::new(InstrumentId::new("R_50"), 3).with_pip_size(Some(1));
        window.push_tick(tick(9.9)).unwrap();

        let history: Vec<RawTick> = [1.1, 1.2, 1.3, 1.4, 1.5].iter().map(|q| tick(*q)).collect();
        assert_eq!(window.push_history(&history), 0);

        assert_eq!(digits(&window), vec![3, 4, 5]);
    }

    #[test]
    fn test_malformed_tick_leaves_window_unchanged() {
        let mut window = TickWindow::new(InstrumentId::new("R_10"), 4).with_pip_size(Some(3));
        window.push_tick(tick(5.123)).unwrap();

        assert!(window.push_tick(tick(f64::NAN)).is_err());
        assert!(window.push_tick(tick(f64::NEG_INFINITY)).is_err());

        assert_eq!(window.len(), 1);
        assert_eq!(digits(&window), vec![3]);
    }

    #[test]
    fn test_history_drops_bad_entries_only() {
        let mut window = TickWindow::new(InstrumentId::new("R_10"), 10).with_pip_size(Some(2));
        let history = vec![tick(1.01), tick(f64::NAN), tick(1.03)];

        assert_eq!(window.push_history(&history), 1);
        assert_eq!(digits(&window), vec![1, 3]);
    }

    #[test]
    fn test_pip_size_preserves_trailing_zero_digit() {
        let mut window = TickWindow::new(InstrumentId::new("R_100"), 2).with_pip_size(Some(2));
        let digit = window.push_tick(tick(1234.5)).unwrap();
        assert_eq!(digit.value(), 0);
    }

    #[test]
    fn test_digits_newest_first() {
        let mut window = TickWindow::new(InstrumentId::new("R_25"), 3).with_pip_size(Some(1));
        for q in [2.1, 2.2, 2.3] {
            window.push_tick(tick(q)).unwrap();
        }
        let newest: Vec<u8> = window.digits_newest_first().map(|d| d.value()).collect();
        assert_eq!(newest, vec![3, 2, 1]);
    }
}

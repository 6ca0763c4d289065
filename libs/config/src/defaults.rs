//! Default values shared by the configuration sections
//!
//! The scorer constants are heuristics tuned against observed tick data, not
//! derived quantities. Treat them as starting points.

/// Trading defaults
pub mod trading {
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    /// Lowest stake the platform accepts (account currency)
    pub const MIN_STAKE: Decimal = dec!(0.35);

    /// Base stake for a fresh session
    pub const BASE_STAKE: Decimal = dec!(1.00);

    /// Stake multiplier applied per consecutive loss
    pub const MARTINGALE_MULTIPLIER: Decimal = dec!(2.0);

    /// Loss streak length after which the stake stops growing
    pub const LOSS_CAP: u32 = 10;

    /// Contract duration in ticks
    pub const DURATION_TICKS: u32 = 1;

    /// Ticks required before statistics are trusted
    pub const MIN_SAMPLE_SIZE: usize = 50;
}

/// Signal scorer defaults
pub mod scorer {
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    /// Dominant share (percent) at or below which a binary split has no edge
    pub const THRESHOLD_PCT: Decimal = dec!(55);

    /// Damping constant `k` in `p + (p - 50) * k`
    pub const DAMPING_FACTOR: Decimal = dec!(0.5);

    /// Hard cap on any confidence claim (percent)
    pub const CONFIDENCE_CAP_PCT: Decimal = dec!(90);

    /// Most-frequent digit share above which "matches" is recommended
    pub const MATCHES_THRESHOLD_PCT: Decimal = dec!(15);

    /// Least-frequent digit share below which "differs" is recommended
    pub const DIFFERS_THRESHOLD_PCT: Decimal = dec!(8);

    /// Confidence points per percentage point of single-digit deviation
    pub const DIGIT_DEVIATION_WEIGHT: Decimal = dec!(2.5);

    /// Confidence change (points) needed to replace a published pick
    pub const HYSTERESIS_PCT: Decimal = dec!(5);

    /// Age after which a published pick is replaced regardless (milliseconds)
    pub const MAX_STALENESS_MS: u64 = 30_000;

    /// "Over" category: digit > barrier
    pub const OVER_BARRIER: u8 = 4;

    /// "Under" category: digit < barrier
    pub const UNDER_BARRIER: u8 = 5;
}

/// Tick feed defaults
pub mod feed {
    /// Rolling window capacity per instrument
    pub const WINDOW_CAPACITY: usize = 100;

    /// History ticks requested on subscribe
    pub const HISTORY_COUNT: usize = 100;

    /// Statistics / scoring cadence (milliseconds)
    pub const RECOMPUTE_INTERVAL_MS: u64 = 1_000;

    /// Volatility indices scanned in auto mode
    pub const INSTRUMENTS: &[&str] = &["R_10", "R_25", "R_50", "R_75", "R_100"];
}

/// Trade loop defaults
pub mod trade_loop {
    /// Minimum gap between purchases, roughly one tick (milliseconds)
    pub const COOLDOWN_MS: u64 = 1_100;

    /// Wait after a rate-limit rejection before retrying (milliseconds)
    pub const RATE_LIMIT_BACKOFF_MS: u64 = 5_000;

    /// Status broadcast channel capacity
    pub const STATUS_BUFFER: usize = 256;
}

//! Error types for quote ingestion and value validation
//!
//! `TickError` is the data-quality guard applied to every upstream quote before
//! it reaches a tick window. `ValidationError` covers domain values that have a
//! constrained range (digits, ids).

use thiserror::Error;

/// Errors that can occur when validating a domain value
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// ID value is null/zero when non-null required
    #[error("ID cannot be null/zero")]
    NullId,

    /// Value is not within allowed range
    #[error("value {value} is not in allowed range [{min}, {max}]")]
    ValueOutOfRange { value: i64, min: i64, max: i64 },

    /// Custom validation failure with message
    #[error("Validation failed: {message}")]
    Custom { message: String },
}

/// Malformed upstream quote. The offending tick is dropped and the window is
/// left unchanged.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TickError {
    /// Quote is NaN or infinite
    #[error("Quote is not finite: {value}")]
    NotFinite { value: f64 },

    /// Quote text is not a decimal number
    #[error("Invalid quote: '{input}' - expected numeric format")]
    NonNumeric { input: String },

    /// Quote cannot be represented at the requested precision
    #[error("Quote {value} cannot be represented with {pip_size} decimals")]
    PrecisionOverflow { value: f64, pip_size: u32 },

    /// Zero or negative price; synthetic indices never quote at or below zero
    #[error("Quote must be positive, got {value}")]
    NonPositive { value: String },
}

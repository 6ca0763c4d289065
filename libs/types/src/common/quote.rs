//! Tick quotes at native precision
//!
//! Digit contracts settle on the final decimal digit of the quote *as the venue
//! displays it*. A float like `1234.5` on an index quoted with two decimals is
//! really `1234.50`, whose last digit is `0`, not `5`. `Quote` therefore keeps the
//! decimal scale it was built with and derives the last digit from the scaled
//! integer mantissa.

use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;

use super::digit::Digit;
use super::errors::TickError;

/// Upper bound on pip size; `Decimal` holds at most 28 fractional digits
const MAX_PIP_SIZE: u32 = 28;

/// A validated, strictly positive price with a fixed decimal scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Quote(Decimal);

impl Quote {
    /// Build from an upstream float, formatting at `pip_size` decimals when known
    pub fn from_f64(value: f64, pip_size: Option<u32>) -> Result<Self, TickError> {
        if !value.is_finite() {
            return Err(TickError::NotFinite { value });
        }
        if value <= 0.0 {
            return Err(TickError::NonPositive {
                value: value.to_string(),
            });
        }

        let text = match pip_size {
            Some(pip) if pip > MAX_PIP_SIZE => {
                return Err(TickError::PrecisionOverflow {
                    value,
                    pip_size: pip,
                })
            }
            Some(pip) => format!("{:.*}", pip as usize, value),
            // Shortest round-trip representation of the float
            None => value.to_string(),
        };

        Decimal::from_str(&text)
            .map(Self)
            .map_err(|_| TickError::PrecisionOverflow {
                value,
                pip_size: pip_size.unwrap_or(0),
            })
    }

    /// Build from a decimal value, keeping its scale as-is
    pub fn from_decimal(value: Decimal) -> Result<Self, TickError> {
        if value <= Decimal::ZERO {
            return Err(TickError::NonPositive {
                value: value.to_string(),
            });
        }
        Ok(Self(value))
    }

    pub fn price(&self) -> Decimal {
        self.0
    }

    /// Number of decimals this quote carries
    pub fn scale(&self) -> u32 {
        self.0.scale()
    }

    /// Final digit of the quote at its own scale
    pub fn last_digit(&self) -> Digit {
        Digit::from_mantissa(self.0.mantissa())
    }
}

impl FromStr for Quote {
    type Err = TickError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let value = Decimal::from_str(trimmed).map_err(|_| TickError::NonNumeric {
            input: trimmed.to_string(),
        })?;
        Self::from_decimal(value)
    }
}

impl fmt::Display for Quote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_trailing_zero_kept_at_pip_size() {
        let quote = Quote::from_f64(1234.5, Some(2)).unwrap();
        assert_eq!(quote.to_string(), "1234.50");
        assert_eq!(quote.last_digit().value(), 0);
    }

    #[test]
    fn test_float_without_pip_size_uses_shortest_repr() {
        let quote = Quote::from_f64(6543.217, None).unwrap();
        assert_eq!(quote.last_digit().value(), 7);
        assert_eq!(quote.scale(), 3);
    }

    #[test]
    fn test_string_keeps_native_precision() {
        let quote: Quote = "987.120".parse().unwrap();
        assert_eq!(quote.last_digit().value(), 0);
        assert_eq!(quote.price(), dec!(987.12));
    }

    #[test]
    fn test_rejects_malformed_quotes() {
        assert!(matches!(
            Quote::from_f64(f64::NAN, Some(2)),
            Err(TickError::NotFinite { .. })
        ));
        assert!(matches!(
            Quote::from_f64(f64::INFINITY, None),
            Err(TickError::NotFinite { .. })
        ));
        assert!(matches!(
            "12a.4".parse::<Quote>(),
            Err(TickError::NonNumeric { .. })
        ));
        assert!(matches!(
            Quote::from_f64(-3.0, None),
            Err(TickError::NonPositive { .. })
        ));
        assert!(matches!(
            Quote::from_f64(1.0, Some(40)),
            Err(TickError::PrecisionOverflow { .. })
        ));
    }
}

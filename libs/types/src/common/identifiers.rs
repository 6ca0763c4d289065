//! # Identifiers - Instrument Symbols + Typed ID Wrappers
//!
//! Two kinds of identifiers flow through the system:
//!
//! ### 1. InstrumentId
//! - The venue's symbol string for a synthetic index (`R_100`, `1HZ10V`, ...)
//! - Ordered lexically so rankings have a deterministic tie-break
//!
//! ### 2. Typed Simple IDs
//! - Zero-cost wrappers for the u64 ids the brokerage hands out
//! - `ContractId` and `SubscriptionId` cannot be swapped at a call site
//!
//! ```rust
//! use digitbot_types::{ContractId, SubscriptionId};
//!
//! fn forget(contract: ContractId) -> u64 { contract.inner() }
//!
//! let contract = ContractId::new(42);
//! let subscription = SubscriptionId::new(42);
//! assert_eq!(forget(contract), 42);
//! // forget(subscription); // compile error
//! # let _ = subscription;
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Tradeable synthetic index symbol
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstrumentId(String);

impl InstrumentId {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self(symbol.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstrumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for InstrumentId {
    fn from(symbol: &str) -> Self {
        Self(symbol.to_string())
    }
}

impl From<String> for InstrumentId {
    fn from(symbol: String) -> Self {
        Self(symbol)
    }
}

/// Macro to define typed ID wrappers over u64
macro_rules! define_typed_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            Serialize,
            Deserialize
        )]
        #[serde(transparent)]
        #[repr(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// Create a new typed ID
            #[inline(always)]
            pub const fn new(id: u64) -> Self {
                Self(id)
            }

            /// Create a new typed ID, rejecting the null id
            #[inline]
            pub fn new_validated(id: u64) -> Result<Self, crate::common::errors::ValidationError> {
                if id == 0 {
                    return Err(crate::common::errors::ValidationError::NullId);
                }
                Ok(Self(id))
            }

            /// Extract the inner u64 value
            #[inline(always)]
            pub const fn inner(&self) -> u64 {
                self.0
            }

            /// Generate next sequential ID
            #[inline(always)]
            pub fn next(&self) -> Self {
                Self(self.0.wrapping_add(1))
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl From<u64> for $name {
            #[inline(always)]
            fn from(id: u64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for u64 {
            #[inline(always)]
            fn from(id: $name) -> u64 {
                id.0
            }
        }
    };
}

define_typed_id!(
    /// Brokerage-assigned id of a purchased contract
    ContractId
);

define_typed_id!(
    /// Brokerage-assigned id of a streaming subscription
    SubscriptionId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instrument_ordering_is_lexical() {
        let mut ids = vec![
            InstrumentId::new("R_75"),
            InstrumentId::new("R_10"),
            InstrumentId::new("1HZ100V"),
        ];
        ids.sort();
        let names: Vec<&str> = ids.iter().map(|id| id.as_str()).collect();
        assert_eq!(names, vec!["1HZ100V", "R_10", "R_75"]);
    }

    #[test]
    fn test_typed_id_validation() {
        assert!(ContractId::new_validated(0).is_err());
        let id = ContractId::new_validated(7).unwrap();
        assert_eq!(id.next().inner(), 8);
        assert_eq!(id.to_string(), "ContractId(7)");
    }

    #[test]
    fn test_typed_id_serializes_as_raw_u64() {
        let json = serde_json::to_string(&SubscriptionId::new(99)).unwrap();
        assert_eq!(json, "99");
    }
}

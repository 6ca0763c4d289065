//! # Digitbot Shared Types
//!
//! Domain types shared by the signal and execution services.
//!
//! ## Design Philosophy
//!
//! - **No Float Money**: stakes, profits and quotes are `rust_decimal::Decimal`
//! - **Native Precision Digits**: a quote's last digit is taken from its decimal
//!   representation at the venue's pip size, never from a rounded float
//! - **Typed IDs**: contract and subscription ids cannot be mixed up
//! - **Narrow Broker Surface**: the core only sees the four calls it needs
//!   (subscribe, unsubscribe, purchase, monitor)
//!
//! ## Quick Start
//!
//! ```rust
//! use digitbot_types::{Digit, DigitStrategy, InstrumentId, Quote};
//!
//! let instrument = InstrumentId::new("R_100");
//! let quote = Quote::from_f64(1234.5, Some(2)).unwrap();
//! assert_eq!(quote.last_digit(), Digit::ZERO);
//!
//! // 7 > 4 settles an over-4 contract as a win
//! assert!(DigitStrategy::Over.wins(Digit::new(7).unwrap(), Some(Digit::new(4).unwrap())));
//! # let _ = instrument;
//! ```

pub mod broker;
pub mod common;

pub use broker::router::MessageRouter;
pub use broker::{
    BrokerError, ContractBroker, ContractStream, ContractUpdate, PurchaseReceipt,
    PurchaseRequest, RawTick, TickMessage, TickSource, TickSubscription,
};
pub use common::digit::{Barrier, Digit, DigitStrategy, TradeOutcome};
pub use common::errors::{TickError, ValidationError};
pub use common::identifiers::{ContractId, InstrumentId, SubscriptionId};
pub use common::quote::Quote;

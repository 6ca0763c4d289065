//! Common domain types

pub mod digit;
pub mod errors;
pub mod identifiers;
pub mod quote;

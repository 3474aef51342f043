//! Shared utilities and domain types

pub mod helpers;
pub mod types;

pub use types::{ActionKind, ActionOutcome, ActionRequest, PriceUpdate};

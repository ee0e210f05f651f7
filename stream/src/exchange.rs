//! Exchange rates reported in receipts.

use serde_derive::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExchangeRate {
    pub hbar_equiv: i32,
    pub cent_equiv: i32,
    pub expiration_seconds: i64,
}

/// The current and next exchange rates in effect when a transaction reached
/// consensus.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExchangeRateSet {
    pub current: ExchangeRate,
    pub next: ExchangeRate,
}

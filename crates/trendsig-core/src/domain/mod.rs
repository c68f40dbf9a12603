//! Canonical domain types shared across acquisition and analysis.

mod models;
mod symbol;

pub use models::{DailyBar, IndexQuote, OwnershipDistribution, Quote};
pub use symbol::{Market, Symbol};

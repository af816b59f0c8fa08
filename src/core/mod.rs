//! Core business logic abstractions

pub mod clock;
pub mod config;
pub mod error;
pub mod log;
pub mod rates;

// Re-export main types for cleaner imports
pub use clock::{Clock, FixedClock, SystemClock, reference_date};
pub use error::StrengthError;
pub use rates::{CurrencyCode, ExchangeRateSnapshot, RateFetcher};

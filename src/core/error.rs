//! Failure kinds surfaced by a strength comparison.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StrengthError {
    /// Either rate fetch failed: connection, status, timeout, or an unreadable response.
    /// The underlying cause chain is kept as the error source.
    #[error("Rate provider unavailable: {0:#}")]
    Transport(#[source] anyhow::Error),

    /// The counter currency is missing from at least one of the snapshots.
    #[error("Unknown currency code: {currency}")]
    CurrencyNotFound { currency: String },

    /// The caller's cancellation signal fired before both fetches completed.
    #[error("Comparison cancelled before rates were fetched")]
    Cancelled,
}

impl StrengthError {
    pub fn is_transport(&self) -> bool {
        matches!(self, StrengthError::Transport(_))
    }

    pub fn is_currency_not_found(&self) -> bool {
        matches!(self, StrengthError::CurrencyNotFound { .. })
    }
}

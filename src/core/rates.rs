//! Exchange rate snapshots and the fetcher abstraction

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Short currency identifier such as `EUR`. Only checked for presence in a snapshot.
pub type CurrencyCode = String;

/// Rates for every quoted currency relative to `base`, as reported at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeRateSnapshot {
    base: CurrencyCode,
    date: Option<NaiveDate>,
    rates: HashMap<CurrencyCode, Decimal>,
}

impl ExchangeRateSnapshot {
    pub fn new(base: &str, date: Option<NaiveDate>, rates: HashMap<CurrencyCode, Decimal>) -> Self {
        Self {
            base: base.to_string(),
            date,
            rates,
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Date the provider reports for the snapshot, if any.
    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    /// Rate of `currency` against the base. `None` when the provider did not quote it.
    pub fn rate(&self, currency: &str) -> Option<Decimal> {
        self.rates.get(currency).copied()
    }

    /// Number of quoted currencies.
    pub fn rate_count(&self) -> usize {
        self.rates.len()
    }
}

#[async_trait]
pub trait RateFetcher: Send + Sync {
    /// Most recent snapshot for `base`.
    async fn fetch_latest(&self, base: &str, access_key: &str) -> Result<ExchangeRateSnapshot>;

    /// Snapshot for `base` as of `date`.
    async fn fetch_historical(
        &self,
        date: NaiveDate,
        base: &str,
        access_key: &str,
    ) -> Result<ExchangeRateSnapshot>;
}

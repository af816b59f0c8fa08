//! Compares a counter currency's rate today against thirty days ago.

use chrono::NaiveDate;
use futures::future::try_join;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::core::clock::{Clock, SystemClock, reference_date};
use crate::core::error::StrengthError;
use crate::core::rates::{CurrencyCode, RateFetcher};

/// Inputs of one comparison. Not retained after the call returns.
#[derive(Clone)]
pub struct StrengthQuery {
    pub base_currency: CurrencyCode,
    pub counter_currency: CurrencyCode,
    pub access_key: String,
}

impl StrengthQuery {
    pub fn new(base_currency: &str, counter_currency: &str, access_key: &str) -> Self {
        Self {
            base_currency: base_currency.to_string(),
            counter_currency: counter_currency.to_string(),
            access_key: access_key.to_string(),
        }
    }
}

// Keeps the access key out of logs
impl std::fmt::Debug for StrengthQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrengthQuery")
            .field("base_currency", &self.base_currency)
            .field("counter_currency", &self.counter_currency)
            .finish_non_exhaustive()
    }
}

/// Both rates of the counter currency and the dates they were requested for.
#[derive(Debug, Clone, PartialEq)]
pub struct StrengthReport {
    pub base_currency: CurrencyCode,
    pub counter_currency: CurrencyCode,
    pub today: NaiveDate,
    pub reference_date: NaiveDate,
    /// Date the provider stamped on the latest snapshot, which can trail `today`.
    pub latest_rate_date: Option<NaiveDate>,
    pub today_rate: Decimal,
    pub reference_rate: Decimal,
}

impl StrengthReport {
    /// True only when today's rate is strictly above the reference rate.
    pub fn is_stronger(&self) -> bool {
        self.today_rate > self.reference_rate
    }

    /// Percentage change from the reference rate, if it is non-zero.
    pub fn change_percent(&self) -> Option<Decimal> {
        if self.reference_rate.is_zero() {
            return None;
        }
        Some((self.today_rate - self.reference_rate) / self.reference_rate * Decimal::ONE_HUNDRED)
    }
}

pub struct StrengthComparator {
    fetcher: Arc<dyn RateFetcher>,
    clock: Arc<dyn Clock>,
}

impl StrengthComparator {
    pub fn new(fetcher: Arc<dyn RateFetcher>) -> Self {
        Self::with_clock(fetcher, Arc::new(SystemClock))
    }

    pub fn with_clock(fetcher: Arc<dyn RateFetcher>, clock: Arc<dyn Clock>) -> Self {
        Self { fetcher, clock }
    }

    /// Whether `counter_currency` is stronger against `base_currency` than thirty days ago.
    pub async fn is_stronger(
        &self,
        base_currency: &str,
        counter_currency: &str,
        access_key: &str,
    ) -> Result<bool, StrengthError> {
        let query = StrengthQuery::new(base_currency, counter_currency, access_key);
        Ok(self.compare(&query).await?.is_stronger())
    }

    /// Compares using the configured clock's date as today.
    pub async fn compare(&self, query: &StrengthQuery) -> Result<StrengthReport, StrengthError> {
        self.compare_on(query, self.clock.today()).await
    }

    /// Compares as if `today` were the current date.
    #[instrument(skip(self))]
    pub async fn compare_on(
        &self,
        query: &StrengthQuery,
        today: NaiveDate,
    ) -> Result<StrengthReport, StrengthError> {
        let reference_date = reference_date(today);
        debug!(%reference_date, "Fetching current and historical rates");

        let latest = async {
            self.fetcher
                .fetch_latest(&query.base_currency, &query.access_key)
                .await
                .map_err(StrengthError::Transport)
        };
        let historical = async {
            self.fetcher
                .fetch_historical(reference_date, &query.base_currency, &query.access_key)
                .await
                .map_err(StrengthError::Transport)
        };

        // Both requests are in flight together; the first failure drops the other
        let (latest, historical) = try_join(latest, historical).await?;

        let lookup = |rate: Option<Decimal>| {
            rate.ok_or_else(|| StrengthError::CurrencyNotFound {
                currency: query.counter_currency.clone(),
            })
        };
        let today_rate = lookup(latest.rate(&query.counter_currency))?;
        let reference_rate = lookup(historical.rate(&query.counter_currency))?;

        let report = StrengthReport {
            base_currency: query.base_currency.clone(),
            counter_currency: query.counter_currency.clone(),
            today,
            reference_date,
            latest_rate_date: latest.date(),
            today_rate,
            reference_rate,
        };
        info!(
            %today_rate,
            %reference_rate,
            stronger = report.is_stronger(),
            "Compared {} against {}",
            query.counter_currency,
            query.base_currency
        );
        Ok(report)
    }

    /// Like [`compare`](Self::compare), but gives up with [`StrengthError::Cancelled`]
    /// as soon as `cancel` resolves. Pending requests are dropped.
    pub async fn compare_until<F>(
        &self,
        query: &StrengthQuery,
        cancel: F,
    ) -> Result<StrengthReport, StrengthError>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            result = self.compare(query) => result,
            _ = cancel => {
                debug!("Comparison cancelled");
                Err(StrengthError::Cancelled)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::FixedClock;
    use crate::core::rates::ExchangeRateSnapshot;
    use anyhow::{Result, anyhow};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::str::FromStr;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::Barrier;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn snapshot(rates: &[(&str, &str)]) -> Option<ExchangeRateSnapshot> {
        let rates = rates
            .iter()
            .map(|(code, rate)| (code.to_string(), dec(rate)))
            .collect::<HashMap<_, _>>();
        Some(ExchangeRateSnapshot::new("USD", None, rates))
    }

    /// Serves canned snapshots. `None` simulates a transport failure for that leg.
    struct StaticFetcher {
        latest: Option<ExchangeRateSnapshot>,
        historical: Option<ExchangeRateSnapshot>,
        requested_dates: Mutex<Vec<NaiveDate>>,
        barrier: Option<Barrier>,
    }

    impl StaticFetcher {
        fn new(
            latest: Option<ExchangeRateSnapshot>,
            historical: Option<ExchangeRateSnapshot>,
        ) -> Self {
            Self {
                latest,
                historical,
                requested_dates: Mutex::new(Vec::new()),
                barrier: None,
            }
        }

        // Each leg waits until the other one has started
        fn concurrent_only(mut self) -> Self {
            self.barrier = Some(Barrier::new(2));
            self
        }

        async fn rendezvous(&self) {
            if let Some(barrier) = &self.barrier {
                barrier.wait().await;
            }
        }
    }

    #[async_trait]
    impl RateFetcher for StaticFetcher {
        async fn fetch_latest(&self, _base: &str, _key: &str) -> Result<ExchangeRateSnapshot> {
            self.rendezvous().await;
            self.latest
                .clone()
                .ok_or_else(|| anyhow!("connection refused for latest"))
        }

        async fn fetch_historical(
            &self,
            date: NaiveDate,
            _base: &str,
            _key: &str,
        ) -> Result<ExchangeRateSnapshot> {
            self.requested_dates.lock().unwrap().push(date);
            self.rendezvous().await;
            self.historical
                .clone()
                .ok_or_else(|| anyhow!("connection refused for {date}"))
        }
    }

    fn comparator(fetcher: Arc<StaticFetcher>) -> StrengthComparator {
        StrengthComparator::with_clock(fetcher, Arc::new(FixedClock(date(2024, 3, 31))))
    }

    #[tokio::test]
    async fn test_stronger_when_rate_increased() {
        let fetcher = Arc::new(StaticFetcher::new(
            snapshot(&[("EUR", "0.92")]),
            snapshot(&[("EUR", "0.90")]),
        ));
        let result = comparator(fetcher).is_stronger("USD", "EUR", "key").await;
        assert!(result.unwrap());
    }

    #[tokio::test]
    async fn test_not_stronger_when_rate_decreased() {
        let fetcher = Arc::new(StaticFetcher::new(
            snapshot(&[("EUR", "0.90")]),
            snapshot(&[("EUR", "0.92")]),
        ));
        let result = comparator(fetcher).is_stronger("USD", "EUR", "key").await;
        assert!(!result.unwrap());
    }

    #[tokio::test]
    async fn test_not_stronger_when_rates_equal() {
        let fetcher = Arc::new(StaticFetcher::new(
            snapshot(&[("EUR", "0.9000")]),
            snapshot(&[("EUR", "0.9")]),
        ));
        let result = comparator(fetcher).is_stronger("USD", "EUR", "key").await;
        assert!(!result.unwrap());
    }

    #[tokio::test]
    async fn test_exact_decimal_comparison() {
        let fetcher = Arc::new(StaticFetcher::new(
            snapshot(&[("EUR", "0.9000000000000000000000000001")]),
            snapshot(&[("EUR", "0.9")]),
        ));
        let result = comparator(fetcher).is_stronger("USD", "EUR", "key").await;
        assert!(result.unwrap());
    }

    #[tokio::test]
    async fn test_currency_missing_today() {
        let fetcher = Arc::new(StaticFetcher::new(
            snapshot(&[("GBP", "0.80")]),
            snapshot(&[("EUR", "0.90")]),
        ));
        let err = comparator(fetcher)
            .is_stronger("USD", "EUR", "key")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StrengthError::CurrencyNotFound { ref currency } if currency == "EUR"
        ));
    }

    #[tokio::test]
    async fn test_currency_missing_historically() {
        let fetcher = Arc::new(StaticFetcher::new(
            snapshot(&[("EUR", "0.92")]),
            snapshot(&[("GBP", "0.80")]),
        ));
        let err = comparator(fetcher)
            .is_stronger("USD", "EUR", "key")
            .await
            .unwrap_err();
        assert!(err.is_currency_not_found());
    }

    #[tokio::test]
    async fn test_currency_missing_from_both() {
        let fetcher = Arc::new(StaticFetcher::new(snapshot(&[]), snapshot(&[])));
        let err = comparator(fetcher)
            .is_stronger("USD", "XYZ", "key")
            .await
            .unwrap_err();
        assert!(err.is_currency_not_found());
    }

    #[tokio::test]
    async fn test_zero_rate_is_not_missing() {
        let fetcher = Arc::new(StaticFetcher::new(
            snapshot(&[("EUR", "0")]),
            snapshot(&[("EUR", "0")]),
        ));
        let report = comparator(fetcher)
            .compare(&StrengthQuery::new("USD", "EUR", "key"))
            .await
            .unwrap();
        assert!(!report.is_stronger());
        assert!(report.change_percent().is_none());
    }

    #[tokio::test]
    async fn test_latest_failure_is_transport_error() {
        let fetcher = Arc::new(StaticFetcher::new(None, snapshot(&[("EUR", "0.90")])));
        let err = comparator(fetcher)
            .is_stronger("USD", "EUR", "key")
            .await
            .unwrap_err();
        assert!(err.is_transport());
        assert!(err.to_string().contains("connection refused for latest"));
    }

    #[tokio::test]
    async fn test_historical_failure_is_transport_error() {
        let fetcher = Arc::new(StaticFetcher::new(snapshot(&[("GBP", "0.80")]), None));
        let err = comparator(fetcher)
            .is_stronger("USD", "EUR", "key")
            .await
            .unwrap_err();
        // Transport failure wins even though today's snapshot lacks the currency
        assert!(err.is_transport());
        assert!(err.to_string().contains("connection refused for 2024-03-01"));
    }

    #[tokio::test]
    async fn test_historical_request_uses_reference_date() {
        let fetcher = Arc::new(StaticFetcher::new(
            snapshot(&[("EUR", "0.92")]),
            snapshot(&[("EUR", "0.90")]),
        ));
        let comparator = StrengthComparator::with_clock(
            fetcher.clone(),
            Arc::new(FixedClock(date(2024, 3, 1))),
        );

        let report = comparator
            .compare(&StrengthQuery::new("USD", "EUR", "key"))
            .await
            .unwrap();
        assert_eq!(report.today, date(2024, 3, 1));
        assert_eq!(report.reference_date, date(2024, 1, 31));
        assert_eq!(
            *fetcher.requested_dates.lock().unwrap(),
            vec![date(2024, 1, 31)]
        );
    }

    #[tokio::test]
    async fn test_report_contents() {
        let fetcher = Arc::new(StaticFetcher::new(
            snapshot(&[("EUR", "0.99"), ("GBP", "0.80")]),
            snapshot(&[("EUR", "0.90")]),
        ));
        let report = comparator(fetcher)
            .compare_on(&StrengthQuery::new("USD", "EUR", "key"), date(2024, 3, 31))
            .await
            .unwrap();
        assert_eq!(
            report,
            StrengthReport {
                base_currency: "USD".to_string(),
                counter_currency: "EUR".to_string(),
                today: date(2024, 3, 31),
                reference_date: date(2024, 3, 1),
                latest_rate_date: None,
                today_rate: dec("0.99"),
                reference_rate: dec("0.90"),
            }
        );
        assert_eq!(report.change_percent(), Some(dec("10")));
    }

    #[tokio::test]
    async fn test_fetches_run_concurrently() {
        // Sequential fetches would never pass the barrier
        let fetcher = Arc::new(
            StaticFetcher::new(snapshot(&[("EUR", "0.92")]), snapshot(&[("EUR", "0.90")]))
                .concurrent_only(),
        );
        let result = tokio::time::timeout(
            Duration::from_secs(5),
            comparator(fetcher).is_stronger("USD", "EUR", "key"),
        )
        .await
        .expect("fetches did not run concurrently");
        assert!(result.unwrap());
    }

    /// Latest fails at once; the historical request never answers.
    struct FailFastFetcher;

    #[async_trait]
    impl RateFetcher for FailFastFetcher {
        async fn fetch_latest(&self, _base: &str, _key: &str) -> Result<ExchangeRateSnapshot> {
            Err(anyhow!("connection reset for latest"))
        }

        async fn fetch_historical(
            &self,
            _date: NaiveDate,
            _base: &str,
            _key: &str,
        ) -> Result<ExchangeRateSnapshot> {
            futures::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_failure_does_not_wait_for_other_fetch() {
        let comparator = StrengthComparator::with_clock(
            Arc::new(FailFastFetcher),
            Arc::new(FixedClock(date(2024, 3, 31))),
        );
        let result = tokio::time::timeout(
            Duration::from_secs(2),
            comparator.is_stronger("USD", "EUR", "key"),
        )
        .await
        .expect("failed fetch should not wait for the pending one");
        let err = result.unwrap_err();
        assert!(err.is_transport());
        assert!(err.to_string().contains("connection reset for latest"));
    }

    #[tokio::test]
    async fn test_cancelled_before_completion() {
        // A barrier of three never opens, so both fetches stay pending
        let fetcher = Arc::new(StaticFetcher {
            barrier: Some(Barrier::new(3)),
            ..StaticFetcher::new(snapshot(&[("EUR", "0.92")]), snapshot(&[("EUR", "0.90")]))
        });
        let query = StrengthQuery::new("USD", "EUR", "key");
        let err = comparator(fetcher)
            .compare_until(&query, tokio::time::sleep(Duration::from_millis(50)))
            .await
            .unwrap_err();
        assert!(matches!(err, StrengthError::Cancelled));
    }

    #[tokio::test]
    async fn test_cancel_signal_unused_when_fetches_complete() {
        let fetcher = Arc::new(StaticFetcher::new(
            snapshot(&[("EUR", "0.92")]),
            snapshot(&[("EUR", "0.90")]),
        ));
        let query = StrengthQuery::new("USD", "EUR", "key");
        let report = comparator(fetcher)
            .compare_until(&query, futures::future::pending())
            .await
            .unwrap();
        assert!(report.is_stronger());
    }

    #[test]
    fn test_query_debug_hides_access_key() {
        let query = StrengthQuery::new("USD", "EUR", "super-secret");
        let rendered = format!("{query:?}");
        assert!(rendered.contains("EUR"));
        assert!(!rendered.contains("super-secret"));
    }
}

//! Calendar sources for the lookback window

use chrono::{Days, Local, NaiveDate};

/// Number of calendar days between "today" and the historical snapshot.
pub const LOOKBACK_DAYS: u64 = 30;

pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Reads the local system date at call time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Always reports the same date.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// The date whose snapshot is compared against `today`.
pub fn reference_date(today: NaiveDate) -> NaiveDate {
    // Only fails at the lower edge of chrono's date range
    today
        .checked_sub_days(Days::new(LOOKBACK_DAYS))
        .unwrap_or(NaiveDate::MIN)
}

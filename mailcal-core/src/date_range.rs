//! Date window for filtering the assembled calendar.

use chrono::{Days, NaiveDate};

/// Default number of days into the past to keep events for.
pub const DEFAULT_PAST_DAYS: u32 = 61;

/// Default number of days into the future to keep events for.
pub const DEFAULT_FUTURE_DAYS: u32 = 182;

/// Inclusive window of `YYYYMMDD` dates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateWindow {
    pub past: String,
    pub future: String,
}

impl DateWindow {
    /// Window from `past_days` before `today` to `future_days` after it.
    pub fn around(today: NaiveDate, past_days: u32, future_days: u32) -> Self {
        let past = today
            .checked_sub_days(Days::new(u64::from(past_days)))
            .unwrap_or(NaiveDate::MIN);
        let future = today
            .checked_add_days(Days::new(u64::from(future_days)))
            .unwrap_or(NaiveDate::MAX);

        DateWindow {
            past: past.format("%Y%m%d").to_string(),
            future: future.format("%Y%m%d").to_string(),
        }
    }

    /// Whether an event spanning `start`..`end` touches the window.
    ///
    /// Only the `YYYYMMDD` prefix of each value is compared, so date-times
    /// on a boundary day count as inside.
    pub fn contains(&self, start: &str, end: &str) -> bool {
        date_prefix(start) <= self.future.as_str() && date_prefix(end) >= self.past.as_str()
    }
}

fn date_prefix(value: &str) -> &str {
    value.get(..8).unwrap_or(value)
}

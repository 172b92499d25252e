//! Rough end-date projection for recurring events.
//!
//! The date index only needs to know whether a recurring event can still
//! have occurrences inside the output window, so instead of expanding the
//! RRULE this module pushes the event's end date out to an estimate of its
//! last occurrence.

use std::str::FromStr;

use chrono::{Datelike, Days, Months, NaiveDate};

/// Unbounded rules are treated as lasting this many years.
pub const UNBOUNDED_YEARS: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DAILY" => Ok(Frequency::Daily),
            "WEEKLY" => Ok(Frequency::Weekly),
            "MONTHLY" => Ok(Frequency::Monthly),
            "YEARLY" => Ok(Frequency::Yearly),
            other => Err(format!("unsupported FREQ {:?}", other)),
        }
    }
}

/// What little of an RRULE the date index cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recurrence {
    /// `UNTIL=` value, kept verbatim.
    Until(String),
    /// `FREQ=` with an optional `COUNT=`; no count means no end.
    Count {
        frequency: Frequency,
        count: Option<u32>,
    },
}

/// Parse the value of an RRULE property.
///
/// An `UNTIL=` part wins as soon as it is seen. Otherwise a supported
/// `FREQ=` is required; an unsupported frequency or a non-numeric `COUNT=`
/// makes the whole rule unusable and `None` is returned.
pub fn parse_rrule(value: &str) -> Option<Recurrence> {
    let mut frequency = None;
    let mut count = None;
    let mut unsupported = false;

    for part in value.trim().split(';') {
        let Some((key, val)) = part.split_once('=') else {
            continue;
        };
        match key {
            "UNTIL" => return Some(Recurrence::Until(val.to_string())),
            "FREQ" => match val.parse::<Frequency>() {
                Ok(f) => frequency = Some(f),
                Err(e) => {
                    tracing::debug!("Ignoring RRULE {:?}: {}", value, e);
                    unsupported = true;
                }
            },
            "COUNT" => match val.parse::<u32>() {
                Ok(c) => count = Some(c),
                Err(_) => {
                    tracing::debug!("Ignoring RRULE {:?}: bad COUNT", value);
                    unsupported = true;
                }
            },
            _ => {}
        }
    }

    if unsupported {
        return None;
    }
    frequency.map(|frequency| Recurrence::Count { frequency, count })
}

/// Move `date` forward by `count` periods of `frequency`.
///
/// Months clamp to the last valid day of the target month. Years keep month
/// and day, so February 29th into a non-leap year fails.
pub fn advance(date: NaiveDate, frequency: Frequency, count: u32) -> Option<NaiveDate> {
    match frequency {
        Frequency::Daily => date.checked_add_days(Days::new(u64::from(count))),
        Frequency::Weekly => date.checked_add_days(Days::new(u64::from(count) * 7)),
        Frequency::Monthly => date.checked_add_months(Months::new(count)),
        Frequency::Yearly => {
            let year = date.year().checked_add(i32::try_from(count).ok()?)?;
            date.with_year(year)
        }
    }
}

/// Estimate the end of the last occurrence of a recurring event.
///
/// `UNTIL` is returned as-is, although strictly it bounds the start of the
/// last occurrence rather than its end. Count-based rules only move
/// date-time ends (`YYYYMMDDTHHMMSS...`); all-day `YYYYMMDD` ends are
/// returned unchanged. `None` means the end could not be projected.
pub fn project_end(dtend: &str, recurrence: &Recurrence) -> Option<String> {
    let (frequency, count) = match recurrence {
        Recurrence::Until(until) => return Some(until.clone()),
        Recurrence::Count {
            frequency,
            count: Some(count),
        } => (*frequency, *count),
        Recurrence::Count { count: None, .. } => (Frequency::Yearly, UNBOUNDED_YEARS),
    };

    if dtend.len() <= 8 {
        return Some(dtend.to_string());
    }

    let date_part = dtend.get(..8)?;
    let rest = dtend.get(8..)?;
    let date = NaiveDate::parse_from_str(date_part, "%Y%m%d").ok()?;
    let projected = advance(date, frequency, count)?;

    Some(format!("{}{}", projected.format("%Y%m%d"), rest))
}

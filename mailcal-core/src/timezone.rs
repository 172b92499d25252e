//! Best-effort conversion of `TZID`-qualified DTSTART/DTEND values to UTC.
//!
//! Groupware senders rarely use IANA zone names. A `TZID` is resolved by
//! looking it up in [`ZONE_ALIASES`], then by matching a textual offset such
//! as `(UTC+01:00) Amsterdam`, and finally by handing it to the tz database
//! as-is.

use std::str::FromStr;

use chrono::{FixedOffset, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::ics::{split_params, split_property};

/// Vendor zone names mapped to tz database names.
pub const ZONE_ALIASES: &[(&str, &str)] = &[
    // Windows zone names
    ("Dateline Standard Time", "Etc/GMT+12"),
    ("Hawaiian Standard Time", "Pacific/Honolulu"),
    ("Alaskan Standard Time", "America/Anchorage"),
    ("Pacific Standard Time", "America/Los_Angeles"),
    ("US Mountain Standard Time", "America/Phoenix"),
    ("Mountain Standard Time", "America/Denver"),
    ("Central America Standard Time", "America/Guatemala"),
    ("Central Standard Time", "America/Chicago"),
    ("Canada Central Standard Time", "America/Regina"),
    ("SA Pacific Standard Time", "America/Bogota"),
    ("Eastern Standard Time", "America/New_York"),
    ("US Eastern Standard Time", "America/Indiana/Indianapolis"),
    ("Atlantic Standard Time", "America/Halifax"),
    ("Newfoundland Standard Time", "America/St_Johns"),
    ("E. South America Standard Time", "America/Sao_Paulo"),
    ("Argentina Standard Time", "America/Argentina/Buenos_Aires"),
    ("UTC", "UTC"),
    ("GMT Standard Time", "Europe/London"),
    ("Greenwich Standard Time", "Atlantic/Reykjavik"),
    ("W. Europe Standard Time", "Europe/Berlin"),
    ("Central Europe Standard Time", "Europe/Budapest"),
    ("Romance Standard Time", "Europe/Paris"),
    ("Central European Standard Time", "Europe/Warsaw"),
    ("W. Central Africa Standard Time", "Africa/Lagos"),
    ("GTB Standard Time", "Europe/Bucharest"),
    ("E. Europe Standard Time", "Europe/Chisinau"),
    ("FLE Standard Time", "Europe/Kiev"),
    ("Israel Standard Time", "Asia/Jerusalem"),
    ("South Africa Standard Time", "Africa/Johannesburg"),
    ("Egypt Standard Time", "Africa/Cairo"),
    ("Turkey Standard Time", "Europe/Istanbul"),
    ("Russian Standard Time", "Europe/Moscow"),
    ("Arabian Standard Time", "Asia/Dubai"),
    ("Iran Standard Time", "Asia/Tehran"),
    ("Pakistan Standard Time", "Asia/Karachi"),
    ("India Standard Time", "Asia/Kolkata"),
    ("Nepal Standard Time", "Asia/Kathmandu"),
    ("SE Asia Standard Time", "Asia/Bangkok"),
    ("China Standard Time", "Asia/Shanghai"),
    ("Singapore Standard Time", "Asia/Singapore"),
    ("Tokyo Standard Time", "Asia/Tokyo"),
    ("Korea Standard Time", "Asia/Seoul"),
    ("AUS Central Standard Time", "Australia/Darwin"),
    ("AUS Eastern Standard Time", "Australia/Sydney"),
    ("E. Australia Standard Time", "Australia/Brisbane"),
    ("New Zealand Standard Time", "Pacific/Auckland"),
    // Localized display names; the sender's locale decides what they mean
    ("Mitteleuropäische Zeit", "Europe/Berlin"),
    ("Heure de l'Europe centrale", "Europe/Paris"),
    // The plain abbreviations have no daylight saving in the tz database
    ("EST", "EST5EDT"),
    ("MST", "MST7MDT"),
];

/// Zones in which an unchanged wall-clock value is a correct UTC value.
const UTC_ALIASES: &[&str] = &["UTC", "GMT", "Etc/GMT", "Europe/London"];

static OFFSET_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\(?(?:GMT|UTC)([+-])(\d{1,2})(?::?(\d{2}))?(?:[^0-9].*)?$")
        .expect("offset pattern is valid")
});

/// A DTSTART/DTEND line rewritten to UTC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UtcProperty {
    /// The complete replacement line, e.g. `DTSTART:20240615T070000Z`.
    pub line: String,
    /// The new value, e.g. `20240615T070000Z`.
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
enum Zone {
    Named(Tz),
    Offset(FixedOffset),
}

/// A `TZID` resolved to a concrete zone, with the name it resolved to.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedZone {
    pub name: String,
    zone: Zone,
}

impl ResolvedZone {
    /// Interpret `local` as wall-clock time in this zone and return the UTC
    /// equivalent. Times skipped by a DST transition have no answer;
    /// repeated times resolve to their first occurrence.
    pub fn to_utc(&self, local: &NaiveDateTime) -> Option<NaiveDateTime> {
        match &self.zone {
            Zone::Named(tz) => tz
                .from_local_datetime(local)
                .earliest()
                .map(|dt| dt.naive_utc()),
            Zone::Offset(offset) => offset
                .from_local_datetime(local)
                .single()
                .map(|dt| dt.naive_utc()),
        }
    }

    fn is_utc_alias(&self) -> bool {
        UTC_ALIASES.contains(&self.name.as_str())
    }
}

/// Resolve a `TZID` parameter value to a zone.
pub fn resolve_zone(tzid: &str) -> Option<ResolvedZone> {
    let tzid = tzid.trim();

    if let Some((_, name)) = ZONE_ALIASES.iter().find(|(alias, _)| *alias == tzid) {
        return named_zone(name);
    }

    if let Some(zone) = offset_zone(tzid) {
        return Some(zone);
    }

    named_zone(tzid)
}

fn named_zone(name: &str) -> Option<ResolvedZone> {
    Tz::from_str(name).ok().map(|tz| ResolvedZone {
        name: name.to_string(),
        zone: Zone::Named(tz),
    })
}

/// `UTC+05:30 ...` becomes the POSIX-style name `GMT-0530`. POSIX counts
/// offsets west of Greenwich as positive, so the sign flips in the name
/// while the offset itself stays east-positive.
fn offset_zone(tzid: &str) -> Option<ResolvedZone> {
    let caps = OFFSET_PATTERN.captures(tzid)?;
    let east = &caps[1] == "+";
    let hours: i32 = caps[2].parse().ok()?;
    let minutes: i32 = caps.get(3).map_or(Ok(0), |m| m.as_str().parse()).ok()?;
    if minutes >= 60 {
        return None;
    }

    let seconds = (hours * 3600 + minutes * 60) * if east { 1 } else { -1 };
    let offset = FixedOffset::east_opt(seconds)?;
    let name = format!(
        "GMT{}{:02}{:02}",
        if east { '-' } else { '+' },
        hours,
        minutes
    );

    Some(ResolvedZone {
        name,
        zone: Zone::Offset(offset),
    })
}

/// Rewrite a parameterized DTSTART/DTEND line as a UTC value.
///
/// `name` is the property name, `line` the whole logical line and `value`
/// the part after the value separator. Returns `None` when the line has no
/// `TZID`, the value is not a local date-time, the zone is unknown, or the
/// conversion cannot be trusted. Non-`TZID` parameters are kept.
pub fn normalize_to_utc(name: &str, line: &str, value: &str) -> Option<UtcProperty> {
    let (head, _) = split_property(line)?;
    let params = head.strip_prefix(name)?.strip_prefix(';')?;

    let mut tzid = None;
    let mut kept = Vec::new();
    for param in split_params(params) {
        match param.split_once('=') {
            Some((key, val)) if key.eq_ignore_ascii_case("TZID") => {
                tzid = Some(val.trim_matches('"'));
            }
            _ => kept.push(param),
        }
    }
    let tzid = tzid?;

    if value.len() != 15 {
        return None;
    }
    let local = NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S").ok()?;

    let Some(zone) = resolve_zone(tzid) else {
        tracing::debug!("Unknown timezone {:?} on {}", tzid, name);
        return None;
    };
    let Some(utc) = zone.to_utc(&local) else {
        tracing::debug!("{} does not exist in {}", value, zone.name);
        return None;
    };

    let utc_value = utc.format("%Y%m%dT%H%M%S").to_string();
    if utc_value == value && !zone.is_utc_alias() {
        tracing::debug!(
            "Conversion of {} from {} left it unchanged, not trusting it",
            value,
            zone.name
        );
        return None;
    }

    let mut prefix = name.to_string();
    for param in kept {
        prefix.push(';');
        prefix.push_str(param);
    }

    let value = format!("{}Z", utc_value);
    Some(UtcProperty {
        line: format!("{}:{}", prefix, value),
        value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn convert(line: &str) -> Option<UtcProperty> {
        let (head, value) = split_property(line).unwrap();
        let name = head.split(';').next().unwrap();
        normalize_to_utc(name, line, value)
    }

    #[test]
    fn converts_iana_zone() {
        let out = convert("DTSTART;TZID=Europe/Berlin:20240615T090000").unwrap();
        assert_eq!(out.line, "DTSTART:20240615T070000Z");
        assert_eq!(out.value, "20240615T070000Z");
    }

    #[test]
    fn converts_windows_zone_name() {
        let out = convert(r#"DTEND;TZID="W. Europe Standard Time":20240115T100000"#).unwrap();
        assert_eq!(out.line, "DTEND:20240115T090000Z");
    }

    #[test]
    fn est_follows_daylight_saving() {
        let out = convert("DTSTART;TZID=EST:20240701T120000").unwrap();
        assert_eq!(out.value, "20240701T160000Z");
    }

    #[test]
    fn converts_textual_offset() {
        let out = convert(r#"DTSTART;TZID="(UTC+05:30) Chennai, Kolkata":20240615T103000"#)
            .unwrap();
        assert_eq!(out.value, "20240615T050000Z");

        let out = convert("DTSTART;TZID=GMT-0300:20240615T090000").unwrap();
        assert_eq!(out.value, "20240615T120000Z");
    }

    #[test]
    fn offset_names_use_posix_sign() {
        assert_eq!(resolve_zone("UTC+05:30").unwrap().name, "GMT-0530");
        assert_eq!(resolve_zone("GMT-8 Pacific").unwrap().name, "GMT+0800");
    }

    #[test]
    fn keeps_other_parameters() {
        let out = convert("DTSTART;X-FOO=bar;TZID=Europe/Paris;VALUE=DATE-TIME:20240115T100000")
            .unwrap();
        assert_eq!(out.line, "DTSTART;X-FOO=bar;VALUE=DATE-TIME:20240115T090000Z");
    }

    #[test]
    fn utc_alias_passes_sanity_check() {
        let out = convert("DTSTART;TZID=UTC:20240615T090000").unwrap();
        assert_eq!(out.value, "20240615T090000Z");

        let out = convert("DTSTART;TZID=Europe/London:20240115T090000").unwrap();
        assert_eq!(out.value, "20240115T090000Z");
    }

    #[test]
    fn unchanged_value_in_other_zone_is_rejected() {
        // Reykjavik sits at UTC+0 all year but is not a known UTC alias
        assert_eq!(convert("DTSTART;TZID=Atlantic/Reykjavik:20240615T090000"), None);
        assert_eq!(convert("DTSTART;TZID=Greenwich Standard Time:20240615T090000"), None);
    }

    #[test]
    fn rejects_unconvertible_input() {
        assert_eq!(convert("DTSTART;VALUE=DATE:20240615"), None);
        assert_eq!(convert("DTSTART;TZID=Europe/Berlin:20240615"), None);
        assert_eq!(convert("DTSTART;TZID=Europe/Berlin:20240615T090000Z"), None);
        assert_eq!(convert("DTSTART;TZID=Nowhere/Special:20240615T090000"), None);
    }

    #[test]
    fn rejects_nonexistent_local_time() {
        // Clocks jump from 02:00 to 03:00 on this day in Berlin
        assert_eq!(convert("DTSTART;TZID=Europe/Berlin:20240331T023000"), None);
    }
}

//! Cut VEVENT blocks out of a calendar body.

use chrono::{Days, NaiveDate};

use super::{LogicalLine, split_property, unfold};
use crate::recurrence::{Recurrence, parse_rrule};
use crate::timezone::normalize_to_utc;

/// Attachment reference that some servers leave behind instead of inlining
/// the attachment. It points nowhere once the event leaves the mail.
pub const ATTACH_PLACEHOLDER: &str = "ATTACH:CID:...";

/// Reminder inserted when alarms are requested and the event has none.
pub const ALARM_BLOCK: &[&str] = &[
    "BEGIN:VALARM",
    "ACTION:DISPLAY",
    "DESCRIPTION:Reminder",
    "TRIGGER:-PT5M",
    "END:VALARM",
];

const ALL_DAY_MARKERS: &[&str] = &[
    "X-MICROSOFT-CDO-ALLDAYEVENT:",
    "X-MICROSOFT-MSNCALENDAR-ALLDAYEVENT:",
];

/// One VEVENT as found in a mail, ready for the event store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedEvent {
    pub uid: Option<String>,
    pub gwrecordid: Option<String>,
    pub recurrence: Option<Recurrence>,
    pub dtstamp: Option<String>,
    pub dtstart: Option<String>,
    pub dtend: Option<String>,
    /// Serialized block from `BEGIN:VEVENT` to `END:VEVENT`, newline terminated.
    pub block: String,
}

impl ExtractedEvent {
    /// GroupWise record id if present, otherwise the UID.
    pub fn identity(&self) -> Option<&str> {
        self.gwrecordid.as_deref().or(self.uid.as_deref())
    }
}

#[derive(Default)]
struct Accumulator {
    lines: Vec<String>,
    event: ExtractedEvent,
    rrule_seen: bool,
    need_alarm: bool,
}

/// Scans calendar bodies for VEVENT blocks.
pub struct Extractor {
    add_alarm: bool,
    /// Events starting before this `YYYYMMDD` date never get a reminder.
    alarm_cutoff: String,
}

impl Extractor {
    pub fn new(add_alarm: bool, today: NaiveDate) -> Self {
        let cutoff = today.checked_sub_days(Days::new(2)).unwrap_or(today);
        Extractor {
            add_alarm,
            alarm_cutoff: cutoff.format("%Y%m%d").to_string(),
        }
    }

    /// Return every complete VEVENT in `content`.
    ///
    /// Lines outside VEVENT blocks (the VCALENDAR wrapper, VTIMEZONE
    /// definitions) are dropped. A block cut off by the end of input is
    /// discarded.
    pub fn extract(&self, content: &str) -> Vec<ExtractedEvent> {
        let mut events = Vec::new();
        let mut current: Option<Accumulator> = None;

        for logical in unfold(content) {
            let marker = logical.text.trim_end();

            let Some(mut acc) = current.take() else {
                if marker == "BEGIN:VEVENT" {
                    current = Some(self.begin(&logical));
                }
                continue;
            };

            if marker == "END:VEVENT" {
                events.push(finish(acc, &logical));
            } else {
                self.feed(&mut acc, &logical);
                current = Some(acc);
            }
        }

        if let Some(acc) = current {
            tracing::debug!(
                "Discarding unterminated VEVENT ({} lines, uid {:?})",
                acc.lines.len(),
                acc.event.uid
            );
        }

        events
    }

    fn begin(&self, logical: &LogicalLine) -> Accumulator {
        Accumulator {
            lines: physical_lines(logical),
            need_alarm: self.add_alarm,
            ..Default::default()
        }
    }

    fn feed(&self, acc: &mut Accumulator, logical: &LogicalLine) {
        let text = logical.text.as_str();
        if text == ATTACH_PLACEHOLDER {
            return;
        }

        let mut lines = physical_lines(logical);
        let event = &mut acc.event;

        if let Some(v) = text.strip_prefix("UID:") {
            first_wins(&mut event.uid, v);
        } else if let Some(v) = text.strip_prefix("X-GWRECORDID:") {
            first_wins(&mut event.gwrecordid, v);
        } else if let Some(v) = text.strip_prefix("RRULE:") {
            if !acc.rrule_seen {
                acc.rrule_seen = true;
                event.recurrence = parse_rrule(v);
            }
        } else if let Some(v) = text.strip_prefix("DTSTAMP:") {
            first_wins(&mut event.dtstamp, v);
        } else if let Some(date) = date_property("DTSTART", text) {
            if event.dtstart.is_none() {
                if date.value.len() == 8 || date.value.as_str() < self.alarm_cutoff.as_str() {
                    acc.need_alarm = false;
                }
                if let Some(line) = date.replacement {
                    lines = vec![line];
                }
                event.dtstart = Some(date.value);
            }
        } else if let Some(date) = date_property("DTEND", text) {
            if event.dtend.is_none() {
                if let Some(line) = date.replacement {
                    lines = vec![line];
                }
                event.dtend = Some(date.value);
            }
        }

        if acc.need_alarm && cancels_alarm(text) {
            acc.need_alarm = false;
        }

        acc.lines.extend(lines);
    }
}

fn finish(mut acc: Accumulator, end: &LogicalLine) -> ExtractedEvent {
    if acc.need_alarm {
        acc.lines.extend(ALARM_BLOCK.iter().map(|l| l.to_string()));
    }
    acc.lines.extend(physical_lines(end));

    let mut block = acc.lines.join("\n");
    block.push('\n');
    acc.event.block = block;
    acc.event
}

fn physical_lines(logical: &LogicalLine) -> Vec<String> {
    logical.physical.iter().map(|l| l.to_string()).collect()
}

fn first_wins(field: &mut Option<String>, value: &str) {
    if field.is_none() {
        *field = Some(value.trim().to_string());
    }
}

/// Whether a line tells us the event should not get a generated reminder.
fn cancels_alarm(text: &str) -> bool {
    if text.trim_end() == "BEGIN:VALARM" {
        return true;
    }
    if let Some(kind) = text.strip_prefix("X-GWITEMTYPE:") {
        return !kind.trim().eq_ignore_ascii_case("appointment");
    }
    ALL_DAY_MARKERS.iter().any(|marker| {
        text.strip_prefix(marker)
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
    })
}

struct DateProperty {
    value: String,
    replacement: Option<String>,
}

/// Recognize `NAME:value` and `NAME;params:value`. Parameterized values are
/// converted to UTC when their timezone can be resolved.
fn date_property(name: &str, line: &str) -> Option<DateProperty> {
    let rest = line.strip_prefix(name)?;

    if let Some(value) = rest.strip_prefix(':') {
        return Some(DateProperty {
            value: value.trim().to_string(),
            replacement: None,
        });
    }

    if !rest.starts_with(';') {
        return None;
    }

    let (_, value) = split_property(line)?;
    let value = value.trim();
    match normalize_to_utc(name, line, value) {
        Some(utc) => Some(DateProperty {
            value: utc.value,
            replacement: Some(utc.line),
        }),
        None => Some(DateProperty {
            value: value.to_string(),
            replacement: None,
        }),
    }
}

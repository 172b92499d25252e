//! iCalendar text handling.
//!
//! mailcal never builds a full calendar model: events are kept as the raw
//! property lines the sender wrote, so this module only unfolds lines, cuts
//! VEVENT blocks out of a calendar body, and stitches cached blocks back
//! into one VCALENDAR document.

mod assemble;
mod extract;
mod unfold;

pub use assemble::{CALENDAR_FOOTER, CALENDAR_HEADER, assemble};
pub use extract::{ALARM_BLOCK, ATTACH_PLACEHOLDER, ExtractedEvent, Extractor};
pub use unfold::{LogicalLine, Unfold, unfold};

/// Split a property line into its `NAME;PARAMS` head and its value, at the
/// first colon that is not inside a quoted parameter value.
pub fn split_property(line: &str) -> Option<(&str, &str)> {
    let mut quoted = false;
    for (i, c) in line.char_indices() {
        match c {
            '"' => quoted = !quoted,
            ':' if !quoted => return Some((&line[..i], &line[i + 1..])),
            _ => {}
        }
    }
    None
}

/// Split a parameter list on semicolons that are not inside quotes.
pub(crate) fn split_params(params: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut quoted = false;
    let mut start = 0;
    for (i, c) in params.char_indices() {
        match c {
            '"' => quoted = !quoted,
            ';' if !quoted => {
                parts.push(&params[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&params[start..]);
    parts.into_iter().filter(|p| !p.is_empty()).collect()
}

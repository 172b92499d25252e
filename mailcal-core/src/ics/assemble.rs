//! Concatenate stored events into a single VCALENDAR document.

use std::io::{self, Write};
use std::path::Path;

use crate::date_range::DateWindow;
use crate::store::DateIndex;

pub const CALENDAR_HEADER: &str =
    "BEGIN:VCALENDAR\nVERSION:2.0\nPRODID:-//mailcal//Mail calendar extractor//EN\n";

pub const CALENDAR_FOOTER: &str = "END:VCALENDAR\n";

/// Write every stored event that falls inside `window` to `out`.
///
/// Event files are emitted byte for byte in file name order, so an unchanged
/// cache always produces an identical document. Files missing from the index
/// are included unfiltered. Returns the number of events written.
pub fn assemble<W: Write>(
    events_dir: &Path,
    index: &DateIndex,
    window: &DateWindow,
    out: &mut W,
) -> io::Result<usize> {
    let mut names: Vec<String> = std::fs::read_dir(events_dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .collect();
    names.sort();

    out.write_all(CALENDAR_HEADER.as_bytes())?;

    let mut written = 0;
    for name in names {
        if let Some(span) = index.get(&name) {
            if !window.contains(&span.start, &span.end) {
                tracing::trace!("Skipping {} ({} - {})", name, span.start, span.end);
                continue;
            }
        }

        let content = std::fs::read(events_dir.join(&name))?;
        out.write_all(&content)?;
        written += 1;
    }

    out.write_all(CALENDAR_FOOTER.as_bytes())?;
    out.flush()?;

    Ok(written)
}

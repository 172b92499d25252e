//! Reading calendar attachments out of a Maildir.

mod repair;

pub use repair::{needs_repair, repair_double_encoding};

use std::path::{Path, PathBuf};

use mailparse::{MailParseError, ParsedMail};

/// Subfolders of a Maildir that hold messages.
pub const SUBFOLDERS: [&str; 3] = ["cur", "new", "tmp"];

const CALENDAR_MIMETYPE: &str = "text/calendar";

/// Every message file in the mailbox, in a stable order.
///
/// Missing or unreadable subfolders are logged and skipped.
pub fn message_paths(root: &Path) -> Vec<PathBuf> {
    let mut paths = Vec::new();

    for sub in SUBFOLDERS {
        let dir = root.join(sub);
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Skipping {}: {}", dir.display(), e);
                continue;
            }
        };

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect();
        files.sort();
        paths.extend(files);
    }

    paths
}

/// Decoded bodies of all `text/calendar` parts of a raw message.
///
/// With `broken_utf8` set, bodies that look double-encoded are repaired.
pub fn calendar_parts(raw: &[u8], broken_utf8: bool) -> Result<Vec<String>, MailParseError> {
    let mail = mailparse::parse_mail(raw)?;
    let mut parts = Vec::new();
    collect_calendar_parts(&mail, broken_utf8, &mut parts);
    Ok(parts)
}

fn collect_calendar_parts(part: &ParsedMail, broken_utf8: bool, out: &mut Vec<String>) {
    if part.ctype.mimetype.eq_ignore_ascii_case(CALENDAR_MIMETYPE) {
        match part.get_body() {
            Ok(text) if broken_utf8 && needs_repair(&part.ctype.charset, &text) => {
                out.push(repair_double_encoding(&text));
            }
            Ok(text) => out.push(text),
            Err(e) => tracing::warn!("Cannot decode calendar part: {}", e),
        }
    }

    for sub in &part.subparts {
        collect_calendar_parts(sub, broken_utf8, out);
    }
}

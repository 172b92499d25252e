//! On-disk cache of extracted events, one file per event identity.

mod index;

pub use index::{DateIndex, EventSpan};

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::MailCalResult;
use crate::ics::{ExtractedEvent, unfold};
use crate::recurrence::project_end;

/// What happened to an event handed to [`EventStore::save`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The event was new or newer than the stored copy.
    Written,
    /// The stored copy is at least as recent; nothing changed.
    Stale,
    /// The event lacks an identity or dates and was thrown away.
    Dropped,
}

pub struct EventStore {
    dir: PathBuf,
    index: DateIndex,
}

impl EventStore {
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        EventStore {
            dir: dir.into(),
            index: DateIndex::default(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn index(&self) -> &DateIndex {
        &self.index
    }

    pub fn into_index(self) -> DateIndex {
        self.index
    }

    /// Remove every stored event and start over with an empty directory.
    pub fn reset(&mut self) -> MailCalResult<()> {
        if self.dir.exists() {
            std::fs::remove_dir_all(&self.dir)?;
        }
        std::fs::create_dir_all(&self.dir)?;
        self.index.clear();
        Ok(())
    }

    /// Store `event` unless a copy with an equal or newer DTSTAMP exists.
    pub fn save(&mut self, event: ExtractedEvent) -> MailCalResult<SaveOutcome> {
        let Some(identity) = event.identity() else {
            tracing::error!("Dropping event without UID or X-GWRECORDID");
            return Ok(SaveOutcome::Dropped);
        };
        let Some(name) = file_name_for(identity) else {
            tracing::error!("Dropping event with unusable identity {:?}", identity);
            return Ok(SaveOutcome::Dropped);
        };

        let (dtstart, dtend) = match (event.dtstart.as_deref(), event.dtend.as_deref()) {
            (Some(start), Some(end)) => (start, end),
            (Some(start), None) => (start, start),
            (None, Some(end)) => (end, end),
            (None, None) => {
                tracing::error!("Dropping event {:?} without DTSTART or DTEND", identity);
                return Ok(SaveOutcome::Dropped);
            }
        };

        let path = self.dir.join(&name);
        let dtstamp = event.dtstamp.as_deref().unwrap_or("");
        if path.exists() {
            let stored = stored_dtstamp(&path)?;
            if dtstamp <= stored.as_str() {
                tracing::trace!(
                    "Keeping stored {} ({} >= {})",
                    name,
                    stored,
                    dtstamp
                );
                return Ok(SaveOutcome::Stale);
            }
        }

        let end = match &event.recurrence {
            Some(recurrence) => project_end(dtend, recurrence).unwrap_or_else(|| {
                tracing::warn!(
                    "Could not project end of recurring event {:?} from {}",
                    identity,
                    dtend
                );
                dtend.to_string()
            }),
            None => dtend.to_string(),
        };
        std::fs::write(&path, event.block.as_bytes())?;
        self.index.insert(name.as_str(), dtstart, end);
        tracing::debug!("Stored {}", name);
        Ok(SaveOutcome::Written)
    }
}

/// Longest file name most filesystems accept, in bytes.
const MAX_NAME_LEN: usize = 255;

/// Bytes kept from an over-long identity before its digest is appended.
const KEPT_PREFIX_LEN: usize = 200;

/// File name for an identity: printable characters only, no path
/// separators. Returns `None` if nothing usable is left.
///
/// Names longer than [`MAX_NAME_LEN`] bytes are cut and suffixed with a
/// digest of the full identity, so distinct long identities stay distinct.
pub fn file_name_for(identity: &str) -> Option<String> {
    let name: String = identity
        .chars()
        .filter(|c| !c.is_control() && *c != '/' && *c != '\\')
        .collect();

    match name.as_str() {
        "" | "." | ".." => None,
        _ if name.len() > MAX_NAME_LEN => Some(shorten(&name, identity)),
        _ => Some(name),
    }
}

fn shorten(name: &str, identity: &str) -> String {
    let mut cut = KEPT_PREFIX_LEN;
    while !name.is_char_boundary(cut) {
        cut -= 1;
    }
    let digest = format!("{:x}", Sha256::digest(identity.as_bytes()));
    format!("{}-{}", &name[..cut], &digest[..16])
}

/// DTSTAMP of a stored event, or an empty string if it has none.
fn stored_dtstamp(path: &Path) -> MailCalResult<String> {
    let bytes = std::fs::read(path)?;
    let content = String::from_utf8_lossy(&bytes);

    Ok(unfold(&content)
        .find_map(|line| line.text.strip_prefix("DTSTAMP:").map(|v| v.trim().to_string()))
        .unwrap_or_default())
}

//! Identity to (start, end) index used to filter the assembled calendar.

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{MailCalError, MailCalResult};

/// Effective start and (possibly projected) end of a stored event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventSpan {
    pub start: String,
    pub end: String,
}

/// Date index keyed by stored event file name.
///
/// Persisted as one `identity\tstart\tend` line per event, sorted by
/// identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateIndex {
    entries: BTreeMap<String, EventSpan>,
}

impl DateIndex {
    pub fn insert(&mut self, identity: impl Into<String>, start: impl Into<String>, end: impl Into<String>) {
        self.entries.insert(
            identity.into(),
            EventSpan {
                start: start.into(),
                end: end.into(),
            },
        );
    }

    pub fn get(&self, identity: &str) -> Option<&EventSpan> {
        self.entries.get(identity)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Parse the persisted table. Any line without exactly three fields
    /// makes the whole table unusable.
    pub fn parse(content: &str) -> MailCalResult<Self> {
        let mut index = DateIndex::default();

        for (n, line) in content.lines().enumerate() {
            if line.is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            let [identity, start, end] = fields.as_slice() else {
                return Err(MailCalError::CorruptIndex {
                    line: n + 1,
                    content: line.to_string(),
                });
            };
            index.insert(*identity, *start, *end);
        }

        Ok(index)
    }

    pub fn load(path: &Path) -> MailCalResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn to_table(&self) -> String {
        let mut out = String::new();
        for (identity, span) in &self.entries {
            out.push_str(identity);
            out.push('\t');
            out.push_str(&span.start);
            out.push('\t');
            out.push_str(&span.end);
            out.push('\n');
        }
        out
    }

    /// Write the table, replacing the previous one atomically.
    pub fn save(&self, path: &Path) -> MailCalResult<()> {
        let temp = path.with_extension("tmp");
        std::fs::write(&temp, self.to_table())?;
        std::fs::rename(&temp, path)?;
        Ok(())
    }
}

//! Record of what the previous run produced.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{MailCalError, MailCalResult};

/// Inputs and results of the last extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionRecord {
    pub mailbox_hash: String,
    pub store_hash: String,
    pub index_hash: String,
    pub add_alarm: bool,
    pub broken_utf8: bool,
}

/// Inputs of the last generated document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub store_hash: String,
    pub index_hash: String,
    pub past: String,
    pub future: String,
    /// `None` when the document went to standard output.
    pub output: Option<PathBuf>,
}

/// Stored as `manifest.toml` with one table per cache level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub extraction: Option<ExtractionRecord>,
    pub document: Option<DocumentRecord>,
}

impl Manifest {
    /// Load the manifest. A missing or unreadable one is treated as empty,
    /// which makes the next run rebuild everything.
    pub fn load(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                tracing::debug!("No manifest at {}: {}", path.display(), e);
                return Manifest::default();
            }
        };

        toml::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!("Ignoring unreadable manifest {}: {}", path.display(), e);
            Manifest::default()
        })
    }

    pub fn save(&self, path: &Path) -> MailCalResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| MailCalError::Manifest(e.to_string()))?;

        let temp = path.with_extension("toml.tmp");
        std::fs::write(&temp, content)?;
        std::fs::rename(&temp, path)?;
        Ok(())
    }
}

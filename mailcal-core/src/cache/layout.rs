//! Where a mailbox's cache lives on disk.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::{MailCalError, MailCalResult};

const MANIFEST_FILE: &str = "manifest.toml";
const EVENTS_DIR: &str = "events";
const INDEX_FILE: &str = "index.tsv";

/// Paths of one mailbox's cache: `<cache_root>/<mailbox key>/...`
#[derive(Debug, Clone)]
pub struct CacheLayout {
    root: PathBuf,
}

impl CacheLayout {
    /// Platform cache directory, e.g. `~/.cache/mailcal` on Linux.
    pub fn default_root() -> MailCalResult<PathBuf> {
        dirs::cache_dir()
            .map(|dir| dir.join("mailcal"))
            .ok_or(MailCalError::NoCacheDir)
    }

    /// Layout for `mailbox`, which should already be absolute so that the
    /// same mailbox always maps to the same directory.
    pub fn for_mailbox(cache_root: &Path, mailbox: &Path) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(mailbox.to_string_lossy().as_bytes());
        let key = format!("{:x}", hasher.finalize());

        CacheLayout {
            root: cache_root.join(&key[..16]),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    pub fn events_dir(&self) -> PathBuf {
        self.root.join(EVENTS_DIR)
    }

    pub fn index_path(&self) -> PathBuf {
        self.root.join(INDEX_FILE)
    }
}

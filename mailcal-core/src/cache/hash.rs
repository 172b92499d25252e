//! Content hashes of files and directory trees.

use std::fs::File;
use std::io;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::maildir::SUBFOLDERS;

/// Hash reported for a path that does not exist.
pub const ABSENT: &str = "absent";

/// SHA-256 over a file, or over a directory tree in name order.
pub fn hash_tree(path: &Path) -> String {
    if !path.exists() {
        return ABSENT.to_string();
    }
    let mut hasher = Sha256::new();
    update_with_path(&mut hasher, path);
    format!("{:x}", hasher.finalize())
}

/// Hash of the three Maildir subfolders, the only part of a mailbox that
/// extraction reads.
pub fn hash_maildir(root: &Path) -> String {
    let mut hasher = Sha256::new();
    for sub in SUBFOLDERS {
        hasher.update(sub.as_bytes());
        hasher.update(hash_tree(&root.join(sub)).as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

fn update_with_path(hasher: &mut Sha256, path: &Path) {
    if path.is_dir() {
        let mut entries: Vec<_> = match std::fs::read_dir(path) {
            Ok(entries) => entries.filter_map(|e| e.ok()).collect(),
            Err(e) => {
                tracing::debug!("Cannot list {}: {}", path.display(), e);
                hasher.update(b"\0unreadable-dir");
                return;
            }
        };
        entries.sort_by_key(|e| e.file_name());

        for entry in entries {
            hasher.update(entry.file_name().as_encoded_bytes());
            hasher.update(b"\0");
            let mut child = Sha256::new();
            update_with_path(&mut child, &entry.path());
            hasher.update(child.finalize());
        }
    } else if let Err(e) = File::open(path).and_then(|mut f| io::copy(&mut f, hasher)) {
        tracing::debug!("Cannot read {}: {}", path.display(), e);
        hasher.update(b"\0unreadable-file");
    }
}

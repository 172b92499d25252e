//! State kept between runs to skip work that would not change anything.

mod hash;
mod layout;
mod manifest;

pub use hash::{ABSENT, hash_maildir, hash_tree};
pub use layout::CacheLayout;
pub use manifest::{DocumentRecord, ExtractionRecord, Manifest};

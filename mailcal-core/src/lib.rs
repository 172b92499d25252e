//! Core of mailcal: pulls calendar invitations out of a Maildir and keeps
//! them in an incremental on-disk cache.
//!
//! - `ics` unfolds, extracts and assembles iCalendar text
//! - `timezone` and `recurrence` normalize dates for filtering
//! - `store` holds one file per event plus the date index
//! - `cache` decides what can be skipped between runs
//! - `pipeline` ties everything together for one invocation

pub mod cache;
pub mod date_range;
pub mod error;
pub mod ics;
pub mod maildir;
pub mod pipeline;
pub mod recurrence;
pub mod store;
pub mod timezone;

pub use error::{MailCalError, MailCalResult};
pub use pipeline::{OutputTarget, Pipeline, RunOptions, RunOutcome};

//! One mailcal run: refresh the event cache, then the output document.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::cache::{CacheLayout, DocumentRecord, ExtractionRecord, Manifest, hash_maildir, hash_tree};
use crate::date_range::{DEFAULT_FUTURE_DAYS, DEFAULT_PAST_DAYS, DateWindow};
use crate::error::{MailCalError, MailCalResult};
use crate::ics::{Extractor, assemble};
use crate::maildir;
use crate::store::{DateIndex, EventStore, SaveOutcome};

/// Where the assembled calendar goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    Stdout,
    File(PathBuf),
}

impl OutputTarget {
    fn path(&self) -> Option<&Path> {
        match self {
            OutputTarget::Stdout => None,
            OutputTarget::File(path) => Some(path),
        }
    }
}

/// Everything a run needs to know, as handed over by the CLI.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub mailbox: PathBuf,
    pub output: OutputTarget,
    /// Ignore events that ended more than this many days ago.
    pub past_days: u32,
    /// Ignore events starting more than this many days ahead.
    pub future_days: u32,
    pub add_alarm: bool,
    pub broken_utf8: bool,
    pub force: bool,
    pub cache_root: PathBuf,
}

impl RunOptions {
    pub fn new(mailbox: impl Into<PathBuf>, cache_root: impl Into<PathBuf>) -> Self {
        RunOptions {
            mailbox: mailbox.into(),
            output: OutputTarget::Stdout,
            past_days: DEFAULT_PAST_DAYS,
            future_days: DEFAULT_FUTURE_DAYS,
            add_alarm: false,
            broken_utf8: false,
            force: false,
            cache_root: cache_root.into(),
        }
    }
}

/// Which cache levels were rebuilt by a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunOutcome {
    pub extracted: bool,
    pub generated: bool,
}

/// State of a single run. Holds what used to be process-wide: the options,
/// the manifest from the previous run and the reference day.
pub struct Pipeline {
    options: RunOptions,
    layout: CacheLayout,
    manifest: Manifest,
    today: NaiveDate,
}

impl Pipeline {
    pub fn new(mut options: RunOptions) -> MailCalResult<Self> {
        if !options.mailbox.is_dir() {
            return Err(MailCalError::MailboxNotFound(options.mailbox));
        }
        options.mailbox = std::fs::canonicalize(&options.mailbox)?;

        let layout = CacheLayout::for_mailbox(&options.cache_root, &options.mailbox);
        let manifest = Manifest::load(&layout.manifest_path());

        Ok(Pipeline {
            options,
            layout,
            manifest,
            today: chrono::Local::now().date_naive(),
        })
    }

    /// Use `today` instead of the current date for the output window and
    /// the reminder cutoff.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn layout(&self) -> &CacheLayout {
        &self.layout
    }

    pub fn window(&self) -> DateWindow {
        DateWindow::around(self.today, self.options.past_days, self.options.future_days)
    }

    pub fn run(&mut self) -> MailCalResult<RunOutcome> {
        std::fs::create_dir_all(self.layout.root())?;

        let (index, extracted) = self.refresh_events()?;
        let generated = self.refresh_document(&index)?;

        if extracted || generated {
            self.manifest.save(&self.layout.manifest_path())?;
        }

        Ok(RunOutcome {
            extracted,
            generated,
        })
    }

    // =========================================================================
    // Level 1: event store
    // =========================================================================

    fn extraction_is_stale(&self, mailbox_hash: &str) -> bool {
        let Some(last) = &self.manifest.extraction else {
            return true;
        };

        self.options.force
            || last.mailbox_hash != mailbox_hash
            || !self.layout.events_dir().is_dir()
            || last.store_hash != hash_tree(&self.layout.events_dir())
            || last.index_hash != hash_tree(&self.layout.index_path())
            || last.add_alarm != self.options.add_alarm
            || last.broken_utf8 != self.options.broken_utf8
    }

    fn refresh_events(&mut self) -> MailCalResult<(DateIndex, bool)> {
        let mailbox_hash = hash_maildir(&self.options.mailbox);

        if !self.extraction_is_stale(&mailbox_hash) {
            match DateIndex::load(&self.layout.index_path()) {
                Ok(index) => {
                    tracing::info!("Event cache is up to date ({} events)", index.len());
                    return Ok((index, false));
                }
                Err(e) => tracing::warn!("Rebuilding event cache: {}", e),
            }
        }

        let index = self.extract_all()?;
        let index_path = self.layout.index_path();
        index.save(&index_path)?;

        self.manifest.extraction = Some(ExtractionRecord {
            mailbox_hash,
            store_hash: hash_tree(&self.layout.events_dir()),
            index_hash: hash_tree(&index_path),
            add_alarm: self.options.add_alarm,
            broken_utf8: self.options.broken_utf8,
        });

        Ok((index, true))
    }

    fn extract_all(&self) -> MailCalResult<DateIndex> {
        let mut store = EventStore::open(self.layout.events_dir());
        store.reset()?;

        let extractor = Extractor::new(self.options.add_alarm, self.today);
        let mut written = 0;

        for path in maildir::message_paths(&self.options.mailbox) {
            let raw = match std::fs::read(&path) {
                Ok(raw) => raw,
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", path.display(), e);
                    continue;
                }
            };
            let parts = match maildir::calendar_parts(&raw, self.options.broken_utf8) {
                Ok(parts) => parts,
                Err(e) => {
                    tracing::warn!("Skipping unparseable mail {}: {}", path.display(), e);
                    continue;
                }
            };

            for text in parts {
                for event in extractor.extract(&text) {
                    let identity = event.identity().unwrap_or_default().to_string();
                    match store.save(event) {
                        Ok(SaveOutcome::Written) => written += 1,
                        Ok(_) => {}
                        Err(e) => tracing::warn!(
                            "Skipping event {:?} from {}: {}",
                            identity,
                            path.display(),
                            e
                        ),
                    }
                }
            }
        }

        tracing::info!(
            "Extracted events from {}: {} writes, {} stored",
            self.options.mailbox.display(),
            written,
            store.index().len()
        );
        Ok(store.into_index())
    }

    // =========================================================================
    // Level 2: output document
    // =========================================================================

    fn document_is_stale(&self, record: &DocumentRecord) -> bool {
        let Some(last) = &self.manifest.document else {
            return true;
        };
        let output = self.options.output.path();

        self.options.force
            || last.store_hash != record.store_hash
            || last.index_hash != record.index_hash
            || last.past != record.past
            || last.future != record.future
            || output.is_none()
            || last.output.as_deref() != output
            || !output.is_some_and(Path::exists)
    }

    fn refresh_document(&mut self, index: &DateIndex) -> MailCalResult<bool> {
        let window = self.window();
        let record = DocumentRecord {
            store_hash: hash_tree(&self.layout.events_dir()),
            index_hash: hash_tree(&self.layout.index_path()),
            past: window.past.clone(),
            future: window.future.clone(),
            output: self.options.output.path().map(Path::to_path_buf),
        };

        if !self.document_is_stale(&record) {
            tracing::info!("Calendar is up to date, not regenerating");
            return Ok(false);
        }

        let written = self.write_document(index, &window)?;
        tracing::info!(
            "Wrote {} events between {} and {}",
            written,
            window.past,
            window.future
        );

        self.manifest.document = Some(record);
        Ok(true)
    }

    fn write_document(&self, index: &DateIndex, window: &DateWindow) -> MailCalResult<usize> {
        let events_dir = self.layout.events_dir();

        match &self.options.output {
            OutputTarget::Stdout => {
                let mut out = io::stdout().lock();
                match assemble(&events_dir, index, window, &mut out) {
                    Ok(written) => Ok(written),
                    Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                        tracing::debug!("Standard output closed early");
                        Ok(0)
                    }
                    Err(e) => Err(e.into()),
                }
            }
            OutputTarget::File(path) => {
                let mut temp = path.clone().into_os_string();
                temp.push(".tmp");
                let temp = PathBuf::from(temp);

                let mut out = BufWriter::new(File::create(&temp)?);
                let written = assemble(&events_dir, index, window, &mut out)?;
                out.into_inner().map_err(|e| e.into_error())?.sync_all()?;
                std::fs::rename(&temp, path)?;
                Ok(written)
            }
        }
    }
}

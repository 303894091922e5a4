//! Load-once, read-many access to the decoded table.
//!
//! # States
//!
//! ```text
//! Unloaded ──ensure_loaded──▶ Loading ──ok──▶ Loaded
//!    ▲                           │
//!    │                           └──err──▶ Failed ──ensure_loaded──▶ Loading
//!    └──────────── reset ◀──────────────────────────────────────────────
//! ```
//!
//! `Failed` is never sticky: the next `ensure_loaded` retries.  Loading and
//! looking up are separate operations; [`LutLoader::lookup`] never parses and
//! simply answers `None` until a table is in place.
//!
//! # Concurrency
//! The table is held as an `Arc<LutTable>` behind a read-write lock.  A load
//! builds the complete table first and then swaps the `Arc` in one write, so
//! readers see either the old table or the new one, never a partial one.
//! Loads are serialized by a separate mutex; concurrent `ensure_loaded`
//! callers parse once.

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::LoaderConfig;
use crate::error::LoadError;
use crate::parse::{parse_with, ParseOptions};
use crate::source::{ByteSource, CachedFileSource, CommandDownloader};
use crate::table::{LutTable, MethodId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderState {
    Unloaded,
    Loading,
    Loaded,
    Failed,
}

/// Result of a load attempt as seen by lookup consumers.  Both failure
/// variants behave the same (every lookup is unknown); they differ only for
/// diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded,
    /// The bytes could not be obtained.
    NotAvailable,
    /// The bytes were obtained but did not decode.
    MalformedSource,
}

impl LoadError {
    pub fn outcome(&self) -> LoadOutcome {
        match self {
            LoadError::Source(_)    => LoadOutcome::NotAvailable,
            LoadError::Malformed(_) => LoadOutcome::MalformedSource,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Status {
    state:        LoaderState,
    last_outcome: Option<LoadOutcome>,
    loaded_at:    Option<DateTime<Utc>>,
}

impl Status {
    const UNLOADED: Status = Status { state: LoaderState::Unloaded, last_outcome: None, loaded_at: None };
}

pub struct LutLoader {
    source:    Box<dyn ByteSource>,
    options:   ParseOptions,
    table:     RwLock<Option<Arc<LutTable>>>,
    status:    RwLock<Status>,
    load_lock: Mutex<()>,
}

impl LutLoader {
    pub fn new(source: Box<dyn ByteSource>) -> Self {
        Self::with_options(source, ParseOptions::default())
    }

    pub fn with_options(source: Box<dyn ByteSource>, options: ParseOptions) -> Self {
        Self {
            source,
            options,
            table:     RwLock::new(None),
            status:    RwLock::new(Status::UNLOADED),
            load_lock: Mutex::new(()),
        }
    }

    /// Local cache file from `config`, downloaded on first use when
    /// `auto_download` is set.
    pub fn from_config(config: &LoaderConfig) -> Self {
        let source: Box<dyn ByteSource> = if config.auto_download {
            Box::new(CachedFileSource::with_downloader(
                &config.lut_path,
                Box::new(CommandDownloader::new(config.download_url.clone())),
            ))
        } else {
            Box::new(CachedFileSource::new(&config.lut_path))
        };
        Self::with_options(source, ParseOptions { strict_checksum: config.strict_checksum })
    }

    // ── Loading ──────────────────────────────────────────────────────────────

    /// Load the table unless one is already in place.  Idempotent.
    pub fn try_ensure_loaded(&self) -> Result<Arc<LutTable>, LoadError> {
        if let Some(table) = self.table() {
            return Ok(table);
        }
        let _guard = self.load_lock.lock();
        if let Some(table) = self.table() {
            return Ok(table);
        }
        self.load_locked()
    }

    /// Like [`try_ensure_loaded`](Self::try_ensure_loaded), but downgrades
    /// every failure to an outcome.  Never panics, never propagates.
    pub fn ensure_loaded(&self) -> LoadOutcome {
        match self.try_ensure_loaded() {
            Ok(_)  => LoadOutcome::Loaded,
            Err(e) => {
                warn!("bank-code lookups unavailable; check method ids must be given explicitly");
                e.outcome()
            }
        }
    }

    /// Parse a fresh copy and swap it in.  On failure the previous table, if
    /// any, stays in service.
    pub fn reload(&self) -> Result<Arc<LutTable>, LoadError> {
        let _guard = self.load_lock.lock();
        self.load_locked()
    }

    /// Drop the table and return to `Unloaded`.
    pub fn reset(&self) {
        let _guard = self.load_lock.lock();
        *self.table.write()  = None;
        *self.status.write() = Status::UNLOADED;
        info!(source = %self.source.describe(), "BLZ lookup table reset");
    }

    fn load_locked(&self) -> Result<Arc<LutTable>, LoadError> {
        self.status.write().state = LoaderState::Loading;
        let origin = self.source.describe();
        info!(source = %origin, "loading BLZ lookup table");

        let result = self
            .source
            .fetch()
            .map_err(LoadError::from)
            .and_then(|bytes| parse_with(&bytes, &self.options).map_err(LoadError::from));

        match result {
            Ok(table) => {
                let table = Arc::new(table);
                *self.table.write() = Some(Arc::clone(&table));
                *self.status.write() = Status {
                    state:        LoaderState::Loaded,
                    last_outcome: Some(LoadOutcome::Loaded),
                    loaded_at:    Some(Utc::now()),
                };
                info!(source = %origin, format = %table.format(), entries = table.len(),
                      "BLZ lookup table loaded");
                Ok(table)
            }
            Err(e) => {
                error!(source = %origin, error = %e, "failed to load BLZ lookup table");
                let has_table = self.table.read().is_some();
                let mut status = self.status.write();
                status.state = if has_table { LoaderState::Loaded } else { LoaderState::Failed };
                status.last_outcome = Some(e.outcome());
                Err(e)
            }
        }
    }

    // ── Queries ──────────────────────────────────────────────────────────────

    /// Method id for an 8-digit bank code; `None` when unknown or when no
    /// table is loaded.  Never triggers a load.
    pub fn lookup(&self, bank_code: &str) -> Option<MethodId> {
        self.table.read().as_ref().and_then(|t| t.lookup(bank_code))
    }

    /// An explicit method id wins; otherwise the table decides.  `None`
    /// means the caller has to ask for an explicit id.
    pub fn resolve_method(&self, bank_code: &str, explicit: Option<MethodId>) -> Option<MethodId> {
        explicit.or_else(|| self.lookup(bank_code))
    }

    /// Snapshot of the current table.  Stays valid across reloads.
    pub fn table(&self) -> Option<Arc<LutTable>> {
        self.table.read().clone()
    }

    pub fn state(&self) -> LoaderState {
        self.status.read().state
    }

    pub fn last_outcome(&self) -> Option<LoadOutcome> {
        self.status.read().last_outcome
    }

    pub fn loaded_at(&self) -> Option<DateTime<Utc>> {
        self.status.read().loaded_at
    }

    pub fn is_loaded(&self) -> bool {
        self.table.read().is_some()
    }

    pub fn source(&self) -> &dyn ByteSource {
        self.source.as_ref()
    }
}

//! Persistence layer.
//!
//! Two files feed the price baseline at startup:
//! - the bulk snapshot, a JSON array of BIN listings written by the
//!   external collector;
//! - the live history, JSON Lines appended by this process with every new
//!   listing it evaluates.
//!
//! The live file is only ever appended to, so earlier records are never
//! rewritten.

use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::types::{Listing, SniperError};

/// Destination for newly observed listings.
#[cfg_attr(test, mockall::automock)]
pub trait ListingSink: Send {
    /// Append listings to durable storage.
    fn append(&mut self, listings: &[Listing]) -> Result<(), SniperError>;
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load historical BIN listings from the bulk snapshot and, when present,
/// the live history.
///
/// A missing file is not an error (fresh start). Records that fail to parse
/// are skipped; non-BIN records are dropped.
pub fn load_history(snapshot: &Path, live: Option<&Path>) -> Result<Vec<Listing>> {
    let mut listings = load_snapshot(snapshot)?;
    if let Some(live) = live {
        listings.extend(load_live(live)?);
    }
    listings.retain(|l| l.bin);

    info!(listings = listings.len(), "Historical listings loaded");
    Ok(listings)
}

fn load_snapshot(path: &Path) -> Result<Vec<Listing>> {
    if !path.exists() {
        warn!(path = %path.display(), "No baseline snapshot found, starting with an empty baseline");
        return Ok(Vec::new());
    }

    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read baseline snapshot {}", path.display()))?;
    let records: Vec<serde_json::Value> = serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse baseline snapshot {}", path.display()))?;

    let total = records.len();
    let listings: Vec<Listing> = records
        .iter()
        .filter_map(|r| Listing::from_raw(r).ok())
        .collect();

    info!(
        path = %path.display(),
        listings = listings.len(),
        skipped = total - listings.len(),
        "Baseline snapshot loaded"
    );
    Ok(listings)
}

fn load_live(path: &Path) -> Result<Vec<Listing>> {
    if !path.exists() {
        debug!(path = %path.display(), "No live history yet");
        return Ok(Vec::new());
    }

    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read live history {}", path.display()))?;

    let mut listings = Vec::new();
    let mut skipped = 0usize;
    for line in text.lines().filter(|l| !l.trim().is_empty()) {
        // A crash mid-append can leave a torn last line; skip it.
        match serde_json::from_str::<serde_json::Value>(line)
            .ok()
            .and_then(|v| Listing::from_raw(&v).ok())
        {
            Some(listing) => listings.push(listing),
            None => skipped += 1,
        }
    }

    info!(
        path = %path.display(),
        listings = listings.len(),
        skipped,
        "Live history loaded"
    );
    Ok(listings)
}

// ---------------------------------------------------------------------------
// Appending
// ---------------------------------------------------------------------------

/// JSON Lines history file, one listing per line.
pub struct JsonlHistoryStore {
    path: PathBuf,
}

impl JsonlHistoryStore {
    /// Point the store at `path`, creating parent directories if needed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SniperError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| SniperError::PersistenceFailure {
                path: parent.display().to_string(),
                message: e.to_string(),
            })?;
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn failure(&self, e: impl ToString) -> SniperError {
        SniperError::PersistenceFailure {
            path: self.path.display().to_string(),
            message: e.to_string(),
        }
    }
}

impl ListingSink for JsonlHistoryStore {
    fn append(&mut self, listings: &[Listing]) -> Result<(), SniperError> {
        if listings.is_empty() {
            return Ok(());
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.failure(e))?;
        let mut out = BufWriter::new(file);

        for listing in listings {
            serde_json::to_writer(&mut out, listing).map_err(|e| self.failure(e))?;
            out.write_all(b"\n").map_err(|e| self.failure(e))?;
        }
        out.flush().map_err(|e| self.failure(e))?;

        debug!(path = %self.path.display(), appended = listings.len(), "History appended");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

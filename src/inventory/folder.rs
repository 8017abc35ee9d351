//! Folder inventory: the authoritative view of one tracked folder.
//!
//! Each [`FolderInventory`] owns a byte-size cap, the running total of known
//! file sizes, and the observation-ordered queue of known files. Adding a
//! file and running the eviction check execute as one critical section under
//! the folder's own lock, so counters stay exact even with concurrent
//! producers. Folders share no mutable state.
//!
//! Eviction is strict FIFO on observation order: the file this process saw
//! first is the first to go, regardless of size or modification time.

#![allow(missing_docs)]

use std::collections::{HashSet, VecDeque};
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::core::errors::{DircapError, Result};

/// Share of the capacity cap reclaimed per eviction pass, as a divisor.
///
/// A pass frees capacity/10 (10%) in one batch so a stream of small
/// overflows does not evict one file at a time at the cap boundary.
const RECLAIM_DIVISOR: u64 = 10;

/// A file known to the inventory. Created when first seen, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Base name, unique within the folder.
    pub name: OsString,
    /// Size reported by the stat that first observed the file.
    pub size_bytes: u64,
    /// Modification time at first observation. Informational only; eviction
    /// order is observation order, not this timestamp.
    pub observed_at: DateTime<Utc>,
}

impl FileRecord {
    #[must_use]
    pub fn new(name: impl Into<OsString>, size_bytes: u64) -> Self {
        Self {
            name: name.into(),
            size_bytes,
            observed_at: Utc::now(),
        }
    }

    /// Build a record from a stat result.
    #[must_use]
    pub fn from_metadata(name: impl Into<OsString>, metadata: &fs::Metadata) -> Self {
        let observed_at = metadata
            .modified()
            .map_or_else(|_| Utc::now(), DateTime::<Utc>::from);
        Self {
            name: name.into(),
            size_bytes: metadata.len(),
            observed_at,
        }
    }
}

/// Outcome of one eviction pass, for logging. `files_evicted` counts files
/// physically deleted; `files_missing` counts records whose file had already
/// vanished; `bytes_freed` sums the recorded sizes of both.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvictionReport {
    pub files_evicted: usize,
    pub files_missing: usize,
    pub bytes_freed: u64,
}

impl EvictionReport {
    /// True when the pass removed nothing (inventory was under cap).
    #[must_use]
    pub const fn is_noop(&self) -> bool {
        self.files_evicted == 0 && self.files_missing == 0
    }
}

#[derive(Debug, Default)]
struct InventoryState {
    current_size_bytes: u64,
    records: VecDeque<FileRecord>,
    known_names: HashSet<OsString>,
}

impl InventoryState {
    /// Append a record unless its name is already known. Never removes data.
    fn add(&mut self, record: FileRecord) -> bool {
        if self.known_names.contains(&record.name) {
            return false;
        }
        self.known_names.insert(record.name.clone());
        self.current_size_bytes += record.size_bytes;
        self.records.push_back(record);
        true
    }
}

/// The authoritative view of one tracked folder.
pub struct FolderInventory {
    path: PathBuf,
    capacity_bytes: u64,
    state: Mutex<InventoryState>,
}

impl FolderInventory {
    #[must_use]
    pub fn new(path: PathBuf, capacity_bytes: u64) -> Self {
        Self {
            path,
            capacity_bytes,
            state: Mutex::new(InventoryState::default()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub const fn capacity_bytes(&self) -> u64 {
        self.capacity_bytes
    }

    #[must_use]
    pub fn current_size_bytes(&self) -> u64 {
        self.state.lock().current_size_bytes
    }

    #[must_use]
    pub fn file_count(&self) -> usize {
        self.state.lock().records.len()
    }

    /// Known file names, oldest-observed first.
    #[must_use]
    pub fn known_files(&self) -> Vec<OsString> {
        self.state
            .lock()
            .records
            .iter()
            .map(|record| record.name.clone())
            .collect()
    }

    /// One-time directory scan populating the inventory before live events
    /// are routed to this folder.
    ///
    /// Non-recursive; subdirectories are skipped. Every regular file is added
    /// through the same path as a live observation. The scan itself never
    /// evicts; an over-cap folder is brought back under cap by the first live
    /// event. Any read or stat error makes the whole folder unusable.
    ///
    /// Returns the number of files loaded.
    pub fn load_initial_state(&self) -> Result<usize> {
        let entries = fs::read_dir(&self.path).map_err(|error| DircapError::InitialScan {
            path: self.path.clone(),
            details: format!("reading directory: {error}"),
        })?;

        let mut loaded = 0;
        for entry in entries {
            let entry = entry.map_err(|error| DircapError::InitialScan {
                path: self.path.clone(),
                details: format!("reading directory entry: {error}"),
            })?;
            let metadata = entry.metadata().map_err(|error| DircapError::InitialScan {
                path: self.path.clone(),
                details: format!("stat of {:?}: {error}", entry.file_name()),
            })?;
            if !metadata.is_file() {
                continue;
            }
            if self.add_file(FileRecord::from_metadata(entry.file_name(), &metadata)) {
                loaded += 1;
            }
        }
        Ok(loaded)
    }

    /// Record a newly observed file. No-op if the name is already known.
    /// Returns whether the record was added.
    pub fn add_file(&self, record: FileRecord) -> bool {
        self.state.lock().add(record)
    }

    /// Record a live-observed file and immediately run the eviction check,
    /// as one atomic critical section.
    pub fn observe(&self, record: FileRecord) -> Result<EvictionReport> {
        let mut state = self.state.lock();
        state.add(record);
        self.free_up_space_locked(&mut state)
    }

    /// Eviction check and pass. Caller holds the state lock.
    ///
    /// Triggers when the current total (already including any file just
    /// added) exceeds the cap. Reclaims a flat 10%-of-capacity batch by
    /// popping the oldest records; a record whose file already vanished is
    /// skipped without error, while a failed deletion of an existing file is
    /// fatal. Counters and the reclaim budget are decremented by recorded
    /// sizes, never by re-stat.
    fn free_up_space_locked(&self, state: &mut InventoryState) -> Result<EvictionReport> {
        let mut report = EvictionReport::default();
        if state.current_size_bytes <= self.capacity_bytes {
            return Ok(report);
        }

        // Never zero: a degenerate sub-10-byte cap must still evict the head.
        let mut budget = (self.capacity_bytes / RECLAIM_DIVISOR).max(1);
        while budget > 0 {
            let Some(record) = state.records.pop_front() else {
                break;
            };
            let file_path = self.path.join(&record.name);

            match fs::symlink_metadata(&file_path) {
                Ok(_) => {
                    if let Err(source) = fs::remove_file(&file_path) {
                        // Put the head back so counters still match the queue;
                        // the caller treats this as unrecoverable either way.
                        state.records.push_front(record);
                        return Err(DircapError::Evict {
                            path: file_path,
                            source,
                        });
                    }
                    report.files_evicted += 1;
                }
                Err(error) if error.kind() == io::ErrorKind::NotFound => {
                    report.files_missing += 1;
                }
                Err(source) => {
                    state.records.push_front(record);
                    return Err(DircapError::Evict {
                        path: file_path,
                        source,
                    });
                }
            }

            state.known_names.remove(&record.name);
            state.current_size_bytes = state.current_size_bytes.saturating_sub(record.size_bytes);
            report.bytes_freed += record.size_bytes;
            budget = budget.saturating_sub(record.size_bytes);
        }

        Ok(report)
    }
}

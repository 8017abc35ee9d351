//! Watch router: subscribes to creation notifications for every tracked
//! folder and drives the purge for the life of the process.
//!
//! One long-lived consumer drains a crossbeam channel fed by the notify
//! backend's own thread. All per-folder mutation runs synchronously inside
//! that consumer, so a slow filesystem stalls every folder; the per-folder
//! locks exist for correctness under additional producers, not for
//! parallelism here.
//!
//! [`WatchRouter::run`] blocks until a fatal error or a shutdown signal —
//! steady-state operation never returns.

#![allow(missing_docs)]

use std::collections::HashMap;
use std::convert::Infallible;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, unbounded};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::core::errors::{DircapError, Result};
use crate::inventory::folder::{FileRecord, FolderInventory};
use crate::logger::jsonl::{EventType, JsonlWriter, LogEntry, Severity};
use crate::watch::signals::ShutdownSignal;

/// How long one channel wait may block before the shutdown flag is re-polled.
const SHUTDOWN_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Routes creation notifications to the owning folder inventory.
///
/// Holds the folder set explicitly — there is no process-wide watcher state.
/// Folders are set up in configuration order and live for the whole run.
pub struct WatchRouter {
    folders: Vec<FolderInventory>,
    by_path: HashMap<PathBuf, usize>,
    logger: JsonlWriter,
    shutdown: ShutdownSignal,
}

impl WatchRouter {
    #[must_use]
    pub fn new(folders: Vec<FolderInventory>, logger: JsonlWriter, shutdown: ShutdownSignal) -> Self {
        let by_path = folders
            .iter()
            .enumerate()
            .map(|(index, folder)| (folder.path().to_path_buf(), index))
            .collect();
        Self {
            folders,
            by_path,
            logger,
            shutdown,
        }
    }

    /// Folder lookup by exact configured path.
    #[must_use]
    pub fn folder(&self, path: &Path) -> Option<&FolderInventory> {
        self.by_path.get(path).map(|&index| &self.folders[index])
    }

    /// Set up every folder, then block dispatching events until a fatal
    /// error or a shutdown signal. Never returns `Ok`.
    pub fn run(mut self) -> Result<Infallible> {
        let (tx, rx) = unbounded::<notify::Result<Event>>();
        let mut watcher = RecommendedWatcher::new(
            move |result| {
                let _ = tx.send(result);
            },
            notify::Config::default(),
        )
        .map_err(|error| DircapError::WatchRegister {
            path: PathBuf::new(),
            details: format!("creating watcher backend: {error}"),
        })?;

        for index in 0..self.folders.len() {
            self.setup_folder(&mut watcher, index)?;
        }

        self.logger
            .write_entry(&LogEntry::new(EventType::DaemonStart, Severity::Info));

        // `watcher` must outlive the loop: dropping it closes the channel.
        let outcome = self.event_loop(&rx);
        drop(watcher);
        outcome
    }

    /// Per-folder setup, in configuration order: create the directory if
    /// absent, register the non-recursive watch, then scan existing content.
    ///
    /// Watch before scan: a file landing between the two is seen by both,
    /// and the duplicate observation is a no-op. Any failure aborts the run;
    /// partial operation with unmonitored folders is not supported.
    fn setup_folder(&mut self, watcher: &mut RecommendedWatcher, index: usize) -> Result<()> {
        let folder = &self.folders[index];
        let path = folder.path().to_path_buf();

        if !path.exists() {
            fs::create_dir_all(&path).map_err(|source| DircapError::FolderCreate {
                path: path.clone(),
                source,
            })?;
        }

        let mut tracked = LogEntry::new(EventType::FolderTracked, Severity::Info).with_path(&path);
        tracked.capacity = Some(folder.capacity_bytes());
        self.logger.write_entry(&tracked);

        watcher
            .watch(&path, RecursiveMode::NonRecursive)
            .map_err(|error| DircapError::WatchRegister {
                path: path.clone(),
                details: error.to_string(),
            })?;

        let loaded = folder.load_initial_state()?;
        let mut entry = LogEntry::new(EventType::ScanComplete, Severity::Info).with_path(&path);
        entry.capacity = Some(folder.capacity_bytes());
        entry.current_size = Some(folder.current_size_bytes());
        entry.details = Some(format!("{loaded} files loaded"));
        self.logger.write_entry(&entry);
        Ok(())
    }

    fn event_loop(&mut self, rx: &Receiver<notify::Result<Event>>) -> Result<Infallible> {
        loop {
            if self.shutdown.should_shutdown() {
                self.logger
                    .write_entry(&LogEntry::new(EventType::DaemonStop, Severity::Info));
                return Err(DircapError::ShutdownRequested);
            }

            match rx.recv_timeout(SHUTDOWN_POLL_INTERVAL) {
                Ok(Ok(event)) => self.dispatch(&event)?,
                Ok(Err(error)) => {
                    // Subscription errors are logged, never fatal.
                    self.logger.write_entry(
                        &LogEntry::new(EventType::WatchError, Severity::Warning)
                            .with_details(error.to_string()),
                    );
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    self.logger.write_entry(
                        &LogEntry::new(EventType::Error, Severity::Critical)
                            .with_details("watcher notification channel closed"),
                    );
                    return Err(DircapError::WatcherClosed);
                }
            }
        }
    }

    /// Route one notification. Only creation events matter; everything else
    /// is dropped without a log line (modify events arrive for every write).
    pub fn dispatch(&mut self, event: &Event) -> Result<()> {
        if !matches!(event.kind, EventKind::Create(_)) {
            return Ok(());
        }
        for path in &event.paths {
            self.route_created(path)?;
        }
        Ok(())
    }

    /// Route a single creation notification to the owning folder.
    ///
    /// The event payload is just a path: the file is re-stat'ed here, and a
    /// file that vanished before the stat is skipped — producers may delete
    /// their own files faster than events are processed. Paths outside every
    /// tracked folder (including subdirectories of one) are logged and
    /// ignored.
    pub fn route_created(&mut self, path: &Path) -> Result<()> {
        let folder = match path.parent().and_then(|parent| self.by_path.get(parent)) {
            Some(&index) => &self.folders[index],
            None => {
                self.logger.write_entry(
                    &LogEntry::new(EventType::UnmatchedEvent, Severity::Info).with_path(path),
                );
                return Ok(());
            }
        };
        let Some(name) = path.file_name() else {
            return Ok(());
        };

        match fs::metadata(path) {
            Ok(metadata) if metadata.is_file() => {
                let report = folder.observe(FileRecord::from_metadata(name, &metadata))?;
                if report.files_missing > 0 {
                    let mut skipped = LogEntry::new(EventType::EvictSkipMissing, Severity::Info)
                        .with_path(folder.path())
                        .with_details("tracked files already gone at eviction time");
                    skipped.files_missing = Some(report.files_missing);
                    self.logger.write_entry(&skipped);
                }
                if !report.is_noop() {
                    let mut entry = LogEntry::new(EventType::Evict, Severity::Info)
                        .with_path(folder.path());
                    entry.size = Some(metadata.len());
                    entry.capacity = Some(folder.capacity_bytes());
                    entry.current_size = Some(folder.current_size_bytes());
                    entry.bytes_freed = Some(report.bytes_freed);
                    entry.files_evicted = Some(report.files_evicted);
                    if report.files_missing > 0 {
                        entry.files_missing = Some(report.files_missing);
                    }
                    self.logger.write_entry(&entry);
                }
            }
            Ok(_) => {
                // A directory appeared inside a watched folder; inventories
                // track regular files only.
            }
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                self.logger.write_entry(
                    &LogEntry::new(EventType::EventSkipVanished, Severity::Info).with_path(path),
                );
            }
            Err(error) => {
                self.logger.write_entry(
                    &LogEntry::new(EventType::EventSkipVanished, Severity::Warning)
                        .with_path(path)
                        .with_details(error.to_string()),
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::ffi::OsString;

    use tempfile::TempDir;

    fn router_for(dir: &TempDir, capacity: u64) -> WatchRouter {
        let inventory = FolderInventory::new(dir.path().to_path_buf(), capacity);
        WatchRouter::new(
            vec![inventory],
            JsonlWriter::stderr_only(),
            ShutdownSignal::unregistered(),
        )
    }

    fn create_file(dir: &TempDir, name: &str, size: usize) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, vec![0u8; size]).unwrap();
        path
    }

    #[test]
    fn created_file_lands_in_the_owning_inventory() {
        let dir = TempDir::new().unwrap();
        let mut router = router_for(&dir, 10_000);
        let path = create_file(&dir, "img0001.jpg", 1024);

        router.route_created(&path).unwrap();
        let folder = router.folder(dir.path()).unwrap();
        assert_eq!(folder.file_count(), 1);
        assert_eq!(folder.current_size_bytes(), 1024);
    }

    #[test]
    fn duplicate_events_are_idempotent() {
        let dir = TempDir::new().unwrap();
        let mut router = router_for(&dir, 10_000);
        let path = create_file(&dir, "img0001.jpg", 1024);

        router.route_created(&path).unwrap();
        router.route_created(&path).unwrap();
        let folder = router.folder(dir.path()).unwrap();
        assert_eq!(folder.file_count(), 1);
        assert_eq!(folder.current_size_bytes(), 1024);
        assert!(path.exists());
    }

    #[test]
    fn vanished_file_is_skipped_without_error() {
        let dir = TempDir::new().unwrap();
        let mut router = router_for(&dir, 10_000);

        router
            .route_created(&dir.path().join("already-gone.jpg"))
            .unwrap();
        let folder = router.folder(dir.path()).unwrap();
        assert_eq!(folder.file_count(), 0);
        assert_eq!(folder.current_size_bytes(), 0);
    }

    #[test]
    fn unmatched_paths_are_ignored() {
        let dir = TempDir::new().unwrap();
        let elsewhere = TempDir::new().unwrap();
        let mut router = router_for(&dir, 10_000);
        let stray = elsewhere.path().join("stray.jpg");
        fs::write(&stray, b"x").unwrap();

        router.route_created(&stray).unwrap();
        assert_eq!(router.folder(dir.path()).unwrap().file_count(), 0);
    }

    #[test]
    fn subdirectory_files_do_not_match_the_parent_watch() {
        let dir = TempDir::new().unwrap();
        let mut router = router_for(&dir, 10_000);
        let sub = dir.path().join("nested");
        fs::create_dir(&sub).unwrap();
        let path = sub.join("deep.jpg");
        fs::write(&path, b"x").unwrap();

        router.route_created(&path).unwrap();
        assert_eq!(router.folder(dir.path()).unwrap().file_count(), 0);
    }

    #[test]
    fn created_directory_is_not_inventoried() {
        let dir = TempDir::new().unwrap();
        let mut router = router_for(&dir, 10_000);
        let sub = dir.path().join("newdir");
        fs::create_dir(&sub).unwrap();

        router.route_created(&sub).unwrap();
        assert_eq!(router.folder(dir.path()).unwrap().file_count(), 0);
    }

    #[test]
    fn non_create_events_are_dropped() {
        let dir = TempDir::new().unwrap();
        let mut router = router_for(&dir, 10_000);
        let path = create_file(&dir, "img0001.jpg", 1024);

        let event = Event::new(EventKind::Modify(notify::event::ModifyKind::Any))
            .add_path(path);
        router.dispatch(&event).unwrap();
        assert_eq!(router.folder(dir.path()).unwrap().file_count(), 0);
    }

    #[test]
    fn create_event_with_paths_dispatches_each() {
        let dir = TempDir::new().unwrap();
        let mut router = router_for(&dir, 10_000);
        let a = create_file(&dir, "a.jpg", 100);
        let b = create_file(&dir, "b.jpg", 200);

        let event = Event::new(EventKind::Create(notify::event::CreateKind::File))
            .add_path(a)
            .add_path(b);
        router.dispatch(&event).unwrap();
        let folder = router.folder(dir.path()).unwrap();
        assert_eq!(folder.file_count(), 2);
        assert_eq!(folder.current_size_bytes(), 300);
    }

    #[test]
    fn overflow_through_the_router_evicts_oldest_on_disk() {
        let dir = TempDir::new().unwrap();
        let mut router = router_for(&dir, 1000);
        for i in 0..11 {
            let path = create_file(&dir, &format!("f{i:02}"), 100);
            router.route_created(&path).unwrap();
        }

        let folder = router.folder(dir.path()).unwrap();
        assert!(folder.current_size_bytes() <= 1000);
        assert!(!dir.path().join("f00").exists());
        assert!(dir.path().join("f10").exists());
        assert_eq!(
            folder.known_files().first().map(Clone::clone),
            Some(OsString::from("f01"))
        );
    }

    #[test]
    fn eviction_failure_propagates_out_of_dispatch() {
        let dir = TempDir::new().unwrap();
        let mut router = router_for(&dir, 100);

        // Undeletable inventory head: a directory with content.
        let stuck = dir.path().join("stuck");
        fs::create_dir(&stuck).unwrap();
        fs::write(stuck.join("inner"), b"x").unwrap();
        router
            .folder(dir.path())
            .unwrap()
            .add_file(FileRecord::new("stuck", 80));

        let path = create_file(&dir, "next", 80);
        let err = router.route_created(&path).unwrap_err();
        assert_eq!(err.code(), "DCP-2301");
    }
}

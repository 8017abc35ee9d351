//! End-to-end purge scenarios, driven through the router's dispatch path.
//!
//! The OS watcher itself is not exercised here: real watcher timing is flaky
//! across platforms and CI, and the routing/eviction logic is exactly the
//! same whether an event came from the notify backend or from a direct call.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use dircap::prelude::*;

const KIB: u64 = 1024;
const MIB: u64 = 1024 * 1024;

fn write_file(dir: &Path, name: &str, size: u64) -> PathBuf {
    let path = dir.join(name);
    #[allow(clippy::cast_possible_truncation)]
    fs::write(&path, vec![0u8; size as usize]).unwrap();
    path
}

fn router_for(dir: &TempDir, capacity: u64) -> WatchRouter {
    let inventory = FolderInventory::new(dir.path().to_path_buf(), capacity);
    WatchRouter::new(
        vec![inventory],
        JsonlWriter::stderr_only(),
        ShutdownSignal::unregistered(),
    )
}

fn on_disk_files(dir: &Path) -> Vec<(OsString, u64)> {
    let mut files: Vec<(OsString, u64)> = fs::read_dir(dir)
        .unwrap()
        .map(std::result::Result::unwrap)
        .filter(|entry| entry.metadata().unwrap().is_file())
        .map(|entry| (entry.file_name(), entry.metadata().unwrap().len()))
        .collect();
    files.sort();
    files
}

// Scenario A: 10 KiB of pre-existing files under an 11 KiB cap — the initial
// scan loads everything and deletes nothing.
#[test]
fn startup_scan_under_cap_keeps_every_file() {
    let dir = TempDir::new().unwrap();
    for i in 0..10 {
        write_file(dir.path(), &format!("pre{i:02}.jpg"), KIB);
    }

    let inventory = FolderInventory::new(dir.path().to_path_buf(), 11 * KIB);
    let loaded = inventory.load_initial_state().unwrap();

    assert_eq!(loaded, 10);
    assert_eq!(inventory.file_count(), 10);
    assert_eq!(inventory.current_size_bytes(), 10 * KIB);
    assert_eq!(on_disk_files(dir.path()).len(), 10);
}

// Scenario B: 101 x 1 MiB files stream into a 100 MiB folder — the final
// on-disk state must be at or under the cap, and the files that are gone
// must be the oldest ones.
#[test]
fn sequential_overflow_keeps_folder_under_cap_and_evicts_oldest() {
    let dir = TempDir::new().unwrap();
    let capacity = 100 * MIB;
    let mut router = router_for(&dir, capacity);

    for i in 0..101 {
        let path = write_file(dir.path(), &format!("img{i:03}.jpg"), MIB);
        router.route_created(&path).unwrap();
    }

    let folder = router.folder(dir.path()).unwrap();
    assert!(folder.current_size_bytes() <= capacity);

    let remaining = on_disk_files(dir.path());
    let total: u64 = remaining.iter().map(|(_, size)| size).sum();
    assert!(remaining.len() <= 100);
    assert!(total <= capacity);

    // Everything missing is a prefix of the creation order.
    let survivors: Vec<&OsString> = remaining.iter().map(|(name, _)| name).collect();
    let first_survivor = survivors.first().unwrap().to_string_lossy().into_owned();
    for i in 0..101 {
        let name = format!("img{i:03}.jpg");
        if name < first_survivor {
            assert!(
                !dir.path().join(&name).exists(),
                "{name} is older than the oldest survivor and should be gone"
            );
        } else {
            assert!(dir.path().join(&name).exists(), "{name} should have survived");
        }
    }

    // In-memory accounting matches the disk exactly.
    assert_eq!(folder.file_count(), remaining.len());
    assert_eq!(folder.current_size_bytes(), total);
}

// Scenario C: the event arrives after the producer already deleted the file.
#[test]
fn event_for_vanished_file_leaves_state_untouched() {
    let dir = TempDir::new().unwrap();
    let mut router = router_for(&dir, 10 * KIB);

    let kept = write_file(dir.path(), "kept.jpg", KIB);
    router.route_created(&kept).unwrap();

    // Created and deleted before the event is processed.
    router
        .route_created(&dir.path().join("flash.jpg"))
        .unwrap();

    let folder = router.folder(dir.path()).unwrap();
    assert_eq!(folder.file_count(), 1);
    assert_eq!(folder.current_size_bytes(), KIB);
    assert_eq!(on_disk_files(dir.path()).len(), 1);
}

// Scenario D: a tracked, still-present entry cannot be deleted — the purge
// terminates with the propagated failure instead of limping on with wrong
// accounting.
#[test]
fn undeletable_file_aborts_the_purge() {
    let dir = TempDir::new().unwrap();
    let mut router = router_for(&dir, 2 * KIB);

    // The inventory head's on-disk counterpart is a non-empty directory, so
    // remove_file must fail no matter what user the test runs as.
    let stuck = dir.path().join("stuck.jpg");
    fs::create_dir(&stuck).unwrap();
    fs::write(stuck.join("payload"), b"x").unwrap();
    router
        .folder(dir.path())
        .unwrap()
        .add_file(FileRecord::new("stuck.jpg", 2 * KIB));

    let next = write_file(dir.path(), "next.jpg", KIB);
    let err = router.route_created(&next).unwrap_err();
    assert_eq!(err.code(), "DCP-2301");
    assert!(!err.is_clean_shutdown());

    // Nothing was deleted and the undeletable entry is still tracked first.
    assert!(stuck.exists());
    assert!(next.exists());
    assert_eq!(
        router
            .folder(dir.path())
            .unwrap()
            .known_files()
            .first()
            .map(Clone::clone),
        Some(OsString::from("stuck.jpg"))
    );
}

// Observing the same creation twice must equal observing it once, on disk
// and in memory.
#[test]
fn duplicate_creation_events_are_idempotent() {
    let dir = TempDir::new().unwrap();
    let mut router = router_for(&dir, 100 * KIB);

    let path = write_file(dir.path(), "twice.jpg", KIB);
    router.route_created(&path).unwrap();
    let folder = router.folder(dir.path()).unwrap();
    let size_after_first = folder.current_size_bytes();
    let names_after_first = folder.known_files();

    router.route_created(&path).unwrap();
    let folder = router.folder(dir.path()).unwrap();
    assert_eq!(folder.current_size_bytes(), size_after_first);
    assert_eq!(folder.known_files(), names_after_first);
    assert_eq!(on_disk_files(dir.path()).len(), 1);
}

// Two tracked folders stay fully independent: one folder overflowing never
// touches the other's files or counters.
#[test]
fn folders_do_not_share_space_or_eviction() {
    let hot = TempDir::new().unwrap();
    let cold = TempDir::new().unwrap();
    let mut router = WatchRouter::new(
        vec![
            FolderInventory::new(hot.path().to_path_buf(), 4 * KIB),
            FolderInventory::new(cold.path().to_path_buf(), 100 * KIB),
        ],
        JsonlWriter::stderr_only(),
        ShutdownSignal::unregistered(),
    );

    for i in 0..3 {
        let path = write_file(cold.path(), &format!("cold{i}.jpg"), KIB);
        router.route_created(&path).unwrap();
    }
    for i in 0..6 {
        let path = write_file(hot.path(), &format!("hot{i}.jpg"), KIB);
        router.route_created(&path).unwrap();
    }

    let hot_folder = router.folder(hot.path()).unwrap();
    let cold_folder = router.folder(cold.path()).unwrap();
    assert!(hot_folder.current_size_bytes() <= 4 * KIB);
    assert_eq!(cold_folder.file_count(), 3);
    assert_eq!(cold_folder.current_size_bytes(), 3 * KIB);
    assert_eq!(on_disk_files(cold.path()).len(), 3);
}

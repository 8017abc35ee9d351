//! PAL trait and platform implementations for disk capacity queries.
//!
//! The purge core only needs one question answered: how big is the
//! filesystem a folder lives on. The trait exists so size resolution can be
//! tested against fabricated filesystems instead of whatever disk the test
//! runner happens to have.

#![allow(missing_docs)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::errors::{DircapError, Result};

/// Filesystem statistics for the volume holding a path.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct FsStats {
    pub total_bytes: u64,
    pub free_bytes: u64,
    pub available_bytes: u64,
}

impl FsStats {
    #[must_use]
    pub fn free_pct(&self) -> f64 {
        if self.total_bytes == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        {
            (self.available_bytes as f64 * 100.0) / self.total_bytes as f64
        }
    }
}

/// OS abstraction used by size resolution.
pub trait Platform: Send + Sync {
    fn fs_stats(&self, path: &Path) -> Result<FsStats>;
}

/// POSIX implementation backed by `statvfs`.
#[cfg(unix)]
#[derive(Debug, Default)]
pub struct UnixPlatform;

#[cfg(unix)]
impl Platform for UnixPlatform {
    fn fs_stats(&self, path: &Path) -> Result<FsStats> {
        let stat = nix::sys::statvfs::statvfs(path).map_err(|error| DircapError::FsStats {
            path: path.to_path_buf(),
            details: error.to_string(),
        })?;
        let fragment = stat.fragment_size();
        Ok(FsStats {
            total_bytes: stat.blocks().saturating_mul(fragment),
            free_bytes: stat.blocks_free().saturating_mul(fragment),
            available_bytes: stat.blocks_available().saturating_mul(fragment),
        })
    }
}

/// Detect the platform implementation for the current OS.
#[cfg(unix)]
#[must_use]
pub fn detect_platform() -> Arc<dyn Platform> {
    Arc::new(UnixPlatform)
}

/// In-memory mock implementation for deterministic tests.
///
/// Stats are keyed by path prefix; a lookup walks up from the queried path to
/// the nearest registered ancestor, mirroring how real paths map to mounts.
#[derive(Debug, Clone, Default)]
pub struct MockPlatform {
    stats_by_prefix: HashMap<PathBuf, FsStats>,
}

impl MockPlatform {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_stats(mut self, prefix: impl Into<PathBuf>, stats: FsStats) -> Self {
        self.stats_by_prefix.insert(prefix.into(), stats);
        self
    }
}

impl Platform for MockPlatform {
    fn fs_stats(&self, path: &Path) -> Result<FsStats> {
        let mut probe = Some(path);
        while let Some(current) = probe {
            if let Some(stats) = self.stats_by_prefix.get(current) {
                return Ok(*stats);
            }
            probe = current.parent();
        }
        Err(DircapError::FsStats {
            path: path.to_path_buf(),
            details: "mock stats not registered for path".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GIB: u64 = 1024 * 1024 * 1024;

    #[test]
    fn mock_resolves_nearest_ancestor() {
        let platform = MockPlatform::new()
            .with_stats(
                "/data",
                FsStats {
                    total_bytes: 100 * GIB,
                    free_bytes: 40 * GIB,
                    available_bytes: 38 * GIB,
                },
            )
            .with_stats(
                "/",
                FsStats {
                    total_bytes: 20 * GIB,
                    free_bytes: 5 * GIB,
                    available_bytes: 4 * GIB,
                },
            );

        let data = platform.fs_stats(Path::new("/data/incoming/cam0")).unwrap();
        assert_eq!(data.total_bytes, 100 * GIB);

        let root = platform.fs_stats(Path::new("/var/log")).unwrap();
        assert_eq!(root.total_bytes, 20 * GIB);
    }

    #[test]
    fn mock_without_match_errors() {
        let platform = MockPlatform::new();
        let err = platform.fs_stats(Path::new("/data")).unwrap_err();
        assert_eq!(err.code(), "DCP-2001");
    }

    #[test]
    fn free_pct_handles_zero_total() {
        let stats = FsStats {
            total_bytes: 0,
            free_bytes: 0,
            available_bytes: 0,
        };
        assert!((stats.free_pct() - 0.0).abs() < f64::EPSILON);
    }

    #[cfg(unix)]
    #[test]
    fn statvfs_on_tempdir_reports_nonzero_total() {
        let dir = tempfile::tempdir().unwrap();
        let stats = UnixPlatform.fs_stats(dir.path()).unwrap();
        assert!(stats.total_bytes > 0);
        assert!(stats.available_bytes <= stats.total_bytes);
    }
}

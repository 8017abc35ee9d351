//! Size resolution: turn a user-supplied size spec into a concrete byte cap.
//!
//! Percentage specs are resolved against the total capacity of the
//! filesystem holding the folder, queried once at startup. Caps are fixed
//! for the life of the process; disk capacity changes do not re-size them.

use std::path::Path;
use std::sync::Arc;

use crate::core::config::SizeSpec;
use crate::core::errors::{DircapError, Result};
use crate::platform::pal::Platform;

/// Resolves size specifications into byte caps via one filesystem query.
pub struct SizeResolver {
    platform: Arc<dyn Platform>,
}

impl SizeResolver {
    #[must_use]
    pub fn new(platform: Arc<dyn Platform>) -> Self {
        Self { platform }
    }

    /// Resolve `spec` for the folder at `path`.
    ///
    /// The folder itself may not exist yet (it is created during watch
    /// setup), so percentage queries walk up to the nearest existing
    /// ancestor, which lives on the same filesystem the folder will.
    /// A cap of zero is rejected: a zero-capacity folder would evict every
    /// file on every event.
    pub fn resolve(&self, path: &Path, spec: SizeSpec) -> Result<u64> {
        let capacity = match spec {
            SizeSpec::Bytes(bytes) => bytes,
            SizeSpec::PercentOfTotal(percent) => {
                let stats = self.platform.fs_stats(nearest_existing(path))?;
                stats.total_bytes / 100 * u64::from(percent)
            }
        };
        if capacity == 0 {
            return Err(DircapError::ZeroCapacity {
                path: path.to_path_buf(),
            });
        }
        Ok(capacity)
    }
}

fn nearest_existing(path: &Path) -> &Path {
    let mut probe = path;
    loop {
        if probe.exists() {
            return probe;
        }
        match probe.parent() {
            Some(parent) => probe = parent,
            None => return path,
        }
    }
}

//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use dircap::prelude::*;
//! ```

// Core
pub use crate::core::config::{FolderSpec, SizeSpec, parse_folder_pairs};
pub use crate::core::errors::{DircapError, Result};

// Platform
pub use crate::platform::pal::{FsStats, MockPlatform, Platform};
#[cfg(unix)]
pub use crate::platform::pal::{UnixPlatform, detect_platform};

// Inventory
pub use crate::inventory::folder::{EvictionReport, FileRecord, FolderInventory};
pub use crate::inventory::sizing::SizeResolver;

// Watch
pub use crate::watch::router::WatchRouter;
pub use crate::watch::signals::ShutdownSignal;

// Logger
pub use crate::logger::jsonl::{EventType, JsonlWriter, LogEntry, Severity};

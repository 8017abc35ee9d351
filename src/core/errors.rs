//! DCP-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, DircapError>;

/// Top-level error type for dircap.
#[derive(Debug, Error)]
pub enum DircapError {
    #[error("[DCP-1001] invalid size specification {spec:?}: {details}")]
    InvalidSizeSpec { spec: String, details: String },

    #[error("[DCP-1002] resolved capacity for {path} is zero bytes")]
    ZeroCapacity { path: PathBuf },

    #[error("[DCP-1003] folder {path} has no size specification (arguments must form folder/size pairs)")]
    UnpairedArgs { path: PathBuf },

    #[error("[DCP-2001] filesystem stats failure for {path}: {details}")]
    FsStats { path: PathBuf, details: String },

    #[error("[DCP-2101] creating tracked folder {path} failed: {source}")]
    FolderCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[DCP-2102] registering watch for {path} failed: {details}")]
    WatchRegister { path: PathBuf, details: String },

    #[error("[DCP-2201] initial scan of {path} failed: {details}")]
    InitialScan { path: PathBuf, details: String },

    #[error("[DCP-2301] evicting {path} failed: {source}")]
    Evict {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[DCP-3001] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[DCP-3101] watcher notification channel closed")]
    WatcherClosed,

    #[error("[DCP-3102] shutdown requested by signal")]
    ShutdownRequested,
}

impl DircapError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidSizeSpec { .. } => "DCP-1001",
            Self::ZeroCapacity { .. } => "DCP-1002",
            Self::UnpairedArgs { .. } => "DCP-1003",
            Self::FsStats { .. } => "DCP-2001",
            Self::FolderCreate { .. } => "DCP-2101",
            Self::WatchRegister { .. } => "DCP-2102",
            Self::InitialScan { .. } => "DCP-2201",
            Self::Evict { .. } => "DCP-2301",
            Self::Io { .. } => "DCP-3001",
            Self::WatcherClosed => "DCP-3101",
            Self::ShutdownRequested => "DCP-3102",
        }
    }

    /// Whether this termination was requested rather than suffered.
    ///
    /// The blocking run loop only ever returns with an error; a signal-driven
    /// shutdown is the one return the process should exit zero for.
    #[must_use]
    pub const fn is_clean_shutdown(&self) -> bool {
        matches!(self, Self::ShutdownRequested)
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

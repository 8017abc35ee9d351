#![forbid(unsafe_code)]

//! dircap — keeps designated drop directories from growing past a byte cap
//! by evicting the oldest-observed files.
//!
//! Built for write-once, append-heavy directories (incoming sensor or image
//! drops) where an external producer continuously creates files and space
//! must be reclaimed without coordinating with the producer. Each tracked
//! folder carries its own cap, a live inventory seeded by a one-time scan,
//! and a FIFO eviction engine driven by filesystem creation notifications.
//!
//! # Library usage
//!
//! Use the [`prelude`] for convenient access to the most common types:
//!
//! ```rust,no_run
//! use dircap::prelude::*;
//! ```
//!
//! Individual modules can also be imported directly:
//!
//! ```rust,no_run
//! use dircap::inventory::folder::FolderInventory;
//! use dircap::watch::router::WatchRouter;
//! ```

pub mod prelude;

pub mod core;
pub mod inventory;
pub mod logger;
pub mod platform;
pub mod watch;

//! Shared path manipulation utilities.

use std::env;
use std::path::{Component, Path, PathBuf};

/// Normalize a user-supplied folder argument into the canonical key used by
/// the folder set.
///
/// Trailing separators are trimmed (`/data/incoming/` and `/data/incoming`
/// must key the same folder, and event parent-directory lookups produce the
/// un-slashed form), then the path is resolved to an absolute one.
pub fn normalize_folder_arg(raw: &str) -> PathBuf {
    let trimmed = raw.trim_end_matches('/');
    let candidate = if trimmed.is_empty() { "/" } else { trimmed };
    resolve_absolute_path(Path::new(candidate))
}

/// Resolve a path to an absolute, normalized path.
///
/// If `fs::canonicalize` succeeds (path exists), it is used to resolve
/// symlinks and normalize components. If it fails (e.g. the folder does not
/// exist yet and will be created at setup), the path is made absolute
/// relative to CWD and `..`/`.` components are resolved syntactically.
pub fn resolve_absolute_path(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
    };

    if let Ok(canonical) = std::fs::canonicalize(&absolute) {
        return canonical;
    }

    normalize_syntactic(&absolute)
}

fn normalize_syntactic(path: &Path) -> PathBuf {
    let mut components = Vec::new();
    for component in path.components() {
        match component {
            Component::Prefix(..) | Component::RootDir | Component::Normal(_) => {
                components.push(component);
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if let Some(Component::Normal(_)) = components.last() {
                    components.pop();
                }
            }
        }
    }
    components.into_iter().collect()
}

//! Feature search over the load path

use crate::error::LoadError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Extensions `load` probes for
pub const LOAD_EXTENSIONS: &[&str] = &[".rill", ".rbc", ".so", ".dylib", ".dll"];

/// Extensions `require` probes for
pub const REQUIRE_EXTENSIONS: &[&str] = &[".rill", ".rbc"];

/// Find the file `path` refers to and return its canonical path.
///
/// `path` is tried first, then `path` with each extension appended unless
/// it already ends in one of them. Paths starting with `/` or `.` are
/// probed directly; others are probed under each load path entry in order.
pub fn resolve(path: &str, extensions: &[&str], load_path: &[PathBuf]) -> Result<PathBuf, LoadError> {
    let candidates = candidates(path, extensions);
    let direct = path.starts_with('/') || path.starts_with('.') || Path::new(path).is_absolute();

    let found = if direct || load_path.is_empty() {
        candidates.iter().map(PathBuf::from).find(|p| p.is_file())
    } else {
        candidates
            .iter()
            .flat_map(|name| load_path.iter().map(move |dir| dir.join(name)))
            .find(|p| p.is_file())
    };

    let not_found = || LoadError::NotFound {
        path: path.to_string(),
    };
    let found = found.ok_or_else(not_found)?;
    let real = found.canonicalize().map_err(|_| not_found())?;
    debug!(feature = path, resolved = %real.display(), "resolved feature");
    Ok(real)
}

fn candidates(path: &str, extensions: &[&str]) -> Vec<String> {
    let mut names = vec![path.to_string()];
    let current = Path::new(path)
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()));
    if !extensions.iter().any(|ext| current.as_deref() == Some(*ext)) {
        names.extend(extensions.iter().map(|ext| format!("{}{}", path, ext)));
    }
    names
}

/// Extension of a resolved path including the dot, or an empty string
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default()
}

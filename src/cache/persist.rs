//! Temp-then-rename writes for cache artifacts.
//!
//! Bytes go to a uniquely named sibling (`.stylecache-XXXXXX.tmp`) that is synced and then renamed
//! over the destination, so readers observe either no file or the complete one. A temp file whose
//! write fails is removed when its handle drops; one left behind by a killed process keeps the
//! reserved prefix and is never resolved as a cache entry.

use std::io::Write as _;
use std::path::Path;

use crate::foundation::core::TEMP_PREFIX;
use crate::foundation::error::{StyleCacheError, StyleCacheResult};

/// Mode of published cache files; temp files start out owner-only.
#[cfg(unix)]
const CACHE_FILE_MODE: u32 = 0o644;

/// Create `dir` and its ancestors if absent.
pub fn ensure_dir(dir: &Path) -> StyleCacheResult<()> {
    std::fs::create_dir_all(dir).map_err(|e| {
        StyleCacheError::persist(format!("create directory '{}': {e}", dir.display()))
    })
}

/// Atomically replace `path` with `bytes`. The parent directory must already exist.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> StyleCacheResult<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));

    let mut tmp = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(".tmp")
        .tempfile_in(parent)
        .map_err(|e| {
            StyleCacheError::persist(format!("create temp file in '{}': {e}", parent.display()))
        })?;

    tmp.write_all(bytes)
        .and_then(|()| publishable(tmp.as_file()))
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| StyleCacheError::persist(format!("write '{}': {e}", path.display())))?;

    tmp.persist(path).map_err(|e| {
        StyleCacheError::persist(format!("rename into '{}': {}", path.display(), e.error))
    })?;
    Ok(())
}

#[cfg(unix)]
fn publishable(file: &std::fs::File) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt as _;
    file.set_permissions(std::fs::Permissions::from_mode(CACHE_FILE_MODE))
}

#[cfg(not(unix))]
fn publishable(_file: &std::fs::File) -> std::io::Result<()> {
    Ok(())
}

/// Whether `name` is an in-flight (or abandoned) temp file rather than a cache entry.
pub fn is_temp_name(name: &str) -> bool {
    name.starts_with(TEMP_PREFIX)
}

#[cfg(test)]
#[path = "../../tests/unit/cache/persist.rs"]
mod tests;

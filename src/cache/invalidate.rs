use std::path::Path;

use crate::cache::persist::is_temp_name;
use crate::foundation::core::StyleId;
use crate::foundation::error::{StyleCacheError, StyleCacheResult};

/// Recursively delete `cache_root/{style_id}`.
///
/// Clearing a namespace that is already empty or absent succeeds. Returns the number of cache
/// files removed; in-flight temp files are deleted too but not counted.
#[tracing::instrument(skip(cache_root), fields(style = %style_id))]
pub fn clear(cache_root: &Path, style_id: &StyleId) -> StyleCacheResult<usize> {
    let dir = cache_root.join(style_id.as_str());
    let removed = match count_files(&dir) {
        Some(n) => n,
        None => {
            tracing::debug!(dir = %dir.display(), "nothing to clear");
            return Ok(0);
        }
    };

    match std::fs::remove_dir_all(&dir) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            return Err(StyleCacheError::persist(format!(
                "clear '{}': {e}",
                dir.display()
            )));
        }
    }
    tracing::info!(removed, "cleared style cache");
    Ok(removed)
}

/// Cached artifacts of one style as `/`-separated paths relative to its namespace, sorted.
/// Temp files from in-flight writes are skipped.
pub fn entries(cache_root: &Path, style_id: &StyleId) -> StyleCacheResult<Vec<String>> {
    let dir = cache_root.join(style_id.as_str());
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut out = Vec::new();
    for entry in walkdir::WalkDir::new(&dir).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            StyleCacheError::persist(format!("list '{}': {e}", dir.display()))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        if is_temp_name(&entry.file_name().to_string_lossy()) {
            continue;
        }
        let Ok(rel) = entry.path().strip_prefix(&dir) else {
            continue;
        };
        let rel = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        out.push(rel);
    }
    Ok(out)
}

fn count_files(dir: &Path) -> Option<usize> {
    if !dir.is_dir() {
        return None;
    }
    Some(
        walkdir::WalkDir::new(dir)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .filter(|e| !is_temp_name(&e.file_name().to_string_lossy()))
            .count(),
    )
}

#[cfg(test)]
#[path = "../../tests/unit/cache/invalidate.rs"]
mod tests;

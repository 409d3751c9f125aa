use std::path::{Path, PathBuf};

use crate::config::CacheConfig;
use crate::foundation::core::{StyleId, TEMP_PREFIX};
use crate::foundation::error::{StyleCacheError, StyleCacheResult};

/// Segment some callers insert between the style id and the source path.
const IMAGE_SEGMENT: &str = "image";

/// Normalize and validate a path relative to the image-storage root.
///
/// The normalized result uses `/` separators, removes `.` segments, and rejects absolute paths,
/// parent traversals (`..`) and reserved temp-file names.
pub fn normalize_rel_path(source: &str) -> StyleCacheResult<String> {
    let s = source.replace('\\', "/");
    if s.starts_with('/') {
        return Err(StyleCacheError::validation("image paths must be relative"));
    }
    if s.is_empty() {
        return Err(StyleCacheError::validation("image path must be non-empty"));
    }

    let mut out = Vec::<&str>::new();
    for part in s.split('/') {
        if part.is_empty() || part == "." {
            continue;
        }
        if part == ".." {
            return Err(StyleCacheError::validation(
                "image paths must not contain '..'",
            ));
        }
        if part.starts_with(TEMP_PREFIX) {
            return Err(StyleCacheError::validation(
                "image paths must not name cache temp files",
            ));
        }
        out.push(part);
    }

    if out.is_empty() {
        return Err(StyleCacheError::validation(
            "image path must contain a file name",
        ));
    }

    Ok(out.join("/"))
}

/// Absolute locations for one `(style, source)` pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedPaths {
    pub style_id: StyleId,
    /// Normalized path relative to the image-storage root.
    pub rel_path: String,
    pub source_abs: PathBuf,
    pub cache_abs: PathBuf,
}

/// Maps request paths onto the source tree and the per-style cache tree.
///
/// Sources live at `image_root/{rel}`; derivatives at `cache_root/{style_id}/{rel}`, so every
/// style's cache mirrors the source directory structure.
#[derive(Clone, Debug)]
pub struct CachePathResolver {
    image_root: PathBuf,
    cache_root: PathBuf,
    url_prefix: String,
}

impl CachePathResolver {
    pub fn new(image_root: impl Into<PathBuf>, cache_root: impl Into<PathBuf>) -> Self {
        Self {
            image_root: image_root.into(),
            cache_root: cache_root.into(),
            url_prefix: CacheConfig::DEFAULT_URL_PREFIX.to_string(),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(&config.image_root, &config.cache_root).with_url_prefix(&config.url_prefix)
    }

    pub fn with_url_prefix(mut self, prefix: &str) -> Self {
        let prefix = prefix.trim_matches('/');
        self.url_prefix = if prefix.is_empty() {
            String::new()
        } else {
            format!("{prefix}/")
        };
        self
    }

    pub fn image_root(&self) -> &Path {
        &self.image_root
    }

    pub fn cache_root(&self) -> &Path {
        &self.cache_root
    }

    /// Root of one style's cache namespace.
    pub fn style_dir(&self, style_id: &StyleId) -> PathBuf {
        self.cache_root.join(style_id.as_str())
    }

    pub fn source_path(&self, rel_path: &str) -> PathBuf {
        self.image_root.join(rel_path)
    }

    /// `cache_root/{style_id}/{dir of rel}/{basename of rel}`.
    pub fn cache_path(&self, style_id: &StyleId, rel_path: &str) -> PathBuf {
        let rel = Path::new(rel_path);
        let mut out = self.style_dir(style_id);
        if let Some(dir) = rel.parent().filter(|d| !d.as_os_str().is_empty()) {
            out.push(dir);
        }
        if let Some(name) = rel.file_name() {
            out.push(name);
        }
        out
    }

    /// Parse a request path into its style id and normalized source path, without touching the
    /// filesystem.
    ///
    /// Accepts `.../{url_prefix}{style_id}/[image/]{rel}` or a bare `{style_id}/[image/]{rel}`.
    /// Query strings are ignored and `%XX` escapes are decoded.
    pub fn split(&self, virtual_path: &str) -> StyleCacheResult<(StyleId, String)> {
        let path = virtual_path.split('?').next().unwrap_or_default();
        let path = urlencoding::decode(path)
            .map_err(|_| StyleCacheError::not_found("request path is not UTF-8"))?;

        // Match the prefix on segment boundaries only.
        let path = format!("/{}", path.trim_start_matches('/'));
        let needle = format!("/{}", self.url_prefix);
        let tail = match (!self.url_prefix.is_empty())
            .then(|| path.find(&needle))
            .flatten()
        {
            Some(at) => &path[at + needle.len()..],
            None => &path[1..],
        };

        let mut parts = tail.split('/');
        let style = parts.next().unwrap_or_default();
        let mut rest: Vec<&str> = parts.collect();
        if rest.first().is_some_and(|s| s.is_empty()) || rest.is_empty() {
            return Err(StyleCacheError::not_found(format!(
                "'{virtual_path}' names no image"
            )));
        }
        if rest[0] == IMAGE_SEGMENT {
            rest.remove(0);
        }

        let style_id = StyleId::new(style)
            .map_err(|e| StyleCacheError::not_found(format!("'{virtual_path}': {e}")))?;
        let rel_path = normalize_rel_path(&rest.join("/"))
            .map_err(|e| StyleCacheError::not_found(format!("'{virtual_path}': {e}")))?;
        Ok((style_id, rel_path))
    }

    /// Resolve a request path to absolute source and cache locations.
    ///
    /// Fails with `NotFound` for malformed paths and for sources that are not regular files.
    pub fn resolve(&self, virtual_path: &str) -> StyleCacheResult<ResolvedPaths> {
        let (style_id, rel_path) = self.split(virtual_path)?;
        let source_abs = self.source_path(&rel_path);
        if !source_abs.is_file() {
            return Err(StyleCacheError::not_found(format!(
                "source '{rel_path}' does not exist"
            )));
        }
        let cache_abs = self.cache_path(&style_id, &rel_path);
        Ok(ResolvedPaths {
            style_id,
            rel_path,
            source_abs,
            cache_abs,
        })
    }

    /// Request path that serves `rel_path` through `style_id`.
    ///
    /// Always carries the `image` segment, so sources under an `image/` directory survive the
    /// collapse in [`CachePathResolver::split`].
    pub fn url_for(&self, style_id: &StyleId, rel_path: &str) -> StyleCacheResult<String> {
        let rel = normalize_rel_path(rel_path)?;
        Ok(format!("{}{style_id}/{IMAGE_SEGMENT}/{rel}", self.url_prefix))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/cache/paths.rs"]
mod tests;

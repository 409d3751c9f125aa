use std::path::{Path, PathBuf};

use crate::foundation::error::{StyleCacheError, StyleCacheResult};

/// Runtime settings for the cache pipeline.
///
/// Every field has a default, so a config document only names what it changes:
///
/// ```json
/// { "image_root": "/srv/files/image", "max_age_secs": 3600 }
/// ```
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Image-storage root; sources resolve to `image_root/{rel}`.
    pub image_root: PathBuf,
    /// Derivatives land at `cache_root/{style_id}/{rel}`.
    pub cache_root: PathBuf,
    /// Marker preceding `{style_id}` in request paths.
    pub url_prefix: String,
    /// `Cache-Control` max-age for served artifacts.
    pub max_age_secs: u64,
    /// Serialize concurrent misses for the same cache path.
    pub coalesce_misses: bool,
    /// Source used by placeholder URLs, relative to `image_root`.
    pub placeholder: String,
}

impl CacheConfig {
    pub const DEFAULT_URL_PREFIX: &'static str = "files/image/cache/";
    pub const DEFAULT_MAX_AGE_SECS: u64 = 31_536_000;

    pub fn new(image_root: impl Into<PathBuf>, cache_root: impl Into<PathBuf>) -> Self {
        Self {
            image_root: image_root.into(),
            cache_root: cache_root.into(),
            ..Self::default()
        }
    }

    pub fn from_json_str(json: &str) -> StyleCacheResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| StyleCacheError::serde(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_path(path: impl AsRef<Path>) -> StyleCacheResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            StyleCacheError::validation(format!("read config '{}': {e}", path.display()))
        })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> StyleCacheResult<()> {
        if self.image_root.as_os_str().is_empty() {
            return Err(StyleCacheError::validation("image_root must be non-empty"));
        }
        if self.cache_root.as_os_str().is_empty() {
            return Err(StyleCacheError::validation("cache_root must be non-empty"));
        }
        if self.placeholder.trim().is_empty() {
            return Err(StyleCacheError::validation("placeholder must be non-empty"));
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            image_root: PathBuf::from("files/image"),
            cache_root: PathBuf::from("files/image/cache"),
            url_prefix: Self::DEFAULT_URL_PREFIX.to_string(),
            max_age_secs: Self::DEFAULT_MAX_AGE_SECS,
            coalesce_misses: false,
            placeholder: "misc/no-image.png".to_string(),
        }
    }
}

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use image::ImageFormat;
use rayon::prelude::*;

use crate::cache::flight::KeyedLocks;
use crate::cache::invalidate;
use crate::cache::paths::{CachePathResolver, ResolvedPaths};
use crate::cache::persist;
use crate::config::CacheConfig;
use crate::foundation::core::StyleId;
use crate::foundation::error::{StyleCacheError, StyleCacheResult};
use crate::serve::response::{Response, Served};
use crate::style::registry::{StyleRegistry, StyleSource};
use crate::transform::engine::{PixelPrimitives, TransformEngine};
use crate::transform::primitives::ImagePrimitives;

/// Pipeline state a request failed in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Resolve,
    EnsureDir,
    ValidateStyle,
    Transform,
    Persist,
    Serve,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Resolve => "resolve",
            Self::EnsureDir => "ensure_dir",
            Self::ValidateStyle => "validate_style",
            Self::Transform => "transform",
            Self::Persist => "persist",
            Self::Serve => "serve",
        })
    }
}

/// A pipeline failure tagged with the state it happened in.
#[derive(Debug)]
pub struct StageError {
    pub stage: Stage,
    pub source: StyleCacheError,
}

impl fmt::Display for StageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.stage, self.source)
    }
}

impl std::error::Error for StageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

trait AtStage<T> {
    fn at(self, stage: Stage) -> Result<T, StageError>;
}

impl<T> AtStage<T> for StyleCacheResult<T> {
    fn at(self, stage: Stage) -> Result<T, StageError> {
        self.map_err(|source| StageError { stage, source })
    }
}

/// Summary of a [`CacheHandler::warm`] run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WarmReport {
    /// Already cached.
    pub hits: usize,
    /// Produced by this run.
    pub generated: usize,
    /// `(rel_path, reason)` for every path that could not be produced.
    pub failed: Vec<(String, String)>,
}

/// Serves derivative images, generating and caching them on first request.
///
/// A request walks `RESOLVE -> HIT -> SERVE` or
/// `RESOLVE -> ENSURE_DIR -> VALIDATE_STYLE -> TRANSFORM -> PERSIST -> SERVE`. Any failure along
/// the way is logged with its stage and reason and answered with [`Response::NotFound`].
pub struct CacheHandler {
    resolver: CachePathResolver,
    registry: StyleRegistry,
    engine: TransformEngine,
    max_age_secs: u64,
    placeholder: String,
    flight: Option<KeyedLocks>,
}

impl CacheHandler {
    pub fn new(
        config: &CacheConfig,
        styles: Arc<dyn StyleSource>,
        primitives: Arc<dyn PixelPrimitives>,
    ) -> Self {
        Self {
            resolver: CachePathResolver::from_config(config),
            registry: StyleRegistry::new(styles),
            engine: TransformEngine::new(primitives),
            max_age_secs: config.max_age_secs,
            placeholder: config.placeholder.clone(),
            flight: config.coalesce_misses.then(KeyedLocks::new),
        }
    }

    /// Handler backed by the built-in `image` primitives, with overlays read from `image_root`.
    pub fn with_image_primitives(config: &CacheConfig, styles: Arc<dyn StyleSource>) -> Self {
        let primitives = Arc::new(ImagePrimitives::new(config.image_root.clone()));
        Self::new(config, styles, primitives)
    }

    pub fn resolver(&self) -> &CachePathResolver {
        &self.resolver
    }

    pub fn registry(&self) -> &StyleRegistry {
        &self.registry
    }

    /// Serve `virtual_path`. Failures are indistinguishable to the caller.
    #[tracing::instrument(skip(self))]
    pub fn handle(&self, virtual_path: &str) -> Response {
        match self.run(virtual_path) {
            Ok(served) => Response::Served(served),
            Err(err) => {
                tracing::warn!(stage = %err.stage, reason = %err.source, "request not found");
                Response::NotFound
            }
        }
    }

    /// Like [`CacheHandler::handle`], but reports why a request failed.
    pub fn fetch(&self, virtual_path: &str) -> Result<Served, StageError> {
        self.run(virtual_path)
    }

    fn run(&self, virtual_path: &str) -> Result<Served, StageError> {
        let resolved = self.resolver.resolve(virtual_path).at(Stage::Resolve)?;

        if is_cached(&resolved.cache_abs) {
            tracing::debug!(cache = %resolved.cache_abs.display(), "cache hit");
            return Served::from_file(resolved.cache_abs, self.max_age_secs, false)
                .at(Stage::Serve);
        }
        tracing::debug!(cache = %resolved.cache_abs.display(), "cache miss");
        self.generate(resolved)
    }

    fn generate(&self, resolved: ResolvedPaths) -> Result<Served, StageError> {
        if let Some(dir) = resolved.cache_abs.parent() {
            persist::ensure_dir(dir).at(Stage::EnsureDir)?;
        }

        let style = self
            .registry
            .get_style(&resolved.style_id)
            .at(Stage::ValidateStyle)?;

        let guard = self.flight.as_ref().map(|f| f.lock(&resolved.cache_abs));
        if guard.is_some() && is_cached(&resolved.cache_abs) {
            tracing::debug!("generated by a concurrent request");
            return Served::from_file(resolved.cache_abs, self.max_age_secs, false)
                .at(Stage::Serve);
        }

        let format = ImageFormat::from_path(&resolved.cache_abs)
            .map_err(|e| {
                StyleCacheError::validation(format!("no encoder for '{}': {e}", resolved.rel_path))
            })
            .at(Stage::Transform)?;
        let bytes = self
            .engine
            .render_file(&resolved.source_abs, style.actions(), format)
            .at(Stage::Transform)?;

        persist::write_atomic(&resolved.cache_abs, &bytes).at(Stage::Persist)?;
        tracing::debug!(
            style = %resolved.style_id,
            path = %resolved.rel_path,
            bytes = bytes.len(),
            "derivative written"
        );

        Served::from_file(resolved.cache_abs, self.max_age_secs, true).at(Stage::Serve)
    }

    /// Remove every cached derivative of `style_id` and forget the registry's copy of the style,
    /// so the next request regenerates from the current definition.
    pub fn clear(&self, style_id: &StyleId) -> StyleCacheResult<usize> {
        let removed = invalidate::clear(self.resolver.cache_root(), style_id)?;
        self.registry.forget(style_id);
        Ok(removed)
    }

    /// Cached derivatives of `style_id`, relative to its namespace.
    pub fn entries(&self, style_id: &StyleId) -> StyleCacheResult<Vec<String>> {
        invalidate::entries(self.resolver.cache_root(), style_id)
    }

    /// Pre-generate `style_id` for every source in `rel_paths`, in parallel.
    ///
    /// Fails only when the style itself is unusable; per-path failures are reported.
    #[tracing::instrument(
        skip(self, rel_paths),
        fields(style = %style_id, paths = rel_paths.len())
    )]
    pub fn warm<S: AsRef<str> + Sync>(
        &self,
        style_id: &StyleId,
        rel_paths: &[S],
    ) -> StyleCacheResult<WarmReport> {
        self.registry.get_style(style_id)?;

        let outcomes: Vec<(String, Result<bool, String>)> = rel_paths
            .par_iter()
            .map(|rel| {
                let rel = rel.as_ref();
                let outcome = self
                    .resolver
                    .url_for(style_id, rel)
                    .map_err(|e| e.to_string())
                    .and_then(|url| self.run(&url).map_err(|e| e.to_string()))
                    .map(|served| served.generated);
                (rel.to_string(), outcome)
            })
            .collect();

        let mut report = WarmReport::default();
        for (rel, outcome) in outcomes {
            match outcome {
                Ok(true) => report.generated += 1,
                Ok(false) => report.hits += 1,
                Err(reason) => report.failed.push((rel, reason)),
            }
        }
        tracing::info!(
            hits = report.hits,
            generated = report.generated,
            failed = report.failed.len(),
            "warm-up finished"
        );
        Ok(report)
    }

    pub fn url_for(&self, style_id: &StyleId, rel_path: &str) -> StyleCacheResult<String> {
        self.resolver.url_for(style_id, rel_path)
    }

    /// URL of the configured placeholder image rendered through `style_id`.
    pub fn placeholder_url(&self, style_id: &StyleId) -> StyleCacheResult<String> {
        self.resolver.url_for(style_id, &self.placeholder)
    }
}

impl fmt::Debug for CacheHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheHandler")
            .field("resolver", &self.resolver)
            .field("registry", &self.registry)
            .field("max_age_secs", &self.max_age_secs)
            .field("coalesce_misses", &self.flight.is_some())
            .finish_non_exhaustive()
    }
}

fn is_cached(path: &Path) -> bool {
    std::fs::metadata(path).is_ok_and(|m| m.is_file())
}

#[cfg(test)]
#[path = "../../tests/unit/serve/handler.rs"]
mod tests;

//! Lazily generated, filesystem-cached image derivatives.
//!
//! A *style* is a named, ordered list of image actions (`resize 100,100`, `rotate 90`, ...).
//! Requests name a style and a source image; the first request runs the style over the source and
//! stores the result under `cache_root/{style_id}/{rel}`, and every later request is served
//! straight from disk.
//!
//! - Define styles with [`Style`] and a [`StyleSource`] such as [`MemoryStyleSource`]
//! - Build a [`CacheHandler`] from a [`CacheConfig`]
//! - Answer requests with [`CacheHandler::handle`] and drop a style's derivatives with
//!   [`CacheHandler::clear`]
#![forbid(unsafe_code)]

pub mod cache;
pub mod config;
pub mod foundation;
pub mod serve;
pub mod style;
pub mod transform;

pub use crate::cache::paths::{CachePathResolver, ResolvedPaths};
pub use crate::config::CacheConfig;
pub use crate::foundation::core::{HexColor, StyleId};
pub use crate::foundation::error::{InvalidActions, LineError, StyleCacheError, StyleCacheResult};
pub use crate::serve::handler::{CacheHandler, Stage, StageError, WarmReport};
pub use crate::serve::response::{CacheHeaders, Response, Served};
pub use crate::style::action::{Action, ActionKind, Param, parse_action_text, parse_and_validate};
pub use crate::style::registry::{
    MemoryStyleSource, Style, StyleFilter, StyleRegistry, StyleSource, StyleStatus,
};
pub use crate::transform::engine::{Bitmap, PixelPrimitives, TransformEngine};
pub use crate::transform::primitives::ImagePrimitives;

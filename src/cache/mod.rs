//! On-disk layout and lifecycle of cached derivatives.
//!
//! Derivatives live at `cache_root/{style_id}/{rel}`, mirroring the source tree under one
//! namespace per style. The filesystem is the only index.

/// Per-path generation locks for coalescing concurrent misses.
pub mod flight;
/// Per-style cache clearing and listing.
pub mod invalidate;
/// Request-path parsing and source/cache path mapping.
pub mod paths;
/// Temp-then-rename writes.
pub mod persist;

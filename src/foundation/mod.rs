//! Shared value types and the crate error taxonomy.

/// Style ids, colors and other small value types.
pub mod core;
/// `StyleCacheError` and friends.
pub mod error;

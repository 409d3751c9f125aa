//! Request handling.

/// The cache-aware request state machine.
pub mod handler;
/// Served artifacts and their HTTP cache headers.
pub mod response;

//! Action grammar and the style model.

/// Action-line parsing and per-kind parameter validation.
pub mod action;
/// Styles, the style-store seam, and the read-through registry.
pub mod registry;

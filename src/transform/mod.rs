//! Decoding, action sequencing and the built-in pixel primitives.

/// Sequencer over the `PixelPrimitives` capability.
pub mod engine;
/// `image`-crate implementation of every action kind.
pub mod primitives;

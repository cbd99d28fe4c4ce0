//! Layer abstractions
//!
//! This module provides the Layer trait and the outputs trending layer, which applies a
//! per-output linear trend correction to the outputs of a network.

mod r#trait;
pub mod outputs_trending;

// Re-export the Layer trait for convenience
pub use outputs_trending::{OutputsTrendingLayer, OutputsTrendingMethod, TrendParameters};
pub use r#trait::Layer;

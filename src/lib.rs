//! Outputs Trending Layer Library
//!
//! This library provides a post-processing layer that applies a per-output linear trend
//! correction to the output vector of a neural network, together with its derivative
//! algebra and its structured-document serialization.
//!
//! # Modules
//!
//! - `layers`: Layer trait and the outputs trending layer
//! - `document`: In-memory XML element tree used for layer serialization
//! - `config`: JSON configuration for building trending layers
//! - `error`: Error taxonomy shared by every operation
//! - `utils`: Shared utilities (RNG, dense matrices)

pub mod config;
pub mod document;
pub mod error;
pub mod layers;
pub mod utils;

pub use error::{Result, TrendingError};

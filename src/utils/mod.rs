//! Shared utilities for trending layers
//!
//! This module provides the random number generator used for parameter initialization
//! and the dense matrix type returned by Jacobian and Hessian computations.

pub mod matrix;
pub mod rng;

pub use matrix::Matrix;
pub use rng::SimpleRng;

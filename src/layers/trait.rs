//! Layer trait definition for post-processing layers
//!
//! This module defines the Layer trait through which an enclosing network drives a layer
//! during inference and queries its contributions to chain-rule gradient computations.

use crate::error::Result;
use crate::utils::Matrix;

/// Core trait for post-processing layers.
///
/// The enclosing network owns its layers and calls them in sequence. Layers work with f64
/// data and report dimension problems as errors instead of panicking.
///
/// # Example
///
/// ```ignore
/// // Inference through a layer
/// let corrected = layer.forward(&outputs)?;
///
/// // Chain-rule contribution of the layer
/// let jacobian = layer.jacobian(&outputs)?;
/// ```
pub trait Layer {
    /// Forward propagation through the layer.
    ///
    /// # Errors
    ///
    /// Returns a length mismatch error if `inputs.len()` differs from `input_size()`.
    fn forward(&self, inputs: &[f64]) -> Result<Vec<f64>>;

    /// Jacobian of the layer evaluated at `inputs` (output_size × input_size).
    ///
    /// The network multiplies these matrices along the layer sequence when it needs
    /// gradients of the final outputs with respect to earlier activations.
    fn jacobian(&self, inputs: &[f64]) -> Result<Matrix>;

    /// Get the input size of the layer.
    fn input_size(&self) -> usize;

    /// Get the output size of the layer.
    fn output_size(&self) -> usize;

    /// Get the number of parameters that affect computed outputs.
    fn parameter_count(&self) -> usize;
}

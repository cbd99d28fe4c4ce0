//! Configuration structures for trending layers
//!
//! This module provides a JSON configuration format describing an outputs trending layer,
//! so that externally fitted trend parameters can be loaded without code changes.

use crate::error::{Result, TrendingError};
use crate::layers::{OutputsTrendingLayer, OutputsTrendingMethod, TrendParameters};
use serde::{Deserialize, Serialize};
use std::fs;
use tracing::warn;

/// Configuration for an outputs trending layer.
///
/// - **method**: `"NoTrending"` or `"Linear"`
/// - **trends**: One `{intercept, slope, correlation}` object per output (may be empty)
/// - **neurons_number**: Optional; when `trends` is empty the layer is built with this many
///   zeroed trends, otherwise it must agree with `trends`
/// - **display**: Optional logging switch (default true)
///
/// Correlations are not range-checked, matching the layer setters.
///
/// # Example
///
/// ```json
/// {
///   "method": "Linear",
///   "trends": [
///     { "intercept": 1.0, "slope": 2.0, "correlation": 0.9 },
///     { "intercept": -0.5, "slope": 0.5, "correlation": 0.7 }
///   ],
///   "display": false
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendingConfig {
    /// Outputs trending method: "NoTrending" or "Linear"
    pub method: String,

    /// Per-output trend parameters
    #[serde(default)]
    pub trends: Vec<TrendParameters>,

    /// Number of trending neurons when no explicit trends are given
    pub neurons_number: Option<usize>,

    /// Whether the layer logs informational messages
    pub display: Option<bool>,
}

impl TrendingConfig {
    /// Parses and validates a configuration from JSON text.
    pub fn from_json_str(contents: &str) -> Result<Self> {
        let config: TrendingConfig = serde_json::from_str(contents)?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Captures the state of `layer` as a configuration.
    pub fn from_layer(layer: &OutputsTrendingLayer) -> Self {
        Self {
            method: layer.write_outputs_trending_method().to_string(),
            trends: layer.get_outputs_trends(),
            neurons_number: Some(layer.get_outputs_trending_neurons_number()),
            display: Some(layer.get_display()),
        }
    }

    /// Pretty-printed JSON form of the configuration.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Loads a trending configuration from a JSON file.
///
/// # Returns
///
/// `Ok(TrendingConfig)` on success, or an error if the file cannot be read, the JSON is
/// invalid, or validation fails.
///
/// # Examples
///
/// ```no_run
/// use outputs_trending_layer::config::load_config;
///
/// let cfg = load_config("config/linear_trends.json").unwrap();
/// assert_eq!(cfg.method, "Linear");
/// ```
pub fn load_config(path: &str) -> Result<TrendingConfig> {
    let contents = fs::read_to_string(path)?;
    TrendingConfig::from_json_str(&contents)
}

/// Checks method name, neuron count consistency and finite intercepts and slopes.
///
/// Correlations are descriptive only; values outside [-1, 1] are accepted with a warning.
pub fn validate_config(config: &TrendingConfig) -> Result<()> {
    config.method.parse::<OutputsTrendingMethod>()?;

    if let Some(number) = config.neurons_number {
        if !config.trends.is_empty() && number != config.trends.len() {
            return Err(TrendingError::InvalidConfig(format!(
                "neurons_number is {} but {} trends are given",
                number,
                config.trends.len()
            )));
        }
    }

    for (i, trend) in config.trends.iter().enumerate() {
        if !trend.intercept.is_finite() || !trend.slope.is_finite() {
            return Err(TrendingError::InvalidConfig(format!(
                "trend {} has a non-finite intercept or slope",
                i
            )));
        }
        if !(-1.0..=1.0).contains(&trend.correlation) && config.display.unwrap_or(true) {
            warn!(trend = i, correlation = trend.correlation, "correlation outside [-1, 1]");
        }
    }

    Ok(())
}

/// Builds a layer from a validated configuration.
pub fn build_layer(config: &TrendingConfig) -> Result<OutputsTrendingLayer> {
    validate_config(config)?;

    let mut layer = OutputsTrendingLayer::new();
    if let Some(display) = config.display {
        layer.set_display(display);
    }

    if config.trends.is_empty() {
        layer.set_neurons_number(config.neurons_number.unwrap_or(0));
    } else {
        layer.set_outputs_trends(config.trends.clone());
    }
    layer.set_outputs_trending_method_str(&config.method)?;

    Ok(layer)
}

//! Error types for the outputs trending layer.

use thiserror::Error;

/// Errors reported by trending layer operations.
#[derive(Error, Debug)]
pub enum TrendingError {
    /// Neuron index not below the number of trending neurons
    #[error("Index out of range: index {index}, trending neurons number {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// Sequence length disagrees with the number of trending neurons
    #[error("Length mismatch in {context}: expected {expected}, got {got}")]
    LengthMismatch {
        context: &'static str,
        expected: usize,
        got: usize,
    },

    /// Method token outside the canonical names
    #[error("Invalid outputs trending method '{0}'. Must be one of: NoTrending, Linear")]
    InvalidMethodName(String),

    /// Structured document missing elements or carrying unparsable values
    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    /// Configuration rejected by validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Filesystem error while reading configuration
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// XML reader/writer error
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
}

/// Result type alias for trending layer operations.
pub type Result<T> = std::result::Result<T, TrendingError>;

impl TrendingError {
    pub(crate) fn length_mismatch(context: &'static str, expected: usize, got: usize) -> Self {
        TrendingError::LengthMismatch {
            context,
            expected,
            got,
        }
    }
}

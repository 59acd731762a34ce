//! Error types for setup and configuration.
//!
//! Similarity queries never fail: an uncomputable pair is reported as
//! [`UNUSED`](crate::UNUSED). Errors only come from reading the dataset and
//! from malformed configuration.

use thiserror::Error;

/// Errors raised while configuring or setting up an engine.
#[derive(Debug, Error)]
pub enum Error {
    /// The dataset collaborator failed while producing rating vectors.
    #[error("dataset fetch failed: {0}")]
    Fetch(String),

    /// A `value_bins` entry is not a number.
    #[error("invalid value bin {literal:?} in {input:?}")]
    InvalidValueBins {
        /// The whole configured string.
        input: String,
        /// The entry that failed to parse.
        literal: String,
    },

    /// The dataset's rating range is unusable.
    #[error("invalid rating range [{min}, {max}]")]
    InvalidRatingRange {
        /// Configured minimum rating.
        min: f64,
        /// Configured maximum rating.
        max: f64,
    },

    /// Configuration could not be deserialized.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl Error {
    /// Wrap a collaborator failure.
    pub fn fetch(err: impl std::fmt::Display) -> Self {
        Error::Fetch(err.to_string())
    }
}

/// Result alias for fallible setup and configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

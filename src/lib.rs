//! Pairwise similarity for memory-based collaborative filtering.
//!
//! `simcf` computes how alike two users (or two items) are from their sparse
//! rating vectors. It is the primitive a neighborhood recommender calls to pick
//! neighbors:
//!
//! - **Statistics**: per-entity and global rating means/variances, computed
//!   once per session ([`stats`])
//! - **Measures**: 38 similarity formulas selectable by name ([`Measure`],
//!   [`measures`])
//! - **Bins**: value and rank bins for histogram measures ([`bins`])
//! - **Caching**: single-flight memoization of similarities and column
//!   statistics ([`cache`])
//!
//! # Undefined results
//!
//! Many measures are undefined for some pairs: no co-rated fields, zero
//! variance, a zero-length vector. Formulas return `Option<f64>`;
//! [`SimilarityEngine::similarity`] maps `None` to the sentinel [`UNUSED`],
//! and [`is_used`] tells the two apart. No measure ever returns NaN or
//! infinity.
//!
//! | Measure | No overlap | Zero variance | Identical vectors |
//! |---------|-----------|---------------|-------------------|
//! | `cosine` | undefined | defined | 1 |
//! | `pearson` | undefined | undefined | 1 |
//! | `jaccard` | 0 | defined | 1 |
//! | `msd` | undefined | defined | 1 |
//!
//! # Sessions
//!
//! An engine is configured once ([`SimilarityConfig`]) and then set up against
//! a [`Dataset`](dataset::Dataset). Setup scans the dataset, parses the bins
//! and opens fresh caches; unsetup drops all of it. Queries may run from many
//! threads at once.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use simcf::dataset::{DatasetConfig, MemoryDataset};
//! use simcf::{RatingVector, SimilarityConfig, SimilarityEngine, UNUSED};
//!
//! let data = MemoryDataset::from_triples(
//!     DatasetConfig::new(1.0, 5.0),
//!     [(1, 1, 5.0), (1, 2, 3.0), (1, 3, 4.0), (2, 1, 4.0), (2, 2, 2.0), (2, 3, 5.0)],
//! );
//! let engine = SimilarityEngine::new(SimilarityConfig::with_measure("cosine"));
//! engine.setup(Arc::new(data)).unwrap();
//!
//! let a = RatingVector::from_pairs(1, [(1, 5.0), (2, 3.0), (3, 4.0)]);
//! let b = RatingVector::from_pairs(2, [(1, 4.0), (2, 2.0), (3, 5.0)]);
//! let c = engine.similarity(&a, &b, None, None, &[]);
//! assert!((c - 46.0 / 2250.0_f64.sqrt()).abs() < 1e-12);
//!
//! // No co-rated fields: cosine is undefined.
//! let d = RatingVector::from_pairs(3, [(9, 5.0)]);
//! assert_eq!(engine.similarity(&a, &d, None, None, &[]), UNUSED);
//! ```
//!
//! # References
//!
//! - Herlocker et al. (1999). "An algorithmic framework for performing
//!   collaborative filtering"
//! - Ahn (2008). "A new similarity measure for collaborative filtering to
//!   alleviate the new user cold-starting problem"
//! - Liu et al. (2014). "A new user similarity model to improve the accuracy
//!   of collaborative filtering"
//! - Patra et al. (2015). "A new similarity measure using Bhattacharyya
//!   coefficient for collaborative filtering in sparse data"

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bins;
pub mod cache;
pub mod config;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod measure;
pub mod measures;
pub mod profile;
pub mod stats;
pub mod vector;

pub use config::SimilarityConfig;
pub use engine::SimilarityEngine;
pub use error::{Error, Result};
pub use measure::{supported_measures, Measure};
pub use measures::Param;
pub use profile::{AttributeValue, Profile};
pub use vector::{EntityId, FieldId, RatingVector};

/// Sentinel for an undefined similarity.
///
/// A finite value far below any real similarity, so it sorts last and never
/// poisons arithmetic the way NaN would.
pub const UNUSED: f64 = f64::MIN;

/// True unless `value` is the [`UNUSED`] sentinel (or not finite).
#[inline]
#[must_use]
pub fn is_used(value: f64) -> bool {
    value.is_finite() && value != UNUSED
}

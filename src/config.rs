//! Engine configuration.
//!
//! All entries are optional when deserializing; missing entries take their
//! defaults. Entry names follow the historical configuration keys, with the
//! older spellings accepted as aliases.
//!
//! ```json
//! {
//!   "measure": "pearson",
//!   "support_cache": true,
//!   "value_bins": "1, 2, 3, 4, 5"
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::dataset::RowAxis;
use crate::error::Result;
use crate::measure::Measure;

/// Default `value_bins` entry.
pub const VALUE_BINS_DEFAULT: &str = "1, 2, 3, 4, 5";

/// Full-weight threshold of the weighted Pearson measure.
pub const WPC_THRESHOLD: f64 = 50.0;

/// Similarity engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityConfig {
    /// Active measure name. Unknown names make every query return
    /// [`UNUSED`](crate::UNUSED).
    pub measure: String,
    /// Subtract the rating median before cosine-family computations.
    #[serde(alias = "cos_normalized")]
    pub cosine_normalized: bool,
    /// Use `1 / (1 + mean squared difference)` instead of the range-normalized
    /// MSD.
    pub msd_fraction: bool,
    /// Comma-separated rating values used as histogram bins. Empty means
    /// "extract from the compared vectors".
    pub value_bins: String,
    /// BCF deviations are taken from the rating median (otherwise from the
    /// vector mean) and column lengths from median-centered values.
    #[serde(alias = "bcf_median")]
    pub bcf_median_mode: bool,
    /// Weight of Pearson in the Mu measure.
    pub mu_alpha: f64,
    /// Penalty weight of the SMTP measure.
    pub smtp_lambda: f64,
    /// SMTP uses the global rating variance instead of per-field variances.
    pub smtp_general_var: bool,
    /// Triangle area is computed on median-centered values.
    pub ta_normalized: bool,
    /// Memoize similarities and column statistics.
    pub support_cache: bool,
    /// Whether compared vectors are users or items.
    pub row_axis: RowAxis,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            measure: Measure::default().name().to_string(),
            cosine_normalized: false,
            msd_fraction: false,
            value_bins: VALUE_BINS_DEFAULT.to_string(),
            bcf_median_mode: true,
            mu_alpha: 0.5,
            smtp_lambda: 0.5,
            smtp_general_var: false,
            ta_normalized: false,
            support_cache: false,
            row_axis: RowAxis::Users,
        }
    }
}

impl SimilarityConfig {
    /// Default configuration with the given measure name.
    #[must_use]
    pub fn with_measure(measure: impl Into<String>) -> Self {
        Self {
            measure: measure.into(),
            ..Self::default()
        }
    }

    /// Parse a JSON object; missing entries take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Enable or disable memoization.
    #[must_use]
    pub fn support_cache(mut self, enabled: bool) -> Self {
        self.support_cache = enabled;
        self
    }

    /// Set the value bins string.
    #[must_use]
    pub fn value_bins(mut self, bins: impl Into<String>) -> Self {
        self.value_bins = bins.into();
        self
    }

    /// Set the row axis.
    #[must_use]
    pub fn row_axis(mut self, axis: RowAxis) -> Self {
        self.row_axis = axis;
        self
    }

    /// Toggle median-centered cosine.
    #[must_use]
    pub fn cosine_normalized(mut self, on: bool) -> Self {
        self.cosine_normalized = on;
        self
    }

    /// Toggle fraction-form MSD.
    #[must_use]
    pub fn msd_fraction(mut self, on: bool) -> Self {
        self.msd_fraction = on;
        self
    }

    /// Toggle median mode of BCF.
    #[must_use]
    pub fn bcf_median_mode(mut self, on: bool) -> Self {
        self.bcf_median_mode = on;
        self
    }

    /// Set the Mu measure's Pearson weight.
    #[must_use]
    pub fn mu_alpha(mut self, alpha: f64) -> Self {
        self.mu_alpha = alpha;
        self
    }

    /// Set SMTP's lambda and variance source.
    #[must_use]
    pub fn smtp(mut self, lambda: f64, general_var: bool) -> Self {
        self.smtp_lambda = lambda;
        self.smtp_general_var = general_var;
        self
    }

    /// Toggle median-centered triangle area.
    #[must_use]
    pub fn ta_normalized(mut self, on: bool) -> Self {
        self.ta_normalized = on;
        self
    }

    /// Parsed measure, `None` for an unknown name.
    #[must_use]
    pub fn parsed_measure(&self) -> Option<Measure> {
        Measure::from_name(&self.measure)
    }
}

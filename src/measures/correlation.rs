//! Correlation family: Pearson and its weighted, constrained and
//! mean-centered variants.
//!
//! All of them are a cosine of deviations over the co-rated fields; they
//! differ in what the deviation is taken from and how the result is damped.
//!
//! | Measure | Deviation from | Damping |
//! |---------|----------------|---------|
//! | `pearson` | vector mean (all rated fields) | none |
//! | `wpc` | vector mean | `min(n / 50, 1)` |
//! | `spc` | vector mean | `1 / (1 + e^(-n/2))` |
//! | `cpc` | rating median | none |
//! | `cod` | field mean | none |
//! | `pc` | field mean, weighted by column correlation² | none |

use super::{deviation_cosine, finite, sigmoid};
use crate::config::WPC_THRESHOLD;
use crate::vector::{FieldId, RatingVector};

/// Pearson correlation over co-rated fields.
///
/// Each vector is centered on its own mean over *all* its rated fields, not
/// just the co-rated ones.
///
/// # Example
///
/// ```rust
/// use simcf::measures::correlation::pearson;
/// use simcf::RatingVector;
///
/// let a = RatingVector::from_pairs(1, [(1, 5.0), (2, 3.0), (3, 4.0)]);
/// let b = RatingVector::from_pairs(2, [(1, 4.0), (2, 2.0), (3, 5.0)]);
/// let r = pearson(&a, &b).unwrap();
/// assert!((r - 0.6547).abs() < 1e-4);
/// ```
#[must_use]
pub fn pearson(a: &RatingVector, b: &RatingVector) -> Option<f64> {
    let (ma, mb) = (a.mean()?, b.mean()?);
    deviation_cosine(a.common(b).map(|(_, x, y)| (x - ma, y - mb)))
}

/// Constrained Pearson: deviations from the rating median.
#[must_use]
pub fn cpc(a: &RatingVector, b: &RatingVector, median: f64) -> Option<f64> {
    deviation_cosine(a.common(b).map(|(_, x, y)| (x - median, y - median)))
}

/// Weighted Pearson: Pearson scaled down linearly below 50 co-rated fields.
#[must_use]
pub fn wpc(a: &RatingVector, b: &RatingVector) -> Option<f64> {
    let r = pearson(a, b)?;
    let n = a.common_count(b) as f64;
    if n <= WPC_THRESHOLD {
        Some(r * n / WPC_THRESHOLD)
    } else {
        Some(r)
    }
}

/// Sigmoid Pearson: Pearson damped by `1 / (1 + e^(-n/2))`.
#[must_use]
pub fn spc(a: &RatingVector, b: &RatingVector) -> Option<f64> {
    let r = pearson(a, b)?;
    let n = a.common_count(b) as f64;
    finite(r * sigmoid(n / 2.0))
}

/// Adjusted cosine: deviations from each field's mean.
///
/// Fields whose mean is unknown are skipped.
#[must_use]
pub fn cod<M>(a: &RatingVector, b: &RatingVector, field_mean: M) -> Option<f64>
where
    M: Fn(FieldId) -> Option<f64>,
{
    deviation_cosine(
        a.common(b)
            .filter_map(|(f, x, y)| field_mean(f).map(|m| (x - m, y - m))),
    )
}

/// Column-weighted adjusted cosine.
///
/// Each co-rated field contributes its field-mean deviations weighted by the
/// squared correlation between its column and the `fixed` column. Fields
/// whose mean or correlation is undefined are skipped.
#[must_use]
pub fn pc<M, C>(
    a: &RatingVector,
    b: &RatingVector,
    fixed: FieldId,
    field_mean: M,
    column_corr: C,
) -> Option<f64>
where
    M: Fn(FieldId) -> Option<f64>,
    C: Fn(FieldId, FieldId) -> Option<f64>,
{
    let (mut vx, mut vy, mut vxy) = (0.0, 0.0, 0.0);
    for (field, x, y) in a.common(b) {
        let Some(mean) = field_mean(field) else {
            continue;
        };
        let Some(corr) = column_corr(fixed, field) else {
            continue;
        };
        let weight = corr * corr;
        let (dx, dy) = (x - mean, y - mean);
        vx += weight * dx * dx;
        vy += weight * dy * dy;
        vxy += weight * dx * dy;
    }
    if vx == 0.0 || vy == 0.0 {
        return None;
    }
    finite(vxy / (vx * vy).sqrt())
}

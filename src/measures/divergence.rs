//! Distance and divergence measures.
//!
//! Distance-based measures (`msd`, `triangle`, `ta`) compare values on the
//! co-rated fields. Histogram-based ones (`bc`, `bcf`, `mmd`) compare how
//! each vector's ratings spread over a set of rating bins and therefore
//! accept vectors with no overlap at all. `src` ranks co-rated values by bin.
//!
//! # Bhattacharyya coefficient
//!
//! ```text
//! BC(a, b) = Σ_bins sqrt( (#a == bin / |a|) · (#b == bin / |b|) )
//! ```
//!
//! BCF lifts BC from rows to columns: every pair of rated fields `(i, j)`
//! contributes `BC(column_i, column_j) · dev_a(i) · dev_b(j) / (|col_i|·|col_j|)`.

use super::{finite, MeasureContext};
use crate::bins::RankBins;
use crate::vector::RatingVector;

/// Mean squared difference similarity.
///
/// `fraction` selects `1 / (1 + mean sq. diff)`; otherwise the mean squared
/// difference is normalized by the squared maximum rating and subtracted
/// from 1.
#[must_use]
pub fn msd(a: &RatingVector, b: &RatingVector, max_rating: f64, fraction: bool) -> Option<f64> {
    let (mut n, mut sum_sq) = (0usize, 0.0);
    for (_, x, y) in a.common(b) {
        n += 1;
        sum_sq += (x - y) * (x - y);
    }
    if n == 0 {
        return None;
    }
    let n = n as f64;
    if fraction {
        finite(1.0 / (1.0 + sum_sq / n))
    } else {
        finite(1.0 - sum_sq / (n * max_rating * max_rating))
    }
}

/// How many of the vector's values equal each bin.
fn bin_counts(v: &RatingVector, bins: &[f64]) -> Vec<usize> {
    bins.iter()
        .map(|&bin| v.values().iter().filter(|&&x| x == bin).count())
        .collect()
}

/// Bhattacharyya coefficient of the two value histograms.
#[must_use]
pub fn bc(a: &RatingVector, b: &RatingVector, bins: &[f64]) -> Option<f64> {
    if a.is_empty() || b.is_empty() {
        return None;
    }
    let (na, nb) = (a.len() as f64, b.len() as f64);
    let sum = bin_counts(a, bins)
        .into_iter()
        .zip(bin_counts(b, bins))
        .map(|(ca, cb)| (ca as f64 / na * cb as f64 / nb).sqrt())
        .sum();
    finite(sum)
}

/// Euclidean length of a column, centered on `median` when given.
#[must_use]
pub fn column_module(column: &RatingVector, median: Option<f64>) -> Option<f64> {
    let center = median.unwrap_or(0.0);
    let ss: f64 = column.values().iter().map(|v| (v - center) * (v - center)).sum();
    finite(ss.sqrt())
}

/// Column-lifted Bhattacharyya measure.
///
/// Column pairs whose column is missing, has zero length or has an
/// undefined BC are skipped.
#[must_use]
pub fn bcf(ctx: &MeasureContext<'_>, a: &RatingVector, b: &RatingVector) -> Option<f64> {
    if a.is_empty() || b.is_empty() {
        return None;
    }
    let median = ctx.config.bcf_median_mode.then_some(ctx.rating_median());
    let (ma, mb) = (a.mean()?, b.mean()?);
    let deviation = |value: f64, mean: f64| value - median.unwrap_or(mean);

    // Columns of `b` are revisited for every field of `a`.
    let right: Vec<_> = b
        .iter()
        .filter_map(|(field, value)| {
            let column = ctx.columns.column_rating(field)?;
            let module = ctx.column_module(&column).filter(|&m| m != 0.0)?;
            Some((column, module, deviation(value, mb)))
        })
        .collect();

    let mut sum = 0.0;
    for (field, value) in a.iter() {
        let Some(left) = ctx.columns.column_rating(field) else {
            continue;
        };
        let Some(left_module) = ctx.column_module(&left).filter(|&m| m != 0.0) else {
            continue;
        };
        let left_dev = deviation(value, ma);
        for (right_column, right_module, right_dev) in &right {
            let Some(coef) = ctx.column_bc(&left, right_column) else {
                continue;
            };
            let Some(loc) = finite(left_dev * right_dev / (left_module * right_module)) else {
                continue;
            };
            sum += coef * loc;
        }
    }
    finite(sum)
}

/// Grewal angular transform `asin(1 − 2p)` of a bin proportion.
///
/// Bounded to `[−π/2, π/2]` for every proportion in `[0, 1]`.
fn theta(count: usize, total: usize) -> f64 {
    (1.0 - 2.0 * count as f64 / total as f64).asin()
}

/// Mean measure of divergence between the two value histograms.
#[must_use]
pub fn mmd(a: &RatingVector, b: &RatingVector, bins: &[f64]) -> Option<f64> {
    if a.is_empty() || b.is_empty() || bins.is_empty() {
        return None;
    }
    let mut sum = 0.0;
    for (ca, cb) in bin_counts(a, bins).into_iter().zip(bin_counts(b, bins)) {
        let bias = theta(ca, a.len()) - theta(cb, b.len());
        sum += bias * bias - 1.0 / (0.5 + ca as f64) - 1.0 / (0.5 + cb as f64);
    }
    finite(1.0 / (1.0 + sum / bins.len() as f64))
}

/// Spearman rank correlation over co-rated fields.
///
/// Undefined with fewer than two co-rated fields or when a value has no rank.
#[must_use]
pub fn src(a: &RatingVector, b: &RatingVector, ranks: &RankBins) -> Option<f64> {
    let (mut n, mut sum) = (0usize, 0.0);
    for (_, x, y) in a.common(b) {
        let d = f64::from(ranks.rank(x)?) - f64::from(ranks.rank(y)?);
        sum += d * d;
        n += 1;
    }
    if n < 2 {
        return None;
    }
    let n = n as f64;
    finite(1.0 - 6.0 * sum / (n * (n * n - 1.0)))
}

/// Triangle similarity: `1 − ‖a − b‖ / (‖a‖ + ‖b‖)`.
///
/// The distance runs over co-rated fields, the lengths over each vector's
/// own rated fields. Undefined on empty overlap.
#[must_use]
pub fn triangle(a: &RatingVector, b: &RatingVector) -> Option<f64> {
    let (mut n, mut dist) = (0usize, 0.0);
    for (_, x, y) in a.common(b) {
        n += 1;
        dist += (x - y) * (x - y);
    }
    let denom = a.module() + b.module();
    if n == 0 || denom == 0.0 {
        return None;
    }
    finite(1.0 - dist.sqrt() / denom)
}

/// Triangle area measure over co-rated fields, centered on `median` when
/// given.
///
/// With `a = ‖v1‖`, `b = ‖v2‖`, `p = v1·v2`, the longer side is the base:
/// `p² / (short · long³)` for `p ≥ 0`, `p / long²` otherwise.
#[must_use]
pub fn triangle_area(a: &RatingVector, b: &RatingVector, median: Option<f64>) -> Option<f64> {
    let center = median.unwrap_or(0.0);
    let (mut n, mut la, mut lb, mut p) = (0usize, 0.0, 0.0, 0.0);
    for (_, x, y) in a.common(b) {
        let (x, y) = (x - center, y - center);
        n += 1;
        la += x * x;
        lb += y * y;
        p += x * y;
    }
    if n == 0 {
        return None;
    }
    let (la, lb) = (la.sqrt(), lb.sqrt());
    if la == 0.0 || lb == 0.0 {
        return None;
    }
    let (short, long) = if la < lb { (la, lb) } else { (lb, la) };
    let value = if p >= 0.0 {
        p * p / (short * long * long * long)
    } else {
        p / (long * long)
    };
    finite(value)
}

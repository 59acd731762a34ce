//! Measures built from the shape of each vector's rating distribution.
//!
//! PSS multiplies three per-field factors, each a logistic squashing:
//!
//! ```text
//! proximity    = 1 − σ(|r1 − r2|)                 close ratings
//! significance = σ(|r1 − m| · |r2 − m|)           far from the median m
//! singularity  = 1 − σ(|(r1 + r2)/2 − μ_field|)   unlike the crowd
//! ```
//!
//! NHSM adds Jaccard2 and URP (mean and variance mismatch) on top. PIP plays
//! the same game with agreement, impact and popularity terms.

use super::{cosine, correlation, divergence, finite, overlap, sigmoid};
use crate::dataset::DatasetConfig;
use crate::vector::{FieldId, RatingVector};

/// User rating preference: penalizes mismatch of both mean and variance.
#[must_use]
pub fn urp(a: &RatingVector, b: &RatingVector) -> Option<f64> {
    let gap = (a.mean()? - b.mean()?).abs() * (a.mle_var()? - b.mle_var()?).abs();
    finite(1.0 - sigmoid(gap))
}

/// Proximity, significance and singularity summed over co-rated fields.
///
/// Fields without a known mean are skipped.
#[must_use]
pub fn pss<M>(a: &RatingVector, b: &RatingVector, median: f64, field_mean: M) -> Option<f64>
where
    M: Fn(FieldId) -> Option<f64>,
{
    let mut common = a.common(b).peekable();
    common.peek()?;
    let mut sum = 0.0;
    for (field, x, y) in common {
        let Some(mean) = field_mean(field) else {
            continue;
        };
        let proximity = 1.0 - sigmoid((x - y).abs());
        let significance = sigmoid((x - median).abs() * (y - median).abs());
        let singularity = 1.0 - sigmoid(((x + y) / 2.0 - mean).abs());
        sum += proximity * significance * singularity;
    }
    finite(sum)
}

/// New heuristic similarity model: `pss · jaccard2 · urp`.
#[must_use]
pub fn nhsm<M>(a: &RatingVector, b: &RatingVector, median: f64, field_mean: M) -> Option<f64>
where
    M: Fn(FieldId) -> Option<f64>,
{
    let value = pss(a, b, median, field_mean)? * overlap::jaccard2(a, b)? * urp(a, b)?;
    finite(value)
}

/// Proximity, impact and popularity summed over co-rated fields.
///
/// Two ratings agree unless they fall strictly on opposite sides of the
/// rating median. Disagreement doubles the distance and inverts the impact.
#[must_use]
pub fn pip<M>(
    a: &RatingVector,
    b: &RatingVector,
    range: &DatasetConfig,
    field_mean: M,
) -> Option<f64>
where
    M: Fn(FieldId) -> Option<f64>,
{
    let median = range.rating_median();
    let span = 2.0 * (range.max_rating - range.min_rating) + 1.0;
    let mut common = a.common(b).peekable();
    common.peek()?;

    let mut sum = 0.0;
    for (field, x, y) in common {
        let Some(mean) = field_mean(field) else {
            continue;
        };
        let agreed = !((x > median && y < median) || (x < median && y > median));

        let distance = if agreed { (x - y).abs() } else { 2.0 * (x - y).abs() };
        let proximity = (span - distance) * (span - distance);

        let mut impact = ((x - median).abs() + 1.0) * ((y - median).abs() + 1.0);
        if !agreed {
            impact = 1.0 / impact;
        }

        let popularity = if (x > mean && y > mean) || (x < mean && y < mean) {
            let bias = (x + y) / 2.0 - mean;
            1.0 + bias * bias
        } else {
            1.0
        };

        sum += proximity * impact * popularity;
    }
    finite(sum)
}

/// `coj · σ(|common|² / (|a|·|b|)) · urp`.
#[must_use]
pub fn feng(a: &RatingVector, b: &RatingVector, center: f64) -> Option<f64> {
    if a.is_empty() || b.is_empty() {
        return None;
    }
    let s1 = cosine::coj(a, b, center)?;
    let common = a.common_count(b) as f64;
    let s2 = sigmoid(common * common / (a.len() as f64 * b.len() as f64));
    let s3 = urp(a, b)?;
    finite(s1 * s2 * s3)
}

/// `α · pearson + (1 − α) · ((1 − bc) + jaccard)`.
#[must_use]
pub fn mu(a: &RatingVector, b: &RatingVector, alpha: f64, bins: &[f64]) -> Option<f64> {
    let pearson = correlation::pearson(a, b)?;
    let bc = divergence::bc(a, b, bins)?;
    let jaccard = overlap::jaccard(a, b)?;
    finite(alpha * pearson + (1.0 - alpha) * ((1.0 - bc) + jaccard))
}

/// Similarity measure for text processing, applied to rating vectors.
///
/// Runs over co-rated fields whose variance is known. A field both sides
/// rate non-zero contributes `(1 + e^(-(x−y)²/var)) / 2`, a field exactly one
/// side rates zero contributes `−λ`, and a field both rate zero is ignored.
/// The mean contribution `F` is mapped to `(F + λ) / (1 + λ)`.
#[must_use]
pub fn smtp<V>(a: &RatingVector, b: &RatingVector, lambda: f64, variance: V) -> Option<f64>
where
    V: Fn(FieldId) -> Option<f64>,
{
    let (mut total, mut counted) = (0.0, 0usize);
    for (field, x, y) in a.common(b) {
        let Some(var) = variance(field) else {
            continue;
        };
        if x != 0.0 && y != 0.0 {
            let diff = x - y;
            total += if var > 0.0 {
                0.5 * (1.0 + (-(diff * diff) / var).exp())
            } else if diff == 0.0 {
                1.0
            } else {
                0.5
            };
            counted += 1;
        } else if x != 0.0 || y != 0.0 {
            total -= lambda;
            counted += 1;
        }
    }
    if counted == 0 {
        return None;
    }
    let f = total / counted as f64;
    finite((f + lambda) / (1.0 + lambda))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{pair_ab, v};
    use super::*;

    fn flat_mean(_: FieldId) -> Option<f64> {
        Some(3.0)
    }

    #[test]
    fn test_urp_identical_shape() {
        let (a, _) = pair_ab();
        let shifted = v(9, &[(1, 5.0), (2, 3.0), (3, 4.0)]);
        // No gap at all: 1 − σ(0) = 0.5
        assert!((urp(&a, &shifted).unwrap() - 0.5).abs() < 1e-12);
        assert_eq!(urp(&a, &RatingVector::new(1)), None);
    }

    #[test]
    fn test_urp_grows_with_gap() {
        let a = v(1, &[(1, 1.0), (2, 5.0)]);
        let b = v(2, &[(1, 4.0), (2, 4.0)]);
        // |3 − 4| · |4 − 0| = 4
        let expected = 1.0 - 1.0 / (1.0 + (-4.0_f64).exp());
        assert!((urp(&a, &b).unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_pss_single_field() {
        let a = v(1, &[(1, 5.0)]);
        let b = v(2, &[(1, 4.0)]);
        let pro = 1.0 - sigmoid(1.0);
        let sig = sigmoid(2.0);
        let sing = 1.0 - sigmoid(1.5);
        assert!((pss(&a, &b, 3.0, flat_mean).unwrap() - pro * sig * sing).abs() < 1e-12);
    }

    #[test]
    fn test_pss_no_overlap() {
        let a = v(1, &[(1, 5.0)]);
        let b = v(2, &[(2, 4.0)]);
        assert_eq!(pss(&a, &b, 3.0, flat_mean), None);
        assert_eq!(nhsm(&a, &b, 3.0, flat_mean), None);
    }

    #[test]
    fn test_nhsm_is_product() {
        let (a, b) = pair_ab();
        let expected = pss(&a, &b, 3.0, flat_mean).unwrap()
            * overlap::jaccard2(&a, &b).unwrap()
            * urp(&a, &b).unwrap();
        assert!((nhsm(&a, &b, 3.0, flat_mean).unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_pip_agreement() {
        let range = DatasetConfig::new(1.0, 5.0);
        let a = v(1, &[(1, 5.0)]);
        let agree = v(2, &[(1, 4.0)]);
        let disagree = v(3, &[(1, 1.0)]);
        // agreed: distance 1, proximity (9 − 1)², impact 3 · 2, mean 3 -> bias 1.5
        let expected = 64.0 * 6.0 * (1.0 + 2.25);
        assert!((pip(&a, &agree, &range, flat_mean).unwrap() - expected).abs() < 1e-9);
        // disagreed: distance 8, proximity 1, impact 1 / 9, popularity 1
        let expected = 1.0 / 9.0;
        assert!((pip(&a, &disagree, &range, flat_mean).unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_feng() {
        let (a, b) = pair_ab();
        let expected = cosine::coj(&a, &b, 0.0).unwrap() * sigmoid(1.0) * urp(&a, &b).unwrap();
        assert!((feng(&a, &b, 0.0).unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_mu() {
        let (a, b) = pair_ab();
        let bins = [1.0, 2.0, 3.0, 4.0, 5.0];
        let p = correlation::pearson(&a, &b).unwrap();
        let bc = divergence::bc(&a, &b, &bins).unwrap();
        let expected = 0.5 * p + 0.5 * ((1.0 - bc) + 1.0);
        assert!((mu(&a, &b, 0.5, &bins).unwrap() - expected).abs() < 1e-12);
        assert!((mu(&a, &b, 1.0, &bins).unwrap() - p).abs() < 1e-12);
    }

    #[test]
    fn test_smtp_identical_vectors() {
        let (a, _) = pair_ab();
        let s = smtp(&a, &a, 0.5, |_| Some(1.0)).unwrap();
        assert!((s - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_smtp_zero_handling() {
        let a = v(1, &[(1, 0.0), (2, 0.0)]);
        let b = v(2, &[(1, 0.0), (2, 3.0)]);
        // field 1 ignored, field 2 penalized: F = −λ -> 0
        assert_eq!(smtp(&a, &b, 0.5, |_| Some(1.0)), Some(0.0));
        assert_eq!(smtp(&a, &a, 0.5, |_| Some(1.0)), None);
    }

    #[test]
    fn test_smtp_needs_known_variance() {
        let (a, b) = pair_ab();
        assert_eq!(smtp(&a, &b, 0.5, |_| None), None);
        let zero_var = smtp(&a, &b, 0.5, |_| Some(0.0)).unwrap();
        // every field differs: F = 0.5
        assert!((zero_var - 1.0 / 1.5).abs() < 1e-12);
    }
}

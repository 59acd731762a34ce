//! Overlap and presence-weighted measures.
//!
//! These look at *which* fields were rated more than at the values, so they
//! stay defined on pairs with little or no overlap.
//!
//! ```text
//!            a only     both      b only
//!         |--------|----------|--------|
//! sums:      X2         X1/Y1      Y2       U = X1 + X2, V = Y1 + Y2
//! ```
//!
//! The Amer and quasi-TF-IDF measures assume positive ratings.

use std::collections::BTreeSet;

use super::finite;
use crate::vector::{FieldId, RatingVector};

/// Shared and exclusive rating mass of a pair.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Mass {
    /// Sum of `a` over co-rated fields.
    x1: f64,
    /// Sum of `b` over co-rated fields.
    y1: f64,
    /// Sum of `a` over fields only `a` rated.
    x2: f64,
    /// Sum of `b` over fields only `b` rated.
    y2: f64,
    common: usize,
    union: usize,
}

impl Mass {
    fn of(a: &RatingVector, b: &RatingVector) -> Self {
        let mut m = Mass::default();
        for (_, x, y) in a.union(b) {
            m.union += 1;
            match (x, y) {
                (Some(x), Some(y)) => {
                    m.x1 += x;
                    m.y1 += y;
                    m.common += 1;
                }
                (Some(x), None) => m.x2 += x,
                (None, Some(y)) => m.y2 += y,
                (None, None) => {}
            }
        }
        m
    }

    /// `U · V`, the product of total rating mass.
    fn total(&self) -> f64 {
        (self.x1 + self.x2) * (self.y1 + self.y2)
    }
}

/// `|common| / |union|`.
///
/// # Example
///
/// ```rust
/// use simcf::measures::overlap::jaccard;
/// use simcf::RatingVector;
///
/// let a = RatingVector::from_pairs(1, [(1, 5.0), (2, 3.0)]);
/// let b = RatingVector::from_pairs(2, [(2, 1.0), (3, 4.0)]);
/// assert_eq!(jaccard(&a, &b), Some(1.0 / 3.0));
/// ```
#[must_use]
pub fn jaccard(a: &RatingVector, b: &RatingVector) -> Option<f64> {
    let union = a.union_count(b);
    if union == 0 {
        return None;
    }
    Some(a.common_count(b) as f64 / union as f64)
}

/// `|common| / (|a| · |b|)`.
#[must_use]
pub fn jaccard2(a: &RatingVector, b: &RatingVector) -> Option<f64> {
    if a.is_empty() || b.is_empty() {
        return None;
    }
    Some(a.common_count(b) as f64 / (a.len() as f64 * b.len() as f64))
}

/// Amer's presence measure over the known field ids joined with the pair's
/// rated fields.
#[must_use]
pub fn amer(a: &RatingVector, b: &RatingVector, known: &BTreeSet<FieldId>) -> Option<f64> {
    let mut n = known.len();
    let (mut common, mut exclusive) = (0usize, 0usize);
    for (field, x, y) in a.union(b) {
        if !known.contains(&field) {
            n += 1;
        }
        if x.is_some() && y.is_some() {
            common += 1;
        } else {
            exclusive += 1;
        }
    }
    if n == 0 {
        return None;
    }
    let rated = (a.len() + b.len()) as f64;
    let presence = 1.0 - exclusive as f64 / n as f64;
    finite((presence + 2.0 * common as f64 / rated) / 2.0)
}

/// `1 − (X2·Y2 + 1) / (U·V)`.
#[must_use]
pub fn amer2(a: &RatingVector, b: &RatingVector) -> Option<f64> {
    let m = Mass::of(a, b);
    if m.union == 0 {
        return None;
    }
    finite(1.0 - (m.x2 * m.y2 + 1.0) / m.total())
}

/// Quasi-TF-IDF: shared mass rewarded, exclusive mass penalized.
#[must_use]
pub fn quasi_tf_idf(a: &RatingVector, b: &RatingVector) -> Option<f64> {
    let m = Mass::of(a, b);
    if m.union == 0 {
        return None;
    }
    let n = m.total();
    finite((m.x1 * m.y1 / n) * (1.0 - m.x2 * m.y2 / n))
}

/// Quasi-TF-IDF with the shared term scaled by Jaccard and the exclusive
/// term by its complement.
#[must_use]
pub fn quasi_tf_idf_jaccard(a: &RatingVector, b: &RatingVector) -> Option<f64> {
    let m = Mass::of(a, b);
    if m.union == 0 {
        return None;
    }
    let n = m.total();
    let jac = m.common as f64 / m.union as f64;
    finite((m.x1 * m.y1 * jac / n) * (1.0 - m.x2 * m.y2 * (1.0 - jac) / n))
}

/// Numerical nearby similarity: `|common| · (a·b) / (|a|·Σa + |b|·Σb)`.
#[must_use]
pub fn mmns(a: &RatingVector, b: &RatingVector) -> Option<f64> {
    let (mut n, mut product) = (0usize, 0.0);
    for (_, x, y) in a.common(b) {
        n += 1;
        product += x * y;
    }
    let denom = a.len() as f64 * a.sum() + b.len() as f64 * b.sum();
    if denom == 0.0 {
        return None;
    }
    finite(n as f64 * product / denom)
}

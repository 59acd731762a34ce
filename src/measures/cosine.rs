//! Cosine family.
//!
//! ```text
//! cosine   common fields only           Σxy / sqrt(Σx²·Σy²)
//! coj      union of rated fields        each side's length over its own fields
//! coco     whole vectors, not centered  ΣA·ΣB / sqrt(Σx²·Σy²)
//! ```
//!
//! `center` is subtracted from every value first; it is 0 unless
//! `cosine_normalized` is configured, in which case it is the rating median.

use super::{deviation_cosine, finite};
use crate::vector::RatingVector;

/// Cosine over co-rated fields.
///
/// # Example
///
/// ```rust
/// use simcf::measures::cosine::cosine;
/// use simcf::RatingVector;
///
/// let a = RatingVector::from_pairs(1, [(1, 5.0), (2, 3.0), (3, 4.0)]);
/// let b = RatingVector::from_pairs(2, [(1, 4.0), (2, 2.0), (3, 5.0)]);
/// let c = cosine(&a, &b, 0.0).unwrap();
/// assert!((c - 46.0 / 2250.0_f64.sqrt()).abs() < 1e-12);
/// ```
#[must_use]
pub fn cosine(a: &RatingVector, b: &RatingVector, center: f64) -> Option<f64> {
    deviation_cosine(a.common(b).map(|(_, x, y)| (x - center, y - center)))
}

/// Cosine where each vector's length runs over all its own rated fields,
/// while the dot product runs over co-rated fields only.
#[must_use]
pub fn coj(a: &RatingVector, b: &RatingVector, center: f64) -> Option<f64> {
    let (mut vx, mut vy, mut vxy) = (0.0, 0.0, 0.0);
    for (_, x, y) in a.union(b) {
        let dx = x.map(|x| x - center);
        let dy = y.map(|y| y - center);
        if let Some(dx) = dx {
            vx += dx * dx;
        }
        if let Some(dy) = dy {
            vy += dy * dy;
        }
        if let (Some(dx), Some(dy)) = (dx, dy) {
            vxy += dx * dy;
        }
    }
    if vx == 0.0 || vy == 0.0 {
        return None;
    }
    finite(vxy / (vx * vy).sqrt())
}

/// Product of rating sums over the product of lengths, whole vectors.
#[must_use]
pub fn coco(a: &RatingVector, b: &RatingVector) -> Option<f64> {
    let (la, lb) = (a.module(), b.module());
    if la == 0.0 || lb == 0.0 {
        return None;
    }
    finite(a.sum() * b.sum() / (la * lb))
}

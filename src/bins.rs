//! Value bins and rank bins.
//!
//! Histogram-style measures (BC, BCF, MMD) count how many ratings fall on each
//! distinct rating value; rank correlation (SRC) replaces each rating value by
//! its rank. The set of distinct values is either configured once
//! (`value_bins = "1, 2, 3, 4, 5"`) or extracted from the two vectors being
//! compared.
//!
//! ```text
//! value bins: [1, 2, 3]
//! rank bins:  {3: 1, 2: 2, 1: 3}   largest value gets rank 1
//! ```

use std::borrow::Cow;

use crate::error::{Error, Result};
use crate::vector::RatingVector;

/// Sort ascending and drop duplicate values.
fn normalize(mut values: Vec<f64>) -> Vec<f64> {
    values.sort_by(f64::total_cmp);
    values.dedup();
    values
}

/// Distinct rating values rated in either vector, ascending.
///
/// # Example
///
/// ```rust
/// use simcf::{bins::extract_value_bins, RatingVector};
///
/// let a = RatingVector::from_pairs(1, [(1, 5.0), (2, 3.0)]);
/// let b = RatingVector::from_pairs(2, [(1, 3.0), (4, 1.0)]);
/// assert_eq!(extract_value_bins(&a, &b), vec![1.0, 3.0, 5.0]);
/// ```
#[must_use]
pub fn extract_value_bins(a: &RatingVector, b: &RatingVector) -> Vec<f64> {
    normalize(a.values().iter().chain(b.values()).copied().collect())
}

/// Parse a comma-separated list of numeric literals.
///
/// Whitespace around entries is ignored, empty entries are skipped and the
/// result is sorted with duplicates removed. An empty string yields no bins.
pub fn parse_value_bins(input: &str) -> Result<Vec<f64>> {
    let mut bins = Vec::new();
    for literal in input.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let value: f64 = literal.parse().map_err(|_| Error::InvalidValueBins {
            input: input.to_string(),
            literal: literal.to_string(),
        })?;
        if !value.is_finite() {
            return Err(Error::InvalidValueBins {
                input: input.to_string(),
                literal: literal.to_string(),
            });
        }
        bins.push(value);
    }
    Ok(normalize(bins))
}

/// Mapping from rating value to rank, rank 1 being the largest value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RankBins {
    /// `(value, rank)` sorted by value ascending.
    entries: Vec<(f64, u32)>,
}

impl RankBins {
    /// Rank bins for the given values (any order, duplicates collapse).
    #[must_use]
    pub fn from_values(values: &[f64]) -> Self {
        let sorted = normalize(values.to_vec());
        let n = sorted.len();
        let entries = sorted
            .into_iter()
            .enumerate()
            .map(|(i, value)| (value, (n - i) as u32))
            .collect();
        Self { entries }
    }

    /// Rank bins extracted from two vectors.
    #[must_use]
    pub fn extract(a: &RatingVector, b: &RatingVector) -> Self {
        Self::from_values(&extract_value_bins(a, b))
    }

    /// Rank of `value`, or `None` if it is not a bin.
    #[must_use]
    pub fn rank(&self, value: f64) -> Option<u32> {
        self.entries
            .binary_search_by(|(bin, _)| bin.total_cmp(&value))
            .ok()
            .map(|pos| self.entries[pos].1)
    }

    /// Number of bins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if there are no bins.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate `(value, rank)` by ascending value.
    pub fn iter(&self) -> impl Iterator<Item = (f64, u32)> + '_ {
        self.entries.iter().copied()
    }
}

/// Convert value bins into rank bins.
#[must_use]
pub fn to_rank_bins(value_bins: &[f64]) -> RankBins {
    RankBins::from_values(value_bins)
}

/// Bins configured at setup, falling back to per-pair extraction.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BinSet {
    values: Vec<f64>,
    ranks: RankBins,
}

impl BinSet {
    /// Bin set from already-parsed values.
    #[must_use]
    pub fn new(values: Vec<f64>) -> Self {
        let values = normalize(values);
        let ranks = RankBins::from_values(&values);
        Self { values, ranks }
    }

    /// Parse the configured `value_bins` string.
    pub fn parse(input: &str) -> Result<Self> {
        Ok(Self::new(parse_value_bins(input)?))
    }

    /// Configured value bins (possibly empty).
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Configured rank bins (possibly empty).
    #[must_use]
    pub fn ranks(&self) -> &RankBins {
        &self.ranks
    }

    /// Value bins to use for comparing `a` and `b`.
    #[must_use]
    pub fn value_bins_for(&self, a: &RatingVector, b: &RatingVector) -> Cow<'_, [f64]> {
        if self.values.is_empty() {
            Cow::Owned(extract_value_bins(a, b))
        } else {
            Cow::Borrowed(&self.values)
        }
    }

    /// Rank bins to use for comparing `a` and `b`.
    #[must_use]
    pub fn rank_bins_for(&self, a: &RatingVector, b: &RatingVector) -> Cow<'_, RankBins> {
        if self.ranks.is_empty() {
            Cow::Owned(RankBins::extract(a, b))
        } else {
            Cow::Borrowed(&self.ranks)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_bins_largest_first() {
        let ranks = to_rank_bins(&[1.0, 2.0, 3.0]);
        assert_eq!(ranks.rank(3.0), Some(1));
        assert_eq!(ranks.rank(2.0), Some(2));
        assert_eq!(ranks.rank(1.0), Some(3));
        assert_eq!(ranks.rank(4.0), None);
    }

    #[test]
    fn test_rank_bins_unsorted_input() {
        let ranks = to_rank_bins(&[2.5, 0.5, 1.0, 2.5]);
        assert_eq!(ranks.len(), 3);
        assert_eq!(ranks.rank(2.5), Some(1));
        assert_eq!(ranks.rank(0.5), Some(3));
    }

    #[test]
    fn test_parse_default_bins() {
        assert_eq!(
            parse_value_bins("1, 2, 3, 4, 5").unwrap(),
            vec![1.0, 2.0, 3.0, 4.0, 5.0]
        );
        assert_eq!(parse_value_bins("3,1,,2,1").unwrap(), vec![1.0, 2.0, 3.0]);
        assert!(parse_value_bins("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = parse_value_bins("1, two, 3").unwrap_err();
        match err {
            Error::InvalidValueBins { literal, .. } => assert_eq!(literal, "two"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(parse_value_bins("1, inf").is_err());
    }

    #[test]
    fn test_bin_set_falls_back_to_extraction() {
        let a = RatingVector::from_pairs(1, [(1, 4.0), (2, 2.0)]);
        let b = RatingVector::from_pairs(2, [(1, 2.0)]);

        let empty = BinSet::default();
        assert_eq!(empty.value_bins_for(&a, &b).as_ref(), &[2.0, 4.0]);
        assert_eq!(empty.rank_bins_for(&a, &b).rank(4.0), Some(1));

        let configured = BinSet::parse("1,2,3,4,5").unwrap();
        assert_eq!(configured.value_bins_for(&a, &b).len(), 5);
        assert_eq!(configured.rank_bins_for(&a, &b).rank(4.0), Some(2));
    }
}

//! Per-entity and global rating statistics.
//!
//! Computed once per setup with two linear scans of each fetcher:
//!
//! 1. per-entity mean, plus the running global sum and count;
//! 2. per-entity variance around the entity mean, plus the global variance
//!    around the global mean.
//!
//! Variances are maximum-likelihood (divide by n). Entities without ratings
//! are skipped entirely, so no mean or variance is ever a division by zero.

use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use crate::dataset::{Dataset, DatasetConfig, RatingFetcher, RowAxis};
use crate::error::Result;
use crate::vector::{EntityId, FieldId};

/// Statistics of one axis of the rating matrix.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EntityStats {
    /// Entities with at least one rating.
    pub ids: BTreeSet<EntityId>,
    /// Mean rating per entity.
    pub means: HashMap<EntityId, f64>,
    /// Variance of ratings per entity.
    pub vars: HashMap<EntityId, f64>,
    /// Mean over every rating seen on this axis.
    pub rating_mean: f64,
    /// Variance over every rating seen on this axis.
    pub rating_var: f64,
    /// Number of ratings seen.
    pub rating_count: usize,
}

impl EntityStats {
    /// True if no entity was seen.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Everything computed at setup.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Statistics {
    /// Global rating mean.
    pub rating_mean: f64,
    /// Global rating variance.
    pub rating_var: f64,
    /// Midpoint of the configured rating range.
    pub rating_median: f64,
    /// Configured rating range.
    pub range: DatasetConfig,
    /// User-axis statistics.
    pub users: EntityStats,
    /// Item-axis statistics.
    pub items: EntityStats,
}

impl Statistics {
    /// Statistics of the compared entities.
    #[must_use]
    pub fn rows(&self, axis: RowAxis) -> &EntityStats {
        match axis {
            RowAxis::Users => &self.users,
            RowAxis::Items => &self.items,
        }
    }

    /// Statistics of the fields of the compared vectors.
    #[must_use]
    pub fn fields(&self, axis: RowAxis) -> &EntityStats {
        match axis {
            RowAxis::Users => &self.items,
            RowAxis::Items => &self.users,
        }
    }

    /// Mean of a field, if it has ratings.
    #[must_use]
    pub fn field_mean(&self, axis: RowAxis, field: FieldId) -> Option<f64> {
        self.fields(axis).means.get(&field).copied()
    }

    /// Variance of a field, if it has ratings.
    #[must_use]
    pub fn field_var(&self, axis: RowAxis, field: FieldId) -> Option<f64> {
        self.fields(axis).vars.get(&field).copied()
    }
}

/// Two-pass scan of a fetcher. Does not release it.
fn scan(fetcher: &mut dyn RatingFetcher) -> Result<EntityStats> {
    let mut stats = EntityStats::default();
    let mut total = 0.0;

    while fetcher.advance()? {
        let Some(vector) = fetcher.current() else {
            continue;
        };
        if vector.is_empty() {
            continue;
        }
        let sum = vector.sum();
        total += sum;
        stats.rating_count += vector.len();
        stats.ids.insert(vector.id());
        stats.means.insert(vector.id(), sum / vector.len() as f64);
    }

    if stats.rating_count > 0 {
        stats.rating_mean = total / stats.rating_count as f64;
    }

    fetcher.restart()?;
    let mut global_ss = 0.0;
    while fetcher.advance()? {
        let Some(vector) = fetcher.current() else {
            continue;
        };
        let Some(&mean) = stats.means.get(&vector.id()) else {
            continue;
        };
        if vector.is_empty() {
            continue;
        }
        let mut ss = 0.0;
        for &value in vector.values() {
            ss += (value - mean) * (value - mean);
            global_ss += (value - stats.rating_mean) * (value - stats.rating_mean);
        }
        stats.vars.insert(vector.id(), ss / vector.len() as f64);
    }

    if stats.rating_count > 0 {
        stats.rating_var = global_ss / stats.rating_count as f64;
    }

    Ok(stats)
}

/// Scan then release, keeping the scan error if both fail.
fn scan_and_release(mut fetcher: Box<dyn RatingFetcher + '_>) -> Result<EntityStats> {
    let scanned = scan(fetcher.as_mut());
    let released = fetcher.release();
    let stats = scanned?;
    released?;
    Ok(stats)
}

/// Means and variances of every user, plus the global rating mean/variance.
pub fn compute_user_stats(dataset: &dyn Dataset) -> Result<EntityStats> {
    scan_and_release(dataset.fetch_user_ratings()?)
}

/// Means and variances of every item.
pub fn compute_item_stats(dataset: &dyn Dataset) -> Result<EntityStats> {
    scan_and_release(dataset.fetch_item_ratings()?)
}

/// Full setup-time statistics for a dataset.
///
/// # Example
///
/// ```rust
/// use simcf::dataset::{DatasetConfig, MemoryDataset};
/// use simcf::stats::aggregate;
///
/// let data = MemoryDataset::from_triples(
///     DatasetConfig::new(1.0, 5.0),
///     [(1, 1, 5.0), (1, 2, 3.0), (2, 1, 1.0)],
/// );
/// let stats = aggregate(&data).unwrap();
/// assert!((stats.rating_mean - 3.0).abs() < 1e-12);
/// assert!((stats.users.means[&1] - 4.0).abs() < 1e-12);
/// assert!((stats.items.means[&1] - 3.0).abs() < 1e-12);
/// assert_eq!(stats.rating_median, 3.0);
/// ```
pub fn aggregate(dataset: &dyn Dataset) -> Result<Statistics> {
    let range = dataset.config();
    range.validate()?;

    let users = compute_user_stats(dataset)?;
    let items = compute_item_stats(dataset)?;
    debug!(
        users = users.ids.len(),
        items = items.ids.len(),
        ratings = users.rating_count,
        rating_mean = users.rating_mean,
        rating_var = users.rating_var,
        "aggregated rating statistics"
    );

    Ok(Statistics {
        rating_mean: users.rating_mean,
        rating_var: users.rating_var,
        rating_median: range.rating_median(),
        range,
        users,
        items,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{MemoryDataset, MemoryFetcher};
    use crate::error::Error;
    use crate::vector::RatingVector;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    fn data() -> MemoryDataset {
        MemoryDataset::from_triples(
            DatasetConfig::new(1.0, 5.0),
            [
                (1, 1, 5.0),
                (1, 2, 3.0),
                (1, 3, 4.0),
                (2, 1, 4.0),
                (2, 2, 2.0),
                (2, 3, 5.0),
            ],
        )
    }

    #[test]
    fn test_user_means_and_vars() {
        let stats = compute_user_stats(&data()).unwrap();
        assert_eq!(stats.ids.iter().copied().collect::<Vec<_>>(), vec![1, 2]);
        assert!((stats.means[&1] - 4.0).abs() < 1e-12);
        assert!((stats.vars[&1] - 2.0 / 3.0).abs() < 1e-12);
        assert!((stats.means[&2] - 11.0 / 3.0).abs() < 1e-12);
        assert_eq!(stats.rating_count, 6);
        assert!((stats.rating_mean - 23.0 / 6.0).abs() < 1e-12);

        let m = 23.0 / 6.0;
        let expected_var = [5.0, 3.0, 4.0, 4.0, 2.0, 5.0]
            .iter()
            .map(|v: &f64| (v - m) * (v - m))
            .sum::<f64>()
            / 6.0;
        assert!((stats.rating_var - expected_var).abs() < 1e-12);
    }

    #[test]
    fn test_item_stats() {
        let stats = compute_item_stats(&data()).unwrap();
        assert!((stats.means[&1] - 4.5).abs() < 1e-12);
        assert!((stats.vars[&1] - 0.25).abs() < 1e-12);
        assert!((stats.vars[&3] - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_empty_dataset() {
        let data = MemoryDataset::new(DatasetConfig::default());
        let stats = aggregate(&data).unwrap();
        assert!(stats.users.is_empty());
        assert_eq!(stats.rating_mean, 0.0);
        assert_eq!(stats.rating_var, 0.0);
    }

    #[test]
    fn test_skips_empty_vectors() {
        let mut fetcher = MemoryFetcher::new(vec![
            Arc::new(RatingVector::new(7)),
            Arc::new(RatingVector::from_pairs(8, [(1, 2.0)])),
        ]);
        let stats = scan(&mut fetcher).unwrap();
        assert!(!stats.ids.contains(&7));
        assert!(!stats.means.contains_key(&7));
        assert_eq!(stats.vars[&8], 0.0);
    }

    #[test]
    fn test_axis_views() {
        let stats = aggregate(&data()).unwrap();
        assert_eq!(stats.field_mean(RowAxis::Users, 1), Some(4.5));
        assert_eq!(stats.field_mean(RowAxis::Items, 1), Some(4.0));
        assert_eq!(stats.rows(RowAxis::Users).ids.len(), 2);
        assert_eq!(stats.field_var(RowAxis::Users, 9), None);
    }

    /// Wraps a [`MemoryFetcher`], records `release`, and fails on demand.
    struct TrackedFetcher<'a> {
        inner: MemoryFetcher,
        fail_advance: bool,
        fail_release: bool,
        released: &'a AtomicBool,
    }

    impl RatingFetcher for TrackedFetcher<'_> {
        fn advance(&mut self) -> Result<bool> {
            if self.fail_advance {
                return Err(Error::fetch("read failed"));
            }
            self.inner.advance()
        }
        fn current(&self) -> Option<&RatingVector> {
            self.inner.current()
        }
        fn restart(&mut self) -> Result<()> {
            self.inner.restart()
        }
        fn release(&mut self) -> Result<()> {
            self.released.store(true, Ordering::SeqCst);
            self.inner.release()?;
            if self.fail_release {
                return Err(Error::fetch("close failed"));
            }
            Ok(())
        }
    }

    fn tracked(
        released: &AtomicBool,
        fail_advance: bool,
        fail_release: bool,
    ) -> TrackedFetcher<'_> {
        let vector = RatingVector::from_pairs(1, [(1, 4.0)]);
        TrackedFetcher {
            inner: MemoryFetcher::new(vec![Arc::new(vector)]),
            fail_advance,
            fail_release,
            released,
        }
    }

    #[test]
    fn test_release_after_scan_error_keeps_scan_error() {
        let released = AtomicBool::new(false);
        let err = scan_and_release(Box::new(tracked(&released, true, true))).unwrap_err();
        assert!(released.load(Ordering::SeqCst));
        assert!(err.to_string().contains("read failed"), "{err}");
    }

    #[test]
    fn test_release_error_surfaces_after_clean_scan() {
        let released = AtomicBool::new(false);
        let err = scan_and_release(Box::new(tracked(&released, false, true))).unwrap_err();
        assert!(released.load(Ordering::SeqCst));
        assert!(err.to_string().contains("close failed"), "{err}");

        let released = AtomicBool::new(false);
        let stats = scan_and_release(Box::new(tracked(&released, false, false))).unwrap();
        assert!(released.load(Ordering::SeqCst));
        assert_eq!(stats.means[&1], 4.0);
    }

    #[test]
    fn test_rejects_inverted_range() {
        let data = MemoryDataset::new(DatasetConfig::new(5.0, 1.0));
        assert!(aggregate(&data).is_err());
    }
}

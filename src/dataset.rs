//! Dataset collaborator interfaces and an in-memory implementation.
//!
//! The engine never owns rating storage. It consumes:
//!
//! - a [`Dataset`], scanned during setup through restartable [`RatingFetcher`]s;
//! - a [`ColumnAccessor`], queried during similarity computation for the
//!   transposed view of the rating matrix.
//!
//! ```text
//!             item 1  item 2  item 3
//!   user A  [   5       3       4   ]   <- row vector when rows are users
//!   user B  [   4       2       5   ]
//!               ^
//!               column vector of item 1 = {A: 5, B: 4}
//! ```
//!
//! [`MemoryDataset`] keeps both views in memory and implements everything.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::vector::{EntityId, RatingVector};

/// Rating range of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Smallest rating value.
    pub min_rating: f64,
    /// Largest rating value.
    pub max_rating: f64,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            min_rating: 1.0,
            max_rating: 5.0,
        }
    }
}

impl DatasetConfig {
    /// Rating range `[min_rating, max_rating]`.
    #[must_use]
    pub fn new(min_rating: f64, max_rating: f64) -> Self {
        Self {
            min_rating,
            max_rating,
        }
    }

    /// Midpoint of the rating range.
    #[must_use]
    pub fn rating_median(&self) -> f64 {
        (self.min_rating + self.max_rating) / 2.0
    }

    /// Reject non-finite or inverted ranges.
    pub fn validate(&self) -> Result<()> {
        if self.min_rating.is_finite()
            && self.max_rating.is_finite()
            && self.min_rating <= self.max_rating
        {
            Ok(())
        } else {
            Err(Error::InvalidRatingRange {
                min: self.min_rating,
                max: self.max_rating,
            })
        }
    }
}

/// Restartable cursor over per-entity rating vectors.
///
/// The cursor starts before the first element. Callers must call
/// [`release`](Self::release) once they are done, whether or not the scan
/// succeeded.
pub trait RatingFetcher {
    /// Move to the next vector. Returns `false` past the end.
    fn advance(&mut self) -> Result<bool>;

    /// Vector under the cursor. `None` before the first `advance`, past the
    /// end, or when the source has a hole at this position.
    fn current(&self) -> Option<&RatingVector>;

    /// Rewind to before the first element.
    fn restart(&mut self) -> Result<()>;

    /// Release underlying resources.
    fn release(&mut self) -> Result<()>;
}

/// Source of rating vectors for both axes of the rating matrix.
pub trait Dataset: Send + Sync {
    /// Rating range.
    fn config(&self) -> DatasetConfig;

    /// One vector per user; fields are item ids.
    fn fetch_user_ratings(&self) -> Result<Box<dyn RatingFetcher + '_>>;

    /// One vector per item; fields are user ids.
    fn fetch_item_ratings(&self) -> Result<Box<dyn RatingFetcher + '_>>;

    /// Ratings given by one user.
    fn user_rating(&self, user: EntityId) -> Option<Arc<RatingVector>>;

    /// Ratings received by one item.
    fn item_rating(&self, item: EntityId) -> Option<Arc<RatingVector>>;
}

/// Transposed view of the rating matrix.
///
/// Returns `None` for unknown ids rather than failing.
pub trait ColumnAccessor: Send + Sync {
    /// Column vector for a field id.
    fn column_rating(&self, id: EntityId) -> Option<Arc<RatingVector>>;
}

/// Which entities the compared rating vectors describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowAxis {
    /// Rows are users, fields (and columns) are items.
    #[default]
    Users,
    /// Rows are items, fields (and columns) are users.
    Items,
}

/// [`ColumnAccessor`] over a [`Dataset`] along a [`RowAxis`].
pub struct DatasetColumns {
    dataset: Arc<dyn Dataset>,
    axis: RowAxis,
}

impl DatasetColumns {
    /// Columns of `dataset` when rows run along `axis`.
    #[must_use]
    pub fn new(dataset: Arc<dyn Dataset>, axis: RowAxis) -> Self {
        Self { dataset, axis }
    }
}

impl std::fmt::Debug for DatasetColumns {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatasetColumns")
            .field("axis", &self.axis)
            .finish_non_exhaustive()
    }
}

impl ColumnAccessor for DatasetColumns {
    fn column_rating(&self, id: EntityId) -> Option<Arc<RatingVector>> {
        match self.axis {
            RowAxis::Users => self.dataset.item_rating(id),
            RowAxis::Items => self.dataset.user_rating(id),
        }
    }
}

/// Column accessor with no columns.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoColumns;

impl ColumnAccessor for NoColumns {
    fn column_rating(&self, _id: EntityId) -> Option<Arc<RatingVector>> {
        None
    }
}

/// Rating matrix held in memory, indexed both by user and by item.
///
/// # Example
///
/// ```rust
/// use simcf::dataset::{Dataset, DatasetConfig, MemoryDataset};
///
/// let data = MemoryDataset::from_triples(
///     DatasetConfig::new(1.0, 5.0),
///     [(1, 10, 5.0), (1, 11, 3.0), (2, 10, 4.0)],
/// );
/// assert_eq!(data.user_rating(1).unwrap().len(), 2);
/// assert_eq!(data.item_rating(10).unwrap().get(2), Some(4.0));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryDataset {
    config: DatasetConfig,
    users: BTreeMap<EntityId, Arc<RatingVector>>,
    items: BTreeMap<EntityId, Arc<RatingVector>>,
}

impl MemoryDataset {
    /// Empty dataset.
    #[must_use]
    pub fn new(config: DatasetConfig) -> Self {
        Self {
            config,
            users: BTreeMap::new(),
            items: BTreeMap::new(),
        }
    }

    /// Dataset from `(user, item, rating)` triples. Later triples overwrite
    /// earlier ones for the same cell; non-finite ratings are skipped.
    pub fn from_triples<I>(config: DatasetConfig, triples: I) -> Self
    where
        I: IntoIterator<Item = (EntityId, EntityId, f64)>,
    {
        let mut by_user: BTreeMap<EntityId, Vec<(EntityId, f64)>> = BTreeMap::new();
        let mut by_item: BTreeMap<EntityId, Vec<(EntityId, f64)>> = BTreeMap::new();
        for (user, item, rating) in triples {
            if !rating.is_finite() {
                continue;
            }
            by_user.entry(user).or_default().push((item, rating));
            by_item.entry(item).or_default().push((user, rating));
        }

        let users = by_user
            .into_iter()
            .map(|(id, pairs)| (id, Arc::new(RatingVector::from_pairs(id, pairs))))
            .collect();
        let items = by_item
            .into_iter()
            .map(|(id, pairs)| (id, Arc::new(RatingVector::from_pairs(id, pairs))))
            .collect();

        Self {
            config,
            users,
            items,
        }
    }

    /// Set one rating, updating both views.
    pub fn insert(&mut self, user: EntityId, item: EntityId, rating: f64) {
        if !rating.is_finite() {
            return;
        }
        Arc::make_mut(
            self.users
                .entry(user)
                .or_insert_with(|| Arc::new(RatingVector::new(user))),
        )
        .insert(item, rating);
        Arc::make_mut(
            self.items
                .entry(item)
                .or_insert_with(|| Arc::new(RatingVector::new(item))),
        )
        .insert(user, rating);
    }

    /// Known user ids, ascending.
    pub fn user_ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.users.keys().copied()
    }

    /// Known item ids, ascending.
    pub fn item_ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.items.keys().copied()
    }

    /// Total number of ratings.
    #[must_use]
    pub fn rating_count(&self) -> usize {
        self.users.values().map(|v| v.len()).sum()
    }
}

impl Dataset for MemoryDataset {
    fn config(&self) -> DatasetConfig {
        self.config
    }

    fn fetch_user_ratings(&self) -> Result<Box<dyn RatingFetcher + '_>> {
        Ok(Box::new(MemoryFetcher::new(self.users.values().cloned().collect())))
    }

    fn fetch_item_ratings(&self) -> Result<Box<dyn RatingFetcher + '_>> {
        Ok(Box::new(MemoryFetcher::new(self.items.values().cloned().collect())))
    }

    fn user_rating(&self, user: EntityId) -> Option<Arc<RatingVector>> {
        self.users.get(&user).cloned()
    }

    fn item_rating(&self, item: EntityId) -> Option<Arc<RatingVector>> {
        self.items.get(&item).cloned()
    }
}

/// Fetcher over a snapshot of vectors.
#[derive(Debug, Clone)]
pub struct MemoryFetcher {
    vectors: Vec<Arc<RatingVector>>,
    cursor: Option<usize>,
    released: bool,
}

impl MemoryFetcher {
    /// Fetcher over `vectors`, positioned before the first one.
    #[must_use]
    pub fn new(vectors: Vec<Arc<RatingVector>>) -> Self {
        Self {
            vectors,
            cursor: None,
            released: false,
        }
    }

    /// True once [`release`](RatingFetcher::release) was called.
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl RatingFetcher for MemoryFetcher {
    fn advance(&mut self) -> Result<bool> {
        if self.released {
            return Err(Error::Fetch("fetcher already released".to_string()));
        }
        let next = self.cursor.map_or(0, |c| c + 1);
        self.cursor = Some(next.min(self.vectors.len()));
        Ok(next < self.vectors.len())
    }

    fn current(&self) -> Option<&RatingVector> {
        self.cursor
            .and_then(|c| self.vectors.get(c))
            .map(Arc::as_ref)
    }

    fn restart(&mut self) -> Result<()> {
        if self.released {
            return Err(Error::Fetch("fetcher already released".to_string()));
        }
        self.cursor = None;
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        self.released = true;
        self.vectors.clear();
        self.cursor = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MemoryDataset {
        MemoryDataset::from_triples(
            DatasetConfig::default(),
            [(1, 1, 5.0), (1, 2, 3.0), (2, 1, 4.0), (2, 3, 1.0), (2, 3, 2.0)],
        )
    }

    #[test]
    fn test_views_agree() {
        let data = sample();
        assert_eq!(data.user_ids().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(data.item_ids().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(data.user_rating(2).unwrap().get(3), Some(2.0));
        assert_eq!(data.item_rating(3).unwrap().get(2), Some(2.0));
        assert_eq!(data.rating_count(), 4);
        assert!(data.user_rating(9).is_none());
    }

    #[test]
    fn test_insert_updates_both_views() {
        let mut data = sample();
        data.insert(3, 2, 4.0);
        data.insert(3, 4, f64::NAN);
        assert_eq!(data.user_rating(3).unwrap().get(2), Some(4.0));
        assert_eq!(data.item_rating(2).unwrap().get(3), Some(4.0));
        assert!(data.item_rating(4).is_none());
    }

    #[test]
    fn test_fetcher_restart_and_release() {
        let data = sample();
        let mut users = data.fetch_user_ratings().unwrap();
        assert!(users.current().is_none());
        let mut seen = Vec::new();
        while users.advance().unwrap() {
            seen.push(users.current().unwrap().id());
        }
        assert_eq!(seen, vec![1, 2]);
        assert!(users.current().is_none());
        assert!(!users.advance().unwrap());

        users.restart().unwrap();
        assert!(users.advance().unwrap());
        assert_eq!(users.current().unwrap().id(), 1);

        users.release().unwrap();
        assert!(users.advance().is_err());
    }

    #[test]
    fn test_memory_fetcher_tracks_release() {
        let vector = RatingVector::from_pairs(1, [(1, 2.0)]);
        let mut fetcher = MemoryFetcher::new(vec![Arc::new(vector)]);
        assert!(!fetcher.is_released());
        assert!(fetcher.advance().unwrap());
        fetcher.release().unwrap();
        assert!(fetcher.is_released());
        assert!(fetcher.restart().is_err());
    }

    #[test]
    fn test_columns_follow_axis() {
        let data: Arc<dyn Dataset> = Arc::new(sample());
        let by_user = DatasetColumns::new(Arc::clone(&data), RowAxis::Users);
        let by_item = DatasetColumns::new(data, RowAxis::Items);
        // Rows are users: column 1 is item 1.
        assert_eq!(by_user.column_rating(1).unwrap().field_ids(), &[1, 2]);
        // Rows are items: column 1 is user 1.
        assert_eq!(by_item.column_rating(1).unwrap().field_ids(), &[1, 2]);
        assert_eq!(by_item.column_rating(2).unwrap().get(3), Some(2.0));
        assert!(by_user.column_rating(42).is_none());
        assert!(NoColumns.column_rating(1).is_none());
    }

    #[test]
    fn test_config_validation() {
        assert!(DatasetConfig::new(1.0, 5.0).validate().is_ok());
        assert!(DatasetConfig::new(5.0, 1.0).validate().is_err());
        assert!(DatasetConfig::new(f64::NAN, 1.0).validate().is_err());
        assert!((DatasetConfig::new(1.0, 5.0).rating_median() - 3.0).abs() < 1e-12);
    }
}

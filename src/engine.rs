//! The similarity engine: session lifecycle, measure dispatch and caching.
//!
//! ```text
//!            setup(dataset)                     unsetup()
//!   idle ─────────────────────▶ session ─────────────────────▶ idle
//!                               │ stats, bins, columns,
//!                               │ similarity + column caches
//!                               ▼
//!               similarity(v1, v2, ...) ──▶ cache? ──▶ measures::compute
//! ```
//!
//! Setup and unsetup hold the session lock exclusively; queries share it.
//! Everything a query mutates lives in single-flight caches, so queries run
//! in parallel against the same session.

use std::fmt;
use std::sync::Arc;

use parking_lot::{MappedRwLockReadGuard, RwLock, RwLockReadGuard};
use tracing::{debug, info, warn};

use crate::bins::BinSet;
use crate::cache::PairCache;
use crate::config::SimilarityConfig;
use crate::dataset::{ColumnAccessor, Dataset, DatasetColumns};
use crate::error::Result;
use crate::measure::{self, Measure};
use crate::measures::{self, ColumnCaches, MeasureContext, Param};
use crate::profile::Profile;
use crate::stats::{aggregate, Statistics};
use crate::vector::RatingVector;
use crate::UNUSED;

/// State built by setup and dropped by unsetup.
struct Session {
    stats: Statistics,
    bins: BinSet,
    columns: Box<dyn ColumnAccessor>,
    similarities: PairCache<Option<f64>>,
    column_caches: ColumnCaches,
}

impl Session {
    fn context<'a>(&'a self, config: &'a SimilarityConfig) -> MeasureContext<'a> {
        MeasureContext {
            config,
            stats: &self.stats,
            bins: &self.bins,
            columns: self.columns.as_ref(),
            caches: config.support_cache.then_some(&self.column_caches),
        }
    }
}

/// Computes similarities between rating vectors with one configured measure.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use simcf::dataset::{DatasetConfig, MemoryDataset};
/// use simcf::{is_used, RatingVector, SimilarityConfig, SimilarityEngine};
///
/// let data = MemoryDataset::from_triples(
///     DatasetConfig::new(1.0, 5.0),
///     [(1, 1, 5.0), (1, 2, 3.0), (1, 3, 4.0), (2, 1, 4.0), (2, 2, 2.0), (2, 3, 5.0)],
/// );
/// let engine = SimilarityEngine::new(SimilarityConfig::with_measure("pearson"));
/// engine.setup(Arc::new(data)).unwrap();
///
/// let a = RatingVector::from_pairs(1, [(1, 5.0), (2, 3.0), (3, 4.0)]);
/// let b = RatingVector::from_pairs(2, [(1, 4.0), (2, 2.0), (3, 5.0)]);
/// let s = engine.similarity(&a, &b, None, None, &[]);
/// assert!(is_used(s));
/// assert!((s - 0.6547).abs() < 1e-4);
///
/// engine.unsetup();
/// assert!(!is_used(engine.similarity(&a, &b, None, None, &[])));
/// ```
pub struct SimilarityEngine {
    config: SimilarityConfig,
    measure: Option<Measure>,
    session: RwLock<Option<Session>>,
}

impl SimilarityEngine {
    /// Engine for `config`. The measure cannot change afterwards.
    #[must_use]
    pub fn new(config: SimilarityConfig) -> Self {
        let measure = config.parsed_measure();
        if measure.is_none() {
            warn!(
                measure = %config.measure,
                "unknown similarity measure; every query will be undefined"
            );
        }
        Self {
            config,
            measure,
            session: RwLock::new(None),
        }
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &SimilarityConfig {
        &self.config
    }

    /// Active measure, `None` if the configured name is unknown.
    #[must_use]
    pub fn measure(&self) -> Option<Measure> {
        self.measure
    }

    /// Every selectable measure name, sorted.
    #[must_use]
    pub fn supported_measures(&self) -> Vec<&'static str> {
        measure::supported_measures()
    }

    /// Compute statistics of `dataset` and open a session whose columns are
    /// read from the same dataset along the configured row axis.
    ///
    /// Replaces any previous session. On error the previous session is kept.
    pub fn setup(&self, dataset: Arc<dyn Dataset>) -> Result<()> {
        let columns = DatasetColumns::new(Arc::clone(&dataset), self.config.row_axis);
        self.setup_with_columns(dataset.as_ref(), Box::new(columns))
    }

    /// Like [`setup`](Self::setup), with an explicit column accessor.
    pub fn setup_with_columns(
        &self,
        dataset: &dyn Dataset,
        columns: Box<dyn ColumnAccessor>,
    ) -> Result<()> {
        let bins = BinSet::parse(&self.config.value_bins)?;
        debug!(
            bins = ?bins.values(),
            reads_bins = self.measure.is_some_and(Measure::requires_value_bins),
            reads_columns = self.measure.is_some_and(Measure::requires_columns),
            "value bins configured"
        );
        let stats = aggregate(dataset)?;

        let session = Session {
            stats,
            bins,
            columns,
            similarities: PairCache::new("similarity"),
            column_caches: ColumnCaches::new(),
        };
        info!(
            measure = %self.config.measure,
            users = session.stats.users.ids.len(),
            items = session.stats.items.ids.len(),
            ratings = session.stats.users.rating_count,
            cache = self.config.support_cache,
            "similarity engine set up"
        );
        *self.session.write() = Some(session);
        Ok(())
    }

    /// Drop the session: statistics, bins, columns and caches.
    pub fn unsetup(&self) {
        if let Some(session) = self.session.write().take() {
            info!(
                measure = %self.config.measure,
                cached = session.similarities.len(),
                "similarity engine unset"
            );
        }
    }

    /// True between setup and unsetup.
    #[must_use]
    pub fn is_setup(&self) -> bool {
        self.session.read().is_some()
    }

    /// Statistics of the current session.
    ///
    /// The returned guard holds the session lock shared; setup and unsetup
    /// wait until it is dropped.
    #[must_use]
    pub fn stats(&self) -> Option<MappedRwLockReadGuard<'_, Statistics>> {
        RwLockReadGuard::try_map(self.session.read(), |s| s.as_ref().map(|s| &s.stats)).ok()
    }

    /// Number of memoized similarities in the current session.
    #[must_use]
    pub fn cache_len(&self) -> usize {
        self.session
            .read()
            .as_ref()
            .map_or(0, |s| s.similarities.len())
    }

    /// Number of memoized column statistics in the current session.
    #[must_use]
    pub fn column_cache_len(&self) -> usize {
        self.session
            .read()
            .as_ref()
            .map_or(0, |s| s.column_caches.len())
    }

    /// Number of similarity computations the cache has run this session.
    #[must_use]
    pub fn cache_computations(&self) -> u64 {
        self.session
            .read()
            .as_ref()
            .map_or(0, |s| s.similarities.computations())
    }

    /// Similarity of two entities, or [`UNUSED`] when undefined.
    ///
    /// Profiles are accepted for interface compatibility; no current measure
    /// reads them. `params` carries call-site arguments (the fixed column id
    /// for `pc`).
    #[must_use]
    pub fn similarity(
        &self,
        v1: &RatingVector,
        v2: &RatingVector,
        p1: Option<&Profile>,
        p2: Option<&Profile>,
        params: &[Param],
    ) -> f64 {
        self.try_similarity(v1, v2, p1, p2, params)
            .unwrap_or(UNUSED)
    }

    /// Similarity of two entities, `None` when undefined.
    #[must_use]
    pub fn try_similarity(
        &self,
        v1: &RatingVector,
        v2: &RatingVector,
        _p1: Option<&Profile>,
        _p2: Option<&Profile>,
        params: &[Param],
    ) -> Option<f64> {
        let measure = self.measure?;
        let guard = self.session.read();
        let Some(session) = guard.as_ref() else {
            warn!(measure = %measure, "similarity queried before setup");
            return None;
        };

        if measure == Measure::Pc && params.first().and_then(Param::as_column_id).is_none() {
            warn!(measure = %measure, "missing or non-numeric column id parameter");
            return None;
        }

        let ctx = session.context(&self.config);
        if self.config.support_cache && measure.is_cacheable() {
            session
                .similarities
                .get_or_compute((v1.id(), v2.id()), || {
                    measures::compute(measure, &ctx, v1, v2, params)
                })
        } else {
            measures::compute(measure, &ctx, v1, v2, params)
        }
    }
}

impl fmt::Debug for SimilarityEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimilarityEngine")
            .field("config", &self.config)
            .field("setup", &self.is_setup())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{DatasetConfig, MemoryDataset, NoColumns, RatingFetcher};
    use crate::error::Error;
    use crate::is_used;

    fn data() -> Arc<MemoryDataset> {
        Arc::new(MemoryDataset::from_triples(
            DatasetConfig::new(1.0, 5.0),
            [
                (1, 1, 5.0),
                (1, 2, 3.0),
                (1, 3, 4.0),
                (2, 1, 4.0),
                (2, 2, 2.0),
                (2, 3, 5.0),
                (3, 1, 1.0),
                (3, 4, 2.0),
            ],
        ))
    }

    fn ab() -> (RatingVector, RatingVector) {
        (
            RatingVector::from_pairs(1, [(1, 5.0), (2, 3.0), (3, 4.0)]),
            RatingVector::from_pairs(2, [(1, 4.0), (2, 2.0), (3, 5.0)]),
        )
    }

    #[test]
    fn test_before_setup_is_unused() {
        let engine = SimilarityEngine::new(SimilarityConfig::default());
        let (a, b) = ab();
        assert!(!engine.is_setup());
        assert_eq!(engine.similarity(&a, &b, None, None, &[]), UNUSED);
        assert!(engine.stats().is_none());
    }

    #[test]
    fn test_unknown_measure_is_unused() {
        let engine = SimilarityEngine::new(SimilarityConfig::with_measure("nope"));
        engine.setup(data()).unwrap();
        let (a, b) = ab();
        assert_eq!(engine.measure(), None);
        assert!(!is_used(engine.similarity(&a, &b, None, None, &[])));
    }

    #[test]
    fn test_setup_and_unsetup() {
        let engine = SimilarityEngine::new(SimilarityConfig::with_measure("cosine"));
        engine.setup(data()).unwrap();
        assert!(engine.is_setup());
        let first = engine.stats().map(|s| s.clone()).unwrap();
        assert_eq!(first.users.ids.len(), 3);

        engine.unsetup();
        assert!(!engine.is_setup());
        assert_eq!(engine.cache_len(), 0);

        engine.setup(data()).unwrap();
        let second = engine.stats().map(|s| s.clone()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_cached_query_runs_once() {
        let engine =
            SimilarityEngine::new(SimilarityConfig::with_measure("pearson").support_cache(true));
        engine.setup(data()).unwrap();
        let (a, b) = ab();
        let first = engine.similarity(&a, &b, None, None, &[]);
        let second = engine.similarity(&a, &b, None, None, &[]);
        assert_eq!(first, second);
        assert_eq!(engine.cache_computations(), 1);
        assert_eq!(engine.cache_len(), 1);

        // Reverse order is its own slot.
        let _ = engine.similarity(&b, &a, None, None, &[]);
        assert_eq!(engine.cache_len(), 2);
    }

    #[test]
    fn test_uncached_by_default() {
        let engine = SimilarityEngine::new(SimilarityConfig::with_measure("pearson"));
        engine.setup(data()).unwrap();
        let (a, b) = ab();
        let _ = engine.similarity(&a, &b, None, None, &[]);
        assert_eq!(engine.cache_len(), 0);
    }

    #[test]
    fn test_pc_bypasses_similarity_cache() {
        let engine =
            SimilarityEngine::new(SimilarityConfig::with_measure("pc").support_cache(true));
        engine.setup(data()).unwrap();
        let (a, b) = ab();
        assert_eq!(engine.try_similarity(&a, &b, None, None, &[]), None);
        assert_eq!(engine.try_similarity(&a, &b, None, None, &[Param::from("x")]), None);

        let _ = engine.try_similarity(&a, &b, None, None, &[Param::from(1u32)]);
        assert_eq!(engine.cache_len(), 0);
        assert!(engine.column_cache_len() > 0);
    }

    struct FailingDataset;

    struct FailingFetcher;

    impl RatingFetcher for FailingFetcher {
        fn advance(&mut self) -> Result<bool> {
            Err(Error::fetch("disk gone"))
        }
        fn current(&self) -> Option<&RatingVector> {
            None
        }
        fn restart(&mut self) -> Result<()> {
            Ok(())
        }
        fn release(&mut self) -> Result<()> {
            Ok(())
        }
    }

    impl Dataset for FailingDataset {
        fn config(&self) -> DatasetConfig {
            DatasetConfig::default()
        }
        fn fetch_user_ratings(&self) -> Result<Box<dyn RatingFetcher + '_>> {
            Ok(Box::new(FailingFetcher))
        }
        fn fetch_item_ratings(&self) -> Result<Box<dyn RatingFetcher + '_>> {
            Ok(Box::new(FailingFetcher))
        }
        fn user_rating(&self, _user: u32) -> Option<Arc<RatingVector>> {
            None
        }
        fn item_rating(&self, _item: u32) -> Option<Arc<RatingVector>> {
            None
        }
    }

    #[test]
    fn test_failed_setup_keeps_previous_session() {
        let engine = SimilarityEngine::new(SimilarityConfig::default());
        engine.setup(data()).unwrap();
        let err = engine.setup_with_columns(&FailingDataset, Box::new(NoColumns));
        assert!(matches!(err, Err(Error::Fetch(_))));
        assert!(engine.is_setup());
        assert_eq!(engine.stats().unwrap().users.ids.len(), 3);
    }

    #[test]
    fn test_bad_value_bins_fail_setup() {
        let engine =
            SimilarityEngine::new(SimilarityConfig::with_measure("bc").value_bins("1, two"));
        assert!(matches!(engine.setup(data()), Err(Error::InvalidValueBins { .. })));
        assert!(!engine.is_setup());
    }
}

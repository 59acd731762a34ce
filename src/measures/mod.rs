//! Similarity formulas and their dispatch.
//!
//! Every formula takes two rating vectors and returns `Option<f64>`, `None`
//! meaning "not computable for this pair" (no co-rated fields, zero variance,
//! a zero denominator). Formulas never return NaN or infinity: [`compute`]
//! maps any non-finite result to `None`.
//!
//! | Family | Measures |
//! |--------|----------|
//! | Correlation | `pearson`, `cpc`, `wpc`, `spc`, `cod`, `pc` |
//! | Cosine | `cosine`, `coj`, `coco` |
//! | Overlap | `jaccard`, `jaccard2`, `amer`, `amer2`, `qti`, `qtij`, `mmns` |
//! | Distance / divergence | `msd`, `bc`, `bcf`, `mmd`, `src`, `triangle`, `ta` |
//! | Statistical shape | `urp`, `pss`, `nhsm`, `pip`, `feng`, `mu`, `smtp` |
//! | Composite | `cosinej`, `pearsonj`, `msdj`, `tjm`, `bcfj`, `amer2j`, `taj`, `cjacmd` |
//!
//! The pure formulas are public in the family modules and take exactly the
//! inputs they need. [`MeasureContext`] supplies the rest (statistics, bins,
//! column access, column caches) when dispatching by [`Measure`].
//!
//! # References
//!
//! - Ahn (2008). "A new similarity measure for collaborative filtering to
//!   alleviate the new user cold-starting problem" (PIP)
//! - Choi & Suh (2013). "A new similarity function for selecting neighbors
//!   for each target item in collaborative filtering" (PC)
//! - Patra et al. (2015). "A new similarity measure using Bhattacharyya
//!   coefficient for collaborative filtering in sparse data" (BC, BCF)
//! - Liu et al. (2014). "A new user similarity model to improve the accuracy
//!   of collaborative filtering" (PSS, NHSM, URP)
//! - Lin, Jiang & Lee (2014). "A similarity measure for text classification
//!   and clustering" (SMTP)
//! - Sun et al. (2017). "Integrating triangle and Jaccard similarities for
//!   recommendation" (Triangle, TJM)

pub mod correlation;
pub mod cosine;
pub mod divergence;
pub mod overlap;
pub mod shape;

use crate::bins::BinSet;
use crate::cache::{KeyCache, PairCache};
use crate::config::SimilarityConfig;
use crate::dataset::ColumnAccessor;
use crate::measure::Measure;
use crate::stats::Statistics;
use crate::vector::{EntityId, FieldId, RatingVector};

/// Extra call-site argument of a similarity query.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    /// Integer argument.
    Int(i64),
    /// Real argument.
    Real(f64),
    /// Free-form argument.
    Text(String),
}

impl Param {
    /// Interpret the argument as a column id.
    ///
    /// Reals are truncated toward zero. Text and out-of-range numbers yield
    /// `None`.
    #[must_use]
    pub fn as_column_id(&self) -> Option<FieldId> {
        match *self {
            Param::Int(v) => FieldId::try_from(v).ok(),
            Param::Real(v) if v.is_finite() => {
                let t = v.trunc();
                if t >= 0.0 && t <= f64::from(FieldId::MAX) {
                    Some(t as FieldId)
                } else {
                    None
                }
            }
            Param::Real(_) | Param::Text(_) => None,
        }
    }
}

impl From<i64> for Param {
    fn from(v: i64) -> Self {
        Param::Int(v)
    }
}

impl From<u32> for Param {
    fn from(v: u32) -> Self {
        Param::Int(i64::from(v))
    }
}

impl From<f64> for Param {
    fn from(v: f64) -> Self {
        Param::Real(v)
    }
}

impl From<&str> for Param {
    fn from(v: &str) -> Self {
        Param::Text(v.to_string())
    }
}

/// Memo tables for column statistics.
#[derive(Debug)]
pub struct ColumnCaches {
    /// Bhattacharyya coefficient per `(column, column)` pair.
    pub bc: PairCache<Option<f64>>,
    /// Pearson correlation per `(fixed column, column)` pair.
    pub corr: PairCache<Option<f64>>,
    /// Column length per column.
    pub module: KeyCache<Option<f64>>,
}

impl ColumnCaches {
    /// Empty tables.
    #[must_use]
    pub fn new() -> Self {
        Self {
            bc: PairCache::new("column_bc"),
            corr: PairCache::new("column_corr"),
            module: KeyCache::new("column_module"),
        }
    }

    /// Total number of memoized column statistics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bc.len() + self.corr.len() + self.module.len()
    }

    /// True if nothing is memoized.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ColumnCaches {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything a formula may read besides the two vectors.
#[derive(Clone, Copy)]
pub struct MeasureContext<'a> {
    /// Active configuration.
    pub config: &'a SimilarityConfig,
    /// Setup-time statistics.
    pub stats: &'a Statistics,
    /// Configured bins.
    pub bins: &'a BinSet,
    /// Transposed view of the rating matrix.
    pub columns: &'a dyn ColumnAccessor,
    /// Column memo tables; `None` disables column caching.
    pub caches: Option<&'a ColumnCaches>,
}

impl std::fmt::Debug for MeasureContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeasureContext")
            .field("config", self.config)
            .field("caching", &self.caches.is_some())
            .finish_non_exhaustive()
    }
}

impl<'a> MeasureContext<'a> {
    /// Rating median of the dataset.
    #[inline]
    #[must_use]
    pub fn rating_median(&self) -> f64 {
        self.stats.rating_median
    }

    /// Reference subtracted by the cosine family.
    #[inline]
    #[must_use]
    pub fn cosine_center(&self) -> f64 {
        if self.config.cosine_normalized {
            self.rating_median()
        } else {
            0.0
        }
    }

    /// Mean of a field of the compared vectors.
    #[inline]
    #[must_use]
    pub fn field_mean(&self, field: FieldId) -> Option<f64> {
        self.stats.field_mean(self.config.row_axis, field)
    }

    /// Variance of a field, or the global variance in SMTP general mode.
    #[must_use]
    pub fn smtp_variance(&self, field: FieldId) -> Option<f64> {
        let own = self.stats.field_var(self.config.row_axis, field)?;
        if self.config.smtp_general_var {
            Some(self.stats.rating_var)
        } else {
            Some(own)
        }
    }

    /// Run `compute` through the pair cache `pick` selects, if caching is on.
    fn cached_pair<F>(
        &self,
        pick: fn(&ColumnCaches) -> &PairCache<Option<f64>>,
        key: (EntityId, EntityId),
        compute: F,
    ) -> Option<f64>
    where
        F: FnOnce() -> Option<f64>,
    {
        match self.caches {
            Some(caches) => pick(caches).get_or_compute(key, compute),
            None => compute(),
        }
    }

    /// Length of a column vector, as used by BCF.
    #[must_use]
    pub fn column_module(&self, column: &RatingVector) -> Option<f64> {
        let median_mode = self.config.bcf_median_mode;
        let median = self.rating_median();
        let compute = || divergence::column_module(column, median_mode.then_some(median));
        match self.caches {
            Some(caches) => caches.module.get_or_compute(column.id(), compute),
            None => compute(),
        }
    }

    /// Bhattacharyya coefficient of two column vectors.
    #[must_use]
    pub fn column_bc(&self, c1: &RatingVector, c2: &RatingVector) -> Option<f64> {
        self.cached_pair(|c| &c.bc, (c1.id(), c2.id()), || {
            divergence::bc(c1, c2, &self.bins.value_bins_for(c1, c2))
        })
    }

    /// Pearson correlation between a fixed column and another column.
    #[must_use]
    pub fn column_corr(&self, fixed: FieldId, field: FieldId) -> Option<f64> {
        self.cached_pair(|c| &c.corr, (fixed, field), || {
            let fixed_column = self.columns.column_rating(fixed)?;
            let column = self.columns.column_rating(field)?;
            correlation::pearson(&fixed_column, &column)
        })
    }
}

/// Keep finite values only.
#[inline]
pub(crate) fn finite(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}

/// Logistic function `1 / (1 + e^-x)`.
#[inline]
pub(crate) fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Cosine of paired deviations: `Σxy / sqrt(Σx² · Σy²)`.
///
/// `None` when either side has zero length (including no pairs at all).
pub(crate) fn deviation_cosine<I>(pairs: I) -> Option<f64>
where
    I: IntoIterator<Item = (f64, f64)>,
{
    let (mut vx, mut vy, mut vxy) = (0.0, 0.0, 0.0);
    for (x, y) in pairs {
        vx += x * x;
        vy += y * y;
        vxy += x * y;
    }
    if vx == 0.0 || vy == 0.0 {
        None
    } else {
        finite(vxy / (vx * vy).sqrt())
    }
}

/// Evaluate `measure` on a pair of vectors.
///
/// `params` carries call-site arguments; only PC reads one (the fixed column
/// id, first element).
#[must_use]
pub fn compute(
    measure: Measure,
    ctx: &MeasureContext<'_>,
    a: &RatingVector,
    b: &RatingVector,
    params: &[Param],
) -> Option<f64> {
    let median = ctx.rating_median();
    let value = match measure {
        Measure::Cosine => cosine::cosine(a, b, ctx.cosine_center()),
        Measure::CosineJaccard => {
            Some(cosine::cosine(a, b, ctx.cosine_center())? * overlap::jaccard(a, b)?)
        }
        Measure::Coj => cosine::coj(a, b, ctx.cosine_center()),
        Measure::Coco => cosine::coco(a, b),
        Measure::Pearson => correlation::pearson(a, b),
        Measure::PearsonJaccard => {
            Some(correlation::pearson(a, b)? * overlap::jaccard(a, b)?)
        }
        Measure::Cod => correlation::cod(a, b, |f| ctx.field_mean(f)),
        Measure::Cpc => correlation::cpc(a, b, median),
        Measure::Wpc => correlation::wpc(a, b),
        Measure::Spc => correlation::spc(a, b),
        Measure::Jaccard => overlap::jaccard(a, b),
        Measure::Jaccard2 => overlap::jaccard2(a, b),
        Measure::Msd => divergence::msd(a, b, ctx.stats.range.max_rating, ctx.config.msd_fraction),
        Measure::MsdJaccard => Some(
            divergence::msd(a, b, ctx.stats.range.max_rating, ctx.config.msd_fraction)?
                * overlap::jaccard(a, b)?,
        ),
        Measure::Urp => shape::urp(a, b),
        Measure::Triangle => divergence::triangle(a, b),
        Measure::Tjm => Some(divergence::triangle(a, b)? * overlap::jaccard(a, b)?),
        Measure::Pss => shape::pss(a, b, median, |f| ctx.field_mean(f)),
        Measure::Nhsm => shape::nhsm(a, b, median, |f| ctx.field_mean(f)),
        Measure::Bc => divergence::bc(a, b, &ctx.bins.value_bins_for(a, b)),
        Measure::Bcf => divergence::bcf(ctx, a, b),
        Measure::BcfJaccard => Some(divergence::bcf(ctx, a, b)? + overlap::jaccard(a, b)?),
        Measure::Src => divergence::src(a, b, &ctx.bins.rank_bins_for(a, b)),
        Measure::Pip => shape::pip(a, b, &ctx.stats.range, |f| ctx.field_mean(f)),
        Measure::Pc => {
            let fixed = params.first().and_then(Param::as_column_id)?;
            correlation::pc(a, b, fixed, |f| ctx.field_mean(f), |fixed, f| {
                ctx.column_corr(fixed, f)
            })
        }
        Measure::Mmd => divergence::mmd(a, b, &ctx.bins.value_bins_for(a, b)),
        Measure::CjacMd => Some(
            cosine::cosine(a, b, ctx.cosine_center())?
                + divergence::mmd(a, b, &ctx.bins.value_bins_for(a, b))?
                + overlap::jaccard(a, b)?,
        ),
        Measure::Feng => shape::feng(a, b, ctx.cosine_center()),
        Measure::Mu => shape::mu(
            a,
            b,
            ctx.config.mu_alpha,
            &ctx.bins.value_bins_for(a, b),
        ),
        Measure::Smtp => shape::smtp(a, b, ctx.config.smtp_lambda, |f| ctx.smtp_variance(f)),
        Measure::Amer => overlap::amer(a, b, &ctx.stats.fields(ctx.config.row_axis).ids),
        Measure::Amer2 => overlap::amer2(a, b),
        Measure::Amer2Jaccard => Some(overlap::amer2(a, b)? * overlap::jaccard(a, b)?),
        Measure::QuasiTfIdf => overlap::quasi_tf_idf(a, b),
        Measure::QuasiTfIdfJaccard => overlap::quasi_tf_idf_jaccard(a, b),
        Measure::TriangleArea => {
            divergence::triangle_area(a, b, ctx.config.ta_normalized.then_some(median))
        }
        Measure::TriangleAreaJaccard => Some(
            divergence::triangle_area(a, b, ctx.config.ta_normalized.then_some(median))?
                * overlap::jaccard(a, b)?,
        ),
        Measure::Mmns => overlap::mmns(a, b),
    };
    value.and_then(finite)
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Shared fixtures for formula tests.

    use super::*;
    use crate::dataset::{DatasetConfig, MemoryDataset, NoColumns};
    use crate::stats::aggregate;

    pub fn v(id: EntityId, pairs: &[(FieldId, f64)]) -> RatingVector {
        RatingVector::from_pairs(id, pairs.iter().copied())
    }

    /// User A = {1:5, 2:3, 3:4}, user B = {1:4, 2:2, 3:5} on a 1–5 scale.
    pub fn pair_ab() -> (RatingVector, RatingVector) {
        (
            v(1, &[(1, 5.0), (2, 3.0), (3, 4.0)]),
            v(2, &[(1, 4.0), (2, 2.0), (3, 5.0)]),
        )
    }

    pub fn stats_for(triples: &[(EntityId, EntityId, f64)]) -> Statistics {
        let data =
            MemoryDataset::from_triples(DatasetConfig::new(1.0, 5.0), triples.iter().copied());
        aggregate(&data).unwrap()
    }

    pub fn eval(
        measure: Measure,
        config: &SimilarityConfig,
        stats: &Statistics,
        a: &RatingVector,
        b: &RatingVector,
    ) -> Option<f64> {
        let bins = BinSet::parse(&config.value_bins).unwrap();
        let ctx = MeasureContext {
            config,
            stats,
            bins: &bins,
            columns: &NoColumns,
            caches: None,
        };
        compute(measure, &ctx, a, b, &[])
    }
}

//! Measure registry: names, capabilities, and lookup.
//!
//! Every formula is identified by a short lowercase name (the value of the
//! `measure` configuration entry). Dispatch from a [`Measure`] to its formula
//! lives in [`measures::compute`](crate::measures::compute).

use std::fmt;
use std::str::FromStr;

/// A selectable similarity measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Measure {
    /// Cosine over co-rated fields.
    #[default]
    Cosine,
    /// Cosine × Jaccard.
    CosineJaccard,
    /// Cosine over the union of rated fields.
    Coj,
    /// Sum-product over the product of vector lengths.
    Coco,
    /// Pearson correlation.
    Pearson,
    /// Pearson × Jaccard.
    PearsonJaccard,
    /// Adjusted cosine (deviation from field means).
    Cod,
    /// Constrained Pearson (deviation from the rating median).
    Cpc,
    /// Weighted Pearson.
    Wpc,
    /// Sigmoid Pearson.
    Spc,
    /// Jaccard index.
    Jaccard,
    /// Co-rated count over the product of rated counts.
    Jaccard2,
    /// Mean squared difference.
    Msd,
    /// MSD × Jaccard.
    MsdJaccard,
    /// User rating preference (mean/variance divergence).
    Urp,
    /// Triangle distance measure.
    Triangle,
    /// Triangle × Jaccard.
    Tjm,
    /// Proximity-significance-singularity.
    Pss,
    /// PSS × Jaccard2 × URP.
    Nhsm,
    /// Bhattacharyya coefficient of rating histograms.
    Bc,
    /// Bhattacharyya coefficient over column pairs.
    Bcf,
    /// BCF + Jaccard.
    BcfJaccard,
    /// Spearman rank correlation.
    Src,
    /// Proximity-impact-popularity.
    Pip,
    /// Partial correlation against a fixed column.
    Pc,
    /// Mean measure of divergence.
    Mmd,
    /// Cosine + MMD + Jaccard.
    CjacMd,
    /// COJ × sigmoid overlap × URP.
    Feng,
    /// Pearson blended with Bhattacharyya distance and Jaccard.
    Mu,
    /// Similarity measure for text processing, applied to ratings.
    Smtp,
    /// Presence agreement.
    Amer,
    /// Exclusive-mass penalty.
    Amer2,
    /// Amer2 × Jaccard.
    Amer2Jaccard,
    /// Quasi TF-IDF.
    QuasiTfIdf,
    /// Quasi TF-IDF with Jaccard damping.
    QuasiTfIdfJaccard,
    /// Triangle area.
    TriangleArea,
    /// Triangle area × Jaccard.
    TriangleAreaJaccard,
    /// Numerical nearby similarity.
    Mmns,
}

impl Measure {
    /// Every measure, in declaration order.
    pub const ALL: [Measure; 38] = [
        Measure::Cosine,
        Measure::CosineJaccard,
        Measure::Coj,
        Measure::Coco,
        Measure::Pearson,
        Measure::PearsonJaccard,
        Measure::Cod,
        Measure::Cpc,
        Measure::Wpc,
        Measure::Spc,
        Measure::Jaccard,
        Measure::Jaccard2,
        Measure::Msd,
        Measure::MsdJaccard,
        Measure::Urp,
        Measure::Triangle,
        Measure::Tjm,
        Measure::Pss,
        Measure::Nhsm,
        Measure::Bc,
        Measure::Bcf,
        Measure::BcfJaccard,
        Measure::Src,
        Measure::Pip,
        Measure::Pc,
        Measure::Mmd,
        Measure::CjacMd,
        Measure::Feng,
        Measure::Mu,
        Measure::Smtp,
        Measure::Amer,
        Measure::Amer2,
        Measure::Amer2Jaccard,
        Measure::QuasiTfIdf,
        Measure::QuasiTfIdfJaccard,
        Measure::TriangleArea,
        Measure::TriangleAreaJaccard,
        Measure::Mmns,
    ];

    /// Configuration name of the measure.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Measure::Cosine => "cosine",
            Measure::CosineJaccard => "cosinej",
            Measure::Coj => "coj",
            Measure::Coco => "coco",
            Measure::Pearson => "pearson",
            Measure::PearsonJaccard => "pearsonj",
            Measure::Cod => "cod",
            Measure::Cpc => "cpc",
            Measure::Wpc => "wpc",
            Measure::Spc => "spc",
            Measure::Jaccard => "jaccard",
            Measure::Jaccard2 => "jaccard2",
            Measure::Msd => "msd",
            Measure::MsdJaccard => "msdj",
            Measure::Urp => "urp",
            Measure::Triangle => "triangle",
            Measure::Tjm => "tjm",
            Measure::Pss => "pss",
            Measure::Nhsm => "nhsm",
            Measure::Bc => "bc",
            Measure::Bcf => "bcf",
            Measure::BcfJaccard => "bcfj",
            Measure::Src => "src",
            Measure::Pip => "pip",
            Measure::Pc => "pc",
            Measure::Mmd => "mmd",
            Measure::CjacMd => "cjacmd",
            Measure::Feng => "feng",
            Measure::Mu => "mu",
            Measure::Smtp => "smtp",
            Measure::Amer => "amer",
            Measure::Amer2 => "amer2",
            Measure::Amer2Jaccard => "amer2j",
            Measure::QuasiTfIdf => "qti",
            Measure::QuasiTfIdfJaccard => "qtij",
            Measure::TriangleArea => "ta",
            Measure::TriangleAreaJaccard => "taj",
            Measure::Mmns => "mmns",
        }
    }

    /// Look a measure up by configuration name (exact, lowercase).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Measure> {
        Measure::ALL.iter().copied().find(|m| m.name() == name)
    }

    /// Whether results may be memoized per `(id1, id2)` pair.
    ///
    /// PC depends on the fixed column passed at call time, so its result is
    /// not a function of the pair alone.
    #[must_use]
    pub const fn is_cacheable(self) -> bool {
        !matches!(self, Measure::Pc)
    }

    /// Whether the measure discretizes ratings into value bins.
    #[must_use]
    pub const fn requires_value_bins(self) -> bool {
        matches!(self, Measure::Bcf | Measure::BcfJaccard | Measure::Mmd)
    }

    /// Whether the measure reads column (transposed) rating vectors.
    #[must_use]
    pub const fn requires_columns(self) -> bool {
        matches!(self, Measure::Bcf | Measure::BcfJaccard | Measure::Pc)
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when parsing an unknown measure name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMeasure(pub String);

impl fmt::Display for UnknownMeasure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown similarity measure {:?}", self.0)
    }
}

impl std::error::Error for UnknownMeasure {}

impl FromStr for Measure {
    type Err = UnknownMeasure;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Measure::from_name(s).ok_or_else(|| UnknownMeasure(s.to_string()))
    }
}

/// Names of all supported measures, sorted.
#[must_use]
pub fn supported_measures() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = Measure::ALL.iter().map(|m| m.name()).collect();
    names.sort_unstable();
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_names_are_unique() {
        let names: HashSet<_> = Measure::ALL.iter().map(|m| m.name()).collect();
        assert_eq!(names.len(), Measure::ALL.len());
    }

    #[test]
    fn test_round_trip_names() {
        for m in Measure::ALL {
            assert_eq!(m.name().parse::<Measure>(), Ok(m));
        }
        assert!("nope".parse::<Measure>().is_err());
        assert_eq!(Measure::from_name("COSINE"), None);
    }

    #[test]
    fn test_supported_sorted() {
        let names = supported_measures();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);
        assert!(names.contains(&"mmd"));
        assert!(names.contains(&"cjacmd"));
    }

    #[test]
    fn test_capabilities() {
        assert!(!Measure::Pc.is_cacheable());
        assert!(Measure::Cosine.is_cacheable());
        assert!(Measure::Mmd.requires_value_bins());
        assert!(!Measure::Src.requires_value_bins());
        assert!(Measure::Bcf.requires_columns());
        assert_eq!(Measure::default(), Measure::Cosine);
    }
}

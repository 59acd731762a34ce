//! Attribute profiles.
//!
//! A profile is the fixed-schema side information attached to a user or an
//! item (age, genre, flags). Every similarity entry point accepts an optional
//! pair of profiles; the rating-based measures ignore them.

use serde::{Deserialize, Serialize};

use crate::vector::EntityId;

/// One attribute value of a profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum AttributeValue {
    /// Real-valued attribute.
    Numeric(f64),
    /// Binary attribute.
    Categorical(bool),
    /// One of `cardinality` unordered labels.
    Nominal {
        /// Label index, `0..cardinality`.
        index: u32,
        /// Number of labels.
        cardinality: u32,
    },
}

impl AttributeValue {
    /// Real-number view of the value.
    ///
    /// Nominal labels map onto `[0, 1]` by `index / (cardinality - 1)`.
    #[must_use]
    pub fn as_real(&self) -> f64 {
        match *self {
            AttributeValue::Numeric(v) => v,
            AttributeValue::Categorical(b) => f64::from(u8::from(b)),
            AttributeValue::Nominal { index, cardinality } => {
                if cardinality <= 1 {
                    0.0
                } else {
                    f64::from(index) / f64::from(cardinality - 1)
                }
            }
        }
    }
}

/// Attribute vector of one entity. `None` marks a missing attribute.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Profile {
    /// Entity the profile describes.
    pub id: EntityId,
    /// Attribute values in schema order.
    pub values: Vec<Option<AttributeValue>>,
}

impl Profile {
    /// Profile with the given values.
    #[must_use]
    pub fn new(id: EntityId, values: Vec<Option<AttributeValue>>) -> Self {
        Self { id, values }
    }

    /// Number of attributes in the schema.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True if the schema has no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// True if attribute `index` is absent or missing.
    #[must_use]
    pub fn is_missing(&self, index: usize) -> bool {
        !matches!(self.values.get(index), Some(Some(_)))
    }

    /// Real-number view of attribute `index`.
    #[must_use]
    pub fn value_as_real(&self, index: usize) -> Option<f64> {
        self.values.get(index)?.as_ref().map(AttributeValue::as_real)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nominal_normalization() {
        let v = AttributeValue::Nominal {
            index: 2,
            cardinality: 5,
        };
        assert!((v.as_real() - 0.5).abs() < 1e-12);
        let single = AttributeValue::Nominal {
            index: 0,
            cardinality: 1,
        };
        assert_eq!(single.as_real(), 0.0);
    }

    #[test]
    fn test_missing_attributes() {
        let p = Profile::new(
            3,
            vec![Some(AttributeValue::Numeric(1.5)), None, Some(AttributeValue::Categorical(true))],
        );
        assert!(!p.is_missing(0));
        assert!(p.is_missing(1));
        assert!(p.is_missing(7));
        assert_eq!(p.value_as_real(2), Some(1.0));
        assert_eq!(p.value_as_real(1), None);
    }

    #[test]
    fn test_profile_json_shape() {
        let p = Profile::new(1, vec![Some(AttributeValue::Numeric(2.0)), None]);
        let json = serde_json::to_string(&p).unwrap();
        let back: Profile = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }
}

//! Sparse rating vectors.
//!
//! A rating vector is one row of the rating matrix: the ratings a single user
//! gave (fields are items) or the ratings a single item received (fields are
//! users). Vectors are stored as parallel arrays of sorted field ids and
//! values, the same layout used for sparse embeddings:
//!
//! ```text
//! ids:    [ 3,   7,   12 ]
//! values: [ 4.0, 2.0, 5.0 ]
//! ```
//!
//! Comparing two vectors only ever needs the fields both rated (`common`) or
//! the fields either rated (`union`). Both are produced by a merge-join over the
//! sorted ids in O(|a| + |b|) time without allocating.

use std::cmp::Ordering;

/// Identifier of a user or item.
pub type EntityId = u32;

/// Identifier of a rated field (an item inside a user vector, a user inside an
/// item vector).
pub type FieldId = u32;

/// Sparse mapping from field id to rating value for one entity.
///
/// Field ids are unique and kept in ascending order. Every value is finite:
/// non-finite input is dropped at construction, so a field reported as rated
/// always has a usable value.
///
/// # Example
///
/// ```rust
/// use simcf::RatingVector;
///
/// let v = RatingVector::from_pairs(1, [(10, 4.0), (3, 5.0), (10, 2.0)]);
/// assert_eq!(v.field_ids(), &[3, 10]);
/// assert_eq!(v.get(10), Some(2.0)); // last write wins
/// assert_eq!(v.get(99), None);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RatingVector {
    id: EntityId,
    ids: Vec<FieldId>,
    values: Vec<f64>,
}

impl RatingVector {
    /// Empty vector for the given entity.
    #[must_use]
    pub fn new(id: EntityId) -> Self {
        Self {
            id,
            ids: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Build a vector from `(field, value)` pairs in any order.
    ///
    /// Duplicate fields keep the last value; non-finite values are skipped.
    pub fn from_pairs<I>(id: EntityId, pairs: I) -> Self
    where
        I: IntoIterator<Item = (FieldId, f64)>,
    {
        let mut pairs: Vec<(FieldId, f64)> =
            pairs.into_iter().filter(|(_, v)| v.is_finite()).collect();
        // Stable sort keeps insertion order among duplicates, so the last
        // occurrence of a field is the last element of its run.
        pairs.sort_by_key(|(field, _)| *field);

        let mut ids = Vec::with_capacity(pairs.len());
        let mut values: Vec<f64> = Vec::with_capacity(pairs.len());
        for (field, value) in pairs {
            if ids.last() == Some(&field) {
                if let Some(last) = values.last_mut() {
                    *last = value;
                }
            } else {
                ids.push(field);
                values.push(value);
            }
        }

        Self { id, ids, values }
    }

    /// Set the rating of `field`, replacing any previous value.
    ///
    /// Returns `false` (and leaves the vector unchanged) for non-finite values.
    pub fn insert(&mut self, field: FieldId, value: f64) -> bool {
        if !value.is_finite() {
            return false;
        }
        match self.ids.binary_search(&field) {
            Ok(pos) => self.values[pos] = value,
            Err(pos) => {
                self.ids.insert(pos, field);
                self.values.insert(pos, value);
            }
        }
        true
    }

    /// Remove the rating of `field`, returning the old value.
    pub fn remove(&mut self, field: FieldId) -> Option<f64> {
        let pos = self.ids.binary_search(&field).ok()?;
        self.ids.remove(pos);
        Some(self.values.remove(pos))
    }

    /// Identifier of the entity this vector belongs to.
    #[inline]
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Number of rated fields.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// True if no field is rated.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Rated field ids, ascending.
    #[inline]
    #[must_use]
    pub fn field_ids(&self) -> &[FieldId] {
        &self.ids
    }

    /// Rating values, aligned with [`field_ids`](Self::field_ids).
    #[inline]
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Iterate `(field, value)` pairs in field order.
    pub fn iter(&self) -> impl Iterator<Item = (FieldId, f64)> + '_ {
        self.ids.iter().copied().zip(self.values.iter().copied())
    }

    /// Rating of `field`, or `None` if the field is not rated.
    #[inline]
    #[must_use]
    pub fn get(&self, field: FieldId) -> Option<f64> {
        self.ids
            .binary_search(&field)
            .ok()
            .map(|pos| self.values[pos])
    }

    /// True if `field` is rated.
    #[inline]
    #[must_use]
    pub fn is_rated(&self, field: FieldId) -> bool {
        self.ids.binary_search(&field).is_ok()
    }

    /// Sum of rated values (0 for an empty vector).
    #[must_use]
    pub fn sum(&self) -> f64 {
        self.values.iter().sum()
    }

    /// Mean of rated values, `None` for an empty vector.
    #[must_use]
    pub fn mean(&self) -> Option<f64> {
        if self.values.is_empty() {
            None
        } else {
            Some(self.sum() / self.values.len() as f64)
        }
    }

    /// Maximum-likelihood variance (divides by n), `None` for an empty vector.
    #[must_use]
    pub fn mle_var(&self) -> Option<f64> {
        let mean = self.mean()?;
        let ss: f64 = self.values.iter().map(|v| (v - mean) * (v - mean)).sum();
        Some(ss / self.values.len() as f64)
    }

    /// Euclidean length over rated fields.
    #[must_use]
    pub fn module(&self) -> f64 {
        self.values.iter().map(|v| v * v).sum::<f64>().sqrt()
    }

    /// Fields rated by both vectors, as `(field, self value, other value)`.
    #[inline]
    pub fn common<'a>(&'a self, other: &'a RatingVector) -> Common<'a> {
        Common {
            a: self,
            b: other,
            i: 0,
            j: 0,
        }
    }

    /// Fields rated by either vector, as `(field, self value, other value)`
    /// with `None` on the side that did not rate the field.
    #[inline]
    pub fn union<'a>(&'a self, other: &'a RatingVector) -> Union<'a> {
        Union {
            a: self,
            b: other,
            i: 0,
            j: 0,
        }
    }

    /// Number of fields rated by both vectors.
    #[must_use]
    pub fn common_count(&self, other: &RatingVector) -> usize {
        self.common(other).count()
    }

    /// Number of fields rated by either vector.
    #[must_use]
    pub fn union_count(&self, other: &RatingVector) -> usize {
        self.len() + other.len() - self.common_count(other)
    }
}

impl FromIterator<(FieldId, f64)> for RatingVector {
    /// Collects into a vector with entity id 0.
    fn from_iter<T: IntoIterator<Item = (FieldId, f64)>>(iter: T) -> Self {
        Self::from_pairs(0, iter)
    }
}

/// Merge-join iterator over the fields rated by both vectors.
#[derive(Debug, Clone)]
pub struct Common<'a> {
    a: &'a RatingVector,
    b: &'a RatingVector,
    i: usize,
    j: usize,
}

impl Iterator for Common<'_> {
    type Item = (FieldId, f64, f64);

    fn next(&mut self) -> Option<Self::Item> {
        while self.i < self.a.ids.len() && self.j < self.b.ids.len() {
            match self.a.ids[self.i].cmp(&self.b.ids[self.j]) {
                Ordering::Less => self.i += 1,
                Ordering::Greater => self.j += 1,
                Ordering::Equal => {
                    let item = (self.a.ids[self.i], self.a.values[self.i], self.b.values[self.j]);
                    self.i += 1;
                    self.j += 1;
                    return Some(item);
                }
            }
        }
        None
    }
}

/// Merge-join iterator over the fields rated by at least one vector.
#[derive(Debug, Clone)]
pub struct Union<'a> {
    a: &'a RatingVector,
    b: &'a RatingVector,
    i: usize,
    j: usize,
}

impl Iterator for Union<'_> {
    type Item = (FieldId, Option<f64>, Option<f64>);

    fn next(&mut self) -> Option<Self::Item> {
        let left = self.a.ids.get(self.i).copied();
        let right = self.b.ids.get(self.j).copied();
        match (left, right) {
            (None, None) => None,
            (Some(fa), None) => {
                self.i += 1;
                Some((fa, Some(self.a.values[self.i - 1]), None))
            }
            (None, Some(fb)) => {
                self.j += 1;
                Some((fb, None, Some(self.b.values[self.j - 1])))
            }
            (Some(fa), Some(fb)) => match fa.cmp(&fb) {
                Ordering::Less => {
                    self.i += 1;
                    Some((fa, Some(self.a.values[self.i - 1]), None))
                }
                Ordering::Greater => {
                    self.j += 1;
                    Some((fb, None, Some(self.b.values[self.j - 1])))
                }
                Ordering::Equal => {
                    let item = (fa, Some(self.a.values[self.i]), Some(self.b.values[self.j]));
                    self.i += 1;
                    self.j += 1;
                    Some(item)
                }
            },
        }
    }
}

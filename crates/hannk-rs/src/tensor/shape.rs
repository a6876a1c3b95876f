//! Per-dimension bounds used to describe tensor shapes and offsets.

use std::fmt;
use std::ops::Index;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Inclusive `[min, max]` range covered by a tensor along one dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Interval {
    pub min: i32,
    pub max: i32,
}

impl Interval {
    pub fn new(min: i32, max: i32) -> Self {
        Interval { min, max }
    }

    /// Builds the interval starting at `min` and covering `extent` elements.
    pub fn from_extent(min: i32, extent: i32) -> Self {
        Interval {
            min,
            max: min + extent - 1,
        }
    }

    /// Number of elements covered by the interval.
    pub fn extent(&self) -> i32 {
        self.max - self.min + 1
    }

    /// Reports whether `other` lies entirely within this interval.
    pub fn contains(&self, other: &Interval) -> bool {
        self.min <= other.min && other.max <= self.max
    }

    /// Smallest interval covering both `self` and `other`.
    pub fn union(&self, other: &Interval) -> Interval {
        Interval {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.min, self.max)
    }
}

/// Ordered per-dimension intervals describing the region a tensor covers.
///
/// Dimension 0 is the innermost (fastest varying) dimension, matching the buffer layout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bounds {
    dims: SmallVec<[Interval; 4]>,
}

impl Bounds {
    pub fn new(dims: impl IntoIterator<Item = Interval>) -> Self {
        Bounds {
            dims: dims.into_iter().collect(),
        }
    }

    /// Builds zero-based bounds from a list of extents.
    pub fn from_extents(extents: &[i32]) -> Self {
        Bounds::new(extents.iter().map(|&n| Interval::from_extent(0, n)))
    }

    /// Returns the rank (number of dimensions).
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Interval> {
        self.dims.iter()
    }

    /// Total number of elements covered, zero when any dimension is empty.
    pub fn num_elements(&self) -> usize {
        self.dims
            .iter()
            .map(|dim| dim.extent().max(0) as usize)
            .product()
    }

    /// Reports whether every dimension of `other` fits inside the matching dimension here.
    pub fn contains(&self, other: &Bounds) -> bool {
        self.rank() == other.rank()
            && self
                .dims
                .iter()
                .zip(other.dims.iter())
                .all(|(outer, inner)| outer.contains(inner))
    }

    /// Per-dimension union of two boxes of equal rank.
    ///
    /// Panics if the ranks differ.
    pub fn union(&self, other: &Bounds) -> Bounds {
        assert_eq!(
            self.rank(),
            other.rank(),
            "cannot union bounds of rank {} and {}",
            self.rank(),
            other.rank()
        );
        Bounds::new(
            self.dims
                .iter()
                .zip(other.dims.iter())
                .map(|(a, b)| a.union(b)),
        )
    }
}

impl Index<usize> for Bounds {
    type Output = Interval;

    fn index(&self, index: usize) -> &Interval {
        &self.dims[index]
    }
}

impl FromIterator<Interval> for Bounds {
    fn from_iter<I: IntoIterator<Item = Interval>>(iter: I) -> Self {
        Bounds::new(iter)
    }
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, dim) in self.dims.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{dim}")?;
        }
        f.write_str("}")
    }
}

//! Contract violations raised by the tensor memory model.
//!
//! Every variant describes a bug in graph construction rather than a runtime condition.
//! The panicking entry points (`add_use`, `allocate`, `set_alias_of`, element access)
//! format these values into their panic message; the `try_*` variants hand them back to
//! callers that want to probe a construction step without unwinding.

use thiserror::Error;

use crate::tensor::{Bounds, DType, Interval};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ContractViolation {
    #[error("storage use has type {actual} but the storage holds {expected}")]
    TypeMismatch { expected: DType, actual: DType },
    #[error("storage use has rank {actual} but the storage has rank {expected}")]
    RankMismatch { expected: usize, actual: usize },
    #[error("cannot register a use of storage that is already allocated")]
    UseAfterAllocation,
    #[error("cannot allocate storage that has no registered uses")]
    AllocateWithoutUse,
    #[error("tensor `{tensor}` bounds {bounds} are not contained in storage bounds {storage}")]
    BoundsNotContained {
        tensor: String,
        bounds: Bounds,
        storage: Bounds,
    },
    #[error("constant tensor `{tensor}` cannot take part in aliasing")]
    ConstantAlias { tensor: String },
    #[error("tensor `{tensor}` is already allocated and cannot become an alias")]
    AliasAfterAllocation { tensor: String },
    #[error("buffer is not allocated")]
    Unallocated,
    #[error("buffer holds {expected} elements but {actual} was requested")]
    ElementTypeMismatch { expected: DType, actual: DType },
    #[error("coordinate {coords:?} is outside buffer bounds {bounds}")]
    OutOfBounds { coords: Vec<i32>, bounds: Bounds },
    #[error("crop of dimension {dim} to min {min} extent {extent} leaves the range {range}")]
    CropOutOfBounds {
        dim: usize,
        min: i32,
        extent: i32,
        range: Interval,
    },
}

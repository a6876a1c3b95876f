//! Tensor-graph memory and aliasing core for a neural-network inference interpreter.
//!
//! The crate models how logical tensors are backed by physical storage, how several
//! tensors share one allocation, and how an interpreter's op list stays in execution
//! order while passes rewrite it. Kernels, model loading, and code generation live
//! elsewhere and plug in through the [`ops::Op`] trait.

mod env;
pub mod error;
pub mod model;
pub mod ops;
pub mod tensor;

pub use error::ContractViolation;
pub use model::{Model, TopologyError};
pub use ops::{Op, OpPtr, OpVisitor};
pub use tensor::{
    Bounds, Buffer, DType, Interval, QuantizationInfo, Residency, Tensor, TensorMap, TensorPtr,
    TensorStorage,
};

//! Tensor memory model: dtypes, bounds, buffers, shared storage, and tensors.
//!
//! Tensors are logical, named views. Their memory lives in a [`TensorStorage`] that may be
//! private to one tensor or shared by several aliasing tensors. Storage is sized lazily:
//! every tensor bound to it registers its bounds first, and the allocation made later
//! covers the union of them all. Each tensor then crops its own view out of that
//! allocation.

mod buffer;
pub mod dtype;
pub mod element;
mod model_tensor;
pub mod quantization;
pub mod shape;
pub mod storage;

pub use buffer::{Buffer, Dim};
pub use dtype::{DType, TypeCode};
pub use element::BufferElement;
pub use model_tensor::{Residency, Tensor, TensorId, TensorMap, TensorPtr};
pub use quantization::QuantizationInfo;
pub use shape::{Bounds, Interval};
pub use storage::TensorStorage;

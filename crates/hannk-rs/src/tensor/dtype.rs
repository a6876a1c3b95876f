//! Enumerates the scalar element types a tensor buffer can hold.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Broad numeric family of a [`DType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeCode {
    Int,
    UInt,
    Float,
}

/// Scalar type descriptor shared by tensors, storages, and buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DType {
    /// 8-bit unsigned integer, the usual payload of quantized activations.
    U8,
    /// 8-bit signed integer.
    I8,
    U16,
    I16,
    U32,
    /// 32-bit signed integer, used for biases and index tensors.
    I32,
    /// 32-bit floating point following IEEE-754 semantics.
    F32,
    F64,
}

impl DType {
    /// Returns the numeric family of the element type.
    pub fn code(self) -> TypeCode {
        match self {
            DType::I8 | DType::I16 | DType::I32 => TypeCode::Int,
            DType::U8 | DType::U16 | DType::U32 => TypeCode::UInt,
            DType::F32 | DType::F64 => TypeCode::Float,
        }
    }

    /// Returns the width of a single element in bits.
    pub fn bits(self) -> u32 {
        match self {
            DType::U8 | DType::I8 => 8,
            DType::U16 | DType::I16 => 16,
            DType::U32 | DType::I32 | DType::F32 => 32,
            DType::F64 => 64,
        }
    }

    /// Returns the number of bytes required per scalar element.
    pub fn size_in_bytes(self) -> usize {
        (self.bits() / 8) as usize
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.code() {
            TypeCode::Int => "int",
            TypeCode::UInt => "uint",
            TypeCode::Float => "float",
        };
        write!(f, "{prefix}{}", self.bits())
    }
}

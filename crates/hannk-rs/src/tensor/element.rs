//! Defines the scalar element trait used for typed access into tensor buffers.

use std::fmt;

use super::dtype::DType;

/// Trait describing a host scalar that can be read from or written to a buffer.
///
/// Buffers store raw little-endian bytes; implementations tie a Rust scalar to the
/// [`DType`] tag recorded on the buffer so typed access can be checked at runtime.
pub trait BufferElement: Copy + Default + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// Element type tag matching this scalar.
    const DTYPE: DType;

    /// Encodes the value into `out`, which is exactly `DTYPE.size_in_bytes()` long.
    fn write_bytes(self, out: &mut [u8]);

    /// Decodes a value from `bytes`, which is exactly `DTYPE.size_in_bytes()` long.
    fn read_bytes(bytes: &[u8]) -> Self;
}

macro_rules! impl_buffer_element {
    ($($ty:ty => $dtype:ident),* $(,)?) => {
        $(
            impl BufferElement for $ty {
                const DTYPE: DType = DType::$dtype;

                fn write_bytes(self, out: &mut [u8]) {
                    out.copy_from_slice(&self.to_le_bytes());
                }

                fn read_bytes(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(bytes);
                    <$ty>::from_le_bytes(raw)
                }
            }
        )*
    };
}

impl_buffer_element! {
    u8 => U8,
    i8 => I8,
    u16 => U16,
    i16 => I16,
    u32 => U32,
    i32 => I32,
    f32 => F32,
    f64 => F64,
}

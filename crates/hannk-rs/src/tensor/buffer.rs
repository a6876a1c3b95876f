//! Strided host buffer whose views can be cropped and translated over a shared allocation.
//!
//! A [`Buffer`] is a small value type: a dtype, per-dimension `(min, extent, stride)`
//! triples, an element offset, and an optional reference-counted allocation. Cloning a
//! buffer clones the view, never the bytes, so a cropped view and the buffer it was cut
//! from observe each other's writes. A buffer without an allocation still carries its
//! full shape; this is how storage sizes are accumulated before anything is allocated.

use std::fmt;
use std::sync::{Arc, RwLock};

use anyhow::{bail, Result};
use smallvec::SmallVec;

use super::dtype::DType;
use super::element::BufferElement;
use super::shape::{Bounds, Interval};
use crate::env;
use crate::error::ContractViolation;

/// Shape of one buffer dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dim {
    min: i32,
    extent: i32,
    stride: usize,
}

impl Dim {
    pub fn min(&self) -> i32 {
        self.min
    }

    pub fn extent(&self) -> i32 {
        self.extent
    }

    /// Last coordinate covered along this dimension (inclusive).
    pub fn max(&self) -> i32 {
        self.min + self.extent - 1
    }

    /// Distance in elements between neighbouring coordinates.
    pub fn stride(&self) -> usize {
        self.stride
    }

    fn interval(&self) -> Interval {
        Interval::from_extent(self.min, self.extent)
    }
}

type Allocation = Arc<RwLock<Box<[u8]>>>;

/// View over a (possibly not yet allocated) dense host allocation.
#[derive(Clone)]
pub struct Buffer {
    dtype: DType,
    dims: SmallVec<[Dim; 4]>,
    // Element offset of the coordinate at every dimension's `min`.
    offset: usize,
    data: Option<Allocation>,
}

fn dense_dims(bounds: &Bounds) -> SmallVec<[Dim; 4]> {
    let mut stride = 1usize;
    bounds
        .iter()
        .map(|interval| {
            let dim = Dim {
                min: interval.min,
                extent: interval.extent(),
                stride,
            };
            stride *= interval.extent().max(0) as usize;
            dim
        })
        .collect()
}

fn allocate_bytes(dtype: DType, elements: usize) -> Allocation {
    let fill = if env::zero_init_enabled() {
        0
    } else {
        env::UNINIT_FILL_BYTE
    };
    let bytes = vec![fill; elements * dtype.size_in_bytes()];
    Arc::new(RwLock::new(bytes.into_boxed_slice()))
}

impl Buffer {
    /// Allocates a zero-based buffer with the given extents.
    pub fn new(dtype: DType, extents: &[i32]) -> Self {
        Buffer::allocated(dtype, &Bounds::from_extents(extents))
    }

    /// Describes a buffer covering `bounds` without allocating any memory.
    pub fn unallocated(dtype: DType, bounds: &Bounds) -> Self {
        Buffer {
            dtype,
            dims: dense_dims(bounds),
            offset: 0,
            data: None,
        }
    }

    /// Allocates a dense buffer covering exactly `bounds`.
    pub fn allocated(dtype: DType, bounds: &Bounds) -> Self {
        let mut buffer = Buffer::unallocated(dtype, bounds);
        buffer.data = Some(allocate_bytes(dtype, bounds.num_elements()));
        buffer
    }

    /// Allocates a fresh dense buffer with the same type, mins, and extents as `other`.
    pub fn make_with_shape_of(other: &Buffer) -> Self {
        Buffer::allocated(other.dtype, &other.bounds())
    }

    /// Allocates a buffer covering `bounds` and fills it from `values`.
    ///
    /// Values are laid out densely with dimension 0 varying fastest.
    pub fn from_values<T: BufferElement>(bounds: &Bounds, values: &[T]) -> Result<Self> {
        if values.len() != bounds.num_elements() {
            bail!(
                "buffer data length ({}) does not match bounds {}",
                values.len(),
                bounds
            );
        }
        let buffer = Buffer::allocated(T::DTYPE, bounds);
        if let Some(data) = &buffer.data {
            let size = T::DTYPE.size_in_bytes();
            let mut bytes = data.write().expect("buffer allocation poisoned");
            for (chunk, value) in bytes.chunks_exact_mut(size).zip(values) {
                value.write_bytes(chunk);
            }
        }
        Ok(buffer)
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn dimensions(&self) -> usize {
        self.dims.len()
    }

    /// Returns the shape of dimension `index`, panicking when out of range.
    pub fn dim(&self, index: usize) -> Dim {
        self.dims[index]
    }

    pub fn dims(&self) -> &[Dim] {
        &self.dims
    }

    /// Returns the region covered by this view.
    pub fn bounds(&self) -> Bounds {
        self.dims.iter().map(Dim::interval).collect()
    }

    pub fn number_of_elements(&self) -> usize {
        self.bounds().num_elements()
    }

    /// Reports whether a backing allocation exists.
    pub fn is_allocated(&self) -> bool {
        self.data.is_some()
    }

    /// Reports whether both views point into the same allocation.
    pub fn same_allocation(&self, other: &Buffer) -> bool {
        match (&self.data, &other.data) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Restricts dimension `dim` to `[min, min + extent)`, panicking if that leaves the view.
    pub fn crop(&mut self, dim: usize, min: i32, extent: i32) {
        if let Err(err) = self.try_crop(dim, min, extent) {
            panic!("{err}");
        }
    }

    pub fn try_crop(
        &mut self,
        dim: usize,
        min: i32,
        extent: i32,
    ) -> Result<(), ContractViolation> {
        let current = self.dims[dim];
        let range = current.interval();
        if extent < 0 || !range.contains(&Interval::from_extent(min, extent)) {
            return Err(ContractViolation::CropOutOfBounds {
                dim,
                min,
                extent,
                range,
            });
        }
        self.offset += (min - current.min) as usize * current.stride;
        self.dims[dim].min = min;
        self.dims[dim].extent = extent;
        Ok(())
    }

    /// Shifts the coordinate system of dimension `dim` by `delta` without moving data.
    pub fn translate(&mut self, dim: usize, delta: i32) {
        self.dims[dim].min += delta;
    }

    /// Reads the element at `coords`, panicking on type, bounds, or allocation errors.
    pub fn get<T: BufferElement>(&self, coords: &[i32]) -> T {
        self.try_get(coords).unwrap_or_else(|err| panic!("{err}"))
    }

    pub fn try_get<T: BufferElement>(&self, coords: &[i32]) -> Result<T, ContractViolation> {
        let data = self.checked_data::<T>()?;
        let index = self.checked_index(coords)?;
        let size = self.dtype.size_in_bytes();
        let bytes = data.read().expect("buffer allocation poisoned");
        Ok(T::read_bytes(&bytes[index * size..(index + 1) * size]))
    }

    /// Writes `value` at `coords`; the write is visible through every view of the allocation.
    pub fn set<T: BufferElement>(&self, coords: &[i32], value: T) {
        if let Err(err) = self.try_set(coords, value) {
            panic!("{err}");
        }
    }

    pub fn try_set<T: BufferElement>(
        &self,
        coords: &[i32],
        value: T,
    ) -> Result<(), ContractViolation> {
        let data = self.checked_data::<T>()?;
        let index = self.checked_index(coords)?;
        let size = self.dtype.size_in_bytes();
        let mut bytes = data.write().expect("buffer allocation poisoned");
        value.write_bytes(&mut bytes[index * size..(index + 1) * size]);
        Ok(())
    }

    /// Writes `value` into every element covered by this view.
    pub fn fill<T: BufferElement>(&self, value: T) {
        let data = self.checked_data::<T>().unwrap_or_else(|err| panic!("{err}"));
        let size = self.dtype.size_in_bytes();
        let mut bytes = data.write().expect("buffer allocation poisoned");
        self.for_each_coord(|coords| {
            let index = self.linear_index(coords);
            value.write_bytes(&mut bytes[index * size..(index + 1) * size]);
        });
    }

    /// Copies the elements covered by this view out in dense order.
    pub fn to_vec<T: BufferElement>(&self) -> Vec<T> {
        let data = self.checked_data::<T>().unwrap_or_else(|err| panic!("{err}"));
        let size = self.dtype.size_in_bytes();
        let bytes = data.read().expect("buffer allocation poisoned");
        let mut values = Vec::with_capacity(self.number_of_elements());
        self.for_each_coord(|coords| {
            let index = self.linear_index(coords);
            values.push(T::read_bytes(&bytes[index * size..(index + 1) * size]));
        });
        values
    }

    fn checked_data<T: BufferElement>(&self) -> Result<&Allocation, ContractViolation> {
        if T::DTYPE != self.dtype {
            return Err(ContractViolation::ElementTypeMismatch {
                expected: self.dtype,
                actual: T::DTYPE,
            });
        }
        self.data.as_ref().ok_or(ContractViolation::Unallocated)
    }

    fn checked_index(&self, coords: &[i32]) -> Result<usize, ContractViolation> {
        let inside = coords.len() == self.dims.len()
            && coords
                .iter()
                .zip(self.dims.iter())
                .all(|(&c, dim)| c >= dim.min && c <= dim.max());
        if !inside {
            return Err(ContractViolation::OutOfBounds {
                coords: coords.to_vec(),
                bounds: self.bounds(),
            });
        }
        Ok(self.linear_index(coords))
    }

    fn linear_index(&self, coords: &[i32]) -> usize {
        coords
            .iter()
            .zip(self.dims.iter())
            .fold(self.offset, |index, (&c, dim)| {
                index + (c - dim.min) as usize * dim.stride
            })
    }

    // Visits every coordinate of the view, dimension 0 fastest.
    fn for_each_coord(&self, mut f: impl FnMut(&[i32])) {
        if self.dims.iter().any(|dim| dim.extent <= 0) {
            return;
        }
        let mut coords: SmallVec<[i32; 4]> = self.dims.iter().map(|dim| dim.min).collect();
        loop {
            f(&coords);
            let mut dim = 0;
            loop {
                if dim == coords.len() {
                    return;
                }
                coords[dim] += 1;
                if coords[dim] <= self.dims[dim].max() {
                    break;
                }
                coords[dim] = self.dims[dim].min;
                dim += 1;
            }
        }
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("dtype", &self.dtype)
            .field("dims", &self.dims)
            .field("offset", &self.offset)
            .field("allocated", &self.is_allocated())
            .finish()
    }
}

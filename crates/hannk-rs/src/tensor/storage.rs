//! Physical storage shared by one or more tensor views.
//!
//! A [`TensorStorage`] starts out empty. Every tensor that wants to live in it registers a
//! use with [`TensorStorage::add_use`], which grows the storage bounds to the union of all
//! requested regions. Allocation happens once, at whatever size the uses accumulated to,
//! and after that the bounds are frozen.

use std::sync::{Mutex, MutexGuard};

use tracing::debug;

use super::buffer::Buffer;
use super::dtype::DType;
use super::shape::Bounds;
use crate::error::ContractViolation;

#[derive(Debug, Default)]
struct StorageState {
    // `None` until the first use fixes type and rank.
    buffer: Option<Buffer>,
    uses: usize,
}

/// Lazily allocated buffer sized to cover every registered use.
#[derive(Debug, Default)]
pub struct TensorStorage {
    state: Mutex<StorageState>,
}

impl TensorStorage {
    /// Creates storage with no uses; type, rank, and bounds are fixed by the first use.
    pub fn new() -> Self {
        TensorStorage::default()
    }

    /// Seeds storage from an existing buffer, counting it as the first use.
    ///
    /// An already allocated buffer yields storage that is allocated from the start and
    /// therefore rejects further uses.
    pub fn from_buffer(buffer: Buffer) -> Self {
        TensorStorage {
            state: Mutex::new(StorageState {
                buffer: Some(buffer),
                uses: 1,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StorageState> {
        self.state.lock().expect("tensor storage poisoned")
    }

    /// Registers a use of `bounds` with element type `dtype`, panicking on a contract violation.
    pub fn add_use(&self, dtype: DType, bounds: &Bounds) {
        if let Err(err) = self.try_add_use(dtype, bounds) {
            panic!("{err}");
        }
    }

    /// Registers a use, growing the storage to the per-dimension union of all uses.
    ///
    /// The storage is left untouched when an error is returned.
    pub fn try_add_use(&self, dtype: DType, bounds: &Bounds) -> Result<(), ContractViolation> {
        let mut state = self.lock();
        let merged = match &state.buffer {
            None => bounds.clone(),
            Some(buffer) => {
                if buffer.dtype() != dtype {
                    return Err(ContractViolation::TypeMismatch {
                        expected: buffer.dtype(),
                        actual: dtype,
                    });
                }
                if buffer.dimensions() != bounds.rank() {
                    return Err(ContractViolation::RankMismatch {
                        expected: buffer.dimensions(),
                        actual: bounds.rank(),
                    });
                }
                if buffer.is_allocated() {
                    return Err(ContractViolation::UseAfterAllocation);
                }
                buffer.bounds().union(bounds)
            }
        };
        debug!(%dtype, use_bounds = %bounds, storage_bounds = %merged, "registered storage use");
        state.buffer = Some(Buffer::unallocated(dtype, &merged));
        state.uses += 1;
        Ok(())
    }

    /// Reports whether the backing buffer has been materialised.
    pub fn is_allocated(&self) -> bool {
        self.lock()
            .buffer
            .as_ref()
            .is_some_and(Buffer::is_allocated)
    }

    /// Materialises the backing buffer on first call and returns a view of all of it.
    ///
    /// Panics when no use was ever registered, since there is nothing to size the buffer by.
    pub fn allocate(&self) -> Buffer {
        self.try_allocate().unwrap_or_else(|err| panic!("{err}"))
    }

    pub fn try_allocate(&self) -> Result<Buffer, ContractViolation> {
        let mut state = self.lock();
        let uses = state.uses;
        let buffer = state
            .buffer
            .as_mut()
            .ok_or(ContractViolation::AllocateWithoutUse)?;
        if !buffer.is_allocated() {
            *buffer = Buffer::make_with_shape_of(buffer);
            debug!(
                dtype = %buffer.dtype(),
                bounds = %buffer.bounds(),
                bytes = buffer.number_of_elements() * buffer.dtype().size_in_bytes(),
                uses,
                "allocated tensor storage"
            );
        }
        Ok(buffer.clone())
    }

    /// Element type fixed by the first use, if any.
    pub fn dtype(&self) -> Option<DType> {
        self.lock().buffer.as_ref().map(Buffer::dtype)
    }

    /// Union of all registered uses, if any.
    pub fn bounds(&self) -> Option<Bounds> {
        self.lock().buffer.as_ref().map(Buffer::bounds)
    }

    /// Returns a view of the whole storage buffer, allocated or not.
    pub fn buffer(&self) -> Option<Buffer> {
        self.lock().buffer.clone()
    }

    /// Number of uses registered so far, including the seeding buffer.
    pub fn use_count(&self) -> usize {
        self.lock().uses
    }
}

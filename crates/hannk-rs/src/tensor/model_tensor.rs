//! Named, typed tensors that view either private or shared storage.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Result;

use super::buffer::Buffer;
use super::dtype::DType;
use super::element::BufferElement;
use super::quantization::QuantizationInfo;
use super::shape::Bounds;
use super::storage::TensorStorage;
use crate::error::ContractViolation;

/// Shared handle to a tensor. Models own the canonical list; ops hold clones.
pub type TensorPtr = Arc<Tensor>;

static TENSOR_ID_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Process-unique tensor identity, used as the key when remapping tensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TensorId(usize);

impl TensorId {
    fn next() -> Self {
        TensorId(TENSOR_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// How a tensor behaves when its model is cloned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Residency {
    /// Allocated and treated as immutable; clones share the same tensor.
    Shared,
    /// Not yet allocated; holds per-run intermediate state, so each clone gets its own copy.
    PerRun,
}

#[derive(Debug)]
struct TensorState {
    // Private view; unallocated until `allocate` crops it out of the storage.
    buffer: Buffer,
    storage: Option<Arc<TensorStorage>>,
}

/// A named view onto (part of) a storage allocation.
#[derive(Debug)]
pub struct Tensor {
    id: TensorId,
    name: String,
    dtype: DType,
    bounds: Bounds,
    quantization: QuantizationInfo,
    is_constant: bool,
    state: Mutex<TensorState>,
}

impl Tensor {
    /// Wraps an existing buffer. An allocated buffer makes this a constant tensor.
    pub fn from_buffer(
        name: impl Into<String>,
        buffer: Buffer,
        quantization: QuantizationInfo,
    ) -> Self {
        Tensor {
            id: TensorId::next(),
            name: name.into(),
            dtype: buffer.dtype(),
            bounds: buffer.bounds(),
            quantization,
            is_constant: buffer.is_allocated(),
            state: Mutex::new(TensorState {
                buffer,
                storage: None,
            }),
        }
    }

    /// Declares a tensor whose memory is allocated later.
    pub fn new(
        name: impl Into<String>,
        dtype: DType,
        bounds: Bounds,
        quantization: QuantizationInfo,
    ) -> Self {
        let buffer = Buffer::unallocated(dtype, &bounds);
        Tensor::from_buffer(name, buffer, quantization)
    }

    /// Builds a constant tensor from host values laid out with dimension 0 fastest.
    pub fn from_values<T: BufferElement>(
        name: impl Into<String>,
        bounds: &Bounds,
        values: &[T],
        quantization: QuantizationInfo,
    ) -> Result<Self> {
        let buffer = Buffer::from_values(bounds, values)?;
        Ok(Tensor::from_buffer(name, buffer, quantization))
    }

    /// Fresh tensor with the same declaration, a new identity, and no storage binding.
    pub fn duplicate(&self) -> Tensor {
        Tensor::new(
            self.name.clone(),
            self.dtype,
            self.bounds.clone(),
            self.quantization.clone(),
        )
    }

    fn lock(&self) -> MutexGuard<'_, TensorState> {
        self.state.lock().expect("tensor state poisoned")
    }

    pub fn id(&self) -> TensorId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Declared bounds of this tensor, independent of any storage it shares.
    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    pub fn rank(&self) -> usize {
        self.bounds.rank()
    }

    pub fn quantization(&self) -> &QuantizationInfo {
        &self.quantization
    }

    pub fn is_constant(&self) -> bool {
        self.is_constant
    }

    pub fn is_allocated(&self) -> bool {
        self.lock().buffer.is_allocated()
    }

    pub fn residency(&self) -> Residency {
        if self.is_allocated() {
            Residency::Shared
        } else {
            Residency::PerRun
        }
    }

    /// Returns the private view of this tensor.
    pub fn buffer(&self) -> Buffer {
        self.lock().buffer.clone()
    }

    /// Returns the backing storage, creating a private one seeded with this tensor's bounds.
    pub fn storage(&self) -> Arc<TensorStorage> {
        let mut state = self.lock();
        let TensorState { buffer, storage } = &mut *state;
        let storage =
            storage.get_or_insert_with(|| Arc::new(TensorStorage::from_buffer(buffer.clone())));
        Arc::clone(storage)
    }

    /// Reports whether both tensors are bound to the same storage.
    pub fn is_alias_of(&self, other: &Tensor) -> bool {
        let mine = self.lock().storage.clone();
        let theirs = other.lock().storage.clone();
        match (mine, theirs) {
            (Some(a), Some(b)) => Arc::ptr_eq(&a, &b),
            _ => false,
        }
    }

    /// Allocates storage if needed and crops this tensor's view out of it.
    ///
    /// Idempotent. Panics if the storage does not cover this tensor's bounds.
    pub fn allocate(&self) {
        if let Err(err) = self.try_allocate() {
            panic!("{err}");
        }
    }

    pub fn try_allocate(&self) -> Result<(), ContractViolation> {
        if self.is_allocated() {
            return Ok(());
        }
        let mut view = self.storage().try_allocate()?;
        let storage_bounds = view.bounds();
        if !storage_bounds.contains(&self.bounds) {
            return Err(ContractViolation::BoundsNotContained {
                tensor: self.name.clone(),
                bounds: self.bounds.clone(),
                storage: storage_bounds,
            });
        }
        for (dim, interval) in self.bounds.iter().enumerate() {
            view.try_crop(dim, interval.min, interval.extent())?;
        }
        self.lock().buffer = view;
        Ok(())
    }

    /// Makes this tensor share `other`'s storage, growing it to cover this tensor too.
    ///
    /// Only the shared allocation is arranged here; callers are responsible for making
    /// sure the aliased tensors are not live at conflicting times.
    pub fn set_alias_of(&self, other: &Tensor) {
        if let Err(err) = self.try_set_alias_of(other) {
            panic!("{err}");
        }
    }

    pub fn try_set_alias_of(&self, other: &Tensor) -> Result<(), ContractViolation> {
        for tensor in [self, other] {
            if tensor.is_constant {
                return Err(ContractViolation::ConstantAlias {
                    tensor: tensor.name.clone(),
                });
            }
        }
        if self.is_allocated() {
            return Err(ContractViolation::AliasAfterAllocation {
                tensor: self.name.clone(),
            });
        }
        let storage = other.storage();
        storage.try_add_use(self.dtype, &self.bounds)?;
        self.lock().storage = Some(storage);
        Ok(())
    }

    /// Reads one element of the allocated view.
    pub fn get<T: BufferElement>(&self, coords: &[i32]) -> T {
        self.buffer().get(coords)
    }

    /// Writes one element of the allocated view.
    pub fn set<T: BufferElement>(&self, coords: &[i32], value: T) {
        self.buffer().set(coords, value)
    }

    pub fn fill<T: BufferElement>(&self, value: T) {
        self.buffer().fill(value)
    }

    pub fn to_vec<T: BufferElement>(&self) -> Vec<T> {
        self.buffer().to_vec()
    }
}

impl fmt::Display for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\": {} x {}", self.name, self.dtype, self.bounds)?;
        if self.is_constant {
            f.write_str(" constant")?;
        } else if self.is_allocated() {
            f.write_str(" allocated")?;
        }
        if self.quantization.is_quantized() {
            write!(
                f,
                " scale={:?} zero={:?}",
                self.quantization.scale, self.quantization.zero
            )?;
        }
        Ok(())
    }
}

/// Old-to-new tensor substitutions applied when cloning ops.
#[derive(Debug, Clone, Default)]
pub struct TensorMap {
    map: HashMap<TensorId, TensorPtr>,
}

impl TensorMap {
    pub fn new() -> Self {
        TensorMap::default()
    }

    /// Records that `from` is replaced by `to`.
    pub fn insert(&mut self, from: &Tensor, to: TensorPtr) {
        self.map.insert(from.id(), to);
    }

    pub fn get(&self, tensor: &Tensor) -> Option<&TensorPtr> {
        self.map.get(&tensor.id())
    }

    /// Returns the replacement for `tensor`, or `tensor` itself when it was not remapped.
    pub fn apply(&self, tensor: &TensorPtr) -> TensorPtr {
        self.get(tensor)
            .map_or_else(|| Arc::clone(tensor), Arc::clone)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::Interval;

    fn declared(name: &str, dtype: DType, extents: &[i32]) -> Tensor {
        Tensor::new(
            name,
            dtype,
            Bounds::from_extents(extents),
            QuantizationInfo::default(),
        )
    }

    #[test]
    fn constant_tensor_is_allocated_from_the_start() -> Result<()> {
        let tensor = Tensor::from_values(
            "weights",
            &Bounds::from_extents(&[2]),
            &[3i32, 4],
            QuantizationInfo::default(),
        )?;
        assert!(tensor.is_constant());
        assert!(tensor.is_allocated());
        let before = tensor.buffer();
        tensor.allocate();
        assert!(tensor.buffer().same_allocation(&before));
        assert_eq!(tensor.residency(), Residency::Shared);
        Ok(())
    }

    #[test]
    fn storage_binding_is_created_once() {
        let tensor = declared("x", DType::F32, &[4]);
        let first = tensor.storage();
        let second = tensor.storage();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.bounds(), Some(Bounds::from_extents(&[4])));
        assert!(!first.is_allocated());
    }

    #[test]
    fn allocation_fails_when_storage_does_not_cover_the_tensor() {
        let tensor = declared("x", DType::U8, &[4]);
        let small = Arc::new(TensorStorage::new());
        small.add_use(DType::U8, &Bounds::new([Interval::new(1, 2)]));
        tensor.lock().storage = Some(small);
        assert!(matches!(
            tensor.try_allocate(),
            Err(ContractViolation::BoundsNotContained { .. })
        ));
        assert!(!tensor.is_allocated());
    }

    #[test]
    fn constants_cannot_alias() -> Result<()> {
        let constant = Tensor::from_values(
            "c",
            &Bounds::from_extents(&[1]),
            &[1u8],
            QuantizationInfo::default(),
        )?;
        let other = declared("t", DType::U8, &[1]);
        assert!(matches!(
            other.try_set_alias_of(&constant),
            Err(ContractViolation::ConstantAlias { .. })
        ));
        assert!(matches!(
            constant.try_set_alias_of(&other),
            Err(ContractViolation::ConstantAlias { .. })
        ));
        Ok(())
    }

    #[test]
    fn duplicate_keeps_declaration_but_not_identity() {
        let original = Tensor::new(
            "act",
            DType::U8,
            Bounds::from_extents(&[3, 3]),
            QuantizationInfo::per_tensor(0.5, 128),
        );
        original.storage();
        let copy = original.duplicate();
        assert_ne!(copy.id(), original.id());
        assert_eq!(copy.name(), "act");
        assert_eq!(copy.bounds(), original.bounds());
        assert_eq!(copy.quantization(), original.quantization());
        assert!(!copy.is_alias_of(&original));
    }

    #[test]
    fn tensor_map_falls_back_to_the_original() {
        let a: TensorPtr = Arc::new(declared("a", DType::F32, &[1]));
        let b: TensorPtr = Arc::new(a.duplicate());
        let c: TensorPtr = Arc::new(declared("c", DType::F32, &[1]));
        let mut map = TensorMap::new();
        map.insert(&a, Arc::clone(&b));
        assert!(Arc::ptr_eq(&map.apply(&a), &b));
        assert!(Arc::ptr_eq(&map.apply(&c), &c));
        assert_eq!(map.len(), 1);
    }
}

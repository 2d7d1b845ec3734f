//! Per-container copy strategies.
//!
//! A strategy decides how the copy of a container is built. Growable
//! containers are instantiated empty and filled in place, which lets the
//! engine register the copy before any element is visited. Fixed containers
//! cannot grow, so their elements are buffered and the container is built in
//! one step at the end; such a copy only exists after all its elements do.

use std::{fmt, sync::Arc};

use ahash::AHashMap;

use crate::{
    error::CopyError,
    heap::{Heap, HeapData, HeapId},
    instantiate::instantiate,
    types::{Map, MapShape, Sequence, SequenceShape, TypeDescriptor, TypeId, TypeKind, TypeRegistry},
    value::Value,
};

/// An in-progress copy of one sequence container.
pub trait SequenceOp {
    /// The heap object the elements are being added to, if it already exists.
    fn sink(&self) -> Option<HeapId>;

    fn add(&mut self, heap: &mut Heap, item: Value) -> Result<(), CopyError>;

    /// Completes the copy and returns the id of the new container.
    fn finish(self: Box<Self>, heap: &mut Heap) -> Result<HeapId, CopyError>;
}

/// An in-progress copy of one associative container.
pub trait MapOp {
    /// The heap object the entries are being added to, if it already exists.
    fn sink(&self) -> Option<HeapId>;

    fn put(&mut self, heap: &mut Heap, key: Value, value: Value) -> Result<(), CopyError>;

    fn finish(self: Box<Self>, heap: &mut Heap) -> Result<HeapId, CopyError>;
}

/// Starts copies of sequence containers of a particular type.
pub trait SequenceStrategy: fmt::Debug + Send + Sync {
    /// Begins copying a container of `type_id` that holds `len` elements.
    fn begin(
        &self,
        heap: &mut Heap,
        types: &TypeRegistry,
        type_id: TypeId,
        len: usize,
    ) -> Result<Box<dyn SequenceOp>, CopyError>;
}

/// Starts copies of associative containers of a particular type.
pub trait MapStrategy: fmt::Debug + Send + Sync {
    fn begin(&self, heap: &mut Heap, types: &TypeRegistry, type_id: TypeId, len: usize)
    -> Result<Box<dyn MapOp>, CopyError>;
}

/// Instantiates an empty container through the generic instantiator and
/// inserts each copied element into it.
#[derive(Debug, Clone, Copy, Default)]
pub struct IncrementalSequence;

impl SequenceStrategy for IncrementalSequence {
    fn begin(
        &self,
        heap: &mut Heap,
        types: &TypeRegistry,
        type_id: TypeId,
        _len: usize,
    ) -> Result<Box<dyn SequenceOp>, CopyError> {
        let type_name = type_name(types, type_id)?;
        let (data, _) = instantiate(heap, types, type_id)?;
        if !matches!(&data, HeapData::Sequence(seq) if !seq.is_fixed()) {
            return Err(CopyError::unsupported_container(&type_name));
        }
        let id = heap.allocate(data);
        Ok(Box::new(InPlaceSequenceOp { id, type_name }))
    }
}

#[derive(Debug)]
struct InPlaceSequenceOp {
    id: HeapId,
    type_name: Arc<str>,
}

impl SequenceOp for InPlaceSequenceOp {
    fn sink(&self) -> Option<HeapId> {
        Some(self.id)
    }

    fn add(&mut self, heap: &mut Heap, item: Value) -> Result<(), CopyError> {
        heap.sequence_mut(self.id)
            .ok_or(CopyError::DanglingReference(self.id))?
            .push(item)
            .map_err(|_| CopyError::unsupported_container(&self.type_name))
    }

    fn finish(self: Box<Self>, _heap: &mut Heap) -> Result<HeapId, CopyError> {
        Ok(self.id)
    }
}

/// Collects copied elements and builds the container from all of them at once.
///
/// Used for fixed containers such as `FrozenList`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BufferedSequence;

impl SequenceStrategy for BufferedSequence {
    fn begin(
        &self,
        _heap: &mut Heap,
        types: &TypeRegistry,
        type_id: TypeId,
        len: usize,
    ) -> Result<Box<dyn SequenceOp>, CopyError> {
        let desc = types.get(type_id).ok_or(CopyError::UnknownType(type_id))?;
        let TypeKind::Sequence(shape) = desc.kind() else {
            return Err(CopyError::unsupported_container(desc.name()));
        };
        Ok(Box::new(BufferedSequenceOp {
            type_id,
            shape,
            items: Vec::with_capacity(len),
        }))
    }
}

#[derive(Debug)]
struct BufferedSequenceOp {
    type_id: TypeId,
    shape: SequenceShape,
    items: Vec<Value>,
}

impl SequenceOp for BufferedSequenceOp {
    fn sink(&self) -> Option<HeapId> {
        None
    }

    fn add(&mut self, _heap: &mut Heap, item: Value) -> Result<(), CopyError> {
        self.items.push(item);
        Ok(())
    }

    fn finish(self: Box<Self>, heap: &mut Heap) -> Result<HeapId, CopyError> {
        let Self { type_id, shape, items } = *self;
        Ok(heap.allocate(HeapData::Sequence(Sequence::from_items(type_id, shape, items))))
    }
}

/// Map counterpart of [`IncrementalSequence`].
#[derive(Debug, Clone, Copy, Default)]
pub struct IncrementalMap;

impl MapStrategy for IncrementalMap {
    fn begin(
        &self,
        heap: &mut Heap,
        types: &TypeRegistry,
        type_id: TypeId,
        _len: usize,
    ) -> Result<Box<dyn MapOp>, CopyError> {
        let type_name = type_name(types, type_id)?;
        let (data, _) = instantiate(heap, types, type_id)?;
        if !matches!(&data, HeapData::Map(map) if !map.is_fixed()) {
            return Err(CopyError::unsupported_container(&type_name));
        }
        let id = heap.allocate(data);
        Ok(Box::new(InPlaceMapOp { id, type_name }))
    }
}

#[derive(Debug)]
struct InPlaceMapOp {
    id: HeapId,
    type_name: Arc<str>,
}

impl MapOp for InPlaceMapOp {
    fn sink(&self) -> Option<HeapId> {
        Some(self.id)
    }

    fn put(&mut self, heap: &mut Heap, key: Value, value: Value) -> Result<(), CopyError> {
        heap.map_mut(self.id)
            .ok_or(CopyError::DanglingReference(self.id))?
            .insert(key, value)
            .map(drop)
            .map_err(|_| CopyError::unsupported_container(&self.type_name))
    }

    fn finish(self: Box<Self>, _heap: &mut Heap) -> Result<HeapId, CopyError> {
        Ok(self.id)
    }
}

/// Map counterpart of [`BufferedSequence`], used for `FrozenMap`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BufferedMap;

impl MapStrategy for BufferedMap {
    fn begin(
        &self,
        _heap: &mut Heap,
        types: &TypeRegistry,
        type_id: TypeId,
        len: usize,
    ) -> Result<Box<dyn MapOp>, CopyError> {
        let desc = types.get(type_id).ok_or(CopyError::UnknownType(type_id))?;
        let TypeKind::Map(shape) = desc.kind() else {
            return Err(CopyError::unsupported_container(desc.name()));
        };
        Ok(Box::new(BufferedMapOp {
            type_id,
            shape,
            entries: Vec::with_capacity(len),
        }))
    }
}

#[derive(Debug)]
struct BufferedMapOp {
    type_id: TypeId,
    shape: MapShape,
    entries: Vec<(Value, Value)>,
}

impl MapOp for BufferedMapOp {
    fn sink(&self) -> Option<HeapId> {
        None
    }

    fn put(&mut self, _heap: &mut Heap, key: Value, value: Value) -> Result<(), CopyError> {
        self.entries.push((key, value));
        Ok(())
    }

    fn finish(self: Box<Self>, heap: &mut Heap) -> Result<HeapId, CopyError> {
        let Self { type_id, shape, entries } = *self;
        Ok(heap.allocate(HeapData::Map(Map::from_entries(type_id, shape, entries))))
    }
}

fn type_name(types: &TypeRegistry, type_id: TypeId) -> Result<Arc<str>, CopyError> {
    types
        .name_of(type_id)
        .map(Arc::from)
        .ok_or(CopyError::UnknownType(type_id))
}

static INCREMENTAL_SEQUENCE: IncrementalSequence = IncrementalSequence;
static INCREMENTAL_MAP: IncrementalMap = IncrementalMap;

/// Container copy strategies, keyed by canonical type name.
///
/// Growable containers without an entry fall back to the incremental
/// strategies. Fixed containers need an entry; the defaults cover
/// `FrozenList` and `FrozenMap`.
#[derive(Debug, Clone)]
pub struct Strategies {
    sequences: AHashMap<Arc<str>, Arc<dyn SequenceStrategy>>,
    maps: AHashMap<Arc<str>, Arc<dyn MapStrategy>>,
}

impl Default for Strategies {
    fn default() -> Self {
        let mut strategies = Self::empty();
        strategies.register_sequence("FrozenList", BufferedSequence);
        strategies.register_map("FrozenMap", BufferedMap);
        strategies
    }
}

impl Strategies {
    /// A registry with no entries, not even for the built-in fixed containers.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            sequences: AHashMap::new(),
            maps: AHashMap::new(),
        }
    }

    /// Sets the strategy for sequence containers named `type_name`, returning the one it replaces.
    pub fn register_sequence(
        &mut self,
        type_name: impl Into<Arc<str>>,
        strategy: impl SequenceStrategy + 'static,
    ) -> Option<Arc<dyn SequenceStrategy>> {
        self.sequences.insert(type_name.into(), Arc::new(strategy))
    }

    /// Sets the strategy for associative containers named `type_name`, returning the one it replaces.
    pub fn register_map(
        &mut self,
        type_name: impl Into<Arc<str>>,
        strategy: impl MapStrategy + 'static,
    ) -> Option<Arc<dyn MapStrategy>> {
        self.maps.insert(type_name.into(), Arc::new(strategy))
    }

    /// Chooses the strategy for copying a sequence container of type `desc`.
    pub fn sequence_for(&self, desc: &TypeDescriptor) -> Result<&dyn SequenceStrategy, CopyError> {
        if let Some(strategy) = self.sequences.get(desc.name()) {
            return Ok(strategy.as_ref());
        }
        match desc.kind() {
            TypeKind::Sequence(SequenceShape::List | SequenceShape::Set) => Ok(&INCREMENTAL_SEQUENCE),
            _ => Err(CopyError::unsupported_container(desc.name())),
        }
    }

    /// Chooses the strategy for copying an associative container of type `desc`.
    pub fn map_for(&self, desc: &TypeDescriptor) -> Result<&dyn MapStrategy, CopyError> {
        if let Some(strategy) = self.maps.get(desc.name()) {
            return Ok(strategy.as_ref());
        }
        match desc.kind() {
            TypeKind::Map(MapShape::Hash) => Ok(&INCREMENTAL_MAP),
            _ => Err(CopyError::unsupported_container(desc.name())),
        }
    }
}

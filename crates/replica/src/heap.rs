use std::{collections::BTreeMap, fmt, sync::Arc};

use ahash::AHashMap;

use crate::{
    error::{CopyError, FieldAccessReason},
    instantiate::instantiate,
    types::{Array, FieldType, Instance, Map, Sequence, TypeId, TypeKind, TypeRegistry},
    value::Value,
};

/// Snapshot of heap state at a point in time.
///
/// `objects_by_type` uses `BTreeMap` for deterministic iteration order, so
/// snapshots can be displayed and compared directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeapStats {
    /// Total number of live objects on the heap.
    pub live_objects: usize,
    /// Breakdown of live objects by `HeapData` variant name.
    pub objects_by_type: BTreeMap<&'static str, usize>,
    /// Number of static field values that have been written.
    pub statics: usize,
}

/// Difference between two heap snapshots, see [`HeapStats::diff`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeapDiff {
    /// Change in live object count (`after - before`).
    pub live_objects_delta: isize,
    /// Per-variant deltas. Only includes variants present in either snapshot.
    pub objects_by_type_delta: BTreeMap<&'static str, isize>,
}

impl HeapStats {
    /// Computes the difference between `self` ("before") and `other` ("after").
    #[must_use]
    pub fn diff(&self, other: &Self) -> HeapDiff {
        let mut objects_by_type_delta = BTreeMap::new();
        for (&name, &count) in &self.objects_by_type {
            let after = other.objects_by_type.get(name).copied().unwrap_or(0);
            objects_by_type_delta.insert(name, isize_delta(count, after));
        }
        for (&name, &count) in &other.objects_by_type {
            objects_by_type_delta
                .entry(name)
                .or_insert_with(|| isize_delta(0, count));
        }
        HeapDiff {
            live_objects_delta: isize_delta(self.live_objects, other.live_objects),
            objects_by_type_delta,
        }
    }
}

#[expect(clippy::cast_possible_wrap)]
fn isize_delta(before: usize, after: usize) -> isize {
    (after as isize).wrapping_sub(before as isize)
}

/// Unique identifier for objects stored inside the heap arena.
///
/// Identity of an object is its id: two refs denote the same object exactly
/// when their ids are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HeapId(usize);

impl HeapId {
    /// Returns the raw index value.
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }

    #[inline]
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index)
    }
}

impl fmt::Display for HeapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The payload of a heap object.
#[derive(Debug, Clone, PartialEq, strum::IntoStaticStr)]
pub enum HeapData {
    Array(Array),
    Sequence(Sequence),
    Map(Map),
    Instance(Instance),
}

impl HeapData {
    /// Registered type of the object; arrays are structural and have none.
    #[must_use]
    pub fn type_id(&self) -> Option<TypeId> {
        match self {
            Self::Array(_) => None,
            Self::Sequence(seq) => Some(seq.type_id()),
            Self::Map(map) => Some(map.type_id()),
            Self::Instance(instance) => Some(instance.type_id()),
        }
    }

    /// Variant name, used as the key of [`HeapStats::objects_by_type`].
    #[must_use]
    pub fn variant_name(&self) -> &'static str {
        self.into()
    }
}

/// Append-only arena owning every mutable object of a graph.
///
/// Objects are never freed individually. A failed copy discards what it
/// allocated by truncating the arena back to where the copy started, and
/// restores any static fields written since then.
#[derive(Debug, Clone, Default)]
pub struct Heap {
    entries: Vec<HeapData>,
    statics: AHashMap<StaticKey, Value>,
    /// Previous values of statics overwritten while a checkpoint is open.
    static_undo: Vec<(StaticKey, Option<Value>)>,
    open_checkpoints: usize,
}

type StaticKey = (TypeId, Arc<str>);

/// Heap state to return to if a copy fails, see [`Heap::checkpoint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub(crate) struct Checkpoint {
    len: usize,
    undo_len: usize,
}

impl Heap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            ..Self::default()
        }
    }

    /// Adds an object to the heap and returns its id.
    pub fn allocate(&mut self, data: HeapData) -> HeapId {
        let id = HeapId(self.entries.len());
        self.entries.push(data);
        id
    }

    #[must_use]
    pub fn get(&self, id: HeapId) -> Option<&HeapData> {
        self.entries.get(id.index())
    }

    #[must_use]
    pub fn get_mut(&mut self, id: HeapId) -> Option<&mut HeapData> {
        self.entries.get_mut(id.index())
    }

    #[must_use]
    pub fn instance(&self, id: HeapId) -> Option<&Instance> {
        match self.get(id)? {
            HeapData::Instance(instance) => Some(instance),
            _ => None,
        }
    }

    #[must_use]
    pub fn instance_mut(&mut self, id: HeapId) -> Option<&mut Instance> {
        match self.get_mut(id)? {
            HeapData::Instance(instance) => Some(instance),
            _ => None,
        }
    }

    #[must_use]
    pub fn sequence(&self, id: HeapId) -> Option<&Sequence> {
        match self.get(id)? {
            HeapData::Sequence(seq) => Some(seq),
            _ => None,
        }
    }

    #[must_use]
    pub fn sequence_mut(&mut self, id: HeapId) -> Option<&mut Sequence> {
        match self.get_mut(id)? {
            HeapData::Sequence(seq) => Some(seq),
            _ => None,
        }
    }

    #[must_use]
    pub fn map(&self, id: HeapId) -> Option<&Map> {
        match self.get(id)? {
            HeapData::Map(map) => Some(map),
            _ => None,
        }
    }

    #[must_use]
    pub fn map_mut(&mut self, id: HeapId) -> Option<&mut Map> {
        match self.get_mut(id)? {
            HeapData::Map(map) => Some(map),
            _ => None,
        }
    }

    #[must_use]
    pub fn array(&self, id: HeapId) -> Option<&Array> {
        match self.get(id)? {
            HeapData::Array(array) => Some(array),
            _ => None,
        }
    }

    #[must_use]
    pub fn array_mut(&mut self, id: HeapId) -> Option<&mut Array> {
        match self.get_mut(id)? {
            HeapData::Array(array) => Some(array),
            _ => None,
        }
    }

    /// Number of objects on the heap.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Starts recording changes so they can be undone with [`Self::rollback`].
    ///
    /// Checkpoints nest; each must end in exactly one `commit` or `rollback`.
    pub(crate) fn checkpoint(&mut self) -> Checkpoint {
        self.open_checkpoints += 1;
        Checkpoint {
            len: self.entries.len(),
            undo_len: self.static_undo.len(),
        }
    }

    pub(crate) fn commit(&mut self, _checkpoint: Checkpoint) {
        self.close_checkpoint();
    }

    /// Drops every object allocated since `checkpoint` and restores the
    /// statics written since then.
    pub(crate) fn rollback(&mut self, checkpoint: Checkpoint) {
        self.entries.truncate(checkpoint.len);
        while self.static_undo.len() > checkpoint.undo_len {
            let Some((key, previous)) = self.static_undo.pop() else { break };
            match previous {
                Some(value) => self.statics.insert(key, value),
                None => self.statics.remove(&key),
            };
        }
        self.close_checkpoint();
    }

    fn close_checkpoint(&mut self) {
        self.open_checkpoints = self.open_checkpoints.saturating_sub(1);
        if self.open_checkpoints == 0 {
            self.static_undo.clear();
        }
    }

    #[must_use]
    pub fn stats(&self) -> HeapStats {
        let mut objects_by_type = BTreeMap::new();
        for data in &self.entries {
            *objects_by_type.entry(data.variant_name()).or_insert(0) += 1;
        }
        HeapStats {
            live_objects: self.entries.len(),
            objects_by_type,
            statics: self.statics.len(),
        }
    }

    /// Creates an instance of a class through its normal construction path.
    ///
    /// Types without a zero-argument initializer come out as placeholders
    /// with zeroed fields.
    pub fn new_object(&mut self, types: &TypeRegistry, type_id: TypeId) -> Result<HeapId, CopyError> {
        let desc = types.get(type_id).ok_or(CopyError::UnknownType(type_id))?;
        if !matches!(desc.kind(), TypeKind::Class | TypeKind::Value) {
            return Err(CopyError::instantiation(desc.name(), "not a class"));
        }
        let (data, _) = instantiate(self, types, type_id)?;
        Ok(self.allocate(data))
    }

    /// Allocates a zeroed instance without running any construction path.
    ///
    /// This is how a host materializes objects of types it builds natively,
    /// including types that [`deep_copy`](crate::deep_copy) can never instantiate.
    pub fn new_native_object(&mut self, types: &TypeRegistry, type_id: TypeId) -> Result<HeapId, CopyError> {
        let desc = types.get(type_id).ok_or(CopyError::UnknownType(type_id))?;
        if !matches!(desc.kind(), TypeKind::Class | TypeKind::Value) {
            return Err(CopyError::instantiation(desc.name(), "not a class"));
        }
        let instance = Instance::zeroed(type_id, desc.slot_types());
        Ok(self.allocate(HeapData::Instance(instance)))
    }

    /// Creates a sequence container holding `items`.
    pub fn new_sequence(
        &mut self,
        types: &TypeRegistry,
        type_id: TypeId,
        items: impl IntoIterator<Item = Value>,
    ) -> Result<HeapId, CopyError> {
        let desc = types.get(type_id).ok_or(CopyError::UnknownType(type_id))?;
        let TypeKind::Sequence(shape) = desc.kind() else {
            return Err(CopyError::instantiation(desc.name(), "not a sequence type"));
        };
        Ok(self.allocate(HeapData::Sequence(Sequence::from_items(type_id, shape, items))))
    }

    /// Creates an associative container holding `entries`.
    pub fn new_map(
        &mut self,
        types: &TypeRegistry,
        type_id: TypeId,
        entries: impl IntoIterator<Item = (Value, Value)>,
    ) -> Result<HeapId, CopyError> {
        let desc = types.get(type_id).ok_or(CopyError::UnknownType(type_id))?;
        let TypeKind::Map(shape) = desc.kind() else {
            return Err(CopyError::instantiation(desc.name(), "not a map type"));
        };
        Ok(self.allocate(HeapData::Map(Map::from_entries(type_id, shape, entries))))
    }

    /// Creates an array, or returns `None` if an item does not fit `component`.
    pub fn new_array(&mut self, component: FieldType, items: Vec<Value>) -> Option<HeapId> {
        Array::new(component, items).map(|array| self.allocate(HeapData::Array(array)))
    }

    /// Reads an instance field by name.
    #[must_use]
    pub fn field(&self, types: &TypeRegistry, id: HeapId, name: &str) -> Option<&Value> {
        self.instance(id)?.get_named(types, name)
    }

    /// Writes an instance field by name.
    ///
    /// Sealed fields can be written here: only reflective copying is barred
    /// from them.
    pub fn set_field(&mut self, types: &TypeRegistry, id: HeapId, name: &str, value: Value) -> Result<(), CopyError> {
        let instance = self.instance_mut(id).ok_or(CopyError::DanglingReference(id))?;
        let type_name = types.name_of(instance.type_id()).unwrap_or("?");
        let decl = types
            .resolve_field(instance.type_id(), name)
            .ok_or_else(|| CopyError::field_access(type_name, name, FieldAccessReason::UnknownField))?;
        let expected = decl.field_type();
        if !expected.accepts(&value) {
            let reason = FieldAccessReason::TypeMismatch {
                expected,
                found: value.kind_name(),
            };
            return Err(CopyError::field_access(type_name, name, reason));
        }
        let slot = decl.slot();
        if slot.is_some_and(|slot| instance.set_field(slot, value)) {
            Ok(())
        } else {
            Err(CopyError::field_access(type_name, name, FieldAccessReason::MissingSlot))
        }
    }

    /// Reads a static field, falling back to its declared initial value.
    #[must_use]
    pub fn static_field(&self, types: &TypeRegistry, type_id: TypeId, name: &str) -> Option<Value> {
        let (owner, decl) = types.resolve_static(type_id, name)?;
        let stored = self.statics.get(&(owner, Arc::from(name)));
        Some(
            stored
                .or(decl.initial())
                .cloned()
                .unwrap_or_else(|| decl.field_type().zero_value()),
        )
    }

    /// Writes a static field. Every instance of the declaring type shares the value.
    pub fn set_static(&mut self, types: &TypeRegistry, type_id: TypeId, name: &str, value: Value) -> Result<(), CopyError> {
        let type_name = types.name_of(type_id).unwrap_or("?");
        let (owner, decl) = types
            .resolve_static(type_id, name)
            .ok_or_else(|| CopyError::field_access(type_name, name, FieldAccessReason::UnknownField))?;
        let expected = decl.field_type();
        if !expected.accepts(&value) {
            let reason = FieldAccessReason::TypeMismatch {
                expected,
                found: value.kind_name(),
            };
            return Err(CopyError::field_access(type_name, name, reason));
        }
        let key: StaticKey = (owner, Arc::from(name));
        let previous = self.statics.insert(key.clone(), value);
        if self.open_checkpoints > 0 {
            self.static_undo.push((key, previous));
        }
        Ok(())
    }
}

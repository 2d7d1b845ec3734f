//! The deep copy engine.

use std::sync::LazyLock;

use ahash::{AHashMap, AHashSet};

use crate::{
    classify::{CopyKind, classify},
    error::{CopyError, FieldAccessReason},
    heap::{Heap, HeapData, HeapId},
    instantiate::instantiate,
    resource::{LimitedTracker, NoLimitTracker, ResourceLimits, ResourceTracker},
    strategy::Strategies,
    tracer::{CopyTracer, NoopTracer},
    types::{Array, TypeRegistry},
    value::Value,
};

static DEFAULT_COPIER: LazyLock<DeepCopier> = LazyLock::new(DeepCopier::new);

/// Deep-copies `value` with the default strategies and depth cap.
///
/// Returns a value structurally identical to `value` that shares no mutable
/// object with it. Immutable values are returned as they are. Sharing and
/// cycles inside the source graph are reproduced in the copy. On error the
/// heap is left unchanged.
pub fn deep_copy(heap: &mut Heap, types: &TypeRegistry, value: &Value) -> Result<Value, CopyError> {
    DEFAULT_COPIER.deep_copy_with(heap, types, value, NoLimitTracker, &mut NoopTracer)
}

/// A configured copy engine.
///
/// A copier holds no per-copy state: each call builds its own identity map,
/// so one copier can serve any number of threads, each with its own heap.
#[derive(Debug, Clone)]
pub struct DeepCopier {
    strategies: Strategies,
    limits: ResourceLimits,
}

impl Default for DeepCopier {
    fn default() -> Self {
        Self::new()
    }
}

impl DeepCopier {
    /// Creates a copier with the default strategies and [`ResourceLimits::new`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            strategies: Strategies::default(),
            limits: ResourceLimits::new(),
        }
    }

    #[must_use]
    pub fn with_limits(mut self, limits: ResourceLimits) -> Self {
        self.limits = limits;
        self
    }

    #[must_use]
    pub fn with_strategies(mut self, strategies: Strategies) -> Self {
        self.strategies = strategies;
        self
    }

    #[must_use]
    pub fn strategies(&self) -> &Strategies {
        &self.strategies
    }

    pub fn strategies_mut(&mut self) -> &mut Strategies {
        &mut self.strategies
    }

    #[must_use]
    pub fn limits(&self) -> &ResourceLimits {
        &self.limits
    }

    pub fn deep_copy(&self, heap: &mut Heap, types: &TypeRegistry, value: &Value) -> Result<Value, CopyError> {
        self.deep_copy_traced(heap, types, value, &mut NoopTracer)
    }

    /// Like [`deep_copy`](Self::deep_copy), reporting progress to `tracer`.
    pub fn deep_copy_traced<Tr: CopyTracer>(
        &self,
        heap: &mut Heap,
        types: &TypeRegistry,
        value: &Value,
        tracer: &mut Tr,
    ) -> Result<Value, CopyError> {
        let tracker = LimitedTracker::new(self.limits.clone());
        self.deep_copy_with(heap, types, value, tracker, tracer)
    }

    /// Copies `value` using a caller-supplied resource tracker.
    ///
    /// The copier's own limits are ignored; `tracker` alone decides.
    pub fn deep_copy_with<T: ResourceTracker, Tr: CopyTracer>(
        &self,
        heap: &mut Heap,
        types: &TypeRegistry,
        value: &Value,
        tracker: T,
        tracer: &mut Tr,
    ) -> Result<Value, CopyError> {
        let checkpoint = heap.checkpoint();
        let result = CopyContext {
            heap: &mut *heap,
            types,
            strategies: &self.strategies,
            tracker,
            tracer,
            identity: AHashMap::new(),
            buffering: AHashSet::new(),
            depth: 0,
        }
        .copy_value(value);
        match result {
            Ok(_) => heap.commit(checkpoint),
            Err(_) => heap.rollback(checkpoint),
        }
        result
    }
}

/// State of one top-level copy.
pub(crate) struct CopyContext<'a, T: ResourceTracker, Tr: CopyTracer> {
    pub(crate) heap: &'a mut Heap,
    pub(crate) types: &'a TypeRegistry,
    strategies: &'a Strategies,
    tracker: T,
    pub(crate) tracer: &'a mut Tr,
    /// Original object -> its copy. Entries are added before the copy is
    /// populated, so a cycle back to the original resolves to the copy.
    identity: AHashMap<HeapId, HeapId>,
    /// Fixed containers whose elements are being copied; their copy does
    /// not exist yet and cannot be referenced.
    buffering: AHashSet<HeapId>,
    depth: usize,
}

impl<T: ResourceTracker, Tr: CopyTracer> CopyContext<'_, T, Tr> {
    /// Returns the copy of `value`, copying it first if it has not been reached yet.
    pub(crate) fn copy_value(&mut self, value: &Value) -> Result<Value, CopyError> {
        let kind = classify(self.heap, self.types, value)?;
        let Value::Ref(id) = *value else {
            self.tracer.on_immutable(value);
            return Ok(value.clone());
        };
        if kind == CopyKind::Immutable {
            self.tracer.on_immutable(value);
            return Ok(value.clone());
        }
        if let Some(&copy) = self.identity.get(&id) {
            self.tracer.on_identity_hit(id, copy);
            return Ok(Value::Ref(copy));
        }
        if self.buffering.contains(&id) {
            let type_name = self.type_name_of(id);
            return Err(CopyError::ImmutableContainerCycle { type_name });
        }

        self.tracker.check_recursion_depth(self.depth)?;
        self.depth += 1;
        self.tracer.on_enter(kind, self.depth);
        let result = match kind {
            CopyKind::Array => self.copy_array(id),
            CopyKind::SequenceContainer => self.copy_sequence(id),
            CopyKind::AssociativeContainer => self.copy_map(id),
            CopyKind::GenericObject => self.copy_object(id),
            CopyKind::Immutable => Ok(id),
        };
        self.depth -= 1;
        self.tracer.on_exit(self.depth);
        result.map(Value::Ref)
    }

    fn register(&mut self, original: HeapId, copy: HeapId, kind: CopyKind) {
        self.identity.insert(original, copy);
        self.tracer.on_register(original, copy, kind);
    }

    fn allocate(&mut self, data: HeapData) -> Result<HeapId, CopyError> {
        self.tracker.on_allocate()?;
        Ok(self.heap.allocate(data))
    }

    fn type_name_of(&self, id: HeapId) -> String {
        self.heap
            .get(id)
            .and_then(HeapData::type_id)
            .and_then(|type_id| self.types.name_of(type_id))
            .unwrap_or("array")
            .to_owned()
    }

    fn copy_array(&mut self, id: HeapId) -> Result<HeapId, CopyError> {
        let array = self.heap.array(id).ok_or(CopyError::DanglingReference(id))?;
        let component = array.component();
        let items = array.items().to_vec();

        let copy = self.allocate(HeapData::Array(Array::zeroed(component, items.len())))?;
        self.register(id, copy, CopyKind::Array);
        for (index, item) in items.iter().enumerate() {
            let copied = self.copy_value(item)?;
            let array = self.heap.array_mut(copy).ok_or(CopyError::DanglingReference(copy))?;
            if !array.set(index, copied) {
                return Err(CopyError::field_access(
                    "array",
                    &index.to_string(),
                    FieldAccessReason::MissingSlot,
                ));
            }
        }
        Ok(copy)
    }

    fn copy_sequence(&mut self, id: HeapId) -> Result<HeapId, CopyError> {
        let seq = self.heap.sequence(id).ok_or(CopyError::DanglingReference(id))?;
        let type_id = seq.type_id();
        let items = seq.to_vec();

        let types = self.types;
        let strategies = self.strategies;
        let desc = types.get(type_id).ok_or(CopyError::UnknownType(type_id))?;
        let strategy = strategies.sequence_for(desc)?;

        self.tracker.on_allocate()?;
        let mut op = strategy.begin(self.heap, types, type_id, items.len())?;
        let sink = op.sink();
        match sink {
            Some(copy) => self.register(id, copy, CopyKind::SequenceContainer),
            None => {
                self.buffering.insert(id);
            }
        }
        for item in &items {
            let copied = self.copy_value(item)?;
            op.add(self.heap, copied)?;
        }
        let copy = op.finish(self.heap)?;
        if sink.is_none() {
            self.buffering.remove(&id);
            self.register(id, copy, CopyKind::SequenceContainer);
        }
        Ok(copy)
    }

    fn copy_map(&mut self, id: HeapId) -> Result<HeapId, CopyError> {
        let map = self.heap.map(id).ok_or(CopyError::DanglingReference(id))?;
        let type_id = map.type_id();
        let entries: Vec<(Value, Value)> = map.iter().map(|(k, v)| (k.clone(), v.clone())).collect();

        let types = self.types;
        let strategies = self.strategies;
        let desc = types.get(type_id).ok_or(CopyError::UnknownType(type_id))?;
        let strategy = strategies.map_for(desc)?;

        self.tracker.on_allocate()?;
        let mut op = strategy.begin(self.heap, types, type_id, entries.len())?;
        let sink = op.sink();
        match sink {
            Some(copy) => self.register(id, copy, CopyKind::AssociativeContainer),
            None => {
                self.buffering.insert(id);
            }
        }
        for (key, value) in &entries {
            let key = self.copy_value(key)?;
            let value = self.copy_value(value)?;
            op.put(self.heap, key, value)?;
        }
        let copy = op.finish(self.heap)?;
        if sink.is_none() {
            self.buffering.remove(&id);
            self.register(id, copy, CopyKind::AssociativeContainer);
        }
        Ok(copy)
    }

    fn copy_object(&mut self, id: HeapId) -> Result<HeapId, CopyError> {
        let type_id = self
            .heap
            .instance(id)
            .ok_or(CopyError::DanglingReference(id))?
            .type_id();
        let types = self.types;
        let desc = types.get(type_id).ok_or(CopyError::UnknownType(type_id))?;

        self.tracker.on_allocate()?;
        let before = self.heap.len();
        let (data, path) = instantiate(self.heap, types, type_id)?;
        // objects created by the initializer count against the same budget
        for _ in before..self.heap.len() {
            self.tracker.on_allocate()?;
        }
        self.tracer.on_instantiate(desc.name(), path);
        let copy = self.heap.allocate(data);
        self.register(id, copy, CopyKind::GenericObject);
        self.copy_fields(id, copy, type_id)?;
        Ok(copy)
    }
}

use ahash::RandomState;
use indexmap::IndexMap;

use crate::{
    types::{FixedContainerError, MapShape, TypeId},
    value::Value,
};

/// An associative container.
///
/// Keys are hashed by [`Value`] equality, so a `Ref` key is looked up by the
/// identity of the object it names. Entries iterate in insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct Map {
    type_id: TypeId,
    entries: IndexMap<Value, Value, RandomState>,
    fixed: bool,
}

impl Map {
    #[must_use]
    pub fn empty(type_id: TypeId, shape: MapShape) -> Self {
        Self {
            type_id,
            entries: IndexMap::default(),
            fixed: shape == MapShape::Fixed,
        }
    }

    /// Creates a map from `entries`; later duplicates overwrite earlier values.
    #[must_use]
    pub fn from_entries(type_id: TypeId, shape: MapShape, entries: impl IntoIterator<Item = (Value, Value)>) -> Self {
        Self {
            type_id,
            entries: entries.into_iter().collect(),
            fixed: shape == MapShape::Fixed,
        }
    }

    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    #[must_use]
    pub fn shape(&self) -> MapShape {
        if self.fixed { MapShape::Fixed } else { MapShape::Hash }
    }

    #[must_use]
    pub fn is_fixed(&self) -> bool {
        self.fixed
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.entries.get(key)
    }

    #[must_use]
    pub fn contains_key(&self, key: &Value) -> bool {
        self.entries.contains_key(key)
    }

    /// Inserts an entry, returning the value previously stored under `key`.
    pub fn insert(&mut self, key: Value, value: Value) -> Result<Option<Value>, FixedContainerError> {
        if self.fixed {
            return Err(FixedContainerError);
        }
        Ok(self.entries.insert(key, value))
    }

    pub fn remove(&mut self, key: &Value) -> Result<Option<Value>, FixedContainerError> {
        if self.fixed {
            return Err(FixedContainerError);
        }
        Ok(self.entries.shift_remove(key))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Value, &Value)> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &Value> {
        self.entries.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.values()
    }
}

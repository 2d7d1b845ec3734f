use std::fmt;

use ahash::RandomState;
use indexmap::IndexSet;

use crate::{
    types::{SequenceShape, TypeId},
    value::Value,
};

/// Error returned when mutating a container whose storage is fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedContainerError;

impl fmt::Display for FixedContainerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("container is fixed and cannot be modified")
    }
}

impl std::error::Error for FixedContainerError {}

/// Backing storage of a sequence container, chosen by its [`SequenceShape`].
///
/// Sets keep insertion order so iterating a copy visits elements in the same
/// order as the original.
#[derive(Debug, Clone, PartialEq)]
pub enum SequenceStorage {
    List(Vec<Value>),
    Set(IndexSet<Value, RandomState>),
    Fixed(Box<[Value]>),
}

/// A sequence container: list, set, or a fixed view built once.
#[derive(Debug, Clone, PartialEq)]
pub struct Sequence {
    type_id: TypeId,
    storage: SequenceStorage,
}

impl Sequence {
    /// Creates an empty container of the given shape.
    #[must_use]
    pub fn empty(type_id: TypeId, shape: SequenceShape) -> Self {
        let storage = match shape {
            SequenceShape::List => SequenceStorage::List(Vec::new()),
            SequenceShape::Set => SequenceStorage::Set(IndexSet::default()),
            SequenceShape::Fixed => SequenceStorage::Fixed(Box::default()),
        };
        Self { type_id, storage }
    }

    /// Creates a container holding `items`. Sets drop duplicates, keeping the first.
    #[must_use]
    pub fn from_items(type_id: TypeId, shape: SequenceShape, items: impl IntoIterator<Item = Value>) -> Self {
        let storage = match shape {
            SequenceShape::List => SequenceStorage::List(items.into_iter().collect()),
            SequenceShape::Set => SequenceStorage::Set(items.into_iter().collect()),
            SequenceShape::Fixed => SequenceStorage::Fixed(items.into_iter().collect()),
        };
        Self { type_id, storage }
    }

    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    #[must_use]
    pub fn shape(&self) -> SequenceShape {
        match self.storage {
            SequenceStorage::List(_) => SequenceShape::List,
            SequenceStorage::Set(_) => SequenceShape::Set,
            SequenceStorage::Fixed(_) => SequenceShape::Fixed,
        }
    }

    #[must_use]
    pub fn is_fixed(&self) -> bool {
        matches!(self.storage, SequenceStorage::Fixed(_))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match &self.storage {
            SequenceStorage::List(items) => items.len(),
            SequenceStorage::Set(items) => items.len(),
            SequenceStorage::Fixed(items) => items.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the element at `index` in iteration order.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Value> {
        match &self.storage {
            SequenceStorage::List(items) => items.get(index),
            SequenceStorage::Set(items) => items.get_index(index),
            SequenceStorage::Fixed(items) => items.get(index),
        }
    }

    #[must_use]
    pub fn contains(&self, value: &Value) -> bool {
        match &self.storage {
            SequenceStorage::Set(items) => items.contains(value),
            _ => self.iter().any(|item| item == value),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        let slice_iter = match &self.storage {
            SequenceStorage::List(items) => Some(items.iter()),
            SequenceStorage::Fixed(items) => Some(items.iter()),
            SequenceStorage::Set(_) => None,
        };
        let set_iter = match &self.storage {
            SequenceStorage::Set(items) => Some(items.iter()),
            _ => None,
        };
        slice_iter.into_iter().flatten().chain(set_iter.into_iter().flatten())
    }

    /// Appends `value`; sets ignore values they already contain.
    pub fn push(&mut self, value: Value) -> Result<(), FixedContainerError> {
        match &mut self.storage {
            SequenceStorage::List(items) => items.push(value),
            SequenceStorage::Set(items) => {
                items.insert(value);
            }
            SequenceStorage::Fixed(_) => return Err(FixedContainerError),
        }
        Ok(())
    }

    /// Replaces the element at `index` of a list, returning the previous value.
    ///
    /// Fixed views allow element replacement but not resizing; sets do not
    /// support positional writes.
    pub fn set(&mut self, index: usize, value: Value) -> Option<Value> {
        let slot = match &mut self.storage {
            SequenceStorage::List(items) => items.get_mut(index)?,
            SequenceStorage::Fixed(items) => items.get_mut(index)?,
            SequenceStorage::Set(_) => return None,
        };
        Some(std::mem::replace(slot, value))
    }

    /// Removes the first element equal to `value`.
    pub fn remove(&mut self, value: &Value) -> Result<bool, FixedContainerError> {
        match &mut self.storage {
            SequenceStorage::List(items) => match items.iter().position(|item| item == value) {
                Some(index) => {
                    items.remove(index);
                    Ok(true)
                }
                None => Ok(false),
            },
            SequenceStorage::Set(items) => Ok(items.shift_remove(value)),
            SequenceStorage::Fixed(_) => Err(FixedContainerError),
        }
    }

    #[must_use]
    pub fn storage(&self) -> &SequenceStorage {
        &self.storage
    }

    /// Collects the elements into a vector in iteration order.
    #[must_use]
    pub fn to_vec(&self) -> Vec<Value> {
        self.iter().cloned().collect()
    }
}

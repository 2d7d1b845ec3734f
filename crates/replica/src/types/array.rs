use crate::{types::FieldType, value::Value};

/// Fixed-length array with a declared component type.
#[derive(Debug, Clone, PartialEq)]
pub struct Array {
    component: FieldType,
    items: Box<[Value]>,
}

impl Array {
    /// Creates an array from `items`, or `None` if any item does not fit `component`.
    #[must_use]
    pub fn new(component: FieldType, items: Vec<Value>) -> Option<Self> {
        if items.iter().all(|item| component.accepts(item)) {
            Some(Self {
                component,
                items: items.into_boxed_slice(),
            })
        } else {
            None
        }
    }

    /// Creates an array of `len` zero values.
    #[must_use]
    pub fn zeroed(component: FieldType, len: usize) -> Self {
        Self {
            component,
            items: vec![component.zero_value(); len].into_boxed_slice(),
        }
    }

    #[must_use]
    pub fn component(&self) -> FieldType {
        self.component
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.items.get(index)
    }

    /// Stores `value` at `index`.
    ///
    /// Returns false when the index is out of bounds or the value does not fit
    /// the component type; the array is left unchanged in that case.
    pub fn set(&mut self, index: usize, value: Value) -> bool {
        if !self.component.accepts(&value) {
            return false;
        }
        match self.items.get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn items(&self) -> &[Value] {
        &self.items
    }
}

use crate::{
    types::{FieldType, TypeId, TypeRegistry},
    value::Value,
};

/// An object of a class or value-class type.
///
/// Fields live in a flat slot vector laid out by the registry: the slots of
/// the root-most ancestor come first, then each subclass appends its own.
/// Fields that share a name across the hierarchy therefore occupy distinct
/// slots, and reading by name resolves to the most specific declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    type_id: TypeId,
    fields: Vec<Value>,
}

impl Instance {
    /// Creates an instance with every slot at the zero value of its type.
    pub(crate) fn zeroed(type_id: TypeId, slot_types: &[FieldType]) -> Self {
        Self {
            type_id,
            fields: slot_types.iter().map(|ty| ty.zero_value()).collect(),
        }
    }

    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.fields.len()
    }

    /// Returns the value stored in `slot`.
    #[must_use]
    pub fn field(&self, slot: usize) -> Option<&Value> {
        self.fields.get(slot)
    }

    /// Stores `value` in `slot`, returning false if the slot does not exist.
    pub fn set_field(&mut self, slot: usize, value: Value) -> bool {
        match self.fields.get_mut(slot) {
            Some(existing) => {
                *existing = value;
                true
            }
            None => false,
        }
    }

    /// Reads an instance field by name, searching from the most specific type upwards.
    #[must_use]
    pub fn get_named(&self, types: &TypeRegistry, name: &str) -> Option<&Value> {
        let slot = types.resolve_field(self.type_id, name)?.slot()?;
        self.fields.get(slot)
    }

    /// Writes an instance field by name.
    ///
    /// Returns false when no such instance field exists or the value does not
    /// fit its declared type.
    pub fn set_named(&mut self, types: &TypeRegistry, name: &str, value: Value) -> bool {
        let Some(decl) = types.resolve_field(self.type_id, name) else {
            return false;
        };
        match decl.slot() {
            Some(slot) if decl.field_type().accepts(&value) => self.set_field(slot, value),
            _ => false,
        }
    }

    /// Iterates over the raw slot values in layout order.
    pub fn slots(&self) -> impl Iterator<Item = &Value> {
        self.fields.iter()
    }
}

use std::sync::Arc;

use crate::value::Value;

/// Declared storage type of a field or array component.
///
/// Primitive slots can never hold `Null`; their zero value is what a
/// placeholder instance carries until the field copier fills it in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum FieldType {
    Bool,
    Int,
    Float,
    Char,
    /// Reference slot: accepts any value, including `Null`.
    Any,
}

impl FieldType {
    /// Value a slot of this type holds before anything is written to it.
    #[must_use]
    pub fn zero_value(self) -> Value {
        match self {
            Self::Bool => Value::Bool(false),
            Self::Int => Value::Int(0),
            Self::Float => Value::Float(0.0),
            Self::Char => Value::Char('\0'),
            Self::Any => Value::Null,
        }
    }

    /// Returns whether `value` may be stored in a slot of this type.
    #[must_use]
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            Self::Bool => matches!(value, Value::Bool(_)),
            Self::Int => matches!(value, Value::Int(_)),
            Self::Float => matches!(value, Value::Float(_)),
            Self::Char => matches!(value, Value::Char(_)),
            Self::Any => true,
        }
    }
}

/// A field declared directly on one type.
///
/// Instance fields are assigned a slot in the flattened instance layout when
/// their type is registered; static fields never get one.
#[derive(Debug, Clone)]
pub struct FieldDecl {
    name: Arc<str>,
    ty: FieldType,
    is_static: bool,
    /// Access cannot be overridden by reflective copying.
    sealed: bool,
    /// Value assigned by the zero-argument initializer.
    initial: Option<Value>,
    slot: Option<usize>,
}

impl FieldDecl {
    #[must_use]
    pub fn new(name: impl Into<Arc<str>>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            ty,
            is_static: false,
            sealed: false,
            initial: None,
            slot: None,
        }
    }

    /// Marks the field as class-level state shared by every instance.
    #[must_use]
    pub fn into_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Marks the field as inaccessible to reflective copying.
    #[must_use]
    pub fn sealed(mut self) -> Self {
        self.sealed = true;
        self
    }

    /// Sets the value the zero-argument initializer stores in this field.
    #[must_use]
    pub fn with_initial(mut self, value: impl Into<Value>) -> Self {
        self.initial = Some(value.into());
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn field_type(&self) -> FieldType {
        self.ty
    }

    #[must_use]
    pub fn is_static(&self) -> bool {
        self.is_static
    }

    #[must_use]
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    #[must_use]
    pub fn initial(&self) -> Option<&Value> {
        self.initial.as_ref()
    }

    /// Index of this field in the instance layout, `None` for statics.
    #[must_use]
    pub fn slot(&self) -> Option<usize> {
        self.slot
    }

    pub(crate) fn set_slot(&mut self, slot: usize) {
        self.slot = Some(slot);
    }
}

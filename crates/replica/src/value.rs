use std::{
    fmt,
    hash::{Hash, Hasher},
    sync::Arc,
};

use crate::{heap::HeapId, types::TypeId};

/// A constant of a registered enumeration type.
///
/// Enum constants are singletons: two values naming the same type and ordinal
/// are the same constant, which is why the engine never copies them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EnumConstant {
    type_id: TypeId,
    ordinal: u32,
}

impl EnumConstant {
    pub(crate) fn new(type_id: TypeId, ordinal: u32) -> Self {
        Self { type_id, ordinal }
    }

    /// Returns the enumeration type this constant belongs to.
    #[must_use]
    pub fn type_id(self) -> TypeId {
        self.type_id
    }

    /// Returns the declaration index of this constant.
    #[must_use]
    pub fn ordinal(self) -> u32 {
        self.ordinal
    }
}

/// A value stored in a field, array slot or container.
///
/// Every variant except `Ref` is an immediate, immutable value: copying one is
/// the same as sharing it. `Ref` points at a mutable object living in a
/// [`Heap`](crate::Heap), and two refs are equal only when they name the same
/// object.
///
/// Strings are backed by `Arc<str>`, so cloning a `Value::Str` shares the text
/// instead of duplicating it; [`Value::is_same`] observes that sharing.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// The absent value.
    #[default]
    Null,
    Bool(bool),
    /// Any integral scalar (byte, short, int, long).
    Int(i64),
    /// Any floating point scalar.
    Float(f64),
    Char(char),
    Str(Arc<str>),
    Enum(EnumConstant),
    /// Reference to a heap object, compared by identity.
    Ref(HeapId),
}

impl Value {
    /// Creates a string value.
    #[must_use]
    pub fn str(s: impl Into<Arc<str>>) -> Self {
        Self::Str(s.into())
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the referenced heap object, if this is a `Ref`.
    #[must_use]
    pub fn ref_id(&self) -> Option<HeapId> {
        match self {
            Self::Ref(id) => Some(*id),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns true when both values are the very same thing, not merely equal.
    ///
    /// Refs compare by heap identity, strings by backing allocation, and the
    /// remaining scalars by value (they have no identity of their own).
    #[must_use]
    pub fn is_same(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Str(a), Self::Str(b)) => Arc::ptr_eq(a, b),
            _ => self == other,
        }
    }

    /// Short name of the variant, used in error messages.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Char(_) => "char",
            Self::Str(_) => "str",
            Self::Enum(_) => "enum",
            Self::Ref(_) => "ref",
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            // bitwise, so NaN keys can be found again and -0.0 stays distinct
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Char(a), Self::Char(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Enum(a), Self::Enum(b)) => a == b,
            (Self::Ref(a), Self::Ref(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Null => {}
            Self::Bool(b) => b.hash(state),
            Self::Int(i) => i.hash(state),
            Self::Float(f) => f.to_bits().hash(state),
            Self::Char(c) => c.hash(state),
            Self::Str(s) => s.hash(state),
            Self::Enum(e) => e.hash(state),
            Self::Ref(id) => id.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x:?}"),
            Self::Char(c) => write!(f, "{c:?}"),
            Self::Str(s) => write!(f, "{:?}", &**s),
            Self::Enum(e) => write!(f, "enum({}:{})", e.type_id.index(), e.ordinal),
            Self::Ref(id) => write!(f, "{id}"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<char> for Value {
    fn from(c: char) -> Self {
        Self::Char(c)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(Arc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(Arc::from(s))
    }
}

impl From<HeapId> for Value {
    fn from(id: HeapId) -> Self {
        Self::Ref(id)
    }
}

impl From<EnumConstant> for Value {
    fn from(e: EnumConstant) -> Self {
        Self::Enum(e)
    }
}

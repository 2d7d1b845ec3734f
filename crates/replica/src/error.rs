use std::fmt;

use crate::{heap::HeapId, resource::ResourceError, types::FieldType, types::TypeId};

/// Why a field could not be read or written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldAccessReason {
    /// The field's visibility cannot be overridden.
    Sealed,
    /// The object has no storage for a field its type declares.
    MissingSlot,
    TypeMismatch { expected: FieldType, found: &'static str },
    UnknownField,
}

impl fmt::Display for FieldAccessReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sealed => f.write_str("field is sealed"),
            Self::MissingSlot => f.write_str("object has no slot for the field"),
            Self::TypeMismatch { expected, found } => write!(f, "expected {expected}, found {found}"),
            Self::UnknownField => f.write_str("no such field"),
        }
    }
}

/// Error returned by a failed deep copy.
///
/// When a copy fails every object it allocated is discarded, so the heap is
/// left exactly as it was before the call.
#[derive(Debug, Clone, PartialEq)]
pub enum CopyError {
    /// A fresh instance of the type could not be produced.
    Instantiation { type_name: String, reason: String },
    /// A field of a generic object could not be read or written.
    FieldAccess {
        type_name: String,
        field: String,
        reason: FieldAccessReason,
    },
    /// The container has fixed storage and no copy strategy is registered for it.
    UnsupportedContainer { type_name: String },
    /// A fixed container is reachable from its own elements.
    ///
    /// Such a container can only be built after all its elements are copied,
    /// so the copy of an element cannot refer back to it.
    ImmutableContainerCycle { type_name: String },
    Resource(ResourceError),
    /// A `Ref` names an object that is not on the heap.
    DanglingReference(HeapId),
    /// A heap object carries a type id the registry does not know.
    UnknownType(TypeId),
}

impl CopyError {
    pub(crate) fn instantiation(type_name: &str, reason: impl Into<String>) -> Self {
        Self::Instantiation {
            type_name: type_name.to_owned(),
            reason: reason.into(),
        }
    }

    pub(crate) fn field_access(type_name: &str, field: &str, reason: FieldAccessReason) -> Self {
        Self::FieldAccess {
            type_name: type_name.to_owned(),
            field: field.to_owned(),
            reason,
        }
    }

    pub(crate) fn unsupported_container(type_name: &str) -> Self {
        Self::UnsupportedContainer {
            type_name: type_name.to_owned(),
        }
    }
}

impl fmt::Display for CopyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Instantiation { type_name, reason } => {
                write!(f, "cannot instantiate '{type_name}': {reason}")
            }
            Self::FieldAccess {
                type_name,
                field,
                reason,
            } => write!(f, "cannot access field '{type_name}.{field}': {reason}"),
            Self::UnsupportedContainer { type_name } => {
                write!(f, "no copy strategy for fixed container '{type_name}'")
            }
            Self::ImmutableContainerCycle { type_name } => {
                write!(f, "fixed container '{type_name}' contains itself")
            }
            Self::Resource(err) => write!(f, "{err}"),
            Self::DanglingReference(id) => write!(f, "reference {id} does not name a live object"),
            Self::UnknownType(id) => write!(f, "unknown type id {}", id.index()),
        }
    }
}

impl std::error::Error for CopyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Resource(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ResourceError> for CopyError {
    fn from(err: ResourceError) -> Self {
        Self::Resource(err)
    }
}

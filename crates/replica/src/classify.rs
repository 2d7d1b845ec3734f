use crate::{
    error::CopyError,
    heap::{Heap, HeapData},
    types::{TypeKind, TypeRegistry},
    value::Value,
};

/// How the engine copies a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, strum::Display, strum::IntoStaticStr)]
pub enum CopyKind {
    /// Shared by the original and the copy.
    Immutable,
    Array,
    SequenceContainer,
    AssociativeContainer,
    /// Copied field by field after instantiating its type.
    GenericObject,
}

/// Decides how `value` is copied.
///
/// Immediate values, enum constants and instances of value classes are
/// immutable. Everything else is classified by its heap payload, so adding a
/// new container or value type only takes registering it.
pub fn classify(heap: &Heap, types: &TypeRegistry, value: &Value) -> Result<CopyKind, CopyError> {
    let Value::Ref(id) = value else {
        return Ok(CopyKind::Immutable);
    };
    let data = heap.get(*id).ok_or(CopyError::DanglingReference(*id))?;
    Ok(match data {
        HeapData::Array(_) => CopyKind::Array,
        HeapData::Sequence(_) => CopyKind::SequenceContainer,
        HeapData::Map(_) => CopyKind::AssociativeContainer,
        HeapData::Instance(instance) => {
            let desc = types
                .get(instance.type_id())
                .ok_or(CopyError::UnknownType(instance.type_id()))?;
            if desc.kind() == TypeKind::Class {
                CopyKind::GenericObject
            } else {
                CopyKind::Immutable
            }
        }
    })
}

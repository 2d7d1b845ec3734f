//! Producing fresh, unpopulated instances of a type.

use crate::{
    error::CopyError,
    heap::{Heap, HeapData},
    types::{Construct, Instance, Map, Sequence, TypeDescriptor, TypeId, TypeKind, TypeRegistry},
    value::Value,
};

/// Which construction path produced an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::IntoStaticStr)]
pub enum Instantiation {
    /// The type's zero-argument initializer ran, including field defaults.
    Initialized,
    /// Storage was allocated with zeroed fields and no initialization logic.
    Placeholder,
}

/// What an initializer sees while a new instance is being constructed.
///
/// The instance is not on the heap yet. Initializers may allocate new
/// objects and write statics, but should not modify objects that already
/// exist: a failed copy discards everything allocated after it started and
/// restores the statics, and a pre-existing object pointing at a discarded
/// one would be left dangling. Objects allocated here count towards the
/// copy's allocation limit.
pub struct InitContext<'a> {
    heap: &'a mut Heap,
    types: &'a TypeRegistry,
    instance: &'a mut Instance,
}

impl<'a> InitContext<'a> {
    pub fn heap(&mut self) -> &mut Heap {
        self.heap
    }

    /// The registry outlives the context, so it can be held across calls to [`Self::heap`].
    #[must_use]
    pub fn types(&self) -> &'a TypeRegistry {
        self.types
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.instance.get_named(self.types, field)
    }

    /// Writes a field of the instance under construction.
    pub fn set(&mut self, field: &str, value: impl Into<Value>) -> Result<(), String> {
        if self.instance.set_named(self.types, field, value.into()) {
            Ok(())
        } else {
            Err(format!("cannot set field '{field}'"))
        }
    }
}

/// Produces a fresh instance of `type_id`, not yet placed on the heap.
///
/// Classes with a zero-argument construction path get their declared initial
/// values and initializer; classes without one become placeholders whose
/// fields hold the zero value of their type, provided the type permits raw
/// allocation. Containers come out empty.
pub fn instantiate(
    heap: &mut Heap,
    types: &TypeRegistry,
    type_id: TypeId,
) -> Result<(HeapData, Instantiation), CopyError> {
    let desc = types.get(type_id).ok_or(CopyError::UnknownType(type_id))?;
    if desc.kind() == TypeKind::Enum {
        return Err(CopyError::instantiation(desc.name(), "enum constants cannot be created"));
    }
    let path = construction_path(desc)?;
    let data = match desc.kind() {
        TypeKind::Sequence(shape) => HeapData::Sequence(Sequence::empty(type_id, shape)),
        TypeKind::Map(shape) => HeapData::Map(Map::empty(type_id, shape)),
        TypeKind::Class | TypeKind::Value | TypeKind::Enum => {
            let mut instance = Instance::zeroed(type_id, desc.slot_types());
            if path == Instantiation::Initialized {
                apply_initial_values(types, &mut instance);
            }
            if let Construct::Initializer(init) = desc.construct() {
                let mut cx = InitContext {
                    heap,
                    types,
                    instance: &mut instance,
                };
                init(&mut cx).map_err(|reason| CopyError::instantiation(desc.name(), reason))?;
            }
            HeapData::Instance(instance)
        }
    };
    Ok((data, path))
}

fn construction_path(desc: &TypeDescriptor) -> Result<Instantiation, CopyError> {
    match desc.construct() {
        Construct::Default | Construct::Initializer(_) => Ok(Instantiation::Initialized),
        Construct::None if desc.is_allocatable() => Ok(Instantiation::Placeholder),
        Construct::None => Err(CopyError::instantiation(
            desc.name(),
            "no zero-argument initializer and raw allocation is not permitted",
        )),
    }
}

/// Applies declared initial values, root-most type first so overriding
/// declarations in subclasses run last.
fn apply_initial_values(types: &TypeRegistry, instance: &mut Instance) {
    for type_id in types.ancestors(instance.type_id()).into_iter().rev() {
        let Some(desc) = types.get(type_id) else { continue };
        for field in desc.fields() {
            if let (Some(slot), Some(initial)) = (field.slot(), field.initial()) {
                instance.set_field(slot, initial.clone());
            }
        }
    }
}

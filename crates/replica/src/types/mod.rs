//! The managed object model: type descriptors and the payloads of heap objects.

mod array;
mod field;
mod instance;
mod map;
mod registry;
mod sequence;

pub use array::Array;
pub use field::{FieldDecl, FieldType};
pub use instance::Instance;
pub use map::Map;
pub use registry::{
    Construct, Initializer, MapShape, RegistryError, SequenceShape, TypeDef, TypeDescriptor, TypeId, TypeKind,
    TypeRegistry,
};
pub use sequence::{FixedContainerError, Sequence, SequenceStorage};

use std::{fmt, sync::Arc};

use ahash::AHashMap;
use smallvec::SmallVec;

use crate::{
    instantiate::InitContext,
    types::{FieldDecl, FieldType},
    value::EnumConstant,
};

/// Index of a type in a [`TypeRegistry`].
///
/// The built-in types are registered first, in a fixed order, so their ids
/// are available as associated constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(usize);

impl TypeId {
    /// The implicit root of every class hierarchy.
    pub const OBJECT: Self = Self(0);
    pub const ARRAY_LIST: Self = Self(1);
    pub const LINKED_LIST: Self = Self(2);
    pub const ARRAY_DEQUE: Self = Self(3);
    pub const HASH_SET: Self = Self(4);
    pub const LINKED_HASH_SET: Self = Self(5);
    /// Fixed-size list view with no zero-argument initializer.
    pub const FROZEN_LIST: Self = Self(6);
    pub const HASH_MAP: Self = Self(7);
    pub const LINKED_HASH_MAP: Self = Self(8);
    pub const FROZEN_MAP: Self = Self(9);

    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// How the elements of a sequence container are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum SequenceShape {
    /// Ordered, growable, allows duplicates.
    List,
    /// Insertion-ordered, no duplicates.
    Set,
    /// Built once from its elements and never resized.
    Fixed,
}

/// How the entries of an associative container are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum MapShape {
    Hash,
    Fixed,
}

/// The broad category of a registered type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::IntoStaticStr)]
pub enum TypeKind {
    /// Mutable class whose instances are copied field by field.
    Class,
    /// Class whose instances are immutable and shared instead of copied.
    Value,
    /// Enumeration; its constants are singletons.
    Enum,
    Sequence(SequenceShape),
    Map(MapShape),
}

impl TypeKind {
    fn has_fields(self) -> bool {
        matches!(self, Self::Class | Self::Value)
    }
}

/// User code run after the default field values have been applied.
pub type Initializer = Arc<dyn Fn(&mut InitContext<'_>) -> Result<(), String> + Send + Sync>;

/// How a fresh instance of a type is brought into existence.
#[derive(Clone, Default)]
pub enum Construct {
    /// Zero-argument construction: declared initial values are applied.
    #[default]
    Default,
    /// Zero-argument construction followed by an initializer.
    Initializer(Initializer),
    /// No zero-argument construction is available.
    None,
}

impl fmt::Debug for Construct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("Default"),
            Self::Initializer(_) => f.write_str("Initializer(..)"),
            Self::None => f.write_str("None"),
        }
    }
}

/// Error returned when a [`TypeDef`] cannot be registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    DuplicateType(String),
    UnknownParent { type_name: String, parent: TypeId },
    /// Only classes and value classes can be extended.
    ParentNotClass { type_name: String, parent: String },
    DuplicateField { type_name: String, field: String },
    /// The definition combines features its kind does not support.
    InvalidDefinition { type_name: String, reason: &'static str },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateType(name) => write!(f, "type '{name}' is already registered"),
            Self::UnknownParent { type_name, parent } => {
                write!(f, "type '{type_name}' extends unknown type id {}", parent.index())
            }
            Self::ParentNotClass { type_name, parent } => {
                write!(f, "type '{type_name}' cannot extend '{parent}': not a class")
            }
            Self::DuplicateField { type_name, field } => {
                write!(f, "type '{type_name}' declares '{field}' more than once")
            }
            Self::InvalidDefinition { type_name, reason } => write!(f, "invalid type '{type_name}': {reason}"),
        }
    }
}

impl std::error::Error for RegistryError {}

/// Definition of a type, consumed by [`TypeRegistry::register`].
#[derive(Debug, Clone)]
pub struct TypeDef {
    name: Arc<str>,
    kind: TypeKind,
    parent: Option<TypeId>,
    fields: Vec<FieldDecl>,
    construct: Construct,
    allocatable: bool,
    constants: Vec<Arc<str>>,
}

impl TypeDef {
    fn new(name: impl Into<Arc<str>>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            parent: None,
            fields: Vec::new(),
            construct: Construct::Default,
            allocatable: true,
            constants: Vec::new(),
        }
    }

    /// A mutable class.
    #[must_use]
    pub fn class(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, TypeKind::Class)
    }

    /// A class whose instances are immutable and therefore shared by copies.
    #[must_use]
    pub fn value(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, TypeKind::Value)
    }

    #[must_use]
    pub fn enumeration<S: Into<Arc<str>>>(name: impl Into<Arc<str>>, constants: impl IntoIterator<Item = S>) -> Self {
        let mut def = Self::new(name, TypeKind::Enum);
        def.constants = constants.into_iter().map(Into::into).collect();
        def.construct = Construct::None;
        def.allocatable = false;
        def
    }

    #[must_use]
    pub fn sequence(name: impl Into<Arc<str>>, shape: SequenceShape) -> Self {
        Self::new(name, TypeKind::Sequence(shape))
    }

    #[must_use]
    pub fn map(name: impl Into<Arc<str>>, shape: MapShape) -> Self {
        Self::new(name, TypeKind::Map(shape))
    }

    #[must_use]
    pub fn extends(mut self, parent: TypeId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Declares a plain instance field.
    #[must_use]
    pub fn field(self, name: impl Into<Arc<str>>, ty: FieldType) -> Self {
        self.with_field(FieldDecl::new(name, ty))
    }

    #[must_use]
    pub fn with_field(mut self, field: FieldDecl) -> Self {
        self.fields.push(field);
        self
    }

    /// Runs `init` after the default field values whenever the type is constructed.
    #[must_use]
    pub fn initializer(mut self, init: impl Fn(&mut InitContext<'_>) -> Result<(), String> + Send + Sync + 'static) -> Self {
        self.construct = Construct::Initializer(Arc::new(init));
        self
    }

    /// Removes the zero-argument construction path.
    ///
    /// Copies of such types are created as placeholders unless the type is
    /// also marked [`not_allocatable`](Self::not_allocatable).
    #[must_use]
    pub fn without_default_constructor(mut self) -> Self {
        self.construct = Construct::None;
        self
    }

    /// Forbids placeholder construction.
    #[must_use]
    pub fn not_allocatable(mut self) -> Self {
        self.allocatable = false;
        self
    }
}

/// A registered type.
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    id: TypeId,
    name: Arc<str>,
    kind: TypeKind,
    parent: Option<TypeId>,
    fields: Vec<FieldDecl>,
    construct: Construct,
    allocatable: bool,
    /// Field type of every slot in the flattened instance layout.
    slot_types: Vec<FieldType>,
    constants: Vec<Arc<str>>,
}

impl TypeDescriptor {
    #[must_use]
    pub fn id(&self) -> TypeId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    /// Direct parent type, `None` only for the root.
    #[must_use]
    pub fn parent(&self) -> Option<TypeId> {
        self.parent
    }

    /// Fields declared directly on this type, statics included.
    #[must_use]
    pub fn fields(&self) -> &[FieldDecl] {
        &self.fields
    }

    #[must_use]
    pub fn construct(&self) -> &Construct {
        &self.construct
    }

    #[must_use]
    pub fn is_allocatable(&self) -> bool {
        self.allocatable
    }

    /// Whether instances of this type are shared rather than copied.
    #[must_use]
    pub fn is_immutable(&self) -> bool {
        matches!(self.kind, TypeKind::Value | TypeKind::Enum)
    }

    #[must_use]
    pub fn slot_types(&self) -> &[FieldType] {
        &self.slot_types
    }

    /// Names of the constants of an enumeration, in ordinal order.
    #[must_use]
    pub fn constants(&self) -> &[Arc<str>] {
        &self.constants
    }
}

/// The store of type descriptors every heap object refers to.
///
/// A new registry already contains `Object` and the built-in container
/// types; see the constants on [`TypeId`].
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    types: Vec<TypeDescriptor>,
    by_name: AHashMap<Arc<str>, TypeId>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    #[must_use]
    pub fn new() -> Self {
        let mut registry = Self {
            types: Vec::new(),
            by_name: AHashMap::new(),
        };
        registry.push(TypeDef::class("Object"), None, Vec::new());
        let builtins = [
            TypeDef::sequence("ArrayList", SequenceShape::List),
            TypeDef::sequence("LinkedList", SequenceShape::List),
            TypeDef::sequence("ArrayDeque", SequenceShape::List),
            TypeDef::sequence("HashSet", SequenceShape::Set),
            TypeDef::sequence("LinkedHashSet", SequenceShape::Set),
            TypeDef::sequence("FrozenList", SequenceShape::Fixed).without_default_constructor(),
            TypeDef::map("HashMap", MapShape::Hash),
            TypeDef::map("LinkedHashMap", MapShape::Hash),
            TypeDef::map("FrozenMap", MapShape::Fixed).without_default_constructor(),
        ];
        for def in builtins {
            registry.push(def, Some(TypeId::OBJECT), Vec::new());
        }
        debug_assert_eq!(registry.lookup("FrozenMap"), Some(TypeId::FROZEN_MAP));
        registry
    }

    /// Registers a new type and returns its id.
    ///
    /// Instance fields are laid out after the slots of the parent, in
    /// declaration order.
    pub fn register(&mut self, mut def: TypeDef) -> Result<TypeId, RegistryError> {
        if self.by_name.contains_key(&def.name) {
            return Err(RegistryError::DuplicateType(def.name.to_string()));
        }
        let invalid = |reason| RegistryError::InvalidDefinition {
            type_name: def.name.to_string(),
            reason,
        };
        if !def.kind.has_fields() {
            if !def.fields.is_empty() {
                return Err(invalid("only classes can declare fields"));
            }
            if def.parent.is_some_and(|parent| parent != TypeId::OBJECT) {
                return Err(invalid("only classes can extend another type"));
            }
            if matches!(def.construct, Construct::Initializer(_)) {
                return Err(invalid("only classes can have an initializer"));
            }
        }

        let parent = def.parent.unwrap_or(TypeId::OBJECT);
        let parent_desc = self.get(parent).ok_or_else(|| RegistryError::UnknownParent {
            type_name: def.name.to_string(),
            parent,
        })?;
        if !parent_desc.kind.has_fields() {
            return Err(RegistryError::ParentNotClass {
                type_name: def.name.to_string(),
                parent: parent_desc.name.to_string(),
            });
        }

        for (i, field) in def.fields.iter().enumerate() {
            if def.fields[..i].iter().any(|earlier| earlier.name() == field.name()) {
                return Err(RegistryError::DuplicateField {
                    type_name: def.name.to_string(),
                    field: field.name().to_owned(),
                });
            }
        }
        for (i, constant) in def.constants.iter().enumerate() {
            if def.constants[..i].contains(constant) {
                return Err(RegistryError::DuplicateField {
                    type_name: def.name.to_string(),
                    field: constant.to_string(),
                });
            }
        }

        let mut slot_types = parent_desc.slot_types.clone();
        for field in def.fields.iter_mut().filter(|field| !field.is_static()) {
            field.set_slot(slot_types.len());
            slot_types.push(field.field_type());
        }
        Ok(self.push(def, Some(parent), slot_types))
    }

    fn push(&mut self, def: TypeDef, parent: Option<TypeId>, slot_types: Vec<FieldType>) -> TypeId {
        let id = TypeId(self.types.len());
        self.by_name.insert(def.name.clone(), id);
        self.types.push(TypeDescriptor {
            id,
            name: def.name,
            kind: def.kind,
            parent,
            fields: def.fields,
            construct: def.construct,
            allocatable: def.allocatable,
            slot_types,
            constants: def.constants,
        });
        id
    }

    #[must_use]
    pub fn get(&self, id: TypeId) -> Option<&TypeDescriptor> {
        self.types.get(id.index())
    }

    /// Finds a type by its canonical name.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<TypeId> {
        self.by_name.get(name).copied()
    }

    #[must_use]
    pub fn name_of(&self, id: TypeId) -> Option<&str> {
        self.get(id).map(TypeDescriptor::name)
    }

    /// Number of registered types, built-ins included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Returns `id` and its ancestors, most specific first, without the root.
    ///
    /// Unknown ids yield an empty chain.
    #[must_use]
    pub fn ancestors(&self, id: TypeId) -> SmallVec<[TypeId; 8]> {
        let mut chain = SmallVec::new();
        let mut current = Some(id);
        while let Some(type_id) = current {
            if type_id == TypeId::OBJECT {
                break;
            }
            let Some(desc) = self.get(type_id) else { break };
            chain.push(type_id);
            current = desc.parent;
        }
        chain
    }

    /// Finds the instance field `name` visible on `id`, searching the most specific type first.
    #[must_use]
    pub fn resolve_field(&self, id: TypeId, name: &str) -> Option<&FieldDecl> {
        self.ancestors(id).into_iter().find_map(|type_id| {
            self.get(type_id)?
                .fields
                .iter()
                .find(|field| !field.is_static() && field.name() == name)
        })
    }

    /// Finds the static field `name` visible on `id` and the type that declares it.
    #[must_use]
    pub fn resolve_static(&self, id: TypeId, name: &str) -> Option<(TypeId, &FieldDecl)> {
        self.ancestors(id).into_iter().find_map(|type_id| {
            self.get(type_id)?
                .fields
                .iter()
                .find(|field| field.is_static() && field.name() == name)
                .map(|field| (type_id, field))
        })
    }

    /// Returns the constant `name` of the enumeration `id`.
    #[must_use]
    pub fn enum_constant(&self, id: TypeId, name: &str) -> Option<EnumConstant> {
        let desc = self.get(id)?;
        let ordinal = desc.constants.iter().position(|constant| &**constant == name)?;
        Some(EnumConstant::new(id, u32::try_from(ordinal).ok()?))
    }

    /// Returns the name of an enumeration constant.
    #[must_use]
    pub fn constant_name(&self, constant: EnumConstant) -> Option<&str> {
        let desc = self.get(constant.type_id())?;
        desc.constants.get(constant.ordinal() as usize).map(|name| &**name)
    }
}

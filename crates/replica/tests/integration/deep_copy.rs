//! Tests for copying single values and composite objects.
//!
//! Covers the basic guarantees of `deep_copy`: immutable values are shared,
//! everything mutable is duplicated, and the copy is independent of the
//! original afterwards.

use pretty_assertions::assert_eq;
use replica::{
    CopyError, FieldType, Heap, TypeDef, TypeId, TypeRegistry, Value, deep_copy, types::FieldDecl,
};

use crate::common::{assert_isomorphic, assert_no_shared_mutable, id_of, model};

// =============================================================================
// 1. Immutable values
// =============================================================================

/// Null is returned unchanged and allocates nothing.
#[test]
fn null_copies_to_null() {
    let types = TypeRegistry::new();
    let mut heap = Heap::new();
    assert_eq!(deep_copy(&mut heap, &types, &Value::Null), Ok(Value::Null));
    assert!(heap.is_empty());
}

/// Strings, scalars and enum constants are shared with the copy.
#[test]
fn immediates_are_returned_as_is() {
    let m = model();
    let mut heap = Heap::new();
    let red = m.types.enum_constant(m.color, "Red").unwrap();
    let values = [
        Value::str("Test String"),
        Value::Int(42),
        Value::Bool(true),
        Value::Float(1.5),
        Value::Char('x'),
        Value::Enum(red),
    ];
    for value in &values {
        let copy = deep_copy(&mut heap, &m.types, value).unwrap();
        assert!(copy.is_same(value), "{value} should be shared, got {copy}");
    }
    assert!(heap.is_empty());
}

/// Instances of value classes are immutable, so the copy is the same object.
#[test]
fn value_class_instances_are_shared() {
    let m = model();
    let mut heap = Heap::new();
    let price = heap.new_object(&m.types, m.money).unwrap();
    heap.set_field(&m.types, price, "cents", Value::Int(1999)).unwrap();

    let copy = deep_copy(&mut heap, &m.types, &Value::Ref(price)).unwrap();
    assert_eq!(copy, Value::Ref(price));
    assert_eq!(heap.len(), 1);
}

/// A value class reachable from a mutable object is shared by both graphs.
#[test]
fn value_class_fields_point_at_the_same_instance() {
    let mut types = TypeRegistry::new();
    let money = types.register(TypeDef::value("Money").field("cents", FieldType::Int)).unwrap();
    let order = types.register(TypeDef::class("Order").field("total", FieldType::Any)).unwrap();
    let mut heap = Heap::new();
    let total = heap.new_object(&types, money).unwrap();
    let original = heap.new_object(&types, order).unwrap();
    heap.set_field(&types, original, "total", Value::Ref(total)).unwrap();

    let copy = id_of(&deep_copy(&mut heap, &types, &Value::Ref(original)).unwrap());
    assert_ne!(copy, original);
    assert_eq!(heap.field(&types, copy, "total"), Some(&Value::Ref(total)));
}

// =============================================================================
// 2. Arrays
// =============================================================================

/// Integer arrays are copied element by element and become independent.
#[test]
fn integer_array_is_copied() {
    let types = TypeRegistry::new();
    let mut heap = Heap::new();
    let items = (1..=5).map(Value::Int).collect();
    let original = heap.new_array(FieldType::Int, items).unwrap();

    let copy = id_of(&deep_copy(&mut heap, &types, &Value::Ref(original)).unwrap());
    assert_ne!(copy, original);
    assert_eq!(heap.array(copy).unwrap().items(), heap.array(original).unwrap().items());
    assert_eq!(heap.array(copy).unwrap().component(), FieldType::Int);

    assert!(heap.array_mut(original).unwrap().set(0, Value::Int(99)));
    assert_eq!(heap.array(copy).unwrap().get(0), Some(&Value::Int(1)));
}

/// Arrays of references get copies of the referenced objects.
#[test]
fn object_array_copies_its_elements() {
    let m = model();
    let mut heap = Heap::new();
    let john = m.man(&mut heap, "John", 30);
    let jane = m.man(&mut heap, "Jane", 28);
    let original = heap
        .new_array(FieldType::Any, vec![Value::Ref(john), Value::Null, Value::Ref(jane)])
        .unwrap();
    let root = Value::Ref(original);

    let copy = deep_copy(&mut heap, &m.types, &root).unwrap();
    assert_isomorphic(&heap, &m.types, &root, &copy);
    assert_no_shared_mutable(&heap, &m.types, &root, &copy);

    let first = id_of(heap.array(id_of(&copy)).unwrap().get(0).unwrap());
    m.set(&mut heap, john, "name", Value::str("Johnny"));
    assert_eq!(m.get(&heap, first, "name"), &Value::str("John"));
}

// =============================================================================
// 3. Generic objects
// =============================================================================

/// A simple object keeps its field values and is independent afterwards.
#[test]
fn simple_object_is_copied() {
    let m = model();
    let mut heap = Heap::new();
    let original = m.reader(&mut heap, "John Doe", 30, &["1984", "Brave New World"]);
    let root = Value::Ref(original);

    let copy = id_of(&deep_copy(&mut heap, &m.types, &root).unwrap());
    assert_ne!(copy, original);
    assert_eq!(m.get(&heap, copy, "name"), &Value::str("John Doe"));
    assert_eq!(m.get(&heap, copy, "age"), &Value::Int(30));
    let books = m.get_ref(&heap, copy, "favorite_books");
    assert_ne!(books, m.get_ref(&heap, original, "favorite_books"));
    assert_eq!(
        heap.sequence(books).unwrap().to_vec(),
        vec![Value::str("1984"), Value::str("Brave New World")]
    );

    m.set(&mut heap, original, "name", Value::str("Jane Doe"));
    m.set(&mut heap, original, "age", Value::Int(25));
    assert_eq!(m.get(&heap, copy, "name"), &Value::str("John Doe"));
    assert_eq!(m.get(&heap, copy, "age"), &Value::Int(30));
}

/// Types without a zero-argument initializer are still copied, as placeholders.
#[test]
fn types_without_default_constructor_are_copied() {
    let mut types = TypeRegistry::new();
    let token = types
        .register(
            TypeDef::class("Token")
                .with_field(FieldDecl::new("secret", FieldType::Any).with_initial("default"))
                .field("uses", FieldType::Int)
                .without_default_constructor(),
        )
        .unwrap();
    let mut heap = Heap::new();
    let original = heap.new_object(&types, token).unwrap();
    assert_eq!(heap.field(&types, original, "secret"), Some(&Value::Null));
    heap.set_field(&types, original, "secret", Value::str("s3cr3t")).unwrap();
    heap.set_field(&types, original, "uses", Value::Int(3)).unwrap();

    let copy = id_of(&deep_copy(&mut heap, &types, &Value::Ref(original)).unwrap());
    assert_eq!(heap.field(&types, copy, "secret"), Some(&Value::str("s3cr3t")));
    assert_eq!(heap.field(&types, copy, "uses"), Some(&Value::Int(3)));
}

/// Fields written by an initializer are overwritten with the original's values.
#[test]
fn copied_fields_override_initializer_results() {
    let mut types = TypeRegistry::new();
    let session = types
        .register(
            TypeDef::class("Session")
                .field("log", FieldType::Any)
                .field("opened", FieldType::Bool)
                .initializer(|cx| {
                    let types = cx.types();
                    let log = cx.heap().new_sequence(types, TypeId::ARRAY_LIST, []);
                    let log = log.map_err(|err| err.to_string())?;
                    cx.set("log", Value::Ref(log))?;
                    cx.set("opened", true)
                }),
        )
        .unwrap();
    let mut heap = Heap::new();
    let original = heap.new_object(&types, session).unwrap();
    let log = heap.field(&types, original, "log").and_then(Value::ref_id).unwrap();
    heap.sequence_mut(log).unwrap().push(Value::str("login")).unwrap();
    heap.set_field(&types, original, "opened", Value::Bool(false)).unwrap();

    let copy = id_of(&deep_copy(&mut heap, &types, &Value::Ref(original)).unwrap());
    let copied_log = heap.field(&types, copy, "log").and_then(Value::ref_id).unwrap();
    assert_ne!(copied_log, log);
    assert_eq!(heap.sequence(copied_log).unwrap().to_vec(), vec![Value::str("login")]);
    assert_eq!(heap.field(&types, copy, "opened"), Some(&Value::Bool(false)));
}

/// Fields declared on every level of the hierarchy are copied.
#[test]
fn inherited_private_fields_are_copied() {
    let mut types = TypeRegistry::new();
    let animal = types.register(TypeDef::class("Animal").field("legs", FieldType::Int)).unwrap();
    let dog = types
        .register(TypeDef::class("Dog").extends(animal).field("name", FieldType::Any))
        .unwrap();
    let puppy = types
        .register(TypeDef::class("Puppy").extends(dog).field("toys", FieldType::Any))
        .unwrap();
    let mut heap = Heap::new();
    let toys = heap.new_sequence(&types, TypeId::HASH_SET, [Value::str("ball")]).unwrap();
    let original = heap.new_object(&types, puppy).unwrap();
    heap.set_field(&types, original, "legs", Value::Int(4)).unwrap();
    heap.set_field(&types, original, "name", Value::str("Rex")).unwrap();
    heap.set_field(&types, original, "toys", Value::Ref(toys)).unwrap();
    let root = Value::Ref(original);

    let copy = deep_copy(&mut heap, &types, &root).unwrap();
    assert_isomorphic(&heap, &types, &root, &copy);
    assert_no_shared_mutable(&heap, &types, &root, &copy);
    assert_eq!(heap.field(&types, id_of(&copy), "legs"), Some(&Value::Int(4)));
}

// =============================================================================
// 4. Failures
// =============================================================================

/// Types that can be neither constructed nor allocated raw fail the copy.
#[test]
fn closed_types_fail_with_instantiation_error() {
    let mut types = TypeRegistry::new();
    let closed = types
        .register(TypeDef::class("Socket").without_default_constructor().not_allocatable())
        .unwrap();
    let holder = types.register(TypeDef::class("Holder").field("socket", FieldType::Any)).unwrap();
    let mut heap = Heap::new();
    assert!(heap.new_object(&types, closed).is_err());
    let socket = heap.new_native_object(&types, closed).unwrap();
    let original = heap.new_object(&types, holder).unwrap();
    heap.set_field(&types, original, "socket", Value::Ref(socket)).unwrap();
    let before = heap.stats();

    let err = deep_copy(&mut heap, &types, &Value::Ref(original)).unwrap_err();
    assert!(
        matches!(&err, CopyError::Instantiation { type_name, .. } if type_name == "Socket"),
        "unexpected error: {err}"
    );
    assert_eq!(heap.stats(), before);
}

/// A reference to an object that is not on the heap is reported, not followed.
#[test]
fn dangling_reference_is_reported() {
    let types = TypeRegistry::new();
    let mut heap = Heap::new();
    let list = heap.new_sequence(&types, TypeId::ARRAY_LIST, []).unwrap();
    let missing = {
        let mut other = Heap::new();
        for _ in 0..5 {
            other.new_sequence(&types, TypeId::ARRAY_LIST, []).unwrap();
        }
        other.new_sequence(&types, TypeId::ARRAY_LIST, []).unwrap()
    };
    heap.sequence_mut(list).unwrap().push(Value::Ref(missing)).unwrap();

    assert_eq!(
        deep_copy(&mut heap, &types, &Value::Ref(list)),
        Err(CopyError::DanglingReference(missing))
    );
    assert_eq!(heap.len(), 1);
}

/// Two copies of the same graph are independent of each other.
#[test]
fn repeated_copies_are_distinct() {
    let m = model();
    let mut heap = Heap::new();
    let original = Value::Ref(m.reader(&mut heap, "John", 30, &["Dune"]));

    let first = deep_copy(&mut heap, &m.types, &original).unwrap();
    let second = deep_copy(&mut heap, &m.types, &original).unwrap();
    assert_no_shared_mutable(&heap, &m.types, &first, &second);
    assert_isomorphic(&heap, &m.types, &first, &second);
    assert_ne!(id_of(&first), id_of(&second));
}

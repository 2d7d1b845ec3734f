//! Tests for copying sequence and associative containers.

use pretty_assertions::assert_eq;
use replica::{
    CopyError, DeepCopier, Heap, TypeDef, TypeId, Value,
    strategy::BufferedSequence,
    types::{FixedContainerError, SequenceShape},
};

use crate::common::{assert_isomorphic, assert_no_shared_mutable, id_of, model};

// =============================================================================
// 1. Sequences
// =============================================================================

/// A list copy keeps its elements and does not see later changes to the original.
#[test]
fn array_list_is_independent_after_copy() {
    let m = model();
    let mut heap = Heap::new();
    let original = m.list(&mut heap, ["A", "B", "C"].map(Value::str));

    let copy = id_of(&replica::deep_copy(&mut heap, &m.types, &Value::Ref(original)).unwrap());
    assert_ne!(copy, original);
    assert_eq!(heap.sequence(copy).unwrap().to_vec(), ["A", "B", "C"].map(Value::str));

    let list = heap.sequence_mut(original).unwrap();
    list.push(Value::str("D")).unwrap();
    list.set(0, Value::str("X")).unwrap();
    assert_eq!(heap.sequence(copy).unwrap().len(), 3);
    assert_eq!(heap.sequence(copy).unwrap().get(0), Some(&Value::str("A")));
}

/// Set copies keep membership and iteration order.
#[test]
fn hash_set_is_independent_after_copy() {
    let m = model();
    let mut heap = Heap::new();
    let original = heap
        .new_sequence(&m.types, TypeId::HASH_SET, [1, 2, 3].map(Value::Int))
        .unwrap();

    let copy = id_of(&replica::deep_copy(&mut heap, &m.types, &Value::Ref(original)).unwrap());
    assert_eq!(heap.sequence(copy).unwrap().to_vec(), [1, 2, 3].map(Value::Int));
    assert_eq!(heap.sequence(copy).unwrap().shape(), SequenceShape::Set);

    let set = heap.sequence_mut(original).unwrap();
    set.push(Value::Int(4)).unwrap();
    assert!(set.remove(&Value::Int(1)).unwrap());
    let copied = heap.sequence(copy).unwrap();
    assert!(copied.contains(&Value::Int(1)));
    assert!(!copied.contains(&Value::Int(4)));
}

/// Every built-in growable sequence type keeps its type through a copy.
#[test]
fn builtin_sequences_keep_their_type() {
    let m = model();
    let mut heap = Heap::new();
    for type_id in [TypeId::LINKED_LIST, TypeId::ARRAY_DEQUE, TypeId::LINKED_HASH_SET] {
        let original = heap.new_sequence(&m.types, type_id, [Value::Int(1)]).unwrap();
        let copy = id_of(&replica::deep_copy(&mut heap, &m.types, &Value::Ref(original)).unwrap());
        assert_eq!(heap.sequence(copy).unwrap().type_id(), type_id);
    }
}

/// Frozen lists are rebuilt by the buffered strategy and stay fixed.
#[test]
fn frozen_list_copy_stays_fixed() {
    let m = model();
    let mut heap = Heap::new();
    let john = m.man(&mut heap, "John", 30);
    let original = heap
        .new_sequence(&m.types, TypeId::FROZEN_LIST, [Value::Ref(john), Value::str("x")])
        .unwrap();
    let root = Value::Ref(original);

    let copy = replica::deep_copy(&mut heap, &m.types, &root).unwrap();
    assert_isomorphic(&heap, &m.types, &root, &copy);
    assert_no_shared_mutable(&heap, &m.types, &root, &copy);
    let copied = heap.sequence_mut(id_of(&copy)).unwrap();
    assert!(copied.is_fixed());
    assert_eq!(copied.push(Value::Null), Err(FixedContainerError));
}

/// A user-defined fixed container is refused until a strategy is registered for it.
#[test]
fn custom_fixed_container_needs_a_strategy() {
    let mut m = model();
    let bag = m.types.register(TypeDef::sequence("ImmutableBag", SequenceShape::Fixed)).unwrap();
    let mut heap = Heap::new();
    let original = heap.new_sequence(&m.types, bag, [Value::Int(1), Value::Int(2)]).unwrap();
    let root = Value::Ref(original);

    let mut copier = DeepCopier::new();
    assert_eq!(
        copier.deep_copy(&mut heap, &m.types, &root),
        Err(CopyError::UnsupportedContainer {
            type_name: "ImmutableBag".to_owned()
        })
    );
    assert_eq!(heap.len(), 1);

    copier.strategies_mut().register_sequence("ImmutableBag", BufferedSequence);
    let copy = id_of(&copier.deep_copy(&mut heap, &m.types, &root).unwrap());
    let copied = heap.sequence(copy).unwrap();
    assert_eq!(copied.type_id(), bag);
    assert!(copied.is_fixed());
    assert_eq!(copied.to_vec(), vec![Value::Int(1), Value::Int(2)]);
}

// =============================================================================
// 2. Maps
// =============================================================================

/// A map copy keeps its entries and does not see later puts on the original.
#[test]
fn hash_map_is_independent_after_copy() {
    let m = model();
    let mut heap = Heap::new();
    let original = heap
        .new_map(
            &m.types,
            TypeId::HASH_MAP,
            [(Value::str("A"), Value::Int(1)), (Value::str("B"), Value::Int(2))],
        )
        .unwrap();

    let copy = id_of(&replica::deep_copy(&mut heap, &m.types, &Value::Ref(original)).unwrap());
    heap.map_mut(original).unwrap().insert(Value::str("C"), Value::Int(3)).unwrap();

    let copied = heap.map(copy).unwrap();
    assert_eq!(copied.len(), 2);
    assert_eq!(copied.get(&Value::str("A")), Some(&Value::Int(1)));
    assert!(!copied.contains_key(&Value::str("C")));
}

/// Linked maps iterate their copy in the original insertion order.
#[test]
fn linked_hash_map_keeps_insertion_order() {
    let m = model();
    let mut heap = Heap::new();
    let entries = ["zeta", "alpha", "mu"].map(|key| (Value::str(key), Value::Null));
    let original = heap.new_map(&m.types, TypeId::LINKED_HASH_MAP, entries).unwrap();

    let copy = id_of(&replica::deep_copy(&mut heap, &m.types, &Value::Ref(original)).unwrap());
    let keys: Vec<_> = heap.map(copy).unwrap().keys().cloned().collect();
    assert_eq!(keys, ["zeta", "alpha", "mu"].map(Value::str));
}

/// Frozen maps are rebuilt in one step and remain fixed.
#[test]
fn frozen_map_copy_stays_fixed() {
    let m = model();
    let mut heap = Heap::new();
    let list = m.list(&mut heap, [Value::Int(1)]);
    let original = heap
        .new_map(&m.types, TypeId::FROZEN_MAP, [(Value::str("items"), Value::Ref(list))])
        .unwrap();
    let root = Value::Ref(original);

    let copy = replica::deep_copy(&mut heap, &m.types, &root).unwrap();
    assert_isomorphic(&heap, &m.types, &root, &copy);
    let copied = heap.map_mut(id_of(&copy)).unwrap();
    assert!(copied.is_fixed());
    assert_eq!(copied.insert(Value::str("more"), Value::Null), Err(FixedContainerError));
}

/// Maps of lists of people are copied all the way down.
#[test]
fn nested_map_of_lists_is_copied() {
    let m = model();
    let mut heap = Heap::new();
    let john = m.reader(&mut heap, "John", 30, &["1984"]);
    let jane = m.reader(&mut heap, "Jane", 28, &["Dune"]);
    let bob = m.man(&mut heap, "Bob", 35);
    let team_a = m.list(&mut heap, [Value::Ref(john), Value::Ref(jane)]);
    let team_b = m.list(&mut heap, [Value::Ref(bob)]);
    let original = heap
        .new_map(
            &m.types,
            TypeId::HASH_MAP,
            [
                (Value::str("TeamA"), Value::Ref(team_a)),
                (Value::str("TeamB"), Value::Ref(team_b)),
            ],
        )
        .unwrap();
    let root = Value::Ref(original);

    let copy = replica::deep_copy(&mut heap, &m.types, &root).unwrap();
    assert_isomorphic(&heap, &m.types, &root, &copy);
    assert_no_shared_mutable(&heap, &m.types, &root, &copy);

    let copied_team_a = id_of(heap.map(id_of(&copy)).unwrap().get(&Value::str("TeamA")).unwrap());
    let copied_john = id_of(heap.sequence(copied_team_a).unwrap().get(0).unwrap());
    m.set(&mut heap, john, "name", Value::str("Johnny"));
    heap.sequence_mut(team_a).unwrap().push(Value::Null).unwrap();

    assert_eq!(m.get(&heap, copied_john, "name"), &Value::str("John"));
    assert_eq!(heap.sequence(copied_team_a).unwrap().len(), 2);
}

/// An object used both as a key and as a value maps to a single copy.
#[test]
fn object_keys_share_identity_with_values() {
    let m = model();
    let mut heap = Heap::new();
    let john = m.man(&mut heap, "John", 30);
    let jane = m.man(&mut heap, "Jane", 28);
    let original = heap
        .new_map(
            &m.types,
            TypeId::HASH_MAP,
            [(Value::Ref(john), Value::Ref(jane)), (Value::Ref(jane), Value::Ref(john))],
        )
        .unwrap();
    let root = Value::Ref(original);

    let copy = replica::deep_copy(&mut heap, &m.types, &root).unwrap();
    assert_isomorphic(&heap, &m.types, &root, &copy);

    let copied = heap.map(id_of(&copy)).unwrap();
    let entries: Vec<(_, _)> = copied.iter().map(|(k, v)| (id_of(k), id_of(v))).collect();
    let &[(john2, jane2), (jane3, john3)] = entries.as_slice() else {
        panic!("expected two entries, got {entries:?}");
    };
    assert_eq!(john2, john3);
    assert_eq!(jane2, jane3);
    assert_ne!(john2, john);
    assert_eq!(copied.get(&Value::Ref(john2)), Some(&Value::Ref(jane2)));
    assert!(!copied.contains_key(&Value::Ref(john)));
}

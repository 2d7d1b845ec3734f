//! Two departments that name each other as partners, with overlapping staff.

use pretty_assertions::assert_eq;
use replica::{Heap, HeapId, Value, deep_copy};

use crate::common::{Model, assert_isomorphic, assert_no_shared_mutable, id_of, model};

struct Org {
    hr: HeapId,
    it: HeapId,
    alice: HeapId,
}

/// HR and IT are each other's partner; Alice works for both.
fn org(m: &Model, heap: &mut Heap) -> Org {
    let hr = m.department(heap, "HR");
    let it = m.department(heap, "IT");
    m.set(heap, hr, "partner", Value::Ref(it));
    m.set(heap, it, "partner", Value::Ref(hr));

    let alice = m.reader(heap, "Alice", 41, &["Peopleware"]);
    let bob = m.man(heap, "Bob", 29);
    let hr_staff = m.list(heap, [Value::Ref(alice)]);
    let it_staff = m.list(heap, [Value::Ref(bob), Value::Ref(alice)]);
    m.set(heap, hr, "staff", Value::Ref(hr_staff));
    m.set(heap, it, "staff", Value::Ref(it_staff));
    Org { hr, it, alice }
}

/// The copied departments point at each other, not at the originals.
#[test]
fn circular_partners_are_reproduced() {
    let m = model();
    let mut heap = Heap::new();
    let Org { hr, it, .. } = org(&m, &mut heap);

    let hr2 = id_of(&deep_copy(&mut heap, &m.types, &Value::Ref(hr)).unwrap());
    let it2 = m.get_ref(&heap, hr2, "partner");
    assert_ne!(hr2, hr);
    assert_ne!(it2, it);
    assert_eq!(m.get_ref(&heap, it2, "partner"), hr2);
    assert_eq!(m.get(&heap, hr2, "name"), &Value::str("HR"));
    assert_eq!(m.get(&heap, it2, "name"), &Value::str("IT"));
}

/// A person on both staff lists is one person in the copy as well.
#[test]
fn shared_staff_member_is_copied_once() {
    let m = model();
    let mut heap = Heap::new();
    let Org { hr, alice, .. } = org(&m, &mut heap);

    let hr2 = id_of(&deep_copy(&mut heap, &m.types, &Value::Ref(hr)).unwrap());
    let it2 = m.get_ref(&heap, hr2, "partner");
    let in_hr = heap.sequence(m.get_ref(&heap, hr2, "staff")).unwrap().to_vec();
    let in_it = heap.sequence(m.get_ref(&heap, it2, "staff")).unwrap().to_vec();
    assert_eq!(in_hr[0], in_it[1]);
    assert_ne!(in_hr[0], Value::Ref(alice));
}

/// The whole organization is isomorphic to the original and shares nothing mutable.
#[test]
fn copy_is_isomorphic_and_disjoint() {
    let m = model();
    let mut heap = Heap::new();
    let Org { hr, .. } = org(&m, &mut heap);
    let root = Value::Ref(hr);
    let before = heap.len();

    let copy = deep_copy(&mut heap, &m.types, &root).unwrap();
    assert_isomorphic(&heap, &m.types, &root, &copy);
    assert_no_shared_mutable(&heap, &m.types, &root, &copy);
    // 2 departments, 2 staff lists, 2 people, 1 book list
    assert_eq!(heap.len() - before, 7);
}

/// Renaming and restaffing the originals leaves the copy untouched.
#[test]
fn copy_is_unaffected_by_later_changes() {
    let m = model();
    let mut heap = Heap::new();
    let Org { hr, it, alice } = org(&m, &mut heap);

    let hr2 = id_of(&deep_copy(&mut heap, &m.types, &Value::Ref(hr)).unwrap());
    m.set(&mut heap, it, "name", Value::str("Engineering"));
    m.set(&mut heap, alice, "age", Value::Int(42));
    let hr_staff = m.get_ref(&heap, hr, "staff");
    heap.sequence_mut(hr_staff).unwrap().push(Value::Null).unwrap();

    let it2 = m.get_ref(&heap, hr2, "partner");
    let staff2 = m.get_ref(&heap, hr2, "staff");
    let alice2 = id_of(heap.sequence(staff2).unwrap().get(0).unwrap());
    assert_eq!(m.get(&heap, it2, "name"), &Value::str("IT"));
    assert_eq!(m.get(&heap, alice2, "age"), &Value::Int(41));
    assert_eq!(heap.sequence(staff2).unwrap().len(), 1);
}

//! Tests for the tracers observing real copies.

use pretty_assertions::assert_eq;
use replica::{
    CopyKind, DeepCopier, FieldType, Heap, Instantiation, ProfilingTracer, RecordingTracer, StderrTracer, TraceEvent,
    TypeDef, TypeRegistry, Value,
};

use crate::common::model;

/// A self-referencing object produces one enter/exit pair and an identity hit.
#[test]
fn recording_tracer_captures_self_reference() {
    let mut types = TypeRegistry::new();
    let node = types.register(TypeDef::class("Node").field("next", FieldType::Any)).unwrap();
    let mut heap = Heap::new();
    let original = heap.new_object(&types, node).unwrap();
    heap.set_field(&types, original, "next", Value::Ref(original)).unwrap();

    let mut tracer = RecordingTracer::new();
    let copy = DeepCopier::new()
        .deep_copy_traced(&mut heap, &types, &Value::Ref(original), &mut tracer)
        .unwrap()
        .ref_id()
        .unwrap();

    assert_eq!(
        tracer.into_events(),
        vec![
            TraceEvent::Enter {
                kind: CopyKind::GenericObject,
                depth: 1
            },
            TraceEvent::Instantiate {
                type_name: "Node".to_owned(),
                path: Instantiation::Initialized
            },
            TraceEvent::Register {
                original,
                copy,
                kind: CopyKind::GenericObject
            },
            TraceEvent::Field {
                type_name: "Node".to_owned(),
                field: "next".to_owned()
            },
            TraceEvent::IdentityHit { original, copy },
            TraceEvent::Exit { depth: 0 },
        ]
    );
}

/// Fixed containers register their copy only after their elements are done.
#[test]
fn buffered_container_registers_after_its_elements() {
    let m = model();
    let mut heap = Heap::new();
    let list = m.list(&mut heap, [Value::Int(1)]);
    let frozen = heap
        .new_sequence(&m.types, replica::TypeId::FROZEN_LIST, [Value::Ref(list)])
        .unwrap();

    let mut tracer = RecordingTracer::new();
    DeepCopier::new()
        .deep_copy_traced(&mut heap, &m.types, &Value::Ref(frozen), &mut tracer)
        .unwrap();

    let registered: Vec<_> = tracer
        .events()
        .iter()
        .filter_map(|event| match event {
            TraceEvent::Register { original, .. } => Some(*original),
            _ => None,
        })
        .collect();
    assert_eq!(registered, vec![list, frozen]);
}

/// The profiling report counts nodes by kind, shared values and placeholders.
#[test]
fn profiling_tracer_summarizes_a_copy() {
    let mut m = model();
    let ghost = m
        .types
        .register(TypeDef::class("Ghost").field("name", FieldType::Any).without_default_constructor())
        .unwrap();
    let mut heap = Heap::new();
    let john = m.reader(&mut heap, "John", 30, &["Dune"]);
    let casper = heap.new_object(&m.types, ghost).unwrap();
    let root = m.list(&mut heap, [Value::Ref(john), Value::Ref(john), Value::Ref(casper)]);

    let mut tracer = ProfilingTracer::new();
    DeepCopier::new()
        .deep_copy_traced(&mut heap, &m.types, &Value::Ref(root), &mut tracer)
        .unwrap();
    let report = tracer.report();

    assert_eq!(
        report.kind_counts,
        vec![(CopyKind::SequenceContainer, 2), (CopyKind::GenericObject, 2)]
    );
    assert_eq!(report.total_nodes, 4);
    assert_eq!(report.identity_hits, 1);
    assert_eq!(report.placeholders, 1);
    // Man: name, age, favorite_books; Ghost: name
    assert_eq!(report.fields_copied, 4);
    // "John", 30, "Dune", Ghost's null name
    assert_eq!(report.immutable_values, 4);
    assert_eq!(report.max_depth, 3);
    assert!(report.to_string().contains("Identity hits:    1"));
}

/// A limited stderr tracer still lets the copy complete.
#[test]
fn stderr_tracer_does_not_change_the_result() {
    let m = model();
    let mut heap = Heap::new();
    let john = m.man(&mut heap, "John", 30);

    let mut tracer = StderrTracer::with_limit(3);
    let copy = DeepCopier::new()
        .deep_copy_traced(&mut heap, &m.types, &Value::Ref(john), &mut tracer)
        .unwrap();
    let copy = copy.ref_id().unwrap();
    assert_eq!(m.get(&heap, copy, "name"), &Value::str("John"));
}

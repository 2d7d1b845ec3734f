#![doc = include_str!("../../../README.md")]

mod classify;
mod copy;
mod error;
mod fields;
mod heap;
mod instantiate;
mod resource;
pub mod strategy;
pub mod tracer;
pub mod types;
mod value;

pub use crate::{
    classify::{CopyKind, classify},
    copy::{DeepCopier, deep_copy},
    error::{CopyError, FieldAccessReason},
    heap::{Heap, HeapData, HeapDiff, HeapId, HeapStats},
    instantiate::{InitContext, Instantiation, instantiate},
    resource::{
        DEFAULT_MAX_COPY_DEPTH, LimitedTracker, NoLimitTracker, ResourceError, ResourceLimits, ResourceTracker,
    },
    strategy::Strategies,
    tracer::{CopyTracer, NoopTracer, ProfilingReport, ProfilingTracer, RecordingTracer, StderrTracer, TraceEvent},
    types::{FieldDecl, FieldType, TypeDef, TypeId, TypeRegistry},
    value::{EnumConstant, Value},
};

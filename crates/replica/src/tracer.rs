//! Copy tracing infrastructure.
//!
//! The engine is generic over its tracer, so with [`NoopTracer`] every hook is
//! monomorphized away, the same way [`NoLimitTracker`](crate::NoLimitTracker)
//! removes resource checks.
//!
//! | Tracer | Purpose |
//! |--------|---------|
//! | [`NoopTracer`] | Zero-cost no-op (the default) |
//! | [`StderrTracer`] | Human-readable copy log to stderr |
//! | [`ProfilingTracer`] | Per-kind node counts, identity hits, depth |
//! | [`RecordingTracer`] | Full event recording for post-mortem analysis |
//!
//! ```ignore
//! let mut tracer = ProfilingTracer::new();
//! DeepCopier::new().deep_copy_traced(&mut heap, &types, &root, &mut tracer)?;
//! eprintln!("{}", tracer.report());
//! ```

use std::collections::HashMap;

use crate::{classify::CopyKind, heap::HeapId, instantiate::Instantiation, value::Value};

/// Trace event emitted during a copy, captured by [`RecordingTracer`].
#[derive(Debug, Clone, PartialEq)]
pub enum TraceEvent {
    /// A mutable node is about to be copied.
    Enter {
        kind: CopyKind,
        /// Number of nodes on the current path, this one included.
        depth: usize,
    },
    /// The node entered last has been copied.
    Exit { depth: usize },
    /// A value was shared with the copy instead of being copied.
    Immutable { value_kind: &'static str },
    /// An already-copied node was reached again and its copy reused.
    IdentityHit { original: HeapId, copy: HeapId },
    /// A new copy was recorded in the identity map.
    Register {
        original: HeapId,
        copy: HeapId,
        kind: CopyKind,
    },
    Instantiate { type_name: String, path: Instantiation },
    /// A field of a generic object is about to be copied.
    Field { type_name: String, field: String },
}

/// Hooks called by the engine while it walks a graph.
///
/// Every method defaults to a no-op; implementations override what they need.
pub trait CopyTracer: std::fmt::Debug {
    /// Called before a mutable node is copied.
    ///
    /// # Arguments
    /// * `kind` - How the node is being copied
    /// * `depth` - Number of nodes on the current path, this one included
    #[inline(always)]
    fn on_enter(&mut self, _kind: CopyKind, _depth: usize) {}

    /// Called after a node entered with `on_enter` is finished, successfully or not.
    #[inline(always)]
    fn on_exit(&mut self, _depth: usize) {}

    /// Called for every value returned as-is because it is immutable.
    #[inline(always)]
    fn on_immutable(&mut self, _value: &Value) {}

    #[inline(always)]
    fn on_identity_hit(&mut self, _original: HeapId, _copy: HeapId) {}

    #[inline(always)]
    fn on_register(&mut self, _original: HeapId, _copy: HeapId, _kind: CopyKind) {}

    /// Called when the engine instantiates a generic object.
    #[inline(always)]
    fn on_instantiate(&mut self, _type_name: &str, _path: Instantiation) {}

    #[inline(always)]
    fn on_field(&mut self, _type_name: &str, _field: &str) {}
}

/// A tracer that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracer;

impl CopyTracer for NoopTracer {}

/// Tracer that prints a human-readable copy log to stderr.
///
/// Output format:
/// ```text
///   >>> ENTER GenericObject        depth=1
///   +++ NEW   Department (Initialized)
///   +++ REG   #0 -> #4
///   ... FIELD Department.name
///   === SAME  #2 -> #6
///   <<< EXIT                       depth=0
/// ```
#[derive(Debug, Default)]
pub struct StderrTracer {
    /// Maximum number of lines to print. None = unlimited.
    limit: Option<usize>,
    count: usize,
}

impl StderrTracer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a tracer that stops printing after `limit` lines.
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            count: 0,
        }
    }

    fn emit(&mut self, line: std::fmt::Arguments<'_>) {
        match self.limit {
            Some(limit) if self.count > limit => return,
            Some(limit) if self.count == limit => {
                eprintln!("--- trace limit reached ({limit} lines) ---");
            }
            _ => eprintln!("{line}"),
        }
        self.count += 1;
    }
}

impl CopyTracer for StderrTracer {
    fn on_enter(&mut self, kind: CopyKind, depth: usize) {
        let kind: &'static str = kind.into();
        self.emit(format_args!("  >>> ENTER {kind:<20} depth={depth}"));
    }

    fn on_exit(&mut self, depth: usize) {
        self.emit(format_args!("  <<< EXIT                       depth={depth}"));
    }

    fn on_identity_hit(&mut self, original: HeapId, copy: HeapId) {
        self.emit(format_args!("  === SAME  {original} -> {copy}"));
    }

    fn on_register(&mut self, original: HeapId, copy: HeapId, _kind: CopyKind) {
        self.emit(format_args!("  +++ REG   {original} -> {copy}"));
    }

    fn on_instantiate(&mut self, type_name: &str, path: Instantiation) {
        self.emit(format_args!("  +++ NEW   {type_name} ({path})"));
    }

    fn on_field(&mut self, type_name: &str, field: &str) {
        self.emit(format_args!("  ... FIELD {type_name}.{field}"));
    }
}

/// Tracer that collects copy statistics.
///
/// Retrieve results via [`ProfilingTracer::report`] after the copy.
#[derive(Debug, Default)]
pub struct ProfilingTracer {
    kind_counts: HashMap<CopyKind, u64>,
    immutable_values: u64,
    identity_hits: u64,
    placeholders: u64,
    fields_copied: u64,
    max_depth: usize,
}

/// Summary report from a profiling trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfilingReport {
    /// Nodes copied per kind, most frequent first.
    pub kind_counts: Vec<(CopyKind, u64)>,
    /// Total mutable nodes copied.
    pub total_nodes: u64,
    /// Values shared with the copy because they are immutable.
    pub immutable_values: u64,
    /// Times an already-copied node was reached again.
    pub identity_hits: u64,
    /// Generic objects created without running an initializer.
    pub placeholders: u64,
    pub fields_copied: u64,
    /// Longest path of mutable nodes observed.
    pub max_depth: usize,
}

impl ProfilingTracer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn report(&self) -> ProfilingReport {
        let mut kind_counts: Vec<_> = self.kind_counts.iter().map(|(&k, &v)| (k, v)).collect();
        kind_counts.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        ProfilingReport {
            total_nodes: kind_counts.iter().map(|(_, count)| count).sum(),
            kind_counts,
            immutable_values: self.immutable_values,
            identity_hits: self.identity_hits,
            placeholders: self.placeholders,
            fields_copied: self.fields_copied,
            max_depth: self.max_depth,
        }
    }
}

impl CopyTracer for ProfilingTracer {
    #[inline]
    fn on_enter(&mut self, kind: CopyKind, depth: usize) {
        *self.kind_counts.entry(kind).or_insert(0) += 1;
        self.max_depth = self.max_depth.max(depth);
    }

    #[inline]
    fn on_immutable(&mut self, _value: &Value) {
        self.immutable_values += 1;
    }

    fn on_identity_hit(&mut self, _original: HeapId, _copy: HeapId) {
        self.identity_hits += 1;
    }

    fn on_instantiate(&mut self, _type_name: &str, path: Instantiation) {
        if path == Instantiation::Placeholder {
            self.placeholders += 1;
        }
    }

    fn on_field(&mut self, _type_name: &str, _field: &str) {
        self.fields_copied += 1;
    }
}

impl std::fmt::Display for ProfilingReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Copy Profiling Report ===")?;
        writeln!(f, "Nodes copied:     {}", self.total_nodes)?;
        writeln!(f, "Immutable values: {}", self.immutable_values)?;
        writeln!(f, "Identity hits:    {}", self.identity_hits)?;
        writeln!(f, "Placeholders:     {}", self.placeholders)?;
        writeln!(f, "Fields copied:    {}", self.fields_copied)?;
        writeln!(f, "Max depth:        {}", self.max_depth)?;
        writeln!(f)?;
        writeln!(f, "--- Nodes by Kind ---")?;
        for (kind, count) in &self.kind_counts {
            let pct = (*count as f64 / self.total_nodes as f64) * 100.0;
            let kind: &'static str = kind.into();
            writeln!(f, "  {kind:<20} {count:>10}  ({pct:>5.1}%)")?;
        }
        Ok(())
    }
}

/// Tracer that records every event, for post-mortem analysis of a copy.
///
/// Allocates per event, so prefer it for small graphs or set a limit.
#[derive(Debug, Default)]
pub struct RecordingTracer {
    events: Vec<TraceEvent>,
    limit: Option<usize>,
}

impl RecordingTracer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a recording tracer that stops recording after `limit` events.
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self {
            events: Vec::with_capacity(limit.min(1024)),
            limit: Some(limit),
        }
    }

    #[must_use]
    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    #[must_use]
    pub fn into_events(self) -> Vec<TraceEvent> {
        self.events
    }

    fn record(&mut self, event: TraceEvent) {
        if self.limit.is_none_or(|limit| self.events.len() < limit) {
            self.events.push(event);
        }
    }
}

impl CopyTracer for RecordingTracer {
    fn on_enter(&mut self, kind: CopyKind, depth: usize) {
        self.record(TraceEvent::Enter { kind, depth });
    }

    fn on_exit(&mut self, depth: usize) {
        self.record(TraceEvent::Exit { depth });
    }

    fn on_immutable(&mut self, value: &Value) {
        self.record(TraceEvent::Immutable {
            value_kind: value.kind_name(),
        });
    }

    fn on_identity_hit(&mut self, original: HeapId, copy: HeapId) {
        self.record(TraceEvent::IdentityHit { original, copy });
    }

    fn on_register(&mut self, original: HeapId, copy: HeapId, kind: CopyKind) {
        self.record(TraceEvent::Register { original, copy, kind });
    }

    fn on_instantiate(&mut self, type_name: &str, path: Instantiation) {
        self.record(TraceEvent::Instantiate {
            type_name: type_name.to_owned(),
            path,
        });
    }

    fn on_field(&mut self, type_name: &str, field: &str) {
        self.record(TraceEvent::Field {
            type_name: type_name.to_owned(),
            field: field.to_owned(),
        });
    }
}

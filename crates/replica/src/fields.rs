//! Field-by-field population of generic object copies.

use crate::{
    copy::CopyContext,
    error::{CopyError, FieldAccessReason},
    heap::HeapId,
    resource::ResourceTracker,
    tracer::CopyTracer,
    types::{TypeDescriptor, TypeId},
};

impl<T: ResourceTracker, Tr: CopyTracer> CopyContext<'_, T, Tr> {
    /// Copies every instance field of `original` into `copy`.
    ///
    /// Walks the type and each ancestor below the root, so private fields
    /// declared by superclasses are copied too, each with its own slot even
    /// when a subclass reuses the name. Static fields belong to the type and
    /// are left alone.
    pub(crate) fn copy_fields(&mut self, original: HeapId, copy: HeapId, type_id: TypeId) -> Result<(), CopyError> {
        let types = self.types;
        for ancestor in types.ancestors(type_id) {
            let desc = types.get(ancestor).ok_or(CopyError::UnknownType(ancestor))?;
            for decl in desc.fields() {
                if decl.is_static() {
                    continue;
                }
                let fail = |reason| field_error(desc, decl.name(), reason);
                if decl.is_sealed() {
                    return Err(fail(FieldAccessReason::Sealed));
                }
                let slot = decl.slot().ok_or_else(|| fail(FieldAccessReason::MissingSlot))?;
                let value = self
                    .heap
                    .instance(original)
                    .ok_or(CopyError::DanglingReference(original))?
                    .field(slot)
                    .cloned()
                    .ok_or_else(|| fail(FieldAccessReason::MissingSlot))?;

                self.tracer.on_field(desc.name(), decl.name());
                let copied = self.copy_value(&value)?;
                let expected = decl.field_type();
                if !expected.accepts(&copied) {
                    return Err(fail(FieldAccessReason::TypeMismatch {
                        expected,
                        found: copied.kind_name(),
                    }));
                }
                let target = self.heap.instance_mut(copy).ok_or(CopyError::DanglingReference(copy))?;
                if !target.set_field(slot, copied) {
                    return Err(fail(FieldAccessReason::MissingSlot));
                }
            }
        }
        Ok(())
    }
}

fn field_error(desc: &TypeDescriptor, field: &str, reason: FieldAccessReason) -> CopyError {
    CopyError::field_access(desc.name(), field, reason)
}

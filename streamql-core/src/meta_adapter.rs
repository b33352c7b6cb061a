//! Row metadata adapter (spec §4.2).
//!
//! Exposes column count/name/precision/scale/nullability/type. When the
//! driver's metadata can supply a native column-type descriptor it is
//! preferred; otherwise the adapter falls back to the library's derived
//! type name and remembers the downgrade process-wide so later calls for
//! the same driver type skip the (possibly expensive) probe — spec §9's
//! "Driver version probing" design note.

use crate::capability;
use crate::driver::DriverRowMetadata;
use crate::value::{ColumnType, Nullability};

pub struct MetaAdapter<'m, M: DriverRowMetadata> {
    metadata: &'m M,
}

impl<'m, M: DriverRowMetadata + 'static> MetaAdapter<'m, M> {
    pub fn new(metadata: &'m M) -> Self {
        Self { metadata }
    }

    pub fn column_count(&self) -> usize {
        self.metadata.column_count()
    }

    pub fn column_name(&self, index1: usize) -> &str {
        self.metadata.column_name(index1 - 1)
    }

    pub fn precision(&self, index1: usize) -> Option<u32> {
        self.metadata.precision(index1 - 1)
    }

    pub fn scale(&self, index1: usize) -> Option<u32> {
        self.metadata.scale(index1 - 1)
    }

    pub fn nullability(&self, index1: usize) -> Nullability {
        self.metadata.nullability(index1 - 1)
    }

    /// Prefers the driver's native type name; caches a process-wide
    /// "this driver doesn't expose one" flag the first time the probe
    /// comes back empty, so subsequent calls on any instance of `M` skip
    /// straight to the derived fallback.
    pub fn column_type_name(&self, index1: usize) -> String {
        let probes_native = capability::probe_once::<M>(|| {
            self.metadata.native_type_name(index1 - 1).is_some()
        });
        if probes_native {
            if let Some(native) = self.metadata.native_type_name(index1 - 1) {
                return native.to_string();
            }
        }
        self.column_type(index1).derived_name().to_string()
    }

    pub fn column_type(&self, index1: usize) -> ColumnType {
        self.metadata.column_type(index1 - 1)
    }
}

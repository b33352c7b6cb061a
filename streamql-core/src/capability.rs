//! Process-wide capability cache (spec §9, "Driver version probing").
//!
//! The original source probed a newer metadata method at call time and
//! fell back on method-missing. This crate's driver trait boundary makes
//! that impossible to observe directly (there is no reflection), so the
//! probe is instead something a `DriverRowMetadata` implementation can
//! perform once — e.g. the first time it is asked for a native type name —
//! and record here, keyed by its own type, so later instances of the same
//! driver skip the probe.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

fn registry() -> &'static Mutex<HashMap<TypeId, bool>> {
    static REGISTRY: OnceLock<Mutex<HashMap<TypeId, bool>>> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Returns the cached capability flag for driver type `D`, if a probe has
/// already run for it in this process.
pub fn cached<D: 'static>() -> Option<bool> {
    registry().lock().unwrap().get(&TypeId::of::<D>()).copied()
}

/// Records the outcome of a one-time capability probe for driver type `D`.
pub fn record<D: 'static>(supported: bool) {
    registry().lock().unwrap().insert(TypeId::of::<D>(), supported);
}

/// Runs `probe` at most once per process per driver type `D`, caching and
/// returning its result on every call.
pub fn probe_once<D: 'static>(probe: impl FnOnce() -> bool) -> bool {
    if let Some(cached) = cached::<D>() {
        return cached;
    }
    let result = probe();
    record::<D>(result);
    result
}

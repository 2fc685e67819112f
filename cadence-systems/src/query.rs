//! Entity filters for Parallel systems (spec §4.E).

use cadence_core::{EntityRegistry, TypeErasedHandle};

/// A predicate over a live entity, evaluated by the pipeline once per
/// candidate handle for a Parallel system (spec §3).
pub trait Query: Send + Sync {
    fn matches(&self, handle: TypeErasedHandle, registry: &EntityRegistry) -> bool;
}

/// The built-in query: any entity with a registered context that has not
/// been marked for cleanup.
pub struct ActiveEntityQuery;

impl Query for ActiveEntityQuery {
    fn matches(&self, handle: TypeErasedHandle, registry: &EntityRegistry) -> bool {
        registry
            .try_get_context(handle)
            .map(|ctx| !ctx.is_marked_for_cleanup())
            .unwrap_or(false)
    }
}

//! Type-erased entity registry: per-entity context lookup and the
//! per-frame pending-destroy list (spec §4.B).
//!
//! The teacher's `World` keeps a `HashMap<Entity, (ArchetypeID, ChunkID,
//! ComponentID)>` (`examples/0x112233-legion/src/lib.rs`) mapping a handle
//! to its storage location; `EntityRegistry` follows the same "handle keys
//! a side table" shape but maps to a host-defined, downcastable context
//! object instead of an archetype location, since this crate does not
//! implement archetype storage (spec.md Non-goals). Hashing uses `fxhash`,
//! already a teacher dependency, for the same reason the teacher reaches
//! for it: handle keys are small and dense, and the default SipHash is
//! needless overhead for them.

use crate::handle::TypeErasedHandle;
use downcast_rs::{impl_downcast, DowncastSync};
use fxhash::FxHashMap;

/// Host-defined per-entity data the registry stores opaquely. Hosts define
/// one or more concrete types implementing this trait and downcast after
/// `try_get_context`.
pub trait EntityContext: DowncastSync {
    /// Whether this entity has been marked for cleanup (spec §3 lifecycle:
    /// `marked_for_cleanup` is one of the context's lifecycle flags).
    fn is_marked_for_cleanup(&self) -> bool;
    fn mark_for_cleanup(&mut self);
}
impl_downcast!(EntityContext);

/// Type-erased lookup from handle to context, plus the per-frame
/// pending-destroy list consumed by the Cleanup phase (spec §4.F).
#[derive(Default)]
pub struct EntityRegistry {
    contexts: FxHashMap<TypeErasedHandle, Box<dyn EntityContext>>,
    pending_destroy: Vec<TypeErasedHandle>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handle` with its context. Overwrites any prior
    /// registration for the same handle.
    pub fn register(&mut self, handle: TypeErasedHandle, context: Box<dyn EntityContext>) {
        self.contexts.insert(handle, context);
    }

    pub fn try_get_context(&self, handle: TypeErasedHandle) -> Option<&dyn EntityContext> {
        self.contexts.get(&handle).map(|b| b.as_ref())
    }

    pub fn try_get_context_mut(&mut self, handle: TypeErasedHandle) -> Option<&mut Box<dyn EntityContext>> {
        self.contexts.get_mut(&handle)
    }

    /// Remove a handle's context entirely. Used by the Cleanup phase after
    /// the entity's arena slot has been destroyed.
    pub fn remove(&mut self, handle: TypeErasedHandle) -> Option<Box<dyn EntityContext>> {
        self.contexts.remove(&handle)
    }

    pub fn all_entities(&self) -> impl Iterator<Item = TypeErasedHandle> + '_ {
        self.contexts.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    /// Mark `handle` for cleanup. Idempotent: marking an already-marked or
    /// unregistered handle is a no-op rather than an error (spec §4.B).
    pub fn mark_for_cleanup(&mut self, handle: TypeErasedHandle) {
        if let Some(ctx) = self.contexts.get_mut(&handle) {
            if !ctx.is_marked_for_cleanup() {
                ctx.mark_for_cleanup();
                self.pending_destroy.push(handle);
            }
        }
    }

    /// Drain and return every handle marked for cleanup since the last
    /// drain. Called once, by the Cleanup phase.
    pub fn drain_pending_destroys(&mut self) -> Vec<TypeErasedHandle> {
        std::mem::take(&mut self.pending_destroy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::EntityKind;

    struct Unit;
    impl EntityKind for Unit {
        const KIND_NAME: &'static str = "Unit";
    }

    struct TestContext {
        cleanup: bool,
    }
    impl EntityContext for TestContext {
        fn is_marked_for_cleanup(&self) -> bool {
            self.cleanup
        }
        fn mark_for_cleanup(&mut self) {
            self.cleanup = true;
        }
    }

    fn handle(index: u32, generation: u32) -> TypeErasedHandle {
        crate::handle::Handle::<Unit>::new(index, generation).erase()
    }

    #[test]
    fn register_and_lookup() {
        let mut reg = EntityRegistry::new();
        let h = handle(0, 0);
        reg.register(h, Box::new(TestContext { cleanup: false }));
        assert!(reg.try_get_context(h).is_some());
        assert!(reg.try_get_context(handle(1, 0)).is_none());
    }

    #[test]
    fn mark_for_cleanup_is_idempotent() {
        let mut reg = EntityRegistry::new();
        let h = handle(0, 0);
        reg.register(h, Box::new(TestContext { cleanup: false }));
        reg.mark_for_cleanup(h);
        reg.mark_for_cleanup(h);
        let drained = reg.drain_pending_destroys();
        assert_eq!(drained, vec![h]);
        // A second drain is empty: the list does not grow from repeated marks.
        reg.mark_for_cleanup(h);
        let drained2 = reg.drain_pending_destroys();
        // Already marked before this call (mark_for_cleanup is idempotent
        // once the context reports marked), so nothing new is queued.
        assert!(drained2.is_empty());
    }

    #[test]
    fn drain_pending_destroys_empties_list() {
        let mut reg = EntityRegistry::new();
        let a = handle(0, 0);
        let b = handle(1, 0);
        reg.register(a, Box::new(TestContext { cleanup: false }));
        reg.register(b, Box::new(TestContext { cleanup: false }));
        reg.mark_for_cleanup(a);
        reg.mark_for_cleanup(b);
        let mut drained = reg.drain_pending_destroys();
        drained.sort_by_key(|h| h.index());
        assert_eq!(drained, vec![a, b]);
        assert!(reg.drain_pending_destroys().is_empty());
    }
}

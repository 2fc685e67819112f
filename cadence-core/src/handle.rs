//! Entity identity: `(index, generation)` handles over per-kind arenas.
//!
//! Grounded on the teacher's `Entity`/`EntityIndex`/`EntityVersion` newtypes
//! (`examples/0x112233-legion/src/lib.rs`), generalized from the teacher's
//! single global entity space to spec §3's per-entity-*kind* arenas: each
//! kind gets its own `Arena<K>` and its own generation sequence, so a
//! `Handle<K>` is only ever compared against slots of the same kind. The
//! type-erased counterpart lets registries and queues hold handles across
//! kinds, using `downcast-rs` (already a teacher dependency) for the
//! checked conversion back to a concrete kind.

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// A marker type identifying one entity kind (one arena). Implementors are
/// typically zero-sized tag structs; the kind's `TypeId` is what a
/// [`TypeErasedHandle`] carries to guard its checked downcast.
pub trait EntityKind: 'static {
    /// Human-readable kind name, used in log spans and panic messages.
    const KIND_NAME: &'static str;
}

/// A versioned reference into the arena for entity kind `K`.
///
/// Valid iff the arena slot at `index` has generation equal to
/// `generation` and is alive (spec §3, §4.A).
pub struct Handle<K: EntityKind> {
    pub(crate) index: u32,
    pub(crate) generation: u32,
    _kind: PhantomData<fn() -> K>,
}

impl<K: EntityKind> Handle<K> {
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Handle {
            index,
            generation,
            _kind: PhantomData,
        }
    }

    /// Slot index within the owning arena.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Generation of the slot at the time this handle was minted.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Erase the kind into a [`TypeErasedHandle`] carrying a runtime tag.
    pub fn erase(self) -> TypeErasedHandle {
        TypeErasedHandle {
            index: self.index,
            generation: self.generation,
            kind: TypeId::of::<K>(),
            kind_name: K::KIND_NAME,
        }
    }
}

impl<K: EntityKind> Clone for Handle<K> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<K: EntityKind> Copy for Handle<K> {}

impl<K: EntityKind> PartialEq for Handle<K> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}
impl<K: EntityKind> Eq for Handle<K> {}

impl<K: EntityKind> Hash for Handle<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.generation.hash(state);
    }
}

impl<K: EntityKind> fmt::Debug for Handle<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Handle<{}>({}#{})",
            K::KIND_NAME,
            self.index,
            self.generation
        )
    }
}

impl<K: EntityKind> fmt::Display for Handle<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}#{}", K::KIND_NAME, self.index, self.generation)
    }
}

/// A handle whose entity kind is only known at runtime.
///
/// Registries and command queues that must hold handles to mixed kinds
/// store this form; downcasting back to `Handle<K>` is a checked operation
/// (spec §3: "conversion to a kind-specific handle is a checked
/// operation").
#[derive(Clone, Copy)]
pub struct TypeErasedHandle {
    index: u32,
    generation: u32,
    kind: TypeId,
    kind_name: &'static str,
}

impl TypeErasedHandle {
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn kind_name(&self) -> &'static str {
        self.kind_name
    }

    /// Checked downcast to a concrete kind. Returns `None` if `K` is not
    /// the kind this handle was minted for.
    pub fn downcast<K: EntityKind>(&self) -> Option<Handle<K>> {
        if self.kind == TypeId::of::<K>() {
            Some(Handle::new(self.index, self.generation))
        } else {
            None
        }
    }
}

impl fmt::Debug for TypeErasedHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TypeErasedHandle({}:{}#{})",
            self.kind_name, self.index, self.generation
        )
    }
}

impl PartialEq for TypeErasedHandle {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation && self.kind == other.kind
    }
}
impl Eq for TypeErasedHandle {}

impl Hash for TypeErasedHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.generation.hash(state);
        self.kind.hash(state);
    }
}

/// A lightweight downcast helper for the catalog of concrete `EntityKind`
/// tags a host declares. Not required by the arena itself, but used by
/// [`crate::registry::EntityRegistry`] to assert a handle's kind is known
/// before registering it (spec §4.B: "a programmer error ... fatal in
/// debug").
pub fn is_kind<K: EntityKind>(handle: &TypeErasedHandle) -> bool {
    handle.kind == TypeId::of::<K>()
}

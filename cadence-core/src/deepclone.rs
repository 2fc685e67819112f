//! Structural copy with per-field modes and cycle tracking (spec §4.K).
//!
//! Field modes mirror the source's compile-time clone descriptor; here
//! they're expressed as an enum a derive-free, hand-rolled `DeepClone`
//! impl consults per field, following the same "explicit per-field
//! strategy" shape the teacher uses for its `Tag`/`Component` storage
//! traits (`examples/0x112233-legion/src/storage`-adjacent trait-per-
//! field dispatch), generalized from storage-kind dispatch to clone-mode
//! dispatch.

use fxhash::FxHashMap;

/// How one field should be handled by a structural copy (spec §4.K).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CloneMode {
    /// Recurse, or copy-by-value if the field type is itself a value.
    Deep,
    /// Assign the reference/handle directly; do not recurse.
    Shallow,
    /// Leave the target field at its default/zero value.
    Ignore,
    /// Consult the cycle-tracking table: reuse the recorded clone on a
    /// hit, register before recursing on a miss.
    Cyclable,
}

/// Maps an original value's identity (host-assigned, e.g. a handle's bits
/// or a pointer cast to `u64`) to the identity of its already-produced
/// clone, so graph-shaped data (parent back-references) clones without
/// infinite recursion.
#[derive(Default)]
pub struct CloneTable {
    clones: FxHashMap<u64, u64>,
}

impl CloneTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// `Some(clone_identity)` if `original` has already been cloned.
    pub fn get(&self, original: u64) -> Option<u64> {
        self.clones.get(&original).copied()
    }

    /// Register `clone` as the copy of `original`, before recursing into
    /// its fields (so a field that points back at `original` resolves
    /// to `clone` rather than recursing again).
    pub fn register(&mut self, original: u64, clone: u64) {
        self.clones.insert(original, clone);
    }
}

/// A type that knows how to produce a structural copy of itself, honoring
/// per-field [`CloneMode`]s and consulting a [`CloneTable`] for `Cyclable`
/// fields.
pub trait DeepClone: Sized {
    /// A host-assigned stable identity for cycle tracking. Types with no
    /// `Cyclable` fields anywhere in their graph may return `0` always.
    fn clone_identity(&self) -> u64 {
        0
    }

    /// Build a reference-only stand-in for a clone already produced under
    /// `identity`, without visiting the original's fields again. Only
    /// called to resolve a `Cyclable` table hit; types never reached
    /// through `CloneMode::Cyclable` can leave this unimplemented.
    fn from_clone_identity(identity: u64) -> Self {
        let _ = identity;
        panic!("from_clone_identity not implemented for a type used behind CloneMode::Cyclable")
    }

    fn deep_clone(&self, table: &mut CloneTable) -> Self;
}

/// Clone a field value by [`CloneMode`], for types composed of
/// `DeepClone` fields. `Shallow` assigns a plain `Clone` of the field
/// without recursing; `Cyclable` pre-registers the original's identity
/// before recursing so a field that loops back resolves to a stand-in
/// instead of recursing again.
pub fn clone_field<T: DeepClone + Default + Clone>(
    value: &T,
    mode: CloneMode,
    table: &mut CloneTable,
) -> T {
    match mode {
        CloneMode::Deep => value.deep_clone(table),
        CloneMode::Shallow => value.clone(),
        CloneMode::Ignore => T::default(),
        CloneMode::Cyclable => {
            let identity = value.clone_identity();
            if let Some(existing) = table.get(identity) {
                return T::from_clone_identity(existing);
            }
            // Provisional entry so a field reached further down that
            // loops back to `identity` hits this instead of recursing.
            table.register(identity, identity);
            let clone = value.deep_clone(table);
            table.register(identity, clone.clone_identity());
            clone
        }
    }
}

/// Clone a sequence element-wise, preserving order.
pub fn clone_sequence<T: DeepClone>(items: &[T], table: &mut CloneTable) -> Vec<T> {
    items.iter().map(|item| item.deep_clone(table)).collect()
}

/// Clone a map element-wise, preserving keys and per-value clone semantics.
pub fn clone_map<K: Clone + std::hash::Hash + Eq, V: DeepClone>(
    map: &std::collections::HashMap<K, V>,
    table: &mut CloneTable,
) -> std::collections::HashMap<K, V> {
    map.iter()
        .map(|(k, v)| (k.clone(), v.deep_clone(table)))
        .collect()
}

//! Reference-counted resource catalog with same-tick load/unload
//! coalescing and dynamic dependency discovery (spec §4.H).
//!
//! The catalog's pending-request queue uses `crossbeam_queue::SegQueue`
//! (a teacher dependency not otherwise exercised by this crate): requests
//! arrive from arbitrary callers between ticks with no shared state to
//! protect beyond the queue itself, the producer/single-consumer shape
//! `SegQueue` is built for. This differs from `CommandQueue`, whose three
//! buffers share one `parking_lot::Mutex` because `enqueue` needs to read
//! and compare against buffer contents (signal dedup) as part of the same
//! critical section — see `DESIGN.md`.

use crate::error::ResourceError;
use crossbeam_queue::SegQueue;
use fxhash::FxHashMap;
use parking_lot::Mutex;
use std::hash::Hash;
use std::sync::Arc;
use tracing::{debug, trace};

/// Lifecycle state of one catalog entry (spec §3).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum ResourceState {
    Unloaded,
    Loading,
    Loaded,
    Failed,
}

/// A loadable resource keyed by `K`. Hosts implement this for each
/// concrete resource type they register with a catalog.
pub trait Resource<K: Eq + Hash + Clone>: Send + 'static {
    /// Called once when ref_count transitions 0 → 1.
    fn start(&mut self);
    /// Called once per `catalog.tick()` while this entry is Loading or
    /// Failed. May use `catalog` to request dependencies via a sub-loader
    /// (spec §4.H "dynamic dependency discovery").
    fn tick(&mut self, catalog: &ResourceCatalog<K, Self>) -> ResourceState
    where
        Self: Sized;
    /// Called once when ref_count transitions 1 → 0.
    fn unload(&mut self);
}

struct ResourceEntry<R> {
    resource: R,
    state: ResourceState,
    ref_count: u32,
}

/// A queued load (+1) or unload (-1) request, coalesced per key within one
/// `tick()` (spec §4.H "same-tick coalescing").
struct Request<K> {
    key: K,
    delta: i32,
}

/// Owns every resource entry for one key space, plus the queue of
/// load/unload requests awaiting the next `tick()`.
pub struct ResourceCatalog<K: Eq + Hash + Clone, R> {
    entries: Mutex<FxHashMap<K, ResourceEntry<R>>>,
    requests: SegQueue<Request<K>>,
}

impl<K: Eq + Hash + Clone + std::fmt::Debug, R: Resource<K>> ResourceCatalog<K, R> {
    pub fn new() -> Self {
        ResourceCatalog {
            entries: Mutex::new(FxHashMap::default()),
            requests: SegQueue::new(),
        }
    }

    /// Register `key` with its unloaded resource instance. Overwrites any
    /// prior entry for the same key.
    pub fn register(&self, key: K, resource: R) {
        self.entries.lock().insert(
            key,
            ResourceEntry {
                resource,
                state: ResourceState::Unloaded,
                ref_count: 0,
            },
        );
    }

    /// Remove `key` from the catalog. Fails if the entry is still
    /// referenced (spec §4.H).
    pub fn unregister(&self, key: &K) -> Result<(), ResourceError> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            None => Err(ResourceError::UnknownKey),
            Some(entry) if entry.ref_count > 0 => {
                Err(ResourceError::StillReferenced(entry.ref_count))
            }
            Some(_) => {
                entries.remove(key);
                Ok(())
            }
        }
    }

    /// Queue a load request (+1) for `key`, to be coalesced on the next
    /// `tick()`.
    pub fn submit_load(&self, key: K) {
        self.requests.push(Request { key, delta: 1 });
    }

    /// Queue an unload request (-1) for `key`, to be coalesced on the next
    /// `tick()`.
    pub fn submit_unload(&self, key: K) {
        self.requests.push(Request { key, delta: -1 });
    }

    pub fn state(&self, key: &K) -> Option<ResourceState> {
        self.entries.lock().get(key).map(|e| e.state)
    }

    pub fn ref_count(&self, key: &K) -> Option<u32> {
        self.entries.lock().get(key).map(|e| e.ref_count)
    }

    /// Drain and coalesce pending requests, apply net ref_count deltas,
    /// run `start`/`unload` on the entries that crossed the 0/1 boundary,
    /// then tick every Loading or Failed entry (spec §4.H).
    pub fn tick(&self) {
        let mut net: FxHashMap<K, i32> = FxHashMap::default();
        while let Some(req) = self.requests.pop() {
            *net.entry(req.key).or_insert(0) += req.delta;
        }

        {
            let mut entries = self.entries.lock();
            for (key, delta) in net {
                if delta == 0 {
                    trace!(?key, "load/unload requests cancelled out this tick");
                    continue;
                }
                let Some(entry) = entries.get_mut(&key) else {
                    continue;
                };
                let before = entry.ref_count;
                entry.ref_count = (entry.ref_count as i32 + delta).max(0) as u32;
                if before == 0 && entry.ref_count > 0 {
                    entry.resource.start();
                    entry.state = ResourceState::Loading;
                    debug!(?key, "resource entry started loading");
                } else if before > 0 && entry.ref_count == 0 {
                    entry.resource.unload();
                    entry.state = ResourceState::Unloaded;
                    debug!(?key, "resource entry unloaded");
                }
            }
        }

        let pending_keys: Vec<K> = {
            let entries = self.entries.lock();
            entries
                .iter()
                .filter(|(_, e)| matches!(e.state, ResourceState::Loading | ResourceState::Failed))
                .map(|(k, _)| k.clone())
                .collect()
        };
        for key in pending_keys {
            let mut entry = {
                let mut entries = self.entries.lock();
                match entries.remove(&key) {
                    Some(e) => e,
                    None => continue,
                }
            };
            let new_state = entry.resource.tick(self);
            entry.state = new_state;
            self.entries.lock().insert(key, entry);
        }
    }
}

impl<K: Eq + Hash + Clone + std::fmt::Debug, R: Resource<K>> Default for ResourceCatalog<K, R> {
    fn default() -> Self {
        Self::new()
    }
}

/// A per-requester handle-holder against a catalog (spec §4.H). Does not
/// tick the catalog itself: `tick()` only observes state the enclosing
/// catalog's own `tick()` has already advanced.
pub struct Loader<K: Eq + Hash + Clone, R> {
    catalog: Arc<ResourceCatalog<K, R>>,
    requested: Vec<K>,
    executed: Vec<K>,
}

impl<K: Eq + Hash + Clone + std::fmt::Debug, R: Resource<K>> Loader<K, R> {
    pub fn new(catalog: Arc<ResourceCatalog<K, R>>) -> Self {
        Loader {
            catalog,
            requested: Vec::new(),
            executed: Vec::new(),
        }
    }

    /// Record intent to load `key`. Not yet submitted to the catalog.
    pub fn request(&mut self, key: K) {
        self.requested.push(key);
    }

    /// Submit every requested key to the catalog as a load request.
    pub fn execute(&mut self) {
        for key in self.requested.drain(..) {
            self.catalog.submit_load(key.clone());
            self.executed.push(key);
        }
    }

    /// `true` once every executed key is Loaded.
    pub fn tick(&self) -> bool {
        !self.executed.is_empty()
            && self
                .executed
                .iter()
                .all(|k| self.catalog.state(k) == Some(ResourceState::Loaded))
    }

    /// Queue an unload request for every key this loader has executed.
    pub fn dispose(&mut self) {
        for key in self.executed.drain(..) {
            self.catalog.submit_unload(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Instant;
    impl Resource<&'static str> for Instant {
        fn start(&mut self) {}
        fn tick(&mut self, _catalog: &ResourceCatalog<&'static str, Self>) -> ResourceState {
            ResourceState::Loaded
        }
        fn unload(&mut self) {}
    }

    #[test]
    fn coalesced_net_zero_request_is_a_noop() {
        let catalog: ResourceCatalog<&'static str, Instant> = ResourceCatalog::new();
        catalog.register("K1", Instant);
        catalog.submit_load("K1");
        catalog.submit_unload("K1");
        catalog.tick();
        assert_eq!(catalog.ref_count("K1"), Some(0));
        assert_eq!(catalog.state("K1"), Some(ResourceState::Unloaded));
    }

    #[test]
    fn load_then_tick_transitions_to_loaded() {
        let catalog: ResourceCatalog<&'static str, Instant> = ResourceCatalog::new();
        catalog.register("K1", Instant);
        catalog.submit_load("K1");
        catalog.tick();
        assert_eq!(catalog.state("K1"), Some(ResourceState::Loaded));
        assert_eq!(catalog.ref_count("K1"), Some(1));
    }

    #[test]
    fn unregister_fails_while_referenced() {
        let catalog: ResourceCatalog<&'static str, Instant> = ResourceCatalog::new();
        catalog.register("K1", Instant);
        catalog.submit_load("K1");
        catalog.tick();
        assert!(matches!(
            catalog.unregister(&"K1"),
            Err(ResourceError::StillReferenced(1))
        ));
        catalog.submit_unload("K1");
        catalog.tick();
        assert!(catalog.unregister(&"K1").is_ok());
    }

    #[test]
    fn scene_transition_coalescing_scenario() {
        // loader_old holds {K1, K2}; loader_new requests {K2, K3}; in the
        // same tick, dispose() then execute() then catalog.tick() (spec §8
        // scenario 5).
        let catalog = Arc::new(ResourceCatalog::<&'static str, Instant>::new());
        catalog.register("K1", Instant);
        catalog.register("K2", Instant);
        catalog.register("K3", Instant);

        let mut loader_old = Loader::new(catalog.clone());
        loader_old.request("K1");
        loader_old.request("K2");
        loader_old.execute();
        catalog.tick();
        assert_eq!(catalog.state("K1"), Some(ResourceState::Loaded));
        assert_eq!(catalog.state("K2"), Some(ResourceState::Loaded));

        let mut loader_new = Loader::new(catalog.clone());
        loader_new.request("K2");
        loader_new.request("K3");

        loader_old.dispose();
        loader_new.execute();
        catalog.tick();

        assert_eq!(catalog.state("K1"), Some(ResourceState::Unloaded));
        assert_eq!(catalog.state("K2"), Some(ResourceState::Loaded));
        assert_eq!(catalog.ref_count("K2"), Some(1));
        assert_eq!(catalog.state("K3"), Some(ResourceState::Loaded));
    }
}

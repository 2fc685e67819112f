//! Per-command-type object pool (spec §4.C).
//!
//! A plain `parking_lot::Mutex<Vec<T>>` free list — spec only requires the
//! pool be "lock-free or lock-guarded at implementer's discretion" (§5);
//! the teacher's `parking_lot` dependency is reused here rather than the
//! optional `crossbeam-queue` one, because renting and resetting an
//! instance want to happen under one critical section (`SegQueue` has no
//! slot to hook `reset_to_default` into — see `DESIGN.md`).

use parking_lot::Mutex;
use tracing::warn;

/// A type a [`Pool`] can rent and return. `reset_to_default` must return
/// every non-static field to its declared default (spec §4.C): references
/// become `None`, collections are cleared in place rather than
/// reallocated, arrays are zeroed.
pub trait Poolable: Default {
    fn reset_to_default(&mut self) {
        *self = Self::default();
    }
}

/// Fixed-growth free-list pool for one command (or other poolable) type.
pub struct Pool<T: Poolable> {
    free: Mutex<Vec<T>>,
    initial_capacity: usize,
}

impl<T: Poolable> Pool<T> {
    /// `initial_capacity` is the pool's pre-warmed size, the maximum of
    /// every queue registration's requested capacity for this type (spec
    /// §4.C).
    pub fn new(initial_capacity: usize) -> Self {
        let mut free = Vec::with_capacity(initial_capacity);
        for _ in 0..initial_capacity {
            free.push(T::default());
        }
        Pool {
            free: Mutex::new(free),
            initial_capacity,
        }
    }

    /// Rent an instance, falling back to allocation on exhaustion (spec
    /// §7: "soft degradation", not a hard failure).
    pub fn rent(&self) -> T {
        let mut free = self.free.lock();
        free.pop().unwrap_or_else(|| {
            warn!(
                initial_capacity = self.initial_capacity,
                "command pool exhausted, falling back to allocation"
            );
            T::default()
        })
    }

    /// Return an instance, resetting it to default first.
    pub fn give_back(&self, mut value: T) {
        value.reset_to_default();
        self.free.lock().push(value);
    }

    /// Number of instances currently parked in the free list. Exposed for
    /// pool-inspecting tests (spec §8 scenario 1).
    pub fn free_count(&self) -> usize {
        self.free.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Thing {
        value: i32,
    }
    impl Poolable for Thing {}

    #[test]
    fn rent_and_return_preserves_default() {
        let pool: Pool<Thing> = Pool::new(2);
        assert_eq!(pool.free_count(), 2);
        let mut t = pool.rent();
        assert_eq!(pool.free_count(), 1);
        t.value = 99;
        pool.give_back(t);
        assert_eq!(pool.free_count(), 2);
        let reused = pool.rent();
        assert_eq!(reused.value, 0);
    }

    #[test]
    fn exhaustion_falls_back_to_allocation() {
        let pool: Pool<Thing> = Pool::new(0);
        assert_eq!(pool.free_count(), 0);
        let t = pool.rent();
        assert_eq!(t.value, 0);
    }
}

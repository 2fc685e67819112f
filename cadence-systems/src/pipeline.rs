//! System pipeline: dispatches a [`SystemGroup`] in list order, applying
//! each system's shape-specific contract (spec §4.E).

use crate::system::{FrameContext, SystemGroup, SystemKind};
use cadence_core::{EntityRegistry, TypeErasedHandle};
use tracing::trace_span;

#[cfg(feature = "par-iter")]
use rayon::prelude::*;

pub struct Pipeline;

impl Pipeline {
    /// Run every enabled system in `group`, in order, against `registry`
    /// and `context`.
    ///
    /// Parallel systems' `process_entity` dispatch order across matched
    /// entities is implementation-defined (spec §9 open question); with
    /// the `par-iter` feature it runs via `rayon`, otherwise it runs
    /// single-threaded in handle order — either is a conforming choice
    /// per spec §4.E.
    pub fn execute(group: &mut SystemGroup, registry: &mut EntityRegistry, context: &FrameContext) {
        for system in &mut group.systems {
            if !system.enabled {
                continue;
            }
            let _span = trace_span!("system", name = system.name).entered();
            match &mut system.kind {
                SystemKind::Serial(serial) => serial.execute(registry, context),
                SystemKind::Parallel(parallel) => {
                    let registry_ref: &EntityRegistry = registry;
                    let query = parallel.query();
                    let matched: Vec<TypeErasedHandle> = registry_ref
                        .all_entities()
                        .filter(|h| query.map(|q| q.matches(*h, registry_ref)).unwrap_or(true))
                        .collect();

                    #[cfg(feature = "par-iter")]
                    {
                        matched
                            .par_iter()
                            .for_each(|h| parallel.process_entity(*h, context));
                    }
                    #[cfg(not(feature = "par-iter"))]
                    {
                        for h in matched {
                            parallel.process_entity(h, context);
                        }
                    }
                }
                SystemKind::MessageQueue(message_queue) => {
                    let registry_ref: &EntityRegistry = registry;
                    message_queue.process_messages(registry_ref, context);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::{MessageQueueSystem, ParallelSystem, SerialSystem, System};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn context() -> FrameContext {
        FrameContext {
            frame_number: 1,
            delta_ticks: 1,
            delta_seconds: 1.0 / 60.0,
            total_ticks: 1,
        }
    }

    struct CountingSerial {
        calls: Arc<AtomicUsize>,
    }
    impl SerialSystem for CountingSerial {
        fn execute(&mut self, _registry: &mut EntityRegistry, _context: &FrameContext) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct CountingParallel {
        calls: Arc<AtomicUsize>,
    }
    impl ParallelSystem for CountingParallel {
        fn process_entity(&self, _handle: TypeErasedHandle, _context: &FrameContext) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct CountingMessageQueue {
        calls: Arc<AtomicUsize>,
    }
    impl MessageQueueSystem for CountingMessageQueue {
        fn process_messages(&mut self, _registry: &EntityRegistry, _context: &FrameContext) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn execution_order_follows_group_order() {
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        struct Recording {
            tag: &'static str,
            order: Arc<std::sync::Mutex<Vec<&'static str>>>,
        }
        impl SerialSystem for Recording {
            fn execute(&mut self, _r: &mut EntityRegistry, _c: &FrameContext) {
                self.order.lock().unwrap().push(self.tag);
            }
        }

        let mut group = SystemGroup::new();
        group.push(System::serial(
            "first",
            Recording {
                tag: "first",
                order: order.clone(),
            },
        ));
        group.push(System::serial(
            "second",
            Recording {
                tag: "second",
                order: order.clone(),
            },
        ));

        let mut registry = EntityRegistry::new();
        Pipeline::execute(&mut group, &mut registry, &context());
        assert_eq!(*order.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn disabled_system_is_skipped() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut group = SystemGroup::new();
        group.push(System::serial("s", CountingSerial { calls: calls.clone() }));
        group.systems[0].enabled = false;

        let mut registry = EntityRegistry::new();
        Pipeline::execute(&mut group, &mut registry, &context());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn parallel_system_runs_once_per_matched_entity() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = EntityRegistry::new();

        let mut group = SystemGroup::new();
        group.push(System::parallel(
            "p",
            CountingParallel { calls: calls.clone() },
        ));

        Pipeline::execute(&mut group, &mut registry, &context());
        // Registry has no registered contexts, so the built-in (None
        // query => all entities from the registry) still yields zero
        // matches since `all_entities` iterates the registry, not arenas.
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn message_queue_system_is_dispatched() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut group = SystemGroup::new();
        group.push(System::message_queue(
            "mq",
            CountingMessageQueue { calls: calls.clone() },
        ));
        let mut registry = EntityRegistry::new();
        Pipeline::execute(&mut group, &mut registry, &context());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

//! Step-to-convergence driver for the Message phase (spec §4.D).
//!
//! Grounded on `other_examples/ef6a5698_tachyon-beep-murk_tick.rs`'s bounded
//! re-tick loop for the "promote, drain, check for more work" shape; the
//! registered-queue abstraction is `command::StepProcessable` so a processor
//! can drive a heterogeneous set of per-entity, per-kind queues without
//! knowing their command types.

use crate::command::StepProcessable;
use crate::error::StepError;
use std::sync::Arc;
use tracing::{debug, warn};

/// Owns the set of command queues that must converge together within one
/// Message phase, and drives the promote/drain loop bounded by
/// `max_step_depth` (spec §4.D, `CadenceConfig::max_step_depth`).
pub struct StepProcessor {
    queues: Vec<Arc<dyn StepProcessable>>,
    max_step_depth: u32,
}

impl StepProcessor {
    pub fn new(max_step_depth: u32) -> Self {
        StepProcessor {
            queues: Vec::new(),
            max_step_depth,
        }
    }

    /// Register a queue to participate in this processor's convergence
    /// loop. Typically called once per queue at setup time.
    pub fn register(&mut self, queue: Arc<dyn StepProcessable>) {
        self.queues.push(queue);
    }

    /// Run `drain_fn` repeatedly until no registered queue has pending
    /// work, promoting each queue's `pending` into `current` before each
    /// call. Returns the number of steps run, or `StepError` if
    /// `max_step_depth` is exceeded without converging (spec §4.D: a
    /// runaway producer chain is a fatal, surfaced error, not a silent
    /// truncation).
    pub fn process_all_steps(&self, mut drain_fn: impl FnMut()) -> Result<u32, StepError> {
        let mut steps = 0u32;
        loop {
            for queue in &self.queues {
                queue.merge_pending_to_current();
            }
            drain_fn();
            steps += 1;

            if steps > self.max_step_depth {
                warn!(
                    max_step_depth = self.max_step_depth,
                    steps, "step processor exceeded max_step_depth without converging"
                );
                return Err(StepError {
                    max_depth: self.max_step_depth,
                    steps_run: steps,
                });
            }

            if !self.queues.iter().any(|q| q.has_pending()) {
                debug!(steps, "step processor converged");
                return Ok(steps);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Command, CommandQueue, Timing};
    use crate::handle::{EntityKind, TypeErasedHandle};
    use crate::pool::{Pool, Poolable};
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Unit;
    impl EntityKind for Unit {
        const KIND_NAME: &'static str = "Unit";
    }
    fn handle() -> TypeErasedHandle {
        crate::handle::Handle::<Unit>::new(0, 0).erase()
    }

    #[derive(Default)]
    struct Chain {
        remaining_hops: u32,
    }
    impl Poolable for Chain {}
    impl Command for Chain {
        fn execute(&self, _handle: TypeErasedHandle) {}
    }

    #[test]
    fn converges_when_no_more_pending() {
        let pool = Arc::new(Pool::<Chain>::new(4));
        let queue = Arc::new(CommandQueue::new(pool, true));
        queue.enqueue(|c: &mut Chain| c.remaining_hops = 0, Timing::NextStep);

        let mut processor = StepProcessor::new(100);
        processor.register(queue.clone());

        let q = queue.clone();
        let steps = processor
            .process_all_steps(|| q.execute(handle()))
            .expect("converges");
        assert_eq!(steps, 1);
    }

    #[test]
    fn three_step_chain_converges_at_three() {
        // Each step's drain re-enqueues one more hop until a counter hits
        // zero, exercising multi-step convergence (spec §8 scenario 4).
        let pool = Arc::new(Pool::<Chain>::new(4));
        let queue = Arc::new(CommandQueue::new(pool, true));
        let hops_left = Rc::new(RefCell::new(2u32));

        queue.enqueue(|c: &mut Chain| c.remaining_hops = 2, Timing::NextStep);

        let mut processor = StepProcessor::new(100);
        processor.register(queue.clone());

        let q = queue.clone();
        let hops = hops_left.clone();
        let steps = processor
            .process_all_steps(|| {
                q.execute(handle());
                let mut remaining = hops.borrow_mut();
                if *remaining > 0 {
                    *remaining -= 1;
                    q.enqueue(|c: &mut Chain| c.remaining_hops = *remaining, Timing::NextStep);
                }
            })
            .expect("converges");
        assert_eq!(steps, 3);
    }

    #[test]
    fn exceeding_max_step_depth_is_fatal() {
        let pool = Arc::new(Pool::<Chain>::new(4));
        let queue = Arc::new(CommandQueue::new(pool, true));
        queue.enqueue(|_| {}, Timing::NextStep);

        let mut processor = StepProcessor::new(2);
        processor.register(queue.clone());

        let q = queue.clone();
        let counter = AtomicU32::new(0);
        let result = processor.process_all_steps(|| {
            q.execute(handle());
            // Always re-enqueue: this chain never converges.
            counter.fetch_add(1, Ordering::Relaxed);
            q.enqueue(|_| {}, Timing::NextStep);
        });
        let err = result.expect_err("must report a fatal StepError");
        assert_eq!(err.max_depth, 2);
        assert_eq!(err.steps_run, 3);
    }
}

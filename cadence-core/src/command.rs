//! The triple-buffered, priority-sorted, signal-deduplicated per-entity
//! command queue (spec §4.C).
//!
//! The docstring shape (thread-safety contract, FIFO flush order) follows
//! `other_examples/9733854e_*_ecs-system-command.rs`'s `CommandBuffer`;
//! the three-buffer promotion scheme and signal dedup are spec'd directly
//! in spec.md §3/§4.C and are not present in any single example file.

use crate::handle::TypeErasedHandle;
use crate::pool::{Pool, Poolable};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::trace;

/// When a queued command should be promoted into `current` (spec §3).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Timing {
    /// Executed at the next step of the current frame's Message phase.
    NextStep,
    /// Deferred to the first step of the *next* frame's Message phase.
    NextFrame,
}

/// A pooled, reset-on-return unit of deferred state change (spec §3, §4.C).
pub trait Command: Poolable + Send + 'static {
    /// Higher executes first within a step (spec §4.C ordering).
    fn priority(&self) -> i32 {
        0
    }
    /// At most one instance of a signal command may be resident in a
    /// queue's pending+current buffers at a time (spec §3, §8).
    fn is_signal(&self) -> bool {
        false
    }
    /// Apply this command's effect to `handle`.
    fn execute(&self, handle: TypeErasedHandle);
}

struct QueueEntry<C> {
    command: C,
    priority: i32,
    sequence: u64,
    is_signal: bool,
}

struct QueueState<C> {
    current: Vec<QueueEntry<C>>,
    pending: Vec<QueueEntry<C>>,
    next_frame: Vec<QueueEntry<C>>,
    /// Entries that finished executing but, because this queue was not
    /// declared `clear_after_execute`, await a subsequent explicit
    /// `clear()`/`force_clear()` before their instances return to the
    /// pool (see `DESIGN.md`'s note on this spec ambiguity).
    leftover: Vec<C>,
    sequence: u64,
}

impl<C> Default for QueueState<C> {
    fn default() -> Self {
        QueueState {
            current: Vec::new(),
            pending: Vec::new(),
            next_frame: Vec::new(),
            leftover: Vec::new(),
            sequence: 0,
        }
    }
}

fn has_signal<C>(entries: &[QueueEntry<C>]) -> bool {
    entries.iter().any(|e| e.is_signal)
}

/// Capability a [`crate::step::StepProcessor`] needs from any registered
/// queue: whether it has work to promote, and how to promote it. Object-
/// safe so a processor can hold a heterogeneous set of command queues.
pub trait StepProcessable: Send + Sync {
    fn has_pending(&self) -> bool;
    fn merge_pending_to_current(&self);
}

/// Per-entity, per-queue-kind command queue (spec §3, §4.C).
pub struct CommandQueue<C: Command> {
    state: Mutex<QueueState<C>>,
    pool: Arc<Pool<C>>,
    clear_after_execute: bool,
}

impl<C: Command> CommandQueue<C> {
    pub fn new(pool: Arc<Pool<C>>, clear_after_execute: bool) -> Self {
        CommandQueue {
            state: Mutex::new(QueueState::default()),
            pool,
            clear_after_execute,
        }
    }

    /// Rent a `C` from the pool, initialize it, and enqueue it at `timing`.
    ///
    /// Returns `false` without enqueuing if `C` is a signal type and one
    /// is already resident in `pending`+`current` (the rented instance is
    /// returned to the pool), or if the initializer otherwise declines —
    /// enqueue never panics or propagates a command-side error (spec
    /// §4.C failure semantics).
    pub fn enqueue<F: FnOnce(&mut C)>(&self, initializer: F, timing: Timing) -> bool {
        let mut command = self.pool.rent();
        initializer(&mut command);
        let priority = command.priority();
        let is_signal = command.is_signal();

        let mut state = self.state.lock();
        if is_signal && (has_signal(&state.current) || has_signal(&state.pending)) {
            drop(state);
            trace!("signal command rejected: one already resident");
            self.pool.give_back(command);
            return false;
        }

        let sequence = state.sequence;
        state.sequence += 1;
        let entry = QueueEntry {
            command,
            priority,
            sequence,
            is_signal,
        };
        match timing {
            Timing::NextStep => state.pending.push(entry),
            Timing::NextFrame => state.next_frame.push(entry),
        }
        true
    }

    /// `true` if a subsequent step is needed to drain `pending`.
    pub fn has_pending(&self) -> bool {
        !self.state.lock().pending.is_empty()
    }

    /// Promote `pending` into `current` (a cheap swap, not a copy) and
    /// sort `current` by priority descending, sequence ascending. A no-op
    /// when `pending` is empty (spec §8 boundary behavior).
    pub fn merge_pending_to_current(&self) {
        let mut state = self.state.lock();
        if state.pending.is_empty() {
            return;
        }
        debug_assert!(
            state.current.is_empty(),
            "merge_pending_to_current called while current was not yet drained"
        );
        std::mem::swap(&mut state.current, &mut state.pending);
        state
            .current
            .sort_by(|a, b| b.priority.cmp(&a.priority).then(a.sequence.cmp(&b.sequence)));
    }

    /// Promote `next_frame` into `pending`. Symmetric to
    /// `merge_pending_to_current`, but additive rather than a destructive
    /// swap: `pending` may already hold entries enqueued with `NextStep`
    /// timing at the start of the new frame's first step.
    pub fn merge_next_frame_to_pending(&self) {
        let mut state = self.state.lock();
        if state.next_frame.is_empty() {
            return;
        }
        let next = std::mem::take(&mut state.next_frame);
        state.pending.extend(next);
    }

    /// Execute every entry currently in `current`, in sorted order.
    ///
    /// The loop re-locks and re-checks `current`'s length before each
    /// removal rather than iterating a snapshot, so a `force_clear` called
    /// reentrantly by a command's own `execute` (on this same queue) is
    /// observed immediately and the remaining commands are skipped — the
    /// bound is never read stale, so no out-of-range access is possible
    /// (spec §9 open question).
    pub fn execute(&self, handle: TypeErasedHandle) {
        loop {
            let entry = {
                let mut state = self.state.lock();
                if state.current.is_empty() {
                    break;
                }
                state.current.remove(0)
            };
            entry.command.execute(handle);
            if self.clear_after_execute {
                self.pool.give_back(entry.command);
            } else {
                self.state.lock().leftover.push(entry.command);
            }
        }
    }

    /// Return `pending` and `next_frame` (and any leftover entries from a
    /// non-`clear_after_execute` `execute()`) to the pool. Does not touch
    /// an in-flight `current` buffer.
    pub fn clear(&self) {
        let (pending, next_frame, leftover) = {
            let mut state = self.state.lock();
            (
                std::mem::take(&mut state.pending),
                std::mem::take(&mut state.next_frame),
                std::mem::take(&mut state.leftover),
            )
        };
        for e in pending {
            self.pool.give_back(e.command);
        }
        for e in next_frame {
            self.pool.give_back(e.command);
        }
        for c in leftover {
            self.pool.give_back(c);
        }
    }

    /// Return all three buffers to the pool. Tolerated while `execute` is
    /// running (on the same thread, reentrantly): `execute`'s loop will
    /// observe the now-empty `current` on its next iteration and stop.
    pub fn force_clear(&self) {
        let (current, pending, next_frame, leftover) = {
            let mut state = self.state.lock();
            (
                std::mem::take(&mut state.current),
                std::mem::take(&mut state.pending),
                std::mem::take(&mut state.next_frame),
                std::mem::take(&mut state.leftover),
            )
        };
        for e in current {
            self.pool.give_back(e.command);
        }
        for e in pending {
            self.pool.give_back(e.command);
        }
        for e in next_frame {
            self.pool.give_back(e.command);
        }
        for c in leftover {
            self.pool.give_back(c);
        }
    }

    /// Current buffer's priority-sorted length, for tests/diagnostics.
    pub fn current_len(&self) -> usize {
        self.state.lock().current.len()
    }

    pub fn pending_len(&self) -> usize {
        self.state.lock().pending.len()
    }
}

impl<C: Command> StepProcessable for CommandQueue<C> {
    fn has_pending(&self) -> bool {
        CommandQueue::has_pending(self)
    }
    fn merge_pending_to_current(&self) {
        CommandQueue::merge_pending_to_current(self)
    }
}

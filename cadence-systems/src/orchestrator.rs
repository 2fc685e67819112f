//! Six-phase frame orchestrator (spec §4.F).
//!
//! `update` runs Collision, Message, Decision, Execution (phases 1-4);
//! `late_update` runs Reconciliation, Cleanup (phases 5-6), so a host can
//! interleave rendering or physics between the two halves. Each phase is
//! just a [`SystemGroup`] dispatched through [`Pipeline::execute`] — the
//! orchestrator itself carries no gameplay logic, only the fixed ordering
//! contract.

use crate::pipeline::Pipeline;
use crate::system::{FrameContext, SystemGroup};
use cadence_core::EntityRegistry;
use tracing::debug_span;

/// Owns one [`SystemGroup`] per phase and the running frame/tick counters
/// (spec §4.F).
pub struct FrameOrchestrator {
    pub collision: SystemGroup,
    pub message: SystemGroup,
    pub decision: SystemGroup,
    pub execution: SystemGroup,
    pub reconciliation: SystemGroup,
    pub cleanup: SystemGroup,

    frame_number: u64,
    total_ticks: u64,
    /// The context `update` built this frame, reused by `late_update` so
    /// both halves of one tick see identical frame/tick numbers.
    current_context: Option<FrameContext>,
}

impl FrameOrchestrator {
    pub fn new() -> Self {
        FrameOrchestrator {
            collision: SystemGroup::new(),
            message: SystemGroup::new(),
            decision: SystemGroup::new(),
            execution: SystemGroup::new(),
            reconciliation: SystemGroup::new(),
            cleanup: SystemGroup::new(),
            frame_number: 0,
            total_ticks: 0,
            current_context: None,
        }
    }

    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    pub fn total_ticks(&self) -> u64 {
        self.total_ticks
    }

    /// Phases 1-4: Collision, Message, Decision, Execution. Starts a new
    /// frame; advances `frame_number` and `total_ticks`.
    pub fn update(&mut self, registry: &mut EntityRegistry, delta_ticks: u32, delta_seconds: f32) {
        self.frame_number += 1;
        self.total_ticks += delta_ticks as u64;
        let context = FrameContext {
            frame_number: self.frame_number,
            delta_ticks,
            delta_seconds,
            total_ticks: self.total_ticks,
        };
        self.current_context = Some(context);

        let _span = debug_span!("frame", frame = self.frame_number).entered();
        Pipeline::execute(&mut self.collision, registry, &context);
        Pipeline::execute(&mut self.message, registry, &context);
        Pipeline::execute(&mut self.decision, registry, &context);
        Pipeline::execute(&mut self.execution, registry, &context);
    }

    /// Phases 5-6: Reconciliation, Cleanup. Must be called once after each
    /// `update`, before the next `update` begins.
    pub fn late_update(&mut self, registry: &mut EntityRegistry) {
        let context = self
            .current_context
            .expect("late_update called without a preceding update");
        Pipeline::execute(&mut self.reconciliation, registry, &context);
        Pipeline::execute(&mut self.cleanup, registry, &context);
        self.current_context = None;
    }
}

impl Default for FrameOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::{SerialSystem, System};
    use std::sync::{Arc, Mutex};

    struct Recording {
        tag: &'static str,
        order: Arc<Mutex<Vec<&'static str>>>,
    }
    impl SerialSystem for Recording {
        fn execute(&mut self, _registry: &mut EntityRegistry, _context: &FrameContext) {
            self.order.lock().unwrap().push(self.tag);
        }
    }

    #[test]
    fn phases_run_in_fixed_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut orchestrator = FrameOrchestrator::new();
        let phases: [(&mut SystemGroup, &'static str); 6] = [
            (&mut orchestrator.collision, "collision"),
            (&mut orchestrator.message, "message"),
            (&mut orchestrator.decision, "decision"),
            (&mut orchestrator.execution, "execution"),
            (&mut orchestrator.reconciliation, "reconciliation"),
            (&mut orchestrator.cleanup, "cleanup"),
        ];
        for (group, tag) in phases {
            group.push(System::serial(
                tag,
                Recording {
                    tag,
                    order: order.clone(),
                },
            ));
        }

        let mut registry = EntityRegistry::new();
        orchestrator.update(&mut registry, 1, 1.0 / 60.0);
        orchestrator.late_update(&mut registry);

        assert_eq!(
            *order.lock().unwrap(),
            vec![
                "collision",
                "message",
                "decision",
                "execution",
                "reconciliation",
                "cleanup",
            ]
        );
    }

    #[test]
    fn update_increments_frame_and_tick_counters() {
        let mut orchestrator = FrameOrchestrator::new();
        let mut registry = EntityRegistry::new();
        orchestrator.update(&mut registry, 3, 0.05);
        orchestrator.late_update(&mut registry);
        assert_eq!(orchestrator.frame_number(), 1);
        assert_eq!(orchestrator.total_ticks(), 3);

        orchestrator.update(&mut registry, 2, 0.05);
        orchestrator.late_update(&mut registry);
        assert_eq!(orchestrator.frame_number(), 2);
        assert_eq!(orchestrator.total_ticks(), 5);
    }

    #[test]
    #[should_panic(expected = "late_update called without a preceding update")]
    fn late_update_without_update_panics() {
        let mut orchestrator = FrameOrchestrator::new();
        let mut registry = EntityRegistry::new();
        orchestrator.late_update(&mut registry);
    }
}

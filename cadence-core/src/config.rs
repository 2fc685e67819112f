//! Host-supplied configuration.
//!
//! The core owns no on-disk format and reads no environment variables
//! (spec §6) — hosts build a `CadenceConfig` in code and pass it to the
//! constructors that need it.

/// Tunables shared across the arena, step processor and flow-tree runtime.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct CadenceConfig {
    /// Upper bound on step-processor iterations within one Message phase
    /// before [`crate::error::StepError`] is raised (spec §4.D).
    pub max_step_depth: u32,
    /// Initial slot count new per-kind arenas reserve (spec §4.A).
    pub arena_initial_capacity: usize,
    /// Depth of the flow-tree call stack (spec §4.G).
    pub call_stack_depth: usize,
}

impl Default for CadenceConfig {
    fn default() -> Self {
        CadenceConfig {
            max_step_depth: 100,
            arena_initial_capacity: 1024,
            call_stack_depth: 64,
        }
    }
}

//! `cadence`: a deterministic, tick-driven simulation substrate for
//! action games.
//!
//! This crate is a thin facade over [`cadence_core`] (entity identity,
//! command queues, the resource loader, snapshot/dependency/clone
//! utilities) and [`cadence_systems`] (the system pipeline, the frame
//! orchestrator, the flow-tree runtime). Most hosts only need `use
//! cadence::prelude::*;`.

pub use cadence_core;
pub use cadence_systems;

/// Re-exports of the types a host assembling a frame loop touches most.
pub mod prelude {
    pub use cadence_core::{
        dependency_sort, is_kind, Arena, CadenceConfig, Command, CommandQueue, CycleError,
        DeepClone, EntityContext, EntityKind, EntityRegistry, Handle, Loader, Pool, Poolable,
        Resource, ResourceCatalog, ResourceError, ResourceState, SnapshotError, SnapshotReader,
        SnapshotWriter, StepError, StepProcessable, StepProcessor, Timing, TypeErasedHandle,
    };
    pub use cadence_systems::{
        ActiveEntityQuery, FlowContext, FlowNode, FlowStatus, FrameContext, FrameOrchestrator,
        MessageQueueSystem, ParallelSystem, Pipeline, Query, SerialSystem, System, SystemGroup,
    };
}

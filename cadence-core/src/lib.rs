//! The core data model of the tick-driven simulation substrate: entity
//! identity, arenas, the entity registry, command queues and the step
//! processor, resources, the snapshot codec, dependency sort, and deep
//! clone.
//!
//! This crate has no notion of frames, phases, or systems — that
//! orchestration lives in `cadence-systems`. It is the foundation the rest
//! of the workspace builds on, in the same way the teacher's own core
//! crate precedes its scheduling and query layers.

pub mod arena;
pub mod command;
pub mod config;
pub mod deepclone;
pub mod depsort;
pub mod error;
pub mod handle;
pub mod pool;
pub mod registry;
pub mod resource;
pub mod snapshot;
pub mod step;

pub use arena::Arena;
pub use command::{Command, CommandQueue, StepProcessable, Timing};
pub use config::CadenceConfig;
pub use deepclone::{CloneMode, CloneTable, DeepClone};
pub use depsort::sort as dependency_sort;
pub use error::{CycleError, ResourceError, SnapshotError, StepError};
pub use handle::{is_kind, EntityKind, Handle, TypeErasedHandle};
pub use pool::{Pool, Poolable};
pub use registry::{EntityContext, EntityRegistry};
pub use resource::{Loader, Resource, ResourceCatalog, ResourceState};
pub use snapshot::{CyclableRead, SnapshotReader, SnapshotWriter};
pub use step::StepProcessor;

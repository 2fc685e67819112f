//! The three system shapes and their ordered grouping (spec §3, §4.E).

use crate::query::Query;
use cadence_core::{EntityRegistry, TypeErasedHandle};

/// `{ frame_number, delta_ticks, delta_seconds, total_ticks }` (spec §3).
/// `delta_ticks` is authoritative; `delta_seconds` is a derived
/// convenience for systems that want wall-clock-shaped math.
#[derive(Clone, Copy, Debug)]
pub struct FrameContext {
    pub frame_number: u64,
    pub delta_ticks: u32,
    pub delta_seconds: f32,
    pub total_ticks: u64,
}

/// Receives the registry and frame context directly; iterates as it wishes.
pub trait SerialSystem: Send {
    fn execute(&mut self, registry: &mut EntityRegistry, context: &FrameContext);
}

/// Provides an optional entity filter; the pipeline iterates matching
/// entities and dispatches `process_entity` per handle (spec §4.E).
pub trait ParallelSystem: Send + Sync {
    /// `None` means every entity returned by `registry.all_entities()` is
    /// a candidate.
    fn query(&self) -> Option<&dyn Query> {
        None
    }
    fn process_entity(&self, handle: TypeErasedHandle, context: &FrameContext);
}

/// Wraps a command queue and step processor; drains to convergence.
pub trait MessageQueueSystem: Send {
    fn process_messages(&mut self, registry: &EntityRegistry, context: &FrameContext);
}

/// The three system shapes (spec §3). `System` additionally carries the
/// `is_enabled` flag the pipeline consults before dispatch.
pub enum SystemKind {
    Serial(Box<dyn SerialSystem>),
    Parallel(Box<dyn ParallelSystem>),
    MessageQueue(Box<dyn MessageQueueSystem>),
}

pub struct System {
    pub name: &'static str,
    pub enabled: bool,
    pub kind: SystemKind,
}

impl System {
    pub fn serial(name: &'static str, system: impl SerialSystem + 'static) -> Self {
        System {
            name,
            enabled: true,
            kind: SystemKind::Serial(Box::new(system)),
        }
    }

    pub fn parallel(name: &'static str, system: impl ParallelSystem + 'static) -> Self {
        System {
            name,
            enabled: true,
            kind: SystemKind::Parallel(Box::new(system)),
        }
    }

    pub fn message_queue(name: &'static str, system: impl MessageQueueSystem + 'static) -> Self {
        System {
            name,
            enabled: true,
            kind: SystemKind::MessageQueue(Box::new(system)),
        }
    }
}

/// An ordered list of systems; execution order is the list order
/// (spec §3).
#[derive(Default)]
pub struct SystemGroup {
    pub systems: Vec<System>,
}

impl SystemGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, system: System) -> &mut Self {
        self.systems.push(system);
        self
    }
}

//! System pipeline, frame orchestrator and flow-tree runtime built atop
//! `cadence-core`'s entity arenas, command queues and resource loader.

pub mod flow;
pub mod orchestrator;
pub mod pipeline;
pub mod query;
pub mod system;

pub use flow::{
    Action, AlwaysFailure, AlwaysSuccess, BlackboardValue, Condition, Delay, Event, Failer,
    FlowContext, FlowNode, FlowStatus, Guard, Inverter, Join, Parallel as FlowParallel,
    ParallelPolicy, Race, Repeat, RepeatUntilFail, RepeatUntilSuccess, Retry, Return, Selector,
    Sequence, Succeeder, SubTree, Timeout, Wait, WaitUntil, Yield,
};
pub use orchestrator::FrameOrchestrator;
pub use pipeline::Pipeline;
pub use query::{ActiveEntityQuery, Query};
pub use system::{
    FrameContext, MessageQueueSystem, ParallelSystem, SerialSystem, System, SystemGroup,
    SystemKind,
};

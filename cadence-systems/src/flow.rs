//! Flow tree: the behavior-tree runtime with call-stack-indexed decorator
//! state for self- and mutually-recursive sub-trees (spec §4.G).
//!
//! The call-stack-indexed-state trick is this crate's own answer to
//! spec §9's "cyclic graphs" design note (index per-depth state by a
//! traversal-provided call depth rather than a single instance-owned
//! field); no example repo in the pack implements a behavior tree, so the
//! node palette's shape (trait object children, `tick`/`reset` contract)
//! follows the teacher's own `Box<dyn Schedulable>` system trait-object
//! style rather than a pack example.

use cadence_core::handle::TypeErasedHandle;
use fxhash::FxHashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{trace, warn};

/// Result of one `tick` (spec §3).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlowStatus {
    Running,
    Success,
    Failure,
}

/// A value a flow tree may read from or write to the blackboard.
#[derive(Clone, Debug, PartialEq)]
pub enum BlackboardValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Handle(TypeErasedHandle),
}

/// One call-stack frame, pushed by a `SubTree` node invocation.
#[derive(Clone, Copy, Debug)]
struct CallFrame {
    tree_id: u64,
}

/// Per-tick context threaded through every node, carrying the shared
/// blackboard and the bounded call stack that lets a node's per-depth
/// state distinguish self-recursive invocations (spec §3, §4.G).
pub struct FlowContext {
    pub blackboard: FxHashMap<String, BlackboardValue>,
    pub delta_ticks: u32,
    call_stack: Vec<CallFrame>,
    max_call_stack_depth: usize,
}

impl FlowContext {
    pub fn new(max_call_stack_depth: usize) -> Self {
        FlowContext {
            blackboard: FxHashMap::default(),
            delta_ticks: 0,
            call_stack: Vec::new(),
            max_call_stack_depth,
        }
    }

    /// Current call depth, used by decorator/leaf nodes to index their
    /// per-depth state vectors.
    pub fn current_call_depth(&self) -> usize {
        self.call_stack.len()
    }

    /// Push a sub-tree invocation frame. Returns `false` (and does not
    /// push) if the call stack is already at its configured bound — the
    /// caller should treat this as `Failure` rather than overflow.
    fn push_frame(&mut self, tree_id: u64) -> bool {
        if self.call_stack.len() >= self.max_call_stack_depth {
            warn!(
                max_call_stack_depth = self.max_call_stack_depth,
                "flow tree call stack exhausted"
            );
            return false;
        }
        self.call_stack.push(CallFrame { tree_id });
        true
    }

    fn pop_frame(&mut self) {
        self.call_stack.pop();
    }
}

/// A flow tree node. Implementors that hold per-depth state (decorators
/// with Running semantics) must index it by [`FlowContext::current_call_depth`]
/// rather than a single field, so the same node instance can participate
/// in self-recursive or mutually-recursive trees without aliasing.
pub trait FlowNode: Send {
    fn tick(&mut self, ctx: &mut FlowContext) -> FlowStatus;

    /// Clear per-depth state for every depth and recurse into children.
    /// When `fire_exit_events` is true, a node that had entered (Running)
    /// but not yet exited fires its on_exit with `Failure` (spec §4.G).
    fn reset(&mut self, fire_exit_events: bool);
}

// ---------------------------------------------------------------------
// Composites
// ---------------------------------------------------------------------

/// Ticks children in order; Running or Failure from a child stops the
/// sequence at that child; Success advances to the next.
pub struct Sequence {
    children: Vec<Box<dyn FlowNode>>,
    running_index: usize,
}

impl Sequence {
    pub fn new(children: Vec<Box<dyn FlowNode>>) -> Self {
        Sequence {
            children,
            running_index: 0,
        }
    }
}

impl FlowNode for Sequence {
    fn tick(&mut self, ctx: &mut FlowContext) -> FlowStatus {
        while self.running_index < self.children.len() {
            match self.children[self.running_index].tick(ctx) {
                FlowStatus::Running => return FlowStatus::Running,
                FlowStatus::Success => self.running_index += 1,
                FlowStatus::Failure => {
                    self.running_index = 0;
                    return FlowStatus::Failure;
                }
            }
        }
        self.running_index = 0;
        FlowStatus::Success
    }

    fn reset(&mut self, fire_exit_events: bool) {
        self.running_index = 0;
        for child in &mut self.children {
            child.reset(fire_exit_events);
        }
    }
}

/// Ticks children in order; Running or Success from a child stops the
/// selector at that child; Failure advances to the next.
pub struct Selector {
    children: Vec<Box<dyn FlowNode>>,
    running_index: usize,
}

impl Selector {
    pub fn new(children: Vec<Box<dyn FlowNode>>) -> Self {
        Selector {
            children,
            running_index: 0,
        }
    }
}

impl FlowNode for Selector {
    fn tick(&mut self, ctx: &mut FlowContext) -> FlowStatus {
        while self.running_index < self.children.len() {
            match self.children[self.running_index].tick(ctx) {
                FlowStatus::Running => return FlowStatus::Running,
                FlowStatus::Failure => self.running_index += 1,
                FlowStatus::Success => {
                    self.running_index = 0;
                    return FlowStatus::Success;
                }
            }
        }
        self.running_index = 0;
        FlowStatus::Failure
    }

    fn reset(&mut self, fire_exit_events: bool) {
        self.running_index = 0;
        for child in &mut self.children {
            child.reset(fire_exit_events);
        }
    }
}

/// How a [`Parallel`] node combines its children's terminal results.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParallelPolicy {
    AllSuccess,
    AnySuccess,
    /// Succeeds once at least `required` children have succeeded.
    Configurable { required: usize },
}

/// Ticks every non-terminal child every call; combines results per policy.
pub struct Parallel {
    children: Vec<Box<dyn FlowNode>>,
    policy: ParallelPolicy,
    finished: Vec<Option<FlowStatus>>,
}

impl Parallel {
    pub fn new(children: Vec<Box<dyn FlowNode>>, policy: ParallelPolicy) -> Self {
        let finished = vec![None; children.len()];
        Parallel {
            children,
            policy,
            finished,
        }
    }
}

impl FlowNode for Parallel {
    fn tick(&mut self, ctx: &mut FlowContext) -> FlowStatus {
        for (child, slot) in self.children.iter_mut().zip(self.finished.iter_mut()) {
            if slot.is_none() {
                let status = child.tick(ctx);
                if status != FlowStatus::Running {
                    *slot = Some(status);
                }
            }
        }

        let successes = self.finished.iter().filter(|s| **s == Some(FlowStatus::Success)).count();
        let failures = self.finished.iter().filter(|s| **s == Some(FlowStatus::Failure)).count();
        let all_finished = self.finished.iter().all(|s| s.is_some());

        let done = match self.policy {
            ParallelPolicy::AllSuccess => all_finished || failures > 0,
            ParallelPolicy::AnySuccess => successes > 0 || all_finished,
            ParallelPolicy::Configurable { required } => successes >= required || all_finished,
        };

        if !done {
            return FlowStatus::Running;
        }

        let result = match self.policy {
            ParallelPolicy::AllSuccess => {
                if failures == 0 {
                    FlowStatus::Success
                } else {
                    FlowStatus::Failure
                }
            }
            ParallelPolicy::AnySuccess => {
                if successes > 0 {
                    FlowStatus::Success
                } else {
                    FlowStatus::Failure
                }
            }
            ParallelPolicy::Configurable { required } => {
                if successes >= required {
                    FlowStatus::Success
                } else {
                    FlowStatus::Failure
                }
            }
        };
        for slot in &mut self.finished {
            *slot = None;
        }
        result
    }

    fn reset(&mut self, fire_exit_events: bool) {
        for slot in &mut self.finished {
            *slot = None;
        }
        for child in &mut self.children {
            child.reset(fire_exit_events);
        }
    }
}

/// First child to reach a terminal result wins; the rest are interrupted
/// (reset with `fire_exit_events = true`).
pub struct Race {
    children: Vec<Box<dyn FlowNode>>,
}

impl Race {
    pub fn new(children: Vec<Box<dyn FlowNode>>) -> Self {
        Race { children }
    }
}

impl FlowNode for Race {
    fn tick(&mut self, ctx: &mut FlowContext) -> FlowStatus {
        for i in 0..self.children.len() {
            let status = self.children[i].tick(ctx);
            if status != FlowStatus::Running {
                for (j, child) in self.children.iter_mut().enumerate() {
                    if j != i {
                        child.reset(true);
                    }
                }
                return status;
            }
        }
        FlowStatus::Running
    }

    fn reset(&mut self, fire_exit_events: bool) {
        for child in &mut self.children {
            child.reset(fire_exit_events);
        }
    }
}

/// All children must reach a terminal result before this node finishes;
/// fails if any child failed.
pub struct Join {
    children: Vec<Box<dyn FlowNode>>,
    finished: Vec<Option<FlowStatus>>,
}

impl Join {
    pub fn new(children: Vec<Box<dyn FlowNode>>) -> Self {
        let finished = vec![None; children.len()];
        Join { children, finished }
    }
}

impl FlowNode for Join {
    fn tick(&mut self, ctx: &mut FlowContext) -> FlowStatus {
        for (child, slot) in self.children.iter_mut().zip(self.finished.iter_mut()) {
            if slot.is_none() {
                let status = child.tick(ctx);
                if status != FlowStatus::Running {
                    *slot = Some(status);
                }
            }
        }
        if !self.finished.iter().all(|s| s.is_some()) {
            return FlowStatus::Running;
        }
        let all_succeeded = self.finished.iter().all(|s| *s == Some(FlowStatus::Success));
        for slot in &mut self.finished {
            *slot = None;
        }
        if all_succeeded {
            FlowStatus::Success
        } else {
            FlowStatus::Failure
        }
    }

    fn reset(&mut self, fire_exit_events: bool) {
        for slot in &mut self.finished {
            *slot = None;
        }
        for child in &mut self.children {
            child.reset(fire_exit_events);
        }
    }
}

// ---------------------------------------------------------------------
// Decorators
// ---------------------------------------------------------------------

pub struct Inverter {
    child: Box<dyn FlowNode>,
}
impl Inverter {
    pub fn new(child: Box<dyn FlowNode>) -> Self {
        Inverter { child }
    }
}
impl FlowNode for Inverter {
    fn tick(&mut self, ctx: &mut FlowContext) -> FlowStatus {
        match self.child.tick(ctx) {
            FlowStatus::Running => FlowStatus::Running,
            FlowStatus::Success => FlowStatus::Failure,
            FlowStatus::Failure => FlowStatus::Success,
        }
    }
    fn reset(&mut self, fire_exit_events: bool) {
        self.child.reset(fire_exit_events);
    }
}

pub struct Succeeder {
    child: Box<dyn FlowNode>,
}
impl Succeeder {
    pub fn new(child: Box<dyn FlowNode>) -> Self {
        Succeeder { child }
    }
}
impl FlowNode for Succeeder {
    fn tick(&mut self, ctx: &mut FlowContext) -> FlowStatus {
        match self.child.tick(ctx) {
            FlowStatus::Running => FlowStatus::Running,
            _ => FlowStatus::Success,
        }
    }
    fn reset(&mut self, fire_exit_events: bool) {
        self.child.reset(fire_exit_events);
    }
}

pub struct Failer {
    child: Box<dyn FlowNode>,
}
impl Failer {
    pub fn new(child: Box<dyn FlowNode>) -> Self {
        Failer { child }
    }
}
impl FlowNode for Failer {
    fn tick(&mut self, ctx: &mut FlowContext) -> FlowStatus {
        match self.child.tick(ctx) {
            FlowStatus::Running => FlowStatus::Running,
            _ => FlowStatus::Failure,
        }
    }
    fn reset(&mut self, fire_exit_events: bool) {
        self.child.reset(fire_exit_events);
    }
}

#[derive(Default, Clone, Copy)]
struct RepeatState {
    iteration: u32,
}

/// Which terminal child result ends a repeat-style decorator's loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RepeatStopOn {
    /// Stop only after `count` iterations, regardless of child result.
    Count,
    /// Stop the moment the child succeeds.
    UntilSuccess,
    /// Stop the moment the child fails.
    UntilFail,
}

/// `Repeat(n)`, `RepeatUntilSuccess` and `RepeatUntilFail` share this
/// engine; only their stop condition differs (spec §4.G node palette).
/// Per-depth iteration counters, not a single field, is what lets the same
/// node instance recur through a self-referencing `SubTree` without the
/// depth-0 and depth-1 invocations aliasing each other's progress (spec
/// §8 scenario 6, §9 design note on cyclic graphs).
struct RepeatEngine {
    child: Box<dyn FlowNode>,
    count: u32,
    stop_on: RepeatStopOn,
    state_by_depth: Vec<RepeatState>,
}

impl RepeatEngine {
    fn state_mut(&mut self, depth: usize) -> &mut RepeatState {
        if self.state_by_depth.len() <= depth {
            self.state_by_depth.resize(depth + 1, RepeatState::default());
        }
        &mut self.state_by_depth[depth]
    }
}

impl FlowNode for RepeatEngine {
    fn tick(&mut self, ctx: &mut FlowContext) -> FlowStatus {
        let depth = ctx.current_call_depth();
        loop {
            if self.stop_on == RepeatStopOn::Count && self.state_mut(depth).iteration >= self.count
            {
                self.state_mut(depth).iteration = 0;
                return FlowStatus::Success;
            }
            let result = self.child.tick(ctx);
            match result {
                FlowStatus::Running => return FlowStatus::Running,
                FlowStatus::Success if self.stop_on == RepeatStopOn::UntilSuccess => {
                    self.child.reset(false);
                    self.state_mut(depth).iteration = 0;
                    return FlowStatus::Success;
                }
                FlowStatus::Failure if self.stop_on == RepeatStopOn::UntilFail => {
                    self.child.reset(false);
                    self.state_mut(depth).iteration = 0;
                    return FlowStatus::Failure;
                }
                FlowStatus::Success | FlowStatus::Failure => {
                    self.child.reset(false);
                    trace!(depth, "repeat engine advancing iteration");
                    self.state_mut(depth).iteration += 1;
                }
            }
        }
    }

    fn reset(&mut self, fire_exit_events: bool) {
        for state in &mut self.state_by_depth {
            *state = RepeatState::default();
        }
        self.child.reset(fire_exit_events);
    }
}

pub struct Repeat(RepeatEngine);
impl Repeat {
    pub fn new(child: Box<dyn FlowNode>, count: u32) -> Self {
        Repeat(RepeatEngine {
            child,
            count,
            stop_on: RepeatStopOn::Count,
            state_by_depth: Vec::new(),
        })
    }
}
impl FlowNode for Repeat {
    fn tick(&mut self, ctx: &mut FlowContext) -> FlowStatus {
        self.0.tick(ctx)
    }
    fn reset(&mut self, fire_exit_events: bool) {
        self.0.reset(fire_exit_events)
    }
}

pub struct RepeatUntilSuccess(RepeatEngine);
impl RepeatUntilSuccess {
    pub fn new(child: Box<dyn FlowNode>) -> Self {
        RepeatUntilSuccess(RepeatEngine {
            child,
            count: u32::MAX,
            stop_on: RepeatStopOn::UntilSuccess,
            state_by_depth: Vec::new(),
        })
    }
}
impl FlowNode for RepeatUntilSuccess {
    fn tick(&mut self, ctx: &mut FlowContext) -> FlowStatus {
        self.0.tick(ctx)
    }
    fn reset(&mut self, fire_exit_events: bool) {
        self.0.reset(fire_exit_events)
    }
}

pub struct RepeatUntilFail(RepeatEngine);
impl RepeatUntilFail {
    pub fn new(child: Box<dyn FlowNode>) -> Self {
        RepeatUntilFail(RepeatEngine {
            child,
            count: u32::MAX,
            stop_on: RepeatStopOn::UntilFail,
            state_by_depth: Vec::new(),
        })
    }
}
impl FlowNode for RepeatUntilFail {
    fn tick(&mut self, ctx: &mut FlowContext) -> FlowStatus {
        self.0.tick(ctx)
    }
    fn reset(&mut self, fire_exit_events: bool) {
        self.0.reset(fire_exit_events)
    }
}

/// `Retry(n)`: like `Repeat`, but only re-attempts on Failure; a Success
/// ends the loop immediately and a Failure after `n` attempts propagates.
pub struct Retry {
    child: Box<dyn FlowNode>,
    max_attempts: u32,
    state_by_depth: Vec<RepeatState>,
}
impl Retry {
    pub fn new(child: Box<dyn FlowNode>, max_attempts: u32) -> Self {
        Retry {
            child,
            max_attempts,
            state_by_depth: Vec::new(),
        }
    }
    fn state_mut(&mut self, depth: usize) -> &mut RepeatState {
        if self.state_by_depth.len() <= depth {
            self.state_by_depth.resize(depth + 1, RepeatState::default());
        }
        &mut self.state_by_depth[depth]
    }
}
impl FlowNode for Retry {
    fn tick(&mut self, ctx: &mut FlowContext) -> FlowStatus {
        let depth = ctx.current_call_depth();
        loop {
            match self.child.tick(ctx) {
                FlowStatus::Running => return FlowStatus::Running,
                FlowStatus::Success => {
                    self.child.reset(false);
                    self.state_mut(depth).iteration = 0;
                    return FlowStatus::Success;
                }
                FlowStatus::Failure => {
                    self.child.reset(false);
                    let state = self.state_mut(depth);
                    state.iteration += 1;
                    if state.iteration >= self.max_attempts {
                        state.iteration = 0;
                        return FlowStatus::Failure;
                    }
                }
            }
        }
    }
    fn reset(&mut self, fire_exit_events: bool) {
        for state in &mut self.state_by_depth {
            *state = RepeatState::default();
        }
        self.child.reset(fire_exit_events);
    }
}

#[derive(Default, Clone, Copy)]
struct BudgetState {
    elapsed_ticks: u32,
}

/// Fails the child once `ticks` have elapsed without it reaching a
/// terminal result.
pub struct Timeout {
    child: Box<dyn FlowNode>,
    ticks: u32,
    state_by_depth: Vec<BudgetState>,
}
impl Timeout {
    pub fn new(child: Box<dyn FlowNode>, ticks: u32) -> Self {
        Timeout {
            child,
            ticks,
            state_by_depth: Vec::new(),
        }
    }
    fn state_mut(&mut self, depth: usize) -> &mut BudgetState {
        if self.state_by_depth.len() <= depth {
            self.state_by_depth.resize(depth + 1, BudgetState::default());
        }
        &mut self.state_by_depth[depth]
    }
}
impl FlowNode for Timeout {
    fn tick(&mut self, ctx: &mut FlowContext) -> FlowStatus {
        let depth = ctx.current_call_depth();
        let delta = ctx.delta_ticks;
        let state = self.state_mut(depth);
        state.elapsed_ticks += delta;
        if state.elapsed_ticks >= self.ticks {
            state.elapsed_ticks = 0;
            self.child.reset(true);
            return FlowStatus::Failure;
        }
        let result = self.child.tick(ctx);
        if result != FlowStatus::Running {
            self.state_mut(depth).elapsed_ticks = 0;
        }
        result
    }
    fn reset(&mut self, fire_exit_events: bool) {
        for state in &mut self.state_by_depth {
            *state = BudgetState::default();
        }
        self.child.reset(fire_exit_events);
    }
}

/// Returns Running until `seconds` (converted via `ticks_per_second`) have
/// elapsed, then ticks the child every call thereafter.
pub struct Delay {
    child: Box<dyn FlowNode>,
    delay_ticks: u32,
    state_by_depth: Vec<BudgetState>,
}
impl Delay {
    pub fn new(child: Box<dyn FlowNode>, delay_ticks: u32) -> Self {
        Delay {
            child,
            delay_ticks,
            state_by_depth: Vec::new(),
        }
    }
    fn state_mut(&mut self, depth: usize) -> &mut BudgetState {
        if self.state_by_depth.len() <= depth {
            self.state_by_depth.resize(depth + 1, BudgetState::default());
        }
        &mut self.state_by_depth[depth]
    }
}
impl FlowNode for Delay {
    fn tick(&mut self, ctx: &mut FlowContext) -> FlowStatus {
        let depth = ctx.current_call_depth();
        let delta = ctx.delta_ticks;
        let state = self.state_mut(depth);
        if state.elapsed_ticks < self.delay_ticks {
            state.elapsed_ticks += delta;
            return FlowStatus::Running;
        }
        self.child.tick(ctx)
    }
    fn reset(&mut self, fire_exit_events: bool) {
        for state in &mut self.state_by_depth {
            *state = BudgetState::default();
        }
        self.child.reset(fire_exit_events);
    }
}

/// Gates its child on a predicate, re-evaluated every tick; fails outright
/// without ticking the child when the predicate is false.
pub struct Guard<F: Fn(&FlowContext) -> bool + Send> {
    child: Box<dyn FlowNode>,
    predicate: F,
}
impl<F: Fn(&FlowContext) -> bool + Send> Guard<F> {
    pub fn new(child: Box<dyn FlowNode>, predicate: F) -> Self {
        Guard { child, predicate }
    }
}
impl<F: Fn(&FlowContext) -> bool + Send> FlowNode for Guard<F> {
    fn tick(&mut self, ctx: &mut FlowContext) -> FlowStatus {
        if !(self.predicate)(ctx) {
            return FlowStatus::Failure;
        }
        self.child.tick(ctx)
    }
    fn reset(&mut self, fire_exit_events: bool) {
        self.child.reset(fire_exit_events);
    }
}

/// Fires `on_enter`/`on_exit` callbacks around the child's Running span.
pub struct Event<OnEnter: FnMut() + Send, OnExit: FnMut(FlowStatus) + Send> {
    child: Box<dyn FlowNode>,
    on_enter: OnEnter,
    on_exit: OnExit,
    entered_by_depth: Vec<bool>,
}
impl<OnEnter: FnMut() + Send, OnExit: FnMut(FlowStatus) + Send> Event<OnEnter, OnExit> {
    pub fn new(child: Box<dyn FlowNode>, on_enter: OnEnter, on_exit: OnExit) -> Self {
        Event {
            child,
            on_enter,
            on_exit,
            entered_by_depth: Vec::new(),
        }
    }
    fn entered_mut(&mut self, depth: usize) -> &mut bool {
        if self.entered_by_depth.len() <= depth {
            self.entered_by_depth.resize(depth + 1, false);
        }
        &mut self.entered_by_depth[depth]
    }
}
impl<OnEnter: FnMut() + Send, OnExit: FnMut(FlowStatus) + Send> FlowNode for Event<OnEnter, OnExit> {
    fn tick(&mut self, ctx: &mut FlowContext) -> FlowStatus {
        let depth = ctx.current_call_depth();
        if !*self.entered_mut(depth) {
            (self.on_enter)();
            *self.entered_mut(depth) = true;
        }
        let status = self.child.tick(ctx);
        if status != FlowStatus::Running {
            *self.entered_mut(depth) = false;
            (self.on_exit)(status);
        }
        status
    }
    fn reset(&mut self, fire_exit_events: bool) {
        for depth in 0..self.entered_by_depth.len() {
            if self.entered_by_depth[depth] {
                if fire_exit_events {
                    (self.on_exit)(FlowStatus::Failure);
                }
                self.entered_by_depth[depth] = false;
            }
        }
        self.child.reset(fire_exit_events);
    }
}

// ---------------------------------------------------------------------
// Leaves
// ---------------------------------------------------------------------

pub struct Action<F: FnMut(&mut FlowContext) -> FlowStatus + Send> {
    f: F,
}
impl<F: FnMut(&mut FlowContext) -> FlowStatus + Send> Action<F> {
    pub fn new(f: F) -> Self {
        Action { f }
    }
}
impl<F: FnMut(&mut FlowContext) -> FlowStatus + Send> FlowNode for Action<F> {
    fn tick(&mut self, ctx: &mut FlowContext) -> FlowStatus {
        (self.f)(ctx)
    }
    fn reset(&mut self, _fire_exit_events: bool) {}
}

pub struct Condition<F: Fn(&FlowContext) -> bool + Send> {
    predicate: F,
}
impl<F: Fn(&FlowContext) -> bool + Send> Condition<F> {
    pub fn new(predicate: F) -> Self {
        Condition { predicate }
    }
}
impl<F: Fn(&FlowContext) -> bool + Send> FlowNode for Condition<F> {
    fn tick(&mut self, ctx: &mut FlowContext) -> FlowStatus {
        if (self.predicate)(ctx) {
            FlowStatus::Success
        } else {
            FlowStatus::Failure
        }
    }
    fn reset(&mut self, _fire_exit_events: bool) {}
}

/// Returns Running until `ticks` have elapsed, then Success once.
pub struct Wait {
    ticks: u32,
    state_by_depth: Vec<BudgetState>,
}
impl Wait {
    pub fn new(ticks: u32) -> Self {
        Wait {
            ticks,
            state_by_depth: Vec::new(),
        }
    }
    fn state_mut(&mut self, depth: usize) -> &mut BudgetState {
        if self.state_by_depth.len() <= depth {
            self.state_by_depth.resize(depth + 1, BudgetState::default());
        }
        &mut self.state_by_depth[depth]
    }
}
impl FlowNode for Wait {
    fn tick(&mut self, ctx: &mut FlowContext) -> FlowStatus {
        let depth = ctx.current_call_depth();
        let delta = ctx.delta_ticks;
        let state = self.state_mut(depth);
        state.elapsed_ticks += delta;
        if state.elapsed_ticks >= self.ticks {
            state.elapsed_ticks = 0;
            FlowStatus::Success
        } else {
            FlowStatus::Running
        }
    }
    fn reset(&mut self, _fire_exit_events: bool) {
        for state in &mut self.state_by_depth {
            *state = BudgetState::default();
        }
    }
}

pub struct WaitUntil<F: Fn(&FlowContext) -> bool + Send> {
    predicate: F,
}
impl<F: Fn(&FlowContext) -> bool + Send> WaitUntil<F> {
    pub fn new(predicate: F) -> Self {
        WaitUntil { predicate }
    }
}
impl<F: Fn(&FlowContext) -> bool + Send> FlowNode for WaitUntil<F> {
    fn tick(&mut self, ctx: &mut FlowContext) -> FlowStatus {
        if (self.predicate)(ctx) {
            FlowStatus::Success
        } else {
            FlowStatus::Running
        }
    }
    fn reset(&mut self, _fire_exit_events: bool) {}
}

/// Always Running; never completes on its own (used to park a branch).
pub struct Yield;
impl FlowNode for Yield {
    fn tick(&mut self, _ctx: &mut FlowContext) -> FlowStatus {
        FlowStatus::Running
    }
    fn reset(&mut self, _fire_exit_events: bool) {}
}

/// Invokes a shared tree instance by reference, pushing a call-stack
/// frame so the invoked tree's decorators can tell this invocation apart
/// from any other depth at which the same tree is already running (spec
/// §4.G, §8 scenario 6). Shared via `Arc<Mutex<..>>` rather than
/// `Rc<RefCell<..>>` so a tree containing a `SubTree` stays `Send`, same
/// as `command::CommandQueue`'s `parking_lot` usage.
pub struct SubTree {
    tree: Arc<Mutex<dyn FlowNode>>,
    tree_id: u64,
}
impl SubTree {
    pub fn new(tree: Arc<Mutex<dyn FlowNode>>, tree_id: u64) -> Self {
        SubTree { tree, tree_id }
    }
}
impl FlowNode for SubTree {
    fn tick(&mut self, ctx: &mut FlowContext) -> FlowStatus {
        if !ctx.push_frame(self.tree_id) {
            return FlowStatus::Failure;
        }
        let status = self.tree.lock().tick(ctx);
        ctx.pop_frame();
        status
    }

    /// Intentionally does not recurse into the referenced tree: for a
    /// self-referencing `SubTree`, that tree *is* this node's own
    /// ancestor, and resetting it here would recurse without termination.
    /// The host resets the shared tree instance directly, once.
    fn reset(&mut self, _fire_exit_events: bool) {}
}

pub struct Return {
    status: FlowStatus,
}
impl Return {
    pub fn new(status: FlowStatus) -> Self {
        Return { status }
    }
}
impl FlowNode for Return {
    fn tick(&mut self, _ctx: &mut FlowContext) -> FlowStatus {
        self.status
    }
    fn reset(&mut self, _fire_exit_events: bool) {}
}

pub struct AlwaysSuccess;
impl FlowNode for AlwaysSuccess {
    fn tick(&mut self, _ctx: &mut FlowContext) -> FlowStatus {
        FlowStatus::Success
    }
    fn reset(&mut self, _fire_exit_events: bool) {}
}

pub struct AlwaysFailure;
impl FlowNode for AlwaysFailure {
    fn tick(&mut self, _ctx: &mut FlowContext) -> FlowStatus {
        FlowStatus::Failure
    }
    fn reset(&mut self, _fire_exit_events: bool) {}
}

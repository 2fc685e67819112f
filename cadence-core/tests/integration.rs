//! Cross-module scenarios from spec §8 that exercise more than one
//! `cadence-core` module together: handle/arena identity, the entity
//! registry, the command queue plus step processor, and the resource
//! catalog's same-tick coalescing.

use cadence_core::{
    dependency_sort, Arena, CadenceConfig, Command, CommandQueue, EntityKind, EntityRegistry,
    Loader, Pool, Poolable, Resource, ResourceCatalog, ResourceState, StepProcessor, Timing,
    TypeErasedHandle,
};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

struct Creature;
impl EntityKind for Creature {
    const KIND_NAME: &'static str = "Creature";
}

#[derive(Default)]
struct DamageCommand {
    amount: i32,
    priority: i32,
    health: Option<Rc<RefCell<i32>>>,
}
impl Poolable for DamageCommand {}
impl Command for DamageCommand {
    fn priority(&self) -> i32 {
        self.priority
    }
    fn execute(&self, _handle: TypeErasedHandle) {
        if let Some(health) = &self.health {
            *health.borrow_mut() -= self.amount;
        }
    }
}

/// Spec §8 scenario 1: damage propagation via commands.
#[test]
fn damage_propagation_via_commands() {
    let mut arena: Arena<Creature, ()> = Arena::new();
    let mut registry = EntityRegistry::new();
    let p = arena.create(()).erase();
    let health = Rc::new(RefCell::new(100));

    let pool = Arc::new(Pool::<DamageCommand>::new(4));
    let queue = CommandQueue::new(pool.clone(), true);

    let h = health.clone();
    queue.enqueue(
        move |cmd: &mut DamageCommand| {
            cmd.amount = 30;
            cmd.priority = 50;
            cmd.health = Some(h);
        },
        Timing::NextStep,
    );

    queue.merge_pending_to_current();
    queue.execute(p);

    assert_eq!(*health.borrow(), 70);
    assert_eq!(queue.current_len(), 0);
    assert_eq!(queue.pending_len(), 0);
    assert_eq!(pool.free_count(), 4);

    let _ = registry.all_entities().count();
}

/// Spec §8 scenario 4: step convergence across a producer chain driven by
/// a `StepProcessor`, entirely through the public command-queue API.
#[test]
fn chained_commands_converge_within_one_message_phase() {
    #[derive(Default)]
    struct Chain {
        hop: u32,
    }
    impl Poolable for Chain {}
    impl Command for Chain {
        fn execute(&self, _handle: TypeErasedHandle) {}
    }

    let mut arena: Arena<Creature, ()> = Arena::new();
    let p = arena.create(()).erase();

    let pool = Arc::new(Pool::<Chain>::new(8));
    let queue = Arc::new(CommandQueue::new(pool, true));
    queue.enqueue(|c: &mut Chain| c.hop = 0, Timing::NextStep);

    let config = CadenceConfig::default();
    let mut processor = StepProcessor::new(config.max_step_depth);
    processor.register(queue.clone());

    let remaining = RefCell::new(2u32);
    let q = queue.clone();
    let steps = processor
        .process_all_steps(|| {
            q.execute(p);
            let mut r = remaining.borrow_mut();
            if *r > 0 {
                *r -= 1;
                q.enqueue(|c: &mut Chain| c.hop = *r, Timing::NextStep);
            }
        })
        .expect("converges within max_step_depth");
    assert_eq!(steps, 3);
}

struct Texture {
    name: &'static str,
}
impl Resource<&'static str> for Texture {
    fn start(&mut self) {}
    fn tick(&mut self, _catalog: &ResourceCatalog<&'static str, Self>) -> ResourceState {
        ResourceState::Loaded
    }
    fn unload(&mut self) {}
}

/// A host wiring a dependency-ordered load sequence: `dependency_sort`
/// determines which keys must load before which, and a `Loader` submits
/// them to the catalog in that order. Exercises `depsort` and `resource`
/// together, neither of which references the other internally.
#[test]
fn dependency_order_determines_load_submission_sequence() {
    let nodes = ["material", "shader", "mesh"];
    let edges = [("shader", "material"), ("mesh", "material")];
    let ordered = dependency_sort(&nodes, &edges).expect("no cycle among these three keys");
    assert_eq!(ordered[0], "material");

    let catalog = Arc::new(ResourceCatalog::<&'static str, Texture>::new());
    for key in nodes {
        catalog.register(key, Texture { name: key });
    }

    let mut loader = Loader::new(catalog.clone());
    for key in &ordered {
        loader.request(*key);
    }
    loader.execute();
    catalog.tick();

    for key in &ordered {
        assert_eq!(catalog.state(key), Some(ResourceState::Loaded));
    }
    assert!(loader.tick());
}

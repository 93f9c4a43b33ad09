use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use decs_sim::{AuxContext, DependencyError, ECSManager, Entity, FnSystem, Signature, SystemContext, SystemDescriptor};

/// `(before, after)` pairs over systems `s0..s7`.
const EDGES: &[(usize, usize)] = &[(0, 2), (1, 2), (2, 3), (2, 4), (3, 5), (4, 5), (5, 7), (6, 7), (1, 6)];
const SYSTEMS: usize = 8;

#[derive(Default)]
struct Journal {
    calls: Vec<(usize, Entity)>,
}

impl AuxContext for Journal {}

fn shuffled(rng: &mut ChaCha8Rng) -> Vec<usize> {
    let mut order: Vec<usize> = (0..SYSTEMS).collect();
    order.shuffle(rng);
    order
}

fn name(i: usize) -> String {
    format!("s{i}")
}

/// Registers the DAG in `registration` order. Edges alternate between the
/// successor declaring `after` and the predecessor declaring `before`.
fn world(registration: &[usize]) -> (ECSManager, u16) {
    let mut ecs = ECSManager::new();
    let marker = ecs.register_component::<u32>("marker").unwrap();
    let journal = ecs.insert_aux(Journal::default());

    for &i in registration {
        let mut descriptor = SystemDescriptor::new(name(i)).require(marker);
        for (k, &(from, to)) in EDGES.iter().enumerate() {
            if k % 2 == 0 && to == i {
                descriptor = descriptor.after(name(from));
            } else if k % 2 == 1 && from == i {
                descriptor = descriptor.before(name(to));
            }
        }
        let system = FnSystem::new(move |ctx: &mut SystemContext<'_>, entity: Entity| {
            ctx.aux_mut::<Journal>()?.calls.push((i, entity));
            Ok(())
        });
        ecs.register_system(descriptor, system, Some(journal)).unwrap();
    }

    for _ in 0..3 {
        ecs.allocate_entity(Signature::of(marker)).unwrap();
    }
    ecs.allocate_entity(Signature::EMPTY).unwrap();
    (ecs, journal)
}

#[test]
fn every_edge_holds_for_any_registration_order() {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    for _ in 0..32 {
        let registration = shuffled(&mut rng);
        let (mut ecs, journal) = world(&registration);
        ecs.tick().unwrap();

        let calls = &ecs.aux::<Journal>(journal).unwrap().calls;
        assert_eq!(calls.len(), SYSTEMS * 3, "registration {registration:?}");

        for &(from, to) in EDGES {
            let last_from = calls.iter().rposition(|&(s, _)| s == from).unwrap();
            let first_to = calls.iter().position(|&(s, _)| s == to).unwrap();
            assert!(last_from < first_to, "s{from} overlaps s{to} with registration {registration:?}");
        }
    }
}

#[test]
fn entities_are_visited_in_ascending_order() {
    let (mut ecs, journal) = world(&(0..SYSTEMS).collect::<Vec<_>>());
    ecs.tick().unwrap();

    let calls = &ecs.aux::<Journal>(journal).unwrap().calls;
    for chunk in calls.chunks(3) {
        let entities: Vec<u32> = chunk.iter().map(|(_, e)| e.0).collect();
        assert_eq!(entities, [0, 1, 2]);
        assert!(chunk.iter().all(|&(s, _)| s == chunk[0].0));
    }
}

#[test]
fn same_registration_gives_same_order() {
    let registration = [6, 1, 0, 4, 2, 7, 3, 5];
    let (mut a, _) = world(&registration);
    let (mut b, _) = world(&registration);
    a.finalize().unwrap();
    b.finalize().unwrap();
    assert_eq!(a.execution_order(), b.execution_order());
}

#[test]
fn unconstrained_systems_keep_registration_order() {
    let mut ecs = ECSManager::new();
    let marker = ecs.register_component::<u32>("marker").unwrap();
    for n in ["render", "audio", "input"] {
        let noop = FnSystem::new(|_: &mut SystemContext<'_>, _: Entity| Ok(()));
        ecs.register_system(SystemDescriptor::new(n).require(marker), noop, None).unwrap();
    }
    ecs.finalize().unwrap();
    assert_eq!(ecs.execution_order(), ["render", "audio", "input"]);
}

#[test]
fn cycles_are_rejected_at_registration() {
    let mut ecs = ECSManager::new();
    let marker = ecs.register_component::<u32>("marker").unwrap();
    let noop = || FnSystem::new(|_: &mut SystemContext<'_>, _: Entity| Ok(()));

    ecs.register_system(SystemDescriptor::new("a").require(marker).before("b"), noop(), None).unwrap();
    ecs.register_system(SystemDescriptor::new("b").require(marker), noop(), None).unwrap();
    let err = ecs
        .register_system(SystemDescriptor::new("c").require(marker).after("b").before("a"), noop(), None)
        .unwrap_err();

    let DependencyError::Cycle { path } = err else {
        panic!("expected a cycle, got {err:?}");
    };
    assert_eq!(path.len(), 4);
    assert_eq!(path.first(), path.last());
    for n in ["a", "b", "c"] {
        assert!(path.iter().any(|p| p == n), "{n} missing from {path:?}");
    }
    ecs.finalize().unwrap();
    assert_eq!(ecs.execution_order(), ["a", "b"]);
}

#[test]
fn unresolved_names_fail_the_first_tick() {
    let mut ecs = ECSManager::new();
    let marker = ecs.register_component::<u32>("marker").unwrap();
    let noop = FnSystem::new(|_: &mut SystemContext<'_>, _: Entity| Ok(()));
    ecs.register_system(SystemDescriptor::new("late").require(marker).after("missing"), noop, None).unwrap();

    assert!(matches!(
        ecs.finalize(),
        Err(DependencyError::UnresolvedDependency { .. })
    ));
    assert!(ecs.tick().is_err());
    assert_eq!(ecs.ticks(), 0);
}

#[test]
fn systems_without_required_components_are_invalid() {
    let mut ecs = ECSManager::new();
    let noop = FnSystem::new(|_: &mut SystemContext<'_>, _: Entity| Ok(()));
    assert!(matches!(
        ecs.register_system(SystemDescriptor::new("empty"), noop, None),
        Err(DependencyError::InvalidDescriptor { .. })
    ));
}

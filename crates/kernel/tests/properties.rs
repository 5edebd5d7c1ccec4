//! Quantified properties of the world tick over random input sequences.

use echostep_common::{ColliderId, EntityId, IVec2, PhysicsGroup, Rect, Velocity};
use echostep_ecs::{Collider, ColliderMask, Entity, EntityKind, MaskSet};
use echostep_input::{EdgeTracker, RawButtons};
use echostep_kernel::{
    EntitySpec, Obstacle, ResolverSettings, SlopeSubtype, World, WorldConfig, WorldEvent, resolve,
};
use proptest::prelude::*;

fn block(x: i32, y: i32, w: i32, h: i32) -> EntitySpec {
    EntitySpec::Block {
        x,
        y,
        w,
        h,
        art_id: None,
        color_id: None,
    }
}

/// Floor with a gap, a slope up to a plateau and a wall at the far end.
fn course(with_player: bool) -> Vec<EntitySpec> {
    let mut specs = vec![
        block(0, 160, 96, 16),
        block(128, 160, 160, 16),
        EntitySpec::SlopedBlock {
            x: 160,
            y: 128,
            subtype: SlopeSubtype::H22,
        },
        block(192, 144, 96, 16),
        block(288, 64, 16, 112),
    ];
    if with_player {
        specs.push(EntitySpec::Player { x: 24, y: 144, player_id: 0 });
    }
    specs
}

const ACTOR: EntityId = EntityId(6);

fn buttons() -> impl Strategy<Value = Vec<RawButtons>> {
    proptest::collection::vec(
        (any::<bool>(), any::<bool>(), any::<bool>()).prop_map(|(left, right, jump)| RawButtons {
            left,
            right,
            jump,
        }),
        1..150,
    )
}

fn run(world: &mut World, script: &[RawButtons]) -> Vec<u64> {
    let mut input = EdgeTracker::new();
    script
        .iter()
        .map(|raw| {
            world.step(&input.sample(*raw));
            world.state_hash()
        })
        .collect()
}

fn course_world(with_player: bool) -> World {
    World::from_specs(WorldConfig::default(), &course(with_player)).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn same_inputs_same_states(script in buttons()) {
        let mut a = course_world(true);
        let mut b = course_world(true);
        prop_assert_eq!(run(&mut a, &script), run(&mut b, &script));
        prop_assert_eq!(a.snapshot(), b.snapshot());
    }

    #[test]
    fn actor_never_penetrates_terrain(script in buttons()) {
        let mut w = course_world(true);
        let mut input = EdgeTracker::new();
        let terrain: Vec<Obstacle> = w
            .entities()
            .values()
            .filter(|e| !e.is_dynamic())
            .flat_map(Obstacle::from_entity)
            .collect();
        for raw in &script {
            w.step(&input.sample(*raw));
            let actor = w.entity(ACTOR).unwrap();
            let at = actor.pixel_pos();
            for body in actor.solid_colliders() {
                for o in terrain.iter().filter(|o| body.collides.contains(o.mask)) {
                    prop_assert!(
                        !body.world_shape(at).overlaps(&o.shape),
                        "tick {} actor at {:?} overlaps {}", w.tick(), at, o.entity
                    );
                }
            }
        }
        let failed = w.events().iter().any(|e| matches!(e, WorldEvent::ResolveFailed { .. }));
        prop_assert!(!failed);
    }

    #[test]
    fn playback_reproduces_live_run(script in buttons()) {
        let mut live = course_world(true);
        let mut input = EdgeTracker::new();
        let mut expected = Vec::new();
        for raw in &script {
            live.step(&input.sample(*raw));
            let e = live.entity(ACTOR).unwrap();
            expected.push((e.pos, e.vel));
        }
        let recording = live.take_recording().unwrap();

        let mut replay = course_world(false);
        let ghost = replay.spawn_playback(IVec2::new(24, 144), 0, 1, recording).unwrap();
        prop_assert_eq!(ghost, ACTOR);
        for want in expected {
            replay.step(&echostep_input::ActionSet::IDLE);
            let e = replay.entity(ghost).unwrap();
            prop_assert_eq!((e.pos, e.vel), want);
        }
    }

    #[test]
    fn free_motion_is_exact(
        x in -500i32..500,
        y in -500i32..500,
        sub in (0i32..10, 0i32..10),
        vx in -400i32..400,
        vy in -400i32..400,
    ) {
        let mut actor = Entity::new(
            EntityId(1),
            EntityKind::Player,
            IVec2::new(x * 10 + sub.0, y * 10 + sub.1),
            IVec2::new(12, 16),
        )
        .with_collider(
            Collider::rect(ColliderId(1), Rect::new(0, 0, 12, 16), ColliderMask::Actor)
                .unwrap()
                .colliding_with(MaskSet::terrain()),
        )
        .in_group(PhysicsGroup::ACTOR);
        actor.vel = Velocity::from_int(IVec2::new(vx, vy));

        let r = resolve(&actor, &[], ResolverSettings::default()).unwrap();
        prop_assert_eq!(r.pos, actor.pos + IVec2::new(vx, vy));
        prop_assert_eq!(r.vel, actor.vel);
        prop_assert!(!r.snapped);
    }
}

#[test]
fn idle_world_without_actors_is_still() {
    let mut w = course_world(false);
    w.drain_events();
    let before = w.snapshot();
    for _ in 0..50 {
        w.step(&echostep_input::ActionSet::IDLE);
    }
    assert_eq!(w.snapshot(), before);
    assert_eq!(w.tick(), 50);
    assert!(w.events().is_empty());
}

#[test]
fn resting_actor_stays_put() {
    let mut w = course_world(true);
    for _ in 0..10 {
        w.step(&echostep_input::ActionSet::IDLE);
    }
    let settled = w.entity(ACTOR).unwrap().clone();
    assert_eq!(settled.vel, Velocity::ZERO);
    for _ in 0..100 {
        w.step(&echostep_input::ActionSet::IDLE);
        let now = w.entity(ACTOR).unwrap();
        assert_eq!((now.pos, now.vel), (settled.pos, settled.vel));
    }
}

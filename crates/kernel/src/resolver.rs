//! Nearest-valid-position resolver.
//!
//! Moves one dynamic actor by its velocity and pushes it out of any solid
//! obstacle it would overlap. The search runs over whole-pixel offsets; the
//! actor's sub-pixel remainder is kept on every axis the search did not touch.
//!
//! The resolver works on copies. On success the caller commits the returned
//! [`Resolution`]; on failure nothing about the actor changes.

use echostep_common::{ColliderId, EntityId, Fixed, IVec2, Shape, Velocity, pixel_of, to_subpixel};
use echostep_ecs::{ColliderMask, Entity, ResolutionHint};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("no valid position for {entity} within {expansions} expansions")]
    NoValidPositionFound { entity: EntityId, expansions: usize },
}

/// A solid collider of some other entity, already placed in pixel space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Obstacle {
    pub entity: EntityId,
    pub collider: ColliderId,
    pub shape: Shape,
    pub mask: ColliderMask,
    pub hint: ResolutionHint,
}

impl Obstacle {
    /// Every enabled solid collider of `entity`, in collider order.
    pub fn from_entity(entity: &Entity) -> impl Iterator<Item = Obstacle> + '_ {
        let px = entity.pixel_pos();
        entity.solid_colliders().map(move |c| Obstacle {
            entity: entity.id,
            collider: c.id,
            shape: c.world_shape(px),
            mask: c.mask,
            hint: c.hint,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverSettings {
    pub node_limit: usize,
    pub max_step_px: i32,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            node_limit: 100,
            max_step_px: 4,
        }
    }
}

/// Committed outcome for one actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub pos: IVec2,
    pub vel: Velocity,
    /// Pixel the actor asked to move to.
    pub requested_px: IVec2,
    /// Pixel it ended on, before snap-down.
    pub final_px: IVec2,
    pub snapped: bool,
    pub expansions: usize,
}

/// Obstacles overlapping a probe, summarised by the axes they allow.
#[derive(Debug, Clone, Copy)]
struct Blockage {
    blocked: bool,
    horizontal: bool,
    vertical: bool,
}

struct Search<'a> {
    actor: &'a Entity,
    obstacles: &'a [Obstacle],
    settings: ResolverSettings,
    expansions: usize,
}

impl Search<'_> {
    fn blockage(&self, px: IVec2) -> Blockage {
        let mut out = Blockage {
            blocked: false,
            horizontal: true,
            vertical: true,
        };
        for body in self.actor.solid_colliders() {
            let shape = body.world_shape(px);
            for o in self.obstacles {
                if body.collides.contains(o.mask) && shape.overlaps(&o.shape) {
                    out.blocked = true;
                    out.horizontal &= o.hint.allows_horizontal();
                    out.vertical &= o.hint.allows_vertical();
                }
            }
        }
        out
    }

    fn is_blocked(&self, px: IVec2) -> bool {
        self.blockage(px).blocked
    }

    fn fail(&self) -> ResolveError {
        ResolveError::NoValidPositionFound {
            entity: self.actor.id,
            expansions: self.expansions,
        }
    }

    /// Closest unblocked pixel to `target`, ordered by squared distance then
    /// horizontal distance, so vertical fixes win ties.
    fn nearest_valid(&mut self, target: IVec2) -> Result<IVec2, ResolveError> {
        // Neighbour order: right, down, left, up.
        const STEPS: [IVec2; 4] = [IVec2::new(1, 0), IVec2::new(0, 1), IVec2::new(-1, 0), IVec2::new(0, -1)];

        let mut visited = HashSet::from([target]);
        let mut frontier = BinaryHeap::new();
        let mut seq = 0u64;
        frontier.push(Reverse((0i64, 0i32, seq, target.x, target.y)));
        let mut expanded = 0usize;

        while let Some(Reverse((_, _, _, x, y))) = frontier.pop() {
            let p = IVec2::new(x, y);
            let here = self.blockage(p);
            if !here.blocked {
                return Ok(p);
            }
            expanded += 1;
            self.expansions += 1;
            if expanded > self.settings.node_limit {
                return Err(self.fail());
            }
            for step in STEPS {
                if (step.x != 0 && !here.horizontal) || (step.y != 0 && !here.vertical) {
                    continue;
                }
                let q = p + step;
                if visited.insert(q) {
                    seq += 1;
                    let d = q - target;
                    let dist2 = i64::from(d.x).pow(2) + i64::from(d.y).pow(2);
                    frontier.push(Reverse((dist2, d.x.abs(), seq, q.x, q.y)));
                }
            }
        }
        Err(self.fail())
    }
}

/// Resolve one actor against `obstacles`.
///
/// 1. If the actor already overlaps something, move it to the nearest valid
///    pixel first.
/// 2. Integrate velocity and walk toward the requested pixel in slices of at
///    most `max_step_px`, searching from each blocked slice.
/// 3. Keep sub-pixel position on axes that reached the requested pixel;
///    otherwise snap to the pixel and zero velocity pushing into the block.
/// 4. If the actor's snap-down sensor is enabled, settle it onto ground
///    within the sensor's reach.
pub fn resolve(
    actor: &Entity,
    obstacles: &[Obstacle],
    settings: ResolverSettings,
) -> Result<Resolution, ResolveError> {
    let mut search = Search {
        actor,
        obstacles,
        settings,
        expansions: 0,
    };
    let mut pos = actor.pos;
    let mut vel = actor.vel;

    let mut start = pixel_of(pos);
    if search.is_blocked(start) {
        let fixed = search.nearest_valid(start)?;
        if fixed.x != start.x {
            pos.x = to_subpixel(fixed.x);
        }
        if fixed.y != start.y {
            pos.y = to_subpixel(fixed.y);
        }
        start = fixed;
    }

    let requested = pos + vel.step();
    let requested_px = pixel_of(requested);
    let delta = requested_px - start;
    let span = delta.x.abs().max(delta.y.abs());
    let max_step = settings.max_step_px.max(1);
    let slices = ((span + max_step - 1) / max_step).max(1);

    let mut cur = start;
    let mut done = IVec2::ZERO;
    for k in 1..=slices {
        let along = delta * k / slices;
        let target = cur + (along - done);
        done = along;
        cur = if search.is_blocked(target) {
            search.nearest_valid(target)?
        } else {
            target
        };
    }
    let final_px = cur;

    if final_px.x == requested_px.x {
        pos.x = requested.x;
    } else {
        pos.x = to_subpixel(final_px.x);
        if vel.x.signum() == (requested_px.x - final_px.x).signum() {
            vel.x = Fixed::ZERO;
        }
    }
    if final_px.y == requested_px.y {
        pos.y = requested.y;
    } else {
        pos.y = to_subpixel(final_px.y);
        if vel.y.signum() == (requested_px.y - final_px.y).signum() {
            vel.y = Fixed::ZERO;
        }
    }

    let mut snapped = false;
    let reach = actor
        .colliders
        .iter()
        .find(|c| c.enabled && c.mask == ColliderMask::SnapDownSensor)
        .map(|c| c.shape.aabb().h);
    if let Some(reach) = reach {
        let here = pixel_of(pos);
        if let Some(k) = (1..=reach).find(|k| search.is_blocked(here + IVec2::new(0, *k))) {
            if k > 1 {
                pos.y = to_subpixel(here.y + k - 1);
                if vel.y > Fixed::ZERO {
                    vel.y = Fixed::ZERO;
                }
                snapped = true;
            }
        }
    }

    Ok(Resolution {
        pos,
        vel,
        requested_px,
        final_px,
        snapped,
        expansions: search.expansions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use echostep_common::{PhysicsGroup, Rect, Triangle};
    use echostep_ecs::{Collider, EntityKind, MaskSet};

    fn actor(px: (i32, i32), vel: (i32, i32)) -> Entity {
        let mut e = Entity::new(
            EntityId(100),
            EntityKind::Player,
            IVec2::new(px.0, px.1) * 10,
            IVec2::new(12, 16),
        )
        .with_collider(
            Collider::rect(ColliderId(100), Rect::new(0, 0, 12, 16), ColliderMask::Actor)
                .unwrap()
                .colliding_with(MaskSet::terrain()),
        )
        .in_group(PhysicsGroup::ACTOR);
        e.vel = Velocity::from_int(IVec2::new(vel.0, vel.1));
        e
    }

    fn with_snap(mut e: Entity) -> Entity {
        e.colliders.push(
            Collider::rect(ColliderId(101), Rect::new(0, 16, 12, 4), ColliderMask::SnapDownSensor).unwrap(),
        );
        e
    }

    fn block(id: u64, r: Rect) -> Obstacle {
        Obstacle {
            entity: EntityId(id),
            collider: ColliderId(id),
            shape: Shape::Rect(r),
            mask: ColliderMask::Block,
            hint: ResolutionHint::Both,
        }
    }

    fn floor() -> Obstacle {
        block(1, Rect::new(0, 160, 320, 16))
    }

    fn settings() -> ResolverSettings {
        ResolverSettings::default()
    }

    #[test]
    fn free_motion_keeps_subpixels() {
        let mut a = actor((80, 64), (0, 0));
        a.pos += IVec2::new(3, 7);
        a.vel = Velocity::new(Fixed::from_f64(12.4), Fixed::from_f64(1.5));
        let r = resolve(&a, &[floor()], settings()).unwrap();
        assert_eq!(r.pos, IVec2::new(815, 649));
        assert_eq!(r.vel, a.vel);
        assert_eq!(r.expansions, 0);
    }

    #[test]
    fn landing_stops_on_floor() {
        let a = actor((80, 140), (0, 80));
        let r = resolve(&a, &[floor()], settings()).unwrap();
        assert_eq!(pixel_of(r.pos), IVec2::new(80, 144));
        assert_eq!(r.pos.y, 1440);
        assert_eq!(r.vel.y, Fixed::ZERO);
    }

    #[test]
    fn wall_zeroes_horizontal_velocity() {
        let wall = block(2, Rect::new(144, 96, 16, 64));
        let a = actor((128, 120), (70, 0));
        let r = resolve(&a, &[floor(), wall], settings()).unwrap();
        assert_eq!(pixel_of(r.pos).x, 132);
        assert_eq!(r.vel.x, Fixed::ZERO);
    }

    #[test]
    fn moving_away_keeps_velocity() {
        let a = actor((80, 144), (-30, 0));
        let r = resolve(&a, &[floor()], settings()).unwrap();
        assert_eq!(r.pos, IVec2::new(770, 1440));
        assert_eq!(r.vel.x, Fixed::from_int(-30));
    }

    #[test]
    fn embedded_actor_is_lifted_first() {
        // Two pixels into the floor: straight up wins over sideways.
        let a = actor((80, 146), (0, 0));
        let r = resolve(&a, &[floor()], settings()).unwrap();
        assert_eq!(r.pos, IVec2::new(800, 1440));
    }

    #[test]
    fn budget_exhaustion_is_an_error() {
        let slab = block(3, Rect::new(0, 0, 400, 400));
        let a = actor((150, 150), (0, 0));
        let err = resolve(&a, &[slab], settings()).unwrap_err();
        assert!(matches!(err, ResolveError::NoValidPositionFound { entity: EntityId(100), .. }));
    }

    #[test]
    fn vert_only_slope_pushes_up() {
        let ramp = Obstacle {
            entity: EntityId(4),
            collider: ColliderId(4),
            shape: Shape::Triangle(
                Triangle::new(IVec2::new(64, 160), IVec2::new(96, 160), IVec2::new(96, 144)).unwrap(),
            ),
            mask: ColliderMask::SlopeHorz,
            hint: ResolutionHint::VertOnly,
        };
        let a = actor((50, 144), (60, 0));
        let r = resolve(&a, &[floor(), ramp], settings()).unwrap();
        let px = pixel_of(r.pos);
        assert_eq!(px.x, 56);
        assert!(px.y < 144);
        assert_eq!(r.vel.x, Fixed::from_int(60));
    }

    #[test]
    fn snap_down_settles_onto_close_ground() {
        let a = with_snap(actor((80, 141), (0, 0)));
        let r = resolve(&a, &[floor()], settings()).unwrap();
        assert!(r.snapped);
        assert_eq!(r.pos.y, 1440);

        let far = with_snap(actor((80, 130), (0, 0)));
        let r = resolve(&far, &[floor()], settings()).unwrap();
        assert!(!r.snapped);
        assert_eq!(r.pos.y, 1300);
    }

    #[test]
    fn fast_fall_does_not_tunnel() {
        let thin = block(5, Rect::new(0, 160, 320, 4));
        let a = actor((80, 130), (0, 200));
        let r = resolve(&a, &[thin], settings()).unwrap();
        assert_eq!(pixel_of(r.pos).y, 144);
        assert_eq!(r.vel.y, Fixed::ZERO);
    }
}

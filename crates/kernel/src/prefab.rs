//! Entity constructors for every kind the world spawns.
//!
//! A [`Prefab`] bundles the entity with the components and controllers the
//! world attaches when it is applied. Positions are whole pixels here; the
//! entity stores sub-pixels.

use echostep_common::{IVec2, IdAllocator, PhysicsGroup, Rect, subpixel_of};
use echostep_ecs::{
    Collider, ColliderError, ColliderMask, DoorState, EndZone, Entity, EntityKind, KeyState,
    Lifetime, MaskSet, PlayerTag, ResolutionHint, SpikeDirection, Spikes, StartMarker,
};

use crate::blueprint::SlopeSubtype;
use crate::moving_block::MovingPath;
use crate::player::PlayerSensors;

pub const PLAYER_SIZE: IVec2 = IVec2::new(12, 16);
pub const KEY_SIZE: IVec2 = IVec2::new(16, 16);
pub const INDICATOR_SIZE: IVec2 = IVec2::new(16, 16);

/// Gameplay data attached to a spawned entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Component {
    Start(StartMarker),
    End(EndZone),
    Door(DoorState),
    Key(KeyState),
    Spikes(Spikes),
    Lifetime(Lifetime),
    Player(PlayerTag),
}

/// Player-specific spawn data; the world turns it into a controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerParts {
    pub player_id: u32,
    pub sensors: PlayerSensors,
    pub x_dir: i32,
}

#[derive(Debug, Clone)]
pub struct Prefab {
    pub entity: Entity,
    pub components: Vec<Component>,
    pub path: Option<MovingPath>,
    pub player: Option<PlayerParts>,
}

impl Prefab {
    fn new(entity: Entity) -> Self {
        Self {
            entity,
            components: Vec::new(),
            path: None,
            player: None,
        }
    }

    #[must_use]
    fn with(mut self, component: Component) -> Self {
        self.components.push(component);
        self
    }
}

fn solid_rect(ids: &mut IdAllocator, w: i32, h: i32) -> Result<Collider, ColliderError> {
    Collider::rect(ids.collider(), Rect::new(0, 0, w, h), ColliderMask::Block)
}

fn sensor(ids: &mut IdAllocator, local: Rect, sees: &[ColliderMask]) -> Result<Collider, ColliderError> {
    Ok(Collider::rect(ids.collider(), local, ColliderMask::Sensor)?.colliding_with(MaskSet::of(sees)))
}

fn sized(ids: &mut IdAllocator, kind: EntityKind, rect: Rect) -> Entity {
    Entity::new(ids.entity(), kind, subpixel_of(rect.origin()), IVec2::new(rect.w, rect.h))
}

/// Static solid block.
pub fn block(ids: &mut IdAllocator, rect: Rect) -> Result<Prefab, ColliderError> {
    let e = sized(ids, EntityKind::Block, rect);
    let c = solid_rect(ids, rect.w, rect.h)?;
    Ok(Prefab::new(e.with_collider(c)))
}

/// 2x2-cell slope. The triangle's legs meet at the subtype's corner.
pub fn slope(ids: &mut IdAllocator, origin: IVec2, subtype: SlopeSubtype) -> Result<Prefab, ColliderError> {
    let (run, rise, mask, hint) = if subtype.is_steep() {
        (16, 32, ColliderMask::SlopeVert, ResolutionHint::HorzOnly)
    } else {
        (32, 16, ColliderMask::SlopeHorz, ResolutionHint::VertOnly)
    };
    let corner = subtype.corner_cells() * 16;
    let ox = if corner.x != 0 { corner.x - run } else { run };
    let oy = if corner.y != 0 { corner.y - rise } else { rise };
    let e = sized(ids, EntityKind::SlopeBlock, Rect::new(origin.x, origin.y, 32, 32));
    let c = Collider::polygon(
        ids.collider(),
        &[corner, IVec2::new(ox, corner.y), IVec2::new(corner.x, oy)],
        mask,
    )?
    .with_hint(hint);
    Ok(Prefab::new(e.with_collider(c)))
}

/// Kinematic block following `path`. Starts wherever the path starts.
pub fn moving_block(ids: &mut IdAllocator, size: IVec2, path: MovingPath) -> Result<Prefab, ColliderError> {
    let e = Entity::new(ids.entity(), EntityKind::MovingBlock, path.position(), size);
    let c = solid_rect(ids, size.x, size.y)?;
    let mut prefab = Prefab::new(e.with_collider(c));
    prefab.path = Some(path);
    Ok(prefab)
}

/// Hazard sensor covering the whole rectangle.
pub fn spikes(ids: &mut IdAllocator, rect: Rect, direction: SpikeDirection) -> Result<Prefab, ColliderError> {
    let e = sized(ids, EntityKind::Spike, rect);
    let c = sensor(ids, Rect::new(0, 0, rect.w, rect.h), &[ColliderMask::Actor])?;
    Ok(Prefab::new(e.with_collider(c)).with(Component::Spikes(Spikes { direction })))
}

/// Solid block marking where a character spawns.
pub fn start_block(ids: &mut IdAllocator, rect: Rect, player_id: u32, x_dir: i32) -> Result<Prefab, ColliderError> {
    let e = sized(ids, EntityKind::Start, rect);
    let c = solid_rect(ids, rect.w, rect.h)?;
    Ok(Prefab::new(e.with_collider(c)).with(Component::Start(StartMarker { player_id, x_dir })))
}

/// Pixel position a character spawned by `start` stands on.
pub fn spawn_point(start: Rect) -> IVec2 {
    IVec2::new(start.x + (start.w - PLAYER_SIZE.x) / 2, start.y - PLAYER_SIZE.y)
}

/// Solid goal block with a one-pixel sensor strip on its top face.
pub fn end_block(ids: &mut IdAllocator, rect: Rect, player_id: u32) -> Result<Prefab, ColliderError> {
    let e = sized(ids, EntityKind::End, rect);
    let body = solid_rect(ids, rect.w, rect.h)?;
    let strip = sensor(ids, Rect::new(0, -1, rect.w, 1), &[ColliderMask::Actor])?;
    Ok(Prefab::new(e.with_collider(body).with_collider(strip)).with(Component::End(EndZone {
        player_id,
        satisfied: Default::default(),
    })))
}

/// Door block. Its collider is enabled while the door is closed.
pub fn door(ids: &mut IdAllocator, rect: Rect, toggle_idx: u32, inverted: bool) -> Result<Prefab, ColliderError> {
    let state = DoorState::new(toggle_idx, inverted);
    let e = sized(ids, EntityKind::Door, rect);
    let mut c = solid_rect(ids, rect.w, rect.h)?;
    c.enabled = !state.open;
    Ok(Prefab::new(e.with_collider(c)).with(Component::Door(state)))
}

pub fn key(ids: &mut IdAllocator, origin: IVec2, toggle_idx: u32) -> Result<Prefab, ColliderError> {
    let e = sized(ids, EntityKind::Key, Rect::new(origin.x, origin.y, KEY_SIZE.x, KEY_SIZE.y));
    let c = sensor(ids, Rect::new(0, 0, KEY_SIZE.x, KEY_SIZE.y), &[ColliderMask::Actor])?;
    Ok(Prefab::new(e.with_collider(c)).with(Component::Key(KeyState { toggle_idx })))
}

/// Player body plus its six sensors, in a fixed collider order: body, foot,
/// slope-left, slope-right, wall-left, wall-right, snap-down.
pub fn player(ids: &mut IdAllocator, origin: IVec2, player_id: u32, x_dir: i32) -> Result<Prefab, ColliderError> {
    let (w, h) = (PLAYER_SIZE.x, PLAYER_SIZE.y);
    let e = Entity::new(ids.entity(), EntityKind::Player, subpixel_of(origin), PLAYER_SIZE).in_group(PhysicsGroup::ACTOR);

    let body = Collider::rect(ids.collider(), Rect::new(0, 0, w, h), ColliderMask::Actor)?.colliding_with(MaskSet::terrain());
    let foot = sensor(ids, Rect::new(1, h, w - 2, 1), &[ColliderMask::Block])?;
    let slope_left =
        Collider::rect(ids.collider(), Rect::new(0, h, 3, 3), ColliderMask::Sensor)?.colliding_with(MaskSet::slopes());
    let slope_right =
        Collider::rect(ids.collider(), Rect::new(w - 3, h, 3, 3), ColliderMask::Sensor)?.colliding_with(MaskSet::slopes());
    let wall_left = sensor(ids, Rect::new(-1, 2, 1, h - 4), &[ColliderMask::Block])?;
    let wall_right = sensor(ids, Rect::new(w, 2, 1, h - 4), &[ColliderMask::Block])?;
    let snap_down = Collider::rect(ids.collider(), Rect::new(0, h, w, 4), ColliderMask::SnapDownSensor)?.disabled();

    let sensors = PlayerSensors {
        body: body.id,
        foot: foot.id,
        slope_left: slope_left.id,
        slope_right: slope_right.id,
        wall_left: wall_left.id,
        wall_right: wall_right.id,
        snap_down: snap_down.id,
    };
    let e = [body, foot, slope_left, slope_right, wall_left, wall_right, snap_down]
        .into_iter()
        .fold(e, Entity::with_collider);
    let mut prefab = Prefab::new(e).with(Component::Player(PlayerTag { player_id }));
    prefab.player = Some(PlayerParts {
        player_id,
        sensors,
        x_dir,
    });
    Ok(prefab)
}

/// Colliderless marker shown for `ticks` ticks.
pub fn indicator(ids: &mut IdAllocator, origin: IVec2, ticks: u32) -> Prefab {
    let rect = Rect::new(origin.x, origin.y, INDICATOR_SIZE.x, INDICATOR_SIZE.y);
    Prefab::new(sized(ids, EntityKind::Indicator, rect)).with(Component::Lifetime(Lifetime { remaining: ticks }))
}

/// Colliderless effect covering `rect` for `ticks` ticks.
pub fn animation(ids: &mut IdAllocator, rect: Rect, ticks: u32) -> Prefab {
    Prefab::new(sized(ids, EntityKind::Animation, rect)).with(Component::Lifetime(Lifetime { remaining: ticks }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use echostep_common::{Shape, Triangle};

    #[test]
    fn player_layout() {
        let mut ids = IdAllocator::new();
        let p = player(&mut ids, IVec2::new(80, 64), 2, -1).unwrap();
        let parts = p.player.unwrap();
        assert_eq!(p.entity.pos, IVec2::new(800, 640));
        assert_eq!(p.entity.colliders.len(), 7);
        assert!(p.entity.is_dynamic());
        assert_eq!(parts.player_id, 2);
        assert_eq!(parts.sensors.feet(), [parts.sensors.foot, parts.sensors.slope_left, parts.sensors.slope_right]);
        let foot = p.entity.collider(parts.sensors.foot).unwrap();
        assert_eq!(foot.shape.aabb(), Rect::new(1, 16, 10, 1));
        let wall = p.entity.collider(parts.sensors.wall_right).unwrap();
        assert_eq!(wall.shape.aabb(), Rect::new(12, 2, 1, 12));
        let snap = p.entity.collider(parts.sensors.snap_down).unwrap();
        assert!(!snap.enabled);
        assert_eq!(p.entity.solid_colliders().count(), 1);
        assert_eq!(p.components, vec![Component::Player(PlayerTag { player_id: 2 })]);
    }

    #[test]
    fn shallow_slope_geometry() {
        let mut ids = IdAllocator::new();
        let s = slope(&mut ids, IVec2::new(64, 128), SlopeSubtype::H22).unwrap();
        let c = &s.entity.colliders[0];
        assert_eq!(c.mask, ColliderMask::SlopeHorz);
        assert_eq!(c.hint, ResolutionHint::VertOnly);
        let expected = Triangle::new(IVec2::new(96, 160), IVec2::new(64, 160), IVec2::new(96, 144)).unwrap();
        assert_eq!(c.world_shape(s.entity.pixel_pos()), Shape::Triangle(expected));
    }

    #[test]
    fn steep_slope_geometry() {
        let mut ids = IdAllocator::new();
        let s = slope(&mut ids, IVec2::ZERO, SlopeSubtype::V00).unwrap();
        let c = &s.entity.colliders[0];
        assert_eq!(c.mask, ColliderMask::SlopeVert);
        assert_eq!(c.hint, ResolutionHint::HorzOnly);
        assert_eq!(c.shape.aabb(), Rect::new(0, 0, 16, 32));
    }

    #[test]
    fn closed_door_is_solid() {
        let mut ids = IdAllocator::new();
        let closed = door(&mut ids, Rect::new(0, 0, 16, 48), 1, false).unwrap();
        let open = door(&mut ids, Rect::new(0, 0, 16, 48), 1, true).unwrap();
        assert!(closed.entity.colliders[0].enabled);
        assert!(!open.entity.colliders[0].enabled);
    }

    #[test]
    fn end_block_has_top_strip() {
        let mut ids = IdAllocator::new();
        let end = end_block(&mut ids, Rect::new(200, 144, 32, 16), 0).unwrap();
        assert_eq!(end.entity.colliders.len(), 2);
        assert_eq!(end.entity.colliders[1].world_aabb(end.entity.pixel_pos()), Rect::new(200, 143, 32, 1));
    }

    #[test]
    fn spawn_point_centres_on_start() {
        assert_eq!(spawn_point(Rect::new(16, 144, 16, 16)), IVec2::new(18, 128));
    }

    #[test]
    fn empty_block_is_rejected() {
        let mut ids = IdAllocator::new();
        assert!(block(&mut ids, Rect::new(0, 0, 0, 16)).is_err());
    }
}

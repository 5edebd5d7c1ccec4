use crate::collider::{Collider, ColliderMask};
use echostep_common::{ColliderId, EntityId, IVec2, PhysicsGroup, Rect, Velocity, pixel_of};
use serde::{Deserialize, Serialize};

/// Gameplay role tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    Block,
    MovingBlock,
    SlopeBlock,
    Player,
    Spike,
    Key,
    Door,
    Start,
    End,
    Indicator,
    Animation,
}

/// A body in the world.
///
/// `pos` is the top-left corner in sub-pixels, `size` is in whole pixels.
/// Only entities with a physics group are moved by the resolver; everything
/// else is a static or kinematic obstacle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub kind: Option<EntityKind>,
    pub pos: IVec2,
    pub size: IVec2,
    pub vel: Velocity,
    pub colliders: Vec<Collider>,
    pub group: Option<PhysicsGroup>,
    /// Frame-of-reference parent chosen last tick.
    pub parent: Option<EntityId>,
}

impl Entity {
    pub fn new(id: EntityId, kind: EntityKind, pos: IVec2, size: IVec2) -> Self {
        Self {
            id,
            kind: Some(kind),
            pos,
            size,
            vel: Velocity::ZERO,
            colliders: Vec::new(),
            group: None,
            parent: None,
        }
    }

    #[must_use]
    pub fn with_collider(mut self, collider: Collider) -> Self {
        self.colliders.push(collider);
        self
    }

    #[must_use]
    pub fn in_group(mut self, group: PhysicsGroup) -> Self {
        self.group = Some(group);
        self
    }

    pub fn is(&self, kind: EntityKind) -> bool {
        self.kind == Some(kind)
    }

    pub fn is_dynamic(&self) -> bool {
        self.group.is_some()
    }

    pub fn pixel_pos(&self) -> IVec2 {
        pixel_of(self.pos)
    }

    /// Bounding box in pixels.
    pub fn aabb(&self) -> Rect {
        let p = self.pixel_pos();
        Rect::new(p.x, p.y, self.size.x, self.size.y)
    }

    /// Union of the pixel AABBs of every collider, or the body box if there
    /// are none.
    pub fn collider_bounds(&self) -> Rect {
        let px = self.pixel_pos();
        self.colliders
            .iter()
            .map(|c| c.world_aabb(px))
            .reduce(|a, b| a.union(&b))
            .unwrap_or_else(|| self.aabb())
    }

    pub fn collider(&self, id: ColliderId) -> Option<&Collider> {
        self.colliders.iter().find(|c| c.id == id)
    }

    pub fn collider_mut(&mut self, id: ColliderId) -> Option<&mut Collider> {
        self.colliders.iter_mut().find(|c| c.id == id)
    }

    pub fn solid_colliders(&self) -> impl Iterator<Item = &Collider> {
        self.colliders.iter().filter(|c| c.enabled && c.is_solid())
    }

    pub fn sensor_colliders(&self) -> impl Iterator<Item = &Collider> {
        self.colliders.iter().filter(|c| c.enabled && c.is_sensor())
    }

    pub fn has_solid(&self) -> bool {
        self.colliders.iter().any(|c| c.is_solid())
    }

    pub fn first_with_mask(&self, mask: ColliderMask) -> Option<&Collider> {
        self.colliders.iter().find(|c| c.mask == mask)
    }
}

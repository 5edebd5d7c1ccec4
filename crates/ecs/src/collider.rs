//! Colliders: a shape in the owning entity's local pixel frame plus the masks
//! that decide what it blocks and what it reports.

use echostep_common::{ColliderId, GeomError, IVec2, Rect, Shape, Triangle};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ColliderError {
    #[error("invalid collider: {0}")]
    InvalidCollider(#[from] GeomError),
    #[error("invalid collider: triangle needs 3 points, got {0}")]
    PointCount(usize),
}

/// What a collider is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ColliderMask {
    Block,
    SlopeHorz,
    SlopeVert,
    Actor,
    Sensor,
    SnapDownSensor,
}

impl ColliderMask {
    pub const ALL: [ColliderMask; 6] = [
        ColliderMask::Block,
        ColliderMask::SlopeHorz,
        ColliderMask::SlopeVert,
        ColliderMask::Actor,
        ColliderMask::Sensor,
        ColliderMask::SnapDownSensor,
    ];

    fn bit(self) -> u8 {
        1 << self as u8
    }

    pub fn is_sensor(self) -> bool {
        matches!(self, ColliderMask::Sensor | ColliderMask::SnapDownSensor)
    }
}

/// Small bitset of [`ColliderMask`]s.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MaskSet(u8);

impl MaskSet {
    pub const EMPTY: Self = Self(0);

    pub fn of(masks: &[ColliderMask]) -> Self {
        masks.iter().fold(Self::EMPTY, |set, m| set.with(*m))
    }

    /// Everything a body stands on or is pushed out of.
    pub fn terrain() -> Self {
        Self::of(&[ColliderMask::Block, ColliderMask::SlopeHorz, ColliderMask::SlopeVert])
    }

    pub fn slopes() -> Self {
        Self::of(&[ColliderMask::SlopeHorz, ColliderMask::SlopeVert])
    }

    #[must_use]
    pub fn with(self, mask: ColliderMask) -> Self {
        Self(self.0 | mask.bit())
    }

    pub fn contains(self, mask: ColliderMask) -> bool {
        self.0 & mask.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = ColliderMask> {
        ColliderMask::ALL.into_iter().filter(move |m| self.contains(*m))
    }
}

impl fmt::Debug for MaskSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Axes along which the resolver may push an actor out of this collider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResolutionHint {
    HorzOnly,
    VertOnly,
    #[default]
    Both,
}

impl ResolutionHint {
    pub fn allows_horizontal(self) -> bool {
        !matches!(self, ResolutionHint::VertOnly)
    }

    pub fn allows_vertical(self) -> bool {
        !matches!(self, ResolutionHint::HorzOnly)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collider {
    pub id: ColliderId,
    /// Local pixel frame of the owning entity.
    pub shape: Shape,
    pub mask: ColliderMask,
    pub collides: MaskSet,
    pub hint: ResolutionHint,
    pub enabled: bool,
}

impl Collider {
    /// Rectangle collider. Fails on zero or negative extent.
    pub fn rect(id: ColliderId, local: Rect, mask: ColliderMask) -> Result<Self, ColliderError> {
        let r = Rect::sized(local.x, local.y, local.w, local.h)?;
        Ok(Self::from_shape(id, Shape::Rect(r), mask))
    }

    /// Triangle collider from exactly three distinct points.
    pub fn polygon(
        id: ColliderId,
        points: &[IVec2],
        mask: ColliderMask,
    ) -> Result<Self, ColliderError> {
        let [a, b, c] = points else {
            return Err(ColliderError::PointCount(points.len()));
        };
        let t = Triangle::new(*a, *b, *c)?;
        Ok(Self::from_shape(id, Shape::Triangle(t), mask))
    }

    fn from_shape(id: ColliderId, shape: Shape, mask: ColliderMask) -> Self {
        Self {
            id,
            shape,
            mask,
            collides: MaskSet::EMPTY,
            hint: ResolutionHint::Both,
            enabled: true,
        }
    }

    #[must_use]
    pub fn colliding_with(mut self, masks: MaskSet) -> Self {
        self.collides = masks;
        self
    }

    #[must_use]
    pub fn with_hint(mut self, hint: ResolutionHint) -> Self {
        self.hint = hint;
        self
    }

    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Shape placed at the entity's pixel position.
    pub fn world_shape(&self, entity_px: IVec2) -> Shape {
        self.shape.translate(entity_px)
    }

    pub fn world_aabb(&self, entity_px: IVec2) -> Rect {
        self.world_shape(entity_px).aabb()
    }

    /// Interior overlap of two enabled colliders at the given pixel positions.
    pub fn is_overlapping(&self, self_px: IVec2, other: &Collider, other_px: IVec2) -> bool {
        if !self.enabled || !other.enabled {
            return false;
        }
        self.world_shape(self_px).overlaps(&other.world_shape(other_px))
    }

    pub fn collides_with(&self, other: &Collider) -> bool {
        self.collides.contains(other.mask)
    }

    pub fn is_solid(&self) -> bool {
        !self.mask.is_sensor()
    }

    pub fn is_sensor(&self) -> bool {
        self.mask.is_sensor()
    }
}

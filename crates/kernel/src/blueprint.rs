//! Level blueprints: the entity spec DTOs a level file is made of.
//!
//! Each entry of `entities` is parsed on its own, so one bad entry is
//! reported and skipped while the rest of the level still loads.

use echostep_common::{IVec2, Rect};
use echostep_ecs::{ColliderError, SpikeDirection};
use serde::{Deserialize, Serialize};

use crate::moving_block::PathError;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SpecError {
    #[error("entity spec has no `type` field")]
    MissingType,
    #[error("unknown entity type `{0}`")]
    UnknownType(String),
    #[error("malformed entity spec: {0}")]
    Malformed(String),
    #[error("invalid entity spec: {0}")]
    Invalid(String),
    #[error(transparent)]
    Collider(#[from] ColliderError),
    #[error(transparent)]
    Path(#[from] PathError),
}

/// Corner and orientation of a 2x2-cell slope.
///
/// `H` slopes are shallow (32 px run, 16 px rise); `V` slopes are steep (16 px
/// run, 32 px rise). The digits give the right-angle corner in cells inside
/// the 32x32 box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlopeSubtype {
    #[serde(rename = "H_0_0")]
    H00,
    #[serde(rename = "H_2_0")]
    H20,
    #[serde(rename = "H_0_2")]
    H02,
    #[serde(rename = "H_2_2")]
    H22,
    #[serde(rename = "V_0_0")]
    V00,
    #[serde(rename = "V_2_0")]
    V20,
    #[serde(rename = "V_0_2")]
    V02,
    #[serde(rename = "V_2_2")]
    V22,
}

impl SlopeSubtype {
    pub fn is_steep(self) -> bool {
        matches!(self, Self::V00 | Self::V20 | Self::V02 | Self::V22)
    }

    /// Right-angle corner in cells.
    pub fn corner_cells(self) -> IVec2 {
        match self {
            Self::H00 | Self::V00 => IVec2::new(0, 0),
            Self::H20 | Self::V20 => IVec2::new(2, 0),
            Self::H02 | Self::V02 => IVec2::new(0, 2),
            Self::H22 | Self::V22 => IVec2::new(2, 2),
        }
    }
}

fn default_x_dir() -> i32 {
    1
}

/// One entity of a level. Coordinates and sizes are pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EntitySpec {
    Block {
        x: i32,
        y: i32,
        w: i32,
        h: i32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        art_id: Option<serde_json::Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        color_id: Option<serde_json::Value>,
    },
    #[serde(rename = "sloped_2x2_block")]
    SlopedBlock { x: i32, y: i32, subtype: SlopeSubtype },
    /// `points` are absolute top-left positions; the block starts at the first.
    MovingBlock {
        x: i32,
        y: i32,
        w: i32,
        h: i32,
        duration: u32,
        #[serde(rename = "loop")]
        looping: bool,
        points: Vec<[i32; 2]>,
    },
    Spikes {
        x: i32,
        y: i32,
        w: i32,
        h: i32,
        #[serde(rename = "subtype")]
        direction: String,
    },
    StartBlock {
        x: i32,
        y: i32,
        w: i32,
        h: i32,
        #[serde(rename = "subtype")]
        player_id: u32,
        #[serde(default = "default_x_dir")]
        x_dir: i32,
    },
    EndBlock {
        x: i32,
        y: i32,
        w: i32,
        h: i32,
        #[serde(rename = "subtype")]
        player_id: u32,
    },
    DoorBlock {
        x: i32,
        y: i32,
        w: i32,
        h: i32,
        #[serde(rename = "subtype")]
        toggle_idx: u32,
        #[serde(default)]
        inverted: bool,
    },
    Key {
        x: i32,
        y: i32,
        #[serde(rename = "subtype")]
        toggle_idx: u32,
    },
    Player {
        x: i32,
        y: i32,
        #[serde(rename = "subtype")]
        player_id: u32,
    },
}

impl EntitySpec {
    pub const TYPES: [&'static str; 9] = [
        "block",
        "sloped_2x2_block",
        "moving_block",
        "spikes",
        "start_block",
        "end_block",
        "door_block",
        "key",
        "player",
    ];

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Block { .. } => "block",
            Self::SlopedBlock { .. } => "sloped_2x2_block",
            Self::MovingBlock { .. } => "moving_block",
            Self::Spikes { .. } => "spikes",
            Self::StartBlock { .. } => "start_block",
            Self::EndBlock { .. } => "end_block",
            Self::DoorBlock { .. } => "door_block",
            Self::Key { .. } => "key",
            Self::Player { .. } => "player",
        }
    }

    /// Top-left corner in pixels.
    pub fn origin(&self) -> IVec2 {
        match *self {
            Self::Block { x, y, .. }
            | Self::SlopedBlock { x, y, .. }
            | Self::MovingBlock { x, y, .. }
            | Self::Spikes { x, y, .. }
            | Self::StartBlock { x, y, .. }
            | Self::EndBlock { x, y, .. }
            | Self::DoorBlock { x, y, .. }
            | Self::Key { x, y, .. }
            | Self::Player { x, y, .. } => IVec2::new(x, y),
        }
    }

    /// Pixel rectangle for specs that carry an explicit size.
    pub fn rect(&self) -> Option<Rect> {
        match *self {
            Self::Block { x, y, w, h, .. }
            | Self::MovingBlock { x, y, w, h, .. }
            | Self::Spikes { x, y, w, h, .. }
            | Self::StartBlock { x, y, w, h, .. }
            | Self::EndBlock { x, y, w, h, .. }
            | Self::DoorBlock { x, y, w, h, .. } => Some(Rect::new(x, y, w, h)),
            Self::SlopedBlock { .. } | Self::Key { .. } | Self::Player { .. } => None,
        }
    }

    /// Semantic checks serde cannot express.
    pub fn validate(&self) -> Result<(), SpecError> {
        if let Some(r) = self.rect()
            && (r.w < 1 || r.h < 1)
        {
            return Err(SpecError::Invalid(format!(
                "{} has non-positive size {}x{}",
                self.type_name(),
                r.w,
                r.h
            )));
        }
        if let Self::Spikes { direction, .. } = self {
            spike_direction(direction)?;
        }
        if let Self::MovingBlock { duration, points, .. } = self {
            if *duration == 0 {
                return Err(SpecError::Invalid("moving_block duration must be positive".into()));
            }
            if points.is_empty() {
                return Err(SpecError::Invalid("moving_block needs at least one point".into()));
            }
        }
        Ok(())
    }

    pub fn is_player(&self) -> bool {
        matches!(self, Self::Player { .. })
    }
}

/// Parse a spikes `subtype`.
pub fn spike_direction(direction: &str) -> Result<SpikeDirection, SpecError> {
    SpikeDirection::parse(direction)
        .ok_or_else(|| SpecError::Invalid(format!("unknown spike direction `{direction}`")))
}

/// Parse one entity entry.
pub fn parse_entity(value: &serde_json::Value) -> Result<EntitySpec, SpecError> {
    let ty = value
        .get("type")
        .and_then(serde_json::Value::as_str)
        .ok_or(SpecError::MissingType)?;
    if !EntitySpec::TYPES.contains(&ty) {
        return Err(SpecError::UnknownType(ty.to_string()));
    }
    let spec: EntitySpec =
        serde_json::from_value(value.clone()).map_err(|e| SpecError::Malformed(e.to_string()))?;
    spec.validate()?;
    Ok(spec)
}

/// A parsed level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelSpec {
    pub level_id: String,
    pub entities: Vec<EntitySpec>,
}

impl LevelSpec {
    pub fn new(level_id: impl Into<String>, entities: Vec<EntitySpec>) -> Self {
        Self {
            level_id: level_id.into(),
            entities,
        }
    }

    pub fn to_json(&self) -> Result<String, SpecError> {
        serde_json::to_string_pretty(self).map_err(|e| SpecError::Malformed(e.to_string()))
    }
}

/// An entry that failed to parse, by position in the level file.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedEntity {
    pub index: usize,
    pub error: SpecError,
}

/// Outcome of loading a level: the entities that parsed plus the ones that
/// did not.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelLoad {
    pub level: LevelSpec,
    pub rejected: Vec<RejectedEntity>,
}

#[derive(Deserialize)]
struct RawLevel {
    level_id: String,
    #[serde(default)]
    entities: Vec<serde_json::Value>,
}

/// Load a level document. Only an unreadable top level is an error; bad
/// entities end up in [`LevelLoad::rejected`].
pub fn load_level(json: &str) -> Result<LevelLoad, SpecError> {
    let raw: RawLevel = serde_json::from_str(json).map_err(|e| SpecError::Malformed(e.to_string()))?;
    let mut entities = Vec::with_capacity(raw.entities.len());
    let mut rejected = Vec::new();
    for (index, value) in raw.entities.iter().enumerate() {
        match parse_entity(value) {
            Ok(spec) => entities.push(spec),
            Err(error) => {
                tracing::warn!(index, %error, "skipping entity spec");
                rejected.push(RejectedEntity { index, error });
            }
        }
    }
    Ok(LevelLoad {
        level: LevelSpec::new(raw.level_id, entities),
        rejected,
    })
}

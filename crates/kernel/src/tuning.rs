//! Per-character tuning.
//!
//! Tuning is authored as floats (YAML friendly) and compiled once into
//! [`PlayerPhysics`], whose fields are all fixed-point. Nothing in the tick
//! reads the float form.

use echostep_common::{Fixed, SUBPIXELS_PER_CELL};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum TuningError {
    #[error("tuning yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("tuning field `{field}` must be positive, got {value}")]
    NotPositive { field: &'static str, value: f64 },
}

/// Player movement tuning. Speeds are sub-pixels per tick, accelerations
/// sub-pixels per tick squared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerTuning {
    pub vx_max: f64,
    pub vy_max: f64,
    pub wall_cling_vy_max: f64,
    pub jump_height_cells: f64,
    pub jump_duration_ticks: f64,
    pub ground_accel: f64,
    pub reverse_bonus: f64,
    pub air_accel: f64,
    pub ground_friction: f64,
    pub air_friction: f64,
    pub short_hop_friction: f64,
    pub wall_jump_vx: f64,
    /// Fraction of the ground jump speed used for wall jumps.
    pub wall_jump_ratio: f64,
    pub jump_cooldown: u32,
    pub wall_cling_ticks: u32,
    pub slope_angle_deg: f64,
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            vx_max: 72.0,
            vy_max: 200.0,
            wall_cling_vy_max: 40.0,
            jump_height_cells: 3.2,
            jump_duration_ticks: 26.0,
            ground_accel: 6.5,
            reverse_bonus: 3.0,
            air_accel: 1.5,
            ground_friction: 0.6,
            air_friction: 0.85,
            short_hop_friction: 0.85,
            wall_jump_vx: 60.0,
            wall_jump_ratio: 0.9,
            jump_cooldown: 10,
            wall_cling_ticks: 14,
            slope_angle_deg: 22.5,
        }
    }
}

impl PlayerTuning {
    pub fn from_yaml_str(s: &str) -> Result<Self, TuningError> {
        Ok(serde_yaml::from_str(s)?)
    }

    /// Gravity and launch speed for a jump of `H` sub-pixels peaking after
    /// `T` ticks: `g = 2H/T²`, `v0 = 2H/T`, so `g·T = v0`.
    pub fn jump_kinematics(&self) -> (f64, f64) {
        let h = self.jump_height_cells * f64::from(SUBPIXELS_PER_CELL);
        let t = self.jump_duration_ticks;
        (2.0 * h / (t * t), 2.0 * h / t)
    }

    pub fn compile(&self) -> Result<PlayerPhysics, TuningError> {
        for (field, value) in [
            ("vx_max", self.vx_max),
            ("vy_max", self.vy_max),
            ("wall_cling_vy_max", self.wall_cling_vy_max),
            ("jump_height_cells", self.jump_height_cells),
            ("jump_duration_ticks", self.jump_duration_ticks),
        ] {
            if value.is_nan() || value <= 0.0 {
                return Err(TuningError::NotPositive { field, value });
            }
        }
        let (gravity, jump_v0) = self.jump_kinematics();
        let angle = self.slope_angle_deg.to_radians();
        Ok(PlayerPhysics {
            vx_max: Fixed::from_f64(self.vx_max),
            vy_max: Fixed::from_f64(self.vy_max),
            wall_cling_vy_max: Fixed::from_f64(self.wall_cling_vy_max),
            gravity: Fixed::from_f64(gravity),
            jump_v0: Fixed::from_f64(jump_v0),
            ground_accel: Fixed::from_f64(self.ground_accel),
            reverse_bonus: Fixed::from_f64(self.reverse_bonus),
            air_accel: Fixed::from_f64(self.air_accel),
            ground_friction: Fixed::from_f64(self.ground_friction),
            air_friction: Fixed::from_f64(self.air_friction),
            short_hop_friction: Fixed::from_f64(self.short_hop_friction),
            wall_jump_vx: Fixed::from_f64(self.wall_jump_vx),
            wall_jump_vy: Fixed::from_f64(jump_v0 * self.wall_jump_ratio),
            jump_cooldown: self.jump_cooldown,
            wall_cling_ticks: self.wall_cling_ticks,
            slope_cos: Fixed::from_f64(angle.cos()),
            slope_sin: Fixed::from_f64(angle.sin()),
        })
    }
}

/// Fixed-point form of [`PlayerTuning`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerPhysics {
    pub vx_max: Fixed,
    pub vy_max: Fixed,
    pub wall_cling_vy_max: Fixed,
    pub gravity: Fixed,
    pub jump_v0: Fixed,
    pub ground_accel: Fixed,
    pub reverse_bonus: Fixed,
    pub air_accel: Fixed,
    pub ground_friction: Fixed,
    pub air_friction: Fixed,
    pub short_hop_friction: Fixed,
    pub wall_jump_vx: Fixed,
    pub wall_jump_vy: Fixed,
    pub jump_cooldown: u32,
    pub wall_cling_ticks: u32,
    pub slope_cos: Fixed,
    pub slope_sin: Fixed,
}

impl PlayerPhysics {
    /// Snap-down is only armed this many ticks after a jump.
    pub const SNAP_AFTER_JUMP_TICKS: u32 = 3;
    /// Snap-down is only armed for this many airborne ticks.
    pub const SNAP_MAX_AIR_TICKS: u32 = 1;
}

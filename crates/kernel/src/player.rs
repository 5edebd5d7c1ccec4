//! Player controller: turns an [`ActionSet`] and last tick's sensor contacts
//! into a new velocity. Position is never touched here; the resolver owns it.

use echostep_common::{ColliderId, Fixed, Velocity};
use echostep_input::{ActionSet, PlaybackController};

use crate::sensors::SensorState;
use crate::tuning::PlayerPhysics;

/// Collider ids a player registers at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerSensors {
    pub body: ColliderId,
    pub foot: ColliderId,
    pub slope_left: ColliderId,
    pub slope_right: ColliderId,
    pub wall_left: ColliderId,
    pub wall_right: ColliderId,
    pub snap_down: ColliderId,
}

impl PlayerSensors {
    /// Sensors that count as standing on something.
    pub fn feet(&self) -> [ColliderId; 3] {
        [self.foot, self.slope_left, self.slope_right]
    }
}

/// What the player's sensors touched on the previous tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Contacts {
    pub foot: bool,
    pub slope_left: bool,
    pub slope_right: bool,
    pub wall_left: bool,
    pub wall_right: bool,
}

impl Contacts {
    pub fn read(state: &SensorState, sensors: &PlayerSensors) -> Self {
        let hit = |id| !state.hits(id).is_empty();
        Self {
            foot: hit(sensors.foot),
            slope_left: hit(sensors.slope_left),
            slope_right: hit(sensors.slope_right),
            wall_left: hit(sensors.wall_left),
            wall_right: hit(sensors.wall_right),
        }
    }

    pub fn grounded(&self) -> bool {
        self.foot || self.slope_left || self.slope_right
    }

    pub fn airborne(&self) -> bool {
        !self.grounded()
    }

    pub fn wall_cling(&self) -> bool {
        self.airborne() && (self.wall_left || self.wall_right)
    }

    /// On exactly one slope side with no flat ground under the feet.
    fn single_slope(&self) -> bool {
        self.slope_left != self.slope_right && !self.foot
    }
}

/// Where a player's input comes from.
#[derive(Debug, Clone)]
pub enum Driver {
    /// The host's action set for this tick; recorded by the world.
    Live,
    Playback(PlaybackController),
    Idle,
}

/// Result of one controller update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlOutput {
    pub vel: Velocity,
    pub snap_down: bool,
    pub jumped: bool,
}

#[derive(Debug, Clone)]
pub struct PlayerController {
    pub player_id: u32,
    pub sensors: PlayerSensors,
    pub physics: PlayerPhysics,
    pub driver: Driver,
    last_jump: u32,
    air_time: u32,
    cling_time: u32,
    facing: i32,
}

impl PlayerController {
    pub fn new(player_id: u32, sensors: PlayerSensors, physics: PlayerPhysics, driver: Driver) -> Self {
        Self {
            player_id,
            sensors,
            physics,
            driver,
            last_jump: physics.jump_cooldown,
            air_time: 0,
            cling_time: 0,
            facing: 1,
        }
    }

    #[must_use]
    pub fn facing_dir(mut self, x_dir: i32) -> Self {
        if x_dir != 0 {
            self.facing = x_dir.signum();
        }
        self
    }

    pub fn facing(&self) -> i32 {
        self.facing
    }

    pub fn last_jump(&self) -> u32 {
        self.last_jump
    }

    pub fn air_time(&self) -> u32 {
        self.air_time
    }

    pub fn cling_time(&self) -> u32 {
        self.cling_time
    }

    pub fn is_live(&self) -> bool {
        matches!(self.driver, Driver::Live)
    }

    /// One controller tick.
    ///
    /// A grounded actor with `vy >= 0` keeps `vy = 0`, so an idle tick on
    /// flat ground leaves a standing actor exactly where it is.
    pub fn update(&mut self, action: ActionSet, contacts: Contacts, vel: Velocity) -> ControlOutput {
        let p = self.physics;
        let grounded = contacts.grounded();
        let cling = contacts.wall_cling();

        self.last_jump = self.last_jump.saturating_add(1);
        self.air_time = if grounded { 0 } else { self.air_time.saturating_add(1) };
        self.cling_time = if cling { self.cling_time.saturating_add(1) } else { 0 };

        let Velocity { x: mut vx, y: mut vy } = vel;

        let mut dx = action.dx();
        // Pushing into a freshly clung wall does not accelerate.
        if cling && self.cling_time <= p.wall_cling_ticks {
            let into_wall = (contacts.wall_right && dx > 0) || (contacts.wall_left && dx < 0);
            if into_wall {
                dx = 0;
            }
        }

        let accel = if grounded {
            let reversing = dx != 0 && vx.signum() != 0 && dx != vx.signum();
            if reversing { p.ground_accel + p.reverse_bonus } else { p.ground_accel }
        } else {
            p.air_accel
        };
        let mut ax = accel.scale(dx);
        let mut ay = Fixed::ZERO;
        if grounded && dx != 0 && contacts.single_slope() {
            let lift = ax * p.slope_sin;
            ay = if contacts.slope_right { -lift } else { lift };
            ax = ax * p.slope_cos;
        }

        vx = (vx + ax).clamp(-p.vx_max, p.vx_max);
        vy += ay;

        if dx == 0 {
            vx *= if grounded { p.ground_friction } else { p.air_friction };
        }

        if grounded && vy >= Fixed::ZERO {
            vy = Fixed::ZERO;
        } else {
            vy += p.gravity;
            let cap = if cling { p.wall_cling_vy_max } else { p.vy_max };
            if vy > cap {
                vy = cap;
            }
        }

        let mut jumped = false;
        if action.jump_pressed() && self.last_jump >= p.jump_cooldown {
            if grounded {
                vy = -p.jump_v0;
                jumped = true;
            } else if contacts.wall_left || contacts.wall_right {
                vy = -p.wall_jump_vy;
                if contacts.wall_right {
                    vx -= p.wall_jump_vx;
                } else {
                    vx += p.wall_jump_vx;
                }
                jumped = true;
            }
            if jumped {
                self.last_jump = 0;
            }
        }

        if vy < Fixed::ZERO && !action.jump_held() {
            vy *= p.short_hop_friction;
        }

        if dx != 0 {
            self.facing = dx;
        }

        let snap_down = self.last_jump > PlayerPhysics::SNAP_AFTER_JUMP_TICKS
            && self.air_time <= PlayerPhysics::SNAP_MAX_AIR_TICKS
            && vy >= Fixed::ZERO;

        ControlOutput {
            vel: Velocity::new(vx, vy),
            snap_down,
            jumped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuning::PlayerTuning;
    use echostep_input::ButtonEdge;

    fn controller() -> PlayerController {
        let ids = PlayerSensors {
            body: ColliderId(1),
            foot: ColliderId(2),
            slope_left: ColliderId(3),
            slope_right: ColliderId(4),
            wall_left: ColliderId(5),
            wall_right: ColliderId(6),
            snap_down: ColliderId(7),
        };
        PlayerController::new(1, ids, PlayerTuning::default().compile().unwrap(), Driver::Idle)
    }

    fn ground() -> Contacts {
        Contacts { foot: true, ..Default::default() }
    }

    fn right() -> ActionSet {
        ActionSet { right: true, ..ActionSet::IDLE }
    }

    fn jump(edge: ButtonEdge) -> ActionSet {
        ActionSet { jump: edge, ..ActionSet::IDLE }
    }

    #[test]
    fn standing_keeps_zero_vy() {
        let mut c = controller();
        let out = c.update(ActionSet::IDLE, ground(), Velocity::ZERO);
        assert_eq!(out.vel, Velocity::ZERO);
        assert!(out.snap_down);
    }

    #[test]
    fn landing_zeroes_downward_velocity() {
        let mut c = controller();
        let falling = Velocity::new(Fixed::ZERO, Fixed::from_int(30));
        assert_eq!(c.update(ActionSet::IDLE, ground(), falling).vel.y, Fixed::ZERO);
    }

    #[test]
    fn airborne_falls_and_clamps() {
        let mut c = controller();
        let out = c.update(ActionSet::IDLE, Contacts::default(), Velocity::ZERO);
        assert_eq!(out.vel.y, c.physics.gravity);
        let fast = Velocity::new(Fixed::ZERO, Fixed::from_int(199));
        assert_eq!(c.update(ActionSet::IDLE, Contacts::default(), fast).vel.y, c.physics.vy_max);
    }

    #[test]
    fn ground_accel_and_cap() {
        let mut c = controller();
        let out = c.update(right(), ground(), Velocity::ZERO);
        assert_eq!(out.vel.x, Fixed::from_f64(6.5));
        let near_cap = Velocity::new(Fixed::from_int(70), Fixed::ZERO);
        assert_eq!(c.update(right(), ground(), near_cap).vel.x, Fixed::from_int(72));
    }

    #[test]
    fn reversing_gets_bonus() {
        let mut c = controller();
        let moving_left = Velocity::new(Fixed::from_int(-20), Fixed::ZERO);
        let out = c.update(right(), ground(), moving_left);
        assert_eq!(out.vel.x, Fixed::from_int(-20) + Fixed::from_f64(9.5));
    }

    #[test]
    fn friction_when_no_input() {
        let mut c = controller();
        let v = Velocity::new(Fixed::from_int(50), Fixed::ZERO);
        assert_eq!(c.update(ActionSet::IDLE, ground(), v).vel.x, Fixed::from_int(50) * c.physics.ground_friction);
    }

    #[test]
    fn ground_jump_respects_cooldown() {
        let mut c = controller();
        let out = c.update(jump(ButtonEdge::Pressed), ground(), Velocity::ZERO);
        assert!(out.jumped);
        assert_eq!(out.vel.y, -c.physics.jump_v0);
        assert_eq!(c.last_jump(), 0);
        assert!(!out.snap_down);

        let again = c.update(jump(ButtonEdge::Pressed), ground(), Velocity::ZERO);
        assert!(!again.jumped);
    }

    #[test]
    fn released_jump_is_damped() {
        let mut c = controller();
        let rising = Velocity::new(Fixed::ZERO, Fixed::from_int(-30));
        let held = c.update(jump(ButtonEdge::Held), Contacts::default(), rising);
        let released = c.update(jump(ButtonEdge::Released), Contacts::default(), rising);
        assert!(released.vel.y > held.vel.y);
        assert_eq!(released.vel.y, (Fixed::from_int(-30) + c.physics.gravity) * c.physics.short_hop_friction);
    }

    #[test]
    fn wall_jump_pushes_away() {
        let mut c = controller();
        let wall = Contacts { wall_right: true, ..Default::default() };
        let v = Velocity::new(Fixed::from_int(10), Fixed::from_int(5));
        let out = c.update(ActionSet { right: true, jump: ButtonEdge::Pressed, left: false }, wall, v);
        assert!(out.jumped);
        assert!(out.vel.x < Fixed::ZERO);
        assert_eq!(out.vel.y, -c.physics.wall_jump_vy);
    }

    #[test]
    fn cling_caps_fall_and_releases_away_from_wall() {
        let mut c = controller();
        let wall = Contacts { wall_right: true, ..Default::default() };
        let v = Velocity::new(Fixed::ZERO, Fixed::from_int(60));
        let left = ActionSet { left: true, ..ActionSet::IDLE };
        let out = c.update(left, wall, v);
        assert_eq!(out.vel.y, c.physics.wall_cling_vy_max);
        // Input away from the wall accelerates on the first cling tick.
        assert_eq!(out.vel.x, -c.physics.air_accel);
    }

    #[test]
    fn pushing_into_fresh_wall_only_applies_friction() {
        let mut c = controller();
        let wall = Contacts { wall_right: true, ..Default::default() };
        let mut v = Velocity::new(Fixed::from_int(10), Fixed::ZERO);
        for tick in 1..=c.physics.wall_cling_ticks {
            let out = c.update(right(), wall, v);
            assert_eq!(out.vel.x, v.x * c.physics.air_friction, "tick {tick}");
            v = out.vel;
        }
        let out = c.update(right(), wall, v);
        assert_eq!(out.vel.x, v.x + c.physics.air_accel);
    }

    #[test]
    fn slope_rotates_acceleration_uphill() {
        let mut c = controller();
        let slope = Contacts { slope_right: true, ..Default::default() };
        let out = c.update(right(), slope, Velocity::ZERO);
        assert!(out.vel.x > Fixed::ZERO && out.vel.x < Fixed::from_f64(6.5));
        // Upward push survives gravity.
        assert!(out.vel.y < Fixed::ZERO);

        // Flat ground next to the slope keeps acceleration axis-aligned.
        let corner = Contacts { foot: true, slope_right: true, ..Default::default() };
        let out = c.update(right(), corner, Velocity::ZERO);
        assert_eq!(out.vel, Velocity::new(Fixed::from_f64(6.5), Fixed::ZERO));
    }

    #[test]
    fn timers_track_air_and_facing() {
        let mut c = controller();
        c.update(ActionSet::IDLE, Contacts::default(), Velocity::ZERO);
        c.update(ActionSet::IDLE, Contacts::default(), Velocity::ZERO);
        assert_eq!(c.air_time(), 2);
        c.update(ActionSet { left: true, ..ActionSet::IDLE }, ground(), Velocity::ZERO);
        assert_eq!(c.air_time(), 0);
        assert_eq!(c.facing(), -1);
    }
}

use serde::{Deserialize, Serialize};

/// Edge state of a single button across ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ButtonEdge {
    #[default]
    Up,
    Pressed,
    Held,
    Released,
}

impl ButtonEdge {
    /// State for the next tick given whether the button is physically down.
    pub fn next(self, down: bool) -> Self {
        match (self.is_down(), down) {
            (false, true) => ButtonEdge::Pressed,
            (true, true) => ButtonEdge::Held,
            (true, false) => ButtonEdge::Released,
            (false, false) => ButtonEdge::Up,
        }
    }

    pub fn is_down(self) -> bool {
        matches!(self, ButtonEdge::Pressed | ButtonEdge::Held)
    }

    pub fn just_pressed(self) -> bool {
        self == ButtonEdge::Pressed
    }
}

/// Physical button levels sampled by the host for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RawButtons {
    #[serde(default)]
    pub left: bool,
    #[serde(default)]
    pub right: bool,
    #[serde(default)]
    pub jump: bool,
}

/// Everything a controller reads for one actor on one tick.
///
/// Field order is part of the recording format and must not change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionSet {
    pub left: bool,
    pub right: bool,
    pub jump: ButtonEdge,
}

impl ActionSet {
    pub const IDLE: Self = Self {
        left: false,
        right: false,
        jump: ButtonEdge::Up,
    };

    /// Action set for the tick after `self` given this tick's raw levels.
    pub fn advance(self, raw: RawButtons) -> Self {
        Self {
            left: raw.left,
            right: raw.right,
            jump: self.jump.next(raw.jump),
        }
    }

    /// Horizontal intent in {-1, 0, 1}. Both directions cancel.
    pub fn dx(self) -> i32 {
        i32::from(self.right) - i32::from(self.left)
    }

    pub fn jump_pressed(self) -> bool {
        self.jump.just_pressed()
    }

    pub fn jump_held(self) -> bool {
        self.jump.is_down()
    }
}

/// Turns a sequence of raw samples into edge-tracked action sets.
#[derive(Debug, Clone, Copy, Default)]
pub struct EdgeTracker {
    last: ActionSet,
}

impl EdgeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sample(&mut self, raw: RawButtons) -> ActionSet {
        self.last = self.last.advance(raw);
        self.last
    }
}

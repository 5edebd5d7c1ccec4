use echostep_common::EntityId;
use echostep_kernel::{BodySnapshot, World};
use serde::{Deserialize, Serialize};

/// World state captured at the end of one tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceFrame {
    pub tick: u64,
    pub state_hash: u64,
    pub bodies: Vec<BodySnapshot>,
}

/// Where two traces first disagree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Divergence {
    /// Frame `index` differs.
    Frame {
        index: usize,
        tick: u64,
        expected: u64,
        actual: u64,
    },
    /// One trace ran longer; frames up to the shorter length agree.
    Length { expected: usize, actual: usize },
}

/// Per-tick trajectory of a world run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trace {
    frames: Vec<TraceFrame>,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the world's current state.
    pub fn capture(&mut self, world: &World) {
        self.frames.push(TraceFrame {
            tick: world.tick(),
            state_hash: world.state_hash(),
            bodies: world.snapshot(),
        });
    }

    pub fn frames(&self) -> &[TraceFrame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// FNV-1a over every frame's tick and state hash.
    pub fn digest(&self) -> u64 {
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for frame in &self.frames {
            for byte in frame.tick.to_le_bytes().into_iter().chain(frame.state_hash.to_le_bytes()) {
                hash ^= u64::from(byte);
                hash = hash.wrapping_mul(0x0100_0000_01b3);
            }
        }
        hash
    }

    /// First point where `actual` departs from `self`, if any.
    pub fn first_divergence(&self, actual: &Trace) -> Option<Divergence> {
        for (index, (want, got)) in self.frames.iter().zip(&actual.frames).enumerate() {
            if want != got {
                return Some(Divergence::Frame {
                    index,
                    tick: want.tick,
                    expected: want.state_hash,
                    actual: got.state_hash,
                });
            }
        }
        (self.len() != actual.len()).then_some(Divergence::Length {
            expected: self.len(),
            actual: actual.len(),
        })
    }

    /// Frame state for the actor `id`, tick by tick.
    pub fn path_of(&self, id: EntityId) -> impl Iterator<Item = &BodySnapshot> + '_ {
        self.frames
            .iter()
            .filter_map(move |f| f.bodies.iter().find(|b| b.id == id))
    }
}

//! Kinematic blocks that follow a polyline at constant speed.
//!
//! Position at phase `k` is found by walking `total_len · k / duration`
//! sub-pixels along the path. Segment lengths use integer square roots, so the
//! path is exact and identical on every platform.

use echostep_common::{IVec2, Velocity};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("moving block path needs at least one point")]
    Empty,
    #[error("moving block duration must be positive")]
    ZeroDuration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct Segment {
    from: IVec2,
    delta: IVec2,
    len: i64,
}

/// Path state for one moving block. Points are sub-pixel top-left positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovingPath {
    points: Vec<IVec2>,
    looping: bool,
    duration: u32,
    segments: Vec<Segment>,
    total_len: i64,
    phase: u64,
    prev: IVec2,
    current: IVec2,
}

impl MovingPath {
    /// `looping` closes the polygon and repeats; otherwise the block runs once
    /// and holds at the last point.
    pub fn new(points: Vec<IVec2>, duration: u32, looping: bool) -> Result<Self, PathError> {
        let Some(&start) = points.first() else {
            return Err(PathError::Empty);
        };
        if duration == 0 {
            return Err(PathError::ZeroDuration);
        }
        let mut stops = points.clone();
        if looping {
            stops.push(start);
        }
        let segments: Vec<Segment> = stops
            .windows(2)
            .map(|w| {
                let delta = w[1] - w[0];
                let sq = i64::from(delta.x).pow(2) + i64::from(delta.y).pow(2);
                Segment { from: w[0], delta, len: sq.isqrt() }
            })
            .collect();
        let total_len = segments.iter().map(|s| s.len).sum();
        Ok(Self {
            points,
            looping,
            duration,
            segments,
            total_len,
            phase: 0,
            prev: start,
            current: start,
        })
    }

    pub fn position_at(&self, phase: u64) -> IVec2 {
        let duration = u64::from(self.duration);
        let phase = if self.looping { phase % duration } else { phase.min(duration) };
        if self.total_len == 0 {
            return self.points[0];
        }
        let mut dist = self.total_len * phase as i64 / i64::from(self.duration);
        for seg in &self.segments {
            if dist < seg.len {
                let step = |d: i32| (i64::from(d) * dist / seg.len) as i32;
                return seg.from + IVec2::new(step(seg.delta.x), step(seg.delta.y));
            }
            dist -= seg.len;
        }
        if self.looping {
            self.points[0]
        } else {
            self.points[self.points.len() - 1]
        }
    }

    /// Step one tick. Returns the new position.
    pub fn advance(&mut self) -> IVec2 {
        self.phase += 1;
        self.prev = self.current;
        self.current = self.position_at(self.phase);
        self.current
    }

    pub fn phase(&self) -> u64 {
        self.phase
    }

    pub fn position(&self) -> IVec2 {
        self.current
    }

    /// Movement during the last tick, in sub-pixels.
    pub fn delta(&self) -> IVec2 {
        self.current - self.prev
    }

    pub fn velocity(&self) -> Velocity {
        Velocity::from_int(self.delta())
    }

    pub fn is_finished(&self) -> bool {
        !self.looping && self.phase >= u64::from(self.duration)
    }
}

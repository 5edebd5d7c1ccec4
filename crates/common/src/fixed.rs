//! Q16.16 fixed-point numbers for velocities and tuning constants.
//!
//! Floats never enter the tick. Tuning values are converted once, at load
//! time, and every per-tick operation is integer arithmetic on `i32`/`i64`.

use glam::IVec2;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign};

const FRAC_BITS: u32 = 16;
const ONE_RAW: i32 = 1 << FRAC_BITS;
const HALF_RAW: i64 = 1 << (FRAC_BITS - 1);

/// Signed fixed-point number with 16 fractional bits.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fixed(i32);

impl Fixed {
    pub const ZERO: Self = Self(0);
    pub const ONE: Self = Self(ONE_RAW);

    #[inline]
    pub const fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> i32 {
        self.0
    }

    #[inline]
    pub const fn from_int(v: i32) -> Self {
        Self(v << FRAC_BITS)
    }

    /// `num / den`, truncated toward zero. Returns zero for a zero denominator.
    pub fn from_ratio(num: i64, den: i64) -> Self {
        if den == 0 {
            return Self::ZERO;
        }
        Self(((num << FRAC_BITS) / den) as i32)
    }

    /// Load-time conversion from a tuning float. Rounds to the nearest raw step.
    pub fn from_f64(v: f64) -> Self {
        Self((v * f64::from(ONE_RAW)).round() as i32)
    }

    pub fn to_f64(self) -> f64 {
        f64::from(self.0) / f64::from(ONE_RAW)
    }

    /// Nearest integer, halves away from zero.
    pub fn round(self) -> i32 {
        let raw = i64::from(self.0);
        if raw >= 0 {
            ((raw + HALF_RAW) >> FRAC_BITS) as i32
        } else {
            -(((-raw + HALF_RAW) >> FRAC_BITS) as i32)
        }
    }

    pub fn signum(self) -> i32 {
        self.0.signum()
    }

    pub fn abs(self) -> Self {
        Self(self.0.abs())
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn clamp(self, lo: Self, hi: Self) -> Self {
        Self(self.0.clamp(lo.0, hi.0))
    }

    pub fn checked_div(self, rhs: Self) -> Option<Self> {
        if rhs.0 == 0 {
            return None;
        }
        Some(Self(((i64::from(self.0) << FRAC_BITS) / i64::from(rhs.0)) as i32))
    }

    /// Multiply by a plain integer.
    pub fn scale(self, k: i32) -> Self {
        Self(self.0 * k)
    }
}

impl fmt::Debug for Fixed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fixed({:.4})", self.to_f64())
    }
}

impl fmt::Display for Fixed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}", self.to_f64())
    }
}

impl Add for Fixed {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Fixed {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Neg for Fixed {
    type Output = Self;
    fn neg(self) -> Self {
        Self(-self.0)
    }
}

impl Mul for Fixed {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        Self(((i64::from(self.0) * i64::from(rhs.0)) >> FRAC_BITS) as i32)
    }
}

impl AddAssign for Fixed {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Fixed {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl MulAssign for Fixed {
    fn mul_assign(&mut self, rhs: Self) {
        *self = *self * rhs;
    }
}

/// Velocity in sub-pixels per tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Velocity {
    pub x: Fixed,
    pub y: Fixed,
}

impl Velocity {
    pub const ZERO: Self = Self {
        x: Fixed::ZERO,
        y: Fixed::ZERO,
    };

    pub fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    pub fn from_int(v: IVec2) -> Self {
        Self {
            x: Fixed::from_int(v.x),
            y: Fixed::from_int(v.y),
        }
    }

    /// Integer sub-pixel step applied by integration: `pos += vel.step()`.
    pub fn step(self) -> IVec2 {
        IVec2::new(self.x.round(), self.y.round())
    }
}

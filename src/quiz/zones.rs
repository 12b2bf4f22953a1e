//! Answer zone geometry and choice resolution.
//!
//! The arena floor has an O zone on the negative-x side and an X zone on the
//! positive-x side, separated by a divider strip. A player's position at lock
//! time is their answer.

use crate::protocol::types::{Answer, ChoiceReason};

/// Axis-aligned zone rectangle on the xz plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneRect {
    pub min_x: f64,
    pub max_x: f64,
    pub min_z: f64,
    pub max_z: f64,
}

impl ZoneRect {
    /// Inner margin per axis: a fifth of the extent, capped at 0.5 units.
    fn margins(&self) -> (f64, f64) {
        let width = self.max_x - self.min_x;
        let depth = self.max_z - self.min_z;
        ((0.2 * width).min(0.5), (0.2 * depth).min(0.5))
    }

    /// Strictly inside the rectangle shrunk by the inner margin.
    pub fn contains_inner(&self, x: f64, z: f64) -> bool {
        let (mx, mz) = self.margins();
        x > self.min_x + mx && x < self.max_x - mx && z > self.min_z + mz && z < self.max_z - mz
    }

    /// Inside the plain rectangle, margin ignored.
    pub fn contains(&self, x: f64, z: f64) -> bool {
        x >= self.min_x && x <= self.max_x && z >= self.min_z && z <= self.max_z
    }
}

/// The full answer-zone layout of a room.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneLayout {
    pub o_zone: ZoneRect,
    pub x_zone: ZoneRect,
    pub divider_width: f64,
}

impl Default for ZoneLayout {
    fn default() -> Self {
        Self {
            o_zone: ZoneRect {
                min_x: -44.0,
                max_x: -3.0,
                min_z: -30.0,
                max_z: 30.0,
            },
            x_zone: ZoneRect {
                min_x: 3.0,
                max_x: 44.0,
                min_z: -30.0,
                max_z: 30.0,
            },
            divider_width: 4.0,
        }
    }
}

/// The outcome of resolving a position against the layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneVerdict {
    Choice(Answer),
    Undecided(ChoiceReason),
}

impl ZoneVerdict {
    pub fn choice(self) -> Option<Answer> {
        match self {
            Self::Choice(answer) => Some(answer),
            Self::Undecided(_) => None,
        }
    }

    pub fn reason(self) -> Option<ChoiceReason> {
        match self {
            Self::Choice(_) => None,
            Self::Undecided(reason) => Some(reason),
        }
    }
}

impl ZoneLayout {
    /// Resolve a player's position into an answer choice.
    pub fn resolve(&self, x: f64, z: f64) -> ZoneVerdict {
        if !x.is_finite() || !z.is_finite() {
            return ZoneVerdict::Undecided(ChoiceReason::InvalidPosition);
        }
        if x.abs() <= self.divider_width / 2.0 + 0.8 {
            return ZoneVerdict::Undecided(ChoiceReason::CenterLine);
        }
        let min_z = self.o_zone.min_z.min(self.x_zone.min_z);
        let max_z = self.o_zone.max_z.max(self.x_zone.max_z);
        if z < min_z || z > max_z {
            return ZoneVerdict::Undecided(ChoiceReason::OutOfLane);
        }
        if self.o_zone.contains_inner(x, z) && !self.x_zone.contains(x, z) {
            return ZoneVerdict::Choice(Answer::O);
        }
        if self.x_zone.contains_inner(x, z) && !self.o_zone.contains(x, z) {
            return ZoneVerdict::Choice(Answer::X);
        }
        ZoneVerdict::Undecided(ChoiceReason::OffZone)
    }
}

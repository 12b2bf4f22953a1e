//! Movement validator tuning.

use super::defaults::{
    default_correction_cooldown_ms, default_correction_min_dist, default_move_a_max,
    default_move_accel_smoothing, default_move_margin, default_move_max_dt, default_move_min_dt,
    default_move_teleport_cap, default_move_v_max, default_move_v_y_max,
};
use serde::{Deserialize, Serialize};

/// Per-axis caps for authoritative movement clamping. The validator never
/// rejects a sync, it only scales the step back inside these bounds.
#[derive(Debug, Deserialize, Serialize, Clone, Copy)]
pub struct MovementConfig {
    /// Maximum sustained horizontal speed (units/s)
    #[serde(default = "default_move_v_max")]
    pub v_max: f64,
    /// Maximum vertical speed (units/s)
    #[serde(default = "default_move_v_y_max")]
    pub v_y_max: f64,
    /// Maximum horizontal acceleration (units/s²)
    #[serde(default = "default_move_a_max")]
    pub a_max: f64,
    /// Fixed allowance absorbing latency jitter (units)
    #[serde(default = "default_move_margin")]
    pub margin: f64,
    /// Hard cap on total displacement per sync (units)
    #[serde(default = "default_move_teleport_cap")]
    pub teleport_cap: f64,
    /// Elapsed-time clamp floor (seconds)
    #[serde(default = "default_move_min_dt")]
    pub min_dt: f64,
    /// Elapsed-time clamp ceiling (seconds)
    #[serde(default = "default_move_max_dt")]
    pub max_dt: f64,
    /// Implied-acceleration allowance as a multiple of `a_max`
    #[serde(default = "default_move_accel_smoothing")]
    pub accel_smoothing: f64,
    /// Minimum clamp distance that triggers a `player:correct`
    #[serde(default = "default_correction_min_dist")]
    pub correction_min_dist: f64,
    /// Cooldown between corrections to the same player
    #[serde(default = "default_correction_cooldown_ms")]
    pub correction_cooldown_ms: u64,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            v_max: default_move_v_max(),
            v_y_max: default_move_v_y_max(),
            a_max: default_move_a_max(),
            margin: default_move_margin(),
            teleport_cap: default_move_teleport_cap(),
            min_dt: default_move_min_dt(),
            max_dt: default_move_max_dt(),
            accel_smoothing: default_move_accel_smoothing(),
            correction_min_dist: default_correction_min_dist(),
            correction_cooldown_ms: default_correction_cooldown_ms(),
        }
    }
}

impl MovementConfig {
    /// Maximum accepted horizontal step for the given elapsed time.
    pub fn horizontal_allowance(&self, dt: f64) -> f64 {
        self.margin + self.v_max * dt + 0.5 * self.a_max * dt * dt
    }

    /// Maximum accepted vertical step for the given elapsed time.
    pub fn vertical_allowance(&self, dt: f64) -> f64 {
        self.margin + self.v_y_max * dt
    }
}

//! Room, tick, and AOI tuning.

use super::defaults::{
    default_aoi_far, default_aoi_mid, default_aoi_near, default_chat_history_len,
    default_heartbeat_ticks, default_max_active_rooms, default_outbound_queue_len,
    default_participant_limit, default_room_capacity, default_room_code_prefix,
    default_tick_rate_hz,
};
use serde::{Deserialize, Serialize};

/// Server behavior configuration for rooms and the tick loop.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerTuning {
    /// Maximum simultaneous quiz participants per room (entry-gate cap)
    #[serde(default = "default_participant_limit")]
    pub participant_limit: usize,
    /// Maximum connections per room including spectators and the waiting queue
    #[serde(default = "default_room_capacity")]
    pub room_capacity: usize,
    /// Maximum number of live rooms before `room:create` is refused
    #[serde(default = "default_max_active_rooms")]
    pub max_active_rooms: usize,
    /// Prefix for generated room codes
    #[serde(default = "default_room_code_prefix")]
    pub room_code_prefix: String,
    /// Broadcast tick frequency (interval must stay ≥ 30 ms)
    #[serde(default = "default_tick_rate_hz")]
    pub tick_rate_hz: u32,
    /// Entries retained in the per-room chat ring for late joiners
    #[serde(default = "default_chat_history_len")]
    pub chat_history_len: usize,
    /// Bound of each connection's outbound message queue
    #[serde(default = "default_outbound_queue_len")]
    pub outbound_queue_len: usize,
}

impl ServerTuning {
    pub fn tick_interval_ms(&self) -> u64 {
        (1000 / u64::from(self.tick_rate_hz.max(1))).max(30)
    }
}

impl Default for ServerTuning {
    fn default() -> Self {
        Self {
            participant_limit: default_participant_limit(),
            room_capacity: default_room_capacity(),
            max_active_rooms: default_max_active_rooms(),
            room_code_prefix: default_room_code_prefix(),
            tick_rate_hz: default_tick_rate_hz(),
            chat_history_len: default_chat_history_len(),
            outbound_queue_len: default_outbound_queue_len(),
        }
    }
}

/// Distance tiers and heartbeat cadence for the AOI delta encoder.
#[derive(Debug, Deserialize, Serialize, Clone, Copy)]
pub struct AoiConfig {
    /// Horizontal distance up to which remotes update every tick
    #[serde(default = "default_aoi_near")]
    pub near: f64,
    /// Distance up to which remotes update every 2nd tick
    #[serde(default = "default_aoi_mid")]
    pub mid: f64,
    /// Distance up to which remotes update every 4th tick; beyond: every 8th
    #[serde(default = "default_aoi_far")]
    pub far: f64,
    /// Forced resend period guaranteeing liveness against lost frames
    #[serde(default = "default_heartbeat_ticks")]
    pub heartbeat_ticks: u64,
}

impl AoiConfig {
    /// Cadence divisor for a remote at squared horizontal distance `d2`.
    pub fn cadence(&self, d2: f64) -> u64 {
        if d2 <= self.near * self.near {
            1
        } else if d2 <= self.mid * self.mid {
            2
        } else if d2 <= self.far * self.far {
            4
        } else {
            8
        }
    }
}

impl Default for AoiConfig {
    fn default() -> Self {
        Self {
            near: default_aoi_near(),
            mid: default_aoi_mid(),
            far: default_aoi_far(),
            heartbeat_ticks: default_heartbeat_ticks(),
        }
    }
}

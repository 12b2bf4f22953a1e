//! Authoritative movement validation.
//!
//! Each `player:sync` proposal is clamped against per-axis speed,
//! acceleration, and teleport caps using the wall time elapsed since the last
//! accepted state. The validator never rejects a sync outright; it scales the
//! step back inside the caps and tells the caller whether the clamp was large
//! enough to warrant a `player:correct`.

use crate::config::MovementConfig;
use crate::protocol::messages::PlayerSyncPayload;
use crate::protocol::types::{
    PlayerPose, PITCH_BOUND, WORLD_XZ_BOUND, WORLD_Y_MAX, WORLD_Y_MIN, YAW_BOUND,
};
use tokio::time::Instant;

/// Per-player movement bookkeeping.
#[derive(Debug, Clone)]
pub struct MovementNet {
    pub last_accepted_at: Instant,
    pub velocity: [f64; 3],
    pub rejected_moves: u32,
    pub last_correction_at: Option<Instant>,
}

impl MovementNet {
    pub fn new(now: Instant) -> Self {
        Self {
            last_accepted_at: now,
            velocity: [0.0; 3],
            rejected_moves: 0,
            last_correction_at: None,
        }
    }
}

/// Result of validating one sync.
#[derive(Debug, Clone, Copy)]
pub struct SyncResult {
    pub accepted: PlayerPose,
    /// Distance between the (sanitized) proposal and the accepted state.
    pub clamp_distance: f64,
    /// Whether a `player:correct` should be sent for this sync.
    pub emit_correction: bool,
}

/// Validate a proposal against `prev`, updating `net` in place.
pub fn validate_sync(
    cfg: &MovementConfig,
    prev: &PlayerPose,
    net: &mut MovementNet,
    proposal: &PlayerSyncPayload,
    now: Instant,
) -> SyncResult {
    let dt = now
        .saturating_duration_since(net.last_accepted_at)
        .as_secs_f64()
        .clamp(cfg.min_dt, cfg.max_dt);

    let wanted = sanitize_proposal(prev, proposal);

    let mut dx = wanted.x - prev.x;
    let mut dy = wanted.y - prev.y;
    let mut dz = wanted.z - prev.z;

    // 1. Horizontal speed + acceleration bound.
    let allowed_h = cfg.horizontal_allowance(dt);
    let d_h = (dx * dx + dz * dz).sqrt();
    if d_h > allowed_h {
        let scale = allowed_h / d_h;
        dx *= scale;
        dz *= scale;
    }

    // 2. Vertical bound.
    let allowed_y = cfg.vertical_allowance(dt);
    if dy.abs() > allowed_y {
        dy = allowed_y.copysign(dy);
    }

    // 3. Teleport cap on the total step.
    let d_total = (dx * dx + dy * dy + dz * dz).sqrt();
    if d_total > cfg.teleport_cap {
        let scale = cfg.teleport_cap / d_total;
        dx *= scale;
        dy *= scale;
        dz *= scale;
    }

    // 4. Acceleration smoothing on the implied velocity delta.
    let v_new = [dx / dt, dy / dt, dz / dt];
    let dv = [
        v_new[0] - net.velocity[0],
        v_new[1] - net.velocity[1],
        v_new[2] - net.velocity[2],
    ];
    let dv_mag = (dv[0] * dv[0] + dv[1] * dv[1] + dv[2] * dv[2]).sqrt();
    let allowed_dv = cfg.accel_smoothing * cfg.a_max * dt;
    if dv_mag > allowed_dv {
        let scale = allowed_dv / dv_mag;
        let v_adj = [
            net.velocity[0] + dv[0] * scale,
            net.velocity[1] + dv[1] * scale,
            net.velocity[2] + dv[2] * scale,
        ];
        dx = v_adj[0] * dt;
        dy = v_adj[1] * dt;
        dz = v_adj[2] * dt;
    }

    let accepted = PlayerPose {
        x: (prev.x + dx).clamp(-WORLD_XZ_BOUND, WORLD_XZ_BOUND),
        y: (prev.y + dy).clamp(WORLD_Y_MIN, WORLD_Y_MAX),
        z: (prev.z + dz).clamp(-WORLD_XZ_BOUND, WORLD_XZ_BOUND),
        yaw: wanted.yaw,
        pitch: wanted.pitch,
    };

    let clamp_distance = distance3(&accepted, &wanted);
    let cooldown_over = match net.last_correction_at {
        Some(at) => {
            now.saturating_duration_since(at).as_millis() as u64 >= cfg.correction_cooldown_ms
        }
        None => true,
    };
    let emit_correction = clamp_distance >= cfg.correction_min_dist && cooldown_over;

    net.last_accepted_at = now;
    net.velocity = [
        (accepted.x - prev.x) / dt,
        (accepted.y - prev.y) / dt,
        (accepted.z - prev.z) / dt,
    ];
    if clamp_distance >= cfg.correction_min_dist {
        net.rejected_moves = net.rejected_moves.saturating_add(1);
    }
    if emit_correction {
        net.last_correction_at = Some(now);
    }

    SyncResult {
        accepted,
        clamp_distance,
        emit_correction,
    }
}

/// Non-finite components fall back to the previous accepted value; finite
/// ones are clamped into world bounds before the step caps apply.
fn sanitize_proposal(prev: &PlayerPose, proposal: &PlayerSyncPayload) -> PlayerPose {
    let keep = |v: f64, fallback: f64, min: f64, max: f64| {
        if v.is_finite() {
            v.clamp(min, max)
        } else {
            fallback
        }
    };
    PlayerPose {
        x: keep(proposal.x, prev.x, -WORLD_XZ_BOUND, WORLD_XZ_BOUND),
        y: keep(proposal.y, prev.y, WORLD_Y_MIN, WORLD_Y_MAX),
        z: keep(proposal.z, prev.z, -WORLD_XZ_BOUND, WORLD_XZ_BOUND),
        yaw: keep(proposal.yaw, prev.yaw, -YAW_BOUND, YAW_BOUND),
        pitch: keep(proposal.pitch, prev.pitch, -PITCH_BOUND, PITCH_BOUND),
    }
}

fn distance3(a: &PlayerPose, b: &PlayerPose) -> f64 {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    let dz = a.z - b.z;
    (dx * dx + dy * dy + dz * dz).sqrt()
}

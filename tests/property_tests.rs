//! Property tests for the movement validator and wire quantization.

use ox_arena_server::config::MovementConfig;
use ox_arena_server::movement::{validate_sync, MovementNet};
use ox_arena_server::protocol::messages::PlayerSyncPayload;
use ox_arena_server::protocol::types::{
    dequantize_pos, dequantize_rot, quantize_pos, quantize_rot, PlayerPose,
};
use proptest::prelude::*;
use std::time::Duration;
use tokio::time::Instant;

fn proposal(x: f64, y: f64, z: f64, yaw: f64, pitch: f64) -> PlayerSyncPayload {
    PlayerSyncPayload {
        x,
        y,
        z,
        yaw,
        pitch,
        s: None,
    }
}

proptest! {
    #[test]
    fn accepted_step_never_exceeds_bounds(
        x in -600.0f64..600.0,
        y in -50.0f64..200.0,
        z in -600.0f64..600.0,
        dt_ms in 1u64..400,
    ) {
        let cfg = MovementConfig::default();
        let prev = PlayerPose::spawn();
        let now = Instant::now() + Duration::from_secs(5);
        let mut net = MovementNet::new(now - Duration::from_millis(dt_ms));

        let result = validate_sync(&cfg, &prev, &mut net, &proposal(x, y, z, 0.0, 0.0), now);
        let accepted = result.accepted;

        // All components finite and inside world bounds.
        prop_assert!(accepted.x.is_finite() && accepted.y.is_finite() && accepted.z.is_finite());
        prop_assert!(accepted.x.abs() <= 512.0);
        prop_assert!(accepted.z.abs() <= 512.0);
        prop_assert!((0.0..=128.0).contains(&accepted.y));

        // The step obeys the per-axis allowances for the clamped dt.
        let dt = (dt_ms as f64 / 1000.0).clamp(cfg.min_dt, cfg.max_dt);
        let dh = ((accepted.x - prev.x).powi(2) + (accepted.z - prev.z).powi(2)).sqrt();
        prop_assert!(dh <= cfg.horizontal_allowance(dt) + 1e-6, "dh {dh}");
        prop_assert!((accepted.y - prev.y).abs() <= cfg.vertical_allowance(dt) + 1e-6);
        let total = ((accepted.x - prev.x).powi(2)
            + (accepted.y - prev.y).powi(2)
            + (accepted.z - prev.z).powi(2))
        .sqrt();
        prop_assert!(total <= cfg.teleport_cap + 1e-6);
    }

    #[test]
    fn idempotence_holds_for_any_reachable_pose(
        x in -500.0f64..500.0,
        z in -500.0f64..500.0,
        yaw in -3.1f64..3.1,
        pitch in -1.5f64..1.5,
    ) {
        let cfg = MovementConfig::default();
        let prev = PlayerPose { x, y: 1.75, z, yaw, pitch };
        let now = Instant::now() + Duration::from_secs(5);
        let mut net = MovementNet::new(now - Duration::from_millis(100));

        let result = validate_sync(
            &cfg,
            &prev,
            &mut net,
            &proposal(x, 1.75, z, yaw, pitch),
            now,
        );
        prop_assert_eq!(result.accepted, prev);
        prop_assert!(!result.emit_correction);
    }

    #[test]
    fn quantization_round_trip_error_is_bounded(
        v in -512.0f64..512.0,
        r in -3.15f64..3.15,
    ) {
        let q = quantize_pos(v);
        prop_assert!((dequantize_pos(q) - v).abs() <= 0.005);
        let qr = quantize_rot(r);
        prop_assert!((dequantize_rot(qr) - r).abs() <= 0.0005);
    }

    #[test]
    fn non_finite_proposals_never_escape_world_bounds(
        which in 0usize..5,
    ) {
        let cfg = MovementConfig::default();
        let prev = PlayerPose::spawn();
        let now = Instant::now() + Duration::from_secs(5);
        let mut net = MovementNet::new(now - Duration::from_millis(50));

        let mut fields = [1.0f64, 1.75, 1.0, 0.1, 0.1];
        fields[which] = f64::NAN;
        let result = validate_sync(
            &cfg,
            &prev,
            &mut net,
            &proposal(fields[0], fields[1], fields[2], fields[3], fields[4]),
            now,
        );
        let accepted = result.accepted;
        prop_assert!(accepted.x.is_finite());
        prop_assert!(accepted.y.is_finite());
        prop_assert!(accepted.z.is_finite());
        prop_assert!(accepted.yaw.is_finite());
        prop_assert!(accepted.pitch.is_finite());
    }
}

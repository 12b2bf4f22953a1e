//! Area-of-interest delta encoding.
//!
//! Per receiver, the encoder keeps the last quantized snapshot sent for each
//! remote player and emits only the fields that changed. Update cadence drops
//! with distance, and a periodic heartbeat resend guards liveness against
//! lost frames. The cache lives on the connection keyed by room code, so
//! leaving a room drops exactly those entries.

use std::collections::HashMap;

use crate::config::AoiConfig;
use crate::protocol::messages::DeltaUpdate;
use crate::protocol::types::{quantize_pos, quantize_rot, PlayerId, PlayerPose};

/// A remote player's state as sampled at the start of a tick.
#[derive(Debug, Clone)]
pub struct AoiSource {
    pub id: PlayerId,
    pub name: String,
    pub alive: bool,
    pub pose: PlayerPose,
}

/// Quantized wire snapshot of one remote player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedPlayer {
    pub name: String,
    pub alive: u8,
    pub p: [i32; 3],
    pub r: [i32; 2],
}

impl PackedPlayer {
    pub fn pack(source: &AoiSource) -> Self {
        Self {
            name: source.name.clone(),
            alive: u8::from(source.alive),
            p: [
                quantize_pos(source.pose.x),
                quantize_pos(source.pose.y),
                quantize_pos(source.pose.z),
            ],
            r: [
                quantize_rot(source.pose.yaw),
                quantize_rot(source.pose.pitch),
            ],
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    snap: PackedPlayer,
    last_sent_tick: u64,
}

/// Per-receiver, per-room delta cache.
#[derive(Debug, Default)]
pub struct DeltaCache {
    entries: HashMap<PlayerId, CacheEntry>,
}

impl DeltaCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Encode one tick for this receiver. `sources` may include the receiver
    /// itself; it is skipped. Returns the changed rows and the ids of cached
    /// remotes that left the room, or `None` when the frame would be empty.
    pub fn encode_tick(
        &mut self,
        cfg: &AoiConfig,
        receiver_id: &PlayerId,
        receiver_pose: &PlayerPose,
        tick: u64,
        sources: &[AoiSource],
    ) -> Option<(Vec<DeltaUpdate>, Vec<PlayerId>)> {
        let removes: Vec<PlayerId> = self
            .entries
            .keys()
            .filter(|id| !sources.iter().any(|r| r.id == **id))
            .copied()
            .collect();
        for id in &removes {
            self.entries.remove(id);
        }

        let mut updates = Vec::new();
        for remote in sources {
            if remote.id == *receiver_id {
                continue;
            }
            let cached = self.entries.get(&remote.id);
            let heartbeat_due = cached
                .map(|entry| tick.saturating_sub(entry.last_sent_tick) >= cfg.heartbeat_ticks)
                .unwrap_or(true);
            let cadence = cfg.cadence(receiver_pose.horizontal_distance_sq(&remote.pose));
            if cached.is_some() && !heartbeat_due && tick % cadence != 0 {
                continue;
            }

            let packed = PackedPlayer::pack(remote);
            let update = match cached {
                None => DeltaUpdate {
                    id: remote.id,
                    n: Some(packed.name.clone()),
                    a: Some(packed.alive),
                    p: Some(packed.p),
                    r: Some(packed.r),
                },
                Some(entry) => {
                    let diff = DeltaUpdate {
                        id: remote.id,
                        n: (entry.snap.name != packed.name).then(|| packed.name.clone()),
                        a: (entry.snap.alive != packed.alive).then_some(packed.alive),
                        p: (entry.snap.p != packed.p).then_some(packed.p),
                        r: (entry.snap.r != packed.r).then_some(packed.r),
                    };
                    let unchanged = diff.n.is_none()
                        && diff.a.is_none()
                        && diff.p.is_none()
                        && diff.r.is_none();
                    if unchanged && !heartbeat_due {
                        continue;
                    }
                    // Heartbeat rows may carry only the id.
                    diff
                }
            };

            self.entries.insert(
                remote.id,
                CacheEntry {
                    snap: packed,
                    last_sent_tick: tick,
                },
            );
            updates.push(update);
        }

        if updates.is_empty() && removes.is_empty() {
            None
        } else {
            Some((updates, removes))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn source(id: PlayerId, x: f64) -> AoiSource {
        AoiSource {
            id,
            name: "remote".into(),
            alive: true,
            pose: PlayerPose {
                x,
                y: 1.75,
                z: 0.0,
                yaw: 0.0,
                pitch: 0.0,
            },
        }
    }

    #[test]
    fn first_sight_sends_full_row() {
        let cfg = AoiConfig::default();
        let mut cache = DeltaCache::new();
        let receiver = PlayerPose::spawn();
        let remote = source(Uuid::new_v4(), 5.0);

        let (updates, removes) = cache
            .encode_tick(&cfg, &Uuid::nil(), &receiver, 1, std::slice::from_ref(&remote))
            .unwrap();
        assert!(removes.is_empty());
        assert_eq!(updates.len(), 1);
        let row = &updates[0];
        assert_eq!(row.n.as_deref(), Some("remote"));
        assert_eq!(row.a, Some(1));
        assert_eq!(row.p, Some([500, 175, 0]));
        assert_eq!(row.r, Some([0, 0]));
    }

    #[test]
    fn stationary_remotes_emit_nothing_until_heartbeat() {
        let cfg = AoiConfig::default();
        let mut cache = DeltaCache::new();
        let receiver = PlayerPose::spawn();
        let remote = source(Uuid::new_v4(), 5.0);
        let remotes = [remote];

        assert!(cache.encode_tick(&cfg, &Uuid::nil(), &receiver, 1, &remotes).is_some());
        // Ticks 2..=20: no change, no frame.
        for tick in 2..=20 {
            assert!(
                cache.encode_tick(&cfg, &Uuid::nil(), &receiver, tick, &remotes).is_none(),
                "unexpected frame at tick {tick}"
            );
        }
        // Tick 21: 20 ticks since last send, heartbeat fires with a bare row.
        let (updates, _) = cache.encode_tick(&cfg, &Uuid::nil(), &receiver, 21, &remotes).unwrap();
        assert_eq!(updates.len(), 1);
        assert!(updates[0].p.is_none());
        assert!(updates[0].r.is_none());
        assert!(updates[0].n.is_none());
    }

    #[test]
    fn sub_quantum_movement_is_silent() {
        let cfg = AoiConfig::default();
        let mut cache = DeltaCache::new();
        let receiver = PlayerPose::spawn();
        let id = Uuid::new_v4();

        cache
            .encode_tick(&cfg, &Uuid::nil(), &receiver, 1, &[source(id, 5.0)])
            .unwrap();
        // 0.004 units rounds to the same quantized cell.
        assert!(cache
            .encode_tick(&cfg, &Uuid::nil(), &receiver, 2, &[source(id, 5.004)])
            .is_none());
        // 0.02 units crosses a cell boundary and shows up as a p diff.
        let (updates, _) = cache
            .encode_tick(&cfg, &Uuid::nil(), &receiver, 3, &[source(id, 5.02)])
            .unwrap();
        assert_eq!(updates[0].p, Some([502, 175, 0]));
        assert!(updates[0].r.is_none());
        assert!(updates[0].n.is_none());
    }

    #[test]
    fn far_remotes_update_at_reduced_cadence() {
        let cfg = AoiConfig::default();
        let mut cache = DeltaCache::new();
        let receiver = PlayerPose::spawn();
        let id = Uuid::new_v4();

        // Remote at 100 units: cadence 4.
        cache
            .encode_tick(&cfg, &Uuid::nil(), &receiver, 4, &[source(id, 100.0)])
            .unwrap();
        // Keep it moving so a diff is always pending.
        let mut sent = 0;
        for tick in 5..=12 {
            let x = 100.0 + tick as f64;
            if cache
                .encode_tick(&cfg, &Uuid::nil(), &receiver, tick, &[source(id, x)])
                .is_some()
            {
                sent += 1;
                assert_eq!(tick % 4, 0, "off-cadence frame at tick {tick}");
            }
        }
        assert_eq!(sent, 2, "expected ticks 8 and 12 only");
    }

    #[test]
    fn departed_remotes_are_reported_once() {
        let cfg = AoiConfig::default();
        let mut cache = DeltaCache::new();
        let receiver = PlayerPose::spawn();
        let id = Uuid::new_v4();

        cache
            .encode_tick(&cfg, &Uuid::nil(), &receiver, 1, &[source(id, 5.0)])
            .unwrap();
        let (updates, removes) = cache.encode_tick(&cfg, &Uuid::nil(), &receiver, 2, &[]).unwrap();
        assert!(updates.is_empty());
        assert_eq!(removes, vec![id]);
        assert!(cache.is_empty());
        // Nothing left to remove.
        assert!(cache.encode_tick(&cfg, &Uuid::nil(), &receiver, 3, &[]).is_none());
    }

    #[test]
    fn alive_flag_changes_are_delta_encoded() {
        let cfg = AoiConfig::default();
        let mut cache = DeltaCache::new();
        let receiver = PlayerPose::spawn();
        let id = Uuid::new_v4();
        let mut remote = source(id, 5.0);

        cache
            .encode_tick(&cfg, &Uuid::nil(), &receiver, 1, std::slice::from_ref(&remote))
            .unwrap();
        remote.alive = false;
        let (updates, _) = cache
            .encode_tick(&cfg, &Uuid::nil(), &receiver, 2, std::slice::from_ref(&remote))
            .unwrap();
        assert_eq!(updates[0].a, Some(0));
        assert!(updates[0].p.is_none());
    }
}

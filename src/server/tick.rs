//! Movement ingress and the 20 Hz broadcast tick.
//!
//! The loop takes the room guard once per tick, samples every room with two
//! or more players, then encodes per-receiver AOI deltas against the caches
//! stored on each connection. Dead sockets are pruned at the top of the
//! tick so rooms never accumulate ghosts.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use smallvec::SmallVec;
use tokio::time::{Instant, MissedTickBehavior};

use super::{AckExtras, ArenaServer};
use crate::aoi::AoiSource;
use crate::movement;
use crate::protocol::messages::{PlayerCorrectPayload, PlayerDeltaPayload, PlayerSyncPayload};
use crate::protocol::{AckError, PlayerId, ServerMessage};

impl ArenaServer {
    /// `player:sync`: clamp the proposal and, when materially clamped, send
    /// the authoritative correction back.
    pub async fn handle_player_sync(
        &self,
        id: &PlayerId,
        payload: PlayerSyncPayload,
    ) -> Result<AckExtras, AckError> {
        let code = self.conn_room_code(id).ok_or(AckError::NotInRoom)?;
        let mut rooms = self.rooms.write().await;
        let room = rooms.get_mut(&code).ok_or(AckError::RoomNotFound)?;
        let player = room.player_mut(id).ok_or(AckError::PlayerNotFound)?;

        let prev = player.pose;
        let result = movement::validate_sync(
            &self.config.movement,
            &prev,
            &mut player.net,
            &payload,
            Instant::now(),
        );
        player.pose = result.accepted;
        player.pose_updated_at = Utc::now();

        if result.emit_correction {
            let accepted = result.accepted;
            self.send_to(
                id,
                Arc::new(ServerMessage::PlayerCorrect(PlayerCorrectPayload {
                    x: accepted.x,
                    y: accepted.y,
                    z: accepted.z,
                    yaw: accepted.yaw,
                    pitch: accepted.pitch,
                })),
            );
        }

        let mut extras = AckExtras::new();
        extras.insert("clamped".into(), json!(result.emit_correction));
        extras.insert("x".into(), json!(result.accepted.x));
        extras.insert("y".into(), json!(result.accepted.y));
        extras.insert("z".into(), json!(result.accepted.z));
        Ok(extras)
    }

    /// Run the fixed tick until shutdown. Spawned once at startup.
    pub async fn run_tick_loop(self: Arc<Self>) {
        let interval = Duration::from_millis(self.config.server.tick_interval_ms());
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tracing::info!(
            tick_rate_hz = self.config.server.tick_rate_hz,
            interval_ms = interval.as_millis() as u64,
            "tick loop running"
        );
        loop {
            tokio::select! {
                () = self.shutdown.cancelled() => break,
                _ = ticker.tick() => self.run_one_tick().await,
            }
        }
        tracing::info!("tick loop stopped");
    }

    pub(crate) async fn run_one_tick(self: &Arc<Self>) {
        // Prune connections whose sockets died without a clean leave.
        let dead: Vec<PlayerId> = self
            .connections
            .iter()
            .filter(|entry| entry.sender.is_closed())
            .map(|entry| *entry.key())
            .collect();
        for id in dead {
            tracing::debug!(player_id = %id, "pruning dead connection");
            self.unregister_client(&id).await;
        }

        let started = Instant::now();
        let mut frames: Vec<(PlayerId, Arc<ServerMessage>)> = Vec::new();
        {
            let mut rooms = self.rooms.write().await;
            for room in rooms.values_mut() {
                if room.len() < 2 {
                    continue;
                }
                room.tick += 1;
                let tick = room.tick;
                let sources: SmallVec<[AoiSource; 8]> = room
                    .players_ordered()
                    .map(|p| AoiSource {
                        id: p.id,
                        name: p.name.clone(),
                        alive: p.alive,
                        pose: p.pose,
                    })
                    .collect();

                for receiver in room.player_ids() {
                    let Some(receiver_pose) = room.player(&receiver).map(|p| p.pose) else {
                        continue;
                    };
                    let Some(mut conn) = self.connections.get_mut(&receiver) else {
                        continue;
                    };
                    let cache = conn.delta_caches.entry(room.code.clone()).or_default();
                    if let Some((updates, removes)) = cache.encode_tick(
                        &self.config.aoi,
                        &receiver,
                        &receiver_pose,
                        tick,
                        &sources,
                    ) {
                        frames.push((
                            receiver,
                            Arc::new(ServerMessage::PlayerDelta(PlayerDeltaPayload {
                                room: room.code.clone(),
                                tick,
                                updates,
                                removes,
                            })),
                        ));
                    }
                }
            }
        }

        for (id, frame) in frames {
            self.send_to(&id, frame);
        }

        let elapsed = started.elapsed();
        if elapsed > Duration::from_millis(self.config.server.tick_interval_ms() / 2) {
            tracing::debug!(elapsed_ms = elapsed.as_millis() as u64, "slow tick");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use tokio::sync::mpsc;

    async fn connect(
        server: &Arc<ArenaServer>,
    ) -> (PlayerId, mpsc::Receiver<Arc<ServerMessage>>) {
        let (tx, rx) = mpsc::channel(512);
        let (id, _close) = server.register_client(tx, "127.0.0.1:2400".parse().unwrap());
        (id, rx)
    }

    fn sync(x: f64, z: f64) -> PlayerSyncPayload {
        PlayerSyncPayload {
            x,
            y: 1.75,
            z,
            yaw: 0.0,
            pitch: 0.0,
            s: None,
        }
    }

    async fn drain(rx: &mut mpsc::Receiver<Arc<ServerMessage>>) -> Vec<Arc<ServerMessage>> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    fn deltas(messages: &[Arc<ServerMessage>]) -> Vec<PlayerDeltaPayload> {
        messages
            .iter()
            .filter_map(|m| match m.as_ref() {
                ServerMessage::PlayerDelta(p) => Some(p.clone()),
                _ => None,
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_broadcast_deltas_then_go_silent() {
        let server = ArenaServer::new(Config::default());
        let (a, mut rx_a) = connect(&server).await;
        let (b, mut rx_b) = connect(&server).await;
        server.handle_join_or_create(&a, "TICK").await.unwrap();
        server.handle_join_or_create(&b, "TICK").await.unwrap();
        drain(&mut rx_a).await;
        drain(&mut rx_b).await;

        // First tick: both receivers learn about each other.
        server.run_one_tick().await;
        let a_deltas = deltas(&drain(&mut rx_a).await);
        assert_eq!(a_deltas.len(), 1);
        assert_eq!(a_deltas[0].updates.len(), 1);
        assert_eq!(a_deltas[0].updates[0].id, b);
        assert!(a_deltas[0].updates[0].p.is_some());
        let b_deltas = deltas(&drain(&mut rx_b).await);
        assert_eq!(b_deltas[0].updates[0].id, a);

        // Stationary players: the next ticks stay silent.
        for _ in 0..5 {
            server.run_one_tick().await;
        }
        assert!(deltas(&drain(&mut rx_a).await).is_empty());
        assert!(deltas(&drain(&mut rx_b).await).is_empty());

        // Movement crossing a quantization cell shows up as a p diff.
        server.handle_player_sync(&b, sync(0.25, 0.0)).await.unwrap();
        server.run_one_tick().await;
        let a_deltas = deltas(&drain(&mut rx_a).await);
        assert_eq!(a_deltas.len(), 1);
        assert!(a_deltas[0].updates[0].p.is_some());
        assert!(a_deltas[0].updates[0].n.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn leaver_appears_in_removes() {
        let server = ArenaServer::new(Config::default());
        let (a, mut rx_a) = connect(&server).await;
        let (b, _rx_b) = connect(&server).await;
        let (c, _rx_c) = connect(&server).await;
        for id in [&a, &b, &c] {
            server.handle_join_or_create(id, "TICK2").await.unwrap();
        }
        server.run_one_tick().await;
        drain(&mut rx_a).await;

        server.handle_leave_room(&b).await.unwrap();
        server.run_one_tick().await;
        let a_deltas = deltas(&drain(&mut rx_a).await);
        assert_eq!(a_deltas.len(), 1);
        assert_eq!(a_deltas[0].removes, vec![b]);
    }

    #[tokio::test(start_paused = true)]
    async fn single_player_rooms_do_not_tick() {
        let server = ArenaServer::new(Config::default());
        let (a, mut rx_a) = connect(&server).await;
        server.handle_join_or_create(&a, "SOLO").await.unwrap();
        drain(&mut rx_a).await;

        server.run_one_tick().await;
        assert!(deltas(&drain(&mut rx_a).await).is_empty());
        let rooms = server.rooms.read().await;
        assert_eq!(rooms.get("SOLO").unwrap().tick, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn oversized_sync_gets_corrected() {
        let server = ArenaServer::new(Config::default());
        let (a, mut rx_a) = connect(&server).await;
        let (b, _rx_b) = connect(&server).await;
        server.handle_join_or_create(&a, "CLAMP").await.unwrap();
        server.handle_join_or_create(&b, "CLAMP").await.unwrap();
        drain(&mut rx_a).await;

        tokio::time::sleep(Duration::from_millis(100)).await;
        server.handle_player_sync(&a, sync(50.0, 0.0)).await.unwrap();
        let messages = drain(&mut rx_a).await;
        let correction = messages.iter().find_map(|m| match m.as_ref() {
            ServerMessage::PlayerCorrect(p) => Some(*p),
            _ => None,
        });
        let correction = correction.expect("correction missing");
        assert!(correction.x < 5.0, "clamped x {}", correction.x);

        let rooms = server.rooms.read().await;
        let pose = rooms.get("CLAMP").unwrap().player(&a).unwrap().pose;
        assert_eq!(pose.x, correction.x);
    }
}

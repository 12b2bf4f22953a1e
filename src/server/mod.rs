//! Server orchestration: connection registry, room registry, and the
//! broadcast plumbing shared by all message handlers.
//!
//! Rooms are logically single-threaded: every mutation (ingress handlers,
//! tick dispatch, timer callbacks) serializes through the one `rooms`
//! write guard, so the per-room logic never needs finer locking.

pub mod chat;
pub mod gate_service;
pub mod moderation;
pub mod quiz_service;
pub mod room_service;
pub mod router;
pub mod tick;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde_json::Value;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::aoi::DeltaCache;
use crate::config::Config;
use crate::gateway::{GatewayState, RouteTokenValidator};
use crate::protocol::messages::ServerRolePayload;
use crate::protocol::{AckError, AckPayload, PlayerId, ServerMessage};
use crate::quiz::ZoneLayout;
use crate::room::Room;

/// Which tier this process serves as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerRole {
    Worker,
    Gateway,
}

impl ServerRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Worker => "worker",
            Self::Gateway => "gateway",
        }
    }
}

/// Per-connection registry entry. Delta caches are keyed by room code so
/// leaving a room drops exactly that room's entries.
#[derive(Debug)]
pub struct ClientConn {
    pub sender: mpsc::Sender<Arc<ServerMessage>>,
    pub addr: SocketAddr,
    pub name: String,
    pub room_code: Option<String>,
    pub owner: bool,
    pub kicked: bool,
    /// Cancelling tears the socket down from the server side.
    pub close: CancellationToken,
    pub delta_caches: HashMap<String, DeltaCache>,
    pub dropped_messages: u64,
}

/// Extra fields merged into a successful ack body.
pub type AckExtras = serde_json::Map<String, Value>;

/// The arena server: one per process, shared behind `Arc`.
pub struct ArenaServer {
    pub(crate) config: Config,
    pub(crate) role: ServerRole,
    pub(crate) started_at: DateTime<Utc>,
    pub(crate) connections: DashMap<PlayerId, ClientConn>,
    pub(crate) rooms: RwLock<HashMap<String, Room>>,
    pub(crate) zones: ZoneLayout,
    pub(crate) gateway: Option<GatewayState>,
    pub(crate) route_guard: Option<RouteTokenValidator>,
    pub(crate) shutdown: CancellationToken,
    dropped_total: AtomicU64,
}

impl ArenaServer {
    /// Build a worker-role server.
    pub fn new(config: Config) -> Arc<Self> {
        Self::with_role(config, ServerRole::Worker, false)
    }

    /// Build a server with an explicit role. `require_route_token` makes a
    /// worker demand a valid gateway routing token before admitting anyone.
    pub fn with_role(config: Config, role: ServerRole, require_route_token: bool) -> Arc<Self> {
        let gateway = match role {
            ServerRole::Gateway => Some(GatewayState::new(&config)),
            ServerRole::Worker => None,
        };
        let route_guard = if require_route_token && role == ServerRole::Worker {
            Some(RouteTokenValidator::new(&config))
        } else {
            None
        };
        Arc::new(Self {
            config,
            role,
            started_at: Utc::now(),
            connections: DashMap::new(),
            rooms: RwLock::new(HashMap::new()),
            zones: ZoneLayout::default(),
            gateway,
            route_guard,
            shutdown: CancellationToken::new(),
            dropped_total: AtomicU64::new(0),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn role(&self) -> ServerRole {
        self.role
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Register a fresh connection and greet it with `server:role`.
    pub fn register_client(
        &self,
        sender: mpsc::Sender<Arc<ServerMessage>>,
        addr: SocketAddr,
    ) -> (PlayerId, CancellationToken) {
        let id = Uuid::new_v4();
        let close = CancellationToken::new();
        self.connections.insert(
            id,
            ClientConn {
                sender,
                addr,
                name: crate::protocol::validation::DEFAULT_NAME.to_string(),
                room_code: None,
                owner: false,
                kicked: false,
                close: close.clone(),
                delta_caches: HashMap::new(),
                dropped_messages: 0,
            },
        );
        tracing::info!(player_id = %id, client_addr = %addr, "connection established");
        self.send_to(
            &id,
            Arc::new(ServerMessage::ServerRole(ServerRolePayload {
                role: self.role.as_str().to_string(),
                participant_limit: self.config.server.participant_limit,
            })),
        );
        (id, close)
    }

    /// Drop a connection, leaving its room first.
    pub async fn unregister_client(self: &Arc<Self>, id: &PlayerId) {
        self.leave_current_room(id).await;
        if let Some((_, conn)) = self.connections.remove(id) {
            if conn.dropped_messages > 0 {
                tracing::debug!(
                    player_id = %id,
                    dropped = conn.dropped_messages,
                    "connection closed with dropped outbound messages"
                );
            } else {
                tracing::info!(player_id = %id, "connection closed");
            }
            conn.close.cancel();
        }
    }

    /// Queue a message for one connection. Bounded queue: droppable frames
    /// (AOI deltas) are shed first when the queue backs up, state-changing
    /// events are dropped only as a last resort and logged.
    pub fn send_to(&self, id: &PlayerId, message: Arc<ServerMessage>) {
        let Some(mut conn) = self.connections.get_mut(id) else {
            return;
        };
        if message.is_droppable() {
            // Keep headroom for essential events.
            let reserve = self.config.server.outbound_queue_len / 4;
            if conn.sender.capacity() <= reserve {
                conn.dropped_messages += 1;
                self.dropped_total.fetch_add(1, Ordering::Relaxed);
                return;
            }
        }
        let event = message.event_name();
        if conn.sender.try_send(message).is_err() {
            conn.dropped_messages += 1;
            let total = self.dropped_total.fetch_add(1, Ordering::Relaxed) + 1;
            if total.is_power_of_two() {
                tracing::warn!(player_id = %id, event, "outbound queue full, message dropped");
            }
        }
    }

    /// Fan a message out to every player in the room, except one.
    pub fn broadcast_room(&self, room: &Room, message: &Arc<ServerMessage>, except: Option<&PlayerId>) {
        for id in room.player_ids() {
            if except == Some(&id) {
                continue;
            }
            self.send_to(&id, message.clone());
        }
    }

    /// Broadcast the serialized room to all members.
    pub fn broadcast_room_update(&self, room: &Room) {
        let message = Arc::new(ServerMessage::RoomUpdate(Box::new(room.snapshot())));
        self.broadcast_room(room, &message, None);
    }

    pub fn send_ack(&self, id: &PlayerId, ack: Option<u64>, result: Result<AckExtras, AckError>) {
        let Some(ack_id) = ack else {
            return;
        };
        let payload = match result {
            Ok(extras) => AckPayload::ok(ack_id, extras),
            Err(err) => AckPayload::err(ack_id, &err),
        };
        self.send_to(id, Arc::new(ServerMessage::Ack(payload)));
    }

    /// Constant-time owner key comparison.
    pub fn verify_owner_key(&self, provided: &str) -> bool {
        let Some(expected) = self.config.owner_key.as_deref() else {
            return false;
        };
        if expected.len() != provided.len() {
            return false;
        }
        expected.as_bytes().ct_eq(provided.as_bytes()).into()
    }

    pub fn online_count(&self) -> usize {
        self.connections.len()
    }

    pub fn dropped_message_total(&self) -> u64 {
        self.dropped_total.load(Ordering::Relaxed)
    }

    /// `/health` body: liveness plus a glance at the busiest room.
    pub async fn health_payload(&self) -> Value {
        let rooms = self.rooms.read().await;
        let total_players: usize = rooms.values().map(Room::len).sum();
        let active_quiz_rooms = rooms.values().filter(|r| r.quiz.active()).count();
        let top_room = rooms.values().max_by_key(|r| r.len()).map(|room| {
            let host_name = room
                .host_id
                .and_then(|id| room.player(&id))
                .map(|p| p.name.clone());
            serde_json::json!({
                "code": room.code,
                "players": room.len(),
                "capacity": room.room_capacity,
                "hostName": host_name,
                "quiz": {
                    "active": room.quiz.active(),
                    "phase": room.quiz.phase,
                    "autoMode": room.quiz.auto_mode,
                    "autoStartsAt": room.quiz.auto_starts_at.map(|t| t.timestamp_millis()),
                    "questionIndex": room.quiz.question_index,
                    "totalQuestions": room.quiz.total_questions(),
                },
            })
        });
        serde_json::json!({
            "ok": true,
            "service": crate::config::SERVICE_NAME,
            "role": self.role.as_str(),
            "rooms": rooms.len(),
            "online": self.online_count(),
            "totalPlayers": total_players,
            "activeQuizRooms": active_quiz_rooms,
            "capacityPerRoom": self.config.server.room_capacity,
            "maxActiveRooms": self.config.server.max_active_rooms,
            "tickRate": self.config.server.tick_rate_hz,
            "topRoom": top_room,
            "now": Utc::now().timestamp_millis(),
        })
    }

    /// `/status` and `/` body: configuration summary.
    pub fn status_payload(&self) -> Value {
        serde_json::json!({
            "service": crate::config::SERVICE_NAME,
            "role": self.role.as_str(),
            "startedAt": self.started_at.timestamp_millis(),
            "port": self.config.port,
            "corsOrigin": self.config.cors_origin,
            "participantLimit": self.config.server.participant_limit,
            "roomCapacity": self.config.server.room_capacity,
            "maxActiveRooms": self.config.server.max_active_rooms,
            "tickRate": self.config.server.tick_rate_hz,
            "lockSeconds": self.config.quiz.lock_seconds,
            "autoStartDelayMs": self.config.quiz.auto_start_delay_ms,
            "workerPortBase": self.config.gateway.worker_port_base,
            "workerPortMax": self.config.gateway.worker_port_max,
            "ownerKeyConfigured": self.config.owner_key.is_some(),
        })
    }

    pub(crate) fn conn_room_code(&self, id: &PlayerId) -> Option<String> {
        self.connections.get(id).and_then(|c| c.room_code.clone())
    }

    pub(crate) fn conn_is_owner(&self, id: &PlayerId) -> bool {
        self.connections.get(id).is_some_and(|c| c.owner)
    }
}

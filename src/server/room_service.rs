//! Room joining, creation, leaving, and listing.

use std::sync::Arc;

use serde_json::json;
use tokio::time::Instant;

use super::{AckExtras, ArenaServer, ServerRole};
use crate::protocol::messages::{CreateRoomPayload, JoinRoomPayload, QuickJoinPayload};
use crate::protocol::validation::sanitize_player_name;
use crate::protocol::{validation, AckError, PlayerId, ServerMessage};
use crate::protocol::room_codes;
use crate::room::{Player, Room};

impl ArenaServer {
    /// `room:quick-join`: pick or create a joinable room, preferring the
    /// requested code. On a gateway this resolves to a redirect instead.
    pub async fn handle_quick_join(
        self: &Arc<Self>,
        id: &PlayerId,
        payload: QuickJoinPayload,
    ) -> Result<AckExtras, AckError> {
        // Owner-token claim rides along with quick-join.
        if let Some(owner_key) = payload.owner_key.as_deref() {
            if self.verify_owner_key(owner_key) {
                if let Some(mut conn) = self.connections.get_mut(id) {
                    conn.owner = true;
                }
            } else {
                self.send_to(
                    id,
                    Arc::new(ServerMessage::AuthError {
                        message: "owner key rejected".into(),
                    }),
                );
                return Err(AckError::AuthFailed);
            }
        }

        if self.role == ServerRole::Gateway {
            return self.gateway_quick_join(id, &payload);
        }

        // Workers behind a gateway admit only token-bearing arrivals.
        let mut token_room: Option<String> = None;
        if let Some(guard) = &self.route_guard {
            match payload.route_token.as_deref().map(|t| guard.validate(t)) {
                Some(Ok(room_code)) => token_room = Some(room_code),
                Some(Err(err)) => {
                    tracing::warn!(player_id = %id, error = %err, "routing token rejected");
                    self.reject_unrouted(id);
                    return Err(AckError::AuthFailed);
                }
                None => {
                    self.reject_unrouted(id);
                    return Err(AckError::AuthFailed);
                }
            }
        }

        let name = sanitize_player_name(payload.name.as_deref());
        let requested = match payload.room_code.as_deref() {
            Some(raw) => Some(validation::normalize_room_code(raw)?),
            None => token_room,
        };

        self.leave_current_room(id).await;

        let mut rooms = self.rooms.write().await;

        // Preferred room first, then the fullest joinable room, then a new one.
        let code = match requested {
            Some(code) if rooms.contains_key(&code) => {
                let room = rooms.get(&code).ok_or(AckError::RoomNotFound)?;
                if room.len() >= room.room_capacity {
                    return Err(AckError::RoomFull);
                }
                code
            }
            Some(code) => {
                self.create_room_locked(&mut rooms, code.clone(), false)?;
                code
            }
            None => {
                let joinable = rooms
                    .values()
                    .filter(|room| room.len() < room.room_capacity)
                    .max_by_key(|room| room.len())
                    .map(|room| room.code.clone());
                match joinable {
                    Some(code) => code,
                    None => {
                        let code = self.generate_room_code(&rooms);
                        self.create_room_locked(&mut rooms, code.clone(), false)
                            .map_err(|err| match err {
                                AckError::RoomLimitReached => AckError::NoRoomCapacity,
                                other => other,
                            })?;
                        code
                    }
                }
            }
        };

        let snapshot = self.admit_player(&mut rooms, &code, id, name)?;
        let mut extras = AckExtras::new();
        extras.insert("room".into(), json!(snapshot));
        Ok(extras)
    }

    /// `room:create`: create a new room (fails if the code exists or the
    /// active-room cap is reached) and join it.
    pub async fn handle_create_room(
        self: &Arc<Self>,
        id: &PlayerId,
        payload: CreateRoomPayload,
    ) -> Result<AckExtras, AckError> {
        let name = sanitize_player_name(payload.name.as_deref());
        let persistent = payload.persistent.unwrap_or(false);

        self.leave_current_room(id).await;

        let mut rooms = self.rooms.write().await;
        let code = match payload.code.as_deref() {
            Some(raw) => {
                let code = validation::normalize_room_code(raw)?;
                if rooms.contains_key(&code) {
                    return Err(AckError::RoomAlreadyExists);
                }
                code
            }
            None => self.generate_room_code(&rooms),
        };
        self.create_room_locked(&mut rooms, code.clone(), persistent)?;

        let snapshot = self.admit_player(&mut rooms, &code, id, name)?;
        let mut extras = AckExtras::new();
        extras.insert("room".into(), json!(snapshot));
        Ok(extras)
    }

    /// `room:join`: join an existing room by code.
    pub async fn handle_join_room(
        self: &Arc<Self>,
        id: &PlayerId,
        payload: JoinRoomPayload,
    ) -> Result<AckExtras, AckError> {
        let code = validation::normalize_room_code(&payload.code)?;
        let name = sanitize_player_name(payload.name.as_deref());

        self.leave_current_room(id).await;

        let mut rooms = self.rooms.write().await;
        if !rooms.contains_key(&code) {
            return Err(AckError::RoomNotFound);
        }
        let snapshot = self.admit_player(&mut rooms, &code, id, name)?;
        let mut extras = AckExtras::new();
        extras.insert("room".into(), json!(snapshot));
        Ok(extras)
    }

    /// `room:leave`.
    pub async fn handle_leave_room(self: &Arc<Self>, id: &PlayerId) -> Result<AckExtras, AckError> {
        if self.conn_room_code(id).is_none() {
            return Err(AckError::NotInRoom);
        }
        self.leave_current_room(id).await;
        Ok(AckExtras::new())
    }

    /// `room:list`: summaries as both the ack body and a `room:list` event.
    pub async fn handle_list_rooms(&self, id: &PlayerId) -> Result<AckExtras, AckError> {
        let rooms = self.rooms.read().await;
        let summaries: Vec<_> = rooms.values().map(Room::summary).collect();
        drop(rooms);

        self.send_to(
            id,
            Arc::new(ServerMessage::RoomList {
                rooms: summaries.clone(),
            }),
        );
        let mut extras = AckExtras::new();
        extras.insert("rooms".into(), json!(summaries));
        Ok(extras)
    }

    fn gateway_quick_join(
        &self,
        id: &PlayerId,
        payload: &QuickJoinPayload,
    ) -> Result<AckExtras, AckError> {
        let gateway = self.gateway.as_ref().ok_or(AckError::RedirectBuildFailed)?;
        let code = match payload.room_code.as_deref() {
            Some(raw) => validation::normalize_room_code(raw)?,
            None => room_codes::generate_candidate(&self.config.server.room_code_prefix),
        };
        let redirect = gateway.issue_redirect(&code)?;
        self.send_to(id, Arc::new(ServerMessage::RouteAssign(redirect.clone())));

        let mut extras = AckExtras::new();
        extras.insert("redirect".into(), json!(redirect));
        Ok(extras)
    }

    fn reject_unrouted(&self, id: &PlayerId) {
        self.send_to(
            id,
            Arc::new(ServerMessage::AuthError {
                message: "routing token required".into(),
            }),
        );
        if let Some(conn) = self.connections.get(id) {
            conn.close.cancel();
        }
    }

    fn generate_room_code(&self, rooms: &std::collections::HashMap<String, Room>) -> String {
        room_codes::generate_unique(&self.config.server.room_code_prefix, |candidate| {
            rooms.contains_key(candidate)
        })
    }

    fn create_room_locked(
        &self,
        rooms: &mut std::collections::HashMap<String, Room>,
        code: String,
        persistent: bool,
    ) -> Result<(), AckError> {
        if rooms.len() >= self.config.server.max_active_rooms {
            return Err(AckError::RoomLimitReached);
        }
        let room = Room::new(
            code.clone(),
            persistent,
            self.config.server.participant_limit,
            self.config.server.room_capacity,
            self.config.server.chat_history_len,
            self.config.quiz.lock_seconds,
        );
        tracing::info!(room_code = %code, persistent, "room created");
        rooms.insert(code, room);
        Ok(())
    }

    /// Insert a player into a room and run all join side effects: admission
    /// classification, serialized-room reply, chat history replay, quiz
    /// late-join snapshot, roster reconciliation.
    fn admit_player(
        self: &Arc<Self>,
        rooms: &mut std::collections::HashMap<String, Room>,
        code: &str,
        id: &PlayerId,
        name: String,
    ) -> Result<crate::protocol::RoomSnapshot, AckError> {
        let owner = self.conn_is_owner(id);
        let room = rooms.get_mut(code).ok_or(AckError::RoomNotFound)?;

        let mut player = Player::new(*id, name.clone(), owner, Instant::now());
        if room.gate.portal_open {
            player.queued_for_admission = true;
        } else if room.quiz.active() {
            // Mid-round arrivals watch from the stands until the next round.
            player.spectator = true;
        } else if room.participant_count() < room.participant_limit {
            player.admitted = true;
        } else {
            player.spectator = true;
        }
        room.insert_player(player)?;

        if let Some(mut conn) = self.connections.get_mut(id) {
            conn.room_code = Some(code.to_string());
            conn.name = name;
        }
        tracing::info!(player_id = %id, room_code = %code, players = room.len(), "player joined");

        let snapshot = room.snapshot();
        self.broadcast_room_update(room);

        let history = room.chat_tail();
        if !history.is_empty() {
            self.send_to(id, Arc::new(ServerMessage::ChatHistory { messages: history }));
        }
        self.send_quiz_snapshot(room, id);
        self.reconcile_after_join(room);
        Ok(snapshot)
    }

    /// Remove a connection from whatever room it is in, with host
    /// succession, room destruction, and quiz reconciliation.
    pub async fn leave_current_room(self: &Arc<Self>, id: &PlayerId) {
        let Some(code) = self.conn_room_code(id) else {
            return;
        };
        let mut rooms = self.rooms.write().await;
        self.leave_room_locked(&mut rooms, &code, id);
    }

    pub(crate) fn leave_room_locked(
        self: &Arc<Self>,
        rooms: &mut std::collections::HashMap<String, Room>,
        code: &str,
        id: &PlayerId,
    ) {
        if let Some(mut conn) = self.connections.get_mut(id) {
            conn.room_code = None;
            conn.delta_caches.remove(code);
        }
        let Some(room) = rooms.get_mut(code) else {
            return;
        };
        let Some((player, host_changed)) = room.remove_player(id) else {
            return;
        };
        tracing::info!(
            player_id = %id,
            room_code = %code,
            players = room.len(),
            host_changed,
            "player left"
        );

        if room.is_empty() && !room.persistent {
            let mut room = match rooms.remove(code) {
                Some(room) => room,
                None => return,
            };
            room.quiz.cancel_timers();
            room.gate.cancel_timer();
            tracing::info!(room_code = %code, "room destroyed");
            return;
        }

        // A host change invalidates a pending auto-start countdown; the
        // reconcile pass below re-announces one when conditions still hold.
        if host_changed && room.quiz.auto_timer.is_armed() {
            room.quiz.auto_timer.cancel();
            room.quiz.auto_starts_at = None;
        }
        self.broadcast_room_update(room);
        self.reconcile_after_leave(room, &player);
    }
}

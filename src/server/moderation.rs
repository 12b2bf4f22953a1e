//! Host claim, kick, chat mute, portal target, and billboard moderation.

use std::sync::Arc;

use serde_json::json;

use super::{AckExtras, ArenaServer};
use crate::protocol::messages::{
    BillboardMediaSetPayload, BillboardUpdatePayload, ClaimHostPayload, KickPlayerPayload,
    PortalSetTargetPayload, SetChatMutedPayload,
};
use crate::protocol::types::BoardTarget;
use crate::protocol::validation::{validate_billboard_media, validate_portal_target};
use crate::protocol::{AckError, PlayerId, ServerMessage};

impl ArenaServer {
    /// `host:claim-host`: requires a valid owner token, either established
    /// at quick-join or presented now. Transfers host and rebroadcasts.
    pub async fn handle_claim_host(
        self: &Arc<Self>,
        id: &PlayerId,
        payload: ClaimHostPayload,
    ) -> Result<AckExtras, AckError> {
        let mut owner = self.conn_is_owner(id);
        if !owner {
            if let Some(key) = payload.owner_key.as_deref() {
                if self.verify_owner_key(key) {
                    owner = true;
                    if let Some(mut conn) = self.connections.get_mut(id) {
                        conn.owner = true;
                    }
                }
            }
        }
        if !owner {
            return Err(AckError::Unauthorized);
        }

        let code = self.conn_room_code(id).ok_or(AckError::NotInRoom)?;
        let mut rooms = self.rooms.write().await;
        let room = rooms.get_mut(&code).ok_or(AckError::RoomNotFound)?;
        if !room.contains(id) {
            return Err(AckError::PlayerNotFound);
        }
        let previous = room.host_id;
        room.host_id = Some(*id);
        if let Some(player) = room.player_mut(id) {
            player.owner_token = true;
        }
        tracing::info!(room_code = %code, new_host = %id, ?previous, "host claimed");
        self.broadcast_room_update(room);
        Ok(AckExtras::new())
    }

    /// `host:kick-player`: host-only, self-target rejected. The target gets
    /// `host:kicked`, leaves the room, and its transport is closed.
    pub async fn handle_kick_player(
        self: &Arc<Self>,
        id: &PlayerId,
        payload: KickPlayerPayload,
    ) -> Result<AckExtras, AckError> {
        let target = payload.target_id.ok_or(AckError::TargetRequired)?;
        if target == *id {
            return Err(AckError::CannotTargetSelf);
        }
        let code = self.conn_room_code(id).ok_or(AckError::NotInRoom)?;
        let mut rooms = self.rooms.write().await;
        let room = rooms.get_mut(&code).ok_or(AckError::RoomNotFound)?;
        if !room.is_host(id) {
            return Err(AckError::HostOnly);
        }
        if !room.contains(&target) {
            return Err(AckError::PlayerNotFound);
        }

        tracing::info!(room_code = %code, kicked = %target, by = %id, "player kicked");
        self.send_to(
            &target,
            Arc::new(ServerMessage::HostKicked {
                reason: "kicked by host".into(),
            }),
        );
        if let Some(mut conn) = self.connections.get_mut(&target) {
            conn.kicked = true;
        }
        self.leave_room_locked(&mut rooms, &code, &target);
        if let Some(conn) = self.connections.get(&target) {
            conn.close.cancel();
        }
        Ok(AckExtras::new())
    }

    /// `host:set-chat-muted`: host-only; the target learns via
    /// `host:chat-muted` and subsequent `chat:send` acks fail.
    pub async fn handle_set_chat_muted(
        &self,
        id: &PlayerId,
        payload: SetChatMutedPayload,
    ) -> Result<AckExtras, AckError> {
        let target = payload.target_id.ok_or(AckError::TargetRequired)?;
        let code = self.conn_room_code(id).ok_or(AckError::NotInRoom)?;
        let mut rooms = self.rooms.write().await;
        let room = rooms.get_mut(&code).ok_or(AckError::RoomNotFound)?;
        if !room.is_host(id) {
            return Err(AckError::HostOnly);
        }
        let player = room.player_mut(&target).ok_or(AckError::PlayerNotFound)?;
        player.chat_muted = payload.muted;
        tracing::info!(room_code = %code, target = %target, muted = payload.muted, "chat mute updated");

        self.send_to(
            &target,
            Arc::new(ServerMessage::HostChatMuted {
                muted: payload.muted,
            }),
        );
        self.broadcast_room_update(room);
        Ok(AckExtras::new())
    }

    /// `portal:set-target`: host-only; http/https only.
    pub async fn handle_portal_set_target(
        &self,
        id: &PlayerId,
        payload: PortalSetTargetPayload,
    ) -> Result<AckExtras, AckError> {
        let code = self.conn_room_code(id).ok_or(AckError::NotInRoom)?;
        let mut rooms = self.rooms.write().await;
        let room = rooms.get_mut(&code).ok_or(AckError::RoomNotFound)?;
        if !room.is_host(id) {
            return Err(AckError::HostOnly);
        }
        let target_url = validate_portal_target(&payload.target_url)?;
        room.portal_target_url = Some(target_url.clone());

        let message = Arc::new(ServerMessage::PortalTargetUpdate {
            target_url: Some(target_url.clone()),
        });
        self.broadcast_room(room, &message, None);

        let mut extras = AckExtras::new();
        extras.insert("targetUrl".into(), json!(target_url));
        Ok(extras)
    }

    /// `billboard:media:set`: host + owner token; validates the board
    /// selector and URL schemes, then broadcasts the channel assignment.
    pub async fn handle_billboard_set(
        &self,
        id: &PlayerId,
        payload: BillboardMediaSetPayload,
    ) -> Result<AckExtras, AckError> {
        let target = match payload.target.trim().to_ascii_lowercase().as_str() {
            "board1" => BoardTarget::Board1,
            "board2" => BoardTarget::Board2,
            _ => return Err(AckError::InvalidBillboardTarget),
        };
        let code = self.conn_room_code(id).ok_or(AckError::NotInRoom)?;
        let mut rooms = self.rooms.write().await;
        let room = rooms.get_mut(&code).ok_or(AckError::RoomNotFound)?;
        if !room.is_host(id) {
            return Err(AckError::HostOnly);
        }
        if !self.conn_is_owner(id) {
            return Err(AckError::Unauthorized);
        }
        validate_billboard_media(&payload.media)?;
        *room.billboard.channel_mut(target) = payload.media.clone();

        let message = Arc::new(ServerMessage::BillboardMediaUpdate(BillboardUpdatePayload {
            target,
            media: payload.media,
        }));
        self.broadcast_room(room, &message, None);
        Ok(AckExtras::new())
    }
}

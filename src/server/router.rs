//! Ingress dispatch: strict message variants to service handlers.

use std::sync::Arc;

use super::ArenaServer;
use crate::protocol::{ClientFrame, ClientMessage, PlayerId};

impl ArenaServer {
    /// Parse and dispatch one inbound text frame. Malformed frames are
    /// logged and dropped; they never take the room down.
    pub async fn handle_frame(self: &Arc<Self>, id: &PlayerId, text: &str) {
        if self.connections.get(id).is_none_or(|c| c.kicked) {
            return;
        }
        let frame = match ClientFrame::parse(text) {
            Ok(frame) => frame,
            Err(err) => {
                tracing::warn!(player_id = %id, error = %err, "dropping malformed frame");
                return;
            }
        };
        let message = match ClientMessage::from_frame(&frame) {
            Ok(message) => message,
            Err(err) => {
                tracing::warn!(
                    player_id = %id,
                    event = err.event_name().unwrap_or("?"),
                    error = %err,
                    "dropping invalid payload"
                );
                return;
            }
        };
        self.dispatch(id, message, frame.ack).await;
    }

    pub async fn dispatch(self: &Arc<Self>, id: &PlayerId, message: ClientMessage, ack: Option<u64>) {
        let result = match message {
            ClientMessage::QuickJoin(payload) => self.handle_quick_join(id, payload).await,
            ClientMessage::CreateRoom(payload) => self.handle_create_room(id, payload).await,
            ClientMessage::JoinRoom(payload) => self.handle_join_room(id, payload).await,
            ClientMessage::LeaveRoom => self.handle_leave_room(id).await,
            ClientMessage::ListRooms => self.handle_list_rooms(id).await,
            ClientMessage::PlayerSync(payload) => self.handle_player_sync(id, payload).await,
            ClientMessage::ChatSend(payload) => self.handle_chat_send(id, payload).await,
            ClientMessage::QuizStart => self.handle_quiz_start(id).await,
            ClientMessage::QuizStop => self.handle_quiz_stop(id).await,
            ClientMessage::QuizNext => self.handle_quiz_next(id).await,
            ClientMessage::QuizPrev => self.handle_quiz_prev(id).await,
            ClientMessage::QuizForceLock => self.handle_quiz_force_lock(id).await,
            ClientMessage::QuizStateRequest => self.handle_quiz_state(id).await,
            ClientMessage::QuizConfigGet => self.handle_quiz_config_get(id).await,
            ClientMessage::QuizConfigSet(payload) => {
                self.handle_quiz_config_set(id, payload).await
            }
            ClientMessage::PortalLobbyOpen => self.handle_portal_open(id).await,
            ClientMessage::PortalLobbyStart => self.handle_portal_start(id).await,
            ClientMessage::PortalSetTarget(payload) => {
                self.handle_portal_set_target(id, payload).await
            }
            ClientMessage::ClaimHost(payload) => self.handle_claim_host(id, payload).await,
            ClientMessage::KickPlayer(payload) => self.handle_kick_player(id, payload).await,
            ClientMessage::SetChatMuted(payload) => {
                self.handle_set_chat_muted(id, payload).await
            }
            ClientMessage::BillboardMediaSet(payload) => {
                self.handle_billboard_set(id, payload).await
            }
        };

        if let Err(err) = &result {
            tracing::debug!(player_id = %id, error = %err, "request refused");
        }
        self.send_ack(id, ack, result);
    }
}

//! Chat fan-out with mute gating and the late-join history ring.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;

use super::{AckExtras, ArenaServer};
use crate::protocol::messages::ChatSendPayload;
use crate::protocol::validation::{sanitize_chat_text, sanitize_player_name};
use crate::protocol::{AckError, ChatEntry, PlayerId, ServerMessage};

impl ArenaServer {
    /// `chat:send`: trim, bound, and fan out to the room. Muted senders get
    /// a `chat:blocked` event alongside the failed ack and nothing fans out.
    pub async fn handle_chat_send(
        &self,
        id: &PlayerId,
        payload: ChatSendPayload,
    ) -> Result<AckExtras, AckError> {
        let code = self.conn_room_code(id).ok_or(AckError::NotInRoom)?;
        let mut rooms = self.rooms.write().await;
        let room = rooms.get_mut(&code).ok_or(AckError::RoomNotFound)?;
        let player = room.player(id).ok_or(AckError::PlayerNotFound)?;

        if player.chat_muted {
            self.send_to(
                id,
                Arc::new(ServerMessage::ChatBlocked {
                    reason: AckError::ChatMuted.as_str().to_string(),
                }),
            );
            return Err(AckError::ChatMuted);
        }

        let text = sanitize_chat_text(&payload.text)?;
        let name = match payload.name.as_deref() {
            Some(requested) => sanitize_player_name(Some(requested)),
            None => player.name.clone(),
        };

        let entry = ChatEntry {
            from: *id,
            name,
            text,
            at: Utc::now().timestamp_millis(),
        };
        room.push_chat(entry.clone());
        let message = Arc::new(ServerMessage::ChatMessage(entry.clone()));
        self.broadcast_room(room, &message, None);

        let mut extras = AckExtras::new();
        extras.insert("at".into(), json!(entry.at));
        Ok(extras)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::protocol::validation::MAX_CHAT_LEN;
    use tokio::sync::mpsc;

    async fn connect(
        server: &Arc<ArenaServer>,
    ) -> (PlayerId, mpsc::Receiver<Arc<ServerMessage>>) {
        let (tx, rx) = mpsc::channel(512);
        let (id, _close) = server.register_client(tx, "127.0.0.1:2200".parse().unwrap());
        (id, rx)
    }

    fn chat(text: &str) -> ChatSendPayload {
        ChatSendPayload {
            name: None,
            text: text.into(),
        }
    }

    async fn drain(rx: &mut mpsc::Receiver<Arc<ServerMessage>>) -> Vec<Arc<ServerMessage>> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    #[tokio::test]
    async fn chat_fans_out_and_lands_in_history() {
        let server = ArenaServer::new(Config::default());
        let (a, mut rx_a) = connect(&server).await;
        let (b, mut rx_b) = connect(&server).await;
        server.handle_join_or_create(&a, "CHAT").await.unwrap();
        server.handle_join_or_create(&b, "CHAT").await.unwrap();
        drain(&mut rx_a).await;
        drain(&mut rx_b).await;

        server.handle_chat_send(&a, chat("  hello arena  ")).await.unwrap();

        for rx in [&mut rx_a, &mut rx_b] {
            let messages = drain(rx).await;
            let found = messages.iter().any(|m| {
                matches!(m.as_ref(), ServerMessage::ChatMessage(entry) if entry.text == "hello arena")
            });
            assert!(found, "chat message missing");
        }

        // A later joiner receives the history replay.
        let (c, mut rx_c) = connect(&server).await;
        server.handle_join_or_create(&c, "CHAT").await.unwrap();
        let messages = drain(&mut rx_c).await;
        let history = messages.iter().find_map(|m| match m.as_ref() {
            ServerMessage::ChatHistory { messages } => Some(messages.clone()),
            _ => None,
        });
        let history = history.expect("chat history missing");
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].text, "hello arena");
    }

    #[tokio::test]
    async fn empty_messages_are_rejected() {
        let server = ArenaServer::new(Config::default());
        let (a, _rx) = connect(&server).await;
        server.handle_join_or_create(&a, "CHAT2").await.unwrap();
        assert_eq!(
            server.handle_chat_send(&a, chat("   ")).await.unwrap_err(),
            AckError::EmptyMessage
        );
    }

    #[tokio::test]
    async fn long_messages_are_truncated() {
        let server = ArenaServer::new(Config::default());
        let (a, mut rx) = connect(&server).await;
        server.handle_join_or_create(&a, "CHAT3").await.unwrap();
        drain(&mut rx).await;

        let long = "x".repeat(600);
        server.handle_chat_send(&a, chat(&long)).await.unwrap();
        let messages = drain(&mut rx).await;
        let entry = messages
            .iter()
            .find_map(|m| match m.as_ref() {
                ServerMessage::ChatMessage(entry) => Some(entry.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(entry.text.chars().count(), MAX_CHAT_LEN);
    }

    #[tokio::test]
    async fn muted_sender_is_blocked() {
        let server = ArenaServer::new(Config::default());
        let (a, mut rx_a) = connect(&server).await;
        let (b, mut rx_b) = connect(&server).await;
        server.handle_join_or_create(&a, "CHAT4").await.unwrap();
        server.handle_join_or_create(&b, "CHAT4").await.unwrap();
        {
            let mut rooms = server.rooms.write().await;
            rooms
                .get_mut("CHAT4")
                .unwrap()
                .player_mut(&b)
                .unwrap()
                .chat_muted = true;
        }
        drain(&mut rx_a).await;
        drain(&mut rx_b).await;

        assert_eq!(
            server.handle_chat_send(&b, chat("psst")).await.unwrap_err(),
            AckError::ChatMuted
        );
        let b_messages = drain(&mut rx_b).await;
        assert!(b_messages
            .iter()
            .any(|m| matches!(m.as_ref(), ServerMessage::ChatBlocked { .. })));
        // Nothing fanned out to the room.
        let a_messages = drain(&mut rx_a).await;
        assert!(!a_messages
            .iter()
            .any(|m| matches!(m.as_ref(), ServerMessage::ChatMessage(_))));
    }
}

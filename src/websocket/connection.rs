use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::protocol::ServerMessage;
use crate::server::ArenaServer;

/// Drive one client socket: a bounded outbound queue drained by a send task,
/// and a receive loop feeding the dispatch router. Either side ending tears
/// the connection down and the registry cleans the room up.
pub(super) async fn handle_socket(socket: WebSocket, server: Arc<ArenaServer>, addr: SocketAddr) {
    let (mut sender, mut receiver) = socket.split();
    let queue_capacity = server.config().server.outbound_queue_len.max(1);
    let (tx, mut rx) = mpsc::channel::<Arc<ServerMessage>>(queue_capacity);

    let (player_id, close) = server.register_client(tx, addr);

    let send_player_id = player_id;
    let send_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let json = match serde_json::to_string(&*message) {
                Ok(json) => json,
                Err(err) => {
                    tracing::error!(player_id = %send_player_id, error = %err, "failed to serialize frame");
                    continue;
                }
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
        let _ = sender.close().await;
    });

    let recv_server = server.clone();
    let recv_close = close.clone();
    let recv_task = tokio::spawn(async move {
        loop {
            let msg = tokio::select! {
                () = recv_close.cancelled() => break,
                msg = receiver.next() => msg,
            };
            match msg {
                Some(Ok(Message::Text(text))) => {
                    recv_server.handle_frame(&player_id, text.as_str()).await;
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {
                    // Binary, ping, pong: nothing to do at this layer.
                }
                Some(Err(err)) => {
                    tracing::warn!(player_id = %player_id, error = %err, "websocket error");
                    break;
                }
            }
        }
    });

    // Whichever half finishes first ends the session.
    tokio::select! {
        _ = send_task => {}
        _ = recv_task => {}
    }
    server.unregister_client(&player_id).await;
}

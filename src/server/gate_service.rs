//! Portal lobby handlers: opening the gate and running admission waves.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use super::{AckExtras, ArenaServer};
use crate::protocol::messages::PortalLobbyAdmittedPayload;
use crate::protocol::{AckError, PlayerId, ServerMessage};

impl ArenaServer {
    /// `portal:lobby-open` (host-only).
    pub async fn handle_portal_open(self: &Arc<Self>, id: &PlayerId) -> Result<AckExtras, AckError> {
        let code = self.conn_room_code(id).ok_or(AckError::NotInRoom)?;
        let mut rooms = self.rooms.write().await;
        let room = rooms.get_mut(&code).ok_or(AckError::RoomNotFound)?;
        if !room.is_host(id) {
            return Err(AckError::HostOnly);
        }
        room.gate_open()?;
        tracing::info!(room_code = %code, "portal opened");
        self.broadcast_room_update(room);
        Ok(AckExtras::new())
    }

    /// `portal:lobby-start` (host-only): select the wave, start the
    /// countdown, and let the admission timer flip it.
    pub async fn handle_portal_start(
        self: &Arc<Self>,
        id: &PlayerId,
    ) -> Result<AckExtras, AckError> {
        let code = self.conn_room_code(id).ok_or(AckError::NotInRoom)?;
        let mut rooms = self.rooms.write().await;
        let room = rooms.get_mut(&code).ok_or(AckError::RoomNotFound)?;
        if !room.is_host(id) {
            return Err(AckError::HostOnly);
        }

        let countdown_ms = self.config.gate.admission_countdown_ms;
        let plan = room.gate_begin_admission(countdown_ms)?;
        tracing::info!(
            room_code = %code,
            admitting = plan.to_admit.len(),
            demoted = plan.demoted.len(),
            countdown_ms,
            "admission countdown started"
        );
        self.broadcast_room_update(room);

        room.gate.bump_generation();
        let token = room.gate.admission_timer.arm();
        let generation = room.gate.generation;
        let server = self.clone();
        let room_code = code.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = token.cancelled() => {}
                () = tokio::time::sleep(Duration::from_millis(countdown_ms)) => {
                    server.on_admission_timer(room_code, generation, countdown_ms).await;
                }
            }
        });

        let mut extras = AckExtras::new();
        extras.insert("admitting".into(), json!(plan.to_admit.len()));
        extras.insert("demoted".into(), json!(plan.demoted.len()));
        extras.insert(
            "admissionStartsAt".into(),
            json!(plan.completes_at.timestamp_millis()),
        );
        Ok(extras)
    }

    async fn on_admission_timer(self: Arc<Self>, code: String, generation: u64, countdown_ms: u64) {
        let mut rooms = self.rooms.write().await;
        let Some(room) = rooms.get_mut(&code) else {
            return;
        };
        if room.gate.generation != generation || !room.gate.admission_in_progress {
            return;
        }
        room.gate.admission_timer.disarm();
        let wave = room.gate_finish_admission();
        tracing::info!(
            room_code = %code,
            admitted = wave.admitted_count,
            spectators = wave.spectator_count,
            "admission completed"
        );

        let message = Arc::new(ServerMessage::PortalLobbyAdmitted(
            PortalLobbyAdmittedPayload {
                admitted_count: wave.admitted_count,
                spectator_count: wave.spectator_count,
                priority_players: wave.priority_players,
                participant_limit: room.participant_limit,
                countdown_ms,
            },
        ));
        self.broadcast_room(room, &message, None);
        self.broadcast_room_update(room);

        // Admission may have unblocked an auto-start.
        if !room.quiz.active() {
            self.maybe_schedule_auto_start(room);
        }
    }
}

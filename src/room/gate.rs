//! Entry gate: the portal-lobby admission controller.
//!
//! The gate bounds simultaneous quiz participants at the room's
//! `participant_limit`. Arrivals while the portal is open queue for
//! admission; `portal:lobby-start` admits the head of the queue and demotes
//! the overflow to spectators who return with priority on the next open.

use chrono::{DateTime, Duration as ChronoDuration, Utc};

use crate::protocol::errors::AckError;
use crate::protocol::types::{GatePublic, PlayerId};
use crate::quiz::TimerHandle;

use super::state::Room;

/// Gate phase state. Membership classes (waiting, admitted, spectator,
/// priority) are derived from player flags on the roster; the gate only owns
/// its own phase and the in-flight admission wave.
#[derive(Debug, Default)]
pub struct EntryGate {
    pub portal_open: bool,
    pub admission_in_progress: bool,
    /// When the running admission countdown completes.
    pub admission_starts_at: Option<DateTime<Utc>>,
    pub opened_at: Option<DateTime<Utc>>,
    pub last_admission_at: Option<DateTime<Utc>>,
    pub admission_timer: TimerHandle,
    /// Players selected for the in-flight admission wave.
    pub pending_admit: Vec<PlayerId>,
    /// Players demoted by the in-flight wave; reported in the admitted event.
    pub pending_demoted: Vec<PlayerId>,
    /// Timer validity epoch, same scheme as the quiz timers.
    pub generation: u64,
}

impl EntryGate {
    pub fn bump_generation(&mut self) -> u64 {
        self.generation = self.generation.wrapping_add(1);
        self.generation
    }

    pub fn cancel_timer(&mut self) {
        self.admission_timer.cancel();
        self.admission_in_progress = false;
        self.admission_starts_at = None;
        self.pending_admit.clear();
        self.pending_demoted.clear();
    }

    pub fn public(&self, room: &Room) -> GatePublic {
        GatePublic {
            portal_open: self.portal_open,
            admission_in_progress: self.admission_in_progress,
            admission_starts_at: self.admission_starts_at.map(|t| t.timestamp_millis()),
            participant_limit: room.participant_limit,
            room_capacity: room.room_capacity,
            waiting_players: room.waiting_count(),
            admitted_players: room.participant_count(),
            spectator_players: room.spectator_count(),
            priority_players: room.priority_count(),
        }
    }
}

/// The selection computed by `portal:lobby-start`.
#[derive(Debug, Clone, PartialEq)]
pub struct AdmissionPlan {
    pub to_admit: Vec<PlayerId>,
    pub demoted: Vec<PlayerId>,
    pub completes_at: DateTime<Utc>,
}

/// Counts reported once an admission wave completes.
#[derive(Debug, Clone, Copy)]
pub struct AdmissionWave {
    pub admitted_count: usize,
    pub spectator_count: usize,
    pub priority_players: usize,
}

impl Room {
    /// `portal:lobby-open`: open the portal and requeue priority returners.
    pub fn gate_open(&mut self) -> Result<(), AckError> {
        if self.gate.portal_open {
            return Err(AckError::LobbyAlreadyOpen);
        }
        if self.gate.admission_in_progress {
            return Err(AckError::AdmissionInProgress);
        }
        self.gate.portal_open = true;
        self.gate.opened_at = Some(Utc::now());
        for player in self.players_mut() {
            if player.priority_for_next_round {
                player.queued_for_admission = true;
            }
        }
        Ok(())
    }

    /// `portal:lobby-start`: select the admission wave and demote overflow.
    /// The returned plan carries the countdown deadline; the caller arms the
    /// admission timer and broadcasts the room update.
    pub fn gate_begin_admission(&mut self, countdown_ms: u64) -> Result<AdmissionPlan, AckError> {
        if !self.gate.portal_open {
            return Err(AckError::LobbyNotOpen);
        }
        if self.gate.admission_in_progress {
            return Err(AckError::AdmissionInProgress);
        }
        let queue = self.waiting_queue();
        if queue.is_empty() {
            return Err(AckError::NoWaitingPlayers);
        }

        let slots = self.participant_limit.saturating_sub(self.participant_count());
        let take = queue.len().min(slots);
        let to_admit: Vec<PlayerId> = queue.iter().take(take).copied().collect();
        let demoted: Vec<PlayerId> = queue.iter().skip(take).copied().collect();

        for id in &demoted {
            if let Some(player) = self.player_mut(id) {
                player.queued_for_admission = false;
                player.admitted = false;
                player.spectator = true;
                player.priority_for_next_round = true;
            }
        }

        let completes_at = Utc::now()
            + ChronoDuration::milliseconds(i64::try_from(countdown_ms).unwrap_or(i64::MAX));
        self.gate.admission_in_progress = true;
        self.gate.admission_starts_at = Some(completes_at);
        self.gate.pending_admit = to_admit.clone();
        self.gate.pending_demoted = demoted.clone();

        Ok(AdmissionPlan {
            to_admit,
            demoted,
            completes_at,
        })
    }

    /// Admission countdown expired: flip the wave to admitted and close the
    /// portal. Players who left mid-countdown are skipped.
    pub fn gate_finish_admission(&mut self) -> AdmissionWave {
        let pending = std::mem::take(&mut self.gate.pending_admit);
        let demoted = std::mem::take(&mut self.gate.pending_demoted);

        let mut admitted_count = 0usize;
        for id in &pending {
            if let Some(player) = self.player_mut(id) {
                player.admitted = true;
                player.queued_for_admission = false;
                player.spectator = false;
                player.priority_for_next_round = false;
                admitted_count += 1;
            }
        }
        let spectator_count = demoted
            .iter()
            .filter(|id| self.player(id).is_some())
            .count();

        self.gate.portal_open = false;
        self.gate.admission_in_progress = false;
        self.gate.admission_starts_at = None;
        self.gate.last_admission_at = Some(Utc::now());

        AdmissionWave {
            admitted_count,
            spectator_count,
            priority_players: spectator_count,
        }
    }
}

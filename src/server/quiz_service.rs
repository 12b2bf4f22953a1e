//! Quiz command handlers, timer callbacks, and round orchestration.
//!
//! All transitions run under the room guard. Timers are cancellable handles
//! owned by the quiz state; callbacks re-check the room, phase, and timer
//! generation before acting, so a cancelled or superseded timer is a no-op.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use serde_json::json;

use super::{AckExtras, ArenaServer};
use crate::protocol::messages::{
    QuestionConfigEntry, QuizAutoCountdownPayload, QuizConfigPayload, QuizConfigSetPayload,
    QuizEndPayload, QuizQuestionPayload, QuizScorePayload, QuizStartPayload, ScoreEntry,
};
use crate::protocol::{AckError, PlayerId, QuizPhase, ServerMessage};
use crate::quiz::{self, fallback_bank, sanitize_questions, JudgeInput};
use crate::room::{Player, Room};

/// Round end reasons on the wire.
pub const END_WINNER: &str = "winner";
pub const END_COMPLETED: &str = "completed";
pub const END_STOPPED: &str = "stopped";
pub const END_PLAYER_LEFT: &str = "player-left";

impl ArenaServer {
    // -----------------------------------------------------------------
    // Command handlers
    // -----------------------------------------------------------------

    pub async fn handle_quiz_start(self: &Arc<Self>, id: &PlayerId) -> Result<AckExtras, AckError> {
        let code = self.conn_room_code(id).ok_or(AckError::NotInRoom)?;
        let mut rooms = self.rooms.write().await;
        let room = rooms.get_mut(&code).ok_or(AckError::RoomNotFound)?;
        if !room.is_host(id) {
            return Err(AckError::HostOnly);
        }
        self.start_quiz(room)?;
        Ok(AckExtras::new())
    }

    pub async fn handle_quiz_stop(self: &Arc<Self>, id: &PlayerId) -> Result<AckExtras, AckError> {
        let code = self.conn_room_code(id).ok_or(AckError::NotInRoom)?;
        let mut rooms = self.rooms.write().await;
        let room = rooms.get_mut(&code).ok_or(AckError::RoomNotFound)?;
        if !room.is_host(id) {
            return Err(AckError::HostOnly);
        }
        if !room.quiz.active() {
            return Err(AckError::QuizNotActive);
        }
        self.finish_quiz(room, END_STOPPED);
        Ok(AckExtras::new())
    }

    pub async fn handle_quiz_next(self: &Arc<Self>, id: &PlayerId) -> Result<AckExtras, AckError> {
        let code = self.conn_room_code(id).ok_or(AckError::NotInRoom)?;
        let mut rooms = self.rooms.write().await;
        let room = rooms.get_mut(&code).ok_or(AckError::RoomNotFound)?;
        if !room.is_host(id) {
            return Err(AckError::HostOnly);
        }
        if !room.quiz.active() {
            return Err(AckError::QuizNotActive);
        }
        match room.quiz.phase {
            QuizPhase::Question | QuizPhase::Lock => Err(AckError::QuestionAlreadyOpen),
            QuizPhase::Start | QuizPhase::Result | QuizPhase::WaitingNext => {
                let next = usize::try_from(room.quiz.question_index + 1)
                    .map_err(|_| AckError::NoMoreQuestions)?;
                if next >= room.quiz.total_questions() {
                    return Err(AckError::NoMoreQuestions);
                }
                self.open_question(room, next);
                Ok(AckExtras::new())
            }
            _ => Err(AckError::QuizNotActive),
        }
    }

    pub async fn handle_quiz_prev(self: &Arc<Self>, id: &PlayerId) -> Result<AckExtras, AckError> {
        let code = self.conn_room_code(id).ok_or(AckError::NotInRoom)?;
        let mut rooms = self.rooms.write().await;
        let room = rooms.get_mut(&code).ok_or(AckError::RoomNotFound)?;
        if !room.is_host(id) {
            return Err(AckError::HostOnly);
        }
        if !room.quiz.active() {
            return Err(AckError::QuizNotActive);
        }
        if room.quiz.question_index <= 0 {
            return Err(AckError::NoPreviousQuestion);
        }
        let prev = (room.quiz.question_index - 1) as usize;
        self.open_question(room, prev);
        Ok(AckExtras::new())
    }

    pub async fn handle_quiz_force_lock(
        self: &Arc<Self>,
        id: &PlayerId,
    ) -> Result<AckExtras, AckError> {
        let code = self.conn_room_code(id).ok_or(AckError::NotInRoom)?;
        let mut rooms = self.rooms.write().await;
        let room = rooms.get_mut(&code).ok_or(AckError::RoomNotFound)?;
        if !room.is_host(id) {
            return Err(AckError::HostOnly);
        }
        if !room.quiz.active() {
            return Err(AckError::QuizNotActive);
        }
        if room.quiz.phase != QuizPhase::Question {
            return Err(AckError::QuestionNotOpen);
        }
        self.lock_and_judge(room);
        Ok(AckExtras::new())
    }

    pub async fn handle_quiz_state(&self, id: &PlayerId) -> Result<AckExtras, AckError> {
        let code = self.conn_room_code(id).ok_or(AckError::NotInRoom)?;
        let rooms = self.rooms.read().await;
        let room = rooms.get(&code).ok_or(AckError::RoomNotFound)?;
        let mut extras = AckExtras::new();
        extras.insert("quiz".into(), json!(room.quiz.public()));
        extras.insert("score".into(), json!(self.score_payload(room)));
        if let Some(result) = &room.quiz.last_result {
            extras.insert("lastResult".into(), json!(result));
        }
        Ok(extras)
    }

    pub async fn handle_quiz_config_get(&self, id: &PlayerId) -> Result<AckExtras, AckError> {
        let code = self.conn_room_code(id).ok_or(AckError::NotInRoom)?;
        let rooms = self.rooms.read().await;
        let room = rooms.get(&code).ok_or(AckError::RoomNotFound)?;
        if !room.is_host(id) {
            return Err(AckError::HostOnly);
        }
        if !self.conn_is_owner(id) {
            return Err(AckError::Unauthorized);
        }
        let config = self.quiz_config_payload(room);
        self.send_to(id, Arc::new(ServerMessage::QuizConfig(Box::new(config.clone()))));
        let mut extras = AckExtras::new();
        extras.insert("config".into(), json!(config));
        Ok(extras)
    }

    pub async fn handle_quiz_config_set(
        self: &Arc<Self>,
        id: &PlayerId,
        payload: QuizConfigSetPayload,
    ) -> Result<AckExtras, AckError> {
        let code = self.conn_room_code(id).ok_or(AckError::NotInRoom)?;
        let mut rooms = self.rooms.write().await;
        let room = rooms.get_mut(&code).ok_or(AckError::RoomNotFound)?;
        if !room.is_host(id) {
            return Err(AckError::HostOnly);
        }
        if !self.conn_is_owner(id) {
            return Err(AckError::Unauthorized);
        }

        if !payload.questions.is_empty() {
            let sanitized = sanitize_questions(&payload.questions, self.config.quiz.max_questions);
            if sanitized.is_empty() {
                return Err(AckError::InvalidQuestionConfig);
            }
            room.quiz.configured_questions = sanitized;
        }
        if let Some(lock_seconds) = payload.lock_seconds {
            room.quiz.lock_seconds = self.config.quiz.clamp_lock_seconds(lock_seconds);
        }
        if let Some(auto_finish) = payload.auto_finish {
            room.quiz.auto_finish = auto_finish;
        }
        if let Some(auto_mode) = payload.auto_mode {
            room.quiz.auto_mode = auto_mode;
            if auto_mode {
                self.maybe_schedule_auto_start(room);
            } else {
                room.quiz.auto_timer.cancel();
                room.quiz.auto_starts_at = None;
            }
        }

        let config = self.quiz_config_payload(room);
        self.send_to(id, Arc::new(ServerMessage::QuizConfig(Box::new(config.clone()))));
        let mut extras = AckExtras::new();
        extras.insert("config".into(), json!(config));
        Ok(extras)
    }

    // -----------------------------------------------------------------
    // Transitions (room guard held)
    // -----------------------------------------------------------------

    /// idle/ended → start. Promotes pending arrivals into the participant
    /// pool, resets the round, and schedules the first question.
    pub(crate) fn start_quiz(self: &Arc<Self>, room: &mut Room) -> Result<(), AckError> {
        if room.quiz.active() {
            return Err(AckError::QuizAlreadyActive);
        }
        if room.gate.admission_in_progress
            || (room.gate.portal_open && room.waiting_count() > 0)
        {
            return Err(AckError::PlayersWaitingAdmission);
        }

        self.promote_pending_players(room);
        if room.participant_count() == 0 {
            return Err(AckError::NoPlayablePlayers);
        }

        room.quiz.bump_generation();
        room.quiz.questions = if room.quiz.configured_questions.is_empty() {
            fallback_bank()
        } else {
            room.quiz.configured_questions.clone()
        };
        room.quiz.phase = QuizPhase::Start;
        room.quiz.started_at = Some(Utc::now());
        room.quiz.ended_at = None;
        room.quiz.end_reason = None;
        room.quiz.question_index = -1;
        room.quiz.last_result = None;
        room.quiz.auto_timer.cancel();
        room.quiz.auto_starts_at = None;

        for player in room.players_mut() {
            if player.is_participant() {
                player.alive = true;
            } else {
                player.alive = false;
            }
            player.score = 0;
            player.last_choice = None;
            player.last_choice_reason = None;
        }

        tracing::info!(
            room_code = %room.code,
            questions = room.quiz.total_questions(),
            participants = room.participant_count(),
            "quiz started"
        );
        let start = Arc::new(ServerMessage::QuizStart(self.quiz_start_payload(room)));
        self.broadcast_room(room, &start, None);
        self.broadcast_score(room);
        self.broadcast_room_update(room);

        self.arm_advance_timer(room, Duration::from_millis(self.config.quiz.prepare_delay_ms), 0);
        Ok(())
    }

    /// start/result/waiting-next → question.
    pub(crate) fn open_question(self: &Arc<Self>, room: &mut Room, index: usize) {
        if index >= room.quiz.total_questions() {
            self.finish_quiz(room, END_COMPLETED);
            return;
        }
        room.quiz.bump_generation();
        room.quiz.next_timer.cancel();
        room.quiz.phase = QuizPhase::Question;
        room.quiz.question_index = index as i32;
        let lock_in = ChronoDuration::seconds(i64::from(room.quiz.lock_seconds));
        room.quiz.lock_at = Some(Utc::now() + lock_in);

        let Some(question) = room.quiz.current_question() else {
            self.finish_quiz(room, END_COMPLETED);
            return;
        };
        let payload = QuizQuestionPayload {
            index: room.quiz.wire_index(),
            total: room.quiz.total_questions(),
            id: question.id.clone(),
            text: question.text.clone(),
            lock_seconds: room.quiz.lock_seconds,
            lock_at: room.quiz.lock_at.map_or(0, |t| t.timestamp_millis()),
        };
        tracing::debug!(room_code = %room.code, index = payload.index, "question opened");
        let message = Arc::new(ServerMessage::QuizQuestion(payload));
        self.broadcast_room(room, &message, None);

        self.arm_lock_timer(room, Duration::from_secs(u64::from(room.quiz.lock_seconds)));
    }

    /// question → lock → result, judging every alive participant by zone.
    pub(crate) fn lock_and_judge(self: &Arc<Self>, room: &mut Room) {
        room.quiz.bump_generation();
        room.quiz.lock_timer.cancel();
        room.quiz.lock_at = None;
        room.quiz.phase = QuizPhase::Lock;
        let wire_index = room.quiz.wire_index();
        let lock = Arc::new(ServerMessage::QuizLock { index: wire_index });
        self.broadcast_room(room, &lock, None);

        let Some(question) = room.quiz.current_question().cloned() else {
            self.finish_quiz(room, END_COMPLETED);
            return;
        };

        let host_id = room.host_id;
        let inputs: Vec<JudgeInput> = room
            .players_ordered()
            .filter(|p| p.alive && p.is_participant())
            .map(|p| JudgeInput {
                id: p.id,
                x: p.pose.x,
                z: p.pose.z,
                exempt: host_id == Some(p.id),
            })
            .collect();

        let outcome = quiz::judge_lock(&inputs, &question, &self.zones, wire_index);
        for verdict in &outcome.verdicts {
            if let Some(player) = room.player_mut(&verdict.id) {
                player.last_choice = verdict.choice;
                player.last_choice_reason = verdict.reason;
                if verdict.correct {
                    player.score += 1;
                }
                if verdict.eliminated {
                    player.alive = false;
                }
            }
        }

        room.quiz.phase = QuizPhase::Result;
        room.quiz.last_result = Some(outcome.result.clone());
        tracing::info!(
            room_code = %room.code,
            index = wire_index,
            survivors = outcome.result.survivor_count,
            eliminated = outcome.result.eliminated_player_ids.len(),
            "question judged"
        );
        let result = Arc::new(ServerMessage::QuizResult(Box::new(outcome.result)));
        self.broadcast_room(room, &result, None);
        self.broadcast_score(room);

        let survivors = room.survivor_count();
        if room.quiz.auto_finish && survivors <= 1 {
            self.finish_quiz(room, END_WINNER);
        } else if wire_index >= room.quiz.total_questions() {
            self.finish_quiz(room, END_COMPLETED);
        } else {
            room.quiz.bump_generation();
            room.quiz.phase = QuizPhase::WaitingNext;
            let delay = self
                .config
                .quiz
                .clamp_next_delay(self.config.quiz.next_delay_ms);
            self.arm_advance_timer(
                room,
                Duration::from_millis(delay),
                (room.quiz.question_index + 1) as usize,
            );
        }
    }

    /// any active → ended.
    pub(crate) fn finish_quiz(self: &Arc<Self>, room: &mut Room, reason: &str) {
        room.quiz.bump_generation();
        room.quiz.lock_timer.cancel();
        room.quiz.next_timer.cancel();
        room.quiz.lock_at = None;
        room.quiz.phase = QuizPhase::Ended;
        room.quiz.ended_at = Some(Utc::now());
        room.quiz.end_reason = Some(reason.to_string());

        let survivors: Vec<&Player> = room
            .players_ordered()
            .filter(|p| p.alive && p.is_participant())
            .collect();
        let payload = QuizEndPayload {
            reason: reason.to_string(),
            survivor_count: survivors.len(),
            winner_id: (survivors.len() == 1).then(|| survivors[0].id),
        };
        tracing::info!(room_code = %room.code, reason, survivors = payload.survivor_count, "quiz ended");
        let message = Arc::new(ServerMessage::QuizEnd(payload));
        self.broadcast_room(room, &message, None);
        self.broadcast_score(room);
        self.broadcast_room_update(room);

        if room.quiz.auto_mode {
            self.arm_auto_restart_timer(
                room,
                Duration::from_millis(self.config.quiz.auto_restart_delay_ms),
            );
        }
    }

    /// With auto mode on and preconditions met, schedule the countdown and
    /// announce it.
    pub(crate) fn maybe_schedule_auto_start(self: &Arc<Self>, room: &mut Room) {
        if !room.quiz.auto_mode
            || room.quiz.phase != QuizPhase::Idle
            || room.quiz.auto_timer.is_armed()
        {
            return;
        }
        if room.gate.admission_in_progress
            || (room.gate.portal_open && room.waiting_count() > 0)
        {
            return;
        }
        let eligible = room
            .players_ordered()
            .filter(|p| !p.queued_for_admission)
            .count();
        if eligible < self.config.quiz.min_players {
            return;
        }

        let delay_ms = self.config.quiz.auto_start_delay_ms;
        let starts_at = Utc::now()
            + ChronoDuration::milliseconds(i64::try_from(delay_ms).unwrap_or(i64::MAX));
        room.quiz.auto_starts_at = Some(starts_at);

        let payload = QuizAutoCountdownPayload {
            starts_at: starts_at.timestamp_millis(),
            delay_ms,
            players: eligible,
            min_players: self.config.quiz.min_players,
        };
        tracing::debug!(room_code = %room.code, delay_ms, players = eligible, "auto-start scheduled");
        let message = Arc::new(ServerMessage::QuizAutoCountdown(payload));
        self.broadcast_room(room, &message, None);

        let token = room.quiz.auto_timer.arm();
        let generation = room.quiz.generation;
        let server = self.clone();
        let code = room.code.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = token.cancelled() => {}
                () = tokio::time::sleep(Duration::from_millis(delay_ms)) => {
                    server.on_auto_start_timer(code, generation).await;
                }
            }
        });
    }

    // -----------------------------------------------------------------
    // Roster reconciliation and late-join snapshots
    // -----------------------------------------------------------------

    pub(crate) fn reconcile_after_join(self: &Arc<Self>, room: &mut Room) {
        if !room.quiz.active() {
            self.broadcast_score(room);
            self.maybe_schedule_auto_start(room);
        }
    }

    pub(crate) fn reconcile_after_leave(self: &Arc<Self>, room: &mut Room, left: &Player) {
        if room.quiz.active() {
            // A departure can collapse the round.
            if left.alive && left.is_participant() && room.survivor_count() <= 1 {
                self.finish_quiz(room, END_PLAYER_LEFT);
            } else {
                self.broadcast_score(room);
            }
        } else {
            self.broadcast_score(room);
            self.maybe_schedule_auto_start(room);
        }
    }

    /// Replay enough quiz events for a late joiner to rebuild its UI.
    pub(crate) fn send_quiz_snapshot(&self, room: &Room, id: &PlayerId) {
        if let Some(starts_at) = room.quiz.auto_starts_at {
            let eligible = room
                .players_ordered()
                .filter(|p| !p.queued_for_admission)
                .count();
            let remaining = (starts_at - Utc::now()).num_milliseconds().max(0) as u64;
            self.send_to(
                id,
                Arc::new(ServerMessage::QuizAutoCountdown(QuizAutoCountdownPayload {
                    starts_at: starts_at.timestamp_millis(),
                    delay_ms: remaining,
                    players: eligible,
                    min_players: self.config.quiz.min_players,
                })),
            );
        }
        if !room.quiz.active() && room.quiz.phase != QuizPhase::Ended {
            return;
        }
        self.send_to(
            id,
            Arc::new(ServerMessage::QuizStart(self.quiz_start_payload(room))),
        );
        if room.quiz.phase == QuizPhase::Question {
            if let Some(question) = room.quiz.current_question() {
                self.send_to(
                    id,
                    Arc::new(ServerMessage::QuizQuestion(QuizQuestionPayload {
                        index: room.quiz.wire_index(),
                        total: room.quiz.total_questions(),
                        id: question.id.clone(),
                        text: question.text.clone(),
                        lock_seconds: room.quiz.lock_seconds,
                        lock_at: room.quiz.lock_at.map_or(0, |t| t.timestamp_millis()),
                    })),
                );
            }
        }
        if let Some(result) = &room.quiz.last_result {
            self.send_to(
                id,
                Arc::new(ServerMessage::QuizResult(Box::new(result.clone()))),
            );
        }
        self.send_to(
            id,
            Arc::new(ServerMessage::QuizScore(Box::new(self.score_payload(room)))),
        );
        if room.quiz.phase == QuizPhase::Ended {
            let survivors: Vec<&Player> = room
                .players_ordered()
                .filter(|p| p.alive && p.is_participant())
                .collect();
            self.send_to(
                id,
                Arc::new(ServerMessage::QuizEnd(QuizEndPayload {
                    reason: room
                        .quiz
                        .end_reason
                        .clone()
                        .unwrap_or_else(|| END_COMPLETED.to_string()),
                    survivor_count: survivors.len(),
                    winner_id: (survivors.len() == 1).then(|| survivors[0].id),
                })),
            );
        }
    }

    pub(crate) fn broadcast_score(&self, room: &Room) {
        let message = Arc::new(ServerMessage::QuizScore(Box::new(self.score_payload(room))));
        self.broadcast_room(room, &message, None);
    }

    fn score_payload(&self, room: &Room) -> QuizScorePayload {
        let mut leaderboard: Vec<ScoreEntry> = room
            .players_ordered()
            .filter(|p| p.is_participant() || p.score > 0)
            .map(|p| ScoreEntry {
                id: p.id,
                name: p.name.clone(),
                score: p.score,
                alive: p.alive,
            })
            .collect();
        quiz::sort_leaderboard(&mut leaderboard);
        QuizScorePayload {
            active: room.quiz.active(),
            phase: room.quiz.phase,
            survivors: room.survivor_count(),
            question_index: room.quiz.question_index,
            total_questions: room.quiz.total_questions(),
            leaderboard,
        }
    }

    fn quiz_start_payload(&self, room: &Room) -> QuizStartPayload {
        QuizStartPayload {
            total_questions: room.quiz.total_questions(),
            started_at: room
                .quiz
                .started_at
                .map_or(0, |t| t.timestamp_millis()),
            lock_seconds: room.quiz.lock_seconds,
        }
    }

    fn quiz_config_payload(&self, room: &Room) -> QuizConfigPayload {
        QuizConfigPayload {
            questions: room
                .quiz
                .configured_questions
                .iter()
                .map(|q| QuestionConfigEntry {
                    id: q.id.clone(),
                    text: q.text.clone(),
                    answer: q.answer,
                })
                .collect(),
            lock_seconds: room.quiz.lock_seconds,
            auto_mode: room.quiz.auto_mode,
            auto_finish: room.quiz.auto_finish,
        }
    }

    /// Admit arrivals that joined outside a gate ceremony, priority
    /// returners first, up to the participant limit.
    fn promote_pending_players(&self, room: &mut Room) {
        let mut open_slots = room
            .participant_limit
            .saturating_sub(room.participant_count());
        if open_slots == 0 {
            return;
        }
        let mut candidates: Vec<PlayerId> = room
            .players_ordered()
            .filter(|p| !p.admitted && !p.queued_for_admission)
            .map(|p| p.id)
            .collect();
        candidates.sort_by_key(|id| {
            !room
                .player(id)
                .is_some_and(|p| p.priority_for_next_round)
        });
        for id in candidates {
            if open_slots == 0 {
                break;
            }
            if let Some(player) = room.player_mut(&id) {
                player.admitted = true;
                player.spectator = false;
                player.priority_for_next_round = false;
                open_slots -= 1;
            }
        }
    }

    // -----------------------------------------------------------------
    // Timer plumbing
    // -----------------------------------------------------------------

    fn arm_advance_timer(self: &Arc<Self>, room: &mut Room, delay: Duration, next_index: usize) {
        let token = room.quiz.next_timer.arm();
        let generation = room.quiz.generation;
        let server = self.clone();
        let code = room.code.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = token.cancelled() => {}
                () = tokio::time::sleep(delay) => {
                    server.on_advance_timer(code, generation, next_index).await;
                }
            }
        });
    }

    fn arm_lock_timer(self: &Arc<Self>, room: &mut Room, delay: Duration) {
        let token = room.quiz.lock_timer.arm();
        let generation = room.quiz.generation;
        let server = self.clone();
        let code = room.code.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = token.cancelled() => {}
                () = tokio::time::sleep(delay) => {
                    server.on_lock_timer(code, generation).await;
                }
            }
        });
    }

    fn arm_auto_restart_timer(self: &Arc<Self>, room: &mut Room, delay: Duration) {
        let token = room.quiz.auto_timer.arm();
        let generation = room.quiz.generation;
        let server = self.clone();
        let code = room.code.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = token.cancelled() => {}
                () = tokio::time::sleep(delay) => {
                    server.on_auto_restart_timer(code, generation).await;
                }
            }
        });
    }

    async fn on_advance_timer(self: Arc<Self>, code: String, generation: u64, next_index: usize) {
        let mut rooms = self.rooms.write().await;
        let Some(room) = rooms.get_mut(&code) else {
            return;
        };
        if room.quiz.generation != generation {
            return;
        }
        if !matches!(
            room.quiz.phase,
            QuizPhase::Start | QuizPhase::WaitingNext
        ) {
            return;
        }
        room.quiz.next_timer.disarm();
        self.open_question(room, next_index);
    }

    async fn on_lock_timer(self: Arc<Self>, code: String, generation: u64) {
        let mut rooms = self.rooms.write().await;
        let Some(room) = rooms.get_mut(&code) else {
            return;
        };
        if room.quiz.generation != generation || room.quiz.phase != QuizPhase::Question {
            return;
        }
        room.quiz.lock_timer.disarm();
        self.lock_and_judge(room);
    }

    async fn on_auto_start_timer(self: Arc<Self>, code: String, generation: u64) {
        let mut rooms = self.rooms.write().await;
        let Some(room) = rooms.get_mut(&code) else {
            return;
        };
        if room.quiz.generation != generation || room.quiz.phase != QuizPhase::Idle {
            return;
        }
        room.quiz.auto_timer.disarm();
        room.quiz.auto_starts_at = None;
        if let Err(err) = self.start_quiz(room) {
            tracing::debug!(room_code = %code, error = %err, "auto-start deferred");
            self.maybe_schedule_auto_start(room);
        }
    }

    async fn on_auto_restart_timer(self: Arc<Self>, code: String, generation: u64) {
        let mut rooms = self.rooms.write().await;
        let Some(room) = rooms.get_mut(&code) else {
            return;
        };
        if room.quiz.generation != generation || room.quiz.phase != QuizPhase::Ended {
            return;
        }
        room.quiz.bump_generation();
        room.quiz.auto_timer.disarm();
        room.quiz.phase = QuizPhase::Idle;
        room.quiz.question_index = -1;
        self.broadcast_room_update(room);
        self.maybe_schedule_auto_start(room);
    }
}

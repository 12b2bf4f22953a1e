//! Quiz state machine data and pure transition logic.
//!
//! The timer-driven orchestration (broadcasts, scheduling) lives in the
//! server layer; this module owns the per-room state, the cancellable timer
//! handles, and the zone-based judging that turns positions into results.

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use super::questions::Question;
use super::zones::{ZoneLayout, ZoneVerdict};
use crate::protocol::messages::{EliminatedEntry, QuizResultPayload, ScoreEntry};
use crate::protocol::types::{Answer, ChoiceReason, PlayerId, QuizPhase, QuizPublic};

/// A cancellable timer slot. Arming returns a fresh token for the spawned
/// sleeper; re-arming or cancelling invalidates the previous sleeper.
#[derive(Debug, Default)]
pub struct TimerHandle(Option<CancellationToken>);

impl TimerHandle {
    pub fn arm(&mut self) -> CancellationToken {
        self.cancel();
        let token = CancellationToken::new();
        self.0 = Some(token.clone());
        token
    }

    pub fn cancel(&mut self) {
        if let Some(token) = self.0.take() {
            token.cancel();
        }
    }

    pub fn is_armed(&self) -> bool {
        self.0.is_some()
    }

    /// Drop the slot without cancelling; used once a timer has fired.
    pub fn disarm(&mut self) {
        self.0 = None;
    }
}

/// Per-room quiz state.
#[derive(Debug, Default)]
pub struct QuizState {
    pub phase: QuizPhase,
    pub auto_mode: bool,
    pub auto_finish: bool,
    pub auto_starts_at: Option<DateTime<Utc>>,
    pub auto_timer: TimerHandle,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    /// −1 before the first question opens.
    pub question_index: i32,
    pub questions: Vec<Question>,
    /// Host-configured bank; empty means the fallback bank is used at start.
    pub configured_questions: Vec<Question>,
    pub lock_seconds: u32,
    pub lock_at: Option<DateTime<Utc>>,
    pub lock_timer: TimerHandle,
    pub next_timer: TimerHandle,
    pub last_result: Option<QuizResultPayload>,
    /// Why the last round ended; replayed to late joiners in `quiz:end`.
    pub end_reason: Option<String>,
    /// Timer validity epoch: bumped on every transition so stale timer
    /// callbacks recognize themselves and bail out.
    pub generation: u64,
}

impl QuizState {
    pub fn new(auto_mode: bool, lock_seconds: u32) -> Self {
        Self {
            auto_mode,
            auto_finish: true,
            question_index: -1,
            lock_seconds,
            ..Self::default()
        }
    }

    pub fn active(&self) -> bool {
        self.phase.is_active()
    }

    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    pub fn current_question(&self) -> Option<&Question> {
        usize::try_from(self.question_index)
            .ok()
            .and_then(|i| self.questions.get(i))
    }

    /// 1-based question number for the wire.
    pub fn wire_index(&self) -> usize {
        (self.question_index.max(0) as usize) + 1
    }

    pub fn bump_generation(&mut self) -> u64 {
        self.generation = self.generation.wrapping_add(1);
        self.generation
    }

    pub fn cancel_timers(&mut self) {
        self.auto_timer.cancel();
        self.lock_timer.cancel();
        self.next_timer.cancel();
        self.auto_starts_at = None;
        self.lock_at = None;
    }

    pub fn public(&self) -> QuizPublic {
        QuizPublic {
            active: self.active(),
            phase: self.phase,
            auto_mode: self.auto_mode,
            auto_starts_at: self.auto_starts_at.map(|t| t.timestamp_millis()),
            question_index: self.question_index,
            total_questions: self.total_questions(),
            lock_seconds: self.lock_seconds,
            lock_at: self.lock_at.map(|t| t.timestamp_millis()),
        }
    }
}

/// One participant as seen by the judge.
#[derive(Debug, Clone)]
pub struct JudgeInput {
    pub id: PlayerId,
    pub x: f64,
    pub z: f64,
    /// Hosts are judged for score but never eliminated.
    pub exempt: bool,
}

/// Judge verdict for one participant, to be applied to the roster.
#[derive(Debug, Clone, Copy)]
pub struct PlayerVerdict {
    pub id: PlayerId,
    pub choice: Option<Answer>,
    pub reason: Option<ChoiceReason>,
    pub correct: bool,
    pub eliminated: bool,
}

#[derive(Debug, Clone)]
pub struct JudgeOutcome {
    pub result: QuizResultPayload,
    pub verdicts: Vec<PlayerVerdict>,
}

/// Judge all alive participants against the current question. Pure: the same
/// zones, question, and positions always produce the same outcome.
pub fn judge_lock(
    inputs: &[JudgeInput],
    question: &Question,
    layout: &ZoneLayout,
    wire_index: usize,
) -> JudgeOutcome {
    let mut verdicts = Vec::with_capacity(inputs.len());
    let mut correct_ids = Vec::new();
    let mut eliminated_ids = Vec::new();
    let mut eliminated_players = Vec::new();
    let mut survivor_count = 0usize;

    for input in inputs {
        let verdict = layout.resolve(input.x, input.z);
        let choice = verdict.choice();
        let reason = verdict.reason();
        let correct = matches!(verdict, ZoneVerdict::Choice(answer) if answer == question.answer);
        let eliminated = !correct && !input.exempt;

        if correct {
            correct_ids.push(input.id);
        }
        if eliminated {
            eliminated_ids.push(input.id);
            eliminated_players.push(EliminatedEntry {
                id: input.id,
                choice,
                reason,
                x: input.x,
                z: input.z,
            });
        } else {
            survivor_count += 1;
        }

        verdicts.push(PlayerVerdict {
            id: input.id,
            choice,
            reason,
            correct,
            eliminated,
        });
    }

    JudgeOutcome {
        result: QuizResultPayload {
            answer: question.answer,
            index: wire_index,
            survivor_count,
            correct_player_ids: correct_ids,
            eliminated_player_ids: eliminated_ids,
            eliminated_players,
        },
        verdicts,
    }
}

/// Leaderboard ordering: score desc, alive desc, name asc.
pub fn sort_leaderboard(entries: &mut [ScoreEntry]) {
    entries.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then(b.alive.cmp(&a.alive))
            .then_with(|| a.name.cmp(&b.name))
    });
}

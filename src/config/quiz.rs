//! Quiz engine and entry-gate tuning.

use super::defaults::{
    default_admission_countdown_ms, default_auto_restart_delay_ms, default_auto_start_delay_ms,
    default_lock_seconds, default_max_lock_seconds, default_max_questions,
    default_min_lock_seconds, default_min_next_delay_ms, default_next_delay_ms,
    default_prepare_delay_ms, default_quiz_min_players,
};
use serde::{Deserialize, Serialize};

/// Quiz state machine timing and limits.
#[derive(Debug, Deserialize, Serialize, Clone, Copy)]
pub struct QuizTuning {
    /// Default per-question answer window (seconds)
    #[serde(default = "default_lock_seconds")]
    pub lock_seconds: u32,
    #[serde(default = "default_min_lock_seconds")]
    pub min_lock_seconds: u32,
    #[serde(default = "default_max_lock_seconds")]
    pub max_lock_seconds: u32,
    /// Delay between `quiz:start` and the first question
    #[serde(default = "default_prepare_delay_ms")]
    pub prepare_delay_ms: u64,
    /// Delay between a result and the next question
    #[serde(default = "default_next_delay_ms")]
    pub next_delay_ms: u64,
    #[serde(default = "default_min_next_delay_ms")]
    pub min_next_delay_ms: u64,
    /// Minimum auto-start countdown once preconditions hold
    #[serde(default = "default_auto_start_delay_ms")]
    pub auto_start_delay_ms: u64,
    /// Pause after an auto-mode round ends before the next countdown
    #[serde(default = "default_auto_restart_delay_ms")]
    pub auto_restart_delay_ms: u64,
    /// Minimum participants required for auto-start
    #[serde(default = "default_quiz_min_players")]
    pub min_players: usize,
    /// Question bank size cap
    #[serde(default = "default_max_questions")]
    pub max_questions: usize,
}

impl QuizTuning {
    pub fn clamp_lock_seconds(&self, requested: f64) -> u32 {
        if !requested.is_finite() {
            return self.lock_seconds;
        }
        (requested.round() as i64)
            .clamp(i64::from(self.min_lock_seconds), i64::from(self.max_lock_seconds))
            as u32
    }

    pub fn clamp_next_delay(&self, requested: u64) -> u64 {
        requested.max(self.min_next_delay_ms)
    }
}

impl Default for QuizTuning {
    fn default() -> Self {
        Self {
            lock_seconds: default_lock_seconds(),
            min_lock_seconds: default_min_lock_seconds(),
            max_lock_seconds: default_max_lock_seconds(),
            prepare_delay_ms: default_prepare_delay_ms(),
            next_delay_ms: default_next_delay_ms(),
            min_next_delay_ms: default_min_next_delay_ms(),
            auto_start_delay_ms: default_auto_start_delay_ms(),
            auto_restart_delay_ms: default_auto_restart_delay_ms(),
            min_players: default_quiz_min_players(),
            max_questions: default_max_questions(),
        }
    }
}

/// Entry-gate admission tuning.
#[derive(Debug, Deserialize, Serialize, Clone, Copy)]
pub struct GateTuning {
    /// Countdown between `portal:lobby-start` and admission taking effect
    #[serde(default = "default_admission_countdown_ms")]
    pub admission_countdown_ms: u64,
}

impl Default for GateTuning {
    fn default() -> Self {
        Self {
            admission_countdown_ms: default_admission_countdown_ms(),
        }
    }
}

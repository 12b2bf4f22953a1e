// Quiz module: question bank, zone geometry, state machine.

pub mod engine;
pub mod questions;
pub mod zones;

pub use engine::{
    judge_lock, sort_leaderboard, JudgeInput, JudgeOutcome, PlayerVerdict, QuizState, TimerHandle,
};
pub use questions::{fallback_bank, normalize_answer, sanitize_questions, Question};
pub use zones::{ZoneLayout, ZoneRect, ZoneVerdict};

//! Question bank sanitization and answer normalization.

use crate::protocol::messages::RawQuestion;
use crate::protocol::types::Answer;
use serde::{Deserialize, Serialize};

/// Maximum question id length in characters.
pub const MAX_QUESTION_ID_LEN: usize = 24;

/// Maximum question text length in characters.
pub const MAX_QUESTION_TEXT_LEN: usize = 180;

/// A sanitized quiz question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub text: String,
    pub answer: Answer,
}

/// Normalize a raw answer string into O or X. The alias table is the single
/// extension point for future client vocabularies.
pub fn normalize_answer(raw: &str) -> Option<Answer> {
    match raw.trim().to_ascii_uppercase().as_str() {
        "O" | "TRUE" | "YES" | "1" | "LEFT" => Some(Answer::O),
        "X" | "FALSE" | "NO" | "0" | "RIGHT" => Some(Answer::X),
        _ => None,
    }
}

/// Sanitize a submitted question list: questions without a resolvable answer
/// are dropped, ids and texts are bounded, and the list is clamped to `max`.
pub fn sanitize_questions(raw: &[RawQuestion], max: usize) -> Vec<Question> {
    let mut out = Vec::new();
    for entry in raw {
        if out.len() >= max {
            break;
        }
        let Some(answer) = entry.answer.as_deref().and_then(normalize_answer) else {
            continue;
        };
        let n = out.len() + 1;
        let id = entry
            .id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.chars().take(MAX_QUESTION_ID_LEN).collect())
            .unwrap_or_else(|| format!("q{n}"));
        let text = entry
            .text
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.chars().take(MAX_QUESTION_TEXT_LEN).collect())
            .unwrap_or_else(|| format!("Question {n}"));
        out.push(Question { id, text, answer });
    }
    out
}

/// Built-in bank used when a round starts with no host-configured questions.
pub fn fallback_bank() -> Vec<Question> {
    const BANK: [(&str, &str, Answer); 10] = [
        ("fb-1", "The Pacific is the largest ocean on Earth.", Answer::O),
        ("fb-2", "A hexagon has five sides.", Answer::X),
        ("fb-3", "Sound travels faster in water than in air.", Answer::O),
        ("fb-4", "The Great Wall of China is visible from the Moon with the naked eye.", Answer::X),
        ("fb-5", "Octopuses have three hearts.", Answer::O),
        ("fb-6", "Lightning never strikes the same place twice.", Answer::X),
        ("fb-7", "Honey never spoils if stored sealed.", Answer::O),
        ("fb-8", "Mount Everest is the closest point on Earth to outer space.", Answer::X),
        ("fb-9", "Bananas are botanically berries.", Answer::O),
        ("fb-10", "Humans use only ten percent of their brains.", Answer::X),
    ];
    BANK.iter()
        .map(|(id, text, answer)| Question {
            id: (*id).to_string(),
            text: (*text).to_string(),
            answer: *answer,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(id: Option<&str>, text: Option<&str>, answer: Option<&str>) -> RawQuestion {
        RawQuestion {
            id: id.map(Into::into),
            text: text.map(Into::into),
            answer: answer.map(Into::into),
        }
    }

    #[test]
    fn answer_alias_table() {
        for alias in ["O", "o", "true", "YES", "1", "left", " LEFT "] {
            assert_eq!(normalize_answer(alias), Some(Answer::O), "{alias}");
        }
        for alias in ["X", "x", "False", "no", "0", "RIGHT"] {
            assert_eq!(normalize_answer(alias), Some(Answer::X), "{alias}");
        }
        for alias in ["", "maybe", "2", "YEP"] {
            assert_eq!(normalize_answer(alias), None, "{alias}");
        }
    }

    #[test]
    fn unresolvable_answers_are_dropped() {
        let questions = sanitize_questions(
            &[
                raw(Some("a"), Some("first"), Some("O")),
                raw(Some("b"), Some("second"), Some("maybe")),
                raw(Some("c"), Some("third"), None),
                raw(Some("d"), Some("fourth"), Some("RIGHT")),
            ],
            50,
        );
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].id, "a");
        assert_eq!(questions[1].answer, Answer::X);
    }

    #[test]
    fn missing_id_and_text_get_positional_fallbacks() {
        let questions = sanitize_questions(&[raw(None, None, Some("yes"))], 50);
        assert_eq!(questions[0].id, "q1");
        assert_eq!(questions[0].text, "Question 1");
    }

    #[test]
    fn long_fields_are_truncated() {
        let long_id = "i".repeat(100);
        let long_text = "t".repeat(1000);
        let questions =
            sanitize_questions(&[raw(Some(&long_id), Some(&long_text), Some("X"))], 50);
        assert_eq!(questions[0].id.chars().count(), MAX_QUESTION_ID_LEN);
        assert_eq!(questions[0].text.chars().count(), MAX_QUESTION_TEXT_LEN);
    }

    #[test]
    fn list_is_clamped() {
        let many: Vec<RawQuestion> = (0..80)
            .map(|i| raw(None, Some(&format!("q {i}")), Some("O")))
            .collect();
        assert_eq!(sanitize_questions(&many, 50).len(), 50);
    }

    #[test]
    fn fallback_bank_is_ten_questions() {
        let bank = fallback_bank();
        assert_eq!(bank.len(), 10);
        assert!(bank.iter().any(|q| q.answer == Answer::O));
        assert!(bank.iter().any(|q| q.answer == Answer::X));
    }
}

//! Evaluation questions, answer labels, and scoring results

use serde::{Deserialize, Serialize};

/// Read-only reference data: one evaluation question with its category assignment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationQuestion {
    pub id: String,
    pub text: String,
    pub category_id: String,
    /// Ownership scope of the question set
    pub owner_id: String,
}

/// Closed label set the model must answer from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerLabel {
    Yes,
    Maybe,
    No,
    /// The model declined: evidence was insufficient
    Unanswerable,
}

impl AnswerLabel {
    /// Parse a model-emitted label. Anything outside the closed set is `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().trim_matches('"').to_ascii_lowercase().as_str() {
            "yes" => Some(Self::Yes),
            "maybe" => Some(Self::Maybe),
            "no" => Some(Self::No),
            "-1" => Some(Self::Unanswerable),
            _ => None,
        }
    }

    /// Discrete score; unanswerable questions are never scored
    pub fn score(self) -> Option<u8> {
        match self {
            Self::Yes => Some(2),
            Self::Maybe => Some(1),
            Self::No => Some(0),
            Self::Unanswerable => None,
        }
    }
}

/// A scored answer produced by the scoring engine
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestionAnswer {
    pub question_id: String,
    pub answer: u8,
    pub reasoning: String,
}

/// Result of a full scoring pass over a document's question set.
///
/// Every question lands in exactly one of the two sets.
#[derive(Debug, Clone, Default)]
pub struct ScoringOutcome {
    pub answers: Vec<QuestionAnswer>,
    pub unanswerable: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_parse_case_insensitively() {
        assert_eq!(AnswerLabel::parse("Yes"), Some(AnswerLabel::Yes));
        assert_eq!(AnswerLabel::parse("MAYBE"), Some(AnswerLabel::Maybe));
        assert_eq!(AnswerLabel::parse(" no "), Some(AnswerLabel::No));
        assert_eq!(AnswerLabel::parse("-1"), Some(AnswerLabel::Unanswerable));
        assert_eq!(AnswerLabel::parse("\"-1\""), Some(AnswerLabel::Unanswerable));
    }

    #[test]
    fn unknown_labels_are_rejected() {
        assert_eq!(AnswerLabel::parse("probably"), None);
        assert_eq!(AnswerLabel::parse(""), None);
        assert_eq!(AnswerLabel::parse("2"), None);
    }

    #[test]
    fn scores_map_to_the_documented_values() {
        assert_eq!(AnswerLabel::Yes.score(), Some(2));
        assert_eq!(AnswerLabel::Maybe.score(), Some(1));
        assert_eq!(AnswerLabel::No.score(), Some(0));
        assert_eq!(AnswerLabel::Unanswerable.score(), None);
    }
}

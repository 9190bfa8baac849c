//! Retrieval-augmented scoring of evaluation questions

use std::sync::Arc;

use crate::error::Result;
use crate::providers::{EmbeddingProvider, LlmProvider, PointFilter, VectorIndex};
use crate::types::{EvaluationQuestion, QuestionAnswer, ScoringOutcome};

use super::prompt::{build_scoring_prompt, parse_labelled_response};

/// Scores a document's question set against the chunks indexed for its chat.
///
/// A single question's failure (retrieval, generation, or parsing) is
/// isolated: the question lands in the unanswerable set and the pass
/// continues. Every question ends in exactly one of the two output sets.
pub struct ScoringEngine {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    llm: Arc<dyn LlmProvider>,
    top_k: usize,
}

impl ScoringEngine {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        llm: Arc<dyn LlmProvider>,
        top_k: usize,
    ) -> Self {
        Self {
            embedder,
            index,
            llm,
            top_k: top_k.max(1),
        }
    }

    /// Run the full scoring pass for one chat
    pub async fn score_document(
        &self,
        chat_id: &str,
        questions: &[EvaluationQuestion],
    ) -> ScoringOutcome {
        let mut outcome = ScoringOutcome::default();

        for question in questions {
            match self.score_question(chat_id, question).await {
                Ok(Some(answer)) => outcome.answers.push(answer),
                Ok(None) => outcome.unanswerable.push(question.id.clone()),
                Err(e) => {
                    tracing::warn!(
                        chat_id,
                        question_id = %question.id,
                        "Question scoring failed, recording as unanswerable: {}",
                        e
                    );
                    outcome.unanswerable.push(question.id.clone());
                }
            }
        }

        tracing::info!(
            chat_id,
            scored = outcome.answers.len(),
            unanswerable = outcome.unanswerable.len(),
            "Scoring pass finished"
        );
        outcome
    }

    /// Score one question; `Ok(None)` means the model declined or the response
    /// did not match the expected shape.
    async fn score_question(
        &self,
        chat_id: &str,
        question: &EvaluationQuestion,
    ) -> Result<Option<QuestionAnswer>> {
        let query_vector = self.embedder.embed(&question.text).await?;

        let filter = PointFilter::new().must_match("chat_id", chat_id);
        let hits = self.index.search(&query_vector, &filter, self.top_k).await?;

        let excerpts: Vec<String> = hits.into_iter().map(|hit| hit.payload.text).collect();
        let prompt = build_scoring_prompt(&question.text, &excerpts);
        let raw = self.llm.generate(&prompt).await?;

        let Some((label, reasoning)) = parse_labelled_response(&raw) else {
            tracing::debug!(
                question_id = %question.id,
                "Response did not match the Answer/Reason shape"
            );
            return Ok(None);
        };

        Ok(label.score().map(|score| QuestionAnswer {
            question_id: question.id.clone(),
            answer: score,
            reasoning,
        }))
    }
}

/// Per-category score over a finished pass
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryScore {
    pub category_id: String,
    /// Sum of answer scores in this category
    pub points: u32,
    /// 2 points per scored question in this category
    pub max_points: u32,
    /// points / max_points, in [0, 1]
    pub percent: f32,
}

/// Group scored answers by category and normalise per category.
///
/// The denominator is the number of *scored* questions in that category;
/// unanswerable questions never dilute a category's percentage, and one
/// category's size never affects another's.
pub fn category_scores(
    outcome: &ScoringOutcome,
    questions: &[EvaluationQuestion],
) -> Vec<CategoryScore> {
    use std::collections::BTreeMap;

    let category_of: BTreeMap<&str, &str> = questions
        .iter()
        .map(|q| (q.id.as_str(), q.category_id.as_str()))
        .collect();

    let mut grouped: BTreeMap<&str, (u32, u32)> = BTreeMap::new();
    for answer in &outcome.answers {
        let Some(category_id) = category_of.get(answer.question_id.as_str()) else {
            continue;
        };
        let entry = grouped.entry(category_id).or_insert((0, 0));
        entry.0 += answer.answer as u32;
        entry.1 += 1;
    }

    grouped
        .into_iter()
        .map(|(category_id, (points, scored))| {
            let max_points = scored * 2;
            CategoryScore {
                category_id: category_id.to_string(),
                points,
                max_points,
                percent: if max_points > 0 {
                    points as f32 / max_points as f32
                } else {
                    0.0
                },
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::QuestionAnswer;

    fn question(id: &str, category: &str) -> EvaluationQuestion {
        EvaluationQuestion {
            id: id.into(),
            text: format!("question {}", id),
            category_id: category.into(),
            owner_id: "owner-1".into(),
        }
    }

    fn answer(id: &str, score: u8) -> QuestionAnswer {
        QuestionAnswer {
            question_id: id.into(),
            answer: score,
            reasoning: "because".into(),
        }
    }

    #[test]
    fn category_denominator_is_the_categorys_own_scored_count() {
        let questions = vec![
            question("q1", "security"),
            question("q2", "security"),
            question("q3", "privacy"),
            question("q4", "privacy"),
        ];
        let outcome = ScoringOutcome {
            answers: vec![answer("q1", 2), answer("q2", 0), answer("q3", 2)],
            unanswerable: vec!["q4".into()],
        };

        let scores = category_scores(&outcome, &questions);
        assert_eq!(scores.len(), 2);

        let privacy = scores.iter().find(|s| s.category_id == "privacy").unwrap();
        // One Yes of one scored question: 100%, regardless of the other category
        assert_eq!(privacy.points, 2);
        assert_eq!(privacy.max_points, 2);
        assert!((privacy.percent - 1.0).abs() < f32::EPSILON);

        let security = scores.iter().find(|s| s.category_id == "security").unwrap();
        assert_eq!(security.points, 2);
        assert_eq!(security.max_points, 4);
        assert!((security.percent - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn fully_unanswerable_categories_produce_no_score_row() {
        let questions = vec![question("q1", "security")];
        let outcome = ScoringOutcome {
            answers: vec![],
            unanswerable: vec!["q1".into()],
        };
        assert!(category_scores(&outcome, &questions).is_empty());
    }
}

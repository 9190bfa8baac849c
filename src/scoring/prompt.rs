//! Scoring prompt construction and strict response parsing

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::AnswerLabel;

static ANSWER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)^\s*answer:\s*(.+?)\s*$").expect("answer pattern compiles"));
static REASON_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)^\s*reason:\s*(.+?)\s*$").expect("reason pattern compiles"));

/// Build the grounding prompt for one question.
///
/// The model sees only the retrieved chunk texts plus the question, must answer
/// from the closed label set, and is told to prefer Maybe / -1 over invention
/// when the excerpts are thin.
pub fn build_scoring_prompt(question: &str, excerpts: &[String]) -> String {
    let mut context = String::new();
    for (i, excerpt) in excerpts.iter().enumerate() {
        context.push_str(&format!("[{}] {}\n\n", i + 1, excerpt.trim()));
    }
    if excerpts.is_empty() {
        context.push_str("(no relevant excerpts were found)\n\n");
    }

    format!(
        r#"You are assessing a document against a review question, using ONLY the excerpts below.

RULES:
1. Use only information explicitly stated in the excerpts.
2. Answer "Yes" only when the excerpts clearly support it.
3. Answer "No" only when the excerpts clearly contradict it.
4. When the evidence is thin or indirect, prefer "Maybe".
5. When the excerpts say nothing about the question, answer "-1". Never invent an answer.

EXCERPTS:
{context}QUESTION: {question}

Respond with exactly two lines:
Answer: <Yes|Maybe|No|-1>
Reason: <one sentence>"#
    )
}

/// Parse a model response into a label and its one-sentence reasoning.
///
/// The match is strict: a response without a recognisable `Answer:` line, or
/// with a label outside the closed set, is `None`; the caller treats that as
/// unanswerable rather than an error.
pub fn parse_labelled_response(raw: &str) -> Option<(AnswerLabel, String)> {
    let label = ANSWER_RE
        .captures(raw)
        .and_then(|caps| AnswerLabel::parse(caps.get(1)?.as_str()))?;

    let reasoning = REASON_RE
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default();

    Some((label, reasoning))
}

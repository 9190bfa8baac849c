//! Retrieval-augmented question scoring

mod engine;
mod prompt;

pub use engine::{category_scores, CategoryScore, ScoringEngine};
pub use prompt::{build_scoring_prompt, parse_labelled_response};

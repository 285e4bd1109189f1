//! Types produced by the Advisor node (spec §4.6).

use serde::{Deserialize, Serialize};

/// The provenance/confidence class of a [`QuestionAnswer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerType {
    /// Backed directly by catalog data.
    Factual,
    /// Inferred, not directly backed by catalog data.
    Speculative,
    /// The referenced product could not be found.
    Unavailable,
}

/// One answered or unanswered customer question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionAnswer {
    pub question: String,
    pub answer: String,
    pub confidence: f64,
    pub reference_product_ids: Vec<String>,
    pub answer_type: AnswerType,
}

/// The Advisor's terminal output (spec §4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisorOutput {
    pub email_id: String,
    pub primary_products: Vec<String>,
    pub answered_questions: Vec<QuestionAnswer>,
    pub unanswered_questions: Vec<String>,
    pub related_products: Vec<String>,
    pub unsuccessful_references: Vec<String>,
}

//! Advisor node: answers factual inquiries against resolved products
//! (spec §4.6).

use serde::Deserialize;

use crate::domain::{AdvisorOutput, AnswerType, EmailAnalysis, QuestionAnswer, SegmentKind, StockkeeperOutput};
use crate::error::ToolCallError;
use crate::llm::retry::{generate_structured, RetryLoopConfig};
use crate::llm::LlmProvider;

fn system_prompt() -> &'static str {
    "You are the advisor stage of a customer-service email pipeline. Answer the customer's \
     product questions using only the resolved candidate products provided — never fabricate a \
     product, price, or attribute. Each answer must carry a confidence in [0, 1] and an \
     answer_type of factual, speculative, or unavailable. Be neutral and factual: persona, \
     greeting, and sign-off are handled by a later stage. Respond with JSON matching the \
     requested schema only."
}

#[derive(Debug, Deserialize, Default)]
struct AdvisorResponse {
    #[serde(default)]
    primary_products: Vec<String>,
    #[serde(default)]
    answered_questions: Vec<QuestionAnswer>,
    #[serde(default)]
    unanswered_questions: Vec<String>,
    #[serde(default)]
    related_products: Vec<String>,
}

fn build_prompt(email_id: &str, analysis: &EmailAnalysis, stockkeeper: &StockkeeperOutput) -> String {
    let mut prompt = format!("Email id: {email_id}\nInquiry segments and resolved candidates:\n");
    for segment in analysis.segments.iter().filter(|s| s.kind == SegmentKind::Inquiry) {
        prompt.push_str(&format!("- question context: {}\n", segment.main_sentence));
        for mention in &segment.mentions {
            prompt.push_str(&format!("  mention: {mention:?}\n"));
        }
    }
    for mention_candidates in &stockkeeper.candidates {
        for candidate in &mention_candidates.candidates {
            prompt.push_str(&format!(
                "candidate: id={} name={} price={} description={}\n",
                candidate.product.product_id, candidate.product.name, candidate.product.price, candidate.product.description
            ));
        }
    }
    prompt
}

/// Run the Advisor over the inquiry segments of `analysis`.
pub async fn run(
    email_id: &str,
    analysis: &EmailAnalysis,
    stockkeeper: &StockkeeperOutput,
    provider: &dyn LlmProvider,
    retry_config: &RetryLoopConfig,
) -> Result<AdvisorOutput, ToolCallError> {
    let has_inquiry = analysis.segments.iter().any(|s| s.kind == SegmentKind::Inquiry);
    if !has_inquiry {
        return Ok(AdvisorOutput {
            email_id: email_id.to_string(),
            primary_products: Vec::new(),
            answered_questions: Vec::new(),
            unanswered_questions: Vec::new(),
            related_products: Vec::new(),
            unsuccessful_references: Vec::new(),
        });
    }

    let prompt = build_prompt(email_id, analysis, stockkeeper);
    let parsed: AdvisorResponse =
        generate_structured(provider, system_prompt(), &prompt, None, &[], retry_config).await?;

    let mut unsuccessful_references = Vec::new();
    let answered_questions = parsed
        .answered_questions
        .into_iter()
        .map(|qa| apply_exact_id_miss_override(qa, stockkeeper, &mut unsuccessful_references))
        .collect();

    Ok(AdvisorOutput {
        email_id: email_id.to_string(),
        primary_products: parsed.primary_products,
        answered_questions,
        unanswered_questions: parsed.unanswered_questions,
        related_products: parsed.related_products,
        unsuccessful_references,
    })
}

/// Force the canonical "not found" answer for any question referencing a
/// product id recorded in `exact_id_misses` (spec §4.6): such ids are never
/// looked up again.
fn apply_exact_id_miss_override(
    mut qa: QuestionAnswer,
    stockkeeper: &StockkeeperOutput,
    unsuccessful_references: &mut Vec<String>,
) -> QuestionAnswer {
    for product_id in &qa.reference_product_ids {
        if stockkeeper.is_exact_id_miss(product_id) {
            qa.answer = format!("Product '{product_id}' could not be found in our catalog.");
            qa.answer_type = AnswerType::Unavailable;
            qa.confidence = 1.0;
            unsuccessful_references.push(product_id.clone());
        }
    }
    qa
}

//! Composer node: generates the final customer-facing reply (spec §4.7).

use serde::Deserialize;

use crate::domain::{AdvisorOutput, AnswerType, ComposerOutput, CustomerEmail, EmailAnalysis, Order};
use crate::error::ToolCallError;
use crate::llm::retry::{generate_structured, RetryLoopConfig};
use crate::llm::LlmProvider;

/// Fixed, per-deployment strings the Composer must use verbatim (spec §4.7:
/// "signature and brand voice are fixed strings from configuration").
pub struct ComposerContext<'a> {
    pub signature: &'a str,
    pub brand_voice: &'a str,
}

fn system_prompt(brand_voice: &str, signature: &str) -> String {
    format!(
        "You are the composer stage of a customer-service email pipeline for a fashion \
         retailer. Brand voice: {brand_voice}. Write the reply in the same language as the \
         customer's email. Use only product names, prices, and ids that appear in the provided \
         order and advisor inputs — never invent a product. Close every reply with this exact \
         signature: {signature}. Respond with JSON matching the requested schema only."
    )
}

#[derive(Debug, Deserialize)]
struct ComposerResponse {
    subject: String,
    response_body: String,
    tone: String,
    #[serde(default)]
    response_points: Vec<String>,
}

fn build_prompt(email: &CustomerEmail, analysis: &EmailAnalysis, order: Option<&Order>, advisor: Option<&AdvisorOutput>) -> String {
    let mut prompt = format!(
        "Email id: {}\nDetected language: {}\nOriginal message:\n{}\n",
        email.email_id, analysis.language, email.message
    );

    if let Some(order) = order {
        prompt.push_str(&format!("\nOrder status: {:?}, total price: {:.2}\n", order.overall_status, order.total_price));
        for line in &order.lines {
            prompt.push_str(&format!(
                "- line: product_id={} description={} quantity={} status={:?} unit_price={:.2}\n",
                line.product_id, line.description, line.quantity, line.status, line.unit_price
            ));
            if line.needs_clarification() {
                prompt.push_str(
                    "  NOTE: this line needs customer confirmation before being treated as fulfilled; \
                     ask them to confirm it rather than stating it is ordered.\n",
                );
            }
            if !line.alternatives.is_empty() {
                for alt in &line.alternatives {
                    prompt.push_str(&format!("  alternative: id={} name={} price={:.2}\n", alt.product_id, alt.name, alt.price));
                }
            }
        }
    }

    if let Some(advisor) = advisor {
        for qa in &advisor.answered_questions {
            prompt.push_str(&format!("\n- question: {} answer: {} type: {:?}\n", qa.question, qa.answer, qa.answer_type));
            if qa.answer_type == AnswerType::Unavailable {
                prompt.push_str(
                    "  NOTE: state plainly that this product could not be found before offering any alternatives.\n",
                );
            }
        }
        for q in &advisor.unanswered_questions {
            prompt.push_str(&format!("\n- unanswered question: {q}\n"));
        }
    }

    prompt
}

/// Run the Composer, synthesizing whatever upstream inputs are available.
/// Composer always runs, even when both `order` and `advisor` are `None`
/// (spec §4.1: "Composer always runs and must synthesize a reply even when
/// upstream nodes failed, degrading gracefully").
pub async fn run(
    email: &CustomerEmail,
    analysis: &EmailAnalysis,
    order: Option<&Order>,
    advisor: Option<&AdvisorOutput>,
    provider: &dyn LlmProvider,
    retry_config: &RetryLoopConfig,
    ctx: &ComposerContext<'_>,
) -> Result<ComposerOutput, ToolCallError> {
    let system = system_prompt(ctx.brand_voice, ctx.signature);
    let prompt = build_prompt(email, analysis, order, advisor);

    let parsed: ComposerResponse = generate_structured(provider, &system, &prompt, None, &[], retry_config).await?;

    Ok(ComposerOutput {
        email_id: email.email_id.clone(),
        subject: parsed.subject,
        response_body: parsed.response_body,
        tone: parsed.tone,
        response_points: parsed.response_points,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Intent, OrderLine, OrderLineStatus, OverallStatus, Segment, SegmentKind};
    use std::collections::HashMap;

    fn email() -> CustomerEmail {
        CustomerEmail::new("e1", Some("Question".into()), "Is the Alpine Explorer in stock?")
    }

    fn analysis() -> EmailAnalysis {
        EmailAnalysis::new(
            "e1",
            "en",
            HashMap::new(),
            vec![Segment {
                kind: SegmentKind::Inquiry,
                main_sentence: "Is the Alpine Explorer in stock?".into(),
                related_sentences: vec![],
                mentions: vec![],
            }],
        )
    }

    #[test]
    fn build_prompt_flags_clarification_lines() {
        let mut line = OrderLine::draft("LTH0976", "[CLARIFICATION NEEDED: Leather Bifold Wallet] a wallet", 1, 21.0);
        line.status = OrderLineStatus::Created;
        let order = Order {
            email_id: "e1".into(),
            overall_status: OverallStatus::Created,
            lines: vec![line],
            total_price: 21.0,
            total_discount: 0.0,
            message: None,
            stock_updated: true,
        };
        let prompt = build_prompt(&email(), &analysis(), Some(&order), None);
        assert!(prompt.contains("needs customer confirmation"));
    }

    #[test]
    fn build_prompt_flags_unavailable_answers() {
        let advisor = AdvisorOutput {
            email_id: "e1".into(),
            primary_products: vec![],
            answered_questions: vec![crate::domain::QuestionAnswer {
                question: "is ZZZ9999 available?".into(),
                answer: "not found".into(),
                confidence: 1.0,
                reference_product_ids: vec!["ZZZ9999".into()],
                answer_type: AnswerType::Unavailable,
            }],
            unanswered_questions: vec![],
            related_products: vec![],
            unsuccessful_references: vec!["ZZZ9999".into()],
        };
        let prompt = build_prompt(&email(), &analysis(), None, Some(&advisor));
        assert!(prompt.contains("state plainly"));
    }

    #[test]
    fn composer_runs_with_no_upstream_inputs() {
        let prompt = build_prompt(&email(), &analysis(), None, None);
        assert!(prompt.contains("Detected language"));
        assert_eq!(analysis().intent, Intent::ProductInquiry);
    }
}

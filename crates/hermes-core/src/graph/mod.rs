//! The agent orchestration graph: executes the five nodes for one email in
//! the fixed partial order of spec §4.1, with conditional routing,
//! fan-out/fan-in for `{Fulfiller, Advisor}`, and per-node error
//! containment into [`WorkflowState::errors`].

use std::collections::HashMap;

use crate::domain::{Catalog, CustomerEmail, EmailAnalysis, NodeName, Order, PromotionSpec, WorkflowState};
use crate::error::ToolCallError;
use crate::llm::retry::RetryLoopConfig;
use crate::llm::LlmProvider;
use crate::nodes::{advisor, classifier, composer, fulfiller, stockkeeper};
use crate::vector::VectorIndex;

/// Everything the graph needs beyond the email itself: the shared catalog
/// and vector index, the two LLM providers for the strong/weak tiers (spec
/// §6 model-tier table; Classifier and Fulfiller use the strong tier,
/// Advisor and Composer the weak tier), the retry policy, the active
/// promotion specs, and the Composer's fixed brand strings.
pub struct GraphContext<'a> {
    pub catalog: &'a Catalog,
    pub vector_index: &'a dyn VectorIndex,
    pub strong_provider: &'a dyn LlmProvider,
    pub weak_provider: &'a dyn LlmProvider,
    pub retry_config: RetryLoopConfig,
    pub promotion_specs: Vec<PromotionSpec>,
    pub max_alternatives: usize,
    pub signature: String,
    pub brand_voice: String,
}

/// Execute the graph for one email, producing a terminal [`WorkflowState`].
///
/// Topology (spec §4.1): `START → Classifier → Stockkeeper → route(intent,
/// segments) → {Fulfiller | Advisor | both} → Composer → END`. A malformed
/// Classifier result skips straight to Composer with a degraded analysis,
/// rather than aborting the email outright, so Composer can still
/// synthesize a reply (spec §4.1 "degrading gracefully").
pub async fn run_workflow(email: CustomerEmail, ctx: &GraphContext<'_>) -> WorkflowState {
    let mut state = WorkflowState::new(email.clone());

    let (analysis, classifier_ok) =
        match classifier::run(&email, ctx.strong_provider, &ctx.retry_config).await {
            Ok(analysis) => {
                state.classifier = Some(analysis.clone());
                (analysis, true)
            }
            Err(e) => {
                state.record_error(NodeName::Classifier, "ToolCallError", e.to_string(), Some(format!("{e:?}")));
                (fallback_analysis(&email), false)
            }
        };

    if classifier_ok {
        let stockkeeper_output = stockkeeper::run(&analysis, ctx.catalog, ctx.vector_index);
        state.stockkeeper = Some(stockkeeper_output.clone());

        let has_order = analysis.has_order_segment();
        let has_inquiry = analysis.has_inquiry_segment();
        let fulfiller_ctx = fulfiller::FulfillerContext {
            catalog: ctx.catalog,
            promotion_specs: &ctx.promotion_specs,
            max_alternatives: ctx.max_alternatives,
        };

        match (has_order, has_inquiry) {
            (true, true) => {
                let (fulfiller_result, advisor_result) = tokio::join!(
                    fulfiller::run(
                        &email.email_id,
                        &analysis,
                        &stockkeeper_output,
                        ctx.strong_provider,
                        &ctx.retry_config,
                        &fulfiller_ctx,
                    ),
                    advisor::run(&email.email_id, &analysis, &stockkeeper_output, ctx.weak_provider, &ctx.retry_config),
                );
                record_fulfiller(&mut state, fulfiller_result);
                record_advisor(&mut state, advisor_result);
            }
            (true, false) => {
                let fulfiller_result = fulfiller::run(
                    &email.email_id,
                    &analysis,
                    &stockkeeper_output,
                    ctx.strong_provider,
                    &ctx.retry_config,
                    &fulfiller_ctx,
                )
                .await;
                record_fulfiller(&mut state, fulfiller_result);
            }
            (false, true) => {
                let advisor_result =
                    advisor::run(&email.email_id, &analysis, &stockkeeper_output, ctx.weak_provider, &ctx.retry_config).await;
                record_advisor(&mut state, advisor_result);
            }
            (false, false) => {}
        }
    }

    let composer_ctx = composer::ComposerContext {
        signature: &ctx.signature,
        brand_voice: &ctx.brand_voice,
    };
    let composer_result = composer::run(
        &email,
        &analysis,
        state.fulfiller.as_ref(),
        state.advisor.as_ref(),
        ctx.weak_provider,
        &ctx.retry_config,
        &composer_ctx,
    )
    .await;

    match composer_result {
        Ok(output) => state.composer = Some(output),
        Err(e) => state.record_error(NodeName::Composer, "ToolCallError", e.to_string(), Some(format!("{e:?}"))),
    }

    state
}

fn fallback_analysis(email: &CustomerEmail) -> EmailAnalysis {
    EmailAnalysis::new(email.email_id.clone(), "unknown", HashMap::new(), Vec::new())
}

fn record_fulfiller(state: &mut WorkflowState, result: Result<Order, ToolCallError>) {
    match result {
        Ok(order) => state.fulfiller = Some(order),
        Err(e) => state.record_error(NodeName::Fulfiller, "ToolCallError", e.to_string(), Some(format!("{e:?}"))),
    }
}

fn record_advisor(state: &mut WorkflowState, result: Result<crate::domain::AdvisorOutput, ToolCallError>) {
    match result {
        Ok(output) => state.advisor = Some(output),
        Err(e) => state.record_error(NodeName::Advisor, "ToolCallError", e.to_string(), Some(format!("{e:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Category, Product, Season};
    use crate::error::LlmError;
    use crate::llm::{GenerationParams, LlmResponse, TokenUsage};
    use crate::vector::InMemoryVectorIndex;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// Dispatches a canned structured-output JSON response per node, keyed
    /// by a distinctive substring of that node's system prompt.
    struct ScriptedGraphProvider {
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedGraphProvider {
        fn new() -> Self {
            Self { calls: Mutex::new(Vec::new()) }
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedGraphProvider {
        fn name(&self) -> &str {
            "scripted-graph"
        }

        async fn complete(&self, system: &str, _user_message: &str, _params: &GenerationParams) -> Result<LlmResponse, LlmError> {
            self.calls.lock().unwrap().push(system.to_string());

            let text = if system.contains("classifier stage") {
                r#"{"language":"en","customer_pii":{},"segments":[{"kind":"order","main_sentence":"I want two wallets","related_sentences":[],"mentions":[{"product_id":"LTH0976","quantity":2,"confidence":1.0}]}]}"#
            } else if system.contains("fulfiller stage") {
                r#"{"lines":[{"product_id":"LTH0976","description":"leather wallet","quantity":2}]}"#
            } else if system.contains("advisor stage") {
                r#"{"primary_products":[],"answered_questions":[],"unanswered_questions":[],"related_products":[]}"#
            } else {
                r#"{"subject":"Re: your order","response_body":"Thanks for your order.","tone":"friendly","response_points":["order confirmed"]}"#
            };

            Ok(LlmResponse {
                text: text.to_string(),
                usage: TokenUsage::default(),
                model: "test".to_string(),
                tool_calls: Vec::new(),
            })
        }

        async fn health_check(&self) -> Result<(), LlmError> {
            Ok(())
        }
    }

    fn catalog() -> Catalog {
        Catalog::from_products(vec![Product {
            product_id: "LTH0976".into(),
            name: "Leather Bifold Wallet".into(),
            description: "brown leather wallet".into(),
            category: Category::Accessories,
            product_type: "wallet".into(),
            stock: 5,
            seasons: HashSet::from([Season::AllSeasons]),
            price: 21.0,
            promotion: None,
            promotion_text: None,
            metadata: None,
        }])
        .unwrap()
    }

    #[tokio::test]
    async fn order_only_email_runs_fulfiller_not_advisor() {
        let provider = ScriptedGraphProvider::new();
        let catalog = catalog();
        let index = InMemoryVectorIndex::new(16);
        let ctx = GraphContext {
            catalog: &catalog,
            vector_index: &index,
            strong_provider: &provider,
            weak_provider: &provider,
            retry_config: RetryLoopConfig::default(),
            promotion_specs: vec![],
            max_alternatives: 2,
            signature: "— Hermes Customer Care".to_string(),
            brand_voice: "warm and concise".to_string(),
        };
        let email = CustomerEmail::new("e1", None, "I'd like to order two LTH0976 wallets please.");

        let state = run_workflow(email, &ctx).await;

        assert!(state.classifier.is_some());
        assert!(state.fulfiller.is_some());
        assert!(state.advisor.is_none());
        assert!(state.composer.is_some());
        assert_eq!(state.fulfiller.unwrap().lines[0].stock_after, 3);
    }

    #[tokio::test]
    async fn classifier_failure_still_produces_composer_output() {
        struct AlwaysFailsClassifier;
        #[async_trait]
        impl LlmProvider for AlwaysFailsClassifier {
            fn name(&self) -> &str {
                "always-fails"
            }
            async fn complete(&self, system: &str, _user_message: &str, _params: &GenerationParams) -> Result<LlmResponse, LlmError> {
                if system.contains("classifier stage") {
                    Err(LlmError::NotConfigured)
                } else {
                    Ok(LlmResponse {
                        text: r#"{"subject":"Re:","response_body":"We're looking into this.","tone":"neutral","response_points":[]}"#.to_string(),
                        usage: TokenUsage::default(),
                        model: "test".to_string(),
                        tool_calls: Vec::new(),
                    })
                }
            }
            async fn health_check(&self) -> Result<(), LlmError> {
                Ok(())
            }
        }

        let provider = AlwaysFailsClassifier;
        let catalog = catalog();
        let index = InMemoryVectorIndex::new(16);
        let ctx = GraphContext {
            catalog: &catalog,
            vector_index: &index,
            strong_provider: &provider,
            weak_provider: &provider,
            retry_config: RetryLoopConfig { max_retries: 0, ..RetryLoopConfig::default() },
            promotion_specs: vec![],
            max_alternatives: 2,
            signature: "— Hermes Customer Care".to_string(),
            brand_voice: "warm and concise".to_string(),
        };
        let email = CustomerEmail::new("e2", None, "hello");

        let state = run_workflow(email, &ctx).await;

        assert!(state.failed_cleanly(NodeName::Classifier));
        assert!(state.stockkeeper.is_none());
        assert!(state.fulfiller.is_none());
        assert!(state.composer.is_some());
    }
}

//! Batch driver: runs the graph over many emails with bounded concurrency,
//! writes the per-email YAML dump as each workflow finishes, and merges the
//! four output CSVs once at the end (spec §5, §6).

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::domain::{Catalog, CustomerEmail, Intent, PromotionSpec, WorkflowState};
use crate::error::IoError;
use crate::graph::{run_workflow, GraphContext};
use crate::io::{self, EmailClassificationRow, OrderStatusRow, ResponseRow};
use crate::llm::retry::RetryLoopConfig;
use crate::llm::LlmProvider;
use crate::vector::VectorIndex;

/// Default bound on concurrently-running workflows across emails (spec §5:
/// "a bounded pool of N concurrent workflow executions is permitted
/// (default N=2)").
pub const DEFAULT_CONCURRENCY: usize = 2;

/// Written into the response CSV when the Composer itself fails after the
/// classifier succeeded (spec §7: "the batch driver writes a default
/// apology string into the response CSV for that email and continues").
pub const DEFAULT_APOLOGY: &str =
    "We're sorry, we weren't able to generate a response to your message. \
     A member of our team will follow up with you shortly.";

/// Resources shared read-only across every email in a batch, owned so they
/// can be cloned (as `Arc`s) into spawned tasks.
pub struct BatchResources {
    pub catalog: Arc<Catalog>,
    pub vector_index: Arc<dyn VectorIndex>,
    pub strong_provider: Arc<dyn LlmProvider>,
    pub weak_provider: Arc<dyn LlmProvider>,
    pub retry_config: RetryLoopConfig,
    pub promotion_specs: Vec<PromotionSpec>,
    pub max_alternatives: usize,
    pub signature: String,
    pub brand_voice: String,
}

/// Batch-level run options, mirroring the CLI flags in spec §6.
pub struct BatchOptions {
    pub concurrency: usize,
    /// 0 means unlimited (matches the `hermes_processing_limit` config key).
    pub limit: u32,
    /// Empty means no filter (process every email in the source).
    pub target_email_ids: Vec<String>,
    pub stop_on_error: bool,
    pub out_dir: PathBuf,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            limit: 0,
            target_email_ids: Vec::new(),
            stop_on_error: false,
            out_dir: PathBuf::from("./output"),
        }
    }
}

/// Outcome of one batch run.
#[derive(Debug)]
pub struct BatchSummary {
    pub total_emails: usize,
    pub processed: usize,
    pub failed_email_ids: Vec<String>,
    /// True if `--stop-on-error` triggered and cut the run short.
    pub aborted: bool,
}

/// Run the graph over `emails`, respecting `options`'s filtering, limit,
/// concurrency bound, and stop-on-error semantics, then write the merged
/// output CSVs. Per-email YAML dumps are written as each workflow completes.
pub async fn run_batch(
    emails: Vec<CustomerEmail>,
    resources: BatchResources,
    options: &BatchOptions,
) -> Result<BatchSummary, IoError> {
    let mut emails = emails;
    if !options.target_email_ids.is_empty() {
        let wanted: std::collections::HashSet<&str> = options.target_email_ids.iter().map(String::as_str).collect();
        emails.retain(|e| wanted.contains(e.email_id.as_str()));
    }
    if options.limit > 0 {
        emails.truncate(options.limit as usize);
    }
    let total_emails = emails.len();

    let resources = Arc::new(resources);
    let semaphore = Arc::new(Semaphore::new(options.concurrency.max(1)));
    let results_dir = options.out_dir.join("results");

    let mut join_set: JoinSet<WorkflowState> = JoinSet::new();
    let mut finished = Vec::with_capacity(total_emails);
    let mut aborted = false;

    for email in emails {
        if aborted {
            break;
        }
        let permit = Arc::clone(&semaphore)
            .acquire_owned()
            .await
            .expect("batch semaphore is never closed");
        let resources = Arc::clone(&resources);
        join_set.spawn(async move {
            let _permit = permit;
            let ctx = GraphContext {
                catalog: resources.catalog.as_ref(),
                vector_index: resources.vector_index.as_ref(),
                strong_provider: resources.strong_provider.as_ref(),
                weak_provider: resources.weak_provider.as_ref(),
                retry_config: resources.retry_config.clone(),
                promotion_specs: resources.promotion_specs.clone(),
                max_alternatives: resources.max_alternatives,
                signature: resources.signature.clone(),
                brand_voice: resources.brand_voice.clone(),
            };
            run_workflow(email, &ctx).await
        });

        while let Some(joined) = join_set.try_join_next() {
            let state = joined.expect("workflow task panicked");
            if options.stop_on_error && !state.errors.is_empty() {
                aborted = true;
            }
            finished.push(state);
        }
    }

    while let Some(joined) = join_set.join_next().await {
        let state = joined.expect("workflow task panicked");
        if options.stop_on_error && !state.errors.is_empty() {
            aborted = true;
        }
        finished.push(state);
    }

    let processed = finished.len();
    let mut failed_email_ids = Vec::new();

    let mut classification_rows = Vec::new();
    let mut order_status_rows = Vec::new();
    let mut order_response_rows = Vec::new();
    let mut inquiry_response_rows = Vec::new();

    for state in &finished {
        if !state.errors.is_empty() {
            failed_email_ids.push(state.email.email_id.clone());
        }

        io::save_workflow_result(&results_dir, state)?;

        let Some(analysis) = &state.classifier else {
            continue;
        };
        classification_rows.push(EmailClassificationRow {
            email_id: state.email.email_id.clone(),
            category: analysis.intent.as_str().to_string(),
        });

        if analysis.intent == Intent::OrderRequest {
            if let Some(order) = &state.fulfiller {
                for line in &order.lines {
                    order_status_rows.push(OrderStatusRow {
                        email_id: state.email.email_id.clone(),
                        product_id: line.product_id.clone(),
                        quantity: line.quantity,
                        status: line.status.as_str().to_string(),
                    });
                }
            }
        }

        let response_body = match &state.composer {
            Some(composer) => composer.response_body.clone(),
            None => DEFAULT_APOLOGY.to_string(),
        };
        let row = ResponseRow {
            email_id: state.email.email_id.clone(),
            response: response_body,
        };
        match analysis.intent {
            Intent::OrderRequest => order_response_rows.push(row),
            Intent::ProductInquiry => inquiry_response_rows.push(row),
        }
    }

    io::write_output_csvs(&options.out_dir, classification_rows, order_status_rows, order_response_rows, inquiry_response_rows)?;

    Ok(BatchSummary {
        total_emails,
        processed,
        failed_email_ids,
        aborted,
    })
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
    use tempfile::tempdir;

    struct StubProvider;

    #[async_trait]
    impl LlmProvider for StubProvider {
        fn name(&self) -> &str {
            "stub"
        }

        async fn complete(&self, system: &str, _user_message: &str, _params: &GenerationParams) -> Result<LlmResponse, LlmError> {
            let text = if system.contains("classifier stage") {
                r#"{"language":"en","customer_pii":{},"segments":[{"kind":"inquiry","main_sentence":"Is the wallet in stock?","related_sentences":[],"mentions":[{"product_id":"LTH0976","quantity":1,"confidence":1.0}]}]}"#
            } else if system.contains("advisor stage") {
                r#"{"primary_products":["LTH0976"],"answered_questions":[],"unanswered_questions":[],"related_products":[]}"#
            } else {
                r#"{"subject":"Re:","response_body":"Yes, it's in stock.","tone":"friendly","response_points":[]}"#
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

    fn resources() -> BatchResources {
        let catalog = Catalog::from_products(vec![Product {
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
        .unwrap();

        BatchResources {
            catalog: Arc::new(catalog),
            vector_index: Arc::new(InMemoryVectorIndex::new(16)),
            strong_provider: Arc::new(StubProvider),
            weak_provider: Arc::new(StubProvider),
            retry_config: RetryLoopConfig::default(),
            promotion_specs: vec![],
            max_alternatives: 2,
            signature: "— Hermes Customer Care".to_string(),
            brand_voice: "warm and concise".to_string(),
        }
    }

    #[tokio::test]
    async fn run_batch_writes_inquiry_response_csv() {
        let dir = tempdir().unwrap();
        let options = BatchOptions {
            out_dir: dir.path().to_path_buf(),
            ..BatchOptions::default()
        };
        let emails = vec![
            CustomerEmail::new("e1", None, "Is the LTH0976 wallet in stock?"),
            CustomerEmail::new("e2", None, "Is the LTH0976 wallet in stock?"),
        ];

        let summary = run_batch(emails, resources(), &options).await.unwrap();
        assert_eq!(summary.total_emails, 2);
        assert_eq!(summary.processed, 2);
        assert!(summary.failed_email_ids.is_empty());
        assert!(!summary.aborted);

        let csv_path = dir.path().join("inquiry-response.csv");
        assert!(csv_path.exists());
        let mut reader = csv::Reader::from_path(&csv_path).unwrap();
        let rows: Vec<ResponseRow> = reader.deserialize().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);

        assert!(dir.path().join("results").join("e1.yml").exists());
    }

    #[tokio::test]
    async fn run_batch_respects_limit_and_target_ids() {
        let dir = tempdir().unwrap();
        let options = BatchOptions {
            out_dir: dir.path().to_path_buf(),
            target_email_ids: vec!["e2".to_string()],
            ..BatchOptions::default()
        };
        let emails = vec![
            CustomerEmail::new("e1", None, "question one"),
            CustomerEmail::new("e2", None, "question two"),
            CustomerEmail::new("e3", None, "question three"),
        ];

        let summary = run_batch(emails, resources(), &options).await.unwrap();
        assert_eq!(summary.total_emails, 1);
        assert_eq!(summary.processed, 1);
    }

    struct ComposerFailsProvider;

    #[async_trait]
    impl LlmProvider for ComposerFailsProvider {
        fn name(&self) -> &str {
            "composer-fails"
        }

        async fn complete(&self, system: &str, _user_message: &str, _params: &GenerationParams) -> Result<LlmResponse, LlmError> {
            if system.contains("classifier stage") {
                return Ok(LlmResponse {
                    text: r#"{"language":"en","customer_pii":{},"segments":[{"kind":"inquiry","main_sentence":"Is the wallet in stock?","related_sentences":[],"mentions":[{"product_id":"LTH0976","quantity":1,"confidence":1.0}]}]}"#.to_string(),
                    usage: TokenUsage::default(),
                    model: "test".to_string(),
                    tool_calls: Vec::new(),
                });
            }
            Err(LlmError::Parse("malformed response".to_string()))
        }

        async fn health_check(&self) -> Result<(), LlmError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn run_batch_writes_apology_when_composer_fails() {
        let dir = tempdir().unwrap();
        let options = BatchOptions {
            out_dir: dir.path().to_path_buf(),
            ..BatchOptions::default()
        };
        let mut resources = resources();
        resources.strong_provider = Arc::new(ComposerFailsProvider);
        resources.weak_provider = Arc::new(ComposerFailsProvider);
        let emails = vec![CustomerEmail::new("e1", None, "Is the LTH0976 wallet in stock?")];

        let summary = run_batch(emails, resources, &options).await.unwrap();
        assert_eq!(summary.processed, 1);
        assert!(!summary.failed_email_ids.is_empty());

        let csv_path = dir.path().join("inquiry-response.csv");
        let mut reader = csv::Reader::from_path(&csv_path).unwrap();
        let rows: Vec<ResponseRow> = reader.deserialize().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].response, DEFAULT_APOLOGY);
    }
}

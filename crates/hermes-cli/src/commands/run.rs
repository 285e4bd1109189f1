//! Implementation of the `hermes run` command.
//!
//! Loads the catalog and email source, seeds the in-memory vector index,
//! constructs both LLM providers, and drives the batch runner to
//! completion, mapping the batch summary to a process exit code.

use std::collections::HashMap;
use std::sync::Arc;

use hermes_core::batch::{run_batch, BatchOptions, BatchResources};
use hermes_core::config::Config;
use hermes_core::domain::{load_promotion_specs, Catalog, CustomerEmail};
use hermes_core::llm::factory::{create_provider, ModelTier};
use hermes_core::llm::retry::RetryLoopConfig;
use hermes_core::vector::{DocumentMetadata, InMemoryVectorIndex};

use super::RunArgs;

/// Fixed brand strings the Composer signs replies with (spec §4.7: "the
/// signature and brand voice are fixed strings from configuration"). Not
/// yet exposed as config keys; revisit if operators need per-tenant values.
const SIGNATURE: &str = "— Hermes Customer Care";
const BRAND_VOICE: &str = "warm, concise, and helpful";

pub async fn execute(config: &Config, args: RunArgs) -> anyhow::Result<()> {
    if args.output_gsheet_id.is_some() {
        tracing::warn!("--output-gsheet-id is accepted but spreadsheet publishing is not implemented; writing CSVs to --out-dir only");
    }

    let catalog = Catalog::load_csv(&args.products_source)
        .map_err(|e| anyhow::anyhow!("failed to load product catalog: {e}"))?;
    tracing::info!(count = catalog.len(), "Catalog loaded");

    let emails = CustomerEmail::load_csv(&args.emails_source)
        .map_err(|e| anyhow::anyhow!("failed to load emails: {e}"))?;
    tracing::info!(count = emails.len(), "Emails loaded");

    let promotion_specs = match &config.promotion_specs {
        Some(path) => load_promotion_specs(std::path::Path::new(path))
            .map_err(|e| anyhow::anyhow!("failed to load promotion specs: {e}"))?,
        None => Vec::new(),
    };

    let vector_index = index_catalog(&catalog, config.chroma_embedding_dim as usize);

    let strong_provider = create_provider(config, ModelTier::Strong)
        .map_err(|e| anyhow::anyhow!("failed to construct strong LLM provider: {e}"))?;
    let weak_provider = create_provider(config, ModelTier::Weak)
        .map_err(|e| anyhow::anyhow!("failed to construct weak LLM provider: {e}"))?;

    let resources = BatchResources {
        catalog: Arc::new(catalog),
        vector_index: Arc::new(vector_index),
        strong_provider: Arc::from(strong_provider),
        weak_provider: Arc::from(weak_provider),
        retry_config: RetryLoopConfig::default(),
        promotion_specs,
        max_alternatives: hermes_core::nodes::fulfiller::DEFAULT_MAX_ALTERNATIVES,
        signature: SIGNATURE.to_string(),
        brand_voice: BRAND_VOICE.to_string(),
    };

    let limit = if args.limit > 0 { args.limit } else { config.hermes_processing_limit };
    let options = BatchOptions {
        concurrency: args.concurrency,
        limit,
        target_email_ids: args.email_ids,
        stop_on_error: args.stop_on_error,
        out_dir: args.out_dir,
    };

    let summary = run_batch(emails, resources, &options).await?;
    tracing::info!(
        processed = summary.processed,
        total = summary.total_emails,
        failed = summary.failed_email_ids.len(),
        aborted = summary.aborted,
        "Batch run complete"
    );

    if summary.aborted {
        anyhow::bail!(
            "batch aborted after {} of {} emails under --stop-on-error",
            summary.processed,
            summary.total_emails
        );
    }

    Ok(())
}

/// Seed an in-memory vector index from the catalog's name/description/type
/// text, carrying `category` as queryable metadata (spec §5 "Population, if
/// needed, is serialized at process startup").
fn index_catalog(catalog: &Catalog, dim: usize) -> InMemoryVectorIndex {
    let mut index = InMemoryVectorIndex::new(dim);
    for product in catalog.all() {
        let text = format!("{} {} {}", product.name, product.description, product.product_type);
        let mut fields = HashMap::new();
        fields.insert("category".to_string(), product.category.as_str().to_string());
        index.insert(
            &text,
            DocumentMetadata {
                product_id: product.product_id.clone(),
                fields,
            },
        );
    }
    index
}

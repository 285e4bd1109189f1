//! Fulfiller node: reserves stock, builds order lines, applies promotions
//! (spec §4.3).

use serde::Deserialize;

use crate::domain::{
    normalize_id, AlternativeProduct, Catalog, EmailAnalysis, Order, OrderLine, OrderLineStatus, OverallStatus,
    PromotionSpec, ResolutionMethod, SegmentKind, StockkeeperOutput,
};
use crate::error::ToolCallError;
use crate::llm::retry::{generate_structured, RetryLoopConfig};
use crate::llm::LlmProvider;
use crate::promotion::apply_promotions;

/// Candidates below this confidence (and not an exact-id match) get a
/// `[CLARIFICATION NEEDED: …]` prefix on their line description (spec §4.7).
const CLARIFICATION_CONFIDENCE_THRESHOLD: f64 = 0.8;

/// Default number of alternative products attached to an out-of-stock line
/// (spec §4.3 step 2: "up to N (default 2)").
pub const DEFAULT_MAX_ALTERNATIVES: usize = 2;

/// Fixed, non-LLM inputs the Fulfiller needs beyond the email analysis and
/// resolved candidates.
pub struct FulfillerContext<'a> {
    pub catalog: &'a Catalog,
    pub promotion_specs: &'a [PromotionSpec],
    pub max_alternatives: usize,
}

fn system_prompt() -> &'static str {
    "You are the fulfiller stage of a customer-service email pipeline. Given the customer's \
     order-intent product mentions and the catalog candidates already resolved for each one, \
     choose exactly one product id per mention (the one the customer most likely meant) and the \
     quantity they requested. Respond with JSON matching the requested schema only. Never invent \
     a product id that is not among the listed candidates."
}

#[derive(Debug, Deserialize)]
struct DraftLine {
    product_id: String,
    description: String,
    quantity: u32,
}

#[derive(Debug, Deserialize)]
struct DraftOrderResponse {
    #[serde(default)]
    lines: Vec<DraftLine>,
}

fn build_prompt(email_id: &str, analysis: &EmailAnalysis, stockkeeper: &StockkeeperOutput) -> String {
    let mut prompt = format!("Email id: {email_id}\nOrder mentions and their resolved candidates:\n");
    for segment in analysis.segments.iter().filter(|s| s.kind == SegmentKind::Order) {
        for mention in &segment.mentions {
            prompt.push_str(&format!("- mention: {mention:?}\n"));
            if let Some(id) = &mention.product_id {
                if let Some(candidates) = stockkeeper
                    .candidates
                    .iter()
                    .find(|mc| mc.mention.product_id.as_deref() == Some(id.as_str()))
                {
                    for candidate in &candidates.candidates {
                        prompt.push_str(&format!(
                            "  candidate: id={} name={} price={}\n",
                            candidate.product.product_id, candidate.product.name, candidate.product.price
                        ));
                    }
                }
            }
        }
    }
    prompt
}

/// Run the Fulfiller over the order-intent segments of `analysis`.
pub async fn run(
    email_id: &str,
    analysis: &EmailAnalysis,
    stockkeeper: &StockkeeperOutput,
    provider: &dyn LlmProvider,
    retry_config: &RetryLoopConfig,
    ctx: &FulfillerContext<'_>,
) -> Result<Order, ToolCallError> {
    let has_order_mention = analysis
        .segments
        .iter()
        .any(|s| s.kind == SegmentKind::Order && !s.mentions.is_empty());

    if !has_order_mention {
        return Ok(empty_order(email_id));
    }

    let prompt = build_prompt(email_id, analysis, stockkeeper);
    let parsed: DraftOrderResponse =
        generate_structured(provider, system_prompt(), &prompt, None, &[], retry_config).await?;

    let mut lines = Vec::with_capacity(parsed.lines.len());
    for draft in parsed.lines {
        lines.push(build_line(draft, stockkeeper, ctx));
    }

    let mut order = Order {
        email_id: email_id.to_string(),
        overall_status: OverallStatus::NoValidProducts,
        lines,
        total_price: 0.0,
        total_discount: 0.0,
        message: None,
        stock_updated: true,
    };
    order.recompute();

    Ok(apply_promotions(order, ctx.promotion_specs))
}

fn empty_order(email_id: &str) -> Order {
    Order {
        email_id: email_id.to_string(),
        overall_status: OverallStatus::NoValidProducts,
        lines: Vec::new(),
        total_price: 0.0,
        total_discount: 0.0,
        message: None,
        stock_updated: false,
    }
}

fn build_line(draft: DraftLine, stockkeeper: &StockkeeperOutput, ctx: &FulfillerContext<'_>) -> OrderLine {
    let quantity = draft.quantity.max(1);
    let normalized_target = normalize_id(&draft.product_id);

    let candidate = stockkeeper
        .candidates
        .iter()
        .flat_map(|mc| &mc.candidates)
        .find(|c| normalize_id(&c.product.product_id) == normalized_target);

    let Some(candidate) = candidate else {
        let mut line = OrderLine::draft(draft.product_id, draft.description, quantity, 0.0);
        line.status = OrderLineStatus::OutOfStock;
        line.stock_after = 0;
        return line;
    };

    let mut description = draft.description;
    if candidate.method != ResolutionMethod::ExactIdMatch && candidate.confidence < CLARIFICATION_CONFIDENCE_THRESHOLD {
        description = format!("[CLARIFICATION NEEDED: {}] {description}", candidate.product.name);
    }

    let mut line = OrderLine::draft(candidate.product.product_id.clone(), description, quantity, candidate.product.price);

    match ctx.catalog.reserve(&candidate.product.product_id, quantity) {
        Some(stock_after) => {
            line.status = OrderLineStatus::Created;
            line.stock_after = stock_after;
        }
        None => {
            line.status = OrderLineStatus::OutOfStock;
            line.stock_after = ctx.catalog.current_stock(&candidate.product.product_id).unwrap_or(0);
            line.alternatives = ctx
                .catalog
                .alternatives(&candidate.product.product_id, ctx.max_alternatives)
                .into_iter()
                .map(|p| AlternativeProduct {
                    product_id: p.product_id,
                    name: p.name,
                    price: p.price,
                    stock: p.stock,
                })
                .collect();
        }
    }

    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Candidate, Category, MentionCandidates, Product, ProductMention, Season};
    use std::collections::HashSet;

    fn product(id: &str, stock: u32, price: f64) -> Product {
        Product {
            product_id: id.to_string(),
            name: "Test Product".to_string(),
            description: "desc".to_string(),
            category: Category::Accessories,
            product_type: "wallet".to_string(),
            stock,
            seasons: HashSet::from([Season::AllSeasons]),
            price,
            promotion: None,
            promotion_text: None,
            metadata: None,
        }
    }

    fn stockkeeper_with(product: Product, method: ResolutionMethod, confidence: f64) -> StockkeeperOutput {
        StockkeeperOutput {
            candidates: vec![MentionCandidates {
                mention: ProductMention {
                    product_id: Some(product.product_id.clone()),
                    quantity: 1,
                    ..Default::default()
                },
                candidates: vec![Candidate {
                    product,
                    l2_distance: 0.0,
                    method,
                    confidence,
                    metadata: String::new(),
                }],
            }],
            ..Default::default()
        }
    }

    #[test]
    fn build_line_reserves_stock_on_sufficient_supply() {
        let catalog = Catalog::from_products(vec![product("LTH0976", 5, 21.0)]).unwrap();
        let stockkeeper = stockkeeper_with(product("LTH0976", 5, 21.0), ResolutionMethod::ExactIdMatch, 1.0);
        let ctx = FulfillerContext {
            catalog: &catalog,
            promotion_specs: &[],
            max_alternatives: DEFAULT_MAX_ALTERNATIVES,
        };
        let draft = DraftLine {
            product_id: "LTH0976".into(),
            description: "wallet".into(),
            quantity: 2,
        };
        let line = build_line(draft, &stockkeeper, &ctx);
        assert_eq!(line.status, OrderLineStatus::Created);
        assert_eq!(line.stock_after, 3);
        assert_eq!(line.total_price, 42.0);
    }

    #[test]
    fn build_line_out_of_stock_attaches_alternatives() {
        let catalog = Catalog::from_products(vec![
            product("LTH0976", 0, 21.0),
            product("LTH0977", 4, 19.0),
        ])
        .unwrap();
        let mut alt_product = product("LTH0976", 0, 21.0);
        alt_product.category = Category::Accessories;
        let stockkeeper = stockkeeper_with(alt_product, ResolutionMethod::ExactIdMatch, 1.0);
        let ctx = FulfillerContext {
            catalog: &catalog,
            promotion_specs: &[],
            max_alternatives: DEFAULT_MAX_ALTERNATIVES,
        };
        let draft = DraftLine {
            product_id: "LTH0976".into(),
            description: "wallet".into(),
            quantity: 1,
        };
        let line = build_line(draft, &stockkeeper, &ctx);
        assert_eq!(line.status, OrderLineStatus::OutOfStock);
        assert_eq!(line.alternatives.len(), 1);
        assert_eq!(line.alternatives[0].product_id, "LTH0977");
    }

    #[test]
    fn build_line_marks_clarification_for_low_confidence_fuzzy_match() {
        let catalog = Catalog::from_products(vec![product("LTH0976", 5, 21.0)]).unwrap();
        let stockkeeper = stockkeeper_with(product("LTH0976", 5, 21.0), ResolutionMethod::FuzzyNameMatch, 0.5);
        let ctx = FulfillerContext {
            catalog: &catalog,
            promotion_specs: &[],
            max_alternatives: DEFAULT_MAX_ALTERNATIVES,
        };
        let draft = DraftLine {
            product_id: "LTH0976".into(),
            description: "a wallet".into(),
            quantity: 1,
        };
        let line = build_line(draft, &stockkeeper, &ctx);
        assert!(line.needs_clarification());
    }

    #[test]
    fn build_line_unknown_product_is_out_of_stock_with_zero_price() {
        let catalog = Catalog::from_products(vec![product("LTH0976", 5, 21.0)]).unwrap();
        let stockkeeper = StockkeeperOutput::default();
        let ctx = FulfillerContext {
            catalog: &catalog,
            promotion_specs: &[],
            max_alternatives: DEFAULT_MAX_ALTERNATIVES,
        };
        let draft = DraftLine {
            product_id: "ZZZ9999".into(),
            description: "unknown".into(),
            quantity: 1,
        };
        let line = build_line(draft, &stockkeeper, &ctx);
        assert_eq!(line.status, OrderLineStatus::OutOfStock);
        assert_eq!(line.stock_after, 0);
        assert_eq!(line.base_price, 0.0);
    }
}

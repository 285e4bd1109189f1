//! Types produced by the product resolver (Stockkeeper, spec §3, §4.4).

use serde::{Deserialize, Serialize};

use super::catalog::Product;
use super::email::ProductMention;

/// How a candidate was produced. Spec §4.4 only actively produces the first
/// three values; the rest are carried through (spec §9 supplement, grounded
/// in `examples/original_source/hermes/tools/catalog_tools.py`) so that
/// catalog-tool extensions outside core scope can report through the same
/// shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMethod {
    ExactIdMatch,
    SemanticSearch,
    FuzzyNameMatch,
    ComplementaryCategoryMatch,
    PriceSimilarityMatch,
    FilteredSearch,
    OccasionSearch,
}

/// A single resolved candidate for one [`ProductMention`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub product: Product,
    /// L2 distance; canonical gating value (spec §9 Open Questions).
    pub l2_distance: f64,
    pub method: ResolutionMethod,
    /// Presentation-level confidence, never used for gating.
    pub confidence: f64,
    /// Human-readable, semicolon-joined summary (spec §4.4).
    pub metadata: String,
}

/// One mention paired with its ordered candidate list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MentionCandidates {
    pub mention: ProductMention,
    pub candidates: Vec<Candidate>,
}

/// Per-run resolution summary (spec §4.4 "Aggregate metadata").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolutionSummary {
    pub total_mentions: usize,
    pub resolution_attempts: usize,
    pub elapsed_ms: u64,
    pub with_candidates: usize,
    pub without_candidates: usize,
}

/// The Stockkeeper's terminal output (spec §3).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StockkeeperOutput {
    pub candidates: Vec<MentionCandidates>,
    pub unresolved: Vec<ProductMention>,
    pub exact_id_misses: Vec<ProductMention>,
    pub metadata: String,
    #[serde(skip)]
    pub summary: ResolutionSummary,
}

impl StockkeeperOutput {
    /// The first candidate for a mention whose `product_id` matches, if any
    /// (used by the Fulfiller to pick the resolved product for a draft line,
    /// spec §4.3 step 1).
    pub fn first_candidate_for(&self, product_id: &str) -> Option<&Product> {
        self.candidates
            .iter()
            .find(|mc| mc.mention.product_id.as_deref() == Some(product_id))
            .and_then(|mc| mc.candidates.first())
            .map(|c| &c.product)
    }

    /// True if the given product id was recorded as an exact-id miss (spec
    /// §4.6: such ids receive a canonical "not found" answer from the
    /// Advisor and are never looked up again).
    pub fn is_exact_id_miss(&self, product_id: &str) -> bool {
        self.exact_id_misses
            .iter()
            .any(|m| m.product_id.as_deref() == Some(product_id))
    }
}

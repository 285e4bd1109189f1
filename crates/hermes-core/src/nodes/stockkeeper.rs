//! Stockkeeper node: resolves each product mention to 0..K candidates
//! (spec §4.4). Thin wrapper over [`crate::resolver::resolve_mentions`] —
//! this node has no LLM call of its own.

use crate::domain::{Catalog, EmailAnalysis, StockkeeperOutput};
use crate::resolver;
use crate::vector::VectorIndex;

/// Default number of candidates requested per mention (spec §4.4 "default K=3").
pub const DEFAULT_K: usize = 3;

/// Run the Stockkeeper over every mention in `analysis`.
pub fn run(analysis: &EmailAnalysis, catalog: &Catalog, index: &dyn VectorIndex) -> StockkeeperOutput {
    let mentions: Vec<_> = analysis.all_mentions().into_iter().cloned().collect();
    resolver::resolve_mentions(&mentions, catalog, index, DEFAULT_K)
}

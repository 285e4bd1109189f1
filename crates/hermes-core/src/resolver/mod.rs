//! Product resolver (Stockkeeper core logic, spec §4.4).
//!
//! Resolves each [`ProductMention`] to 0..K candidate products, combining
//! exact-id lookup, fuzzy-id repair, semantic vector search, and fuzzy name
//! matching, with an L2-distance gate.

use std::collections::HashMap;
use std::time::Instant;

use crate::domain::{
    normalize_id, Candidate, Catalog, MentionCandidates, Product, ProductMention,
    ResolutionMethod, ResolutionSummary, StockkeeperOutput,
};
use crate::vector::{DocumentMetadata, VectorIndex, WhereClause};

/// Default number of candidates returned per mention.
pub const DEFAULT_K: usize = 3;
/// L2 distance above which a candidate is discarded (spec §4.4 step 4, §8).
pub const L2_THRESHOLD: f64 = 1.2;
/// Maximum Damerau-free edit distance tolerated for fuzzy id repair
/// (spec §4.4 step 2, e.g. `"CBT 89 01"` -> `CBT8901`).
const FUZZY_ID_MAX_DISTANCE: usize = 2;

/// Resolves all mentions in one email against a catalog snapshot and vector
/// index, producing the Stockkeeper's terminal output.
pub fn resolve_mentions(
    mentions: &[ProductMention],
    catalog: &Catalog,
    index: &dyn VectorIndex,
    k: usize,
) -> StockkeeperOutput {
    let started = Instant::now();
    let mut output = StockkeeperOutput::default();
    let mut resolution_attempts = 0usize;

    for mention in mentions {
        if mention.is_empty_mention() {
            output.unresolved.push(mention.clone());
            continue;
        }
        resolution_attempts += 1;

        if let Some(id) = mention.product_id.as_deref() {
            if let Some(product) = catalog.get(id) {
                let candidate = exact_candidate(product, mention);
                output.candidates.push(MentionCandidates {
                    mention: mention.clone(),
                    candidates: vec![candidate],
                });
                continue;
            }

            // Exact match missed. Always record the miss (spec step 2), then
            // attempt fuzzy id repair before falling back to semantic search.
            output.exact_id_misses.push(mention.clone());
            if let Some(product) = fuzzy_id_match(id, catalog) {
                let candidate = exact_candidate(product, mention);
                output.candidates.push(MentionCandidates {
                    mention: mention.clone(),
                    candidates: vec![candidate],
                });
                continue;
            }
        }

        let candidates = semantic_and_name_search(mention, catalog, index, k);
        if candidates.is_empty() {
            output.unresolved.push(mention.clone());
        } else {
            output.candidates.push(MentionCandidates {
                mention: mention.clone(),
                candidates,
            });
        }
    }

    let with_candidates = output.candidates.iter().filter(|mc| !mc.candidates.is_empty()).count();
    output.summary = ResolutionSummary {
        total_mentions: mentions.len(),
        resolution_attempts,
        elapsed_ms: started.elapsed().as_millis() as u64,
        with_candidates,
        without_candidates: mentions.len() - with_candidates,
    };
    output.metadata = format!(
        "Total mentions: {}; resolution attempts: {}; elapsed: {}ms; with candidates: {}; without candidates: {}",
        output.summary.total_mentions,
        output.summary.resolution_attempts,
        output.summary.elapsed_ms,
        output.summary.with_candidates,
        output.summary.without_candidates,
    );
    output
}

fn exact_candidate(product: Product, mention: &ProductMention) -> Candidate {
    Candidate {
        metadata: candidate_metadata(1.0, ResolutionMethod::ExactIdMatch, None, 0.0, mention),
        product,
        l2_distance: 0.0,
        method: ResolutionMethod::ExactIdMatch,
        confidence: 1.0,
    }
}

/// Spec §4.4 step 2: normalize both sides and accept a single catalog id
/// within a small edit-distance bound, e.g. `"CBT 89 01"` -> `CBT8901`.
fn fuzzy_id_match(raw_id: &str, catalog: &Catalog) -> Option<Product> {
    let normalized = normalize_id(raw_id);
    let mut best: Option<(Product, usize)> = None;
    let mut tie = false;
    for product in catalog.all() {
        let distance = strsim::levenshtein(&normalized, &product.product_id);
        if distance > FUZZY_ID_MAX_DISTANCE {
            continue;
        }
        match &best {
            None => best = Some((product, distance)),
            Some((_, best_distance)) => {
                if distance < *best_distance {
                    best = Some((product, distance));
                    tie = false;
                } else if distance == *best_distance {
                    tie = true;
                }
            }
        }
    }
    if tie {
        return None;
    }
    best.map(|(p, _)| p)
}

/// Spec §4.4 step 3: form a query string, optionally filter by category,
/// run both vector search and fuzzy name match, merge de-duplicating by
/// product id (keeping the lowest L2), then gate by threshold.
fn semantic_and_name_search(
    mention: &ProductMention,
    catalog: &Catalog,
    index: &dyn VectorIndex,
    k: usize,
) -> Vec<Candidate> {
    let query = build_query(mention);
    if query.is_empty() {
        return Vec::new();
    }

    let where_clause: Option<WhereClause> = mention.product_category.as_ref().map(|cat| {
        let mut filter = HashMap::new();
        filter.insert("category".to_string(), cat.clone());
        filter
    });

    let mut merged: HashMap<String, (f64, ResolutionMethod)> = HashMap::new();

    for (doc, l2) in index.query(&query, k, where_clause.as_ref()) {
        merge_candidate(&mut merged, doc, l2, ResolutionMethod::SemanticSearch);
    }

    for (product, similarity) in fuzzy_name_matches(&query, catalog, where_clause.as_ref(), k) {
        // Fuzzy name match produces a normalized similarity in [0,1];
        // present it on the same L2 axis so merge-by-lowest-distance is
        // meaningful: distance = 1 - similarity.
        let l2 = 1.0 - similarity;
        let doc = DocumentMetadata {
            product_id: product.product_id.clone(),
            fields: HashMap::new(),
        };
        merge_candidate(&mut merged, doc, l2, ResolutionMethod::FuzzyNameMatch);
    }

    let mut candidates: Vec<Candidate> = merged
        .into_iter()
        .filter(|(_, (l2, _))| *l2 <= L2_THRESHOLD)
        .filter_map(|(product_id, (l2, method))| {
            catalog.get(&product_id).map(|product| {
                let confidence = (1.0 - l2 / 2.0).clamp(0.0, 1.0);
                Candidate {
                    metadata: candidate_metadata(confidence, method, Some(&query), l2, mention),
                    product,
                    l2_distance: l2,
                    method,
                    confidence,
                }
            })
        })
        .collect();

    candidates.sort_by(|a, b| {
        a.l2_distance
            .partial_cmp(&b.l2_distance)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.product.product_id.cmp(&b.product.product_id))
    });
    candidates.truncate(k);
    candidates
}

fn merge_candidate(
    merged: &mut HashMap<String, (f64, ResolutionMethod)>,
    doc: DocumentMetadata,
    l2: f64,
    method: ResolutionMethod,
) {
    merged
        .entry(doc.product_id)
        .and_modify(|existing| {
            if l2 < existing.0 {
                *existing = (l2, method);
            }
        })
        .or_insert((l2, method));
}

fn fuzzy_name_matches(
    query: &str,
    catalog: &Catalog,
    where_clause: Option<&WhereClause>,
    k: usize,
) -> Vec<(Product, f64)> {
    let mut scored: Vec<(Product, f64)> = catalog
        .all()
        .into_iter()
        .filter(|p| {
            where_clause
                .map(|f| f.get("category").map(|c| c == p.category.as_str()).unwrap_or(true))
                .unwrap_or(true)
        })
        .map(|p| {
            let similarity = strsim::normalized_levenshtein(&query.to_lowercase(), &p.name.to_lowercase());
            (p, similarity)
        })
        .collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(k);
    scored
}

fn build_query(mention: &ProductMention) -> String {
    [
        mention.product_name.as_deref(),
        mention.product_description.as_deref(),
        mention.product_type.as_deref(),
    ]
    .into_iter()
    .flatten()
    .filter(|s| !s.trim().is_empty())
    .collect::<Vec<_>>()
    .join(" ")
}

fn candidate_metadata(
    confidence: f64,
    method: ResolutionMethod,
    query: Option<&str>,
    l2: f64,
    mention: &ProductMention,
) -> String {
    let method_label = match method {
        ResolutionMethod::ExactIdMatch => "Found through exact id match",
        ResolutionMethod::SemanticSearch => "Found through semantic search",
        ResolutionMethod::FuzzyNameMatch => "Found through fuzzy name match",
        ResolutionMethod::ComplementaryCategoryMatch => "Found through complementary category match",
        ResolutionMethod::PriceSimilarityMatch => "Found through price similarity match",
        ResolutionMethod::FilteredSearch => "Found through filtered search",
        ResolutionMethod::OccasionSearch => "Found through occasion search",
    };
    let mut parts = vec![
        format!("Resolution confidence: {}%", (confidence * 100.0).round() as i64),
        method_label.to_string(),
    ];
    if let Some(q) = query {
        parts.push(format!("Search query: '{q}'"));
        parts.push(format!("Similarity score: {l2:.3}"));
    }
    parts.push(format!("Requested quantity: {}", mention.quantity));
    parts.push(format!("Original mention: {}", mention_summary(mention)));
    parts.join("; ")
}

fn mention_summary(mention: &ProductMention) -> String {
    mention
        .product_name
        .clone()
        .or_else(|| mention.product_id.clone())
        .or_else(|| mention.product_description.clone())
        .unwrap_or_else(|| "unspecified product".to_string())
}

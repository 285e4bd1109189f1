//! Vector index abstraction (spec §6 "Vector index contract").
//!
//! The spec explicitly scopes the embedding service and vector index
//! implementation out of the core (§1 "Explicitly out of scope"). This
//! module supplies the swappable contract plus one concrete, in-memory
//! implementation so the workspace builds and runs end to end (SPEC_FULL.md
//! "AMBIENT STACK"): a deterministic bag-of-words embedding over catalog
//! text, queried by L2 distance. A production deployment would swap this
//! for a real embedding-backed client without touching the resolver.

use std::collections::HashMap;

/// Metadata carried alongside each indexed document (here: one catalog
/// product per document).
#[derive(Debug, Clone)]
pub struct DocumentMetadata {
    pub product_id: String,
    pub fields: HashMap<String, String>,
}

/// Equality filter applied to [`DocumentMetadata::fields`] before ranking.
pub type WhereClause = HashMap<String, String>;

/// Given `(query_text, k, optional where-clause)`, returns up to `k`
/// `(document_metadata, l2_distance)` pairs sorted ascending by distance
/// (spec §6).
pub trait VectorIndex: Send + Sync {
    fn query(&self, query_text: &str, k: usize, where_clause: Option<&WhereClause>) -> Vec<(DocumentMetadata, f64)>;
}

/// Deterministic embedding: a fixed-dimension bag-of-words hash vector,
/// L2-normalized. Same-dimension text maps to comparable points; it is not
/// a semantic embedding, but it is stable, dependency-free, and sufficient
/// to exercise the resolver's L2-gating and ranking logic.
pub fn embed_text(text: &str, dim: usize) -> Vec<f32> {
    let mut vector = vec![0.0f32; dim.max(1)];
    for token in text.to_lowercase().split_whitespace() {
        let bucket = (hash_token(token) as usize) % vector.len();
        vector[bucket] += 1.0;
    }
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
    vector
}

fn hash_token(token: &str) -> u64 {
    // FNV-1a: simple, deterministic, no external dependency needed for a
    // stand-in embedding.
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in token.bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

/// Euclidean (L2) distance between two equal-length vectors.
pub fn l2_distance(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| ((x - y) as f64).powi(2))
        .sum::<f64>()
        .sqrt()
}

struct IndexedDocument {
    metadata: DocumentMetadata,
    embedding: Vec<f32>,
}

/// In-memory [`VectorIndex`] populated once at process startup from the
/// catalog (spec §5 "Population, if needed, is serialized at process
/// startup").
pub struct InMemoryVectorIndex {
    dim: usize,
    documents: Vec<IndexedDocument>,
}

impl InMemoryVectorIndex {
    /// Construct an empty index with the configured embedding dimension
    /// (`chroma_embedding_dim` in spec §6).
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            documents: Vec::new(),
        }
    }

    /// Index one document's text under the given metadata.
    pub fn insert(&mut self, text: &str, metadata: DocumentMetadata) {
        let embedding = embed_text(text, self.dim);
        self.documents.push(IndexedDocument { metadata, embedding });
    }

    /// Number of indexed documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl VectorIndex for InMemoryVectorIndex {
    fn query(&self, query_text: &str, k: usize, where_clause: Option<&WhereClause>) -> Vec<(DocumentMetadata, f64)> {
        let query_embedding = embed_text(query_text, self.dim);
        let mut scored: Vec<(DocumentMetadata, f64)> = self
            .documents
            .iter()
            .filter(|doc| match where_clause {
                Some(filter) => filter
                    .iter()
                    .all(|(k, v)| doc.metadata.fields.get(k).map(|dv| dv == v).unwrap_or(false)),
                None => true,
            })
            .map(|doc| (doc.metadata.clone(), l2_distance(&query_embedding, &doc.embedding)))
            .collect();
        scored.sort_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.product_id.cmp(&b.0.product_id))
        });
        scored.truncate(k);
        scored
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_returns_ascending_l2_distance() {
        let mut index = InMemoryVectorIndex::new(32);
        index.insert(
            "Alpine Explorer backpack hiking",
            DocumentMetadata {
                product_id: "A0001".into(),
                fields: HashMap::new(),
            },
        );
        index.insert(
            "Leather Bifold Wallet",
            DocumentMetadata {
                product_id: "A0002".into(),
                fields: HashMap::new(),
            },
        );
        let results = index.query("Alpine Explorer backpack", 2, None);
        assert_eq!(results.len(), 2);
        assert!(results[0].1 <= results[1].1);
        assert_eq!(results[0].0.product_id, "A0001");
    }

    #[test]
    fn where_clause_filters_by_metadata() {
        let mut index = InMemoryVectorIndex::new(16);
        let mut bag_fields = HashMap::new();
        bag_fields.insert("category".to_string(), "Bags".to_string());
        index.insert("tote bag", DocumentMetadata { product_id: "B0001".into(), fields: bag_fields });
        let mut shirt_fields = HashMap::new();
        shirt_fields.insert("category".to_string(), "Shirts".to_string());
        index.insert("cotton shirt", DocumentMetadata { product_id: "S0001".into(), fields: shirt_fields });

        let mut filter = HashMap::new();
        filter.insert("category".to_string(), "Bags".to_string());
        let results = index.query("bag", 5, Some(&filter));
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0.product_id, "B0001");
    }

    #[test]
    fn identical_text_has_zero_distance() {
        assert_eq!(l2_distance(&embed_text("hello world", 8), &embed_text("hello world", 8)), 0.0);
    }
}

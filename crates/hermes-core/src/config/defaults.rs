//! Default values for configuration fields.
//!
//! These defaults match the values specified in the agent pipeline's
//! configuration contract. Operators only need to supply an API key and,
//! optionally, a promotion spec path.

pub(super) fn llm_provider() -> String {
    "openai".to_string()
}

pub(super) fn llm_strong_model_name() -> String {
    "gpt-4o".to_string()
}

pub(super) fn llm_weak_model_name() -> String {
    "gpt-4o-mini".to_string()
}

pub(super) fn embedding_model_name() -> String {
    "text-embedding-3-small".to_string()
}

pub(super) fn chroma_embedding_dim() -> u32 {
    1536
}

pub(super) fn chroma_db_path() -> String {
    "~/.hermes/chroma".to_string()
}

pub(super) fn chroma_collection_name() -> String {
    "hermes-catalog".to_string()
}

pub(super) fn output_spreadsheet_name() -> String {
    "Hermes Results".to_string()
}

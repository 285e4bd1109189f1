//! Types produced by the Composer node (spec §4.7).

use serde::{Deserialize, Serialize};

/// The Composer's terminal output (spec §4.7) — the customer-facing reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComposerOutput {
    pub email_id: String,
    pub subject: String,
    pub response_body: String,
    pub tone: String,
    pub response_points: Vec<String>,
}

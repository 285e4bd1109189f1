//! Per-email workflow state accumulated across graph nodes (spec §3, §4.1).

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::advisor::AdvisorOutput;
use super::composer::ComposerOutput;
use super::email::{CustomerEmail, EmailAnalysis};
use super::order::Order;
use super::resolution::StockkeeperOutput;

/// Names the five pipeline nodes for error attribution and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeName {
    Classifier,
    Stockkeeper,
    Fulfiller,
    Advisor,
    Composer,
}

impl fmt::Display for NodeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NodeName::Classifier => "classifier",
            NodeName::Stockkeeper => "stockkeeper",
            NodeName::Fulfiller => "fulfiller",
            NodeName::Advisor => "advisor",
            NodeName::Composer => "composer",
        };
        f.write_str(s)
    }
}

/// What a node's supervisor records when the node fails (spec §4.1, §7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub node: NodeName,
    pub message: String,
    /// The `ErrorKind` name from spec §7 (e.g. "ToolCallError", "NodeException").
    pub kind: String,
    pub details: Option<String>,
}

/// Accumulates one email's pipeline state across node executions.
///
/// Each per-node slot is write-once: a node either writes its own slot, or
/// (on failure) writes an entry to `errors` under its own [`NodeName`] and
/// leaves its slot empty. Because each node writes only its own slot, state
/// merges across the fan-out (`{Fulfiller, Advisor}`) are disjoint and
/// therefore associative regardless of interleaving (spec §4.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowState {
    pub email: CustomerEmail,
    pub classifier: Option<EmailAnalysis>,
    pub stockkeeper: Option<StockkeeperOutput>,
    pub fulfiller: Option<Order>,
    pub advisor: Option<AdvisorOutput>,
    pub composer: Option<ComposerOutput>,
    pub errors: HashMap<NodeName, ErrorRecord>,
}

impl WorkflowState {
    /// Start a new, empty state for one email.
    pub fn new(email: CustomerEmail) -> Self {
        Self {
            email,
            classifier: None,
            stockkeeper: None,
            fulfiller: None,
            advisor: None,
            composer: None,
            errors: HashMap::new(),
        }
    }

    /// Record a node failure, leaving its output slot empty (spec §4.1
    /// error containment; this function never panics or re-raises).
    pub fn record_error(&mut self, node: NodeName, kind: impl Into<String>, message: impl Into<String>, details: Option<String>) {
        self.errors.insert(
            node,
            ErrorRecord {
                node,
                kind: kind.into(),
                message: message.into(),
                details,
            },
        );
    }

    /// True if the named node's slot is empty and an error record exists
    /// (the invariant checked by spec §8 "Error containment").
    pub fn failed_cleanly(&self, node: NodeName) -> bool {
        let slot_empty = match node {
            NodeName::Classifier => self.classifier.is_none(),
            NodeName::Stockkeeper => self.stockkeeper.is_none(),
            NodeName::Fulfiller => self.fulfiller.is_none(),
            NodeName::Advisor => self.advisor.is_none(),
            NodeName::Composer => self.composer.is_none(),
        };
        slot_empty && self.errors.contains_key(&node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_error_leaves_slot_empty_and_sets_error() {
        let mut state = WorkflowState::new(CustomerEmail::new("e1", None, "hi"));
        state.record_error(NodeName::Classifier, "NodeException", "boom", None);
        assert!(state.failed_cleanly(NodeName::Classifier));
        assert!(state.classifier.is_none());
    }

    #[test]
    fn node_name_display_matches_snake_case() {
        assert_eq!(NodeName::Stockkeeper.to_string(), "stockkeeper");
    }
}

//! The five pipeline nodes (spec §4.5-§4.7, §2): Classifier, Stockkeeper,
//! Fulfiller, Advisor, Composer. Each module exposes a `run` function that
//! takes its inputs directly and returns its own output type (or a
//! [`crate::error::ToolCallError`] for the LLM-backed nodes) — the graph
//! runner (`crate::graph`) is responsible for wiring these into
//! `WorkflowState` and containing failures.

pub mod advisor;
pub mod classifier;
pub mod composer;
pub mod fulfiller;
pub mod stockkeeper;

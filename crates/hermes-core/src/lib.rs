//! Core library for the Hermes customer-service email agent pipeline.
//!
//! This crate contains the agent orchestration graph, the structured-output
//! retry loop, the product resolver, the stock ledger and promotion engine,
//! and the configuration/error types shared by the `hermes` CLI binary.
pub mod batch;
pub mod config;
pub mod domain;
pub mod error;
pub mod graph;
pub mod io;
pub mod llm;
pub mod nodes;
pub mod promotion;
pub mod resolver;
pub mod vector;

pub use error::*;

/// Returns the version of the hermes-core library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

//! Output file I/O: the four merged assignment CSVs and the per-email YAML
//! state dump (spec §6 "Output file layout"). Not exercised by the graph
//! itself — the batch driver (`crate::batch`) calls into this module once
//! per run, after all emails have been processed.

pub mod csv_tables;
pub mod results;

pub use csv_tables::{write_output_csvs, EmailClassificationRow, OrderStatusRow, ResponseRow};
pub use results::save_workflow_result;

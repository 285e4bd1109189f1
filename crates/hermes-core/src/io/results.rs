//! Per-email debugging dump: the full terminal `WorkflowState` written as
//! YAML to `results/<email_id>.yml` (spec §6).

use std::path::Path;

use crate::domain::WorkflowState;
use crate::error::IoError;

/// Write `state` to `results_dir/<email_id>.yml`, creating `results_dir` if
/// needed. Each email gets its own path, so concurrent writes across
/// emails never contend (spec §5: "per-email YAML dumps written to a
/// per-email path (no contention)").
pub fn save_workflow_result(results_dir: &Path, state: &WorkflowState) -> Result<(), IoError> {
    std::fs::create_dir_all(results_dir).map_err(|source| IoError::Path {
        path: results_dir.display().to_string(),
        source,
    })?;

    let path = results_dir.join(format!("{}.yml", state.email.email_id));
    let yaml = serde_yaml::to_string(state)?;
    std::fs::write(&path, yaml).map_err(|source| IoError::Path {
        path: path.display().to_string(),
        source,
    })?;
    Ok(())
}

//! # Terraform Status
//!
//! Operator-owned status of a run, committed through the status subresource.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Lifecycle status of a workflow/run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum TerraformRunStatus {
    /// Child resources were created and the run job was submitted
    Started,
    /// The run job reported an active pod
    Running,
    /// The run job finished successfully
    Completed,
    /// The run job failed, or child-resource creation failed
    Failed,
    /// One or more dependencies have not completed their current generation
    WaitingForDependency,
    /// The object was marked for deletion (recorded in metrics only)
    Deleted,
}

impl std::fmt::Display for TerraformRunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TerraformRunStatus::Started => "Started",
            TerraformRunStatus::Running => "Running",
            TerraformRunStatus::Completed => "Completed",
            TerraformRunStatus::Failed => "Failed",
            TerraformRunStatus::WaitingForDependency => "WaitingForDependency",
            TerraformRunStatus::Deleted => "Deleted",
        };
        f.write_str(s)
    }
}

/// Observed state of a Terraform run
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TerraformStatus {
    /// Run id of the current execution attempt, scoping all child resources
    #[serde(default)]
    pub current_run_id: String,
    /// Run id of the prior attempt, cleaned up after a re-run
    #[serde(default)]
    pub previous_run_id: String,
    /// Name of the secret holding the module outputs
    #[serde(default)]
    pub output_secret_name: String,
    /// Generation last acted upon by the operator
    #[serde(default)]
    pub observed_generation: i64,
    /// Current lifecycle status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_status: Option<TerraformRunStatus>,
    /// Human-readable detail for the current status
    #[serde(default)]
    pub message: String,
    /// Time the current attempt transitioned to Started (Unix-date format)
    #[serde(default, rename = "startTime")]
    pub started_time: String,
    /// Time the current attempt completed or failed (Unix-date format)
    #[serde(default)]
    pub completion_time: String,
}

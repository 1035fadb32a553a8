//! # Status Writer
//!
//! Commits run status transitions through the status subresource. Every
//! reconciliation branch writes status as its last action; write failures
//! propagate to the framework and are retried.

use crate::constants::STATUS_TIME_LAYOUT;
use crate::controller::reconciler::Reconciler;
use crate::crd::{Terraform, TerraformRunStatus};
use crate::observability::metrics;
use crate::store::StoreError;
use chrono::{DateTime, NaiveDateTime, Utc};
use kube::ResourceExt;

impl Reconciler {
    /// Transitions the run to the given status and commits it.
    ///
    /// Started stamps the start time and the output secret name; terminal
    /// statuses stamp the completion time. Completed, Failed, and
    /// WaitingForDependency are counted in the status metric.
    pub(crate) async fn update_run_status(
        &self,
        run: &mut Terraform,
        status: TerraformRunStatus,
    ) -> Result<(), StoreError> {
        let name = run.name_any();
        let namespace = run.namespace().unwrap_or_default();
        let generation = run.metadata.generation.unwrap_or(0);
        let output_secret_name = run.output_secret_name();

        let run_status = run.status.get_or_insert_with(Default::default);
        run_status.run_status = Some(status);
        run_status.observed_generation = generation;

        if status == TerraformRunStatus::Started {
            run_status.started_time = format_status_time(Utc::now());
            run_status.output_secret_name = output_secret_name;
        }

        if matches!(
            status,
            TerraformRunStatus::Completed | TerraformRunStatus::Failed
        ) {
            run_status.completion_time = format_status_time(Utc::now());
        }

        if matches!(
            status,
            TerraformRunStatus::Completed
                | TerraformRunStatus::Failed
                | TerraformRunStatus::WaitingForDependency
        ) {
            metrics::record_status(&name, &namespace, status);
        }

        self.store().update_run_status(run).await
    }
}

/// Formats a status timestamp in the Unix-date layout
pub(crate) fn format_status_time(time: DateTime<Utc>) -> String {
    time.format(STATUS_TIME_LAYOUT).to_string()
}

/// Parses a status timestamp; `None` when the field is empty or malformed
pub fn parse_status_time(value: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value, STATUS_TIME_LAYOUT)
        .ok()
        .map(|t| t.and_utc())
}

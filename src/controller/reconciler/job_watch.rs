//! # Job Watch
//!
//! Polls the run job of a started run and drives the terminal transitions.

use crate::controller::reconciler::{parse_status_time, Reconciler, ReconcilerError};
use crate::crd::{Terraform, TerraformRunStatus};
use crate::observability::metrics;
use crate::store::EventKind;
use k8s_openapi::api::batch::v1::Job;
use kube::runtime::controller::Action;
use kube::ResourceExt;
use tracing::{error, info, warn};

impl Reconciler {
    /// Handles a run in Started or Running: loads the owned job and follows
    /// its pod counters. A missing job surfaces as an error; the next watch
    /// event re-drives the reconciliation.
    pub(super) async fn handle_job_watch(
        &self,
        run: &mut Terraform,
    ) -> Result<Action, ReconcilerError> {
        let name = run.name_any();
        let namespace = run.namespace().unwrap_or_default();
        let job_name = run.job_name(run.current_run_id());

        let job = self.store().get_job(&namespace, &job_name).await?;

        info!(job = %job_name, "waiting for terraform job run to complete");

        let started_time = run
            .status
            .as_ref()
            .map(|s| s.started_time.as_str())
            .unwrap_or("");
        let started = parse_status_time(started_time);
        if started.is_none() {
            warn!(started_time, "failed to parse run start time");
        }

        let result = self.observe_job(run, &job).await;

        // Duration is observed on every exit of the watch, whichever branch ran
        if let Some(started) = started {
            metrics::record_duration(&name, &namespace, started);
        }

        result
    }

    async fn observe_job(&self, run: &mut Terraform, job: &Job) -> Result<Action, ReconcilerError> {
        let job_status = job.status.clone().unwrap_or_default();
        let run_id = run.current_run_id().to_string();

        // job is still running
        if job_status.active.unwrap_or(0) > 0 {
            if run.is_running() {
                return Ok(Action::requeue(self.requeue_job_watch()));
            }

            self.publish(
                run,
                EventKind::Normal,
                "Running",
                &format!("Run({run_id}) waiting for run job to finish"),
            )
            .await;

            self.update_run_status(run, TerraformRunStatus::Running)
                .await?;
            return Ok(Action::await_change());
        }

        // job is successful
        if job_status.succeeded.unwrap_or(0) > 0 {
            info!("terraform run job completed successfully");

            if run.spec.delete_completed_jobs {
                info!("deleting completed job");

                match self.delete_completed_job(run).await {
                    Ok(()) => {
                        self.publish(
                            run,
                            EventKind::Normal,
                            "Cleanup",
                            &format!("Run({run_id}) kubernetes job was deleted"),
                        )
                        .await;
                    }
                    Err(err) => {
                        error!(%err, "failed to delete terraform run job after completion");
                    }
                }
            }

            if run.spec.destroy {
                self.publish(
                    run,
                    EventKind::Normal,
                    "Destroyed",
                    &format!("Run({run_id}) completed with terraform destroy"),
                )
                .await;
            } else {
                self.publish(
                    run,
                    EventKind::Normal,
                    "Completed",
                    &format!("Run({run_id}) completed"),
                )
                .await;
            }

            self.update_run_status(run, TerraformRunStatus::Completed)
                .await?;
            return Ok(Action::await_change());
        }

        // job failed
        if job_status.failed.unwrap_or(0) > 0 {
            error!("terraform run job failed to complete");

            self.publish(
                run,
                EventKind::Warning,
                "Failed",
                &format!("Run({run_id}) failed"),
            )
            .await;

            self.update_run_status(run, TerraformRunStatus::Failed)
                .await?;
            return Ok(Action::await_change());
        }

        // no pod activity observed yet
        Ok(Action::requeue(self.requeue_job_watch()))
    }

    /// Deletes the current attempt's job with foreground propagation
    async fn delete_completed_job(&self, run: &Terraform) -> Result<(), crate::store::StoreError> {
        let namespace = run.namespace().unwrap_or_default();
        self.store()
            .delete_job(&namespace, &run.job_name(run.current_run_id()))
            .await
    }
}

//! # Run Lifecycle State
//!
//! Classification predicates over a run's status, evaluated by the
//! reconciler's dispatch, plus the run-id bump and finalizer helpers.

use crate::crd::{Terraform, TerraformRunStatus, TERRAFORM_FINALIZER};
use crate::resources::naming;
use kube::ResourceExt;

/// Length of the random run-id token
const RUN_ID_LEN: usize = 6;

impl Terraform {
    /// The run was created for the first time and has no run id yet
    pub fn is_submitted(&self) -> bool {
        self.current_run_id().is_empty()
    }

    /// The run job was submitted and has not reached a terminal status
    pub fn is_started(&self) -> bool {
        matches!(
            self.run_status(),
            Some(TerraformRunStatus::Started) | Some(TerraformRunStatus::Running)
        )
    }

    /// The run job reported an active pod
    pub fn is_running(&self) -> bool {
        self.run_status() == Some(TerraformRunStatus::Running)
    }

    /// The spec was edited after the last acted-upon generation
    pub fn is_updated(&self) -> bool {
        let generation = self.metadata.generation.unwrap_or(0);
        let observed = self
            .status
            .as_ref()
            .map(|s| s.observed_generation)
            .unwrap_or(0);

        generation > 0 && generation > observed
    }

    /// The run is waiting for a dependency to complete
    pub fn is_waiting(&self) -> bool {
        self.run_status() == Some(TerraformRunStatus::WaitingForDependency)
    }

    /// The run failed
    pub fn has_errored(&self) -> bool {
        self.run_status() == Some(TerraformRunStatus::Failed)
    }

    /// The object was marked for deletion
    pub fn is_being_deleted(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }

    /// Whether the operator's finalizer is registered on the object
    pub fn has_finalizer(&self) -> bool {
        self.finalizers().iter().any(|f| f == TERRAFORM_FINALIZER)
    }

    /// Registers the operator's finalizer
    pub fn add_finalizer(&mut self) {
        if !self.has_finalizer() {
            self.finalizers_mut().push(TERRAFORM_FINALIZER.to_string());
        }
    }

    /// Removes the operator's finalizer, unblocking deletion
    pub fn remove_finalizer(&mut self) {
        self.finalizers_mut().retain(|f| f != TERRAFORM_FINALIZER);
    }

    /// Allocates a fresh run id, moving the current one into `previousRunId`
    pub fn bump_run_id(&mut self) {
        let status = self.status.get_or_insert_with(Default::default);

        if !status.current_run_id.is_empty() {
            status.previous_run_id = status.current_run_id.clone();
        }
        status.current_run_id = naming::random_run_id(RUN_ID_LEN);
    }

    /// Run id of the current attempt, empty until first submission
    pub fn current_run_id(&self) -> &str {
        self.status
            .as_ref()
            .map(|s| s.current_run_id.as_str())
            .unwrap_or("")
    }

    /// Run id of the prior attempt, empty when there was none
    pub fn previous_run_id(&self) -> &str {
        self.status
            .as_ref()
            .map(|s| s.previous_run_id.as_str())
            .unwrap_or("")
    }

    /// Current lifecycle status
    pub fn run_status(&self) -> Option<TerraformRunStatus> {
        self.status.as_ref().and_then(|s| s.run_status)
    }

    /// Name of the job of a given attempt of this run
    pub fn job_name(&self, run_id: &str) -> String {
        naming::unique_resource_name(&self.name_any(), run_id)
    }

    /// Name of the output secret of this run
    pub fn output_secret_name(&self) -> String {
        naming::output_secret_name(&self.name_any())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{Module, TerraformSpec, TerraformStatus};

    fn run() -> Terraform {
        Terraform::new(
            "bar",
            TerraformSpec {
                terraform_version: "1.0.2".into(),
                module: Module {
                    source: "IbraheemAlSaady/test/module".into(),
                    version: None,
                },
                backend: None,
                providers_config: None,
                workspace: None,
                depends_on: vec![],
                variables: vec![],
                variable_files: vec![],
                outputs: vec![],
                destroy: false,
                delete_completed_jobs: false,
                retry_limit: 0,
                git_ssh_key: None,
            },
        )
    }

    #[test]
    fn test_new_run_is_submitted() {
        assert!(run().is_submitted());
        assert!(!run().is_started());
        assert!(!run().is_waiting());
    }

    #[test]
    fn test_started_and_running_classify_as_started() {
        let mut r = run();
        r.status = Some(TerraformStatus {
            current_run_id: "abc123".into(),
            run_status: Some(TerraformRunStatus::Started),
            ..TerraformStatus::default()
        });
        assert!(r.is_started());
        assert!(!r.is_running());

        r.status.as_mut().unwrap().run_status = Some(TerraformRunStatus::Running);
        assert!(r.is_started());
        assert!(r.is_running());
    }

    #[test]
    fn test_is_updated_compares_generations() {
        let mut r = run();
        r.metadata.generation = Some(2);
        r.status = Some(TerraformStatus {
            observed_generation: 1,
            ..TerraformStatus::default()
        });
        assert!(r.is_updated());

        r.status.as_mut().unwrap().observed_generation = 2;
        assert!(!r.is_updated());
    }

    #[test]
    fn test_bump_run_id_shuffles_previous() {
        let mut r = run();
        r.bump_run_id();
        let first = r.current_run_id().to_string();
        assert_eq!(first.len(), 6);
        assert!(r.previous_run_id().is_empty());

        r.bump_run_id();
        assert_eq!(r.previous_run_id(), first);
        assert_ne!(r.current_run_id(), first);
    }

    #[test]
    fn test_finalizer_round_trip() {
        let mut r = run();
        assert!(!r.has_finalizer());
        r.add_finalizer();
        assert!(r.has_finalizer());
        r.add_finalizer();
        assert_eq!(r.finalizers().len(), 1);
        r.remove_finalizer();
        assert!(!r.has_finalizer());
    }
}

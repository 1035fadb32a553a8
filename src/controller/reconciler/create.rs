//! # Run Creation
//!
//! Materializes a run: resolves dependencies, allocates a fresh run id,
//! creates the child resources, cleans up the prior attempt's children, and
//! transitions the status to Started.

use crate::constants::RUNNER_RBAC_NAME;
use crate::controller::reconciler::{Reconciler, ReconcilerError};
use crate::crd::{Terraform, TerraformRunStatus};
use crate::observability::metrics;
use crate::resources::{configmaps, jobs, naming, rbac, secrets};
use crate::store::{EventKind, StoreError};
use kube::runtime::controller::Action;
use kube::ResourceExt;
use tracing::{error, info, warn};

impl Reconciler {
    /// Handles a submitted or waiting run; also the re-run path of an update
    pub(super) async fn handle_create(
        &self,
        run: &mut Terraform,
    ) -> Result<Action, ReconcilerError> {
        let name = run.name_any();
        let namespace = run.namespace().unwrap_or_default();

        metrics::record_total(&name, &namespace);

        let dependencies = match self.check_dependencies(run).await {
            Ok(dependencies) => dependencies,
            Err(err) => {
                info!(%err, "dependencies are not yet completed");

                if run.is_waiting() {
                    return Ok(Action::requeue(self.requeue_dependency()));
                }

                self.publish(
                    run,
                    EventKind::Normal,
                    "Waiting",
                    "Dependencies are not yet completed",
                )
                .await;

                self.update_run_status(run, TerraformRunStatus::WaitingForDependency)
                    .await?;
                return Ok(Action::requeue(self.requeue_dependency()));
            }
        };

        run.bump_run_id();

        super::rewrite_dependency_variables(run, &dependencies);

        if let Err(err) = self.create_run_resources(run).await {
            error!(%err, "failed to create a terraform run");

            self.update_run_status(run, TerraformRunStatus::Failed)
                .await?;
            return Err(err);
        }

        info!("cleaning up old resources if exist");
        if let Err(err) = self.cleanup_resources(run).await {
            warn!(%err, "failed to cleanup resources");
        }

        self.update_run_status(run, TerraformRunStatus::Started)
            .await?;

        self.publish(
            run,
            EventKind::Normal,
            "Created",
            &format!("Run({}) submitted", run.current_run_id()),
        )
        .await;

        Ok(Action::await_change())
    }

    /// Handles a spec edit: a fresh run id, new children, prior attempt
    /// cleaned up
    pub(super) async fn handle_update(
        &self,
        run: &mut Terraform,
    ) -> Result<Action, ReconcilerError> {
        info!("updating a terraform run");

        self.publish(run, EventKind::Normal, "Updated", "Creating a new run job")
            .await;

        self.handle_create(run).await
    }

    /// Creates the Kubernetes objects of one run attempt: runner RBAC, the
    /// module ConfigMap, the output secret, and the run job
    async fn create_run_resources(&self, run: &Terraform) -> Result<(), ReconcilerError> {
        let namespace = run.namespace().unwrap_or_default();

        self.ensure_runner_rbac(&namespace).await?;

        let configmap = configmaps::module_configmap(run)?;
        self.store().create_config_map(&configmap).await?;

        self.ensure_output_secret(run).await?;

        let job = jobs::runner_job(run, self.config());
        self.store().create_job(&job).await?;

        Ok(())
    }

    /// Creates the per-namespace runner ServiceAccount and RoleBinding if
    /// missing. A concurrent create from a sibling run counts as success.
    async fn ensure_runner_rbac(&self, namespace: &str) -> Result<(), StoreError> {
        match self
            .store()
            .get_service_account(namespace, RUNNER_RBAC_NAME)
            .await
        {
            Ok(_) => {}
            Err(err) if err.is_not_found() => {
                let sa = rbac::runner_service_account(namespace);
                match self.store().create_service_account(&sa).await {
                    Ok(()) | Err(StoreError::AlreadyExists(_)) => {}
                    Err(err) => return Err(err),
                }
            }
            Err(err) => return Err(err),
        }

        match self
            .store()
            .get_role_binding(namespace, RUNNER_RBAC_NAME)
            .await
        {
            Ok(_) => {}
            Err(err) if err.is_not_found() => {
                let rb = rbac::runner_role_binding(namespace);
                match self.store().create_role_binding(&rb).await {
                    Ok(()) | Err(StoreError::AlreadyExists(_)) => {}
                    Err(err) => return Err(err),
                }
            }
            Err(err) => return Err(err),
        }

        Ok(())
    }

    /// Creates the output secret unless it exists; the secret outlives
    /// individual attempts and is reused across re-runs
    async fn ensure_output_secret(&self, run: &Terraform) -> Result<(), StoreError> {
        let namespace = run.namespace().unwrap_or_default();

        match self
            .store()
            .get_secret(&namespace, &run.output_secret_name())
            .await
        {
            Ok(_) => Ok(()),
            Err(err) if err.is_not_found() => {
                self.store().create_secret(&secrets::output_secret(run)).await
            }
            Err(err) => Err(err),
        }
    }

    /// Deletes the prior attempt's job and module ConfigMap. NotFound is
    /// swallowed; any other failure is returned to the caller, which decides
    /// whether the surrounding transition survives it.
    pub(crate) async fn cleanup_resources(&self, run: &Terraform) -> Result<(), StoreError> {
        let previous_run_id = run.previous_run_id().to_string();

        if previous_run_id.is_empty() {
            return Ok(());
        }

        let namespace = run.namespace().unwrap_or_default();

        match self
            .store()
            .delete_job(&namespace, &run.job_name(&previous_run_id))
            .await
        {
            Ok(()) => {}
            Err(err) if err.is_not_found() => {}
            Err(err) => return Err(err),
        }

        let configmap = naming::unique_resource_name(&run.name_any(), &previous_run_id);
        match self.store().delete_config_map(&namespace, &configmap).await {
            Ok(()) => {}
            Err(err) if err.is_not_found() => {}
            Err(err) => return Err(err),
        }

        Ok(())
    }
}

//! # Run Deletion
//!
//! Second phase of the two-phase delete: the deletion timestamp is set, so
//! the operator records the deletion and releases its finalizer. Owned
//! children are garbage-collected by the cluster through owner references;
//! nothing is deleted directly here.

use crate::controller::reconciler::{Reconciler, ReconcilerError};
use crate::crd::{Terraform, TerraformRunStatus};
use crate::observability::metrics;
use kube::runtime::controller::Action;
use kube::ResourceExt;
use tracing::info;

impl Reconciler {
    pub(super) async fn handle_delete(
        &self,
        run: &mut Terraform,
    ) -> Result<Action, ReconcilerError> {
        let name = run.name_any();
        let namespace = run.namespace().unwrap_or_default();

        info!(%name, "terraform run is being deleted");

        metrics::record_status(&name, &namespace, TerraformRunStatus::Deleted);

        run.remove_finalizer();
        self.store().update_run(run).await?;

        Ok(Action::await_change())
    }
}

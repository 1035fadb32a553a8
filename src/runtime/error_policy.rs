//! # Error Policy
//!
//! Decides the requeue delay after a failed reconciliation. Backoff is
//! Fibonacci and tracked per resource, so one persistently failing run never
//! slows down the others.

use crate::constants::DEFAULT_REQUEUE_DEPENDENCY_SECS;
use crate::controller::reconciler::{BackoffState, Reconciler, ReconcilerError};
use crate::crd::Terraform;
use crate::observability::metrics;
use kube::runtime::controller::Action;
use kube::ResourceExt;
use std::sync::Arc;
use tracing::{error, warn};

/// Handles a reconciliation error with per-resource Fibonacci backoff
pub fn error_policy(run: Arc<Terraform>, error: &ReconcilerError, ctx: Arc<Reconciler>) -> Action {
    let name = run.name_any();
    let namespace = run.namespace().unwrap_or_default();

    error!(%name, %namespace, %error, "reconciliation error");
    metrics::increment_reconciliation_errors();

    let resource_key = format!("{namespace}/{name}");
    let backoff_secs = match ctx.backoff_states.lock() {
        Ok(mut states) => {
            let state = states.entry(resource_key).or_insert_with(BackoffState::new);
            state.increment_error();
            let backoff = state.backoff.next_backoff_seconds();

            warn!(
                backoff_secs = backoff,
                error_count = state.error_count,
                "retrying with backoff"
            );
            backoff
        }
        Err(err) => {
            warn!(%err, "failed to lock backoff states, using default backoff");
            DEFAULT_REQUEUE_DEPENDENCY_SECS
        }
    };

    Action::requeue(std::time::Duration::from_secs(backoff_secs))
}

//! # Reconciler
//!
//! The reconciliation state machine for `Terraform` runs. Invoked once per
//! change event with the run's key; classifies the observed lifecycle state,
//! chooses exactly one action, writes status last, and expresses waiting as a
//! requeue hint rather than blocking.
//!
//! ## Dispatch
//!
//! 1. Run absent from the cluster: done.
//! 2. Finalizer absent: register it, commit metadata, requeue immediately.
//! 3. Deletion timestamp set: record the deletion and release the finalizer;
//!    the cluster cascade-deletes owned children.
//! 4. Submitted or waiting for a dependency: create the run's child resources.
//! 5. Started or running: poll the owned job.
//! 6. Spec generation newer than the observed one: re-run with a fresh run id.
//! 7. Otherwise: done.

use crate::config::OperatorConfig;
use crate::controller::backoff::FibonacciBackoff;
use crate::crd::Terraform;
use crate::resources::module::RenderError;
use crate::store::{EventKind, ObjectStore, StoreError};
use kube::runtime::controller::Action;
use kube::ResourceExt;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

mod create;
mod delete;
mod dependencies;
mod job_watch;
mod status;

pub use dependencies::rewrite_dependency_variables;
pub use status::parse_status_time;

/// Reconciliation failure returned to the controller framework; the work
/// queue retries with the error-policy backoff
#[derive(Debug, Error)]
pub enum ReconcilerError {
    /// A dependency has not completed its current generation; retryable
    #[error("dependency '{0}' is not ready")]
    DependencyNotReady(String),
    /// Module rendering failed; fatal for the current attempt
    #[error(transparent)]
    Render(#[from] RenderError),
    /// A cluster call failed
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Backoff state of a single failing resource
pub struct BackoffState {
    pub backoff: FibonacciBackoff,
    pub error_count: u32,
}

impl BackoffState {
    pub fn new() -> Self {
        Self {
            backoff: FibonacciBackoff::new(30, 600),
            error_count: 0,
        }
    }

    pub fn increment_error(&mut self) {
        self.error_count += 1;
    }
}

/// Reconciler context: the object-store gateway and resolved configuration,
/// injected at construction
pub struct Reconciler {
    store: Arc<dyn ObjectStore>,
    config: OperatorConfig,
    requeue_dependency: Duration,
    requeue_job_watch: Duration,
    /// Error backoff per resource, keyed `namespace/name`
    pub backoff_states: Mutex<HashMap<String, BackoffState>>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn ObjectStore>, config: OperatorConfig) -> Self {
        let requeue_dependency = Duration::from_secs(config.requeue_dependency_secs);
        let requeue_job_watch = Duration::from_secs(config.requeue_job_watch_secs);

        Self {
            store,
            config,
            requeue_dependency,
            requeue_job_watch,
            backoff_states: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    pub(crate) fn requeue_dependency(&self) -> Duration {
        self.requeue_dependency
    }

    pub(crate) fn requeue_job_watch(&self) -> Duration {
        self.requeue_job_watch
    }

    pub(crate) fn config(&self) -> &OperatorConfig {
        &self.config
    }

    /// Publishes a run event; publish failures never fail a reconciliation
    pub(crate) async fn publish(
        &self,
        run: &Terraform,
        kind: EventKind,
        reason: &str,
        message: &str,
    ) {
        if let Err(err) = self.store.publish_event(run, kind, reason, message).await {
            warn!(reason, %err, "failed to publish event");
        }
    }

    /// Clears the error backoff of a resource after a successful pass
    fn reset_backoff(&self, namespace: &str, name: &str) {
        if let Ok(mut states) = self.backoff_states.lock() {
            states.remove(&format!("{namespace}/{name}"));
        }
    }
}

/// Reconciles a single run. The object delivered by the watch only carries
/// the key; the run is re-loaded so decisions are made on current state.
pub async fn reconcile(
    run: Arc<Terraform>,
    ctx: Arc<Reconciler>,
) -> Result<Action, ReconcilerError> {
    let namespace = run.namespace().unwrap_or_default();
    let name = run.name_any();

    let mut run = match ctx.store.get_run(&namespace, &name).await {
        Ok(run) => run,
        Err(err) if err.is_not_found() => return Ok(Action::await_change()),
        Err(err) => return Err(err.into()),
    };

    let action = dispatch(&ctx, &mut run).await?;
    ctx.reset_backoff(&namespace, &name);

    Ok(action)
}

async fn dispatch(ctx: &Reconciler, run: &mut Terraform) -> Result<Action, ReconcilerError> {
    if !run.has_finalizer() {
        run.add_finalizer();
        ctx.store.update_run(run).await?;
        ctx.publish(
            run,
            EventKind::Normal,
            "Added-finalizer",
            "Object finalizer is added",
        )
        .await;

        // No status write in the same pass as the finalizer registration
        return Ok(Action::requeue(Duration::ZERO));
    }

    if run.is_being_deleted() {
        return ctx.handle_delete(run).await;
    }

    if run.is_submitted() || run.is_waiting() {
        return ctx.handle_create(run).await;
    }

    if run.is_started() {
        return ctx.handle_job_watch(run).await;
    }

    if run.is_updated() {
        return ctx.handle_update(run).await;
    }

    Ok(Action::await_change())
}

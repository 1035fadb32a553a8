//! # Watch Loop
//!
//! Runs the controller over `Terraform` objects, owning the Jobs, ConfigMaps,
//! and Secrets created per run. The framework serializes reconciliations per
//! run key and delivers change events for owned children.

use crate::controller::reconciler::reconcile;
use crate::crd::Terraform;
use crate::runtime::error_policy::error_policy;
use crate::runtime::initialization::InitializationResult;
use anyhow::Result;
use futures::StreamExt;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use kube::api::Api;
use kube::runtime::{watcher, Controller};
use tracing::{debug, warn};

/// Runs the watch loop until shutdown
pub async fn run_watch_loop(init: InitializationResult) -> Result<()> {
    let client = init.client;

    let runs: Api<Terraform> = Api::all(client.clone());
    let jobs: Api<Job> = Api::all(client.clone());
    let configmaps: Api<ConfigMap> = Api::all(client.clone());
    let secrets: Api<Secret> = Api::all(client.clone());

    Controller::new(runs, watcher::Config::default())
        .owns(jobs, watcher::Config::default())
        .owns(configmaps, watcher::Config::default())
        .owns(secrets, watcher::Config::default())
        .shutdown_on_signal()
        .run(reconcile, error_policy, init.reconciler)
        .for_each(|result| async move {
            match result {
                Ok(obj) => debug!(?obj, "reconciled"),
                Err(err) => warn!(%err, "reconciliation failed"),
            }
        })
        .await;

    Ok(())
}

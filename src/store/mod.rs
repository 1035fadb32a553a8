//! # Object Store Gateway
//!
//! The reconciler's only view of the cluster: typed CRUD over the resource
//! kinds it owns, status-subresource updates, foreground-propagation deletes,
//! and event publishing. The trait seam keeps the state machine testable
//! against an in-memory store.

use crate::crd::Terraform;
use async_trait::async_trait;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{ConfigMap, Secret, ServiceAccount};
use k8s_openapi::api::rbac::v1::RoleBinding;
use thiserror::Error;

pub mod kube_store;

pub use kube_store::KubeStore;

/// Cluster call failure, classified for the reconciler's decisions
#[derive(Debug, Error)]
pub enum StoreError {
    /// The object does not exist
    #[error("object not found: {0}")]
    NotFound(String),
    /// Another writer created the object first
    #[error("object already exists: {0}")]
    AlreadyExists(String),
    /// Any other cluster error; retried by the work queue with backoff
    #[error(transparent)]
    Api(#[from] kube::Error),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

/// Kubernetes event type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Normal,
    Warning,
}

/// Typed gateway to the cluster
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get_run(&self, namespace: &str, name: &str) -> Result<Terraform, StoreError>;
    /// Updates spec/metadata; used for finalizer add/remove
    async fn update_run(&self, run: &Terraform) -> Result<(), StoreError>;
    /// Updates the status subresource only
    async fn update_run_status(&self, run: &Terraform) -> Result<(), StoreError>;

    async fn get_job(&self, namespace: &str, name: &str) -> Result<Job, StoreError>;
    async fn create_job(&self, job: &Job) -> Result<(), StoreError>;
    /// Deletes with foreground propagation
    async fn delete_job(&self, namespace: &str, name: &str) -> Result<(), StoreError>;

    async fn get_config_map(&self, namespace: &str, name: &str) -> Result<ConfigMap, StoreError>;
    async fn create_config_map(&self, configmap: &ConfigMap) -> Result<(), StoreError>;
    /// Deletes with foreground propagation
    async fn delete_config_map(&self, namespace: &str, name: &str) -> Result<(), StoreError>;

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret, StoreError>;
    async fn create_secret(&self, secret: &Secret) -> Result<(), StoreError>;

    async fn get_service_account(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<ServiceAccount, StoreError>;
    async fn create_service_account(&self, sa: &ServiceAccount) -> Result<(), StoreError>;

    async fn get_role_binding(&self, namespace: &str, name: &str)
        -> Result<RoleBinding, StoreError>;
    async fn create_role_binding(&self, rb: &RoleBinding) -> Result<(), StoreError>;

    /// Publishes a Kubernetes event attached to the run
    async fn publish_event(
        &self,
        run: &Terraform,
        kind: EventKind,
        reason: &str,
        message: &str,
    ) -> Result<(), StoreError>;
}

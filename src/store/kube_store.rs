//! # Kubernetes Object Store
//!
//! `ObjectStore` implementation over the cluster API. Maps HTTP 404/409 to
//! the typed error kinds the reconciler branches on; all deletes use
//! foreground propagation so a parent stays visible until its children are
//! gone.

use crate::crd::Terraform;
use crate::store::{EventKind, ObjectStore, StoreError};
use async_trait::async_trait;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{ConfigMap, Secret, ServiceAccount};
use k8s_openapi::api::rbac::v1::RoleBinding;
use kube::api::{Api, DeleteParams, Patch, PatchParams, PostParams, PropagationPolicy};
use kube::runtime::events::{Event, EventType, Recorder, Reporter};
use kube::{Client, Resource, ResourceExt};

/// Field manager / event reporter identity of the operator
const OPERATOR_MANAGER: &str = "terraform-operator";

/// Cluster-backed object store
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
    recorder: Recorder,
}

impl KubeStore {
    pub fn new(client: Client) -> Self {
        let reporter = Reporter {
            controller: OPERATOR_MANAGER.into(),
            instance: std::env::var("HOSTNAME").ok(),
        };
        let recorder = Recorder::new(client.clone(), reporter);

        Self { client, recorder }
    }

    fn runs(&self, namespace: &str) -> Api<Terraform> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn api<K>(&self, namespace: &str) -> Api<K>
    where
        K: Resource<Scope = k8s_openapi::NamespaceResourceScope>
            + Clone
            + serde::de::DeserializeOwned
            + std::fmt::Debug,
        K::DynamicType: Default,
    {
        Api::namespaced(self.client.clone(), namespace)
    }
}

/// Maps a cluster error to the typed store kinds
fn classify(err: kube::Error, what: String) -> StoreError {
    match err {
        kube::Error::Api(ref response) if response.code == 404 => StoreError::NotFound(what),
        kube::Error::Api(ref response) if response.code == 409 => StoreError::AlreadyExists(what),
        other => StoreError::Api(other),
    }
}

async fn get<K>(api: &Api<K>, namespace: &str, name: &str) -> Result<K, StoreError>
where
    K: Clone + serde::de::DeserializeOwned + std::fmt::Debug,
{
    api.get(name)
        .await
        .map_err(|e| classify(e, format!("{namespace}/{name}")))
}

async fn create<K>(api: &Api<K>, obj: &K) -> Result<(), StoreError>
where
    K: Resource + Clone + serde::Serialize + serde::de::DeserializeOwned + std::fmt::Debug,
{
    api.create(&PostParams::default(), obj)
        .await
        .map(|_| ())
        .map_err(|e| classify(e, obj.name_any()))
}

async fn delete_foreground<K>(api: &Api<K>, namespace: &str, name: &str) -> Result<(), StoreError>
where
    K: Clone + serde::de::DeserializeOwned + std::fmt::Debug,
{
    let params = DeleteParams {
        propagation_policy: Some(PropagationPolicy::Foreground),
        ..DeleteParams::default()
    };

    api.delete(name, &params)
        .await
        .map(|_| ())
        .map_err(|e| classify(e, format!("{namespace}/{name}")))
}

#[async_trait]
impl ObjectStore for KubeStore {
    async fn get_run(&self, namespace: &str, name: &str) -> Result<Terraform, StoreError> {
        get(&self.runs(namespace), namespace, name).await
    }

    async fn update_run(&self, run: &Terraform) -> Result<(), StoreError> {
        let namespace = run.namespace().unwrap_or_default();
        let name = run.name_any();

        self.runs(&namespace)
            .replace(&name, &PostParams::default(), run)
            .await
            .map(|_| ())
            .map_err(|e| classify(e, format!("{namespace}/{name}")))
    }

    async fn update_run_status(&self, run: &Terraform) -> Result<(), StoreError> {
        let namespace = run.namespace().unwrap_or_default();
        let name = run.name_any();
        let patch = serde_json::json!({ "status": run.status });

        self.runs(&namespace)
            .patch_status(
                &name,
                &PatchParams::apply(OPERATOR_MANAGER),
                &Patch::Merge(patch),
            )
            .await
            .map(|_| ())
            .map_err(|e| classify(e, format!("{namespace}/{name}")))
    }

    async fn get_job(&self, namespace: &str, name: &str) -> Result<Job, StoreError> {
        get(&self.api::<Job>(namespace), namespace, name).await
    }

    async fn create_job(&self, job: &Job) -> Result<(), StoreError> {
        let namespace = job.namespace().unwrap_or_default();
        create(&self.api::<Job>(&namespace), job).await
    }

    async fn delete_job(&self, namespace: &str, name: &str) -> Result<(), StoreError> {
        delete_foreground(&self.api::<Job>(namespace), namespace, name).await
    }

    async fn get_config_map(&self, namespace: &str, name: &str) -> Result<ConfigMap, StoreError> {
        get(&self.api::<ConfigMap>(namespace), namespace, name).await
    }

    async fn create_config_map(&self, configmap: &ConfigMap) -> Result<(), StoreError> {
        let namespace = configmap.namespace().unwrap_or_default();
        create(&self.api::<ConfigMap>(&namespace), configmap).await
    }

    async fn delete_config_map(&self, namespace: &str, name: &str) -> Result<(), StoreError> {
        delete_foreground(&self.api::<ConfigMap>(namespace), namespace, name).await
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret, StoreError> {
        get(&self.api::<Secret>(namespace), namespace, name).await
    }

    async fn create_secret(&self, secret: &Secret) -> Result<(), StoreError> {
        let namespace = secret.namespace().unwrap_or_default();
        create(&self.api::<Secret>(&namespace), secret).await
    }

    async fn get_service_account(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<ServiceAccount, StoreError> {
        get(&self.api::<ServiceAccount>(namespace), namespace, name).await
    }

    async fn create_service_account(&self, sa: &ServiceAccount) -> Result<(), StoreError> {
        let namespace = sa.namespace().unwrap_or_default();
        create(&self.api::<ServiceAccount>(&namespace), sa).await
    }

    async fn get_role_binding(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<RoleBinding, StoreError> {
        get(&self.api::<RoleBinding>(namespace), namespace, name).await
    }

    async fn create_role_binding(&self, rb: &RoleBinding) -> Result<(), StoreError> {
        let namespace = rb.namespace().unwrap_or_default();
        create(&self.api::<RoleBinding>(&namespace), rb).await
    }

    async fn publish_event(
        &self,
        run: &Terraform,
        kind: EventKind,
        reason: &str,
        message: &str,
    ) -> Result<(), StoreError> {
        let type_ = match kind {
            EventKind::Normal => EventType::Normal,
            EventKind::Warning => EventType::Warning,
        };

        self.recorder
            .publish(
                &Event {
                    type_,
                    reason: reason.to_string(),
                    note: Some(message.to_string()),
                    action: reason.to_string(),
                    secondary: None,
                },
                &run.object_ref(&()),
            )
            .await
            .map_err(StoreError::Api)
    }
}

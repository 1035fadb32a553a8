//! In-memory object store used to drive the reconciler in tests.

use async_trait::async_trait;
use k8s_openapi::api::batch::v1::{Job, JobStatus};
use k8s_openapi::api::core::v1::{ConfigMap, Secret, ServiceAccount};
use k8s_openapi::api::rbac::v1::RoleBinding;
use kube::ResourceExt;
use std::collections::HashMap;
use std::sync::Mutex;
use terraform_operator::crd::Terraform;
use terraform_operator::store::{EventKind, ObjectStore, StoreError};

fn key(namespace: &str, name: &str) -> String {
    format!("{namespace}/{name}")
}

fn obj_key<K: ResourceExt>(obj: &K) -> String {
    key(&obj.namespace().unwrap_or_default(), &obj.name_any())
}

/// A published event, captured for assertions
#[derive(Debug, Clone)]
pub struct RecordedEvent {
    pub kind: EventKind,
    pub reason: String,
    pub message: String,
}

/// In-memory `ObjectStore` with per-kind maps and an event log
#[derive(Default)]
pub struct FakeStore {
    pub runs: Mutex<HashMap<String, Terraform>>,
    pub jobs: Mutex<HashMap<String, Job>>,
    pub config_maps: Mutex<HashMap<String, ConfigMap>>,
    pub secrets: Mutex<HashMap<String, Secret>>,
    pub service_accounts: Mutex<HashMap<String, ServiceAccount>>,
    pub role_bindings: Mutex<HashMap<String, RoleBinding>>,
    pub events: Mutex<Vec<RecordedEvent>>,
    pub status_writes: Mutex<u32>,
    /// When set, the next config map create fails as a name collision
    pub fail_config_map_create: Mutex<bool>,
}

impl FakeStore {
    pub fn put_run(&self, run: Terraform) {
        self.runs.lock().unwrap().insert(obj_key(&run), run);
    }

    pub fn run(&self, namespace: &str, name: &str) -> Terraform {
        self.runs
            .lock()
            .unwrap()
            .get(&key(namespace, name))
            .cloned()
            .expect("run not found in fake store")
    }

    pub fn with_run_mut(&self, namespace: &str, name: &str, f: impl FnOnce(&mut Terraform)) {
        let mut runs = self.runs.lock().unwrap();
        let run = runs
            .get_mut(&key(namespace, name))
            .expect("run not found in fake store");
        f(run);
    }

    pub fn job(&self, namespace: &str, name: &str) -> Option<Job> {
        self.jobs.lock().unwrap().get(&key(namespace, name)).cloned()
    }

    pub fn config_map(&self, namespace: &str, name: &str) -> Option<ConfigMap> {
        self.config_maps
            .lock()
            .unwrap()
            .get(&key(namespace, name))
            .cloned()
    }

    pub fn secret(&self, namespace: &str, name: &str) -> Option<Secret> {
        self.secrets
            .lock()
            .unwrap()
            .get(&key(namespace, name))
            .cloned()
    }

    pub fn has_service_account(&self, namespace: &str, name: &str) -> bool {
        self.service_accounts
            .lock()
            .unwrap()
            .contains_key(&key(namespace, name))
    }

    pub fn has_role_binding(&self, namespace: &str, name: &str) -> bool {
        self.role_bindings
            .lock()
            .unwrap()
            .contains_key(&key(namespace, name))
    }

    /// Sets the pod counters of a stored job
    pub fn set_job_counters(
        &self,
        namespace: &str,
        name: &str,
        active: i32,
        succeeded: i32,
        failed: i32,
    ) {
        let mut jobs = self.jobs.lock().unwrap();
        let job = jobs
            .get_mut(&key(namespace, name))
            .expect("job not found in fake store");
        job.status = Some(JobStatus {
            active: Some(active),
            succeeded: Some(succeeded),
            failed: Some(failed),
            ..JobStatus::default()
        });
    }

    pub fn event_messages(&self, reason: &str) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.reason == reason)
            .map(|e| e.message.clone())
            .collect()
    }

    pub fn status_write_count(&self) -> u32 {
        *self.status_writes.lock().unwrap()
    }
}

fn get_from<K: Clone>(map: &Mutex<HashMap<String, K>>, namespace: &str, name: &str) -> Result<K, StoreError> {
    map.lock()
        .unwrap()
        .get(&key(namespace, name))
        .cloned()
        .ok_or_else(|| StoreError::NotFound(key(namespace, name)))
}

fn create_in<K: Clone + ResourceExt>(map: &Mutex<HashMap<String, K>>, obj: &K) -> Result<(), StoreError> {
    let mut map = map.lock().unwrap();
    let k = obj_key(obj);
    if map.contains_key(&k) {
        return Err(StoreError::AlreadyExists(k));
    }
    map.insert(k, obj.clone());
    Ok(())
}

fn delete_from<K>(map: &Mutex<HashMap<String, K>>, namespace: &str, name: &str) -> Result<(), StoreError> {
    map.lock()
        .unwrap()
        .remove(&key(namespace, name))
        .map(|_| ())
        .ok_or_else(|| StoreError::NotFound(key(namespace, name)))
}

#[async_trait]
impl ObjectStore for FakeStore {
    async fn get_run(&self, namespace: &str, name: &str) -> Result<Terraform, StoreError> {
        get_from(&self.runs, namespace, name)
    }

    async fn update_run(&self, run: &Terraform) -> Result<(), StoreError> {
        let mut runs = self.runs.lock().unwrap();
        let k = obj_key(run);
        if !runs.contains_key(&k) {
            return Err(StoreError::NotFound(k));
        }
        runs.insert(k, run.clone());
        Ok(())
    }

    async fn update_run_status(&self, run: &Terraform) -> Result<(), StoreError> {
        let mut runs = self.runs.lock().unwrap();
        let k = obj_key(run);
        let stored = runs.get_mut(&k).ok_or(StoreError::NotFound(k))?;
        stored.status = run.status.clone();
        *self.status_writes.lock().unwrap() += 1;
        Ok(())
    }

    async fn get_job(&self, namespace: &str, name: &str) -> Result<Job, StoreError> {
        get_from(&self.jobs, namespace, name)
    }

    async fn create_job(&self, job: &Job) -> Result<(), StoreError> {
        create_in(&self.jobs, job)
    }

    async fn delete_job(&self, namespace: &str, name: &str) -> Result<(), StoreError> {
        delete_from(&self.jobs, namespace, name)
    }

    async fn get_config_map(&self, namespace: &str, name: &str) -> Result<ConfigMap, StoreError> {
        get_from(&self.config_maps, namespace, name)
    }

    async fn create_config_map(&self, configmap: &ConfigMap) -> Result<(), StoreError> {
        if *self.fail_config_map_create.lock().unwrap() {
            return Err(StoreError::AlreadyExists(obj_key(configmap)));
        }
        create_in(&self.config_maps, configmap)
    }

    async fn delete_config_map(&self, namespace: &str, name: &str) -> Result<(), StoreError> {
        delete_from(&self.config_maps, namespace, name)
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret, StoreError> {
        get_from(&self.secrets, namespace, name)
    }

    async fn create_secret(&self, secret: &Secret) -> Result<(), StoreError> {
        create_in(&self.secrets, secret)
    }

    async fn get_service_account(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<ServiceAccount, StoreError> {
        get_from(&self.service_accounts, namespace, name)
    }

    async fn create_service_account(&self, sa: &ServiceAccount) -> Result<(), StoreError> {
        create_in(&self.service_accounts, sa)
    }

    async fn get_role_binding(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<RoleBinding, StoreError> {
        get_from(&self.role_bindings, namespace, name)
    }

    async fn create_role_binding(&self, rb: &RoleBinding) -> Result<(), StoreError> {
        create_in(&self.role_bindings, rb)
    }

    async fn publish_event(
        &self,
        _run: &Terraform,
        kind: EventKind,
        reason: &str,
        message: &str,
    ) -> Result<(), StoreError> {
        self.events.lock().unwrap().push(RecordedEvent {
            kind,
            reason: reason.to_string(),
            message: message.to_string(),
        });
        Ok(())
    }
}

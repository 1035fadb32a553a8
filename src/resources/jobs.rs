//! # Runner Job
//!
//! The batch Job executing one attempt of a run. Single pod, never restarted
//! by the kubelet; retries are expressed through the job's backoff limit.

use crate::config::OperatorConfig;
use crate::constants::*;
use crate::crd::{Terraform, VolumeSource};
use crate::resources::naming;
use k8s_openapi::api::batch::v1::{Job, JobSpec};
use k8s_openapi::api::core::v1::{
    ConfigMapVolumeSource, Container, EmptyDirVolumeSource, EnvVar, EnvVarSource,
    ObjectFieldSelector, PodSpec, PodTemplateSpec, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::{Resource, ResourceExt};

/// Volume name of the module ConfigMap mount
const MODULE_VOLUME_NAME: &str = "terraform-module";

/// Volume name of the terraform cache emptyDir
const CACHE_VOLUME_NAME: &str = "terraform-cache";

/// Volume name of the git SSH identity mount
const GIT_SSH_KEY_VOLUME_NAME: &str = "git-ssh-key";

/// Volume name of the SSH known_hosts mount
const KNOWN_HOSTS_VOLUME_NAME: &str = "ssh-known-hosts";

/// Builds the desired runner Job for the run's current attempt
pub fn runner_job(run: &Terraform, config: &OperatorConfig) -> Job {
    let name = run.name_any();
    let run_id = run.current_run_id();
    let job_name = naming::unique_resource_name(&name, run_id);

    Job {
        metadata: ObjectMeta {
            name: Some(job_name),
            namespace: run.namespace(),
            labels: Some(naming::common_labels(&name, run_id)),
            owner_references: run.controller_owner_ref(&()).map(|r| vec![r]),
            ..ObjectMeta::default()
        },
        spec: Some(JobSpec {
            backoff_limit: Some(run.spec.retry_limit),
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(naming::common_labels(&name, run_id)),
                    ..ObjectMeta::default()
                }),
                spec: Some(PodSpec {
                    restart_policy: Some("Never".to_string()),
                    service_account_name: Some(RUNNER_RBAC_NAME.to_string()),
                    containers: vec![runner_container(run, config)],
                    volumes: Some(runner_volumes(run, config)),
                    ..PodSpec::default()
                }),
            },
            ..JobSpec::default()
        }),
        ..Job::default()
    }
}

fn runner_container(run: &Terraform, config: &OperatorConfig) -> Container {
    Container {
        name: "terraform-runner".to_string(),
        image: Some(config.runner_image_ref()),
        working_dir: Some(RUNNER_WORKING_DIR.to_string()),
        env: Some(runner_env(run)),
        volume_mounts: Some(runner_volume_mounts(run)),
        ..Container::default()
    }
}

/// Environment of the runner container.
///
/// Module inputs are exported as `TF_VAR_<key>`; variables flagged as
/// environment variables keep their raw key.
fn runner_env(run: &Terraform) -> Vec<EnvVar> {
    let mut env = Vec::new();

    for variable in &run.spec.variables {
        let name = if variable.environment_variable {
            variable.key.clone()
        } else {
            format!("TF_VAR_{}", variable.key)
        };

        env.push(EnvVar {
            name,
            value: variable.value.clone(),
            value_from: variable.value_from.clone(),
        });
    }

    env.push(env_var("TERRAFORM_VERSION", &run.spec.terraform_version));
    env.push(env_var(
        "TERRAFORM_WORKSPACE",
        run.spec.workspace.as_deref().unwrap_or("default"),
    ));
    env.push(env_var("TERRAFORM_DESTROY", &run.spec.destroy.to_string()));
    env.push(env_var("OUTPUT_SECRET_NAME", &run.output_secret_name()));
    env.push(env_var_from_field("POD_NAMESPACE", "metadata.namespace"));

    env
}

fn runner_volumes(run: &Terraform, config: &OperatorConfig) -> Vec<Volume> {
    let module_configmap = naming::unique_resource_name(&run.name_any(), run.current_run_id());

    let mut volumes = vec![
        configmap_volume(MODULE_VOLUME_NAME, &module_configmap),
        Volume {
            name: CACHE_VOLUME_NAME.to_string(),
            empty_dir: Some(EmptyDirVolumeSource::default()),
            ..Volume::default()
        },
        configmap_volume(KNOWN_HOSTS_VOLUME_NAME, &config.known_hosts_configmap_name),
    ];

    for file in &run.spec.variable_files {
        volumes.push(volume(&varfile_volume_name(&file.key), file.value_from.clone()));
    }

    if let Some(key) = &run.spec.git_ssh_key {
        volumes.push(volume(GIT_SSH_KEY_VOLUME_NAME, key.value_from.clone()));
    }

    volumes
}

fn runner_volume_mounts(run: &Terraform) -> Vec<VolumeMount> {
    let mut mounts = vec![
        VolumeMount {
            name: MODULE_VOLUME_NAME.to_string(),
            mount_path: format!("{RUNNER_WORKING_DIR}/main.tf"),
            sub_path: Some("main.tf".to_string()),
            read_only: Some(true),
            ..VolumeMount::default()
        },
        mount(CACHE_VOLUME_NAME, RUNNER_CACHE_DIR, false),
        mount(KNOWN_HOSTS_VOLUME_NAME, RUNNER_KNOWN_HOSTS_DIR, true),
    ];

    for file in &run.spec.variable_files {
        mounts.push(mount(
            &varfile_volume_name(&file.key),
            &format!("{RUNNER_VAR_FILES_DIR}/{}", file.key),
            true,
        ));
    }

    if run.spec.git_ssh_key.is_some() {
        mounts.push(mount(GIT_SSH_KEY_VOLUME_NAME, RUNNER_SSH_KEY_DIR, true));
    }

    mounts
}

fn varfile_volume_name(key: &str) -> String {
    format!("varfile-{key}")
}

fn volume(name: &str, source: VolumeSource) -> Volume {
    Volume {
        name: name.to_string(),
        secret: source.secret,
        config_map: source.config_map,
        ..Volume::default()
    }
}

fn configmap_volume(volume_name: &str, configmap_name: &str) -> Volume {
    Volume {
        name: volume_name.to_string(),
        config_map: Some(ConfigMapVolumeSource {
            name: configmap_name.to_string(),
            ..ConfigMapVolumeSource::default()
        }),
        ..Volume::default()
    }
}

fn mount(volume_name: &str, path: &str, read_only: bool) -> VolumeMount {
    VolumeMount {
        name: volume_name.to_string(),
        mount_path: path.to_string(),
        read_only: Some(read_only),
        ..VolumeMount::default()
    }
}

fn env_var(name: &str, value: &str) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value: Some(value.to_string()),
        value_from: None,
    }
}

fn env_var_from_field(name: &str, path: &str) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value: None,
        value_from: Some(EnvVarSource {
            field_ref: Some(ObjectFieldSelector {
                field_path: path.to_string(),
                ..ObjectFieldSelector::default()
            }),
            ..EnvVarSource::default()
        }),
    }
}

//! # Custom Resource Definition
//!
//! The `Terraform` custom resource: a declarative request to execute one
//! Terraform module as an in-cluster job run.

use k8s_openapi::api::core::v1::{ConfigMapVolumeSource, EnvVarSource, SecretVolumeSource};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub mod status;

pub use status::{TerraformRunStatus, TerraformStatus};

/// Finalizer token blocking deletion until the operator has recorded it
pub const TERRAFORM_FINALIZER: &str = "finalizers.terraform-operator.io";

/// Terraform Custom Resource Definition
///
/// A `Terraform` object describes the module source and version to run, its
/// inputs (variables, variable files), outputs to capture into a Kubernetes
/// secret, and dependencies on other runs in the same namespace.
///
/// # Example
///
/// ```yaml
/// apiVersion: run.terraform-operator.io/v1alpha1
/// kind: Terraform
/// metadata:
///   name: random-pet
///   namespace: default
/// spec:
///   terraformVersion: 1.0.2
///   module:
///     source: IbraheemAlSaady/test/module
///     version: 0.0.1
///   variables:
///     - key: length
///       value: "16"
///   outputs:
///     - key: pet_name
///       moduleOutputName: name
/// ```
#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "Terraform",
    group = "run.terraform-operator.io",
    version = "v1alpha1",
    namespaced,
    status = "TerraformStatus",
    shortname = "tf",
    printcolumn = r#"{"name":"Status", "type":"string", "jsonPath":".status.runStatus"}, {"name":"Secret", "type":"string", "jsonPath":".status.outputSecretName"}, {"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct TerraformSpec {
    /// The terraform version to use
    pub terraform_version: String,
    /// The module information (source & version)
    pub module: Module,
    /// A custom terraform backend configuration, inlined verbatim into the
    /// rendered module. Defaults to the Kubernetes backend when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<String>,
    /// A custom terraform providers configuration, inlined verbatim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub providers_config: Option<String>,
    /// The terraform workspace. Defaults to `default`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace: Option<String>,
    /// A list of dependencies on other Terraform runs
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<DependsOn>,
    /// Variables as inputs to the Terraform module
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variables: Vec<Variable>,
    /// Terraform variable files mounted into the runner
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variable_files: Vec<VariableFile>,
    /// Terraform outputs to be written to the output Kubernetes secret
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<Output>,
    /// Indicates whether a destroy job should run
    #[serde(default)]
    pub destroy: bool,
    /// Indicates whether to remove the job once the run completed
    #[serde(default)]
    pub delete_completed_jobs: bool,
    /// A retry limit to be set on the Job as a backoffLimit
    #[serde(default)]
    pub retry_limit: i32,
    /// An SSH key to be able to pull modules from private git repositories
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_ssh_key: Option<GitSSHKey>,
}

/// Module holds the Terraform module source and version information
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    /// Module source, must be a valid Terraform module source
    pub source: String,
    /// Module version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Variable holds the information of a Terraform module input
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Variable {
    /// Terraform module variable name
    pub key: String,
    /// The literal value of the variable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// The variable value from a key source (secret or configmap)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_from: Option<EnvVarSource>,
    /// Denotes if this variable should be exported as a plain environment
    /// variable instead of a module input
    #[serde(default)]
    pub environment_variable: bool,
    /// Denotes if this variable should be fetched from the output of a
    /// dependency run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependency_ref: Option<DependencyRef>,
}

/// DependencyRef names a dependency run and the output key to read
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DependencyRef {
    /// The dependency `Terraform` object metadata.name
    pub name: String,
    /// The key in the dependency's output secret
    pub key: String,
}

/// VariableFile holds a Terraform variable file to mount into the runner
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VariableFile {
    /// The file name the runner will see
    pub key: String,
    /// The source volume of the variable file
    pub value_from: VolumeSource,
}

/// Output selects a Terraform module output to be written to the output secret
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Output {
    /// The Kubernetes secret key to write
    #[serde(default)]
    pub key: String,
    /// The output name as defined in the source Terraform module
    #[serde(default)]
    pub module_output_name: String,
}

/// DependsOn names another Terraform run this run waits for
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DependsOn {
    /// The dependency `Terraform` object metadata.name
    pub name: String,
    /// The namespace of the dependency, defaulting to this run's namespace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// GitSSHKey holds the private SSH key used to pull private modules
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GitSSHKey {
    /// The source volume where the private SSH key exists
    pub value_from: VolumeSource,
}

/// Source of a volume mounted into the runner pod. Secrets and config maps
/// are the supported kinds.
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VolumeSource {
    /// A secret volume
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<SecretVolumeSource>,
    /// A config map volume
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_map: Option<ConfigMapVolumeSource>,
}

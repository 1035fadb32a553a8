//! # Module ConfigMap
//!
//! The ConfigMap carrying the rendered `main.tf`, mounted into the runner
//! pod. Keyed by run id so re-runs never collide.

use crate::crd::Terraform;
use crate::resources::module::{render_module, RenderError};
use crate::resources::naming;
use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::{Resource, ResourceExt};
use std::collections::BTreeMap;

/// Builds the desired module ConfigMap for the run's current attempt
pub fn module_configmap(run: &Terraform) -> Result<ConfigMap, RenderError> {
    let rendered = render_module(run)?;

    let name = run.name_any();
    let run_id = run.current_run_id();

    Ok(ConfigMap {
        metadata: ObjectMeta {
            name: Some(naming::unique_resource_name(&name, run_id)),
            namespace: run.namespace(),
            labels: Some(naming::common_labels(&name, run_id)),
            owner_references: run.controller_owner_ref(&()).map(|r| vec![r]),
            ..ObjectMeta::default()
        },
        data: Some(BTreeMap::from([("main.tf".to_string(), rendered)])),
        ..ConfigMap::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{Module, TerraformSpec, TerraformStatus};

    #[test]
    fn test_module_configmap_shape() {
        let mut run = Terraform::new(
            "bar",
            TerraformSpec {
                terraform_version: "1.0.2".into(),
                module: Module {
                    source: "IbraheemAlSaady/test/module".into(),
                    version: Some("0.0.1".into()),
                },
                backend: None,
                providers_config: None,
                workspace: None,
                depends_on: vec![],
                variables: vec![],
                variable_files: vec![],
                outputs: vec![],
                destroy: false,
                delete_completed_jobs: false,
                retry_limit: 0,
                git_ssh_key: None,
            },
        );
        run.metadata.namespace = Some("default".into());
        run.metadata.uid = Some("1234".into());
        run.status = Some(TerraformStatus {
            current_run_id: "abc123".into(),
            ..TerraformStatus::default()
        });

        let cm = module_configmap(&run).unwrap();
        assert_eq!(cm.metadata.name.as_deref(), Some("bar-abc123"));
        assert_eq!(cm.metadata.namespace.as_deref(), Some("default"));
        assert!(cm.data.unwrap()["main.tf"].contains("required_version"));

        let owners = cm.metadata.owner_references.unwrap();
        assert_eq!(owners.len(), 1);
        assert_eq!(owners[0].kind, "Terraform");
        assert_eq!(owners[0].name, "bar");

        let labels = cm.metadata.labels.unwrap();
        assert_eq!(labels["terraformRunId"], "abc123");
    }
}

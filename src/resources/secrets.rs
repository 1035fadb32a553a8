//! # Output Secret
//!
//! The Opaque secret the runner writes module outputs into. Named without the
//! run id: the same secret survives re-runs of the same object.

use crate::crd::Terraform;
use crate::resources::naming;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::{Resource, ResourceExt};
use std::collections::BTreeMap;

/// Builds the desired output secret, initially empty
pub fn output_secret(run: &Terraform) -> Secret {
    let name = run.name_any();

    Secret {
        metadata: ObjectMeta {
            name: Some(naming::output_secret_name(&name)),
            namespace: run.namespace(),
            labels: Some(naming::common_labels(&name, run.current_run_id())),
            owner_references: run.controller_owner_ref(&()).map(|r| vec![r]),
            ..ObjectMeta::default()
        },
        type_: Some("Opaque".to_string()),
        data: Some(BTreeMap::new()),
        ..Secret::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{Module, TerraformSpec, TerraformStatus};

    #[test]
    fn test_output_secret_shape() {
        let mut run = Terraform::new(
            "bar",
            TerraformSpec {
                terraform_version: "1.0.2".into(),
                module: Module {
                    source: "IbraheemAlSaady/test/module".into(),
                    version: None,
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

        let secret = output_secret(&run);
        assert_eq!(secret.metadata.name.as_deref(), Some("bar-outputs"));
        assert_eq!(secret.type_.as_deref(), Some("Opaque"));
        assert!(secret.data.unwrap().is_empty());
        assert_eq!(secret.metadata.owner_references.unwrap().len(), 1);
    }
}

//! # Runner RBAC
//!
//! The per-namespace ServiceAccount and RoleBinding of the Terraform runner.
//! Both carry the fixed name `terraform-runner`; the binding refers to an
//! externally installed ClusterRole of the same name. Shared by all runs in a
//! namespace, created by whichever run is reconciled first.

use crate::constants::RUNNER_RBAC_NAME;
use k8s_openapi::api::core::v1::ServiceAccount;
use k8s_openapi::api::rbac::v1::{RoleBinding, RoleRef, Subject};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

/// Builds the runner ServiceAccount for a namespace
pub fn runner_service_account(namespace: &str) -> ServiceAccount {
    ServiceAccount {
        metadata: ObjectMeta {
            name: Some(RUNNER_RBAC_NAME.to_string()),
            namespace: Some(namespace.to_string()),
            ..ObjectMeta::default()
        },
        ..ServiceAccount::default()
    }
}

/// Builds the runner RoleBinding for a namespace
pub fn runner_role_binding(namespace: &str) -> RoleBinding {
    RoleBinding {
        metadata: ObjectMeta {
            name: Some(RUNNER_RBAC_NAME.to_string()),
            namespace: Some(namespace.to_string()),
            ..ObjectMeta::default()
        },
        role_ref: RoleRef {
            api_group: "rbac.authorization.k8s.io".to_string(),
            kind: "ClusterRole".to_string(),
            name: RUNNER_RBAC_NAME.to_string(),
        },
        subjects: Some(vec![Subject {
            kind: "ServiceAccount".to_string(),
            name: RUNNER_RBAC_NAME.to_string(),
            namespace: Some(namespace.to_string()),
            ..Subject::default()
        }]),
    }
}

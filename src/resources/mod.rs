//! # Child Resources
//!
//! Naming and factories for the Kubernetes objects owned by a Terraform run:
//! the module ConfigMap, the output Secret, the runner Job, and the
//! per-namespace runner RBAC pair.

pub mod configmaps;
pub mod jobs;
pub mod module;
pub mod naming;
pub mod rbac;
pub mod secrets;

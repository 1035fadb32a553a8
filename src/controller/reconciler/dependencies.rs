//! # Dependency Resolution
//!
//! Gates a run on its `dependsOn` references and rewrites variables that
//! read a dependency's outputs into secret-key references. Output piping is
//! same-namespace only.

use crate::controller::reconciler::{Reconciler, ReconcilerError};
use crate::crd::{Terraform, Variable};
use k8s_openapi::api::core::v1::{EnvVarSource, SecretKeySelector};
use kube::ResourceExt;

impl Reconciler {
    /// Loads every referenced run and checks readiness: the dependency's
    /// current generation has been acted upon and its run completed. The
    /// first unready dependency fails resolution with a retryable kind.
    pub(crate) async fn check_dependencies(
        &self,
        run: &Terraform,
    ) -> Result<Vec<Terraform>, ReconcilerError> {
        let mut dependencies = Vec::new();

        for depends_on in &run.spec.depends_on {
            let namespace = depends_on
                .namespace
                .clone()
                .unwrap_or_else(|| run.namespace().unwrap_or_default());
            let key = format!("{namespace}/{}", depends_on.name);

            let dependency = self
                .store()
                .get_run(&namespace, &depends_on.name)
                .await
                .map_err(|err| {
                    ReconcilerError::DependencyNotReady(format!("{key}: {err}"))
                })?;

            let observed = dependency
                .status
                .as_ref()
                .map(|s| s.observed_generation)
                .unwrap_or(0);

            if dependency.metadata.generation.unwrap_or(0) != observed {
                return Err(ReconcilerError::DependencyNotReady(key));
            }

            if dependency.run_status() != Some(crate::crd::TerraformRunStatus::Completed) {
                return Err(ReconcilerError::DependencyNotReady(key));
            }

            dependencies.push(dependency);
        }

        Ok(dependencies)
    }
}

/// Rewrites variables carrying a `dependencyRef` into secret-key references
/// to the matching dependency's output secret.
///
/// Builds a new variable list in one pass over the input; a variable whose
/// reference names no ready same-namespace dependency passes through
/// unchanged.
pub fn rewrite_dependency_variables(run: &mut Terraform, dependencies: &[Terraform]) {
    if dependencies.is_empty() {
        return;
    }

    let run_namespace = run.namespace().unwrap_or_default();

    let variables = run
        .spec
        .variables
        .iter()
        .map(|variable| {
            let Some(dependency_ref) = &variable.dependency_ref else {
                return variable.clone();
            };

            let matched = dependencies.iter().find(|d| {
                d.name_any() == dependency_ref.name
                    && d.namespace().unwrap_or_default() == run_namespace
            });

            let Some(dependency) = matched else {
                return variable.clone();
            };

            let output_secret = dependency
                .status
                .as_ref()
                .map(|s| s.output_secret_name.clone())
                .unwrap_or_default();

            Variable {
                key: variable.key.clone(),
                value: None,
                value_from: Some(EnvVarSource {
                    secret_key_ref: Some(SecretKeySelector {
                        key: dependency_ref.key.clone(),
                        name: output_secret,
                        optional: None,
                    }),
                    ..EnvVarSource::default()
                }),
                environment_variable: variable.environment_variable,
                dependency_ref: variable.dependency_ref.clone(),
            }
        })
        .collect();

    run.spec.variables = variables;
}

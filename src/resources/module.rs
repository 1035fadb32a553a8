//! # Module Renderer
//!
//! Renders the `main.tf` the runner executes from a run's spec. Pure string
//! building, no I/O.

use crate::crd::Terraform;
use kube::ResourceExt;
use std::fmt::Write;
use thiserror::Error;

/// Rendering failure; fatal for the current attempt
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to expand module template: {0}")]
    Template(#[from] std::fmt::Error),
}

/// Renders the `main.tf` for a run.
///
/// Output order: `terraform {}` block (backend stanza, then the required
/// version), the optional providers configuration, one `variable` declaration
/// per non-environment variable, the additional-blocks marker, the module
/// block wiring each variable, and one `output` per declared output.
pub fn render_module(run: &Terraform) -> Result<String, RenderError> {
    let mut tf = String::new();
    let spec = &run.spec;

    writeln!(tf, "terraform {{")?;
    match &spec.backend {
        Some(backend) => writeln!(tf, "{}", backend.trim_end())?,
        None => write!(tf, "{}", default_backend(&run.name_any(), &run.namespace().unwrap_or_default()))?,
    }
    writeln!(tf)?;
    writeln!(tf, "  required_version = \"~> {}\"", spec.terraform_version)?;
    writeln!(tf, "}}")?;

    if let Some(providers) = &spec.providers_config {
        writeln!(tf)?;
        writeln!(tf, "{}", providers.trim_end())?;
    }

    for variable in module_variables(run) {
        writeln!(tf)?;
        writeln!(tf, "variable \"{}\" {{}}", variable)?;
    }

    writeln!(tf)?;
    writeln!(tf, "## additional-blocks")?;

    writeln!(tf)?;
    writeln!(tf, "module \"operator\" {{")?;
    writeln!(tf, "  source = \"{}\"", spec.module.source)?;
    if let Some(version) = &spec.module.version {
        writeln!(tf, "  version = \"{}\"", version)?;
    }
    for variable in module_variables(run) {
        writeln!(tf, "  {key} = var.{key}", key = variable)?;
    }
    writeln!(tf, "}}")?;

    for output in &spec.outputs {
        writeln!(tf)?;
        writeln!(tf, "output \"{}\" {{", output.key)?;
        writeln!(tf, "  value = module.operator.{}", output.module_output_name)?;
        writeln!(tf, "}}")?;
    }

    Ok(tf)
}

/// The Kubernetes backend used when the spec supplies none
fn default_backend(name: &str, namespace: &str) -> String {
    format!(
        r#"  backend "kubernetes" {{
    secret_suffix     = "{name}"
    in_cluster_config = true
    namespace         = "{namespace}"
  }}
"#
    )
}

/// Keys of variables declared as module inputs; environment variables are
/// exported into the runner process instead
fn module_variables(run: &Terraform) -> impl Iterator<Item = &str> {
    run.spec
        .variables
        .iter()
        .filter(|v| !v.environment_variable)
        .map(|v| v.key.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{Module, Output, TerraformSpec, Variable};
    use kube::core::ObjectMeta;

    fn minimal_run() -> Terraform {
        let mut run = Terraform::new(
            "bar",
            TerraformSpec {
                terraform_version: "1.0.2".into(),
                module: Module {
                    source: "IbraheemAlSaady/test/module".into(),
                    version: Some("0.0.1".into()),
                },
                variables: vec![Variable {
                    key: "length".into(),
                    value: Some("16".into()),
                    ..Variable::default()
                }],
                ..empty_spec()
            },
        );
        run.metadata = ObjectMeta {
            name: Some("bar".into()),
            namespace: Some("default".into()),
            ..ObjectMeta::default()
        };
        run
    }

    fn empty_spec() -> TerraformSpec {
        TerraformSpec {
            terraform_version: String::new(),
            module: Module::default(),
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
        }
    }

    #[test]
    fn test_renders_required_version() {
        let tf = render_module(&minimal_run()).unwrap();
        assert!(tf.contains("required_version = \"~> 1.0.2\""));
    }

    #[test]
    fn test_defaults_to_kubernetes_backend() {
        let tf = render_module(&minimal_run()).unwrap();
        assert!(tf.contains("backend \"kubernetes\""));
        assert!(tf.contains("secret_suffix     = \"bar\""));
        assert!(tf.contains("in_cluster_config = true"));
        assert!(tf.contains("namespace         = \"default\""));
    }

    #[test]
    fn test_custom_backend_is_inlined_verbatim() {
        let mut run = minimal_run();
        run.spec.backend = Some("  backend \"s3\" {\n    bucket = \"state\"\n  }".into());
        let tf = render_module(&run).unwrap();
        assert!(tf.contains("backend \"s3\""));
        assert!(!tf.contains("backend \"kubernetes\""));
    }

    #[test]
    fn test_providers_config_is_inlined() {
        let mut run = minimal_run();
        run.spec.providers_config = Some("provider \"aws\" {\n  region = \"eu-west-1\"\n}".into());
        let tf = render_module(&run).unwrap();
        assert!(tf.contains("provider \"aws\""));
    }

    #[test]
    fn test_environment_variables_are_not_declared() {
        let mut run = minimal_run();
        run.spec.variables.push(Variable {
            key: "AWS_ACCESS_KEY_ID".into(),
            value: Some("x".into()),
            environment_variable: true,
            ..Variable::default()
        });
        let tf = render_module(&run).unwrap();
        assert!(!tf.contains("variable \"AWS_ACCESS_KEY_ID\""));
        assert!(!tf.contains("AWS_ACCESS_KEY_ID = var."));
        assert!(tf.contains("variable \"length\" {}"));
    }

    #[test]
    fn test_outputs_reference_module_output_names() {
        let mut run = minimal_run();
        run.spec.outputs = vec![Output {
            key: "pet_name".into(),
            module_output_name: "name".into(),
        }];
        let tf = render_module(&run).unwrap();
        assert!(tf.contains("output \"pet_name\" {"));
        assert!(tf.contains("value = module.operator.name"));
    }

    #[test]
    fn test_block_ordering() {
        let mut run = minimal_run();
        run.spec.outputs = vec![Output {
            key: "pet_name".into(),
            module_output_name: "name".into(),
        }];
        let tf = render_module(&run).unwrap();

        let version = tf.find("required_version = \"~> 1.0.2\"").unwrap();
        let declaration = tf.find("variable \"length\" {}").unwrap();
        let marker = tf.find("## additional-blocks").unwrap();
        let source = tf.find("source = \"IbraheemAlSaady/test/module\"").unwrap();
        let module_version = tf.find("version = \"0.0.1\"").unwrap();
        let wiring = tf.find("length = var.length").unwrap();
        let output = tf.find("output \"pet_name\"").unwrap();

        assert!(version < declaration);
        assert!(declaration < marker);
        assert!(marker < source);
        assert!(source < module_version);
        assert!(module_version < wiring);
        assert!(wiring < output);
    }
}

//! # Operator Configuration
//!
//! Settings loaded from environment variables once at startup and injected
//! into the reconciler. No module reads the environment after initialization.

use crate::constants::*;

/// Resolved operator configuration
#[derive(Debug, Clone)]
pub struct OperatorConfig {
    /// Registry prefix for the runner image
    pub docker_registry: String,
    /// Runner image repository
    pub runner_image: String,
    /// Runner image tag
    pub runner_image_tag: String,
    /// Name of the ConfigMap mounted into the runner supplying SSH known_hosts
    pub known_hosts_configmap_name: String,
    /// Requeue interval while waiting for dependencies (seconds)
    pub requeue_dependency_secs: u64,
    /// Requeue interval while polling a run job (seconds)
    pub requeue_job_watch_secs: u64,
    /// HTTP server port for metrics and health probes
    pub metrics_port: u16,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            docker_registry: DEFAULT_DOCKER_REGISTRY.to_string(),
            runner_image: DEFAULT_RUNNER_IMAGE.to_string(),
            runner_image_tag: DEFAULT_RUNNER_IMAGE_TAG.to_string(),
            known_hosts_configmap_name: DEFAULT_KNOWN_HOSTS_CONFIGMAP_NAME.to_string(),
            requeue_dependency_secs: DEFAULT_REQUEUE_DEPENDENCY_SECS,
            requeue_job_watch_secs: DEFAULT_REQUEUE_JOB_WATCH_SECS,
            metrics_port: DEFAULT_METRICS_PORT,
        }
    }
}

impl OperatorConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self {
            docker_registry: env_var_or_default("DOCKER_REGISTRY", DEFAULT_DOCKER_REGISTRY.into()),
            runner_image: env_var_or_default("TERRAFORM_RUNNER_IMAGE", DEFAULT_RUNNER_IMAGE.into()),
            runner_image_tag: env_var_or_default(
                "TERRAFORM_RUNNER_IMAGE_TAG",
                DEFAULT_RUNNER_IMAGE_TAG.into(),
            ),
            known_hosts_configmap_name: env_var_or_default(
                "KNOWN_HOSTS_CONFIGMAP_NAME",
                DEFAULT_KNOWN_HOSTS_CONFIGMAP_NAME.into(),
            ),
            requeue_dependency_secs: env_var_or_default(
                "REQUEUE_DEPENDENCY_SECS",
                DEFAULT_REQUEUE_DEPENDENCY_SECS,
            ),
            requeue_job_watch_secs: env_var_or_default(
                "REQUEUE_JOB_WATCH_SECS",
                DEFAULT_REQUEUE_JOB_WATCH_SECS,
            ),
            metrics_port: env_var_or_default("METRICS_PORT", DEFAULT_METRICS_PORT),
        }
    }

    /// Full image reference of the runner container
    pub fn runner_image_ref(&self) -> String {
        format!(
            "{}/{}:{}",
            self.docker_registry, self.runner_image, self.runner_image_tag
        )
    }
}

/// Read environment variable or return default value
fn env_var_or_default<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = OperatorConfig::default();
        assert_eq!(config.requeue_dependency_secs, 30);
        assert_eq!(config.requeue_job_watch_secs, 10);
        assert_eq!(config.metrics_port, 8080);
    }

    #[test]
    fn test_runner_image_ref() {
        let config = OperatorConfig {
            docker_registry: "ghcr.io".into(),
            runner_image: "acme/terraform-runner".into(),
            runner_image_tag: "v1.2.3".into(),
            ..OperatorConfig::default()
        };
        assert_eq!(config.runner_image_ref(), "ghcr.io/acme/terraform-runner:v1.2.3");
    }
}

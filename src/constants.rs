//! # Constants
//!
//! Operator-wide defaults and fixed names.

/// Default requeue interval while waiting for dependencies (seconds)
pub const DEFAULT_REQUEUE_DEPENDENCY_SECS: u64 = 30;

/// Default requeue interval while polling a run job (seconds)
pub const DEFAULT_REQUEUE_JOB_WATCH_SECS: u64 = 10;

/// Default HTTP port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 8080;

/// How long to wait for the HTTP server to bind before giving up (seconds)
pub const DEFAULT_SERVER_STARTUP_TIMEOUT_SECS: u64 = 10;

/// How often to poll server readiness during startup (milliseconds)
pub const DEFAULT_SERVER_POLL_INTERVAL_MS: u64 = 100;

/// Default registry prefix for the runner image
pub const DEFAULT_DOCKER_REGISTRY: &str = "docker.io";

/// Default runner image repository
pub const DEFAULT_RUNNER_IMAGE: &str = "kuptan/terraform-runner";

/// Default runner image tag
pub const DEFAULT_RUNNER_IMAGE_TAG: &str = "latest";

/// Default name of the ConfigMap supplying SSH known_hosts to the runner
pub const DEFAULT_KNOWN_HOSTS_CONFIGMAP_NAME: &str = "terraform-runner-known-hosts";

/// Fixed name of the per-namespace runner ServiceAccount, RoleBinding, and
/// the externally installed ClusterRole the binding refers to
pub const RUNNER_RBAC_NAME: &str = "terraform-runner";

/// Directory the runner executes terraform in; the module ConfigMap is
/// mounted here as `main.tf`
pub const RUNNER_WORKING_DIR: &str = "/tmp/tfworkspace";

/// Directory variable files are mounted under, each named by its key
pub const RUNNER_VAR_FILES_DIR: &str = "/tmp/tfvars";

/// emptyDir mount for terraform plugin and state caches
pub const RUNNER_CACHE_DIR: &str = "/tmp/tfcache";

/// Mount path of the git SSH identity
pub const RUNNER_SSH_KEY_DIR: &str = "/root/.ssh-key";

/// Mount path of the SSH known_hosts file
pub const RUNNER_KNOWN_HOSTS_DIR: &str = "/etc/ssh-known-hosts";

/// Unix-date style timestamp layout used in the status subresource; pinned
/// to UTC so stamps parse back with the same layout
pub const STATUS_TIME_LAYOUT: &str = "%a %b %e %H:%M:%S UTC %Y";

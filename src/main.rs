//! # Terraform Operator
//!
//! A Kubernetes operator that runs Terraform modules as in-cluster jobs.
//!
//! ## Overview
//!
//! 1. **Watching runs** - Monitors `Terraform` resources across all namespaces
//! 2. **Materializing jobs** - Renders the module, prepares RBAC and the
//!    output secret, and submits a runner Job per attempt
//! 3. **Tracking lifecycle** - Follows the job to completion and re-runs on
//!    spec edits with a fresh run id
//! 4. **Dependencies** - Gates runs on other runs and pipes their outputs in
//!    as secret-key references
//! 5. **Prometheus metrics** - Exposes run counters and durations, with
//!    health probes for liveness and readiness

use anyhow::Result;
use terraform_operator::runtime::{initialization::initialize, watch::run_watch_loop};

#[tokio::main]
async fn main() -> Result<()> {
    let init_result = initialize().await?;

    run_watch_loop(init_result).await?;

    Ok(())
}

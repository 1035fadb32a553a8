//! # Naming & Labeling
//!
//! Deterministic names and labels for child resources, keyed by the run name
//! and run id. Successive attempts never collide because every run-scoped
//! child carries the run id in its name.

use rand::Rng;
use std::collections::BTreeMap;

/// Label value identifying all children of the operator
const COMPONENT_LABEL: &str = "Terraform-run";

/// Label value identifying the owning API group
const OWNER_LABEL: &str = "run.terraform-operator.io";

/// Maximum length a run name contributes to a child resource name, leaving
/// room for the run-id suffix within the Kubernetes 253-character limit
const MAX_NAME_PREFIX: usize = 220;

/// Returns a unique name for a run-scoped child resource
pub fn unique_resource_name(name: &str, run_id: &str) -> String {
    format!("{}-{}", truncate_resource_name(name, MAX_NAME_PREFIX), run_id)
}

/// Returns the name of the output secret of a run; not keyed by run id, the
/// secret survives re-runs
pub fn output_secret_name(run_name: &str) -> String {
    format!("{}-outputs", truncate_resource_name(run_name, MAX_NAME_PREFIX))
}

/// Common labels attached to every child resource
pub fn common_labels(name: &str, run_id: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("terraformRunName".to_string(), name.to_string()),
        ("terraformRunId".to_string(), run_id.to_string()),
        ("component".to_string(), COMPONENT_LABEL.to_string()),
        ("owner".to_string(), OWNER_LABEL.to_string()),
    ])
}

/// Generates a random lower-alphanumeric token of the given length
pub fn random_run_id(len: usize) -> String {
    const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

    let mut rng = rand::rng();
    (0..len)
        .map(|_| LETTERS[rng.random_range(0..LETTERS.len())] as char)
        .collect()
}

/// Truncates a resource name to `max`, trimming so the result still ends in
/// an alphanumeric character
fn truncate_resource_name(name: &str, max: usize) -> String {
    if name.len() < max {
        return name.to_string();
    }

    name[..max]
        .trim_end_matches('-')
        .trim_end_matches('.')
        .to_string()
}

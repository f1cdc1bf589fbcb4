// src/lib.rs
//! Canonicalizes cloud IAM identity and resource policies into one
//! per-principal statement set, and compiles oracle verdicts over that set
//! into a permission graph.

pub use classifier::{WILDCARD, classify, is_account_root, is_iam_arn};
pub use config::PipelineConfig;
pub use error::{ErrorKind, PermGraphError};
pub use graph::{CREDENTIALS_REPORT, PERMISSIONS, build_graph, flatten_details};
pub use identity::{InlinePolicy, ManagedPolicyCatalog, RawPrincipal, aggregate};
pub use inventory::{
    CredentialsReport, InventorySplit, attach_credentials_report, parse_credentials_report, split,
};
pub use loader::{load_service_dumps, parse_service_dump, read_json_file};
pub use merge::merge;
pub use normalize::{normalize, normalize_actions, normalize_document, statement_principals};
pub use oracle::{
    ACTION_NAME_EXCEPTIONS, MIN_ACTION_NAME_LEN, PolicyOracle, SimulationRequest, SimulationResult,
    collect_decisions, is_valid_action_name,
};
pub use pipeline::{Canonicalized, Evaluated, PermissionPipeline};
pub use resource::{
    CanonicalResources, ResourceInventory, ResourceRecord, ServiceDump, canonicalize,
};
pub use timers::{PhaseTimer, StageTimings};
pub use types::*;

mod classifier;
mod config;
mod error;
mod graph;
mod identity;
mod inventory;
mod loader;
mod merge;
pub mod metrics;
mod normalize;
mod oracle;
mod pipeline;
mod resource;
mod timers;
mod types;

#[cfg(test)]
mod tests;

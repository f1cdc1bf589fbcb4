use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::PermGraphError;

/// Knobs for the canonicalization pipeline. Every flag defaults to `true`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineConfig {
    /// Decode resource `Policy` / `Policies.*` values that arrive as JSON
    /// strings.
    pub parse_embedded_policies: bool,
    /// Treat `"Principal": "*"` like `"Principal": {"AWS": "*"}`.
    pub accept_bare_principal_wildcard: bool,
    /// Do not send account-root principals to the oracle.
    pub skip_root_principals: bool,
    /// Attach each principal's decision set to its node as `Permissions`.
    pub attach_decisions: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            parse_embedded_policies: true,
            accept_bare_principal_wildcard: true,
            skip_root_principals: true,
            attach_decisions: true,
        }
    }
}

impl PipelineConfig {
    /// Parse a JSON object of overrides. Anything but an object is rejected.
    pub fn from_json_str(text: &str) -> Result<Self, PermGraphError> {
        let overrides: Map<String, Value> = serde_json::from_str(text)?;
        Ok(serde_json::from_value(Value::Object(overrides))?)
    }
}

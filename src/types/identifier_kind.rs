//! Identifier and node type names.
//!
//! Centralizes the type names used for principals and graph nodes so the
//! rest of the crate does not deal in magic strings.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

/// What an opaque identifier string names.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
pub enum IdentifierKind {
    Group,
    Role,
    User,
    Resource,
    /// The `*` principal sentinel.
    Wildcard,
    /// Nothing usable at all, e.g. an empty string.
    Unknown,
}

impl IdentifierKind {
    /// Group, Role or User.
    pub fn is_principal(&self) -> bool {
        matches!(self, Self::Group | Self::Role | Self::User)
    }
}

/// The type carried by a node in the exported graph.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    ToSchema,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum NodeType {
    Group,
    Role,
    User,
    Resource,
    Unknown,
}

impl NodeType {
    /// Node type for a key found in the principal input set. Keys that do not
    /// look like a principal are typed `Unknown` rather than `Resource`; only
    /// edge targets become `Resource` nodes.
    pub fn for_principal_key(kind: IdentifierKind) -> Self {
        match kind {
            IdentifierKind::Group => Self::Group,
            IdentifierKind::Role => Self::Role,
            IdentifierKind::User => Self::User,
            _ => Self::Unknown,
        }
    }
}

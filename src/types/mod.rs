//! Data model types shared by the pipeline stages.
//!
//! Canonical JSON forms:
//! - Statement: `[[actions...], [resources...]]`
//! - PrincipalPolicySet: `{principalKey: {Statements: [...], ...details}}`
//! - DecisionSet: `{principalKey: {allowed, explicitDeny, implicitDeny}}`
//!   with each decision an `[action, resource]` pair
//! - PermissionGraph: `{nodes: [{id, type, ...}], edges: [{source, target, relationship}]}`

mod attr_value;
mod decision;
mod graph;
mod identifier_kind;
mod policy_set;
mod report;
mod statement;

pub use attr_value::AttrValue;
pub use decision::{ActionResource, DecisionSet, EvalDecision, PrincipalDecisions};
pub use graph::{Edge, Node, PermissionGraph, Relationship};
pub use identifier_kind::{IdentifierKind, NodeType};
pub use policy_set::{IdentityPolicySet, PolicyEntry, PrincipalPolicySet, ResourcePolicySet};
pub use report::{SkipReport, Skipped};
pub use statement::{Statement, StringList};

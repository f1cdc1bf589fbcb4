//! Effective-permission decisions produced by the external policy oracle.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display as StrumDisplay, EnumString};

use crate::error::PermGraphError;

/// The oracle's verdict for one action on one resource.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, StrumDisplay, EnumString, AsRefStr,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum EvalDecision {
    Allowed,
    ExplicitDeny,
    ImplicitDeny,
}

/// An `(action, resource)` pair, serialized as a two-element array.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActionResource(pub String, pub String);

impl ActionResource {
    pub fn new(action: impl Into<String>, resource: impl Into<String>) -> Self {
        ActionResource(action.into(), resource.into())
    }

    pub fn action(&self) -> &str {
        &self.0
    }

    pub fn resource(&self) -> &str {
        &self.1
    }

    /// Split the action on its first `:` into `(service, operation)`. Actions
    /// without a service prefix report the service as `"Unknown"`.
    pub fn service_and_operation(&self) -> (&str, &str) {
        match self.0.split_once(':') {
            Some((service, operation)) => (service, operation),
            None => ("Unknown", self.0.as_str()),
        }
    }
}

impl Display for ActionResource {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{} on {}", self.0, self.1)
    }
}

/// Decisions for one principal, bucketed by verdict, in the order the oracle
/// returned them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrincipalDecisions {
    #[serde(default)]
    pub allowed: Vec<ActionResource>,
    #[serde(default)]
    pub explicit_deny: Vec<ActionResource>,
    #[serde(default)]
    pub implicit_deny: Vec<ActionResource>,
}

impl PrincipalDecisions {
    pub fn record(&mut self, decision: EvalDecision, pair: ActionResource) {
        match decision {
            EvalDecision::Allowed => self.allowed.push(pair),
            EvalDecision::ExplicitDeny => self.explicit_deny.push(pair),
            EvalDecision::ImplicitDeny => self.implicit_deny.push(pair),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty() && self.explicit_deny.is_empty() && self.implicit_deny.is_empty()
    }

    pub fn len(&self) -> usize {
        self.allowed.len() + self.explicit_deny.len() + self.implicit_deny.len()
    }
}

/// `{principalArn: {allowed, explicitDeny, implicitDeny}}`, keyed in lexical
/// order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DecisionSet {
    principals: BTreeMap<String, PrincipalDecisions>,
}

impl DecisionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(text: &str) -> Result<Self, PermGraphError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn record(
        &mut self,
        principal: impl Into<String>,
        decision: EvalDecision,
        pair: ActionResource,
    ) {
        self.principals
            .entry(principal.into())
            .or_default()
            .record(decision, pair);
    }

    pub fn insert(&mut self, principal: impl Into<String>, decisions: PrincipalDecisions) {
        self.principals.insert(principal.into(), decisions);
    }

    pub fn get(&self, principal: &str) -> Option<&PrincipalDecisions> {
        self.principals.get(principal)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PrincipalDecisions)> {
        self.principals.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.principals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.principals.is_empty()
    }
}

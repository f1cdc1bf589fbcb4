//! Identity policy aggregation.
//!
//! Builds one statement list per principal out of its inline policies, the
//! policies of the groups it belongs to, and its attached managed policies.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{debug, info};

use crate::classifier::classify;
use crate::error::PermGraphError;
use crate::normalize::{document_statements, normalize_document, statement_principals};
use crate::types::{IdentifierKind, IdentityPolicySet, PolicyEntry, SkipReport, Statement};

/// Managed policies whose path starts with this are owned by the provider's
/// services and cannot be attached by customers.
const SERVICE_POLICY_PATH_PREFIX: &str = "/aws-service";

/// A named inline policy document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InlinePolicy {
    pub name: String,
    pub document: Value,
}

/// A principal as enumerated from the provider, before aggregation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawPrincipal {
    pub arn: String,
    #[serde(default)]
    pub friendly_name: Option<String>,
    #[serde(default)]
    pub inline_policies: Vec<InlinePolicy>,
    #[serde(default)]
    pub managed_policies: Vec<String>,
    #[serde(default)]
    pub member_of: Vec<String>,
    #[serde(default, rename = "AssumeRolePolicyDocument")]
    pub trust_policy: Option<Value>,
    /// Any other raw fields, carried through as details.
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl RawPrincipal {
    pub fn new(arn: impl Into<String>) -> Self {
        RawPrincipal {
            arn: arn.into(),
            ..Default::default()
        }
    }

    pub fn with_friendly_name(mut self, name: impl Into<String>) -> Self {
        self.friendly_name = Some(name.into());
        self
    }

    pub fn with_inline_policy(mut self, name: impl Into<String>, document: Value) -> Self {
        self.inline_policies.push(InlinePolicy {
            name: name.into(),
            document,
        });
        self
    }

    pub fn with_managed_policy(mut self, arn: impl Into<String>) -> Self {
        self.managed_policies.push(arn.into());
        self
    }

    pub fn member_of(mut self, group_arn: impl Into<String>) -> Self {
        self.member_of.push(group_arn.into());
        self
    }

    pub fn with_trust_policy(mut self, document: Value) -> Self {
        self.trust_policy = Some(document);
        self
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

/// Prefetched managed policies: `{policyArn: statements}`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManagedPolicyCatalog {
    policies: BTreeMap<String, Vec<Statement>>,
}

impl ManagedPolicyCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, arn: impl Into<String>, statements: Vec<Statement>) {
        self.policies.insert(arn.into(), statements);
    }

    /// Build a catalog from raw `(policyArn, record)` pairs.
    ///
    /// A record may be a bare policy document (`{Statement: ...}`), a listing
    /// record wrapping one (`{Document: ...}` or `{PolicyVersion: {Document}}`,
    /// optionally with `Path` and `IsAttachable`), or an already normalized
    /// `{Statements: [[actions, resources], ...]}` entry. Service-owned and
    /// non-attachable policies are left out.
    pub fn from_records<I>(records: I) -> (Self, SkipReport)
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let mut catalog = ManagedPolicyCatalog::new();
        let mut report = SkipReport::new();

        for (arn, record) in records {
            if !is_customer_attachable(&record) {
                debug!(event = "Catalog", phase = "Filter", policy = arn);
                continue;
            }

            if let Some(normalized) = record.get("Statements") {
                match serde_json::from_value::<Vec<Statement>>(normalized.clone()) {
                    Ok(statements) => catalog.insert(arn, statements),
                    Err(e) => report.skip(&arn, "Statements", PermGraphError::Malformed(e.to_string())),
                }
                continue;
            }

            let document = record
                .get("PolicyVersion")
                .and_then(|v| v.get("Document"))
                .or_else(|| record.get("Document"))
                .unwrap_or(&record);

            match normalize_document(document) {
                Ok((statements, rejected)) => {
                    for (idx, e) in rejected {
                        report.skip(&arn, format!("Statement[{idx}]"), e);
                    }
                    catalog.insert(arn, statements);
                }
                Err(e) => report.skip(&arn, "Document", e),
            }
        }

        (catalog, report)
    }

    /// Parse `{policyArn: record}` JSON text, see [`Self::from_records`].
    pub fn from_json_str(text: &str) -> Result<(Self, SkipReport), PermGraphError> {
        let records: Map<String, Value> = serde_json::from_str(text)?;
        Ok(Self::from_records(records))
    }

    pub fn statements(&self, arn: &str) -> Option<&[Statement]> {
        self.policies.get(arn).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

fn is_customer_attachable(record: &Value) -> bool {
    let attachable = record
        .get("IsAttachable")
        .and_then(Value::as_bool)
        .unwrap_or(true);
    let service_owned = record
        .get("Path")
        .and_then(Value::as_str)
        .is_some_and(|p| p.starts_with(SERVICE_POLICY_PATH_PREFIX));
    attachable && !service_owned
}

/// Statements of one principal, split by origin.
#[derive(Default)]
struct OwnStatements {
    inline: Vec<Statement>,
    managed: Vec<Statement>,
}

impl OwnStatements {
    fn full(&self) -> impl Iterator<Item = &Statement> {
        self.inline.iter().chain(self.managed.iter())
    }
}

/// Aggregate identity-based statements for every principal.
///
/// Per principal the order is: inline statements, then (users only) the
/// full statement list of every group it joined in membership order, then
/// its own managed policies in attachment order. Nothing is deduplicated.
pub fn aggregate(
    principals: &[RawPrincipal],
    catalog: &ManagedPolicyCatalog,
) -> (IdentityPolicySet, SkipReport) {
    let mut report = SkipReport::new();

    let own: HashMap<&str, OwnStatements> = principals
        .iter()
        .map(|p| (p.arn.as_str(), own_statements(p, catalog, &mut report)))
        .collect();

    let mut set = IdentityPolicySet::new();
    for principal in principals {
        let Some(mine) = own.get(principal.arn.as_str()) else {
            continue;
        };
        let kind = classify(&principal.arn);

        let mut statements = mine.inline.clone();
        if kind == IdentifierKind::User {
            for group in &principal.member_of {
                match own.get(group.as_str()) {
                    Some(group_statements) => statements.extend(group_statements.full().cloned()),
                    None => debug!(
                        event = "Aggregate",
                        phase = "Groups",
                        principal = principal.arn.as_str(),
                        group = group.as_str(),
                        "group not enumerated"
                    ),
                }
            }
        } else if !principal.member_of.is_empty() {
            debug!(
                event = "Aggregate",
                phase = "Groups",
                principal = principal.arn.as_str(),
                kind = kind.as_ref(),
                "membership ignored for non-user principal"
            );
        }
        statements.extend(mine.managed.iter().cloned());

        let entry = PolicyEntry {
            statements,
            details: principal_details(principal, kind, &mut report),
        };
        set.insert(principal.arn.clone(), entry);
    }

    info!(
        event = "Aggregate",
        phase = "Done",
        principals = set.len(),
        statements = set.statement_count(),
        skipped = report.len()
    );
    (set, report)
}

fn own_statements(
    principal: &RawPrincipal,
    catalog: &ManagedPolicyCatalog,
    report: &mut SkipReport,
) -> OwnStatements {
    let mut own = OwnStatements::default();

    for policy in &principal.inline_policies {
        match normalize_document(&policy.document) {
            Ok((statements, rejected)) => {
                for (idx, e) in rejected {
                    report.skip(&principal.arn, format!("{}/Statement[{idx}]", policy.name), e);
                }
                own.inline.extend(statements);
            }
            Err(e) => report.skip(&principal.arn, &policy.name, e),
        }
    }

    for arn in &principal.managed_policies {
        match catalog.statements(arn) {
            Some(statements) => own.managed.extend_from_slice(statements),
            None => debug!(
                event = "Aggregate",
                phase = "Managed",
                principal = principal.arn.as_str(),
                policy = arn.as_str(),
                "managed policy not in catalog"
            ),
        }
    }

    own
}

fn principal_details(
    principal: &RawPrincipal,
    kind: IdentifierKind,
    report: &mut SkipReport,
) -> Map<String, Value> {
    let mut details = principal.details.clone();
    if let Some(name) = &principal.friendly_name {
        details.insert("FriendlyName".into(), json!(name));
    }
    if kind == IdentifierKind::User {
        details.insert("MemberOf".into(), json!(principal.member_of));
    }
    let inline_names: Vec<&str> = principal
        .inline_policies
        .iter()
        .map(|p| p.name.as_str())
        .collect();
    details.insert(
        "AttachedPolicies".into(),
        json!({
            "InlinePolicies": inline_names,
            "ManagedPolicies": principal.managed_policies,
        }),
    );
    if let Some(trust) = &principal.trust_policy {
        details.insert("AssumedBy".into(), json!(assumed_by(&principal.arn, trust, report)));
    }
    details
}

/// Principals allowed to assume a role, read from its trust policy.
fn assumed_by(role: &str, trust_policy: &Value, report: &mut SkipReport) -> Vec<String> {
    match document_statements(trust_policy) {
        Ok(statements) => statements
            .into_iter()
            .filter(|s| s.get("Effect").and_then(Value::as_str) == Some("Allow"))
            .flat_map(|s| statement_principals(s, false))
            .collect(),
        Err(e) => {
            report.skip(role, "AssumeRolePolicyDocument", e);
            Vec::new()
        }
    }
}

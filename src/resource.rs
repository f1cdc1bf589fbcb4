//! Resource policy canonicalization.
//!
//! Every service dumps its resource policies in its own shape. This module
//! decodes each shape into the policy holders it contains, collects their
//! statements, and files each statement under the principal it names, with
//! the resource it came from as the only resource.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::config::PipelineConfig;
use crate::error::PermGraphError;
use crate::normalize::{document_statements, json_type, normalize_actions, statement_principals};
use crate::types::{ResourcePolicySet, SkipReport, Statement};

/// One service's raw resource policy dump, `{resourceArn: entry}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDump {
    pub service: String,
    pub document: Value,
}

impl ServiceDump {
    pub fn new(service: impl Into<String>, document: Value) -> Self {
        ServiceDump {
            service: service.into(),
            document,
        }
    }
}

/// What the canonicalizer knows about a resource that carried a policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub service: String,
    #[serde(rename = "Name", skip_serializing_if = "Option::is_none", default)]
    pub name: Option<String>,
    #[serde(rename = "QueueUrl", skip_serializing_if = "Option::is_none", default)]
    pub queue_url: Option<String>,
    #[serde(rename = "statementCount")]
    pub statement_count: usize,
}

/// `{resourceArn: ResourceRecord}` for every resource that contributed
/// statements.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceInventory {
    records: BTreeMap<String, ResourceRecord>,
}

impl ResourceInventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, arn: &str) -> Option<&ResourceRecord> {
        self.records.get(arn)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ResourceRecord)> {
        self.records.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn record(&mut self, arn: &str, service: &str, holder: &Map<String, Value>, statements: usize) {
        let record = self
            .records
            .entry(arn.to_string())
            .or_insert_with(|| ResourceRecord {
                service: service.to_string(),
                name: None,
                queue_url: None,
                statement_count: 0,
            });
        record.statement_count += statements;
        if record.name.is_none() {
            record.name = holder.get("Name").and_then(Value::as_str).map(str::to_string);
        }
        if record.queue_url.is_none() {
            record.queue_url = holder.get("QueueUrl").and_then(Value::as_str).map(str::to_string);
        }
    }
}

/// Output of [`canonicalize`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CanonicalResources {
    pub policies: ResourcePolicySet,
    pub inventory: ResourceInventory,
    pub report: SkipReport,
}

/// The container shapes services use for a resource's policies.
#[derive(Debug)]
enum ResourceShape<'a> {
    /// `{Policy: doc}`, `{Policies: {name: doc}}`, or both.
    Mapped(&'a Map<String, Value>),
    /// `[{Policy, Policies, Name, QueueUrl}, ...]`
    Listed(&'a [Value]),
}

impl<'a> ResourceShape<'a> {
    fn decode(entry: &'a Value) -> Result<Self, PermGraphError> {
        match entry {
            Value::Object(map) => Ok(ResourceShape::Mapped(map)),
            Value::Array(items) => Ok(ResourceShape::Listed(items)),
            other => Err(PermGraphError::Malformed(format!(
                "resource entry must be an object or a list, found {}",
                json_type(other)
            ))),
        }
    }

    /// The policy holders in this shape. List items that are not objects
    /// are reported and left out.
    fn holders(&self, arn: &str, service: &str, report: &mut SkipReport) -> Vec<&'a Map<String, Value>> {
        match self {
            ResourceShape::Mapped(map) => vec![*map],
            ResourceShape::Listed(items) => items
                .iter()
                .enumerate()
                .filter_map(|(idx, item)| match item.as_object() {
                    Some(map) => Some(map),
                    None => {
                        report.skip(
                            service,
                            format!("{arn}[{idx}]"),
                            PermGraphError::Malformed(format!(
                                "list item must be an object, found {}",
                                json_type(item)
                            )),
                        );
                        None
                    }
                })
                .collect(),
        }
    }
}

/// Canonicalize resource policy dumps into `{principalKey: {Statements}}`.
///
/// Statements naming the wildcard principal are filed under `*` as is;
/// fanning them out is left to the merge step. Statements without an
/// identifiable principal and malformed units are skipped and reported.
pub fn canonicalize<'a, I>(dumps: I, config: &PipelineConfig) -> CanonicalResources
where
    I: IntoIterator<Item = &'a ServiceDump>,
{
    let mut out = CanonicalResources::default();

    for dump in dumps {
        let Some(resources) = dump.document.as_object() else {
            out.report.skip(
                &dump.service,
                "document",
                PermGraphError::Malformed(format!(
                    "service dump must be an object, found {}",
                    json_type(&dump.document)
                )),
            );
            continue;
        };

        let before = out.policies.statement_count();
        for (arn, entry) in resources {
            let shape = match ResourceShape::decode(entry) {
                Ok(shape) => shape,
                Err(e) => {
                    out.report.skip(&dump.service, arn, e);
                    continue;
                }
            };
            for holder in shape.holders(arn, &dump.service, &mut out.report) {
                let raw = holder_statements(holder, arn, &dump.service, config, &mut out.report);
                if raw.is_empty() {
                    continue;
                }
                out.inventory.record(arn, &dump.service, holder, raw.len());
                file_statements(&raw, arn, &dump.service, config, &mut out);
            }
        }

        debug!(
            event = "Canonicalize",
            phase = "Service",
            service = dump.service.as_str(),
            resources = resources.len(),
            statements = out.policies.statement_count() - before
        );
    }

    info!(
        event = "Canonicalize",
        phase = "Done",
        principals = out.policies.len(),
        resources = out.inventory.len(),
        statements = out.policies.statement_count(),
        skipped = out.report.len()
    );
    out
}

/// Raw statements under a holder's `Policy` and every `Policies.*` value.
fn holder_statements(
    holder: &Map<String, Value>,
    arn: &str,
    service: &str,
    config: &PipelineConfig,
    report: &mut SkipReport,
) -> Vec<Value> {
    let mut documents = Vec::new();
    if let Some(policy) = holder.get("Policy") {
        documents.push((format!("{arn}/Policy"), policy));
    }
    match holder.get("Policies") {
        Some(Value::Object(named)) => {
            documents.extend(named.iter().map(|(name, doc)| (format!("{arn}/Policies/{name}"), doc)));
        }
        Some(other) => report.skip(
            service,
            format!("{arn}/Policies"),
            PermGraphError::Malformed(format!(
                "Policies must be an object, found {}",
                json_type(other)
            )),
        ),
        None => {}
    }

    let mut raw = Vec::new();
    for (unit, value) in documents {
        let decoded = match decode_policy(value, config) {
            Ok(decoded) => decoded,
            Err(e) => {
                report.skip(service, unit, e);
                continue;
            }
        };
        match document_statements(&decoded) {
            Ok(statements) => raw.extend(statements.into_iter().cloned()),
            Err(e) => report.skip(service, unit, e),
        }
    }
    raw
}

/// A policy document, decoding it first when it arrived as a JSON string.
fn decode_policy(value: &Value, config: &PipelineConfig) -> Result<Value, PermGraphError> {
    match value {
        Value::Object(_) => Ok(value.clone()),
        Value::String(text) if config.parse_embedded_policies => {
            let decoded: Value = serde_json::from_str(text)
                .map_err(|e| PermGraphError::Malformed(format!("embedded policy: {e}")))?;
            if decoded.is_object() {
                Ok(decoded)
            } else {
                Err(PermGraphError::Malformed(format!(
                    "embedded policy must be an object, found {}",
                    json_type(&decoded)
                )))
            }
        }
        other => Err(PermGraphError::Malformed(format!(
            "policy must be an object, found {}",
            json_type(other)
        ))),
    }
}

fn file_statements(
    raw: &[Value],
    arn: &str,
    service: &str,
    config: &PipelineConfig,
    out: &mut CanonicalResources,
) {
    for (idx, statement) in raw.iter().enumerate() {
        let unit = || format!("{arn}/Statement[{idx}]");
        let principals = statement_principals(statement, config.accept_bare_principal_wildcard);
        if principals.is_empty() {
            out.report.skip(
                service,
                unit(),
                PermGraphError::UnresolvedPrincipal("no Principal.AWS".to_string()),
            );
            continue;
        }
        let actions = match normalize_actions(statement) {
            Ok(actions) => actions,
            Err(e) => {
                out.report.skip(service, unit(), e);
                continue;
            }
        };
        for principal in principals {
            let canonical = Statement {
                actions: actions.clone(),
                resources: vec![arn.to_string()],
            };
            out.policies.extend_statements(principal, [canonical]);
        }
    }
}

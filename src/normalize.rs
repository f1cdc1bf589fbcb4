//! Statement normalization.
//!
//! Raw policy statements come in many shapes: `Action` or `NotAction`,
//! `Resource` or `NotResource`, each either a bare string or a (possibly
//! nested) list. Everything downstream only ever sees [`Statement`].

use serde_json::{Map, Value};

use crate::error::PermGraphError;
use crate::types::Statement;

pub const ACTION_FIELDS: [&str; 2] = ["Action", "NotAction"];
pub const RESOURCE_FIELDS: [&str; 2] = ["Resource", "NotResource"];

/// Normalize one raw statement into `(actions, resources)`.
///
/// Fails with `Malformed` when the statement is not an object, when neither
/// field variant is present on either side, or when a field holds something
/// other than strings.
pub fn normalize(raw: &Value) -> Result<Statement, PermGraphError> {
    let obj = as_statement_object(raw)?;
    Ok(Statement {
        actions: select_list(obj, ACTION_FIELDS)?,
        resources: select_list(obj, RESOURCE_FIELDS)?,
    })
}

/// Only the action side of a statement. Resource policy statements are
/// re-targeted at the resource that carries them, so their own
/// `Resource` field does not matter.
pub fn normalize_actions(raw: &Value) -> Result<Vec<String>, PermGraphError> {
    select_list(as_statement_object(raw)?, ACTION_FIELDS)
}

/// The raw statements of a policy document. `Statement` may be a list or a
/// single object; a document without one is `Malformed`.
pub fn document_statements(document: &Value) -> Result<Vec<&Value>, PermGraphError> {
    match document.get("Statement") {
        Some(Value::Array(items)) => Ok(items.iter().collect()),
        Some(single @ Value::Object(_)) => Ok(vec![single]),
        Some(other) => Err(PermGraphError::Malformed(format!(
            "Statement must be a list or an object, found {}",
            json_type(other)
        ))),
        None => Err(PermGraphError::Malformed(
            "policy document has no Statement".to_string(),
        )),
    }
}

/// Normalize every statement of a policy document, keeping the ones that
/// normalize and returning the index and error of those that do not.
pub fn normalize_document(
    document: &Value,
) -> Result<(Vec<Statement>, Vec<(usize, PermGraphError)>), PermGraphError> {
    let mut statements = Vec::new();
    let mut rejected = Vec::new();
    for (idx, raw) in document_statements(document)?.into_iter().enumerate() {
        match normalize(raw) {
            Ok(statement) => statements.push(statement),
            Err(e) => rejected.push((idx, e)),
        }
    }
    Ok((statements, rejected))
}

/// The principals a resource-policy statement names under `Principal.AWS`
/// (string or list), in order. With `accept_bare_wildcard`, a bare
/// `"Principal": "*"` yields the wildcard sentinel as well.
pub fn statement_principals(raw: &Value, accept_bare_wildcard: bool) -> Vec<String> {
    match raw.get("Principal") {
        Some(Value::String(s)) if accept_bare_wildcard && s == "*" => vec![s.clone()],
        Some(Value::Object(principal)) => {
            let mut out = Vec::new();
            if let Some(aws) = principal.get("AWS") {
                collect_strings(aws, &mut out);
            }
            out
        }
        _ => Vec::new(),
    }
}

fn as_statement_object(raw: &Value) -> Result<&Map<String, Value>, PermGraphError> {
    raw.as_object().ok_or_else(|| {
        PermGraphError::Malformed(format!("statement must be an object, found {}", json_type(raw)))
    })
}

fn select_list(obj: &Map<String, Value>, fields: [&str; 2]) -> Result<Vec<String>, PermGraphError> {
    let [primary, fallback] = fields;
    let (field, value) = match (obj.get(primary), obj.get(fallback)) {
        (Some(v), _) if !v.is_null() => (primary, v),
        (_, Some(v)) if !v.is_null() => (fallback, v),
        _ => {
            return Err(PermGraphError::Malformed(format!(
                "statement has neither {primary} nor {fallback}"
            )));
        }
    };
    let mut out = Vec::new();
    flatten_strings(value, field, &mut out)?;
    Ok(out)
}

fn flatten_strings(value: &Value, field: &str, out: &mut Vec<String>) -> Result<(), PermGraphError> {
    match value {
        Value::String(s) => out.push(s.clone()),
        Value::Array(items) => {
            for item in items {
                flatten_strings(item, field, out)?;
            }
        }
        other => {
            return Err(PermGraphError::Malformed(format!(
                "{field} must hold strings, found {}",
                json_type(other)
            )));
        }
    }
    Ok(())
}

// Like `flatten_strings`, but non-string members are dropped instead of
// failing the whole list.
fn collect_strings(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => out.push(s.clone()),
        Value::Array(items) => items.iter().for_each(|item| collect_strings(item, out)),
        _ => {}
    }
}

pub(crate) fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

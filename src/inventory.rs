//! Principal/resource split of the merged set, and credentials report
//! attachment.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::classifier::is_iam_arn;
use crate::error::PermGraphError;
use crate::graph::CREDENTIALS_REPORT;
use crate::types::{PolicyEntry, PrincipalPolicySet};

/// Credentials report rows, `{principalArn: {column: cell}}`.
pub type CredentialsReport = BTreeMap<String, Map<String, Value>>;

/// The merged set split by key namespace.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InventorySplit {
    /// Keys in the IAM namespace: users, groups, roles, account roots.
    pub principals: PrincipalPolicySet,
    /// Everything else, e.g. bare account ids or foreign principals.
    pub resources: PrincipalPolicySet,
}

pub fn split(merged: PrincipalPolicySet) -> InventorySplit {
    let mut out = InventorySplit::default();
    for (key, entry) in merged {
        if is_iam_arn(&key) {
            out.principals.insert(key, entry);
        } else {
            out.resources.insert(key, entry);
        }
    }
    debug!(
        event = "Inventory",
        phase = "Split",
        principals = out.principals.len(),
        resources = out.resources.len()
    );
    out
}

pub fn parse_credentials_report(text: &str) -> Result<CredentialsReport, PermGraphError> {
    Ok(serde_json::from_str(text)?)
}

/// Attach each report row to its principal as a `CredentialsReport` detail,
/// replacing any earlier one. Rows for principals not in the set get an entry
/// of their own with no statements.
pub fn attach_credentials_report(
    mut principals: PrincipalPolicySet,
    report: &CredentialsReport,
) -> PrincipalPolicySet {
    let mut created = 0usize;
    for (arn, row) in report {
        let cells = Value::Object(row.clone());
        match principals.get_mut(arn) {
            Some(entry) => {
                entry.details.insert(CREDENTIALS_REPORT.to_string(), cells);
            }
            None => {
                created += 1;
                principals.insert(arn.as_str(), PolicyEntry::default().with_detail(CREDENTIALS_REPORT, cells));
            }
        }
    }
    info!(
        event = "Inventory",
        phase = "CredentialsReport",
        rows = report.len(),
        created = created
    );
    principals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Statement;
    use serde_json::json;

    const ALICE: &str = "arn:aws:iam::123456789012:user/alice";
    const ROOT: &str = "arn:aws:iam::123456789012:root";

    fn merged() -> PrincipalPolicySet {
        let mut set = PrincipalPolicySet::new();
        set.extend_statements(ALICE, [Statement::new(["s3:GetObject"], ["*"])]);
        set.extend_statements("123456789012", [Statement::new(["sqs:SendMessage"], ["arn:aws:sqs:eu-west-1:123456789012:q"])]);
        set.extend_statements("arn:aws:sts::123456789012:assumed-role/r/s", [Statement::new(["kms:Decrypt"], ["*"])]);
        set
    }

    #[test]
    fn test_split_by_namespace() {
        let split = split(merged());
        assert_eq!(split.principals.keys().collect::<Vec<_>>(), vec![ALICE]);
        assert_eq!(
            split.resources.keys().collect::<Vec<_>>(),
            vec!["123456789012", "arn:aws:sts::123456789012:assumed-role/r/s"]
        );
    }

    #[test]
    fn test_split_keeps_other_partitions_with_principals() {
        let gov = "arn:aws-us-gov:iam::123456789012:user/bob";
        let mut set = merged();
        set.extend_statements(gov, [Statement::new(["s3:GetObject"], ["*"])]);

        let split = split(set);
        assert_eq!(split.principals.keys().collect::<Vec<_>>(), vec![gov, ALICE]);
        assert!(!split.resources.contains_key(gov));
    }

    #[test]
    fn test_credentials_report_attachment() {
        let report = parse_credentials_report(
            &json!({
                ALICE: {"password_enabled": "true", "mfa_active": "false"},
                ROOT: {"password_enabled": "not_supported", "mfa_active": "true"},
            })
            .to_string(),
        )
        .unwrap();

        let principals = attach_credentials_report(split(merged()).principals, &report);
        assert_eq!(principals.len(), 2);
        assert_eq!(principals.statements(ALICE).len(), 1);
        assert_eq!(
            principals.get(ALICE).unwrap().details[CREDENTIALS_REPORT]["password_enabled"],
            json!("true")
        );
        let root = principals.get(ROOT).unwrap();
        assert!(root.statements.is_empty());
        assert_eq!(root.details[CREDENTIALS_REPORT]["mfa_active"], json!("true"));
    }

    #[test]
    fn test_bad_report() {
        let err = parse_credentials_report(r#"{"a": "not a row"}"#).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidJson);
    }
}

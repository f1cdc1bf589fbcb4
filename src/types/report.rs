//! Accounting for input units a stage had to skip.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ErrorKind, PermGraphError};

/// One skipped unit: which stage dropped it, what it was, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skipped {
    /// Stage or file the unit belonged to, e.g. `"s3"` or a principal ARN.
    pub scope: String,
    /// Identifies the unit within its scope, e.g. a statement index.
    pub unit: String,
    pub error: PermGraphError,
}

/// Skipped units collected by a stage. Stages never abort; they record what
/// they dropped here and keep going.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipReport {
    skipped: Vec<Skipped>,
}

impl SkipReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a skipped unit. Unresolved principals log at debug, everything
    /// else at warn.
    pub fn skip(&mut self, scope: impl Into<String>, unit: impl Into<String>, error: PermGraphError) {
        let scope = scope.into();
        let unit = unit.into();
        match error.kind() {
            ErrorKind::UnresolvedPrincipal => {
                debug!(event = "Skip", scope = scope.as_str(), unit = unit.as_str(), reason = %error)
            }
            _ => warn!(event = "Skip", scope = scope.as_str(), unit = unit.as_str(), reason = %error),
        }
        self.skipped.push(Skipped { scope, unit, error });
    }

    pub fn merge(&mut self, other: SkipReport) {
        self.skipped.extend(other.skipped);
    }

    pub fn skipped(&self) -> &[Skipped] {
        &self.skipped
    }

    pub fn len(&self) -> usize {
        self.skipped.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skipped.is_empty()
    }

    pub fn count(&self, kind: ErrorKind) -> usize {
        self.skipped.iter().filter(|s| s.error.kind() == kind).count()
    }

    /// Skip counts per error kind, for summaries.
    pub fn counts(&self) -> BTreeMap<ErrorKind, usize> {
        let mut counts = BTreeMap::new();
        for s in &self.skipped {
            *counts.entry(s.error.kind()).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_by_kind() {
        let mut report = SkipReport::new();
        report.skip("s3", "0", PermGraphError::Malformed("no Action".into()));
        report.skip("s3", "1", PermGraphError::UnresolvedPrincipal("no Principal".into()));
        report.skip("kms", "0", PermGraphError::Malformed("no Resource".into()));

        assert_eq!(report.len(), 3);
        assert_eq!(report.count(ErrorKind::Malformed), 2);
        assert_eq!(report.count(ErrorKind::UnresolvedPrincipal), 1);
        assert_eq!(report.count(ErrorKind::MissingFile), 0);
        assert_eq!(report.counts().get(&ErrorKind::Malformed), Some(&2));
    }

    #[test]
    fn test_merge_keeps_order() {
        let mut first = SkipReport::new();
        first.skip("a", "0", PermGraphError::Malformed("x".into()));
        let mut second = SkipReport::new();
        second.skip("b", "0", PermGraphError::IoFailure("y".into()));
        first.merge(second);
        let scopes: Vec<&str> = first.skipped().iter().map(|s| s.scope.as_str()).collect();
        assert_eq!(scopes, vec!["a", "b"]);
    }

    #[test]
    fn test_serializes() {
        let mut report = SkipReport::new();
        report.skip("sqs", "queue", PermGraphError::InvalidJson("eof".into()));
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["skipped"][0]["scope"], "sqs");
        assert_eq!(value["skipped"][0]["error"]["InvalidJson"], "eof");
    }
}

//! Per-principal statement collections.

use std::collections::BTreeMap;
use std::collections::btree_map::{Entry, Iter};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::statement::Statement;
use crate::error::PermGraphError;

/// Everything known about one principal key: its ordered statements plus any
/// raw detail fields (`FriendlyName`, `MemberOf`, `AttachedPolicies`, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyEntry {
    #[serde(rename = "Statements", default)]
    pub statements: Vec<Statement>,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl PolicyEntry {
    pub fn with_statements(statements: Vec<Statement>) -> Self {
        PolicyEntry {
            statements,
            details: Map::new(),
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

/// `{principalKey: {Statements: [...], ...details}}`.
///
/// Keys are kept in lexical order, so iteration and serialization are
/// reproducible regardless of the order entries were added in. Writing to an
/// existing key extends its statements; nothing is replaced or deduplicated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalPolicySet {
    entries: BTreeMap<String, PolicyEntry>,
}

/// Identity-side set: inline, group and managed statements per principal.
pub type IdentityPolicySet = PrincipalPolicySet;

/// Resource-side set: resource policy statements re-keyed by principal.
pub type ResourcePolicySet = PrincipalPolicySet;

impl PrincipalPolicySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(text: &str) -> Result<Self, PermGraphError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json_string(&self) -> Result<String, PermGraphError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Append statements to `key`, creating the entry if needed.
    pub fn extend_statements<I>(&mut self, key: impl Into<String>, statements: I)
    where
        I: IntoIterator<Item = Statement>,
    {
        self.entries
            .entry(key.into())
            .or_default()
            .statements
            .extend(statements);
    }

    /// Insert an entry, merging into any entry already stored under `key`:
    /// statements are appended, details fill in fields not yet present.
    pub fn insert(&mut self, key: impl Into<String>, entry: PolicyEntry) {
        match self.entries.entry(key.into()) {
            Entry::Vacant(slot) => {
                slot.insert(entry);
            }
            Entry::Occupied(mut slot) => {
                let existing = slot.get_mut();
                existing.statements.extend(entry.statements);
                for (k, v) in entry.details {
                    existing.details.entry(k).or_insert(v);
                }
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&PolicyEntry> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut PolicyEntry> {
        self.entries.get_mut(key)
    }

    /// The statements stored under `key`, empty when the key is absent.
    pub fn statements(&self, key: &str) -> &[Statement] {
        self.entries
            .get(key)
            .map(|e| e.statements.as_slice())
            .unwrap_or_default()
    }

    pub fn remove(&mut self, key: &str) -> Option<PolicyEntry> {
        self.entries.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> Iter<'_, String, PolicyEntry> {
        self.entries.iter()
    }

    pub(crate) fn values_mut(&mut self) -> impl Iterator<Item = &mut PolicyEntry> {
        self.entries.values_mut()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of statements across all keys.
    pub fn statement_count(&self) -> usize {
        self.entries.values().map(|e| e.statements.len()).sum()
    }
}

impl IntoIterator for PrincipalPolicySet {
    type Item = (String, PolicyEntry);
    type IntoIter = std::collections::btree_map::IntoIter<String, PolicyEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a PrincipalPolicySet {
    type Item = (&'a String, &'a PolicyEntry);
    type IntoIter = Iter<'a, String, PolicyEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl FromIterator<(String, PolicyEntry)> for PrincipalPolicySet {
    fn from_iter<T: IntoIterator<Item = (String, PolicyEntry)>>(iter: T) -> Self {
        let mut set = PrincipalPolicySet::new();
        for (key, entry) in iter {
            set.insert(key, entry);
        }
        set
    }
}

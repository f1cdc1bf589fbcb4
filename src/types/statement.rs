//! The canonical statement unit shared by every pipeline stage.

use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};

/// A string or an arbitrarily nested list of strings, as found in the
/// `Action` / `Resource` fields of raw policy documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StringList {
    One(String),
    Many(Vec<StringList>),
}

impl StringList {
    /// Flatten into a single list, preserving order.
    pub fn flatten(self) -> Vec<String> {
        match self {
            StringList::One(s) => vec![s],
            StringList::Many(items) => items.into_iter().flat_map(StringList::flatten).collect(),
        }
    }
}

/// An `(actions, resources)` pair.
///
/// Both sides are always lists, even when the source document used a bare
/// string. Serialized as a two-element array, `[actions, resources]`, which is
/// the form identity records carry under `Statements`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(
    from = "(Option<StringList>, Option<StringList>)",
    into = "(Vec<String>, Vec<String>)"
)]
pub struct Statement {
    pub actions: Vec<String>,
    pub resources: Vec<String>,
}

impl Statement {
    pub fn new<A, R>(actions: A, resources: R) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        Statement {
            actions: actions.into_iter().map(Into::into).collect(),
            resources: resources.into_iter().map(Into::into).collect(),
        }
    }
}

impl Display for Statement {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(
            f,
            "[{}] on [{}]",
            self.actions.join(", "),
            self.resources.join(", ")
        )
    }
}

impl From<(Option<StringList>, Option<StringList>)> for Statement {
    fn from((actions, resources): (Option<StringList>, Option<StringList>)) -> Self {
        Statement {
            actions: actions.map(StringList::flatten).unwrap_or_default(),
            resources: resources.map(StringList::flatten).unwrap_or_default(),
        }
    }
}

impl From<Statement> for (Vec<String>, Vec<String>) {
    fn from(statement: Statement) -> Self {
        (statement.actions, statement.resources)
    }
}

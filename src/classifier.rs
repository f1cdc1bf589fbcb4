//! Identifier classification by ARN shape.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::IdentifierKind;

/// The principal sentinel meaning "every principal".
pub const WILDCARD: &str = "*";

// `aws`, `aws-cn`, `aws-us-gov`, ...
const PARTITION: &str = r"arn:aws(?:-[a-z]+)*";

// `arn:<partition>:iam::<12-digit account>:<kind>/<path/>name`
const PRINCIPAL_NAME: &str = r"(?:[\w+=,.@-]+/)*[\w+=,.@-]+";

fn principal_regex(kind: &str) -> Regex {
    Regex::new(&format!(
        r"^{PARTITION}:iam::\d{{12}}:{kind}/{PRINCIPAL_NAME}$"
    ))
    .unwrap_or_else(|e| panic!("invalid built-in {kind} pattern: {e}"))
}

static GROUP_PATTERN: Lazy<Regex> = Lazy::new(|| principal_regex("group"));
static ROLE_PATTERN: Lazy<Regex> = Lazy::new(|| principal_regex("role"));
static USER_PATTERN: Lazy<Regex> = Lazy::new(|| principal_regex("user"));

static ROOT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^{PARTITION}:iam::\d+:root$"))
        .unwrap_or_else(|e| panic!("invalid built-in root pattern: {e}"))
});

static IAM_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^{PARTITION}:iam:"))
        .unwrap_or_else(|e| panic!("invalid built-in IAM pattern: {e}"))
});

/// Classify an identifier string.
///
/// Group, role and user shapes are checked in that order, then the wildcard
/// sentinel. Anything else is a `Resource`, except the empty string which is
/// `Unknown`. Never fails.
pub fn classify(id: &str) -> IdentifierKind {
    if GROUP_PATTERN.is_match(id) {
        IdentifierKind::Group
    } else if ROLE_PATTERN.is_match(id) {
        IdentifierKind::Role
    } else if USER_PATTERN.is_match(id) {
        IdentifierKind::User
    } else if id == WILDCARD {
        IdentifierKind::Wildcard
    } else if id.trim().is_empty() {
        IdentifierKind::Unknown
    } else {
        IdentifierKind::Resource
    }
}

/// Account root principals, e.g. `arn:aws:iam::123456789012:root`.
pub fn is_account_root(id: &str) -> bool {
    ROOT_PATTERN.is_match(id)
}

/// Whether `id` lives in the IAM namespace at all (principals, roots,
/// managed policies), in any partition.
pub fn is_iam_arn(id: &str) -> bool {
    IAM_PATTERN.is_match(id)
}

//! Identity and resource statement merge.

use tracing::{debug, info};

use crate::classifier::WILDCARD;
use crate::types::{IdentityPolicySet, PrincipalPolicySet, ResourcePolicySet};

/// Union the identity and resource sets, then fan out wildcard statements.
///
/// Resource statements are appended after identity statements for keys
/// present on both sides, and details from both sides are kept. Keys whose
/// unioned entry has no statements are then dropped. The statements filed
/// under `*` are appended to every other key and the `*` key is removed, so
/// fan-out augments existing principals and never creates new ones. Keys
/// come out in lexical order.
pub fn merge(identity: &IdentityPolicySet, resource: &ResourcePolicySet) -> PrincipalPolicySet {
    let unioned: PrincipalPolicySet = identity
        .iter()
        .chain(resource.iter())
        .map(|(key, entry)| (key.clone(), entry.clone()))
        .collect();
    let mut merged: PrincipalPolicySet = unioned
        .into_iter()
        .filter(|(_, entry)| !entry.is_empty())
        .collect();

    let Some(wildcard) = merged.remove(WILDCARD) else {
        info!(event = "Merge", phase = "Done", principals = merged.len(), wildcard = 0);
        return merged;
    };

    for entry in merged.values_mut() {
        entry.statements.extend(wildcard.statements.iter().cloned());
    }
    debug!(
        event = "Merge",
        phase = "FanOut",
        statements = wildcard.statements.len(),
        principals = merged.len()
    );
    info!(
        event = "Merge",
        phase = "Done",
        principals = merged.len(),
        wildcard = wildcard.statements.len()
    );
    merged
}

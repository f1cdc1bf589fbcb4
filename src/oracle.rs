//! Preparing statements for the external policy oracle and collecting its
//! verdicts into a [`DecisionSet`].

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::classifier::{WILDCARD, is_account_root};
use crate::config::PipelineConfig;
use crate::error::PermGraphError;
use crate::types::{ActionResource, DecisionSet, EvalDecision, PrincipalPolicySet, SkipReport};

/// Shortest action name the oracle accepts.
pub const MIN_ACTION_NAME_LEN: usize = 3;

/// Action names accepted despite being shorter than [`MIN_ACTION_NAME_LEN`].
pub const ACTION_NAME_EXCEPTIONS: [&str; 1] = [WILDCARD];

/// One evaluation call: may `principal` perform `actions` on `resources`?
/// An empty resource list means "any resource".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationRequest<'a> {
    pub principal: &'a str,
    pub actions: &'a [String],
    pub resources: &'a [String],
}

/// One verdict returned by the oracle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub action: String,
    #[serde(default)]
    pub resource: String,
    pub decision: EvalDecision,
}

impl SimulationResult {
    pub fn new(action: impl Into<String>, resource: impl Into<String>, decision: EvalDecision) -> Self {
        SimulationResult {
            action: action.into(),
            resource: resource.into(),
            decision,
        }
    }
}

/// The external evaluation service.
pub trait PolicyOracle: Send + Sync {
    fn simulate(&self, request: &SimulationRequest<'_>) -> Result<Vec<SimulationResult>, PermGraphError>;
}

impl<F> PolicyOracle for F
where
    F: Fn(&SimulationRequest<'_>) -> Result<Vec<SimulationResult>, PermGraphError> + Send + Sync,
{
    fn simulate(&self, request: &SimulationRequest<'_>) -> Result<Vec<SimulationResult>, PermGraphError> {
        self(request)
    }
}

pub fn is_valid_action_name(name: &str) -> bool {
    ACTION_NAME_EXCEPTIONS.contains(&name) || name.chars().count() >= MIN_ACTION_NAME_LEN
}

/// Ask the oracle about every statement of every principal in `set`.
///
/// Principals are visited in key order and statements in list order. A
/// statement is skipped when it has no actions or any action name is too
/// short; wildcard resources are dropped before the call. A failing call
/// skips only that statement.
pub fn collect_decisions(
    set: &PrincipalPolicySet,
    oracle: &dyn PolicyOracle,
    config: &PipelineConfig,
) -> (DecisionSet, SkipReport) {
    let mut decisions = DecisionSet::new();
    let mut report = SkipReport::new();
    let mut calls = 0usize;

    for (principal, entry) in set {
        if config.skip_root_principals && is_account_root(principal) {
            debug!(event = "Oracle", phase = "Filter", principal = principal.as_str(), "account root skipped");
            continue;
        }

        for (idx, statement) in entry.statements.iter().enumerate() {
            let unit = || format!("Statement[{idx}]");
            if statement.actions.is_empty() {
                report.skip(principal, unit(), PermGraphError::InvalidFormat("no actions".to_string()));
                continue;
            }
            if let Some(bad) = statement.actions.iter().find(|a| !is_valid_action_name(a)) {
                report.skip(
                    principal,
                    unit(),
                    PermGraphError::InvalidFormat(format!("action name too short: {bad:?}")),
                );
                continue;
            }

            let resources: Vec<String> = statement
                .resources
                .iter()
                .filter(|r| r.as_str() != WILDCARD)
                .cloned()
                .collect();
            let request = SimulationRequest {
                principal,
                actions: &statement.actions,
                resources: &resources,
            };

            calls += 1;
            match oracle.simulate(&request) {
                Ok(results) => {
                    for result in results {
                        decisions.record(
                            principal.as_str(),
                            result.decision,
                            ActionResource(result.action, result.resource),
                        );
                    }
                }
                Err(e) => report.skip(principal, unit(), e),
            }
        }
    }

    info!(
        event = "Oracle",
        phase = "Done",
        calls = calls,
        principals = decisions.len(),
        skipped = report.len()
    );
    (decisions, report)
}

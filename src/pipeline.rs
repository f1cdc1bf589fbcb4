use std::time::Duration;

use itertools::Itertools;
use tracing::{debug, info};

use crate::classifier::classify;
use crate::config::PipelineConfig;
use crate::error::PermGraphError;
use crate::graph::build_graph;
use crate::identity::{ManagedPolicyCatalog, RawPrincipal, aggregate};
use crate::inventory::{CredentialsReport, attach_credentials_report, split};
use crate::merge::merge;
use crate::metrics::{CanonicalizeStats, GraphStats, record_canonicalize, record_graph};
use crate::oracle::{PolicyOracle, collect_decisions};
use crate::resource::{CanonicalResources, ServiceDump, canonicalize};
use crate::timers::{PhaseTimer, StageTimings};
use crate::types::{
    DecisionSet, IdentityPolicySet, PermissionGraph, PrincipalPolicySet, SkipReport,
};

/// Result of the canonicalization half of the pipeline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Canonicalized {
    pub identity: IdentityPolicySet,
    pub resources: CanonicalResources,
    /// Identity and resource statements per principal, wildcard fanned out.
    pub merged: PrincipalPolicySet,
    /// Everything skipped by the aggregator and the canonicalizer.
    pub report: SkipReport,
    pub timings: StageTimings,
}

/// Result of the evaluation half of the pipeline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Evaluated {
    /// Merged entries in the IAM namespace plus enumerated principals
    /// without statements, with credentials report rows attached.
    pub principals: PrincipalPolicySet,
    /// Merged entries outside the IAM namespace.
    pub others: PrincipalPolicySet,
    pub decisions: DecisionSet,
    pub graph: PermissionGraph,
    /// Statements the oracle step skipped.
    pub report: SkipReport,
    pub timings: StageTimings,
}

/// The whole canonicalization and graph pipeline. Each stage is a pure
/// function of its inputs; this type only sequences them, times them, and
/// reports to the metrics sink.
#[derive(Debug, Clone, Default)]
pub struct PermissionPipeline {
    config: PipelineConfig,
}

impl PermissionPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        PermissionPipeline { config }
    }

    pub fn from_config_str(text: &str) -> Result<Self, PermGraphError> {
        Ok(Self::new(PipelineConfig::from_json_str(text)?))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Aggregate identity policies, canonicalize resource dumps, and merge.
    pub fn canonicalize(
        &self,
        principals: &[RawPrincipal],
        catalog: &ManagedPolicyCatalog,
        dumps: &[ServiceDump],
    ) -> Canonicalized {
        debug!(
            event = "Pipeline",
            phase = "Canonicalize",
            principals = principals.len(),
            managed_policies = catalog.len(),
            services = dumps.len()
        );
        let mut timings = StageTimings::default();

        let (identity, identity_report) = {
            let _t = PhaseTimer::new(&mut timings.aggregate);
            aggregate(principals, catalog)
        };
        let resources = {
            let _t = PhaseTimer::new(&mut timings.canonicalize);
            canonicalize(dumps, &self.config)
        };
        let merged = {
            let _t = PhaseTimer::new(&mut timings.merge);
            merge(&identity, &resources.policies)
        };

        let mut report = identity_report;
        report.merge(resources.report.clone());

        record_canonicalize(CanonicalizeStats {
            identity_principals: identity.len(),
            resources: resources.inventory.len(),
            merged_principals: merged.len(),
            merged_statements: merged.statement_count(),
            skipped: report.counts(),
            timings,
        });
        info!(
            event = "Pipeline",
            phase = "Canonicalized",
            principals = merged.len(),
            statements = merged.statement_count(),
            skipped = report.len(),
            skipped_by_kind = report
                .counts()
                .iter()
                .map(|(kind, n)| format!("{}={n}", kind.as_ref()))
                .join(",")
        );

        Canonicalized {
            identity,
            resources,
            merged,
            report,
            timings,
        }
    }

    /// Split the merged set, attach the credentials report, ask the oracle
    /// about every principal, and build the graph.
    ///
    /// Enumerated principals that ended up without statements are carried
    /// with their identity details, so they still become graph nodes. They
    /// are never added to `canonical.merged`.
    pub fn evaluate(
        &self,
        canonical: &Canonicalized,
        credentials: Option<&CredentialsReport>,
        oracle: &dyn PolicyOracle,
    ) -> Evaluated {
        let mut timings = canonical.timings;
        let split = split(population(canonical));
        let principals = match credentials {
            Some(rows) => attach_credentials_report(split.principals, rows),
            None => split.principals,
        };

        let (decisions, report) = {
            let _t = PhaseTimer::new(&mut timings.oracle);
            collect_decisions(&principals, oracle, &self.config)
        };
        let graph = {
            let _t = PhaseTimer::new(&mut timings.graph);
            build_graph(
                &principals,
                &decisions,
                Some(&canonical.resources.inventory),
                &self.config,
            )
        };

        self.report_graph(&decisions, &graph, timings.oracle + timings.graph);
        info!(
            event = "Pipeline",
            phase = "Evaluated",
            stages = timings
                .as_millis()
                .iter()
                .map(|(stage, ms)| format!("{stage}={ms:.3}"))
                .join(","),
            total_ms = timings.total().as_secs_f64() * 1000.0
        );
        Evaluated {
            principals,
            others: split.resources,
            decisions,
            graph,
            report,
            timings,
        }
    }

    /// Build the graph from decisions computed elsewhere, e.g. loaded from a
    /// previous run's export.
    pub fn build(&self, principals: &PrincipalPolicySet, decisions: &DecisionSet) -> PermissionGraph {
        let mut elapsed = Duration::ZERO;
        let graph = {
            let _t = PhaseTimer::new(&mut elapsed);
            build_graph(principals, decisions, None, &self.config)
        };
        self.report_graph(decisions, &graph, elapsed);
        graph
    }

    fn report_graph(&self, decisions: &DecisionSet, graph: &PermissionGraph, duration: Duration) {
        record_graph(GraphStats {
            evaluated_principals: decisions.len(),
            nodes: graph.nodes.len(),
            edges: graph.edges.len(),
            duration,
        });
        info!(
            event = "Pipeline",
            phase = "Graph",
            nodes = graph.nodes.len(),
            edges = graph.edges.len(),
            services = graph.services().join(","),
            ms = duration.as_secs_f64() * 1000.0
        );
    }
}

/// The merged set plus every enumerated principal it lacks. Identity keys
/// that do not have a principal shape are left out.
fn population(canonical: &Canonicalized) -> PrincipalPolicySet {
    let mut all = canonical.merged.clone();
    let mut carried = 0usize;
    for (key, entry) in &canonical.identity {
        if !all.contains_key(key) && classify(key).is_principal() {
            all.insert(key.clone(), entry.clone());
            carried += 1;
        }
    }
    debug!(
        event = "Pipeline",
        phase = "Population",
        merged = canonical.merged.len(),
        carried = carried
    );
    all
}

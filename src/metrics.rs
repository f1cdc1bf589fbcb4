//! Backend-agnostic pipeline metrics via a pluggable sink.
//!
//! The library never talks to a metrics backend itself. Implement
//! [`MetricsSink`] and install it once with [`set_sink`]; every pipeline run
//! then reports a [`CanonicalizeStats`] after merging and a [`GraphStats`]
//! after the graph is built. Until a sink is installed, stats are dropped.
//!
//! ## Usage
//!
//! ```ignore
//! use permgraph_core::metrics::{set_sink, CanonicalizeStats, GraphStats, MetricsSink};
//! use std::sync::atomic::{AtomicU64, Ordering};
//! use std::sync::Arc;
//!
//! struct EdgeCounter {
//!     edges: AtomicU64,
//! }
//!
//! impl MetricsSink for EdgeCounter {
//!     fn on_canonicalize(&self, _stats: &CanonicalizeStats) {}
//!
//!     fn on_graph(&self, stats: &GraphStats) {
//!         self.edges.fetch_add(stats.edges as u64, Ordering::Relaxed);
//!     }
//! }
//!
//! set_sink(Arc::new(EdgeCounter { edges: AtomicU64::new(0) }));
//! ```

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use serde::Serialize;
use tracing::warn;

use crate::error::ErrorKind;
use crate::timers::StageTimings;

/// Snapshot of one canonicalization run: aggregate, canonicalize and merge.
#[derive(Debug, Clone, Serialize)]
pub struct CanonicalizeStats {
    /// Principals enumerated on the identity side
    pub identity_principals: usize,
    /// Resources that contributed resource policy statements
    pub resources: usize,
    /// Keys in the merged set
    pub merged_principals: usize,
    /// Statements in the merged set, after wildcard fan-out
    pub merged_statements: usize,
    /// Skipped units per error kind
    pub skipped: BTreeMap<ErrorKind, usize>,
    pub timings: StageTimings,
}

/// Snapshot of one evaluation and graph build.
#[derive(Debug, Clone, Serialize)]
pub struct GraphStats {
    /// Principals that received at least one decision
    pub evaluated_principals: usize,
    pub nodes: usize,
    pub edges: usize,
    /// Time spent in the oracle and the graph builder together
    pub duration: Duration,
}

/// Consumer of pipeline metrics.
///
/// Implementations must be thread-safe and should return quickly; they are
/// called synchronously at the end of each stage.
pub trait MetricsSink: Send + Sync {
    /// Called after the merged set has been produced.
    fn on_canonicalize(&self, stats: &CanonicalizeStats);

    /// Called after the permission graph has been built.
    fn on_graph(&self, stats: &GraphStats);
}

static SINK: OnceLock<Arc<dyn MetricsSink>> = OnceLock::new();

/// Install the global metrics sink.
///
/// Call this once at startup, before the first pipeline run. The sink
/// cannot be replaced afterwards; later calls are ignored with a warning.
pub fn set_sink(sink: Arc<dyn MetricsSink>) {
    if SINK.set(sink).is_err() {
        warn!(
            "Metrics sink was already initialized. Ignoring subsequent set_sink call. Set the sink before the first pipeline run."
        );
    }
}

pub(crate) fn record_canonicalize(stats: CanonicalizeStats) {
    if let Some(sink) = SINK.get() {
        sink.on_canonicalize(&stats);
    }
}

pub(crate) fn record_graph(stats: GraphStats) {
    if let Some(sink) = SINK.get() {
        sink.on_graph(&stats);
    }
}

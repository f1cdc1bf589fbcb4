//! Permission graph construction from merged statements and oracle verdicts.

use std::collections::HashMap;

use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::classifier::classify;
use crate::config::PipelineConfig;
use crate::resource::ResourceInventory;
use crate::types::{
    AttrValue, DecisionSet, Edge, Node, NodeType, PermissionGraph, PrincipalPolicySet, Relationship,
};

/// Detail key whose sub-keys are hoisted to top-level node attributes.
pub const CREDENTIALS_REPORT: &str = "CredentialsReport";

/// Node attribute carrying the principal's decision set as JSON.
pub const PERMISSIONS: &str = "Permissions";

/// Flatten a principal's raw details into node attributes.
///
/// Nested maps and lists become JSON strings. The sub-keys of a
/// `CredentialsReport` map are hoisted, with `"true"`/`"false"` read as
/// booleans and `"N/A"` as null.
pub fn flatten_details(details: &Map<String, Value>) -> Vec<(String, AttrValue)> {
    let mut flat = Vec::with_capacity(details.len());
    for (key, value) in details {
        match value {
            Value::Object(cells) if key == CREDENTIALS_REPORT => {
                flat.extend(
                    cells
                        .iter()
                        .map(|(cell, v)| (cell.clone(), AttrValue::from_report_cell(v))),
                );
            }
            _ => flat.push((key.clone(), AttrValue::from_json(value))),
        }
    }
    flat
}

struct GraphAssembly<'a> {
    graph: PermissionGraph,
    index: HashMap<String, usize>,
    inventory: Option<&'a ResourceInventory>,
}

impl<'a> GraphAssembly<'a> {
    fn push(&mut self, node: Node) {
        self.index.insert(node.id.clone(), self.graph.nodes.len());
        self.graph.nodes.push(node);
    }

    fn ensure_principal(&mut self, id: &str) {
        if !self.index.contains_key(id) {
            self.push(Node::new(id, NodeType::for_principal_key(classify(id))));
        }
    }

    fn ensure_resource(&mut self, id: &str) {
        if self.index.contains_key(id) {
            return;
        }
        let mut node = Node::new(id, NodeType::Resource);
        if let Some(record) = self.inventory.and_then(|inv| inv.get(id)) {
            node.set_attr("service", AttrValue::from(record.service.as_str()));
            if let Some(name) = &record.name {
                node.set_attr("Name", AttrValue::from(name.as_str()));
            }
            if let Some(url) = &record.queue_url {
                node.set_attr("QueueUrl", AttrValue::from(url.as_str()));
            }
            node.set_attr(
                "statementCount",
                AttrValue::Long(i64::try_from(record.statement_count).unwrap_or(i64::MAX)),
            );
        }
        self.push(node);
    }
}

/// Build the exported graph.
///
/// Every key of `principals` becomes a node, in key order, typed by its ARN
/// shape and carrying its flattened details. Every `allowed` decision then
/// becomes one edge, in principal order and then decision order; `explicitDeny`
/// and `implicitDeny` never produce edges. Edge targets that are not already
/// nodes get a `Resource` node, enriched from `inventory` when it knows the
/// resource.
pub fn build_graph(
    principals: &PrincipalPolicySet,
    decisions: &DecisionSet,
    inventory: Option<&ResourceInventory>,
    config: &PipelineConfig,
) -> PermissionGraph {
    let mut assembly = GraphAssembly {
        graph: PermissionGraph::default(),
        index: HashMap::new(),
        inventory,
    };

    for (key, entry) in principals {
        let mut node = Node::new(key.as_str(), NodeType::for_principal_key(classify(key)));
        for (attr, value) in flatten_details(&entry.details) {
            node.set_attr(attr, value);
        }
        if let Some(own) = decisions.get(key).filter(|_| config.attach_decisions) {
            match serde_json::to_string(own) {
                Ok(json) => node.set_attr(PERMISSIONS, AttrValue::String(json)),
                Err(e) => debug!(event = "Graph", phase = "Nodes", principal = key.as_str(), error = %e),
            }
        }
        assembly.push(node);
    }

    for (principal, own) in decisions.iter() {
        for pair in &own.allowed {
            if pair.resource().is_empty() {
                debug!(
                    event = "Graph",
                    phase = "Edges",
                    principal = principal,
                    action = pair.action(),
                    "allowed decision without resource"
                );
                continue;
            }
            assembly.ensure_principal(principal);
            assembly.ensure_resource(pair.resource());

            let (service, operation) = pair.service_and_operation();
            assembly.graph.edges.push(Edge {
                source: principal.to_string(),
                target: pair.resource().to_string(),
                relationship: Relationship {
                    label: operation.to_string(),
                    service: service.to_string(),
                },
            });
        }
    }

    let graph = assembly.graph;
    info!(
        event = "Graph",
        phase = "Done",
        nodes = graph.nodes.len(),
        edges = graph.edges.len()
    );
    graph
}

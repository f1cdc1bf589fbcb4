//! Export payload of the permission graph.

use std::collections::BTreeMap;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::attr_value::AttrValue;
use super::identifier_kind::NodeType;
use crate::error::PermGraphError;

/// A principal or resource. Serialized as `{id, type, ...attributes}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Node {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    #[serde(flatten)]
    pub attributes: BTreeMap<String, AttrValue>,
}

impl Node {
    pub fn new(id: impl Into<String>, node_type: NodeType) -> Self {
        Node {
            id: id.into(),
            node_type,
            attributes: BTreeMap::new(),
        }
    }

    /// Set an attribute. `id` and `type` are reserved for the node itself and
    /// are ignored here.
    pub fn with_attr(mut self, key: impl Into<String>, value: AttrValue) -> Self {
        self.set_attr(key, value);
        self
    }

    pub fn set_attr(&mut self, key: impl Into<String>, value: AttrValue) {
        let key = key.into();
        if key != "id" && key != "type" {
            self.attributes.insert(key, value);
        }
    }

    pub fn attr(&self, key: &str) -> Option<&AttrValue> {
        self.attributes.get(key)
    }
}

/// Edge payload: the operation name (service prefix stripped) and the
/// service it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct Relationship {
    #[serde(rename = "type")]
    pub label: String,
    pub service: String,
}

/// One allowed action from a principal to a resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct Edge {
    pub source: String,
    pub target: String,
    pub relationship: Relationship,
}

/// `{nodes: [...], edges: [...]}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PermissionGraph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl PermissionGraph {
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn edges_from<'a>(&'a self, source: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.source == source)
    }

    pub fn nodes_of_type(&self, node_type: NodeType) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(move |n| n.node_type == node_type)
    }

    /// Distinct services named by edges, sorted.
    pub fn services(&self) -> Vec<&str> {
        self.edges
            .iter()
            .map(|e| e.relationship.service.as_str())
            .unique()
            .sorted()
            .collect()
    }

    pub fn to_json_string(&self) -> Result<String, PermGraphError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

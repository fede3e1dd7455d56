use crate::graph::{GraphBackend, VertexData, VertexId};
use petgraph::graph::{DiGraph, NodeIndex};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Directed multigraph whose node weight is the vertex's flat attribute map
/// (block type, resource type, raw block, file path and markers together).
#[derive(Debug, Clone, Default)]
pub struct AttributedGraph {
    pub graph: DiGraph<Map<String, Value>, String>,
    pub node_map: HashMap<String, NodeIndex>,
}

impl AttributedGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a vertex, returning its handle. `block_type` and `resource_type`
    /// are written into the attribute map.
    pub fn add_vertex(&mut self, mut vertex: VertexData) -> VertexId {
        vertex.sync_attributes();
        let idx = self.graph.add_node(vertex.attributes);
        self.node_map.insert(vertex.name, idx);
        VertexId(idx.index())
    }

    /// Add a labelled edge between two named vertices. Parallel edges are kept.
    pub fn add_edge(&mut self, from: &str, to: &str, label: impl Into<String>) -> Option<()> {
        let from = *self.node_map.get(from)?;
        let to = *self.node_map.get(to)?;
        self.graph.add_edge(from, to, label.into());
        Some(())
    }

    pub fn vertex_by_name(&self, name: &str) -> Option<VertexId> {
        self.node_map.get(name).map(|idx| VertexId(idx.index()))
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    fn weight(&self, vertex: VertexId) -> Option<&Map<String, Value>> {
        self.graph.node_weight(NodeIndex::new(vertex.0))
    }
}

impl GraphBackend for AttributedGraph {
    fn vertices(&self) -> Vec<VertexId> {
        self.graph
            .node_indices()
            .map(|idx| VertexId(idx.index()))
            .collect()
    }

    fn vertex_count(&self) -> usize {
        self.graph.node_count()
    }

    fn attribute(&self, vertex: VertexId, name: &str) -> Option<&Value> {
        self.weight(vertex)?.get(name)
    }

    fn attributes(&self, vertex: VertexId) -> Option<&Map<String, Value>> {
        self.weight(vertex)
    }
}

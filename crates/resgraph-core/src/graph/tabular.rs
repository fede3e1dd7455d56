use crate::graph::{GraphBackend, VertexData, VertexId, BLOCK_TYPE, RESOURCE_TYPE};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Column-oriented vertex table indexed by position and by name.
///
/// `block_type_` and `resource_type` live in their own columns; every other
/// attribute is read from the raw `attr` map of the vertex. The `attr` map
/// carries copies of both columns so `attributes()` matches other backends.
#[derive(Debug, Clone, Default)]
pub struct TabularGraph {
    names: Vec<String>,
    block_types: Vec<Value>,
    resource_types: Vec<Value>,
    attrs: Vec<Map<String, Value>>,
    by_name: HashMap<String, usize>,
    edges: Vec<(usize, usize, String)>,
}

impl TabularGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_vertex(&mut self, mut vertex: VertexData) -> VertexId {
        vertex.sync_attributes();
        let index = self.names.len();
        self.by_name.insert(vertex.name.clone(), index);
        self.names.push(vertex.name);
        self.block_types.push(Value::String(vertex.block_type));
        self.resource_types
            .push(vertex.resource_type.map(Value::String).unwrap_or(Value::Null));
        self.attrs.push(vertex.attributes);
        VertexId(index)
    }

    pub fn add_edge(&mut self, from: &str, to: &str, label: impl Into<String>) -> Option<()> {
        let from = *self.by_name.get(from)?;
        let to = *self.by_name.get(to)?;
        self.edges.push((from, to, label.into()));
        Some(())
    }

    pub fn vertex_by_name(&self, name: &str) -> Option<VertexId> {
        self.by_name.get(name).copied().map(VertexId)
    }

    pub fn vertex_name(&self, vertex: VertexId) -> Option<&str> {
        self.names.get(vertex.0).map(String::as_str)
    }

    pub fn edges(&self) -> &[(usize, usize, String)] {
        &self.edges
    }
}

impl GraphBackend for TabularGraph {
    fn vertices(&self) -> Vec<VertexId> {
        (0..self.names.len()).map(VertexId).collect()
    }

    fn vertex_count(&self) -> usize {
        self.names.len()
    }

    fn attribute(&self, vertex: VertexId, name: &str) -> Option<&Value> {
        let value = match name {
            BLOCK_TYPE => self.block_types.get(vertex.0)?,
            RESOURCE_TYPE => self.resource_types.get(vertex.0)?,
            _ => self.attrs.get(vertex.0)?.get(name)?,
        };
        (!value.is_null()).then_some(value)
    }

    fn attributes(&self, vertex: VertexId) -> Option<&Map<String, Value>> {
        self.attrs.get(vertex.0)
    }
}

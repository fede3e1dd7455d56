//! Read-only vertex access over interchangeable graph representations.
//!
//! Everything above this module talks to [`GraphBackend`] only, so image
//! providers give the same answer whichever backend holds the vertices.

pub mod attributed;
pub mod tabular;

pub use attributed::AttributedGraph;
pub use tabular::TabularGraph;

use crate::config::GraphFramework;
use serde_json::{Map, Value};

pub const BLOCK_TYPE: &str = "block_type_";
pub const RESOURCE_TYPE: &str = "resource_type";
pub const FILE_PATH: &str = "file_path_";
pub const START_LINE: &str = "__startline__";
pub const END_LINE: &str = "__endline__";

pub const RESOURCE_BLOCK: &str = "resource";

/// Positional handle of a vertex inside one backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexId(pub usize);

/// Backend-neutral description of a vertex, used to populate either graph.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexData {
    pub name: String,
    pub block_type: String,
    pub resource_type: Option<String>,
    /// Raw block plus file path and line markers.
    pub attributes: Map<String, Value>,
}

impl VertexData {
    /// A `resource` vertex whose resource type is read from the attributes.
    pub fn resource(name: impl Into<String>, attributes: Map<String, Value>) -> Self {
        let resource_type = attributes
            .get(RESOURCE_TYPE)
            .and_then(Value::as_str)
            .map(String::from);
        Self {
            name: name.into(),
            block_type: RESOURCE_BLOCK.to_string(),
            resource_type,
            attributes,
        }
    }

    /// Write `block_type` and `resource_type` into the attribute map (or drop
    /// a stale `resource_type` entry) so every backend exposes the same map.
    pub(crate) fn sync_attributes(&mut self) {
        self.attributes
            .insert(BLOCK_TYPE.to_string(), Value::String(self.block_type.clone()));
        match &self.resource_type {
            Some(resource_type) => {
                self.attributes
                    .insert(RESOURCE_TYPE.to_string(), Value::String(resource_type.clone()));
            }
            None => {
                self.attributes.remove(RESOURCE_TYPE);
            }
        }
    }
}

pub trait GraphBackend {
    fn vertices(&self) -> Vec<VertexId>;

    fn vertex_count(&self) -> usize {
        self.vertices().len()
    }

    /// Attribute `name` of `vertex`, or `None` when absent.
    fn attribute(&self, vertex: VertexId, name: &str) -> Option<&Value>;

    /// Attribute `name` of `vertex`, falling back to `default`.
    fn attribute_or<'a>(&'a self, vertex: VertexId, name: &str, default: &'a Value) -> &'a Value {
        self.attribute(vertex, name).unwrap_or(default)
    }

    /// Raw attribute map: original block plus file path and line markers.
    fn attributes(&self, vertex: VertexId) -> Option<&Map<String, Value>>;

    fn block_type(&self, vertex: VertexId) -> Option<&str> {
        self.attribute(vertex, BLOCK_TYPE).and_then(Value::as_str)
    }

    fn resource_type(&self, vertex: VertexId) -> Option<&str> {
        self.attribute(vertex, RESOURCE_TYPE).and_then(Value::as_str)
    }
}

/// Either backend, chosen at runtime from [`GraphFramework`].
#[derive(Debug, Clone)]
pub enum AnyGraph {
    Attributed(AttributedGraph),
    Tabular(TabularGraph),
}

impl AnyGraph {
    pub fn new(framework: GraphFramework) -> Self {
        match framework {
            GraphFramework::Attributed => AnyGraph::Attributed(AttributedGraph::new()),
            GraphFramework::Tabular => AnyGraph::Tabular(TabularGraph::new()),
        }
    }

    pub fn from_vertices(framework: GraphFramework, vertices: Vec<VertexData>) -> Self {
        let mut graph = Self::new(framework);
        for vertex in vertices {
            graph.add_vertex(vertex);
        }
        graph
    }

    pub fn framework(&self) -> GraphFramework {
        match self {
            AnyGraph::Attributed(_) => GraphFramework::Attributed,
            AnyGraph::Tabular(_) => GraphFramework::Tabular,
        }
    }

    pub fn add_vertex(&mut self, vertex: VertexData) -> VertexId {
        match self {
            AnyGraph::Attributed(g) => g.add_vertex(vertex),
            AnyGraph::Tabular(g) => g.add_vertex(vertex),
        }
    }

    fn backend(&self) -> &dyn GraphBackend {
        match self {
            AnyGraph::Attributed(g) => g,
            AnyGraph::Tabular(g) => g,
        }
    }
}

impl GraphBackend for AnyGraph {
    fn vertices(&self) -> Vec<VertexId> {
        self.backend().vertices()
    }

    fn vertex_count(&self) -> usize {
        self.backend().vertex_count()
    }

    fn attribute(&self, vertex: VertexId, name: &str) -> Option<&Value> {
        self.backend().attribute(vertex, name)
    }

    fn attributes(&self, vertex: VertexId) -> Option<&Map<String, Value>> {
        self.backend().attributes(vertex)
    }
}

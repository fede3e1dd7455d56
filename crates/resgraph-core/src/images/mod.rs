//! Container image references found in a resource graph.

pub mod kubernetes;
pub mod manager;

pub use kubernetes::KubernetesProvider;
pub use manager::{ImageReferencerManager, Platform};

use crate::graph::{GraphBackend, VertexId};
use serde::{Deserialize, Serialize};

/// Placeholder used in `related_resource_id` when a resource has no name.
pub const NULL_SENTINEL: &str = "None";

/// An image name with the location of the resource that references it.
/// Equality is by value; two references to one image from the same
/// resource are the same `Image`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Image {
    pub file_path: String,
    pub name: String,
    pub start_line: usize,
    pub end_line: usize,
    pub related_resource_id: String,
}

/// Extracts images for one platform. Providers hold no state between calls.
pub trait ImageProvider {
    fn platform(&self) -> Platform;

    /// Resource types this provider knows how to read.
    fn supported_resource_types(&self) -> &[&'static str];

    fn supports(&self, resource_type: &str) -> bool {
        self.supported_resource_types().contains(&resource_type)
    }

    /// Images of one vertex, in container-field order.
    fn extract_images_from_vertex(&self, graph: &dyn GraphBackend, vertex: VertexId) -> Vec<Image>;

    /// Images of every supported `resource` vertex, in vertex order.
    fn extract_images_from_resources(&self, graph: &dyn GraphBackend) -> Vec<Image> {
        graph
            .vertices()
            .into_iter()
            .filter(|&v| graph.block_type(v) == Some(crate::graph::RESOURCE_BLOCK))
            .filter(|&v| graph.resource_type(v).is_some_and(|t| self.supports(t)))
            .flat_map(|v| self.extract_images_from_vertex(graph, v))
            .collect()
    }
}

use crate::graph::{GraphBackend, RESOURCE_BLOCK};
use crate::images::{Image, ImageProvider, KubernetesProvider};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Platforms with an image provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Kubernetes,
}

impl Platform {
    pub fn label(&self) -> &str {
        match self {
            Platform::Kubernetes => "kubernetes",
        }
    }

    fn provider(&self) -> Box<dyn ImageProvider> {
        match self {
            Platform::Kubernetes => Box::new(KubernetesProvider::new()),
        }
    }
}

/// Known providers, keyed by platform.
pub fn default_providers() -> Vec<Box<dyn ImageProvider>> {
    [Platform::Kubernetes].iter().map(Platform::provider).collect()
}

/// Runs the providers that match a graph's content and deduplicates their
/// output, keeping first-seen order.
pub struct ImageReferencerManager<'g> {
    graph: &'g dyn GraphBackend,
    providers: Vec<Box<dyn ImageProvider>>,
}

impl<'g> ImageReferencerManager<'g> {
    /// Manager over every known provider.
    pub fn new(graph: &'g dyn GraphBackend) -> Self {
        Self::with_providers(graph, default_providers())
    }

    pub fn for_platform(graph: &'g dyn GraphBackend, platform: Platform) -> Self {
        Self::with_providers(graph, vec![platform.provider()])
    }

    pub fn with_providers(graph: &'g dyn GraphBackend, providers: Vec<Box<dyn ImageProvider>>) -> Self {
        Self { graph, providers }
    }

    /// Platforms whose provider supports at least one resource vertex.
    pub fn detected_platforms(&self) -> Vec<Platform> {
        self.applicable_providers()
            .iter()
            .map(|p| p.platform())
            .collect()
    }

    fn applicable_providers(&self) -> Vec<&dyn ImageProvider> {
        let mut applicable: Vec<&dyn ImageProvider> = Vec::new();
        for provider in &self.providers {
            if self.has_supported_resources(provider.as_ref()) {
                applicable.push(provider.as_ref());
            }
        }
        applicable
    }

    fn has_supported_resources(&self, provider: &dyn ImageProvider) -> bool {
        self.graph.vertices().into_iter().any(|v| {
            self.graph.block_type(v) == Some(RESOURCE_BLOCK)
                && self
                    .graph
                    .resource_type(v)
                    .is_some_and(|t| provider.supports(t))
        })
    }

    pub fn extract_images_from_resources(&self) -> Vec<Image> {
        let mut seen: IndexSet<Image> = IndexSet::new();
        for provider in self.applicable_providers() {
            let images = provider.extract_images_from_resources(self.graph);
            debug!(
                platform = provider.platform().label(),
                found = images.len(),
                "Extracted images"
            );
            seen.extend(images);
        }
        seen.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GraphFramework;
    use crate::graph::{AnyGraph, VertexData};
    use serde_json::{json, Value};

    fn pod(name: &str, spec: Value) -> VertexData {
        let attrs = json!({
            "file_path_": "/pod.yaml",
            "__endline__": 16,
            "__startline__": 1,
            "spec": spec,
            "resource_type": "Pod",
        });
        VertexData::resource(name, attrs.as_object().cloned().unwrap())
    }

    #[test]
    fn test_extract_images_from_resources() {
        for framework in [GraphFramework::Attributed, GraphFramework::Tabular] {
            let graph = AnyGraph::from_vertices(
                framework,
                vec![pod("1", json!({"containers": [{"name": "test-container", "image": "nginx"}]}))],
            );
            let images = ImageReferencerManager::new(&graph).extract_images_from_resources();
            assert_eq!(
                images,
                vec![Image {
                    file_path: "/pod.yaml".into(),
                    name: "nginx".into(),
                    start_line: 1,
                    end_line: 16,
                    related_resource_id: "/pod.yaml:None".into(),
                }]
            );
        }
    }

    #[test]
    fn test_no_duplications_while_extracting_image_names() {
        let graph = AnyGraph::from_vertices(
            GraphFramework::Tabular,
            vec![pod(
                "duplicated_image",
                json!({
                    "initContainers": [{"name": "test-container", "image": "nginx"}],
                    "containers": [{"name": "test-container", "image": "nginx"}],
                }),
            )],
        );
        let images = ImageReferencerManager::new(&graph).extract_images_from_resources();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].name, "nginx");
    }

    #[test]
    fn test_first_seen_order_across_vertices() {
        let graph = AnyGraph::from_vertices(
            GraphFramework::Attributed,
            vec![
                pod("a", json!({"containers": [{"image": "redis"}, {"image": "nginx"}]})),
                pod("b", json!({"containers": [{"image": "nginx"}, {"image": "busybox"}]})),
            ],
        );
        let names: Vec<String> = ImageReferencerManager::new(&graph)
            .extract_images_from_resources()
            .into_iter()
            .map(|i| i.name)
            .collect();
        assert_eq!(names, vec!["redis", "nginx", "busybox"]);
    }

    #[test]
    fn test_no_platform_detected_for_unrelated_graph() {
        let attrs = json!({"file_path_": "/main.tf", "resource_type": "aws_s3_bucket"});
        let graph = AnyGraph::from_vertices(
            GraphFramework::Attributed,
            vec![VertexData::resource("aws_s3_bucket.a", attrs.as_object().cloned().unwrap())],
        );
        let manager = ImageReferencerManager::for_platform(&graph, Platform::Kubernetes);
        assert!(manager.detected_platforms().is_empty());
        assert!(manager.extract_images_from_resources().is_empty());
    }
}

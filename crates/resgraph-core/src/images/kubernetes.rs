use crate::graph::{GraphBackend, VertexId, END_LINE, FILE_PATH, START_LINE};
use crate::images::{Image, ImageProvider, Platform, NULL_SENTINEL};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Container-bearing fields of a pod spec, in emission order.
const CONTAINER_FIELDS: &[&str] = &["initContainers", "containers", "ephemeralContainers"];

const POD_SPEC: &[&str] = &["spec"];
const TEMPLATE_SPEC: &[&str] = &["template", "spec"];
const WORKLOAD_SPEC: &[&str] = &["spec", "template", "spec"];
const CRONJOB_SPEC: &[&str] = &["spec", "jobTemplate", "spec", "template", "spec"];

const SUPPORTED_RESOURCE_TYPES: &[&str] = &[
    "Pod",
    "Deployment",
    "DaemonSet",
    "StatefulSet",
    "ReplicaSet",
    "ReplicationController",
    "Job",
    "CronJob",
    "PodTemplate",
];

/// Reads container images from Kubernetes workload resources.
#[derive(Debug, Clone, Copy, Default)]
pub struct KubernetesProvider;

impl KubernetesProvider {
    pub fn new() -> Self {
        Self
    }

    /// Where the pod spec sits for each workload kind.
    fn pod_spec_path(resource_type: &str) -> Option<&'static [&'static str]> {
        match resource_type {
            "Pod" => Some(POD_SPEC),
            "PodTemplate" => Some(TEMPLATE_SPEC),
            "CronJob" => Some(CRONJOB_SPEC),
            "Deployment" | "DaemonSet" | "StatefulSet" | "ReplicaSet"
            | "ReplicationController" | "Job" => Some(WORKLOAD_SPEC),
            _ => None,
        }
    }

    /// Resource name used in `related_resource_id`: `name`, else
    /// `metadata.name`.
    fn resource_name(attributes: &Map<String, Value>) -> Option<&str> {
        attributes
            .get("name")
            .and_then(Value::as_str)
            .or_else(|| {
                attributes
                    .get("metadata")
                    .and_then(|m| m.get("name"))
                    .and_then(Value::as_str)
            })
            .filter(|name| !name.is_empty())
    }
}

fn lookup<'v>(root: &'v Map<String, Value>, path: &[&str]) -> Option<&'v Value> {
    let (first, rest) = path.split_first()?;
    rest.iter().try_fold(root.get(*first)?, |value, key| value.get(*key))
}

fn line_marker(graph: &dyn GraphBackend, vertex: VertexId, name: &str) -> Option<usize> {
    graph
        .attribute(vertex, name)
        .and_then(Value::as_u64)
        .map(|n| n as usize)
}

impl ImageProvider for KubernetesProvider {
    fn platform(&self) -> Platform {
        Platform::Kubernetes
    }

    fn supported_resource_types(&self) -> &[&'static str] {
        SUPPORTED_RESOURCE_TYPES
    }

    fn extract_images_from_vertex(&self, graph: &dyn GraphBackend, vertex: VertexId) -> Vec<Image> {
        let mut images = Vec::new();

        let Some(resource_type) = graph.resource_type(vertex) else {
            return images;
        };
        let Some(spec_path) = Self::pod_spec_path(resource_type) else {
            return images;
        };
        let Some(attributes) = graph.attributes(vertex) else {
            return images;
        };

        let file_path = graph.attribute(vertex, FILE_PATH).and_then(Value::as_str);
        let start_line = line_marker(graph, vertex, START_LINE);
        let end_line = line_marker(graph, vertex, END_LINE);
        let (Some(file_path), Some(start_line), Some(end_line)) = (file_path, start_line, end_line)
        else {
            warn!(
                resource_type = %resource_type,
                "Skipping resource without file path or line markers"
            );
            return images;
        };

        let Some(pod_spec) = lookup(attributes, spec_path) else {
            debug!(file = %file_path, resource_type = %resource_type, "No pod spec found");
            return images;
        };

        let related_resource_id = format!(
            "{}:{}",
            file_path,
            Self::resource_name(attributes).unwrap_or(NULL_SENTINEL)
        );

        for field in CONTAINER_FIELDS {
            let Some(containers) = pod_spec.get(*field).and_then(Value::as_array) else {
                continue;
            };
            for container in containers {
                let Some(name) = container
                    .get("image")
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|image| !image.is_empty())
                else {
                    continue;
                };
                images.push(Image {
                    file_path: file_path.to_string(),
                    name: name.to_string(),
                    start_line,
                    end_line,
                    related_resource_id: related_resource_id.clone(),
                });
            }
        }

        images
    }
}

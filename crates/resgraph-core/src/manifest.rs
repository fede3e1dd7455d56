use crate::config::GraphFramework;
use crate::error::{Error, Result};
use crate::graph::{AnyGraph, VertexData, END_LINE, FILE_PATH, RESOURCE_TYPE, START_LINE};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// One Kubernetes object read from a manifest file, with the line range of
/// the YAML document that holds it.
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestDocument {
    pub file_path: String,
    pub kind: String,
    pub start_line: usize,
    pub end_line: usize,
    pub body: Map<String, Value>,
}

impl ManifestDocument {
    /// Vertex id in the form `Kind.namespace.name`.
    pub fn vertex_name(&self, index: usize) -> String {
        let metadata = self.body.get("metadata");
        let namespace = metadata
            .and_then(|m| m.get("namespace"))
            .and_then(Value::as_str)
            .unwrap_or("default");
        let name = metadata
            .and_then(|m| m.get("name"))
            .and_then(Value::as_str)
            .map(String::from)
            .unwrap_or_else(|| format!("#{index}"));
        format!("{}.{}.{}", self.kind, namespace, name)
    }

    pub fn into_vertex(self, index: usize) -> VertexData {
        let name = self.vertex_name(index);
        let mut attributes = self.body;
        attributes.insert(FILE_PATH.to_string(), Value::String(self.file_path));
        attributes.insert(START_LINE.to_string(), Value::from(self.start_line));
        attributes.insert(END_LINE.to_string(), Value::from(self.end_line));
        attributes.insert(RESOURCE_TYPE.to_string(), Value::String(self.kind));
        VertexData::resource(name, attributes)
    }
}

/// Read and parse a manifest file.
pub fn load_manifests(path: &Path) -> Result<Vec<ManifestDocument>> {
    let content = std::fs::read_to_string(path).map_err(|source| Error::SourceRead {
        path: PathBuf::from(path),
        source,
    })?;
    parse_manifests(&content, &path.to_string_lossy())
}

/// Parse a multi-document YAML stream. Documents without a `kind` are
/// ignored; `kind: List` expands into its items.
pub fn parse_manifests(content: &str, file_path: &str) -> Result<Vec<ManifestDocument>> {
    let mut documents = Vec::new();

    for (first_line, text) in split_documents(content) {
        let Some((start_line, end_line)) = content_range(first_line, &text) else {
            continue;
        };

        let yaml: serde_yaml::Value =
            serde_yaml::from_str(&text).map_err(|e| Error::ManifestParse {
                file_path: file_path.to_string(),
                line: start_line,
                message: e.to_string(),
            })?;
        if yaml.is_null() {
            continue;
        }
        let json = serde_json::to_value(&yaml).map_err(|e| Error::ManifestParse {
            file_path: file_path.to_string(),
            line: start_line,
            message: e.to_string(),
        })?;
        let Value::Object(body) = json else {
            continue;
        };

        let kind = body.get("kind").and_then(Value::as_str).map(String::from);
        let items: Vec<Map<String, Value>> = match kind.as_deref() {
            Some("List") => body
                .get("items")
                .and_then(Value::as_array)
                .map(|items| items.iter().filter_map(|i| i.as_object().cloned()).collect())
                .unwrap_or_default(),
            Some(_) => vec![body],
            None => Vec::new(),
        };

        for item in items {
            let Some(kind) = item.get("kind").and_then(Value::as_str).map(String::from) else {
                continue;
            };
            documents.push(ManifestDocument {
                file_path: file_path.to_string(),
                kind,
                start_line,
                end_line,
                body: item,
            });
        }
    }

    Ok(documents)
}

/// Build a graph of resource vertices from parsed documents.
pub fn build_graph(documents: Vec<ManifestDocument>, framework: GraphFramework) -> AnyGraph {
    let vertices = documents
        .into_iter()
        .enumerate()
        .map(|(index, doc)| doc.into_vertex(index))
        .collect();
    AnyGraph::from_vertices(framework, vertices)
}

fn is_separator(line: &str) -> bool {
    let Some(rest) = line.strip_prefix("---") else {
        return false;
    };
    let rest = rest.trim();
    rest.is_empty() || rest.starts_with('#')
}

/// Split on `---` lines, returning each document with its first line number.
fn split_documents(content: &str) -> Vec<(usize, String)> {
    let mut documents = Vec::new();
    let mut current = Vec::new();
    let mut first_line = 1;

    for (idx, line) in content.lines().enumerate() {
        if is_separator(line) {
            documents.push((first_line, current.join("\n")));
            current.clear();
            first_line = idx + 2;
        } else {
            current.push(line);
        }
    }
    documents.push((first_line, current.join("\n")));
    documents
}

/// First and last lines carrying content, skipping blanks and comments.
fn content_range(first_line: usize, text: &str) -> Option<(usize, usize)> {
    let is_content = |line: &str| {
        let trimmed = line.trim();
        !trimmed.is_empty() && !trimmed.starts_with('#')
    };
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.iter().position(|l| is_content(l))?;
    let end = lines.iter().rposition(|l| is_content(l))?;
    Some((first_line + start, first_line + end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBackend;

    const MULTI: &str = r#"# app manifests
apiVersion: v1
kind: Pod
metadata:
  name: web
spec:
  containers:
    - name: web
      image: nginx
---
apiVersion: apps/v1
kind: Deployment
metadata:
  name: api
  namespace: prod
spec:
  template:
    spec:
      containers:
        - image: api:1.2
---
# trailing empty document
"#;

    #[test]
    fn test_parse_multi_document() {
        let docs = parse_manifests(MULTI, "/app.yaml").unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].kind, "Pod");
        assert_eq!((docs[0].start_line, docs[0].end_line), (2, 9));
        assert_eq!(docs[1].kind, "Deployment");
        assert_eq!((docs[1].start_line, docs[1].end_line), (11, 20));
        assert_eq!(docs[1].vertex_name(1), "Deployment.prod.api");
    }

    #[test]
    fn test_list_expands_items() {
        let content = "kind: List\nitems:\n  - kind: Pod\n    metadata:\n      name: a\n  - kind: Pod\n    metadata:\n      name: b\n";
        let docs = parse_manifests(content, "/list.yaml").unwrap();
        assert_eq!(docs.len(), 2);
        assert!(docs.iter().all(|d| (d.start_line, d.end_line) == (1, 8)));
    }

    #[test]
    fn test_documents_without_kind_ignored() {
        let docs = parse_manifests("foo: bar\n---\n- 1\n- 2\n", "/x.yaml").unwrap();
        assert!(docs.is_empty());
    }

    #[test]
    fn test_invalid_yaml_reports_line() {
        let err = parse_manifests("kind: Pod\n---\nkind: [unclosed\n", "/bad.yaml").unwrap_err();
        match err {
            Error::ManifestParse { line, file_path, .. } => {
                assert_eq!(line, 3);
                assert_eq!(file_path, "/bad.yaml");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_build_graph_markers() {
        let docs = parse_manifests(MULTI, "/app.yaml").unwrap();
        for framework in [GraphFramework::Attributed, GraphFramework::Tabular] {
            let graph = build_graph(docs.clone(), framework);
            let v = graph.vertices()[1];
            assert_eq!(graph.resource_type(v), Some("Deployment"));
            assert_eq!(graph.attribute(v, START_LINE), Some(&Value::from(11)));
            assert_eq!(graph.attribute(v, FILE_PATH), Some(&Value::from("/app.yaml")));
        }
    }
}

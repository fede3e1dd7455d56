use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = ".resgraph/config.toml";
pub const ENV_ENABLE_DEFINITION_KEY: &str = "RESGRAPH_ENABLE_DEFINITION_KEY";
pub const ENV_GRAPH_FRAMEWORK: &str = "RESGRAPH_GRAPH_FRAMEWORK";
pub const DEFAULT_SKIP_DIRECTIVE: &str = "resgraph:skip=";

/// Which graph representation holds the resource vertices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphFramework {
    /// petgraph-backed multigraph with flat attribute maps on each node.
    #[default]
    Attributed,
    /// Column-oriented, id-indexed vertex table.
    Tabular,
}

impl GraphFramework {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "attributed" | "networkx" => Ok(GraphFramework::Attributed),
            "tabular" | "igraph" => Ok(GraphFramework::Tabular),
            other => Err(Error::Config(format!(
                "unknown graph framework '{other}' (expected 'attributed' or 'tabular')"
            ))),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            GraphFramework::Attributed => "attributed",
            GraphFramework::Tabular => "tabular",
        }
    }
}

/// Run-wide settings, resolved once at scan start and passed down explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Qualify context store keys with the module-call path.
    #[serde(default)]
    pub enable_definition_key: bool,

    #[serde(default)]
    pub graph_framework: GraphFramework,

    /// Comment prefixes that introduce a suppression directive.
    #[serde(default = "default_skip_directive_prefixes")]
    pub skip_directive_prefixes: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            enable_definition_key: false,
            graph_framework: GraphFramework::default(),
            skip_directive_prefixes: default_skip_directive_prefixes(),
        }
    }
}

fn default_skip_directive_prefixes() -> Vec<String> {
    vec![DEFAULT_SKIP_DIRECTIVE.to_string()]
}

impl ScanConfig {
    /// Resolve the configuration for one run: file values first, then
    /// environment overrides. An explicit path must exist; the default path
    /// is used only when present.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_PATH);
                if default_path.is_file() {
                    Self::load(default_path)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read '{}': {}", path.display(), e))
        })?;
        Self::from_toml(&content)
            .map_err(|e| Error::Config(format!("in '{}': {}", path.display(), e)))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: ScanConfig =
            toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        if config.skip_directive_prefixes.iter().any(|p| p.trim().is_empty()) {
            return Err(Error::Config(
                "skip_directive_prefixes must not contain empty prefixes".to_string(),
            ));
        }
        Ok(config)
    }

    /// Apply overrides from a variable lookup (the process environment in
    /// `resolve`).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_ENABLE_DEFINITION_KEY) {
            if !value.trim().is_empty() {
                self.enable_definition_key = parse_bool(ENV_ENABLE_DEFINITION_KEY, &value)?;
            }
        }
        if let Some(value) = lookup(ENV_GRAPH_FRAMEWORK) {
            if !value.trim().is_empty() {
                self.graph_framework = GraphFramework::parse(&value)?;
            }
        }
        Ok(())
    }
}

/// Parse a boolean the way shell-style flags are usually written.
pub fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" | "t" | "true" | "on" | "1" => Ok(true),
        "n" | "no" | "f" | "false" | "off" | "0" => Ok(false),
        other => Err(Error::Config(format!(
            "invalid boolean '{other}' for {name}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = ScanConfig::default();
        assert!(!config.enable_definition_key);
        assert_eq!(config.graph_framework, GraphFramework::Attributed);
        assert_eq!(config.skip_directive_prefixes, vec!["resgraph:skip="]);
    }

    #[test]
    fn test_from_toml() {
        let config = ScanConfig::from_toml(
            r#"
enable_definition_key = true
graph_framework = "tabular"
skip_directive_prefixes = ["resgraph:skip=", "scanner:skip="]
"#,
        )
        .unwrap();
        assert!(config.enable_definition_key);
        assert_eq!(config.graph_framework, GraphFramework::Tabular);
        assert_eq!(config.skip_directive_prefixes.len(), 2);
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = ScanConfig::from_toml("").unwrap();
        assert_eq!(config, ScanConfig::default());
    }

    #[test]
    fn test_empty_prefix_rejected() {
        let err = ScanConfig::from_toml(r#"skip_directive_prefixes = [""]"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_env_overrides() {
        let vars = env(&[
            (ENV_ENABLE_DEFINITION_KEY, "Yes"),
            (ENV_GRAPH_FRAMEWORK, "IGRAPH"),
        ]);
        let mut config = ScanConfig::default();
        config.apply_overrides(|name| vars.get(name).cloned()).unwrap();
        assert!(config.enable_definition_key);
        assert_eq!(config.graph_framework, GraphFramework::Tabular);
    }

    #[test]
    fn test_invalid_env_bool() {
        let vars = env(&[(ENV_ENABLE_DEFINITION_KEY, "maybe")]);
        let mut config = ScanConfig::default();
        let err = config
            .apply_overrides(|name| vars.get(name).cloned())
            .unwrap_err();
        assert!(err.to_string().contains("maybe"));
    }

    #[test]
    fn test_parse_bool_variants() {
        for value in ["1", "on", "TRUE", "t", "y"] {
            assert!(parse_bool("X", value).unwrap());
        }
        for value in ["0", "off", "False", "f", "n"] {
            assert!(!parse_bool("X", value).unwrap());
        }
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "enable_definition_key = true\n").unwrap();
        let config = ScanConfig::load(&path).unwrap();
        assert!(config.enable_definition_key);
    }

    #[test]
    fn test_load_missing_file_is_config_error() {
        let err = ScanConfig::load(Path::new("/nonexistent/resgraph.toml")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}

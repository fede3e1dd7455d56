//! Source-accurate context for parsed configuration blocks.
//!
//! A [`ParserRegistry`] turns raw blocks (one list per category, as produced
//! by an external file parser) into [`ContextEntry`] values and records them
//! in a [`DefinitionsContext`] owned by the caller.

pub mod parser;
pub mod registry;
pub mod skip;
pub mod source;

pub use parser::{BlockContext, BlockContextParser, BlockShape, ContextParser, ParseSession};
pub use registry::ParserRegistry;
pub use skip::SkipDirectiveScanner;
pub use source::SourceCache;

use crate::error::{Error, Result};
use indexmap::IndexMap;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::path::Path;

/// Block-level start line marker written by the configuration parsers.
pub const START_LINE: &str = "__start_line__";
/// Block-level end line marker written by the configuration parsers.
pub const END_LINE: &str = "__end_line__";

/// Raw blocks of one file, grouped by category (`resource`, `module`, ...).
pub type BlocksByCategory = IndexMap<String, Vec<Value>>;

/// One hop of the module-call chain that instantiated a file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModuleCall {
    /// File containing the `module` block.
    pub path: String,
    /// Name of the `module` block.
    pub name: String,
}

/// Logical identity of a configuration file, optionally qualified by the
/// module calls that produced this instance of it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DefinitionKey {
    pub file_path: String,
    #[serde(default)]
    pub source_modules: Vec<ModuleCall>,
}

impl DefinitionKey {
    pub fn new(file_path: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            source_modules: Vec::new(),
        }
    }

    pub fn with_module(mut self, path: impl Into<String>, name: impl Into<String>) -> Self {
        self.source_modules.push(ModuleCall {
            path: path.into(),
            name: name.into(),
        });
        self
    }
}

impl fmt::Display for DefinitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.file_path)?;
        if !self.source_modules.is_empty() {
            let chain: Vec<String> = self
                .source_modules
                .iter()
                .map(|m| format!("{}#{}", m.path, m.name))
                .collect();
            write!(f, "[{}]", chain.join("/"))?;
        }
        Ok(())
    }
}

/// One file's raw blocks as dumped by a configuration parser.
#[derive(Debug, Clone, Deserialize)]
pub struct DefinitionsInput {
    pub file_path: String,
    #[serde(default)]
    pub source_modules: Vec<ModuleCall>,
    pub blocks: BlocksByCategory,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(DefinitionsInput),
    Many(Vec<DefinitionsInput>),
}

impl DefinitionsInput {
    /// Parse a single dump object or an array of them.
    pub fn parse_all(content: &str) -> Result<Vec<Self>> {
        let parsed: OneOrMany = serde_json::from_str(content)
            .map_err(|e| Error::InvalidDefinitions(e.to_string()))?;
        Ok(match parsed {
            OneOrMany::One(input) => vec![input],
            OneOrMany::Many(inputs) => inputs,
        })
    }

    pub fn key(&self) -> DefinitionKey {
        DefinitionKey {
            file_path: self.file_path.clone(),
            source_modules: self.source_modules.clone(),
        }
    }

    /// Make a relative `file_path` relative to `base` instead of the
    /// working directory.
    pub fn resolve_relative_to(&mut self, base: &Path) {
        if Path::new(&self.file_path).is_relative() {
            self.file_path = base.join(&self.file_path).to_string_lossy().to_string();
        }
    }
}

/// How definition keys map onto store keys. Fixed for the life of a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyMode {
    /// Key by file path only; module instances of one file share a slot.
    #[default]
    FilePath,
    /// Key by file path plus module-call chain.
    Qualified,
}

impl KeyMode {
    pub fn from_flag(enable_definition_key: bool) -> Self {
        if enable_definition_key {
            KeyMode::Qualified
        } else {
            KeyMode::FilePath
        }
    }

    pub fn store_key(&self, key: &DefinitionKey) -> StoreKey {
        match self {
            KeyMode::FilePath => StoreKey::File(key.file_path.clone()),
            KeyMode::Qualified => StoreKey::Definition(key.clone()),
        }
    }
}

/// Effective key of the context store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StoreKey {
    File(String),
    Definition(DefinitionKey),
}

impl StoreKey {
    pub fn file_path(&self) -> &str {
        match self {
            StoreKey::File(path) => path,
            StoreKey::Definition(key) => &key.file_path,
        }
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreKey::File(path) => write!(f, "{path}"),
            StoreKey::Definition(key) => write!(f, "{key}"),
        }
    }
}

/// A suppression directive found inside a block's line range.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SkippedCheck {
    pub id: String,
    pub suppress_comment: Option<String>,
}

/// Computed metadata for one block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextEntry {
    pub start_line: usize,
    pub end_line: usize,
    pub code_lines: Vec<(usize, String)>,
    pub skipped_checks: Vec<SkippedCheck>,
}

/// Per-category block contexts keyed by block id, in input order.
pub type CategoryContext = IndexMap<String, ContextEntry>;

/// Context of every enriched file: key → category → block id → entry.
///
/// Owned by the scan that creates it. Not synchronized; parallel workers
/// each keep their own store and [`merge`](Self::merge) afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DefinitionsContext {
    entries: IndexMap<StoreKey, IndexMap<String, CategoryContext>>,
}

impl DefinitionsContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &StoreKey> {
        self.entries.keys()
    }

    pub fn get(&self, key: &StoreKey) -> Option<&IndexMap<String, CategoryContext>> {
        self.entries.get(key)
    }

    pub fn category(&self, key: &StoreKey, category: &str) -> Option<&CategoryContext> {
        self.entries.get(key).and_then(|c| c.get(category))
    }

    pub fn entity_context(
        &self,
        key: &StoreKey,
        category: &str,
        block_id: &str,
    ) -> Option<&ContextEntry> {
        self.category(key, category).and_then(|b| b.get(block_id))
    }

    /// Suppressions recorded for a block; empty when the block is unknown.
    pub fn skipped_checks(&self, key: &StoreKey, category: &str, block_id: &str) -> &[SkippedCheck] {
        self.entity_context(key, category, block_id)
            .map(|entry| entry.skipped_checks.as_slice())
            .unwrap_or(&[])
    }

    /// Replace the slot for `[key][category]`.
    pub(crate) fn set_category(&mut self, key: StoreKey, category: &str, blocks: CategoryContext) {
        self.entries
            .entry(key)
            .or_default()
            .insert(category.to_string(), blocks);
    }

    /// Drop one category slot, and the key itself once it holds nothing.
    pub(crate) fn remove_category(&mut self, key: &StoreKey, category: &str) {
        if let Some(categories) = self.entries.get_mut(key) {
            categories.shift_remove(category);
            if categories.is_empty() {
                self.entries.shift_remove(key);
            }
        }
    }

    /// Fold another store into this one. Categories present in `other`
    /// replace the same key/category here.
    pub fn merge(&mut self, other: DefinitionsContext) {
        for (key, categories) in other.entries {
            let slot = self.entries.entry(key).or_default();
            for (category, blocks) in categories {
                slot.insert(category, blocks);
            }
        }
    }
}

impl Serialize for DefinitionsContext {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, categories) in &self.entries {
            map.serialize_entry(&key.to_string(), categories)?;
        }
        map.end()
    }
}

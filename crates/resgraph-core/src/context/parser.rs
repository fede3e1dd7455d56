use crate::context::{ContextEntry, SkipDirectiveScanner, SourceCache, StoreKey, END_LINE, START_LINE};
use crate::error::{Error, Result};
use serde_json::{Map, Value};
use tracing::warn;

/// Shared, read-only inputs for one enrichment call.
pub struct ParseSession<'a> {
    pub sources: &'a SourceCache,
    pub scanner: &'a SkipDirectiveScanner,
}

/// Context computed for one block, tagged with its stable id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockContext {
    pub block_id: String,
    pub entry: ContextEntry,
}

/// Computes context entries for the blocks of one category.
pub trait ContextParser {
    /// Returns one context per well-formed block, in input order.
    /// Malformed blocks are skipped and unreadable source text leaves
    /// `code_lines` empty; an `Err` fails the whole category.
    fn run(
        &self,
        key: &StoreKey,
        blocks: &[Value],
        collect_skip_comments: bool,
        session: &ParseSession<'_>,
    ) -> Result<Vec<BlockContext>>;
}

/// How a category nests its blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockShape {
    /// `{type: {name: body}}`, id `type.name`.
    Typed,
    /// `{name: body}`, id `name`.
    Named,
    /// Markers on the block itself, id is the category name.
    Unnamed,
}

/// Category parser driven by the block shape.
#[derive(Debug, Clone)]
pub struct BlockContextParser {
    category: String,
    shape: BlockShape,
}

impl BlockContextParser {
    pub fn new(category: impl Into<String>, shape: BlockShape) -> Self {
        Self {
            category: category.into(),
            shape,
        }
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    /// Parsers for the standard Terraform block categories.
    pub fn defaults() -> Vec<BlockContextParser> {
        vec![
            Self::new("resource", BlockShape::Typed),
            Self::new("data", BlockShape::Typed),
            Self::new("module", BlockShape::Named),
            Self::new("provider", BlockShape::Named),
            Self::new("variable", BlockShape::Named),
            Self::new("output", BlockShape::Named),
            Self::new("locals", BlockShape::Unnamed),
            Self::new("terraform", BlockShape::Unnamed),
        ]
    }

    fn malformed(&self, index: usize, reason: impl Into<String>) -> Error {
        Error::MalformedBlock {
            category: self.category.clone(),
            index,
            reason: reason.into(),
        }
    }

    /// Flatten one raw block into `(block_id, body)` pairs. Inner entries that
    /// are not mappings are skipped on their own; only a raw block that is not
    /// a mapping is an error.
    fn flatten<'b>(
        &self,
        key: &StoreKey,
        index: usize,
        block: &'b Value,
        unnamed_seen: &mut usize,
    ) -> Result<Vec<(String, &'b Map<String, Value>)>> {
        let map = block
            .as_object()
            .ok_or_else(|| self.malformed(index, "block is not a mapping"))?;

        let mut out = Vec::new();
        match self.shape {
            BlockShape::Unnamed => {
                *unnamed_seen += 1;
                let id = if *unnamed_seen == 1 {
                    self.category.clone()
                } else {
                    format!("{}#{}", self.category, unnamed_seen)
                };
                out.push((id, map));
            }
            BlockShape::Named => {
                for (name, body) in map {
                    let Some(body) = body.as_object() else {
                        warn!(file = %key, "Skipping block: {}", self.malformed(index, format!("'{name}' is not a mapping")));
                        continue;
                    };
                    let id = match (self.category.as_str(), scalar_attribute(body, "alias")) {
                        ("provider", Some(alias)) => format!("{name}.{alias}"),
                        _ => name.clone(),
                    };
                    out.push((id, body));
                }
            }
            BlockShape::Typed => {
                for (block_type, names) in map {
                    let Some(names) = names.as_object() else {
                        warn!(file = %key, "Skipping block: {}", self.malformed(index, format!("'{block_type}' is not a mapping")));
                        continue;
                    };
                    for (name, body) in names {
                        let Some(body) = body.as_object() else {
                            warn!(file = %key, "Skipping block: {}", self.malformed(index, format!("'{block_type}.{name}' is not a mapping")));
                            continue;
                        };
                        out.push((format!("{block_type}.{name}"), body));
                    }
                }
            }
        }
        Ok(out)
    }

    fn line_range(&self, index: usize, id: &str, body: &Map<String, Value>) -> Result<(usize, usize)> {
        let marker = |name: &str| {
            body.get(name)
                .and_then(Value::as_u64)
                .map(|n| n as usize)
                .ok_or_else(|| self.malformed(index, format!("'{id}' has no {name} marker")))
        };
        let start = marker(START_LINE)?;
        let end = marker(END_LINE)?;
        if end < start {
            return Err(self.malformed(index, format!("'{id}' ends ({end}) before it starts ({start})")));
        }
        Ok((start, end))
    }
}

impl ContextParser for BlockContextParser {
    fn run(
        &self,
        key: &StoreKey,
        blocks: &[Value],
        collect_skip_comments: bool,
        session: &ParseSession<'_>,
    ) -> Result<Vec<BlockContext>> {
        let mut contexts = Vec::new();
        let mut unnamed_seen = 0;
        let mut source_missing = false;

        for (index, block) in blocks.iter().enumerate() {
            let bodies = match self.flatten(key, index, block, &mut unnamed_seen) {
                Ok(bodies) => bodies,
                Err(e) => {
                    warn!(file = %key, "Skipping block: {e}");
                    continue;
                }
            };

            for (block_id, body) in bodies {
                let (start_line, end_line) = match self.line_range(index, &block_id, body) {
                    Ok(range) => range,
                    Err(e) => {
                        warn!(file = %key, "Skipping block: {e}");
                        continue;
                    }
                };

                // Unreadable source still yields the entry, without text.
                let code_lines = if source_missing {
                    Vec::new()
                } else {
                    match session.sources.lines(key.file_path(), start_line, end_line) {
                        Ok(lines) => lines,
                        Err(e) => {
                            warn!(file = %key, "Source text unavailable, emitting line ranges only: {e}");
                            source_missing = true;
                            Vec::new()
                        }
                    }
                };
                let skipped_checks = if collect_skip_comments {
                    session
                        .scanner
                        .scan(code_lines.iter().map(|(_, text)| text.as_str()))
                } else {
                    Vec::new()
                };

                contexts.push(BlockContext {
                    block_id,
                    entry: ContextEntry {
                        start_line,
                        end_line,
                        code_lines,
                        skipped_checks,
                    },
                });
            }
        }

        Ok(contexts)
    }
}

/// A string attribute, unwrapping the single-element list form HCL parsers
/// produce (`alias = ["west"]`).
fn scalar_attribute<'v>(body: &'v Map<String, Value>, name: &str) -> Option<&'v str> {
    match body.get(name)? {
        Value::String(s) => Some(s.as_str()),
        Value::Array(items) => items.first().and_then(Value::as_str),
        _ => None,
    }
}

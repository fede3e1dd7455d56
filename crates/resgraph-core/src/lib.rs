//! Context enrichment and image extraction for infrastructure-as-code
//! resource graphs.
//!
//! Two jobs share this crate: attaching line ranges and suppression
//! directives to parsed configuration blocks ([`context`]), and listing the
//! container images referenced by an already-built resource graph
//! ([`images`]). Both work over caller-owned state; nothing here is global.

pub mod config;
pub mod context;
pub mod error;
pub mod graph;
pub mod images;
pub mod manifest;

pub use config::{GraphFramework, ScanConfig};
pub use context::{
    BlocksByCategory, ContextEntry, DefinitionKey, DefinitionsContext, DefinitionsInput,
    ParserRegistry, SkippedCheck, SourceCache, StoreKey,
};
pub use error::{Error, Result};
pub use graph::{AnyGraph, AttributedGraph, GraphBackend, TabularGraph, VertexData, VertexId};
pub use images::{Image, ImageProvider, ImageReferencerManager, KubernetesProvider, Platform};

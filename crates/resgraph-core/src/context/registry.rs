use crate::config::ScanConfig;
use crate::context::parser::ParseSession;
use crate::context::{
    BlockContextParser, BlocksByCategory, CategoryContext, ContextParser, DefinitionKey,
    DefinitionsContext, KeyMode, SkipDirectiveScanner, SourceCache,
};
use crate::error::{Error, Result};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Category parsers plus the keying decision for one run.
pub struct ParserRegistry {
    parsers: HashMap<String, Box<dyn ContextParser>>,
    key_mode: KeyMode,
    scanner: SkipDirectiveScanner,
}

impl ParserRegistry {
    /// Empty registry. The key mode is taken from `config` here and never
    /// re-read.
    pub fn new(config: &ScanConfig) -> Result<Self> {
        Ok(Self {
            parsers: HashMap::new(),
            key_mode: KeyMode::from_flag(config.enable_definition_key),
            scanner: SkipDirectiveScanner::new(&config.skip_directive_prefixes)?,
        })
    }

    pub fn with_default_parsers(config: &ScanConfig) -> Result<Self> {
        let mut registry = Self::new(config)?;
        for parser in BlockContextParser::defaults() {
            let category = parser.category().to_string();
            registry.register(category, parser);
        }
        Ok(registry)
    }

    /// Register `parser` for `category`, replacing any earlier one.
    pub fn register(&mut self, category: impl Into<String>, parser: impl ContextParser + 'static) {
        self.parsers.insert(category.into(), Box::new(parser));
    }

    pub fn key_mode(&self) -> KeyMode {
        self.key_mode
    }

    pub fn is_registered(&self, category: &str) -> bool {
        self.parsers.contains_key(category)
    }

    pub fn categories(&self) -> Vec<&str> {
        let mut categories: Vec<&str> = self.parsers.keys().map(String::as_str).collect();
        categories.sort_unstable();
        categories
    }

    /// Compute contexts for every registered category in `blocks` and store
    /// them under the key derived from `key`. Returns the whole store.
    ///
    /// A failing category leaves its slot absent, dropping whatever an
    /// earlier call stored there, and is logged. The call
    /// fails only when every registered category present failed.
    pub fn enrich<'s>(
        &self,
        store: &'s mut DefinitionsContext,
        key: &DefinitionKey,
        blocks: &BlocksByCategory,
        collect_skip_comments: bool,
        sources: &SourceCache,
    ) -> Result<&'s DefinitionsContext> {
        if blocks.is_empty() {
            return Ok(store);
        }

        let store_key = self.key_mode.store_key(key);
        let session = ParseSession {
            sources,
            scanner: &self.scanner,
        };
        let mut attempted = 0usize;
        let mut failures = Vec::new();

        for (category, category_blocks) in blocks {
            let Some(parser) = self.parsers.get(category) else {
                debug!(file = %store_key, category = %category, "No context parser registered, skipping");
                continue;
            };
            attempted += 1;

            match parser.run(&store_key, category_blocks, collect_skip_comments, &session) {
                Ok(contexts) => {
                    let slot: CategoryContext = contexts
                        .into_iter()
                        .map(|c| (c.block_id, c.entry))
                        .collect();
                    debug!(file = %store_key, category = %category, blocks = slot.len(), "Enriched category");
                    store.set_category(store_key.clone(), category, slot);
                }
                Err(e) => {
                    warn!(file = %store_key, category = %category, "Failed to enrich category: {e}");
                    store.remove_category(&store_key, category);
                    failures.push((category.clone(), e.to_string()));
                }
            }
        }

        if attempted > 0 && failures.len() == attempted {
            return Err(Error::EnrichmentFailed {
                key: store_key.to_string(),
                failures,
            });
        }

        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{BlockContext, StoreKey};
    use serde_json::{json, Value};

    const MAIN_TF: &str = "resource \"aws_instance\" \"web\" {\n  # resgraph:skip=CKV_AWS_8\n  ami = \"ami-1\"\n}\nvariable \"region\" {\n  default = \"us-east-1\"\n}\n";

    struct FailingParser;

    impl ContextParser for FailingParser {
        fn run(
            &self,
            _key: &StoreKey,
            _blocks: &[Value],
            _collect_skip_comments: bool,
            _session: &ParseSession<'_>,
        ) -> Result<Vec<BlockContext>> {
            Err(Error::Config("boom".into()))
        }
    }

    fn blocks() -> BlocksByCategory {
        let mut blocks = BlocksByCategory::new();
        blocks.insert(
            "resource".into(),
            vec![json!({"aws_instance": {"web": {"__start_line__": 1, "__end_line__": 4}}})],
        );
        blocks.insert(
            "variable".into(),
            vec![json!({"region": {"__start_line__": 5, "__end_line__": 7}})],
        );
        blocks
    }

    fn sources() -> SourceCache {
        let sources = SourceCache::new();
        sources.insert("/main.tf", MAIN_TF);
        sources
    }

    #[test]
    fn test_enrich_registered_categories() {
        let registry = ParserRegistry::with_default_parsers(&ScanConfig::default()).unwrap();
        let mut store = DefinitionsContext::new();
        let sources = sources();
        let result = registry
            .enrich(&mut store, &DefinitionKey::new("/main.tf"), &blocks(), true, &sources)
            .unwrap();

        let key = StoreKey::File("/main.tf".into());
        let web = result.entity_context(&key, "resource", "aws_instance.web").unwrap();
        assert_eq!((web.start_line, web.end_line), (1, 4));
        assert_eq!(web.skipped_checks[0].id, "CKV_AWS_8");
        assert!(result.entity_context(&key, "variable", "region").is_some());
    }

    #[test]
    fn test_unregistered_category_ignored() {
        let mut registry = ParserRegistry::new(&ScanConfig::default()).unwrap();
        registry.register("variable", BlockContextParser::new("variable", crate::context::BlockShape::Named));
        let mut store = DefinitionsContext::new();
        let sources = sources();
        registry
            .enrich(&mut store, &DefinitionKey::new("/main.tf"), &blocks(), true, &sources)
            .unwrap();

        let key = StoreKey::File("/main.tf".into());
        assert!(store.category(&key, "resource").is_none());
        assert!(store.category(&key, "variable").is_some());
    }

    #[test]
    fn test_empty_input_leaves_store_unchanged() {
        let registry = ParserRegistry::with_default_parsers(&ScanConfig::default()).unwrap();
        let mut store = DefinitionsContext::new();
        let sources = SourceCache::new();
        registry
            .enrich(&mut store, &DefinitionKey::new("/x.tf"), &BlocksByCategory::new(), true, &sources)
            .unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_last_registration_wins() {
        let mut registry = ParserRegistry::with_default_parsers(&ScanConfig::default()).unwrap();
        registry.register("resource", FailingParser);
        assert!(registry.is_registered("resource"));
        assert!(!registry.is_registered("moved"));
        let mut store = DefinitionsContext::new();
        let sources = sources();
        registry
            .enrich(&mut store, &DefinitionKey::new("/main.tf"), &blocks(), true, &sources)
            .unwrap();
        let key = StoreKey::File("/main.tf".into());
        assert!(store.category(&key, "resource").is_none());
        assert!(store.category(&key, "variable").is_some());
    }

    #[test]
    fn test_failing_call_clears_earlier_slot() {
        let key = DefinitionKey::new("/main.tf");
        let store_key = StoreKey::File("/main.tf".into());
        let sources = sources();
        let mut store = DefinitionsContext::new();

        let good = ParserRegistry::with_default_parsers(&ScanConfig::default()).unwrap();
        good.enrich(&mut store, &key, &blocks(), true, &sources).unwrap();
        assert!(store.category(&store_key, "resource").is_some());

        let mut broken = ParserRegistry::with_default_parsers(&ScanConfig::default()).unwrap();
        broken.register("resource", FailingParser);
        broken.enrich(&mut store, &key, &blocks(), true, &sources).unwrap();
        assert!(store.category(&store_key, "resource").is_none());
        assert!(store.entity_context(&store_key, "variable", "region").is_some());
    }

    #[test]
    fn test_unreadable_source_keeps_entries() {
        let registry = ParserRegistry::with_default_parsers(&ScanConfig::default()).unwrap();
        let mut blocks = BlocksByCategory::new();
        blocks.insert(
            "variable".into(),
            vec![
                json!({"region": {"__start_line__": 1, "__end_line__": 3}}),
                json!({"zone": {"__start_line__": 5, "__end_line__": 7}}),
            ],
        );
        let mut store = DefinitionsContext::new();
        let sources = SourceCache::new();
        registry
            .enrich(&mut store, &DefinitionKey::new("/nope/vars.tf"), &blocks, true, &sources)
            .unwrap();

        let key = StoreKey::File("/nope/vars.tf".into());
        assert_eq!(store.category(&key, "variable").map(|c| c.len()), Some(2));
        let region = store.entity_context(&key, "variable", "region").unwrap();
        assert_eq!((region.start_line, region.end_line), (1, 3));
        assert!(region.code_lines.is_empty());
        assert!(store.skipped_checks(&key, "variable", "region").is_empty());
    }

    #[test]
    fn test_all_categories_failing_is_error() {
        let mut registry = ParserRegistry::new(&ScanConfig::default()).unwrap();
        registry.register("resource", FailingParser);
        registry.register("variable", FailingParser);
        let mut store = DefinitionsContext::new();
        let sources = sources();
        let err = registry
            .enrich(&mut store, &DefinitionKey::new("/main.tf"), &blocks(), true, &sources)
            .unwrap_err();
        match err {
            Error::EnrichmentFailed { key, failures } => {
                assert_eq!(key, "/main.tf");
                assert_eq!(failures.len(), 2);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(store.is_empty());
    }

    #[test]
    fn test_qualified_keys_keep_module_instances_apart() {
        let config = ScanConfig {
            enable_definition_key: true,
            ..ScanConfig::default()
        };
        let registry = ParserRegistry::with_default_parsers(&config).unwrap();
        assert_eq!(registry.key_mode(), KeyMode::Qualified);

        let first = DefinitionKey::new("/main.tf").with_module("/root.tf", "a");
        let second = DefinitionKey::new("/main.tf").with_module("/root.tf", "b");
        let mut store = DefinitionsContext::new();
        let sources = sources();
        registry.enrich(&mut store, &first, &blocks(), true, &sources).unwrap();
        registry.enrich(&mut store, &second, &blocks(), true, &sources).unwrap();
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_file_keys_collide_across_module_instances() {
        let registry = ParserRegistry::with_default_parsers(&ScanConfig::default()).unwrap();
        let first = DefinitionKey::new("/main.tf").with_module("/root.tf", "a");
        let second = DefinitionKey::new("/main.tf").with_module("/root.tf", "b");
        let mut store = DefinitionsContext::new();
        let sources = sources();
        registry.enrich(&mut store, &first, &blocks(), true, &sources).unwrap();
        registry.enrich(&mut store, &second, &blocks(), true, &sources).unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_categories_sorted() {
        let registry = ParserRegistry::with_default_parsers(&ScanConfig::default()).unwrap();
        let categories = registry.categories();
        assert_eq!(categories.first(), Some(&"data"));
        assert_eq!(categories.len(), 8);
    }
}

mod display;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use resgraph_core::manifest;
use resgraph_core::{
    DefinitionsContext, DefinitionsInput, GraphBackend, ImageReferencerManager, ParserRegistry,
    ScanConfig, SourceCache,
};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "resgraph",
    version,
    about = "resgraph — block context and image references for IaC scans",
    long_about = "Attach line ranges and suppression directives to parsed configuration blocks, \
and list the container images referenced by Kubernetes manifests."
)]
struct Cli {
    /// Path to a TOML config file (defaults to .resgraph/config.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute block context for a definitions dump
    Context {
        /// JSON dump: {"file_path", "source_modules"?, "blocks"} or an array of them
        path: PathBuf,

        /// Do not collect suppression directives
        #[arg(long)]
        no_skip_comments: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// List container images referenced by Kubernetes manifests
    Images {
        /// Manifest file or directory containing .yaml/.yml files
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Generate shell completion scripts
    Completions {
        shell: clap_complete::Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(&cli.log_level);

    match cli.command {
        Commands::Context {
            path,
            no_skip_comments,
            format,
        } => {
            let config = ScanConfig::resolve(cli.config.as_deref())?;
            cmd_context(&config, &path, !no_skip_comments, &format)
        }
        Commands::Images { path, format } => {
            let config = ScanConfig::resolve(cli.config.as_deref())?;
            cmd_images(&config, &path, &format)
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "resgraph", &mut std::io::stdout());
            Ok(())
        }
    }
}

fn setup_logging(log_level: &str) {
    let level = match log_level.to_lowercase().as_str() {
        level @ ("trace" | "debug" | "info" | "warn" | "error") => level.to_string(),
        _ => "warn".to_string(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(level))
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn cmd_context(config: &ScanConfig, path: &Path, collect_skip_comments: bool, format: &str) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read definitions file: {}", path.display()))?;
    let mut inputs = DefinitionsInput::parse_all(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    let base = path.parent().unwrap_or_else(|| Path::new("."));
    for input in &mut inputs {
        input.resolve_relative_to(base);
    }

    let registry = ParserRegistry::with_default_parsers(config)?;
    let sources = SourceCache::new();
    let mut store = DefinitionsContext::new();

    for input in &inputs {
        if let Err(e) = registry.enrich(
            &mut store,
            &input.key(),
            &input.blocks,
            collect_skip_comments,
            &sources,
        ) {
            warn!("{e}");
        }
    }

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&store)?),
        _ => display::print_context(&store),
    }

    Ok(())
}

fn discover_manifest_files(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    if path.is_dir() {
        let mut files: Vec<PathBuf> = glob::glob(&format!("{}/**/*.yml", path.display()))
            .context("Failed to read glob pattern")?
            .chain(
                glob::glob(&format!("{}/**/*.yaml", path.display()))
                    .context("Failed to read glob pattern")?,
            )
            .filter_map(|r| r.ok())
            .collect();
        files.sort();
        return Ok(files);
    }

    anyhow::bail!("Path '{}' does not exist", path.display());
}

fn cmd_images(config: &ScanConfig, path: &Path, format: &str) -> Result<()> {
    let files = discover_manifest_files(path)?;
    if files.is_empty() {
        anyhow::bail!("No manifest files found at '{}'", path.display());
    }

    let mut documents = Vec::new();
    for file in &files {
        match manifest::load_manifests(file) {
            Ok(docs) => {
                debug!(file = %file.display(), documents = docs.len(), "Loaded manifest");
                documents.extend(docs);
            }
            Err(e) => warn!("Skipping {}: {e}", file.display()),
        }
    }

    let graph = manifest::build_graph(documents, config.graph_framework);
    let images = ImageReferencerManager::new(&graph).extract_images_from_resources();

    match format {
        "json" => {
            let report = display::ImageReport {
                generated_at: chrono::Utc::now().to_rfc3339(),
                graph_framework: config.graph_framework.label().to_string(),
                resource_count: graph.vertex_count(),
                images,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        _ => display::print_images(&images, graph.vertex_count()),
    }

    Ok(())
}

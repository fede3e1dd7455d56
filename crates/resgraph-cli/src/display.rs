use colored::*;
use resgraph_core::{DefinitionsContext, Image};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ImageReport {
    pub generated_at: String,
    pub graph_framework: String,
    pub resource_count: usize,
    pub images: Vec<Image>,
}

/// Print the enriched context store to the terminal.
pub fn print_context(store: &DefinitionsContext) {
    println!();
    println!(
        "{}",
        format!(" resgraph v{} — Block context", env!("CARGO_PKG_VERSION")).bold()
    );
    println!();

    if store.is_empty() {
        println!(" {} No blocks were enriched.", "--".dimmed());
        return;
    }

    for key in store.keys() {
        println!(" {}", key.to_string().bold().underline());
        let Some(categories) = store.get(key) else {
            continue;
        };
        for (category, blocks) in categories {
            println!(" {} {}", "|-".dimmed(), category.cyan());
            for (block_id, entry) in blocks {
                println!(
                    " {}   {} (lines {}-{})",
                    "|-".dimmed(),
                    block_id,
                    entry.start_line,
                    entry.end_line
                );
                for skip in &entry.skipped_checks {
                    let reason = skip
                        .suppress_comment
                        .as_deref()
                        .unwrap_or("no reason given");
                    println!(
                        " {}     {} {} {}",
                        "|-".dimmed(),
                        "SKIP".yellow().bold(),
                        skip.id,
                        format!("({reason})").dimmed()
                    );
                }
            }
        }
        println!();
    }
}

/// Print extracted image references to the terminal.
pub fn print_images(images: &[Image], resource_count: usize) {
    println!();
    println!(
        "{}",
        format!(" resgraph v{} — Image references", env!("CARGO_PKG_VERSION")).bold()
    );
    println!(
        " {} {} resources scanned, {} unique images",
        "|-".dimmed(),
        resource_count,
        images.len()
    );
    println!();

    if images.is_empty() {
        println!(" {} No container images found.", "OK".green().bold());
        return;
    }

    for image in images {
        println!(" {} {}", "*".cyan(), image.name.bold());
        println!(
            " {} {}:{}-{}",
            "|-".dimmed(),
            image.file_path,
            image.start_line,
            image.end_line
        );
        println!(" {} resource: {}", "|-".dimmed(), image.related_resource_id);
    }
    println!();
}

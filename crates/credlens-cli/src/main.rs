mod render;

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use credlens_core::kb::NoEvents;
use credlens_core::kb::memory::StaticKnowledgeBase;
use credlens_core::{Config, EntityMention, EntityType, Pipeline};
use tracing_subscriber::EnvFilter;

use crate::render::{OutputFormat, render};

#[derive(Parser)]
#[command(name = "credlens")]
#[command(about = "credlens — credibility scoring for news articles through a linked knowledge graph")]
#[command(version)]
struct Cli {
    /// Article text; read from --file or stdin when omitted
    #[arg(conflicts_with = "file")]
    text: Option<String>,

    /// Read the article text from a file
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Article author
    #[arg(short, long)]
    author: String,

    /// Publishing outlet
    #[arg(long)]
    source: String,

    /// Explicit entity mention as LABEL=TYPE (repeatable); skips extraction
    #[arg(short, long = "entity", value_name = "LABEL=TYPE", value_parser = parse_entity)]
    entities: Vec<EntityMention>,

    /// Output format
    #[arg(long, value_enum, default_value = "summary")]
    format: OutputFormat,

    /// Skip the knowledge base and events services; nothing resolves
    #[arg(long)]
    offline: bool,

    /// Project config file (defaults to ./credlens.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Save output to a file
    #[arg(short, long, value_name = "PATH")]
    save: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn parse_entity(raw: &str) -> std::result::Result<EntityMention, String> {
    let (label, tag) = raw
        .rsplit_once('=')
        .ok_or_else(|| format!("expected LABEL=TYPE, got {raw:?}"))?;
    let entity_type: EntityType = tag.parse().map_err(|err| format!("{err}"))?;
    Ok(EntityMention::new(label.trim(), entity_type))
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn read_article(cli: &Cli) -> Result<String> {
    if let Some(text) = cli.text.as_ref() {
        return Ok(text.clone());
    }
    if let Some(path) = cli.file.as_ref() {
        return fs::read_to_string(path)
            .with_context(|| format!("failed to read article from {}", path.display()));
    }

    let mut text = String::new();
    io::stdin()
        .read_to_string(&mut text)
        .context("failed to read article from stdin")?;
    Ok(text)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match cli.config.as_ref() {
        Some(path) => Config::load_with(path),
        None => Config::load(),
    }
    .context("failed to load configuration")?;

    let pipeline = if cli.offline {
        Pipeline::new(Arc::new(StaticKnowledgeBase::new()), Arc::new(NoEvents))
            .with_settings(&config)
    } else {
        Pipeline::from_config(&config).context("failed to set up the pipeline")?
    };

    let analysis = if cli.entities.is_empty() {
        let text = read_article(&cli)?;
        pipeline.analyze(&text, &cli.author, &cli.source).await
    } else {
        pipeline
            .analyze_mentions(&cli.author, &cli.source, cli.entities.clone())
            .await
    }
    .context("analysis failed")?;

    let output = render(&analysis, cli.format, &config.export.namespace)?;
    print!("{output}");

    if let Some(path) = cli.save.as_ref() {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create output directory {}", parent.display())
            })?;
        }

        fs::write(path, output.as_bytes())
            .with_context(|| format!("failed to write output file {}", path.display()))?;

        eprintln!("Wrote output to {}", path.display());
    }

    Ok(())
}

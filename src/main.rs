//! `dungeon-gen`: generate a dungeon level and print it.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use dungeon_core::logging::{init_tracing, LogLevel, TracingConfig};
use dungeon_core::{create_map, GenerationConfig};

/// Generate a dungeon level and print it as glyphs or JSON
#[derive(Debug, Parser)]
#[command(name = "dungeon-gen", version)]
struct Cli {
    /// JSON or RON generation config; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Dungeon level, scales the map size and counts
    #[arg(short, long)]
    level: Option<i32>,

    /// Seed for a reproducible map
    #[arg(short, long)]
    seed: Option<u64>,

    /// Print the whole map as JSON instead of glyphs
    #[arg(long)]
    json: bool,

    /// Mark BSP split lines in the output
    #[arg(long)]
    debug_splits: bool,

    /// trace, debug, info, warn or error; overrides the default filters
    #[arg(long)]
    log_level: Option<String>,

    /// JSON tracing config with per-module filters
    #[arg(long, conflicts_with = "log_level")]
    log_config: Option<PathBuf>,

    /// Print the effective tracing config as JSON and exit
    #[arg(long)]
    print_log_config: bool,
}

fn tracing_config(cli: &Cli) -> anyhow::Result<TracingConfig> {
    if let Some(path) = &cli.log_config {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        return TracingConfig::from_json(&text)
            .with_context(|| format!("invalid tracing config in {}", path.display()));
    }
    match &cli.log_level {
        Some(level) => Ok(TracingConfig::with_level(level.parse::<LogLevel>()?)),
        None => Ok(TracingConfig::default()),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_config = tracing_config(&cli)?;
    if cli.print_log_config {
        println!("{}", log_config.to_json());
        return Ok(());
    }
    init_tracing(&log_config);

    let mut config = match &cli.config {
        Some(path) => GenerationConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => GenerationConfig::default(),
    };
    if let Some(level) = cli.level {
        config.level = level;
    }
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    config.debug_split_walls |= cli.debug_splits;

    let map = create_map(&config).context("dungeon generation failed")?;

    if cli.json {
        println!("{}", map.to_json()?);
    } else {
        print!("{}", map.grid);
        println!("level {} seed {} rooms {}", map.level, map.seed, map.rooms.len());
    }
    Ok(())
}

//! PRAH Export
//!
//! Writes every table of one session into a directory of CSV files

use anyhow::{Context, Result};
use clap::Parser;
use prah_core::model::slugify;
use prah_core::{LoadOptions, SessionKind};
use prah_server::config::SourceKind;
use prah_server::{export, open_source};
use std::path::PathBuf;
use tracing::info;

/// Export a session to CSV files
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Season year
    #[arg(long)]
    year: i32,

    /// Event name, location or round number
    #[arg(long)]
    race: String,

    /// Session code (FP1, FP2, FP3, SQ, S, Q, R)
    #[arg(long, default_value = "R")]
    session: SessionKind,

    /// Directory holding cached session dumps
    #[arg(long, default_value = "f1_cache")]
    cache_dir: PathBuf,

    /// Output directory (default: f1_data_<year>_<race>)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Use the synthetic demo session instead of the cache
    #[arg(long)]
    demo: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let kind = if args.demo {
        SourceKind::Demo
    } else {
        SourceKind::Cache
    };
    let source = open_source(kind, &args.cache_dir);

    info!(
        "Loading {} {} {} session from {}...",
        args.year,
        args.race,
        args.session.display_name(),
        source.name()
    );
    let session = source
        .load_session(args.year, &args.race, args.session, LoadOptions::all())
        .with_context(|| format!("Failed to load {} {}", args.year, args.race))?;
    info!("Session loaded successfully!");

    let output_dir = args.output_dir.unwrap_or_else(|| {
        let slug = session
            .event
            .as_ref()
            .map(|e| e.slug())
            .unwrap_or_else(|| slugify(&args.race));
        PathBuf::from(format!("f1_data_{}_{}", args.year, slug))
    });

    let report = export::export_session(&session, &output_dir)?;
    info!(
        "Exported {} files to {}",
        report.files.len(),
        report.output_dir.display()
    );
    Ok(())
}

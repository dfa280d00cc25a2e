//! Application entry point for the tech-tree viewer.
//!
//! This binary parses the command line, loads the catalog, progress and
//! layout config, and hands them to [`Viewer`]. With `--dump` it prints
//! the computed scene as JSON instead of opening a window.

mod viewer;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use std::path::PathBuf;
use techtree_core::{
    catalog::Catalog, config::Config, layout_tech_tree, oracle::ProgressSnapshot,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use viewer::Viewer;

#[derive(Debug, Parser)]
#[command(name = "techtree-view", about = "Lay out and browse an upgrade tech tree")]
struct Args {
    /// Catalog JSON (`upgrades` + `requirements`). Defaults to a built-in demo.
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Progress snapshot JSON. Defaults to nothing researched.
    #[arg(long)]
    progress: Option<PathBuf>,

    /// Layout config JSON; missing keys keep their defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Generate a random catalog with this many upgrades.
    #[arg(long, conflicts_with = "catalog")]
    random: Option<usize>,

    /// Print the scene as JSON and exit.
    #[arg(long)]
    dump: bool,
}

fn load_inputs(args: &Args) -> Result<(Catalog, ProgressSnapshot, Config)> {
    let catalog = match (&args.catalog, args.random) {
        (Some(path), _) => Catalog::from_path(path)
            .with_context(|| format!("loading catalog {}", path.display()))?,
        (None, Some(count)) => Catalog::random(count, 3, &mut rand::rng()),
        (None, None) => Catalog::demo(),
    };

    let progress = match &args.progress {
        Some(path) => ProgressSnapshot::from_path(path)
            .with_context(|| format!("loading progress {}", path.display()))?,
        None => {
            let mut progress = ProgressSnapshot::new();
            progress.derive_available(&catalog);
            progress
        }
    };

    let cfg = match &args.config {
        Some(path) => {
            Config::from_path(path).with_context(|| format!("loading config {}", path.display()))?
        }
        None => Config::default(),
    };

    Ok((catalog, progress, cfg))
}

/// Starts the native eframe application, or dumps the scene.
///
/// ### Returns
/// - `Ok(())` if the application runs to completion without errors.
/// - `Err` if an input file cannot be loaded, or eframe fails to create
///   the native window or event loop.
fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "techtree_view=info,techtree_core=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let (catalog, progress, cfg) = load_inputs(&args)?;
    tracing::info!(upgrades = catalog.upgrades.len(), "loaded catalog");

    if args.dump {
        let scene = layout_tech_tree(&catalog, &progress, &progress, &cfg);
        println!("{}", scene.to_json()?);
        return Ok(());
    }

    let options = eframe::NativeOptions::default();
    eframe::run_native(
        "Tech Tree",
        options,
        Box::new(|_cc| Ok(Box::new(Viewer::new(catalog, progress, cfg)))),
    )
    .map_err(|e| anyhow!("{e}"))
}

//! CLI command definitions and handlers

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use console::{style, Emoji};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use diagrams_preview::composer::transform_document;
use diagrams_preview::config::Config;
use diagrams_preview::document::{DocumentSource, FileDocumentSource};
use diagrams_preview::locator::DiagramBlockLocator;
use diagrams_preview::presenter::HtmlFileSurface;
use diagrams_preview::regen::{report_failure, RegenerationLoop, Trigger};
use diagrams_preview::render::ManagedLayout;
use diagrams_preview::rewriter::ArgumentRewriter;
use diagrams_preview::status::{ConsoleReporter, StatusReporter};
use diagrams_preview::watcher::SaveWatcher;

static CHECK: Emoji = Emoji("✓ ", "* ");
static INFO: Emoji = Emoji("ℹ ", "i ");

#[derive(Parser)]
#[command(name = "diagrams-preview")]
#[command(author, version, about = "Live preview for Python diagrams scripts")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path
    #[arg(long, global = true, env = "DIAGRAMS_PREVIEW_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Render the diagram and refresh it on every save until Ctrl-C
    Watch {
        /// Python script containing a `with Diagram(...)` block
        file: PathBuf,

        /// Open the preview in the default browser
        #[arg(short, long)]
        open: bool,
    },

    /// Render the diagram once
    Render {
        /// Python script containing a `with Diagram(...)` block
        file: PathBuf,

        /// Directory for the rendered files (default: a new session directory)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Print the rewritten script without running it
    Transform {
        /// Python script containing a `with Diagram(...)` block
        file: PathBuf,

        /// Output path (without extension) injected into the diagram call
        #[arg(long)]
        stem: Option<PathBuf>,
    },

    /// Manage configuration
    Config {
        /// Configuration key
        key: Option<String>,

        /// Configuration value (omit to show current)
        value: Option<String>,
    },
}

/// Resolve `path` against the current directory; the script runs elsewhere.
fn absolute(path: &Path) -> Result<PathBuf> {
    Ok(std::env::current_dir()?.join(path))
}

fn open_document(config: &Config, file: &Path) -> Result<Arc<FileDocumentSource>> {
    let source = FileDocumentSource::open(file, &config.extension)
        .with_context(|| format!("Cannot preview {}", file.display()))?;
    Ok(Arc::new(source))
}

/// Watch a document and keep its preview current
pub async fn watch_document(config: Config, file: &Path, open: bool) -> Result<()> {
    let source = open_document(&config, file)?;
    let layout = ManagedLayout::for_session(&absolute(&config.output_dir)?, &uuid::Uuid::new_v4());
    let preview_path = layout.preview_path();
    let session_dir = layout.dir().to_path_buf();

    let surface = Box::new(HtmlFileSurface::new(&preview_path, open || config.preview.open_browser));
    let reporter: Arc<dyn StatusReporter> = Arc::new(ConsoleReporter);
    let mut regen = RegenerationLoop::new(&config, source.clone(), layout, surface, reporter);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let watcher = SaveWatcher::start(source.identity(), tx.clone())
        .context("Failed to watch document for saves")?;

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = cancel_tx.send(true);
        }
    });

    info!("Session directory: {}", session_dir.display());
    println!("{} Watching {}", INFO, style(source.identity().display()).cyan());
    println!("  Preview: {}", style(preview_path.display()).dim());
    println!("  Press {} to stop", style("Ctrl-C").yellow());

    tx.send(Trigger::Initial).context("Regeneration loop is not running")?;
    let summary = regen.run(&mut rx, cancel_rx).await;

    drop(watcher);
    if let Err(e) = std::fs::remove_dir_all(&session_dir) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("Could not remove {}: {}", session_dir.display(), e);
        }
    }

    println!();
    println!(
        "{} Stopped after {} render(s), {} succeeded",
        CHECK, summary.runs, summary.succeeded
    );
    Ok(())
}

/// Render a document once
pub async fn render_document(config: Config, file: &Path, out: Option<PathBuf>) -> Result<()> {
    let source = open_document(&config, file)?;
    let layout = match out {
        Some(dir) => ManagedLayout::new(absolute(&dir)?),
        None => ManagedLayout::for_session(&absolute(&config.output_dir)?, &uuid::Uuid::new_v4()),
    };

    let surface = Box::new(HtmlFileSurface::new(layout.preview_path(), config.preview.open_browser));
    let reporter = Arc::new(ConsoleReporter);
    let mut regen = RegenerationLoop::new(&config, source, layout, surface, reporter.clone());

    // Nothing cancels a one-shot render.
    let (_cancel_tx, mut cancel) = watch::channel(false);

    reporter.info(Trigger::Initial.message());
    match regen.run_once(&mut cancel).await {
        Ok(job) => {
            println!("{} Rendered {}", CHECK, style(job.output_image_path.display()).green());
            println!("  Preview: {}", style(regen.layout().preview_path().display()).dim());
            Ok(())
        }
        Err(e) => {
            report_failure(reporter.as_ref(), &e);
            bail!("Diagram preview failed: {}", e)
        }
    }
}

/// Print the rewritten script
pub fn transform_file(config: &Config, file: &Path, stem: Option<PathBuf>) -> Result<()> {
    let source = open_document(config, file)?;
    let stem = match stem {
        Some(stem) => absolute(&stem)?,
        None => absolute(&config.output_dir)?.join("diagram"),
    };

    let snapshot = source.snapshot()?;
    let locator = DiagramBlockLocator::new(config.marker.clone());
    let rewriter = ArgumentRewriter::new(&config.redirect, stem);
    let transformed = transform_document(&snapshot, &locator, &rewriter)
        .with_context(|| format!("Cannot transform {}", file.display()))?;

    print!("{}", transformed);
    Ok(())
}

/// Manage configuration
pub fn manage_config(path: Option<&Path>, key: Option<String>, value: Option<String>) -> Result<()> {
    let mut config = Config::load(path)?;

    match (key, value) {
        (None, _) => {
            println!("{}", style("Configuration:").bold());
            println!();
            for key in Config::keys() {
                println!("  {}: {}", key, style(config.get(key)?).cyan());
            }
        }
        (Some(key), None) => {
            let value = config.get(&key)?;
            println!("{}: {}", key, style(value).cyan());
        }
        (Some(key), Some(value)) => {
            config.set(&key, &value)?;
            config.save(path)?;
            println!("{} Set {} = {}", CHECK, key, style(value).green());
        }
    }

    Ok(())
}

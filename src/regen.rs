//! Regeneration loop: one pipeline run per trigger, never two at once

use crate::composer::transform_document;
use crate::config::Config;
use crate::document::DocumentSource;
use crate::error::{PreviewError, Result};
use crate::locator::DiagramBlockLocator;
use crate::presenter::{PreviewPresenter, PreviewSurface};
use crate::render::{cancelled, CancelSignal, ManagedLayout, RenderInvoker, RenderJob};
use crate::rewriter::ArgumentRewriter;
use crate::status::StatusReporter;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, error, info, warn};

/// What started a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// The preview command itself
    Initial,
    /// The bound document was saved
    Saved,
}

impl Trigger {
    pub fn message(&self) -> &'static str {
        match self {
            Trigger::Initial => "Generating diagram preview...",
            Trigger::Saved => "Reflecting new changes to diagram preview...",
        }
    }
}

/// Counters for a finished loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopSummary {
    pub runs: usize,
    pub succeeded: usize,
}

pub struct RegenerationLoop {
    source: Arc<dyn DocumentSource>,
    layout: ManagedLayout,
    locator: DiagramBlockLocator,
    rewriter: ArgumentRewriter,
    invoker: RenderInvoker,
    presenter: PreviewPresenter,
    reporter: Arc<dyn StatusReporter>,
    debounce: Duration,
}

impl RegenerationLoop {
    pub fn new(
        config: &Config,
        source: Arc<dyn DocumentSource>,
        layout: ManagedLayout,
        surface: Box<dyn PreviewSurface>,
        reporter: Arc<dyn StatusReporter>,
    ) -> Self {
        let mut invoker = RenderInvoker::new(&config.renderer);
        if let Some(dir) = source.identity().parent() {
            invoker = invoker.with_working_dir(dir);
        }

        Self {
            locator: DiagramBlockLocator::new(config.marker.clone()),
            rewriter: ArgumentRewriter::new(&config.redirect, layout.stem()),
            invoker,
            presenter: PreviewPresenter::new(surface),
            debounce: Duration::from_millis(config.watch.debounce_ms),
            source,
            layout,
            reporter,
        }
    }

    pub fn layout(&self) -> &ManagedLayout {
        &self.layout
    }

    pub fn presenter(&self) -> &PreviewPresenter {
        &self.presenter
    }

    /// Run the pipeline once against the document's current contents.
    pub async fn run_once(&mut self, cancel: &mut CancelSignal) -> Result<RenderJob> {
        let snapshot = self.source.snapshot()?;
        let transformed = transform_document(&snapshot, &self.locator, &self.rewriter)?;
        let job = self.invoker.run(&self.layout, &transformed, cancel).await?;
        self.presenter.present(&job).await?;
        Ok(job)
    }

    /// Run once for `trigger`, reporting the outcome. Failures never escape.
    pub async fn handle(&mut self, trigger: Trigger, cancel: &mut CancelSignal) -> bool {
        self.reporter.info(trigger.message());

        match self.run_once(cancel).await {
            Ok(job) => {
                info!("Preview refreshed from {}", job.output_image_path.display());
                self.reporter.rendered(&self.layout.preview_path());
                true
            }
            Err(e) => {
                report_failure(self.reporter.as_ref(), &e);
                false
            }
        }
    }

    /// Serve triggers until the channel closes or `cancel` fires.
    ///
    /// Triggers arriving during a run wait for it; when it finishes they are
    /// collapsed into a single run.
    pub async fn run(&mut self, triggers: &mut UnboundedReceiver<Trigger>, mut cancel: CancelSignal) -> LoopSummary {
        let mut summary = LoopSummary::default();

        loop {
            // Shutdown wins over anything still queued.
            let mut trigger = tokio::select! {
                biased;
                _ = cancelled(&mut cancel) => break,
                next = triggers.recv() => match next {
                    Some(trigger) => trigger,
                    None => break,
                },
            };

            if trigger == Trigger::Saved && !self.debounce.is_zero() {
                tokio::select! {
                    biased;
                    _ = cancelled(&mut cancel) => break,
                    _ = tokio::time::sleep(self.debounce) => {}
                }
            }

            let mut skipped = 0;
            while let Ok(next) = triggers.try_recv() {
                trigger = next;
                skipped += 1;
            }
            if skipped > 0 {
                debug!("Coalesced {} queued trigger(s)", skipped);
            }
            if *cancel.borrow() {
                break;
            }

            summary.runs += 1;
            if self.handle(trigger, &mut cancel).await {
                summary.succeeded += 1;
            }
        }

        summary
    }
}

/// Show user-facing failures to the user; log the rest.
pub fn report_failure(reporter: &dyn StatusReporter, err: &PreviewError) {
    match err {
        PreviewError::Cancelled => debug!("Run cancelled"),
        // The user only sees the generic message, so keep the renderer's own output.
        PreviewError::RenderProcess { status, stderr } => {
            warn!("Renderer failed ({}): {}", status, stderr);
        }
        other if other.is_user_facing() => debug!("Preview run failed: {}", other),
        other => error!("Preview run failed: {}", other),
    }

    if err.is_user_facing() {
        reporter.error(&err.user_message());
    }
}

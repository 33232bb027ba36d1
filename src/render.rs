//! Managed output layout and the external renderer subprocess

use crate::composer::TransformedSource;
use crate::config::RendererConfig;
use crate::error::{PreviewError, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::watch;
use tracing::{debug, info};

/// Receiver side of a cancellation flag; `true` means stop.
pub type CancelSignal = watch::Receiver<bool>;

const ARTIFACT_NAME: &str = "diagram";

/// Files owned by one preview session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedLayout {
    dir: PathBuf,
}

impl ManagedLayout {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Per-session directory under `root`, so concurrent sessions never share files.
    pub fn for_session(root: &Path, session_id: &uuid::Uuid) -> Self {
        Self::new(root.join(session_id.to_string()))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Artifact path without extension, handed to the script as its output name
    pub fn stem(&self) -> PathBuf {
        self.dir.join(ARTIFACT_NAME)
    }

    pub fn source_path(&self) -> PathBuf {
        self.dir.join(format!("{}.py", ARTIFACT_NAME))
    }

    pub fn image_path(&self) -> PathBuf {
        self.dir.join(format!("{}.png", ARTIFACT_NAME))
    }

    pub fn preview_path(&self) -> PathBuf {
        self.dir.join("preview.html")
    }

    pub fn job(&self) -> RenderJob {
        RenderJob {
            source_path: self.source_path(),
            output_image_path: self.image_path(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderJob {
    pub source_path: PathBuf,
    pub output_image_path: PathBuf,
}

/// Runs the rendering toolchain against the managed source file.
pub struct RenderInvoker {
    program: String,
    args: Vec<String>,
    timeout: Option<Duration>,
    working_dir: Option<PathBuf>,
}

impl RenderInvoker {
    pub fn new(config: &RendererConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            timeout: (config.timeout_secs > 0).then(|| Duration::from_secs(config.timeout_secs)),
            working_dir: None,
        }
    }

    /// Run the renderer from `dir` so relative paths in the script resolve there
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Create the managed directory.
    pub async fn prepare(&self, layout: &ManagedLayout) -> Result<()> {
        tokio::fs::create_dir_all(layout.dir())
            .await
            .map_err(|source| PreviewError::DirectoryCreation {
                path: layout.dir().to_path_buf(),
                source,
            })
    }

    /// Overwrite the managed source and clear the previous image.
    pub async fn persist(&self, job: &RenderJob, source: &TransformedSource) -> Result<()> {
        tokio::fs::write(&job.source_path, source.as_str())
            .await
            .map_err(|source| PreviewError::Persist {
                path: job.source_path.clone(),
                source,
            })?;

        match tokio::fs::remove_file(&job.output_image_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(PreviewError::Persist {
                path: job.output_image_path.clone(),
                source,
            }),
        }
    }

    /// Spawn the renderer and wait for it, bounded by the timeout and `cancel`.
    pub async fn invoke(&self, job: &RenderJob, cancel: &mut CancelSignal) -> Result<()> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg(&job.source_path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        debug!("Running {} {:?} {}", self.program, self.args, job.source_path.display());

        let child = cmd.spawn().map_err(|e| PreviewError::RenderProcess {
            status: format!("failed to spawn {}", self.program),
            stderr: e.to_string(),
        })?;

        let wait = async {
            match self.timeout {
                Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
                    Ok(result) => result.map_err(PreviewError::from),
                    Err(_) => Err(PreviewError::Timeout(limit)),
                },
                None => child.wait_with_output().await.map_err(PreviewError::from),
            }
        };

        // Dropping `wait` drops the child, which kills it.
        let output = tokio::select! {
            biased;
            _ = cancelled(cancel) => return Err(PreviewError::Cancelled),
            output = wait => output?,
        };

        if !output.status.success() {
            return Err(PreviewError::RenderProcess {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        info!("Rendered {}", job.output_image_path.display());
        Ok(())
    }

    /// prepare, persist and invoke in order.
    pub async fn run(
        &self,
        layout: &ManagedLayout,
        source: &TransformedSource,
        cancel: &mut CancelSignal,
    ) -> Result<RenderJob> {
        let job = layout.job();
        self.prepare(layout).await?;
        self.persist(&job, source).await?;
        self.invoke(&job, cancel).await?;
        Ok(job)
    }
}

/// Resolves once `cancel` reads `true`; never resolves if the sender is gone.
pub async fn cancelled(cancel: &mut CancelSignal) {
    loop {
        if *cancel.borrow_and_update() {
            return;
        }
        if cancel.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

//! Save events for the previewed document
//!
//! Watches the document's directory with `notify` and forwards a
//! [`Trigger::Saved`] only for events that touch the bound document.

use crate::error::{PreviewError, Result};
use crate::regen::Trigger;
use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

/// Live subscription; dropping it stops the events.
pub struct SaveWatcher {
    _watcher: RecommendedWatcher,
    document: PathBuf,
}

impl SaveWatcher {
    /// Subscribe to saves of `document` (an absolute, canonical path).
    pub fn start(document: &Path, tx: UnboundedSender<Trigger>) -> Result<Self> {
        let dir = document.parent().ok_or_else(|| {
            PreviewError::Config(format!("{} has no parent directory", document.display()))
        })?;

        let target = document.to_path_buf();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if is_save_of(&event, &target) => {
                    debug!("Save detected: {:?}", event.kind);
                    let _ = tx.send(Trigger::Saved);
                }
                Ok(_) => {}
                Err(e) => warn!("Watch error: {}", e),
            },
            notify::Config::default(),
        )?;

        // Editors that save by rename replace the inode, so watch the directory.
        watcher.watch(dir, RecursiveMode::NonRecursive)?;

        Ok(Self {
            _watcher: watcher,
            document: document.to_path_buf(),
        })
    }

    pub fn document(&self) -> &Path {
        &self.document
    }
}

/// Whether `event` is a content change of `document`.
pub fn is_save_of(event: &Event, document: &Path) -> bool {
    let relevant = match event.kind {
        EventKind::Create(_) => true,
        EventKind::Modify(ModifyKind::Metadata(_)) => false,
        EventKind::Modify(_) => true,
        _ => false,
    };

    relevant && event.paths.iter().any(|p| same_file(p, document))
}

fn same_file(path: &Path, document: &Path) -> bool {
    path == document || path.canonicalize().is_ok_and(|p| p.as_path() == document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, DataChange, MetadataKind, RenameMode};
    use std::time::Duration;
    use tempfile::TempDir;

    fn event(kind: EventKind, path: &Path) -> Event {
        Event::new(kind).add_path(path.to_path_buf())
    }

    #[test]
    fn test_content_change_of_document() {
        let doc = Path::new("/work/diagram.py");
        let kind = EventKind::Modify(ModifyKind::Data(DataChange::Content));
        assert!(is_save_of(&event(kind, doc), doc));
        assert!(is_save_of(&event(EventKind::Create(CreateKind::File), doc), doc));
        assert!(is_save_of(
            &event(EventKind::Modify(ModifyKind::Name(RenameMode::To)), doc),
            doc
        ));
    }

    #[test]
    fn test_ignores_other_documents() {
        let doc = Path::new("/work/diagram.py");
        let other = Path::new("/work/notes.py");
        let kind = EventKind::Modify(ModifyKind::Data(DataChange::Content));
        assert!(!is_save_of(&event(kind, other), doc));
    }

    #[test]
    fn test_ignores_metadata_and_access() {
        let doc = Path::new("/work/diagram.py");
        let meta = EventKind::Modify(ModifyKind::Metadata(MetadataKind::AccessTime));
        assert!(!is_save_of(&event(meta, doc), doc));
        assert!(!is_save_of(&event(EventKind::Access(AccessKind::Any), doc), doc));
    }

    #[tokio::test]
    async fn test_write_to_document_triggers_save() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("diagram.py");
        std::fs::write(&path, "a = 1\n").unwrap();
        let path = path.canonicalize().unwrap();

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let watcher = SaveWatcher::start(&path, tx).unwrap();
        assert_eq!(watcher.document(), path.as_path());

        std::fs::write(temp_dir.path().join("unrelated.py"), "b = 2\n").unwrap();
        let quiet = tokio::time::timeout(Duration::from_millis(500), rx.recv()).await;
        assert!(quiet.is_err(), "unrelated file produced {:?}", quiet);

        std::fs::write(&path, "a = 2\n").unwrap();

        let got = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await;
        assert_eq!(got.unwrap(), Some(Trigger::Saved));
    }
}

//! diagrams-preview library
//!
//! Pipeline pieces, leaves first:
//! - [`locator`] splits a document around its `with Diagram(...)` line
//! - [`rewriter`] forces the diagram's output onto a managed path
//! - [`composer`] reassembles the script
//! - [`render`] writes it out and runs the renderer
//! - [`presenter`] embeds the produced image in an HTML page
//! - [`regen`] drives the pipeline once per trigger, one run at a time

pub mod composer;
pub mod config;
pub mod document;
pub mod error;
pub mod locator;
pub mod presenter;
pub mod regen;
pub mod render;
pub mod rewriter;
pub mod status;
pub mod watcher;

pub use error::{PreviewError, Result};

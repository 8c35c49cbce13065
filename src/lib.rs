//! PDF template ingestion.
//!
//! An upload is staged on disk, turned into a JPEG thumbnail and an HTML
//! rendering, and recorded in SQLite with both private (filesystem) and public
//! (URL) paths for each artifact. [`TemplateService`] is the surface a
//! transport layer calls into.

pub mod artifacts;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod storage;

pub use config::Config;
pub use db::TemplateStore;
pub use error::{AppError, ErrorKind, Result};
pub use models::{RenameRequest, TemplateRecord, TemplateResponse};
pub use services::{parse_id, IngestPipeline, TemplateService};
pub use storage::PathMapping;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWriteExt};

use crate::artifacts::{renderer_from_config, thumbnailer_from_config, HtmlRenderer, ThumbnailGenerator};
use crate::config::Config;
use crate::db::TemplateStore;
use crate::error::{AppError, ErrorKind, Result};
use crate::models::TemplateResponse;
use crate::storage::StagingArea;

use super::ingest::IngestPipeline;
use super::markup::check_markup;

/// Staged files untouched for this long belong to no running upload.
const STALE_STAGING_AGE: Duration = Duration::from_secs(6 * 60 * 60);

/// Parse the `{id}` route segment.
pub fn parse_id(raw: &str) -> Result<i64> {
    match raw.trim().parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(AppError::invalid(format!("Invalid template ID {:?}", raw))),
    }
}

/// Entry point for the transport layer.
///
/// Every method returns only public paths. Errors carry an [`ErrorKind`] that
/// maps to a response status; none of them are swallowed here.
pub struct TemplateService {
    store: TemplateStore,
    pipeline: IngestPipeline,
}

impl TemplateService {
    pub async fn open(config: &Config) -> Result<Self> {
        config.validate()?;
        let store = TemplateStore::new(&config.db_path, config.paths()).await?;
        Self::new(
            store,
            thumbnailer_from_config(config),
            renderer_from_config(config),
            config.max_upload_bytes,
        )
    }

    /// Creates the artifact directories and clears stale staged uploads.
    pub fn new(
        store: TemplateStore,
        thumbnailer: Arc<dyn ThumbnailGenerator>,
        renderer: Arc<dyn HtmlRenderer>,
        max_upload_bytes: u64,
    ) -> Result<Self> {
        let paths = store.paths().clone();
        paths.ensure_dirs()?;

        let staging = StagingArea::new(paths.staging_dir(), max_upload_bytes);
        let purged = staging.purge_leftovers(STALE_STAGING_AGE)?;
        if purged > 0 {
            tracing::info!("Removed {} stale staged upload(s)", purged);
        }

        let pipeline = IngestPipeline::new(staging, store.clone(), thumbnailer, renderer);
        Ok(Self { store, pipeline })
    }

    pub fn store(&self) -> &TemplateStore {
        &self.store
    }

    pub async fn upload<R>(&self, stream: R, filename: &str, size: u64) -> Result<TemplateResponse>
    where
        R: AsyncRead + Unpin,
    {
        let record = self
            .pipeline
            .ingest(stream, filename, size)
            .await
            .inspect_err(|e| log_failure("upload", filename, e))?;
        Ok(record.into())
    }

    pub async fn list(&self) -> Result<Vec<TemplateResponse>> {
        let records = self
            .store
            .list()
            .await
            .inspect_err(|e| log_failure("list", "templates", e))?;
        Ok(records.into_iter().map(TemplateResponse::from).collect())
    }

    pub async fn retrieve(&self, id: i64) -> Result<TemplateResponse> {
        Ok(self.store.retrieve(id).await?.into())
    }

    pub async fn rename(&self, id: i64, new_name: &str) -> Result<TemplateResponse> {
        if new_name.trim().is_empty() {
            return Err(AppError::invalid("Name field is empty"));
        }
        let record = self
            .store
            .update_name(id, new_name)
            .await
            .inspect_err(|e| log_failure("rename", &id.to_string(), e))?;
        tracing::info!("Renamed template {} to {:?}", id, record.name);
        Ok(record.into())
    }

    /// Overwrite the rendered HTML in place. The record's timestamps are not touched.
    pub async fn replace_html(&self, id: i64, body: &[u8]) -> Result<()> {
        let html = check_markup(body)?;
        let record = self.store.retrieve(id).await?;

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&record.private_html_path)
            .await
            .inspect_err(|e| {
                tracing::error!("Cannot open {:?} for template {}: {}", record.private_html_path, id, e)
            })?;
        file.write_all(html.as_bytes()).await?;
        file.flush().await?;

        tracing::info!("Replaced HTML of template {} ({} bytes)", id, html.len());
        Ok(())
    }

    /// Drop the row, then both artifact files.
    ///
    /// If a file cannot be removed the call fails with
    /// [`AppError::OrphanedArtifact`] even though the row is already gone.
    pub async fn delete(&self, id: i64) -> Result<()> {
        let record = self
            .store
            .delete(id)
            .await
            .inspect_err(|e| log_failure("delete", &id.to_string(), e))?;

        let mut remaining: Vec<PathBuf> = Vec::new();
        let mut first_error = None;
        for path in [&record.private_html_path, &record.private_thumbnail_path] {
            match tokio::fs::remove_file(path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    remaining.push(path.clone());
                    first_error.get_or_insert(e);
                }
            }
        }

        if let Some(source) = first_error {
            tracing::warn!(
                "Template {} deleted but artifacts remain: {:?} ({})",
                id,
                remaining,
                source
            );
            return Err(AppError::OrphanedArtifact {
                id,
                paths: remaining,
                source,
            });
        }

        tracing::info!("Deleted template {}", id);
        Ok(())
    }
}

fn log_failure(op: &str, subject: &str, e: &AppError) {
    if e.kind() == ErrorKind::DependencyFailure {
        tracing::error!("{} of {} failed: {}", op, subject, e);
    } else {
        tracing::debug!("{} of {} rejected: {}", op, subject, e);
    }
}

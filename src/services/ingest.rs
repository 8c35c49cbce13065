use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::io::AsyncRead;

use crate::artifacts::{HtmlRenderer, ThumbnailGenerator};
use crate::db::TemplateStore;
use crate::error::{AppError, Result};
use crate::models::{NewTemplate, TemplateRecord};
use crate::storage::{split_filename, StagedUpload, StagingArea};

const THUMBNAIL_SUFFIX: &str = "_thumbnail.jpg";

/// Stage, thumbnail, render, insert. Each step needs the previous one.
///
/// Artifacts written by this run are removed again if a later step fails.
pub struct IngestPipeline {
    staging: StagingArea,
    store: TemplateStore,
    thumbnailer: Arc<dyn ThumbnailGenerator>,
    renderer: Arc<dyn HtmlRenderer>,
    sequence: AtomicU64,
}

impl IngestPipeline {
    pub fn new(
        staging: StagingArea,
        store: TemplateStore,
        thumbnailer: Arc<dyn ThumbnailGenerator>,
        renderer: Arc<dyn HtmlRenderer>,
    ) -> Self {
        Self {
            staging,
            store,
            thumbnailer,
            renderer,
            sequence: AtomicU64::new(0),
        }
    }

    pub async fn ingest<R>(&self, upload: R, filename: &str, declared_size: u64) -> Result<TemplateRecord>
    where
        R: AsyncRead + Unpin,
    {
        let (name, ext) = split_filename(filename)?;
        let staged = self.staging.stage(upload, filename).await?;
        if staged.len() != declared_size {
            tracing::warn!(
                "Upload {} declared {} bytes but {} were received",
                filename,
                declared_size,
                staged.len()
            );
        }

        let token = self.next_token();
        let mut written = ArtifactGuard::default();

        let thumbnail_path = self.write_thumbnail(&staged, &token, &mut written).await?;
        let html_path = self.render_html(&staged, &token, &mut written).await?;

        let record = self
            .store
            .insert(NewTemplate {
                name,
                ext,
                size: staged.len(),
                private_html_path: html_path,
                private_thumbnail_path: thumbnail_path,
            })
            .await?;
        written.disarm();

        if let Err(e) = staged.close() {
            tracing::warn!("Failed to remove staged upload for template {}: {}", record.id, e);
        }
        tracing::info!("Ingested {} as template {}", filename, record.id);
        Ok(record)
    }

    fn next_token(&self) -> String {
        let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        format!("{}_{}", nanos, seq)
    }

    async fn write_thumbnail(
        &self,
        staged: &StagedUpload,
        token: &str,
        written: &mut ArtifactGuard,
    ) -> Result<PathBuf> {
        let thumbnailer = Arc::clone(&self.thumbnailer);
        let source = staged.path().to_path_buf();
        let jpeg = tokio::task::spawn_blocking(move || thumbnailer.generate(&source)).await??;

        let path = self
            .store
            .paths()
            .thumbnail_dir()
            .join(format!("{}{}", token, THUMBNAIL_SUFFIX));
        written.track(&path);
        tokio::fs::write(&path, jpeg).await?;
        Ok(path)
    }

    async fn render_html(
        &self,
        staged: &StagedUpload,
        token: &str,
        written: &mut ArtifactGuard,
    ) -> Result<PathBuf> {
        let output_dir = self.store.paths().html_dir();
        let output_name = format!("{}.html", token);
        let path = output_dir.join(&output_name);
        // Whatever the renderer leaves behind on failure goes with the guard.
        written.track(&path);

        let renderer = Arc::clone(&self.renderer);
        let input = staged.path().to_path_buf();
        let dir = output_dir.clone();
        let name = output_name.clone();
        tokio::task::spawn_blocking(move || renderer.render(&input, &dir, &name)).await??;

        if !tokio::fs::try_exists(&path).await? {
            return Err(AppError::Render {
                status: "exit status: 0".to_string(),
                stderr: format!("renderer did not produce {}", output_name),
            });
        }
        Ok(path)
    }
}

/// Removes tracked files on drop unless disarmed.
#[derive(Default)]
struct ArtifactGuard {
    paths: Vec<PathBuf>,
}

impl ArtifactGuard {
    fn track(&mut self, path: &Path) {
        self.paths.push(path.to_path_buf());
    }

    fn disarm(&mut self) {
        self.paths.clear();
    }
}

impl Drop for ArtifactGuard {
    fn drop(&mut self) {
        for path in self.paths.drain(..) {
            match std::fs::remove_file(&path) {
                Ok(()) => tracing::debug!("Removed artifact {:?} after failed ingest", path),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!("Could not remove artifact {:?}: {}", path, e),
            }
        }
    }
}

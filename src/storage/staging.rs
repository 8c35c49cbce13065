use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tempfile::NamedTempFile;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};

use crate::error::{AppError, Result};

pub const STAGING_PREFIX: &str = "tmp-uploaded-pdf-";
const ACCEPTED_EXT: &str = ".pdf";

/// Split a client filename into display name and extension.
///
/// Only the final path component is used. The extension is everything from the
/// last `.` and the comparison against `.pdf` is case-sensitive.
pub fn split_filename(filename: &str) -> Result<(String, String)> {
    let base = Path::new(filename)
        .file_name()
        .and_then(|f| f.to_str())
        .ok_or_else(|| AppError::invalid(format!("invalid filename {:?}", filename)))?;

    let (name, ext) = match base.rfind('.') {
        Some(idx) => base.split_at(idx),
        None => (base, ""),
    };

    if ext != ACCEPTED_EXT {
        return Err(AppError::invalid(format!(
            "only {} files are accepted, got {:?}",
            ACCEPTED_EXT, base
        )));
    }
    if name.trim().is_empty() {
        return Err(AppError::invalid("filename has no name before the extension"));
    }

    Ok((name.to_string(), ext.to_string()))
}

/// Transient on-disk copy of an upload.
///
/// The file is removed when this value is dropped, on every exit path.
#[derive(Debug)]
pub struct StagedUpload {
    file: NamedTempFile,
    len: u64,
}

impl StagedUpload {
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Number of bytes copied from the upload stream.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Remove the staged file now and report a failure instead of ignoring it.
    pub fn close(self) -> Result<()> {
        self.file.close()?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct StagingArea {
    root: PathBuf,
    max_bytes: u64,
}

impl StagingArea {
    pub fn new(root: impl Into<PathBuf>, max_bytes: u64) -> Self {
        Self {
            root: root.into(),
            max_bytes,
        }
    }

    /// Copy `reader` into a uniquely named file under the staging root.
    ///
    /// The extension check runs before anything touches the disk.
    pub async fn stage<R>(&self, reader: R, filename: &str) -> Result<StagedUpload>
    where
        R: AsyncRead + Unpin,
    {
        split_filename(filename)?;

        tokio::fs::create_dir_all(&self.root).await?;
        let file = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .suffix(ACCEPTED_EXT)
            .tempfile_in(&self.root)?;

        let mut dst = tokio::fs::File::from_std(file.as_file().try_clone()?);
        let mut limited = reader.take(self.max_bytes.saturating_add(1));
        let len = tokio::io::copy(&mut limited, &mut dst).await?;
        dst.flush().await?;

        if len > self.max_bytes {
            // `file` drops here and takes the partial copy with it.
            return Err(AppError::UploadTooLarge {
                limit: self.max_bytes,
            });
        }

        tracing::debug!("Staged {} ({} bytes) at {:?}", filename, len, file.path());
        Ok(StagedUpload { file, len })
    }

    /// Remove staged files not modified within `older_than`.
    ///
    /// Younger files may belong to an upload still running in another process.
    pub fn purge_leftovers(&self, older_than: Duration) -> Result<usize> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut removed = 0;
        for entry in entries.flatten() {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if !(name.starts_with(STAGING_PREFIX) && name.ends_with(ACCEPTED_EXT)) {
                continue;
            }
            let age = entry
                .metadata()
                .and_then(|m| m.modified())
                .ok()
                .and_then(|modified| SystemTime::now().duration_since(modified).ok());
            if age.is_some_and(|age| age >= older_than) {
                match std::fs::remove_file(entry.path()) {
                    Ok(()) => removed += 1,
                    Err(e) => tracing::warn!("Failed to purge {:?}: {}", entry.path(), e),
                }
            }
        }
        Ok(removed)
    }
}

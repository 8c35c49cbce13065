use std::io::Cursor;
use std::path::Path;
use std::process::{Command, Stdio};

use image::{DynamicImage, ImageFormat, ImageReader};

use crate::error::{AppError, Result};

pub trait ThumbnailGenerator: Send + Sync {
    /// Produce JPEG bytes for the document stored at `source`.
    fn generate(&self, source: &Path) -> Result<Vec<u8>>;
}

/// Renders the first page through poppler's `pdftoppm`, reading JPEG from stdout.
pub struct PdftoppmThumbnailer {
    program: String,
    max_edge: u32,
}

impl PdftoppmThumbnailer {
    pub fn new(max_edge: u32) -> Self {
        Self::with_program("pdftoppm", max_edge)
    }

    pub fn with_program(program: impl Into<String>, max_edge: u32) -> Self {
        Self {
            program: program.into(),
            max_edge,
        }
    }
}

impl ThumbnailGenerator for PdftoppmThumbnailer {
    fn generate(&self, source: &Path) -> Result<Vec<u8>> {
        let output = Command::new(&self.program)
            .args(["-jpeg", "-f", "1", "-l", "1", "-singlefile", "-scale-to"])
            .arg(self.max_edge.to_string())
            .arg(source)
            .arg("-")
            .stdin(Stdio::null())
            .output()
            .map_err(|e| AppError::Thumbnail(format!("failed to spawn {}: {}", self.program, e)))?;

        if !output.status.success() {
            return Err(AppError::Thumbnail(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        if output.stdout.is_empty() {
            return Err(AppError::Thumbnail(format!("{} produced no image", self.program)));
        }
        Ok(output.stdout)
    }
}

/// Decodes raster input in-process and re-encodes it as a bounded JPEG.
pub struct ImageThumbnailer {
    max_edge: u32,
}

impl ImageThumbnailer {
    pub fn new(max_edge: u32) -> Self {
        Self { max_edge }
    }
}

impl ThumbnailGenerator for ImageThumbnailer {
    fn generate(&self, source: &Path) -> Result<Vec<u8>> {
        let image = ImageReader::open(source)?.with_guessed_format()?.decode()?;
        let thumb = image.thumbnail(self.max_edge, self.max_edge);

        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(thumb.to_rgb8()).write_to(&mut buf, ImageFormat::Jpeg)?;
        Ok(buf.into_inner())
    }
}

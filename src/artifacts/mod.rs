//! External collaborators that turn a staged PDF into derived files.
//!
//! Both are synchronous and may block for a long time. The ingest pipeline
//! calls them from `spawn_blocking`.

mod renderer;
mod thumbnail;

use std::sync::Arc;

pub use renderer::{HtmlRenderer, Pdf2HtmlEx};
pub use thumbnail::{ImageThumbnailer, PdftoppmThumbnailer, ThumbnailGenerator};

use crate::config::{Config, ThumbnailerKind};

pub fn thumbnailer_from_config(config: &Config) -> Arc<dyn ThumbnailGenerator> {
    match config.thumbnailer {
        ThumbnailerKind::Pdftoppm => Arc::new(PdftoppmThumbnailer::new(config.thumbnail_size)),
        ThumbnailerKind::Image => Arc::new(ImageThumbnailer::new(config.thumbnail_size)),
    }
}

pub fn renderer_from_config(config: &Config) -> Arc<dyn HtmlRenderer> {
    Arc::new(Pdf2HtmlEx::from_config(&config.renderer))
}

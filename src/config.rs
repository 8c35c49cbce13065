use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};
use crate::storage::PathMapping;

const APP_DIR: &str = "invoice-templates";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Private storage root. Staged uploads live directly inside it.
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,

    /// URL root that replaces `static_dir` in public paths.
    #[serde(default = "default_public_prefix")]
    pub public_prefix: String,

    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,

    #[serde(default)]
    pub renderer: RendererConfig,

    #[serde(default)]
    pub thumbnailer: ThumbnailerKind,

    #[serde(default = "default_thumbnail_size")]
    pub thumbnail_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RendererConfig {
    #[serde(default = "default_renderer_program")]
    pub program: String,

    /// Arguments placed before the renderer's own flags, e.g. a `docker run` prefix.
    #[serde(default)]
    pub wrapper_args: Vec<String>,

    #[serde(default = "default_renderer_args")]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThumbnailerKind {
    #[default]
    Pdftoppm,
    Image,
}

fn default_db_path() -> String {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR);
    std::fs::create_dir_all(&data_dir).ok();
    data_dir.join("templates.db").to_string_lossy().to_string()
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("static")
}

fn default_public_prefix() -> String {
    "/static".to_string()
}

fn default_max_upload_bytes() -> u64 {
    10 << 20
}

fn default_thumbnail_size() -> u32 {
    512
}

fn default_renderer_program() -> String {
    "pdf2htmlEX".to_string()
}

fn default_renderer_args() -> Vec<String> {
    [
        "--zoom",
        "1.8",
        "--embed",
        "CFIJO",
        "--process-outline",
        "0",
        "--optimize-text",
        "1",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            program: default_renderer_program(),
            wrapper_args: Vec::new(),
            args: default_renderer_args(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            static_dir: default_static_dir(),
            public_prefix: default_public_prefix(),
            max_upload_bytes: default_max_upload_bytes(),
            renderer: RendererConfig::default(),
            thumbnailer: ThumbnailerKind::default(),
            thumbnail_size: default_thumbnail_size(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Read `path`, writing a default config there first if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join("config.toml")
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_upload_bytes == 0 {
            return Err(AppError::Config("max_upload_bytes must be positive".into()));
        }
        if self.renderer.program.trim().is_empty() {
            return Err(AppError::Config("renderer.program is empty".into()));
        }
        if !self.public_prefix.starts_with('/') {
            return Err(AppError::Config(format!(
                "public_prefix {:?} must start with '/'",
                self.public_prefix
            )));
        }
        Ok(())
    }

    pub fn paths(&self) -> PathMapping {
        PathMapping::new(&self.static_dir, &self.public_prefix)
    }
}

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One ingested document and the private/public locations of its two artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateRecord {
    pub id: i64,
    pub name: String,
    pub ext: String,
    pub size: u64,
    pub private_html_path: PathBuf,
    pub public_html_path: String,
    pub private_thumbnail_path: PathBuf,
    pub public_thumbnail_path: String,
    /// Unix seconds.
    pub created_at: i64,
    pub updated_at: i64,
}

/// Fields the pipeline knows before the store assigns identity.
#[derive(Debug, Clone)]
pub struct NewTemplate {
    pub name: String,
    pub ext: String,
    pub size: u64,
    pub private_html_path: PathBuf,
    pub private_thumbnail_path: PathBuf,
}

/// Wire shape returned to clients. Only public paths leave the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateResponse {
    pub id: i64,
    pub name: String,
    pub ext: String,
    pub size: u64,
    pub path: String,
    pub thumbnail: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenameRequest {
    #[serde(default)]
    pub name: String,
}

impl From<TemplateRecord> for TemplateResponse {
    fn from(record: TemplateRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            ext: record.ext,
            size: record.size,
            path: record.public_html_path,
            thumbnail: record.public_thumbnail_path,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

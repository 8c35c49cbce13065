use std::path::{Path, PathBuf};

use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};
use tokio_rusqlite::Connection;

use crate::error::{AppError, Result};
use crate::models::{NewTemplate, TemplateRecord};
use crate::storage::PathMapping;

use super::schema::SCHEMA;

const COLUMNS: &str = "template_id, template_name, template_ext, template_size, \
    template_private_path, template_public_path, \
    template_private_thumbnail_path, template_public_thumbnail_path, \
    template_created_at, template_updated_at";

/// Metadata store for ingested templates.
///
/// Clones share one background SQLite connection; statements from concurrent
/// callers are serialized by it.
#[derive(Clone)]
pub struct TemplateStore {
    conn: Connection,
    paths: PathMapping,
}

impl TemplateStore {
    pub async fn new(db_path: &str, paths: PathMapping) -> Result<Self> {
        let conn = Connection::open(db_path).await?;
        Self::init(conn, paths).await
    }

    pub async fn open_in_memory(paths: PathMapping) -> Result<Self> {
        let conn = Connection::open_in_memory().await?;
        Self::init(conn, paths).await
    }

    async fn init(conn: Connection, paths: PathMapping) -> Result<Self> {
        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn, paths })
    }

    pub fn paths(&self) -> &PathMapping {
        &self.paths
    }

    pub async fn insert(&self, template: NewTemplate) -> Result<TemplateRecord> {
        let public_html = self.paths.public_path(&template.private_html_path)?;
        let public_thumbnail = self.paths.public_path(&template.private_thumbnail_path)?;
        let size = i64::try_from(template.size)
            .map_err(|_| AppError::invalid(format!("size {} is too large", template.size)))?;
        let private_html = path_to_text(&template.private_html_path);
        let private_thumbnail = path_to_text(&template.private_thumbnail_path);
        let now = Utc::now().timestamp();

        let record = self
            .conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT INTO templates (
                           template_name, template_ext, template_size,
                           template_private_path, template_public_path,
                           template_private_thumbnail_path, template_public_thumbnail_path,
                           template_created_at, template_updated_at)
                       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)"#,
                    params![
                        template.name,
                        template.ext,
                        size,
                        private_html,
                        public_html,
                        private_thumbnail,
                        public_thumbnail,
                        now,
                    ],
                )?;
                let id = conn.last_insert_rowid();
                let record = conn.query_row(
                    &format!("SELECT {COLUMNS} FROM templates WHERE template_id = ?1"),
                    params![id],
                    template_from_row,
                )?;
                Ok(record)
            })
            .await?;
        Ok(record)
    }

    pub async fn retrieve(&self, id: i64) -> Result<TemplateRecord> {
        let record = self
            .conn
            .call(move |conn| {
                let record = conn
                    .query_row(
                        &format!("SELECT {COLUMNS} FROM templates WHERE template_id = ?1"),
                        params![id],
                        template_from_row,
                    )
                    .optional()?;
                Ok(record)
            })
            .await?;
        record.ok_or(AppError::NotFound(id))
    }

    /// All records, oldest first.
    pub async fn list(&self) -> Result<Vec<TemplateRecord>> {
        let records = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {COLUMNS} FROM templates \
                     ORDER BY template_created_at ASC, template_id ASC"
                ))?;
                let records = stmt
                    .query_map([], template_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(records)
            })
            .await?;
        Ok(records)
    }

    pub async fn update_name(&self, id: i64, new_name: &str) -> Result<TemplateRecord> {
        if new_name.trim().is_empty() {
            return Err(AppError::invalid("name must not be empty"));
        }
        let new_name = new_name.to_string();
        let now = Utc::now().timestamp();

        let record = self
            .conn
            .call(move |conn| {
                let changed = conn.execute(
                    "UPDATE templates SET template_name = ?1, template_updated_at = ?2 WHERE template_id = ?3",
                    params![new_name, now, id],
                )?;
                if changed == 0 {
                    return Ok(None);
                }
                let record = conn.query_row(
                    &format!("SELECT {COLUMNS} FROM templates WHERE template_id = ?1"),
                    params![id],
                    template_from_row,
                )?;
                Ok(Some(record))
            })
            .await?;
        record.ok_or(AppError::NotFound(id))
    }

    /// Remove the row and hand back what it held. Files are left for the caller.
    pub async fn delete(&self, id: i64) -> Result<TemplateRecord> {
        let record = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let record = tx
                    .query_row(
                        &format!("SELECT {COLUMNS} FROM templates WHERE template_id = ?1"),
                        params![id],
                        template_from_row,
                    )
                    .optional()?;
                if record.is_some() {
                    tx.execute("DELETE FROM templates WHERE template_id = ?1", params![id])?;
                }
                tx.commit()?;
                Ok(record)
            })
            .await?;
        record.ok_or(AppError::NotFound(id))
    }
}

fn path_to_text(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

fn template_from_row(row: &Row) -> rusqlite::Result<TemplateRecord> {
    let size: i64 = row.get(3)?;
    Ok(TemplateRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        ext: row.get(2)?,
        size: u64::try_from(size).unwrap_or_default(),
        private_html_path: PathBuf::from(row.get::<_, String>(4)?),
        public_html_path: row.get(5)?,
        private_thumbnail_path: PathBuf::from(row.get::<_, String>(6)?),
        public_thumbnail_path: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

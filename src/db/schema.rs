pub const SCHEMA: &str = r#"
-- templates table
CREATE TABLE IF NOT EXISTS templates (
    template_id INTEGER PRIMARY KEY AUTOINCREMENT,
    template_name TEXT NOT NULL,
    template_ext VARCHAR(10) NOT NULL,
    template_size INTEGER NOT NULL,
    template_private_path TEXT NOT NULL,
    template_public_path TEXT NOT NULL,
    template_private_thumbnail_path TEXT NOT NULL,
    template_public_thumbnail_path TEXT NOT NULL,
    template_created_at INTEGER NOT NULL,
    template_updated_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_templates_created_at ON templates(template_created_at);
"#;

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tempfile::TempDir;
use tokio_test::{assert_err, assert_ok};

use invoice_templates::artifacts::{HtmlRenderer, ThumbnailGenerator};
use invoice_templates::{AppError, ErrorKind, PathMapping, TemplateService, TemplateStore};

struct StubThumbnail;

impl ThumbnailGenerator for StubThumbnail {
    fn generate(&self, _source: &Path) -> invoice_templates::Result<Vec<u8>> {
        Ok(vec![0xFF, 0xD8, 0xFF, 0xE0, 0xFF, 0xD9])
    }
}

struct StubRenderer;

impl HtmlRenderer for StubRenderer {
    fn render(&self, input: &Path, output_dir: &Path, output_name: &str) -> invoice_templates::Result<()> {
        let len = std::fs::metadata(input)?.len();
        std::fs::write(
            output_dir.join(output_name),
            format!("<html><body><p>{len} bytes</p></body></html>"),
        )?;
        Ok(())
    }
}

struct Harness {
    root: TempDir,
    service: TemplateService,
}

impl Harness {
    async fn new() -> Self {
        let root = TempDir::new().unwrap();
        let paths = PathMapping::new(root.path().join("static"), "/static");
        let store = TemplateStore::open_in_memory(paths).await.unwrap();
        let service =
            TemplateService::new(store, Arc::new(StubThumbnail), Arc::new(StubRenderer), 10 << 20)
                .unwrap();
        Self { root, service }
    }

    fn static_dir(&self) -> std::path::PathBuf {
        self.root.path().join("static")
    }

    fn files_in(&self, sub: &str) -> usize {
        std::fs::read_dir(self.static_dir().join(sub)).unwrap().count()
    }

    async fn upload(&self, name: &str, len: usize) -> invoice_templates::TemplateResponse {
        let body = vec![b'x'; len];
        self.service
            .upload(&body[..], name, len as u64)
            .await
            .unwrap()
    }
}

#[tokio::test]
async fn upload_invoice_end_to_end() {
    let h = Harness::new().await;

    let template = h.upload("invoice.pdf", 2048).await;

    assert!(template.id > 0);
    assert_eq!(template.name, "invoice");
    assert_eq!(template.ext, ".pdf");
    assert_eq!(template.size, 2048);
    assert!(template.path.starts_with("/static/templates/"));
    assert!(template.thumbnail.starts_with("/static/thumbnails/"));
    assert_eq!(template.created_at, template.updated_at);

    let json = serde_json::to_value(&template).unwrap();
    for key in ["id", "name", "ext", "size", "path", "thumbnail", "createdAt", "updatedAt"] {
        assert!(json.get(key).is_some(), "missing {key}");
    }
}

#[tokio::test]
async fn public_paths_derive_from_private_paths() {
    let h = Harness::new().await;
    let template = h.upload("invoice.pdf", 64).await;

    let record = h.service.store().retrieve(template.id).await.unwrap();
    let paths = h.service.store().paths();

    assert_eq!(paths.public_path(&record.private_html_path).unwrap(), template.path);
    assert_eq!(
        paths.public_path(&record.private_thumbnail_path).unwrap(),
        template.thumbnail
    );
    assert!(record.private_html_path.exists());
    assert!(record.private_thumbnail_path.exists());

    let listed = h.service.list().await.unwrap();
    assert_eq!(listed, vec![template]);
}

#[tokio::test]
async fn non_pdf_upload_persists_nothing() {
    let h = Harness::new().await;

    for name in ["invoice.png", "invoice.PDF", "invoice"] {
        let err = h.service.upload(&b"data"[..], name, 4).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput, "{name}");
    }

    assert!(h.service.list().await.unwrap().is_empty());
    assert_eq!(h.files_in("templates"), 0);
    assert_eq!(h.files_in("thumbnails"), 0);
}

#[tokio::test]
async fn oversized_upload_is_rejected() {
    let root = TempDir::new().unwrap();
    let paths = PathMapping::new(root.path(), "/static");
    let store = TemplateStore::open_in_memory(paths).await.unwrap();
    let service = TemplateService::new(store, Arc::new(StubThumbnail), Arc::new(StubRenderer), 8).unwrap();

    let err = service.upload(&[0u8; 9][..], "big.pdf", 9).await.unwrap_err();

    assert!(matches!(err, AppError::UploadTooLarge { limit: 8 }));
    assert_eq!(err.status_code(), 413);
    assert!(service.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn rename_validates_and_is_idempotent() {
    let h = Harness::new().await;
    let template = h.upload("draft.pdf", 16).await;

    let err = assert_err!(h.service.rename(template.id, "").await);
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    let once = assert_ok!(h.service.rename(template.id, "x").await);
    let twice = assert_ok!(h.service.rename(template.id, "x").await);

    assert_eq!(once.name, "x");
    assert!(once.updated_at >= template.updated_at);
    assert_eq!(twice.name, "x");
    assert_eq!(twice.path, template.path);
    assert_eq!(twice.created_at, template.created_at);

    let err = h.service.rename(template.id + 1000, "x").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn list_returns_oldest_first() {
    let h = Harness::new().await;
    let a = h.upload("a.pdf", 1).await;
    let b = h.upload("b.pdf", 1).await;

    let names: Vec<String> = h.service.list().await.unwrap().into_iter().map(|t| t.name).collect();

    assert_eq!(names, vec![a.name, b.name]);
}

#[tokio::test]
async fn replace_html_overwrites_artifact_without_touching_metadata() {
    let h = Harness::new().await;
    let template = h.upload("invoice.pdf", 32).await;
    let record = h.service.store().retrieve(template.id).await.unwrap();

    let html = "<html><body>ok</body></html>";
    assert_ok!(h.service.replace_html(template.id, html.as_bytes()).await);

    assert_eq!(std::fs::read_to_string(&record.private_html_path).unwrap(), html);
    assert_eq!(h.service.retrieve(template.id).await.unwrap(), template);
}

#[tokio::test]
async fn replace_html_lenient_parser_accepts_unclosed_tag() {
    let h = Harness::new().await;
    let template = h.upload("invoice.pdf", 32).await;
    let record = h.service.store().retrieve(template.id).await.unwrap();

    assert_ok!(h.service.replace_html(template.id, b"<not closed").await);

    assert_eq!(
        std::fs::read_to_string(&record.private_html_path).unwrap(),
        "<not closed"
    );
}

#[tokio::test]
async fn replace_html_accepts_deeply_nested_markup() {
    let h = Harness::new().await;
    let template = h.upload("invoice.pdf", 32).await;
    let html = format!("<html><body>{}total{}</body></html>", "<ul><li>".repeat(60), "</li></ul>".repeat(60));

    assert_ok!(h.service.replace_html(template.id, html.as_bytes()).await);
}

#[tokio::test]
async fn replace_html_rejects_non_markup_and_leaves_file_alone() {
    let h = Harness::new().await;
    let template = h.upload("invoice.pdf", 32).await;
    let record = h.service.store().retrieve(template.id).await.unwrap();
    let before = std::fs::read_to_string(&record.private_html_path).unwrap();

    let err = h.service.replace_html(template.id, b"plain words").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    let err = h.service.replace_html(template.id, &[0xC3, 0x28]).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    assert_eq!(std::fs::read_to_string(&record.private_html_path).unwrap(), before);
}

#[tokio::test]
async fn replace_html_unknown_id_is_not_found() {
    let h = Harness::new().await;
    let err = h.service.replace_html(99, b"<html></html>").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn delete_removes_row_and_artifacts() {
    let h = Harness::new().await;
    let template = h.upload("invoice.pdf", 32).await;

    assert_ok!(h.service.delete(template.id).await);

    let err = h.service.retrieve(template.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(h.files_in("templates"), 0);
    assert_eq!(h.files_in("thumbnails"), 0);

    let err = h.service.delete(template.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn delete_surfaces_orphaned_artifacts() {
    let h = Harness::new().await;
    let template = h.upload("invoice.pdf", 32).await;
    let record = h.service.store().retrieve(template.id).await.unwrap();

    // A non-empty directory where the HTML file was cannot be removed as a file.
    std::fs::remove_file(&record.private_html_path).unwrap();
    std::fs::create_dir(&record.private_html_path).unwrap();
    std::fs::write(record.private_html_path.join("keep"), b"x").unwrap();

    let err = h.service.delete(template.id).await.unwrap_err();

    match &err {
        AppError::OrphanedArtifact { id, paths, .. } => {
            assert_eq!(*id, template.id);
            assert_eq!(paths, &vec![record.private_html_path.clone()]);
        }
        other => panic!("expected orphaned artifact, got {other}"),
    }
    assert_eq!(err.kind(), ErrorKind::OrphanedArtifact);
    assert!(!record.private_thumbnail_path.exists());
    assert_eq!(
        h.service.retrieve(template.id).await.unwrap_err().kind(),
        ErrorKind::NotFound
    );
}

#[tokio::test]
async fn only_stale_staged_uploads_are_purged_on_start() {
    let root = TempDir::new().unwrap();
    let crashed = root.path().join("tmp-uploaded-pdf-crashed.pdf");
    let running = root.path().join("tmp-uploaded-pdf-running.pdf");
    std::fs::write(&crashed, b"%PDF").unwrap();
    std::fs::write(&running, b"%PDF").unwrap();
    std::fs::File::options()
        .write(true)
        .open(&crashed)
        .unwrap()
        .set_modified(SystemTime::now() - Duration::from_secs(2 * 24 * 60 * 60))
        .unwrap();
    let paths = PathMapping::new(root.path(), "/static");
    let store = TemplateStore::open_in_memory(paths).await.unwrap();

    let _service =
        TemplateService::new(store, Arc::new(StubThumbnail), Arc::new(StubRenderer), 1024).unwrap();

    assert!(!crashed.exists());
    assert!(running.exists());
    assert!(root.path().join("templates").is_dir());
    assert!(root.path().join("thumbnails").is_dir());
}

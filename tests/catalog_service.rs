use book_catalog::{
    models::book::BookDraft,
    services::catalog_service::{CatalogError, CatalogService},
};
use bytes::Bytes;
use futures::stream;
use sqlx::sqlite::SqlitePoolOptions;
use std::{io, path::Path, sync::Arc};
use tempfile::TempDir;

async fn test_service(dir: &Path) -> CatalogService {
    let db_path = dir.join("catalog.db");
    std::fs::File::create(&db_path).expect("touch db file");
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&format!("sqlite://{}", db_path.display()))
        .await
        .expect("connect");
    let service = CatalogService::new(Arc::new(pool), dir.join("uploads"));
    service.ensure_schema().await.expect("schema");
    service
}

fn bytes_stream(data: &'static [u8]) -> impl futures::Stream<Item = io::Result<Bytes>> + Send {
    stream::iter(vec![Ok(Bytes::from_static(data))])
}

fn draft(title: &str) -> BookDraft {
    BookDraft {
        title: title.to_string(),
        ..BookDraft::default()
    }
}

/// Names of the regular (non-temporary) files in the upload area.
fn promoted_files(service: &CatalogService) -> Vec<String> {
    match std::fs::read_dir(&service.upload_dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|name| !name.starts_with(".tmp-"))
            .collect(),
        Err(_) => Vec::new(),
    }
}

fn temp_files(service: &CatalogService) -> Vec<String> {
    match std::fs::read_dir(&service.upload_dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with(".tmp-"))
            .collect(),
        Err(_) => Vec::new(),
    }
}

#[tokio::test]
async fn ids_are_unique_and_strictly_increasing() {
    let dir = TempDir::new().expect("tmp");
    let service = test_service(dir.path()).await;

    let mut ids = Vec::new();
    for title in ["Cálculo", "Atlas", "Gramática", "Biologia", "Química"] {
        let record = service
            .create_book(draft(title), None)
            .await
            .expect("create");
        ids.push(record.id);
    }

    for pair in ids.windows(2) {
        assert!(pair[0] < pair[1], "ids not strictly increasing: {ids:?}");
    }
}

#[tokio::test]
async fn schema_setup_is_idempotent_and_keeps_data() {
    let dir = TempDir::new().expect("tmp");
    let service = test_service(dir.path()).await;

    service.create_book(draft("Atlas"), None).await.expect("create");
    service.ensure_schema().await.expect("second run");

    let books = service.list_books().await.expect("list");
    assert_eq!(books.len(), 1);
    assert_eq!(books[0].title, "Atlas");
}

#[tokio::test]
async fn blank_title_fails_and_discards_the_staged_image() {
    let dir = TempDir::new().expect("tmp");
    let service = test_service(dir.path()).await;

    let staged = service
        .stage_image("capa.jpg", bytes_stream(b"fake image"))
        .await
        .expect("stage");

    let err = service
        .create_book(draft("   "), Some(staged))
        .await
        .expect_err("blank title must fail");
    assert!(matches!(err, CatalogError::TitleMissing));

    assert!(promoted_files(&service).is_empty());
    assert!(temp_files(&service).is_empty());
    assert!(service.list_books().await.expect("list").is_empty());
}

#[tokio::test]
async fn hostile_file_names_are_rejected_before_staging() {
    let dir = TempDir::new().expect("tmp");
    let service = test_service(dir.path()).await;

    for name in ["../../etc/passwd", "a/b.jpg", "", "nul\0byte.jpg"] {
        let err = service
            .stage_image(name, bytes_stream(b"x"))
            .await
            .expect_err("must reject");
        assert!(matches!(err, CatalogError::InvalidImageName), "name {name:?}");
    }

    assert!(temp_files(&service).is_empty());
}

#[tokio::test]
async fn failed_body_stream_leaves_no_temp_file_behind() {
    let dir = TempDir::new().expect("tmp");
    let service = test_service(dir.path()).await;

    let broken = stream::iter(vec![
        Ok(Bytes::from_static(b"first chunk")),
        Err(io::Error::other("connection reset")),
    ]);
    let err = service
        .stage_image("capa.jpg", broken)
        .await
        .expect_err("broken stream must fail");
    assert!(matches!(err, CatalogError::Io(_)));

    assert!(temp_files(&service).is_empty());
    assert!(promoted_files(&service).is_empty());
}

#[tokio::test]
async fn image_survives_a_failed_insert() {
    let dir = TempDir::new().expect("tmp");
    let service = test_service(dir.path()).await;

    let staged = service
        .stage_image("capa.jpg", bytes_stream(b"fake image"))
        .await
        .expect("stage");

    sqlx::query("DROP TABLE books")
        .execute(&*service.db)
        .await
        .expect("drop");

    let err = service
        .create_book(draft("Cálculo"), Some(staged))
        .await
        .expect_err("insert must fail without the table");
    assert!(matches!(err, CatalogError::Sqlx(_)));

    // Promotion happens before the insert, so the file stays on disk.
    let promoted = promoted_files(&service);
    assert_eq!(promoted.len(), 1);
    assert!(promoted[0].ends_with("-capa.jpg"));
    assert!(temp_files(&service).is_empty());
}

#[tokio::test]
async fn stored_image_opens_with_its_exact_size() {
    let dir = TempDir::new().expect("tmp");
    let service = test_service(dir.path()).await;

    let staged = service
        .stage_image("capa.png", bytes_stream(b"0123456789"))
        .await
        .expect("stage");
    let record = service
        .create_book(draft("Atlas"), Some(staged))
        .await
        .expect("create");

    let image = record.image.expect("image path");
    let file_name = image.rsplit('/').next().expect("file name");
    let (_, size) = service.open_image(file_name).await.expect("open");
    assert_eq!(size, 10);
}

#[tokio::test]
async fn listing_returns_every_stored_row() {
    let dir = TempDir::new().expect("tmp");
    let service = test_service(dir.path()).await;

    for title in ["primeiro", "segundo", "terceiro"] {
        service.create_book(draft(title), None).await.expect("create");
    }

    let mut titles: Vec<String> = service
        .list_books()
        .await
        .expect("list")
        .into_iter()
        .map(|b| b.title)
        .collect();
    titles.sort();
    assert_eq!(titles, ["primeiro", "segundo", "terceiro"]);
}

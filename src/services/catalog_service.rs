//! src/services/catalog_service.rs
//!
//! CatalogService — book catalog operations backed by SQLite for the rows
//! and local disk for uploaded cover images. This file intentionally keeps
//! the two resources independent: an image write followed by a row insert,
//! with no transaction spanning both. A failed insert can therefore leave
//! an already-written image behind; nothing cleans such orphans up.

use crate::models::book::{BookDraft, BookRecord};
use bytes::Bytes;
use chrono::Utc;
use futures::{Stream, StreamExt, pin_mut};
use sqlx::SqlitePool;
use std::{
    io,
    path::PathBuf,
    sync::Arc,
};
use thiserror::Error;
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("a non-empty title is required")]
    TitleMissing,
    #[error("invalid image file name")]
    InvalidImageName,
    #[error("image `{0}` not found")]
    ImageNotFound(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Public path prefix under which stored images are served back. The
/// values recorded in `BookRecord::image` start with this prefix and the
/// router must keep serving it.
pub const UPLOADS_PREFIX: &str = "/uploads";

/// Upload file names are `<millis>-<original>`; cap the original so the
/// combined name stays within common filesystem limits.
const MAX_IMAGE_NAME_LEN: usize = 200;

const SCHEMA_SQL: &str = include_str!("../../migrations/0001_init.sql");

/// An uploaded image written to a temp file inside the upload area but not
/// yet part of the catalog. A successful `create_book` promotes it to its
/// final name; any other outcome should `discard` it.
#[derive(Debug)]
pub struct StagedImage {
    tmp_path: PathBuf,
    original_name: String,
}

impl StagedImage {
    /// Best-effort removal of the staged temp file.
    pub async fn discard(self) {
        let _ = fs::remove_file(&self.tmp_path).await;
    }
}

/// CatalogService provides the whole catalog surface:
/// - Create a book (optionally promoting a staged image, then one atomic
///   row insert)
/// - List every book
/// - Stage an incoming image upload (streamed to disk, fsynced)
/// - Open a stored image for streaming back out
///
/// The struct is cheap to clone and is carried as axum router state.
#[derive(Clone)]
pub struct CatalogService {
    /// Shared SQLite connection pool holding the `books` table.
    pub db: Arc<SqlitePool>,

    /// Directory on disk where uploaded images live, flat, named
    /// `<millis>-<original file name>`.
    pub upload_dir: PathBuf,
}

impl CatalogService {
    /// Create a new CatalogService backed by the provided SQLite pool and
    /// using `upload_dir` as the image area.
    pub fn new(db: Arc<SqlitePool>, upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            db,
            upload_dir: upload_dir.into(),
        }
    }

    /// Apply the embedded schema, statement by statement.
    ///
    /// Comment lines are stripped before the split on `;`, so punctuation
    /// inside a comment never cuts a statement. Every statement is
    /// idempotent; this runs on each process start and only fails when
    /// the store itself is unreachable.
    pub async fn ensure_schema(&self) -> CatalogResult<()> {
        for stmt in schema_statements(SCHEMA_SQL) {
            debug!("applying schema statement: {}", stmt);
            sqlx::query(&stmt).execute(&*self.db).await?;
        }
        Ok(())
    }

    /// Basic file name validation to avoid trivial path traversal vectors.
    ///
    /// Rejects empty or oversized names and names containing separators,
    /// `..`, or control bytes. Upload clients send plain names like
    /// `book.jpg`; anything else is declined.
    fn ensure_filename_safe(&self, name: &str) -> CatalogResult<()> {
        if name.is_empty() || name.len() > MAX_IMAGE_NAME_LEN {
            return Err(CatalogError::InvalidImageName);
        }
        if name.contains('/') || name.contains("..") {
            return Err(CatalogError::InvalidImageName);
        }
        if name
            .bytes()
            .any(|b| b.is_ascii_control() || b == b'\\' || b == b'\0')
        {
            return Err(CatalogError::InvalidImageName);
        }
        Ok(())
    }

    /// Stream an incoming upload into a temp file in the image area.
    ///
    /// - Creates the area on first use.
    /// - Writes chunks incrementally, never buffering the whole body.
    /// - Fsyncs before returning so a later rename is durable.
    /// - Removes the temp file on any write error.
    ///
    /// The staged file is invisible to the catalog until `create_book`
    /// promotes it.
    pub async fn stage_image<S>(&self, original_name: &str, stream: S) -> CatalogResult<StagedImage>
    where
        S: Stream<Item = io::Result<Bytes>> + Send,
    {
        self.ensure_filename_safe(original_name)?;
        fs::create_dir_all(&self.upload_dir).await?;

        let tmp_path = self.upload_dir.join(format!(".tmp-{}", Uuid::new_v4()));
        let mut file = File::create(&tmp_path).await?;

        let mut size_bytes: u64 = 0;
        pin_mut!(stream);
        while let Some(chunk_res) = stream.next().await {
            let chunk = match chunk_res {
                Ok(chunk) => chunk,
                Err(err) => {
                    let _ = fs::remove_file(&tmp_path).await;
                    return Err(CatalogError::Io(err));
                }
            };
            size_bytes += chunk.len() as u64;
            if let Err(err) = file.write_all(&chunk).await {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(CatalogError::Io(err));
            }
        }
        if let Err(err) = file.flush().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(CatalogError::Io(err));
        }
        if let Err(err) = file.sync_all().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(CatalogError::Io(err));
        }

        debug!(
            "staged upload `{}` ({} bytes) at {}",
            original_name,
            size_bytes,
            tmp_path.display()
        );

        Ok(StagedImage {
            tmp_path,
            original_name: original_name.to_string(),
        })
    }

    /// Move a staged image to its final `<millis>-<original>` name and
    /// return the public path reference to record on the row.
    ///
    /// The millisecond timestamp plus the original name keeps generated
    /// names unique in practice; collisions are not engineered to zero.
    async fn promote_image(&self, staged: StagedImage) -> CatalogResult<String> {
        let final_name = format!(
            "{}-{}",
            Utc::now().timestamp_millis(),
            staged.original_name
        );
        let final_path = self.upload_dir.join(&final_name);

        if let Err(err) = fs::rename(&staged.tmp_path, &final_path).await {
            let _ = fs::remove_file(&staged.tmp_path).await;
            return Err(CatalogError::Io(err));
        }
        debug!("stored image {}", final_path.display());

        Ok(format!("{}/{}", UPLOADS_PREFIX, final_name))
    }

    /// Insert a new book, promoting `image` first when one was staged.
    ///
    /// The title is the only hard requirement: an empty one discards the
    /// staged image and declines the write with no visible side effect.
    /// The row insert itself is a single atomic statement, so readers see
    /// either the whole record or nothing. If the insert fails after the
    /// image was promoted, the image file stays on disk.
    pub async fn create_book(
        &self,
        draft: BookDraft,
        image: Option<StagedImage>,
    ) -> CatalogResult<BookRecord> {
        if draft.title.trim().is_empty() {
            if let Some(staged) = image {
                staged.discard().await;
            }
            return Err(CatalogError::TitleMissing);
        }

        let image_path = match image {
            Some(staged) => Some(self.promote_image(staged).await?),
            None => None,
        };

        let book = sqlx::query_as::<_, BookRecord>(
            r#"
            INSERT INTO books (title, subject, condition, distance, image, latitude, longitude)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING id, title, subject, condition, distance, image, latitude, longitude
            "#,
        )
        .bind(&draft.title)
        .bind(&draft.subject)
        .bind(&draft.condition)
        .bind(draft.distance)
        .bind(&image_path)
        .bind(draft.latitude)
        .bind(draft.longitude)
        .fetch_one(&*self.db)
        .await?;

        debug!("created book {} (`{}`)", book.id, book.title);
        Ok(book)
    }

    /// Every stored book, in whatever order the store returns them.
    ///
    /// Callers must not rely on the order; clients re-rank locally anyway.
    /// An empty catalog yields an empty vec, not an error.
    pub async fn list_books(&self) -> CatalogResult<Vec<BookRecord>> {
        let books = sqlx::query_as::<_, BookRecord>(
            "SELECT id, title, subject, condition, distance, image, latitude, longitude
             FROM books",
        )
        .fetch_all(&*self.db)
        .await?;
        Ok(books)
    }

    /// Open a stored image for streaming out, together with its size.
    ///
    /// Validates the name first, then maps a missing file to
    /// `ImageNotFound` so the handler can answer 404.
    pub async fn open_image(&self, file_name: &str) -> CatalogResult<(File, u64)> {
        self.ensure_filename_safe(file_name)?;
        let path = self.upload_dir.join(file_name);
        let file = File::open(&path).await.map_err(|err| {
            if err.kind() == io::ErrorKind::NotFound {
                CatalogError::ImageNotFound(file_name.to_string())
            } else {
                CatalogError::Io(err)
            }
        })?;
        let size_bytes = file.metadata().await?.len();
        Ok((file, size_bytes))
    }
}

/// Split a schema file into executable statements: drop `--` comment
/// lines, then split on `;`.
fn schema_statements(sql: &str) -> Vec<String> {
    let without_comments = sql
        .lines()
        .filter(|line| !line.trim_start().starts_with("--"))
        .collect::<Vec<_>>()
        .join("\n");
    without_comments
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

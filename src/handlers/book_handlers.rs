//! HTTP handlers for the book catalog.
//! Streams uploaded images into the staging area instead of buffering them
//! and delegates storage concerns to `CatalogService`.

use crate::{
    errors::AppError,
    models::book::{BookDraft, BookRecord},
    services::catalog_service::{CatalogService, StagedImage},
};
use axum::{
    Json,
    body::Body,
    extract::{Multipart, Path, State, multipart::Field},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use futures::StreamExt;
use serde_json::json;
use std::io;
use tokio_util::io::ReaderStream;

/// Create a book via `POST /books`.
///
/// Multipart fields: `title` (the only required one), `subject`,
/// `condition`, `distance`, `latitude`, `longitude`, plus an optional
/// `image` file. The image is streamed into the staging area while the
/// form is read and only joins the catalog once the whole form passed
/// validation, so a declined request leaves nothing visible behind.
pub async fn create_book(
    State(service): State<CatalogService>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut draft = BookDraft::default();
    let mut staged: Option<StagedImage> = None;

    if let Err(err) = read_form(&service, &mut multipart, &mut draft, &mut staged).await {
        if let Some(previous) = staged.take() {
            previous.discard().await;
        }
        return Err(err);
    }

    let book = service.create_book(draft, staged).await?;
    tracing::info!("book {} added to the catalog", book.id);

    Ok(Json(json!({
        "success": true,
        "message": "book added successfully"
    })))
}

/// Walk the multipart form, filling the draft and staging the image.
///
/// Unknown fields are ignored; a repeated `image` field replaces the
/// previously staged file. Numeric fields parse leniently — anything that
/// is not a finite number counts as absent, never as an error.
async fn read_form(
    service: &CatalogService,
    multipart: &mut Multipart,
    draft: &mut BookDraft,
    staged: &mut Option<StagedImage>,
) -> Result<(), AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::bad_request(format!("malformed multipart body: {err}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("title") => draft.title = field_text(field).await?,
            Some("subject") => draft.subject = non_empty(field_text(field).await?),
            Some("condition") => draft.condition = non_empty(field_text(field).await?),
            Some("distance") => {
                draft.distance = parse_loose(&field_text(field).await?).unwrap_or(0.0)
            }
            Some("latitude") => draft.latitude = parse_loose(&field_text(field).await?),
            Some("longitude") => draft.longitude = parse_loose(&field_text(field).await?),
            Some("image") => {
                let original = field.file_name().unwrap_or("image").to_string();
                let stream = field.map(|chunk| chunk.map_err(io::Error::other));
                if let Some(previous) = staged.take() {
                    previous.discard().await;
                }
                *staged = Some(service.stage_image(&original, stream).await?);
            }
            _ => {}
        }
    }
    Ok(())
}

/// `GET /books` — the full, unfiltered, unpaginated catalog.
pub async fn list_books(
    State(service): State<CatalogService>,
) -> Result<Json<Vec<BookRecord>>, AppError> {
    let books = service.list_books().await?;
    Ok(Json(books))
}

/// `GET /uploads/{filename}` — stream a stored image back as static
/// content, content type inferred from the extension.
pub async fn serve_image(
    State(service): State<CatalogService>,
    Path(file_name): Path<String>,
) -> Result<Response, AppError> {
    let (file, size_bytes) = service.open_image(&file_name).await?;
    let stream = ReaderStream::new(file);
    let body = Body::from_stream(stream);

    let mut response = Response::new(body);
    *response.status_mut() = StatusCode::OK;
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(content_type_for(&file_name)),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(size_bytes));

    Ok(response)
}

async fn field_text(field: Field<'_>) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|err| AppError::bad_request(format!("unreadable form field: {err}")))
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

fn parse_loose(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Content type by extension, the way a static file server would pick it.
fn content_type_for(file_name: &str) -> &'static str {
    let ext = file_name.rsplit('.').next().unwrap_or_default();
    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        _ => "application/octet-stream",
    }
}

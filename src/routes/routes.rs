//! Defines routes for the book catalog HTTP surface.
//!
//! ## Structure
//! - **Catalog endpoints**
//!   - `POST /books` — create a book (multipart form with optional image)
//!   - `GET  /books` — list every book, unfiltered and unpaginated
//!
//! - **Image endpoint**
//!   - `GET /uploads/{filename}` — serve an uploaded image back; this is
//!     the prefix `CatalogService` records on each row's `image` field
//!
//! Health endpoints (`/healthz`, `/readyz`) are mounted at the root.

use crate::{
    handlers::{
        book_handlers::{create_book, list_books, serve_image},
        health_handlers::{healthz, readyz},
    },
    services::catalog_service::CatalogService,
};
use axum::{Router, extract::DefaultBodyLimit, routing::get};
use tower_http::cors::{Any, CorsLayer};

/// Phone photos routinely exceed axum's 2 MB default body limit.
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Build and return the router for the whole catalog surface.
///
/// The router carries shared state (`CatalogService`) to all handlers.
/// [`app`] attaches the state and the outer middleware.
pub fn routes() -> Router<CatalogService> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // catalog endpoints
        .route("/books", get(list_books).post(create_book))
        // stored images served back as static content
        .route("/uploads/{filename}", get(serve_image))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

/// Assemble the complete application: routes, shared state, and the
/// permissive CORS the cross-origin mobile clients need. Used by `main`
/// and by the in-process test harness alike.
pub fn app(service: CatalogService) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    routes().with_state(service).layer(cors)
}

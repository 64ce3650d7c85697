//! Book catalog service: a small HTTP API for listing and donating
//! schoolbooks, plus the client-side proximity ranking that orders the
//! catalog around the reader.
//!
//! Server side: `POST /books` accepts a multipart form (text fields plus
//! an optional cover image), stores the image in an upload area and the
//! row in SQLite, and `GET /books` returns the whole catalog. Stored
//! images are served back under `/uploads/`.
//!
//! Client side: [`ranking`] filters the catalog by title and facets and
//! orders it by great-circle distance to the device position.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod ranking;
pub mod routes;
pub mod services;

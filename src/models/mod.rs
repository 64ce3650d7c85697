//! Core data models for the book catalog service.
//!
//! The catalog has a single persisted entity: a book offered for exchange
//! or donation. It maps to the `books` table via `sqlx::FromRow` and
//! serializes as JSON via `serde` with the field names clients rely on.

pub mod book;

//! Core data model for the file-sharing service.
//!
//! A single entity, `FileRecord`, maps to the `files` table via
//! `sqlx::FromRow` and serializes naturally as JSON via `serde`.

pub mod file;

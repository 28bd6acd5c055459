//! src/services/file_store.rs
//!
//! FileStore — metadata persistence backed by SQLite. This file holds no
//! payload bytes; it tracks one row per uploaded file and enforces the
//! retention window. SQLite has no native TTL index, so expiry is a
//! combination of query-time filtering and a periodic sweep driven from
//! `main`.

use crate::models::file::{FileRecord, NewFileRecord};
use chrono::{Duration, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

/// Records older than this many seconds are expired (15 days).
pub const RETENTION_SECS: i64 = 15 * 24 * 3600;

#[derive(Debug, Error)]
pub enum FileStoreError {
    #[error("file `{0}` not found")]
    NotFound(Uuid),
    #[error("no file with key `{0}`")]
    KeyNotFound(String),
    #[error("field `{0}` must not be empty")]
    Validation(&'static str),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type FileStoreResult<T> = Result<T, FileStoreError>;

/// FileStore provides the metadata lifecycle:
/// - Create a record after a successful gateway upload
/// - Look up by id (download path) or by gateway key (post-create re-fetch)
/// - Delete everything (bulk purge endpoint)
/// - Sweep rows past the retention window
///
/// Expired rows are invisible to the find queries even before the sweeper
/// physically removes them, so callers never observe a record older than
/// the retention window.
#[derive(Clone)]
pub struct FileStore {
    /// Shared SQLite connection pool used for metadata operations.
    pub db: Arc<SqlitePool>,
}

impl FileStore {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    /// Reject fields that are empty after trimming.
    ///
    /// Mirrors the schema-level `required + trim` constraints: a record with
    /// a blank key, mimetype, name, or location is never persisted.
    fn validate(new: &NewFileRecord) -> FileStoreResult<()> {
        if new.file_key.trim().is_empty() {
            return Err(FileStoreError::Validation("file_key"));
        }
        if new.file_mimetype.trim().is_empty() {
            return Err(FileStoreError::Validation("file_mimetype"));
        }
        if new.file_name.trim().is_empty() {
            return Err(FileStoreError::Validation("file_name"));
        }
        if new.file_location.trim().is_empty() {
            return Err(FileStoreError::Validation("file_location"));
        }
        Ok(())
    }

    /// Cutoff timestamp: rows created at or before this are expired.
    fn expiry_cutoff() -> chrono::DateTime<Utc> {
        Utc::now() - Duration::seconds(RETENTION_SECS)
    }

    /// Persist a new record, assigning id and both timestamps.
    ///
    /// Fails with `Validation` before touching the database if any required
    /// field is blank.
    pub async fn create(&self, new: NewFileRecord) -> FileStoreResult<FileRecord> {
        Self::validate(&new)?;

        let now = Utc::now();
        let record = FileRecord {
            id: Uuid::new_v4(),
            file_key: new.file_key.trim().to_string(),
            file_mimetype: new.file_mimetype.trim().to_string(),
            file_name: new.file_name.trim().to_string(),
            file_location: new.file_location.trim().to_string(),
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO files (id, file_key, file_mimetype, file_name, file_location, \
             created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.id)
        .bind(&record.file_key)
        .bind(&record.file_mimetype)
        .bind(&record.file_name)
        .bind(&record.file_location)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&*self.db)
        .await?;

        Ok(record)
    }

    /// Fetch a record by id. Returns `NotFound` if the row is missing or
    /// already past the retention window.
    pub async fn find_by_id(&self, id: Uuid) -> FileStoreResult<FileRecord> {
        sqlx::query_as::<_, FileRecord>(
            "SELECT id, file_key, file_mimetype, file_name, file_location, \
             created_at, updated_at
             FROM files WHERE id = ? AND created_at > ?",
        )
        .bind(id)
        .bind(Self::expiry_cutoff())
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => FileStoreError::NotFound(id),
            other => FileStoreError::Sqlx(other),
        })
    }

    /// Fetch the first record matching a gateway key.
    pub async fn find_by_key(&self, file_key: &str) -> FileStoreResult<FileRecord> {
        sqlx::query_as::<_, FileRecord>(
            "SELECT id, file_key, file_mimetype, file_name, file_location, \
             created_at, updated_at
             FROM files WHERE file_key = ? AND created_at > ?
             ORDER BY created_at ASC LIMIT 1",
        )
        .bind(file_key)
        .bind(Self::expiry_cutoff())
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => FileStoreError::KeyNotFound(file_key.to_string()),
            other => FileStoreError::Sqlx(other),
        })
    }

    /// Remove every record. No-op on an empty store; gateway objects are
    /// untouched.
    pub async fn delete_all(&self) -> FileStoreResult<u64> {
        let result = sqlx::query("DELETE FROM files").execute(&*self.db).await?;
        Ok(result.rows_affected())
    }

    /// Physically delete rows past the retention window.
    ///
    /// Invoked periodically by the background sweeper; precision is bounded
    /// by the sweep interval, not by the second.
    pub async fn sweep_expired(&self) -> FileStoreResult<u64> {
        let result = sqlx::query("DELETE FROM files WHERE created_at <= ?")
            .bind(Self::expiry_cutoff())
            .execute(&*self.db)
            .await?;

        let removed = result.rows_affected();
        if removed > 0 {
            debug!("expiry sweep removed {} record(s)", removed);
        }
        Ok(removed)
    }
}

//! Represents the metadata record kept for every uploaded file.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Metadata for one uploaded file.
///
/// The payload itself lives at the storage gateway; this record only tracks
/// how to address it (`file_key`), how to serve it (`file_mimetype`), and
/// where it can be fetched from directly (`file_location`).
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct FileRecord {
    /// Unique identifier for this record (UUID for internal DB use).
    pub id: Uuid,

    /// Key the storage gateway uses to address the underlying object.
    pub file_key: String,

    /// Content type declared by the uploader, used for the download response.
    pub file_mimetype: String,

    /// Original filename supplied by the uploader.
    pub file_name: String,

    /// Retrieval URL returned by the storage gateway.
    pub file_location: String,

    /// When this record was created. Drives the retention-window expiry.
    pub created_at: DateTime<Utc>,

    /// Last mutation time. Records are immutable today, so this matches
    /// `created_at` after insert.
    pub updated_at: DateTime<Utc>,
}

/// Fields required to create a [`FileRecord`]; id and timestamps are
/// assigned by the store.
#[derive(Debug, Clone)]
pub struct NewFileRecord {
    pub file_key: String,
    pub file_mimetype: String,
    pub file_name: String,
    pub file_location: String,
}

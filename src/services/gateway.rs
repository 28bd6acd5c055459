//! Storage gateway abstraction.
//!
//! The service never stores payload bytes itself; it hands them to a
//! `StorageGateway` and records the key/URL the gateway returns. The trait
//! keeps the handlers provider-agnostic so a cloud adapter can replace the
//! local-disk one without touching the HTTP layer.

use async_trait::async_trait;
use bytes::Bytes;
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use thiserror::Error;
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("object `{0}` not found")]
    NotFound(String),
    #[error("invalid object key")]
    InvalidKey,
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// What the gateway hands back after a successful upload: the key it will
/// accept in later `get` calls, and a direct retrieval URL.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub key: String,
    pub url: String,
}

/// Object-storage provider contract.
///
/// `put` accepts the raw bytes plus the caller-declared filename/mimetype
/// (providers may record them, the disk adapter ignores them), `get`
/// returns the stored bytes, and `probe` is a cheap readiness check for
/// `/readyz`.
#[async_trait]
pub trait StorageGateway: Send + Sync {
    async fn put(&self, bytes: Bytes, filename: &str, mimetype: &str)
    -> GatewayResult<StoredObject>;
    async fn get(&self, key: &str) -> GatewayResult<Bytes>;
    async fn probe(&self) -> GatewayResult<()>;
}

/// Local-disk gateway adapter.
///
/// Payloads live beneath `base_path/{shard}/{shard}/{key}` with two-level
/// md5 sharding to keep per-directory file counts down. Keys are generated
/// server-side as simple-hex UUIDs, so they never need path sanitizing
/// beyond the defensive check in `get`. Retrieval URLs are
/// `{public_url}/{key}`.
#[derive(Clone)]
pub struct DiskGateway {
    base_path: PathBuf,
    public_url: String,
}

impl DiskGateway {
    pub fn new(base_path: impl Into<PathBuf>, public_url: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            public_url: public_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Keys come from `Uuid::simple`, so anything else is rejected before
    /// it can touch the filesystem.
    fn ensure_key_safe(key: &str) -> GatewayResult<()> {
        if key.is_empty() || !key.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(GatewayError::InvalidKey);
        }
        Ok(())
    }

    /// Two-level shard identifiers for a key: the first two bytes of
    /// md5(key) as lowercase hex.
    fn shards(key: &str) -> (String, String) {
        let digest = md5::compute(key);
        (format!("{:02x}", digest[0]), format!("{:02x}", digest[1]))
    }

    /// Fully-qualified payload path `base_path/{shard}/{shard}/{key}`.
    /// Parent directories may not exist yet.
    fn object_path(&self, key: &str) -> PathBuf {
        let (shard_a, shard_b) = Self::shards(key);
        let mut path = self.base_path.clone();
        path.push(shard_a);
        path.push(shard_b);
        path.push(key);
        path
    }
}

#[async_trait]
impl StorageGateway for DiskGateway {
    /// Write the payload and return its key and URL.
    ///
    /// Bytes go to a temp file first, then fsync + atomic rename into the
    /// final location, so concurrent readers never observe a partially
    /// written object. The parent directory is not fsynced, so the rename
    /// itself is not guaranteed to survive a crash.
    async fn put(
        &self,
        bytes: Bytes,
        _filename: &str,
        _mimetype: &str,
    ) -> GatewayResult<StoredObject> {
        let key = Uuid::new_v4().simple().to_string();
        let file_path = self.object_path(&key);
        let parent = file_path.parent().map(Path::to_path_buf).ok_or_else(|| {
            GatewayError::Io(io::Error::new(
                ErrorKind::Other,
                "object path missing parent directory",
            ))
        })?;
        fs::create_dir_all(&parent).await?;

        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));
        let mut file = File::create(&tmp_path).await?;
        if let Err(err) = write_durably(&mut file, &bytes).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(GatewayError::Io(err));
        }
        if let Err(err) = fs::rename(&tmp_path, &file_path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(GatewayError::Io(err));
        }

        Ok(StoredObject {
            url: format!("{}/{}", self.public_url, key),
            key,
        })
    }

    async fn get(&self, key: &str) -> GatewayResult<Bytes> {
        Self::ensure_key_safe(key)?;
        let file_path = self.object_path(key);
        match fs::read(&file_path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                Err(GatewayError::NotFound(key.to_string()))
            }
            Err(err) => Err(GatewayError::Io(err)),
        }
    }

    /// Best-effort write/read/delete of a temp file under `base_path`.
    async fn probe(&self) -> GatewayResult<()> {
        fs::create_dir_all(&self.base_path).await?;
        let tmp_path = self.base_path.join(format!(".readyz-{}", Uuid::new_v4()));
        fs::write(&tmp_path, b"readyz").await?;
        let bytes = fs::read(&tmp_path).await?;
        let _ = fs::remove_file(&tmp_path).await;
        if bytes != b"readyz" {
            return Err(GatewayError::Io(io::Error::new(
                ErrorKind::InvalidData,
                "probe file content mismatch",
            )));
        }
        Ok(())
    }
}

async fn write_durably(file: &mut File, bytes: &[u8]) -> io::Result<()> {
    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_all().await
}

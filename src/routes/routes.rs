//! Defines routes for the file-sharing API.
//!
//! ## Structure
//! - **File endpoints** (under `/api/file`)
//!   - `POST   /api/file/upload` — upload a file (multipart field `file`)
//!   - `GET    /api/file/{id}`   — fetch a record plus the object bytes
//!   - `DELETE /api/file/`       — purge all metadata records
//!
//! - **Health endpoints** (mounted at root)
//!   - `GET /healthz`, `GET /readyz`

use crate::{
    handlers::{
        file_handlers::{MAX_UPLOAD_BYTES, delete_all_files, get_file, upload_file},
        health_handlers::{healthz, readyz},
    },
    state::AppState,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
};

/// Build and return the router for all API routes.
///
/// The router carries shared state (`AppState`) to all handlers. The upload
/// route gets its own body limit; everything else keeps axum's default.
pub fn routes() -> Router<AppState> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // file endpoints
        .route(
            "/api/file/upload",
            post(upload_file).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/api/file/{id}", get(get_file))
        .route("/api/file/", delete(delete_all_files))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::file::FileRecord,
        services::{
            file_store::FileStore,
            gateway::{DiskGateway, GatewayError, GatewayResult, StorageGateway, StoredObject},
        },
    };
    use async_trait::async_trait;
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
    };
    use base64::{Engine as _, engine::general_purpose};
    use bytes::Bytes;
    use sqlx::sqlite::SqlitePoolOptions;
    use std::{
        path::PathBuf,
        sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
        },
    };
    use tower::ServiceExt;
    use uuid::Uuid;

    const BOUNDARY: &str = "test-boundary";

    async fn test_store() -> FileStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory sqlite");
        for stmt in include_str!("../../migrations/0001_init.sql")
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            sqlx::query(stmt).execute(&pool).await.expect("migration");
        }
        FileStore::new(Arc::new(pool))
    }

    async fn test_app(gateway: Arc<dyn StorageGateway>) -> (Router, FileStore) {
        let store = test_store().await;
        let app = routes().with_state(AppState::new(store.clone(), gateway));
        (app, store)
    }

    /// Removes its directory when the test finishes.
    struct TempRoot(PathBuf);

    impl Drop for TempRoot {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.0);
        }
    }

    fn disk_gateway() -> (TempRoot, Arc<dyn StorageGateway>) {
        let dir = std::env::temp_dir().join(format!("easyshare-routes-{}", Uuid::new_v4()));
        let gateway = Arc::new(DiskGateway::new(&dir, "https://x"));
        (TempRoot(dir), gateway)
    }

    fn multipart_upload(field: &str, filename: &str, mimetype: &str, content: &str) -> Request<Body> {
        let body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
             Content-Type: {mimetype}\r\n\r\n\
             {content}\r\n\
             --{BOUNDARY}--\r\n"
        );
        Request::builder()
            .method("POST")
            .uri("/api/file/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .expect("request")
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    /// Gateway stub that rejects puts and counts gets.
    struct BrokenGateway {
        gets: AtomicUsize,
    }

    impl BrokenGateway {
        fn new() -> Self {
            Self {
                gets: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl StorageGateway for BrokenGateway {
        async fn put(&self, _: Bytes, _: &str, _: &str) -> GatewayResult<StoredObject> {
            Err(GatewayError::Io(std::io::Error::other("bucket offline")))
        }

        async fn get(&self, key: &str) -> GatewayResult<Bytes> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            Err(GatewayError::NotFound(key.to_string()))
        }

        async fn probe(&self) -> GatewayResult<()> {
            Err(GatewayError::Io(std::io::Error::other("bucket offline")))
        }
    }

    #[tokio::test]
    async fn upload_fetch_delete_lifecycle() {
        let (_root, gateway) = disk_gateway();
        let (app, _store) = test_app(gateway).await;

        // upload a 10-byte text file
        let response = app
            .clone()
            .oneshot(multipart_upload("file", "a.txt", "text/plain", "0123456789"))
            .await
            .expect("upload");
        assert_eq!(response.status(), StatusCode::OK);

        let record: FileRecord = serde_json::from_value(body_json(response).await).expect("record");
        assert_eq!(record.file_name, "a.txt");
        assert_eq!(record.file_mimetype, "text/plain");
        assert_eq!(record.file_location, format!("https://x/{}", record.file_key));

        // fetch it back; Content-Type must echo the stored mimetype
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/api/file/{}", record.id))
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("fetch");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok()),
            Some("text/plain")
        );

        let body = body_json(response).await;
        assert_eq!(body["file"]["file_key"], record.file_key.as_str());
        let data = general_purpose::STANDARD
            .decode(body["data"].as_str().expect("data field"))
            .expect("base64");
        assert_eq!(&data[..], b"0123456789");

        // bulk delete, then the id is gone
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/api/file/")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("delete");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, "All files deleted");

        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/api/file/{}", record.id))
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("fetch after delete");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn upload_without_file_field_is_rejected() {
        let (_root, gateway) = disk_gateway();
        let (app, store) = test_app(gateway).await;

        let response = app
            .oneshot(multipart_upload("avatar", "a.txt", "text/plain", "xx"))
            .await
            .expect("upload");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "No file uploaded");

        // no record was created
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM files")
            .fetch_one(&*store.db)
            .await
            .expect("count");
        assert_eq!(count, 0);
    }

    /// A body past the 5 MiB transport limit aborts the multipart stream,
    /// which surfaces as 500 and leaves no record behind.
    #[tokio::test]
    async fn oversize_upload_is_a_server_error() {
        let (_root, gateway) = disk_gateway();
        let (app, store) = test_app(gateway).await;

        let content = "x".repeat(6 * 1024 * 1024);
        let response = app
            .oneshot(multipart_upload("file", "big.bin", "application/octet-stream", &content))
            .await
            .expect("upload");
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM files")
            .fetch_one(&*store.db)
            .await
            .expect("count");
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn upload_surfaces_gateway_failure() {
        let (app, store) = test_app(Arc::new(BrokenGateway::new())).await;

        let response = app
            .oneshot(multipart_upload("file", "a.txt", "text/plain", "xx"))
            .await
            .expect("upload");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        let message = body.as_str().expect("string body");
        assert!(message.starts_with("Error: "), "body was {message}");
        assert!(message.contains("bucket offline"));

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM files")
            .fetch_one(&*store.db)
            .await
            .expect("count");
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn fetch_unknown_id_skips_the_gateway() {
        let gateway = Arc::new(BrokenGateway::new());
        let (app, _store) = test_app(gateway.clone()).await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/api/file/{}", Uuid::new_v4()))
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("fetch");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await, "File not found");
        assert_eq!(gateway.gets.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn readyz_degrades_when_gateway_is_down() {
        let (app, _store) = test_app(Arc::new(BrokenGateway::new())).await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/readyz")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("readyz");
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body = body_json(response).await;
        assert_eq!(body["checks"]["sqlite"]["ok"], true);
        assert_eq!(body["checks"]["gateway"]["ok"], false);
    }
}

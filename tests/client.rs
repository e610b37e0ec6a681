//! Client Tests
//!
//! Runs the HTTP client against a server bound to a random local port.

use std::net::SocketAddr;
use std::sync::Arc;

use tempfile::TempDir;

use stowage::client::StowageClient;
use stowage::config::ServerConfig;
use stowage::transfer::FileInfo;
use stowage::web::{AppState, WebServer};
use stowage::{
    AdmissionController, Database, ErrorKind, FileRepository, FileService, LocalBlobStore,
};

const HELLO: &[u8] = b"Hello, this is a test file content!";

struct LiveServer {
    client: StowageClient,
    admission: AdmissionController,
    _db: Database,
    _temp_dir: TempDir,
}

async fn start_server() -> LiveServer {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db = Database::open_in_memory()
        .await
        .expect("Failed to create test database");
    let files = FileService::new(
        Arc::new(FileRepository::new(db.pool().clone())),
        Arc::new(LocalBlobStore::new(temp_dir.path().join("files"))),
    );
    let admission = AdmissionController::with_capacities(2, 2, 2);
    let config = ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
    };

    let server = WebServer::new(
        &config,
        AppState::new(files, admission.clone()),
        1024 * 1024,
    )
    .expect("Failed to create server");
    let addr: SocketAddr = server.run_with_addr().await.expect("Failed to start server");

    LiveServer {
        client: StowageClient::new(format!("http://{addr}")),
        admission,
        _db: db,
        _temp_dir: temp_dir,
    }
}

#[tokio::test]
async fn test_client_upload_list_download() {
    let live = start_server().await;
    let client = &live.client;

    let uploaded = client
        .upload(&FileInfo::new("test.txt", "text/plain"), HELLO, 10)
        .await
        .unwrap();
    assert!(uploaded.filename.starts_with("test_"));
    assert_eq!(uploaded.size, HELLO.len() as i64);

    let listing = client.list(1, 10).await.unwrap();
    assert_eq!(listing.total_count, 1);
    assert_eq!(listing.files[0].filename, uploaded.filename);

    let data = client.download(&uploaded.filename).await.unwrap();
    assert_eq!(data.as_ref(), HELLO);
}

#[tokio::test]
async fn test_client_download_unknown_is_not_found() {
    let live = start_server().await;

    let err = live.client.download("missing.txt").await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.to_string(), "file 'missing.txt' not found");
}

#[tokio::test]
async fn test_client_reports_busy_server() {
    let live = start_server().await;
    let _first = live
        .admission
        .try_admit(stowage::OperationClass::List)
        .unwrap();
    let _second = live
        .admission
        .try_admit(stowage::OperationClass::List)
        .unwrap();

    let err = live.client.list(1, 10).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ResourceExhausted);
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_client_unreachable_server_is_transfer_error() {
    let client = StowageClient::new("http://127.0.0.1:1");

    let err = client.list(1, 10).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Internal);
}

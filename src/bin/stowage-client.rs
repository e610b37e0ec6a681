//! Command-line client that exercises a running stowage server.
//!
//! Uploads a small text file in 10-byte chunks, lists the first page of
//! files, then downloads the upload and checks it came back intact.
//!
//! Usage: `stowage-client [BASE_URL]` (default `http://localhost:50051`,
//! or `STOWAGE_URL`).

use std::process::ExitCode;
use std::time::Duration;

use tracing::{error, info};

use stowage::client::StowageClient;
use stowage::transfer::FileInfo;
use stowage::StowageError;

const DEFAULT_URL: &str = "http://localhost:50051";
const SAMPLE: &[u8] = b"Hello, this is a test file content!";
const SAMPLE_CHUNK_SIZE: usize = 10;
const PAUSE: Duration = Duration::from_secs(1);

#[tokio::main]
async fn main() -> ExitCode {
    stowage::logging::init_console_only("info");

    let base_url = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("STOWAGE_URL").ok())
        .unwrap_or_else(|| DEFAULT_URL.to_string());
    let client = StowageClient::new(base_url);

    match run(&client).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Client run failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(client: &StowageClient) -> stowage::Result<()> {
    info!("=== Upload ===");
    let uploaded = client
        .upload(
            &FileInfo::new("test.txt", "text/plain"),
            SAMPLE,
            SAMPLE_CHUNK_SIZE,
        )
        .await?;
    info!(
        id = %uploaded.id,
        filename = %uploaded.filename,
        size = uploaded.size,
        "Upload successful"
    );
    tokio::time::sleep(PAUSE).await;

    info!("=== List ===");
    let listing = client.list(1, 10).await?;
    info!(total = listing.total_count, "Found files");
    for file in &listing.files {
        info!(
            filename = %file.filename,
            size = file.size,
            created_at = %file.created_at,
            "-"
        );
    }
    tokio::time::sleep(PAUSE).await;

    info!("=== Download {} ===", uploaded.filename);
    let data = client.download(&uploaded.filename).await?;
    info!(
        size = data.len(),
        content = %String::from_utf8_lossy(&data),
        "Downloaded"
    );

    if data.as_ref() != SAMPLE {
        return Err(StowageError::Inconsistent(format!(
            "downloaded {} bytes, expected {}",
            data.len(),
            SAMPLE.len()
        )));
    }
    Ok(())
}

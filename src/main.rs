use std::process::ExitCode;
use std::sync::Arc;

use tracing::{error, info};

use stowage::web::{AppState, WebServer};
use stowage::{AdmissionController, Config, Database, FileRepository, FileService, LocalBlobStore};

#[tokio::main]
async fn main() -> ExitCode {
    // Load configuration
    let mut config = match Config::load("config.toml") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config.toml: {e}");
            eprintln!("Using default configuration.");
            Config::default()
        }
    };
    if let Err(e) = config.apply_env_overrides().and_then(|()| config.validate()) {
        eprintln!("Invalid configuration: {e}");
        return ExitCode::FAILURE;
    }

    // Initialize logging
    if let Err(e) = stowage::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        stowage::logging::init_console_only(&config.logging.level);
    }

    info!("Stowage file storage service");

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Server failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> stowage::Result<()> {
    let db = Database::open(&config.database.url, config.database.max_connections).await?;

    let files = FileService::new(
        Arc::new(FileRepository::new(db.pool().clone())),
        Arc::new(LocalBlobStore::new(&config.storage.path)),
    );
    info!("File storage at {}", config.storage.path);

    if config.storage.reconcile_on_startup {
        match files.reconcile_orphans(config.storage.orphan_grace()).await {
            Ok(0) => {}
            Ok(removed) => info!(removed, "Removed orphaned blobs"),
            Err(e) => error!("Orphan reconciliation failed: {}", e),
        }
    }

    let admission = AdmissionController::new(&config.limits);
    info!(
        upload = config.limits.upload,
        download = config.limits.download,
        list = config.limits.list,
        "Concurrency limits"
    );

    let server = WebServer::new(
        &config.server,
        AppState::new(files, admission),
        config.storage.max_upload_bytes(),
    )?;
    server.run().await?;

    db.close().await;
    Ok(())
}

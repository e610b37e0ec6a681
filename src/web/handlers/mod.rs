//! API handlers for the file service.

pub mod file;

pub use file::*;

use crate::admission::AdmissionController;
use crate::file::FileService;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// File operations.
    pub files: FileService,
    /// Per-class concurrency limits.
    pub admission: AdmissionController,
}

impl AppState {
    /// Create a new application state.
    pub fn new(files: FileService, admission: AdmissionController) -> Self {
        Self { files, admission }
    }
}

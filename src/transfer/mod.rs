//! Framed transfer of file bytes.
//!
//! Uploads arrive as a sequence of [`UploadFrame`]s (one identity frame and
//! any number of data frames) and are joined by the assembler. Downloads
//! leave as fixed-size data frames produced by the emitter.

mod assembler;
mod emitter;

pub use assembler::{assemble, AssembledUpload};
pub use emitter::{emit, FrameSink};

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Maximum payload of one outbound data frame (64 KiB).
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Identity of an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    /// Name declared by the client.
    pub filename: String,
    /// MIME type declared by the client; informational only.
    #[serde(default)]
    pub content_type: String,
}

impl FileInfo {
    /// Create a new FileInfo.
    pub fn new(filename: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
        }
    }
}

/// One inbound frame of an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadFrame {
    /// File identity.
    Info(FileInfo),
    /// Raw payload bytes.
    Chunk(Bytes),
}

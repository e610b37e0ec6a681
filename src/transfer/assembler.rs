//! Joins inbound upload frames into one byte sequence.

use std::io::Cursor;

use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};

use super::{FileInfo, UploadFrame};
use crate::{Result, StowageError};

/// A fully received upload.
#[derive(Debug, Clone)]
pub struct AssembledUpload {
    info: FileInfo,
    data: Bytes,
}

impl AssembledUpload {
    /// Declared identity of the file.
    pub fn info(&self) -> &FileInfo {
        &self.info
    }

    /// Total payload length.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether no payload bytes arrived.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Split into the identity and a reader over the payload.
    pub fn into_parts(self) -> (FileInfo, Cursor<Bytes>) {
        (self.info, Cursor::new(self.data))
    }
}

/// Consume `frames` until the stream ends.
///
/// Payload is concatenated in arrival order, including chunks that arrive
/// before the identity frame. Fails with `InvalidArgument` when the
/// identity frame is missing, repeated, or names no file. A stream error
/// ends assembly and is returned unchanged.
pub async fn assemble<S>(frames: S) -> Result<AssembledUpload>
where
    S: Stream<Item = Result<UploadFrame>>,
{
    let mut frames = std::pin::pin!(frames);
    let mut info: Option<FileInfo> = None;
    let mut data = BytesMut::new();

    while let Some(frame) = frames.next().await {
        match frame? {
            UploadFrame::Info(frame_info) => {
                if info.is_some() {
                    return Err(StowageError::InvalidArgument(
                        "file info must be sent exactly once".to_string(),
                    ));
                }
                if frame_info.filename.trim().is_empty() {
                    return Err(StowageError::InvalidArgument(
                        "filename must not be empty".to_string(),
                    ));
                }
                info = Some(frame_info);
            }
            UploadFrame::Chunk(chunk) => data.extend_from_slice(&chunk),
        }
    }

    let info =
        info.ok_or_else(|| StowageError::InvalidArgument("file info is required".to_string()))?;

    Ok(AssembledUpload {
        info,
        data: data.freeze(),
    })
}

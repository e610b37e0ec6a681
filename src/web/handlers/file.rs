//! File handlers for Web API.

use std::io;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::QueryRejection,
        Multipart, Path, Query, State,
    },
    http::{header, StatusCode},
    response::Response,
    Json,
};
use bytes::Bytes;
use futures::Stream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use super::AppState;
use crate::admission::OperationClass;
use crate::file::Pagination;
use crate::transfer::{assemble, emit, FileInfo, UploadFrame};
use crate::web::dto::{ListQuery, ListResponse, UploadResponse};
use crate::web::error::ApiError;
use crate::{Result, StowageError};

/// Frames buffered between the blob reader and the response body.
const DOWNLOAD_BUFFER_FRAMES: usize = 4;

/// Upload a file.
///
/// POST /api/files
///
/// Request body: multipart/form-data. A part named "info" holds the JSON
/// file identity; each part named "chunk" holds raw bytes. Other parts are
/// skipped. A body that is not multipart is an invalid argument.
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> std::result::Result<Json<UploadResponse>, ApiError> {
    let multipart = multipart?;
    let _permit = state.admission.try_admit(OperationClass::Upload)?;

    let upload = assemble(multipart_frames(multipart)).await?;
    let (info, content) = upload.into_parts();
    let file = state.files.upload(&info.filename, content).await?;

    Ok(Json(file.into()))
}

/// Download a file.
///
/// GET /api/files/:filename
///
/// The body is streamed in frames of at most 64 KiB. If reading the blob
/// fails partway, the body is aborted.
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> std::result::Result<Response, ApiError> {
    let permit = state.admission.try_admit(OperationClass::Download)?;

    let (file, reader) = state.files.resolve(&filename).await?;

    let content_type = mime_guess::from_path(&file.filename)
        .first_or_octet_stream()
        .to_string();

    let (mut tx, rx) = mpsc::channel::<io::Result<Bytes>>(DOWNLOAD_BUFFER_FRAMES);
    let name = file.filename.clone();
    tokio::spawn(async move {
        let _permit = permit;
        match emit(reader, &mut tx).await {
            Ok(sent) => tracing::info!(filename = %name, size = sent, "File sent"),
            Err(e) => {
                tracing::warn!(filename = %name, error = %e, "Download aborted");
                let _ = tx.send(Err(io::Error::other(e.to_string()))).await;
            }
        }
    });

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, file.size)
        .body(Body::from_stream(ReceiverStream::new(rx)))
        .map_err(|e| {
            tracing::error!("Failed to build download response: {}", e);
            ApiError::internal("An internal error occurred")
        })
}

/// List files, newest first.
///
/// GET /api/files?page=&page_size=
pub async fn list_files(
    State(state): State<Arc<AppState>>,
    query: std::result::Result<Query<ListQuery>, QueryRejection>,
) -> std::result::Result<Json<ListResponse>, ApiError> {
    let Query(query) = query?;
    let _permit = state.admission.try_admit(OperationClass::List)?;

    let pagination: Pagination = query.into();
    tracing::debug!(
        page = pagination.page(),
        page_size = pagination.page_size(),
        "Listing files"
    );
    let listing = state.files.list(pagination).await?;

    Ok(Json(listing.into()))
}

/// Read multipart parts as upload frames, in order.
fn multipart_frames(multipart: Multipart) -> impl Stream<Item = Result<UploadFrame>> {
    futures::stream::try_unfold(multipart, |mut multipart| async move {
        next_frame(&mut multipart)
            .await
            .map(|frame| frame.map(|frame| (frame, multipart)))
    })
}

async fn next_frame(multipart: &mut Multipart) -> Result<Option<UploadFrame>> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "info" => {
                let data = field.bytes().await.map_err(multipart_error)?;
                let info: FileInfo = serde_json::from_slice(&data).map_err(|e| {
                    StowageError::InvalidArgument(format!("malformed file info: {e}"))
                })?;
                return Ok(Some(UploadFrame::Info(info)));
            }
            "chunk" => {
                let data = field.bytes().await.map_err(multipart_error)?;
                return Ok(Some(UploadFrame::Chunk(data)));
            }
            _ => continue,
        }
    }
    Ok(None)
}

fn multipart_error(e: MultipartError) -> StowageError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        StowageError::InvalidArgument(e.body_text())
    } else {
        StowageError::Transfer(e.body_text())
    }
}

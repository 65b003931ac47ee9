/// Upload handler - multipart images in, processed image fragments out
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use bytes::BytesMut;
use futures::StreamExt;
use std::path::Path;
use tracing::info;

use crate::error::{AppError, Result};
use crate::services::UploadedFile;
use crate::state::{AppState, UploadLimits};

/// Form field carrying the image files
pub const IMAGES_FIELD: &str = "images";

/// Run every uploaded image through the worker, in form order.
///
/// The first failing file fails the whole request.
pub async fn upload_images(state: web::Data<AppState>, payload: Multipart) -> Result<HttpResponse> {
    let files = read_image_fields(payload, state.limits).await?;
    if files.is_empty() {
        return Err(AppError::NoFiles);
    }

    let mut body = String::new();
    for file in files {
        info!(file_name = %file.file_name, size = file.bytes.len(), "Uploaded file");
        body.push_str(&state.pipeline.process(file).await?);
    }

    Ok(HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(body))
}

async fn read_image_fields(mut payload: Multipart, limits: UploadLimits) -> Result<Vec<UploadedFile>> {
    let mut files = Vec::new();

    while let Some(field) = payload.next().await {
        let mut field = field?;

        if field.name() != Some(IMAGES_FIELD) {
            while let Some(chunk) = field.next().await {
                chunk?;
            }
            continue;
        }

        if files.len() >= limits.max_files {
            return Err(AppError::BadRequest(format!(
                "Too many files: at most {} per upload",
                limits.max_files
            )));
        }

        let file_name = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .and_then(sanitize_file_name)
            .ok_or_else(|| AppError::BadRequest("Uploaded file has no usable file name".to_string()))?;

        let mut data = BytesMut::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk?;
            if data.len() + chunk.len() > limits.max_file_bytes {
                return Err(AppError::PayloadTooLarge(format!(
                    "{file_name} exceeds {} bytes",
                    limits.max_file_bytes
                )));
            }
            data.extend_from_slice(&chunk);
        }

        files.push(UploadedFile {
            file_name,
            bytes: data.freeze(),
        });
    }

    Ok(files)
}

/// Final path component of a client-supplied file name.
fn sanitize_file_name(raw: &str) -> Option<String> {
    let name = Path::new(raw.trim().rsplit(['/', '\\']).next()?)
        .file_name()?
        .to_str()?
        .to_string();

    if name.is_empty() || name == "." || name == ".." {
        return None;
    }
    Some(name)
}

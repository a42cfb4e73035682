//! Transfer of a local file to the store.
//!
//! The file is opened here, independently of any checksum pass, and read
//! through a [`ProgressReader`] so every byte sent is reported.

use std::path::Path;
use std::sync::Arc;

use s3_push_models::{UploadOutcome, UploadTarget};
use tokio::io::{AsyncRead, AsyncReadExt as _};

use crate::progress::{ProgressCallback, ProgressReader};
use crate::store::{ObjectStore, UploadedPart};
use crate::{UploadError, effective_part_size, part_count};

/// Uploads `local_path` to `target`.
///
/// Files no larger than one part are sent with a single `PutObject`.
/// Larger files are sent as a multipart upload, one part at a time; if
/// any part or the completion fails, the upload is aborted before the
/// error is returned.
///
/// # Errors
///
/// Returns [`UploadError::Io`] if the file cannot be read, or the store's
/// error if a request fails.
pub async fn upload_file<S: ObjectStore + ?Sized>(
    store: &S,
    target: &UploadTarget,
    local_path: &Path,
    part_size: u64,
    progress: Arc<dyn ProgressCallback>,
) -> Result<UploadOutcome, UploadError> {
    let file = tokio::fs::File::open(local_path).await?;
    let size = file.metadata().await?.len();
    let part_size = effective_part_size(size, part_size);
    let parts = part_count(size, part_size);

    #[allow(clippy::cast_precision_loss)] // display-only MB value
    let mb = size as f64 / 1_048_576.0;
    log::info!(
        "Pushing {} -> {target} ({mb:.1} MB, {parts} part(s))",
        local_path.display()
    );

    progress.set_total(size);
    let mut reader = ProgressReader::new(file, progress);

    if parts == 1 {
        let body = read_exact_part(&mut reader, size).await?;
        let stored = store.put_object(target, body).await?;
        return Ok(UploadOutcome {
            target: target.clone(),
            size_bytes: size,
            e_tag: stored.e_tag,
            version_id: stored.version_id,
            upload_id: None,
            parts: 1,
        });
    }

    let upload_id = store.create_multipart_upload(target).await?;
    log::debug!("  started multipart upload {upload_id}");

    match send_parts(store, target, &upload_id, &mut reader, size, part_size).await {
        Ok(stored) => Ok(UploadOutcome {
            target: target.clone(),
            size_bytes: size,
            e_tag: stored.e_tag,
            version_id: stored.version_id,
            upload_id: Some(upload_id),
            parts: u32::try_from(parts).unwrap_or(u32::MAX),
        }),
        Err(e) => {
            log::warn!("  aborting multipart upload {upload_id}: {e}");
            if let Err(abort_err) = store.abort_multipart_upload(target, &upload_id).await {
                log::error!("  {abort_err}");
            }
            Err(e)
        }
    }
}

/// Uploads every part in order, then completes the upload.
async fn send_parts<S: ObjectStore + ?Sized, R: AsyncRead + Unpin>(
    store: &S,
    target: &UploadTarget,
    upload_id: &str,
    reader: &mut R,
    size: u64,
    part_size: u64,
) -> Result<s3_push_models::StoredObject, UploadError> {
    let mut uploaded: Vec<UploadedPart> = Vec::new();
    let mut remaining = size;
    let mut part_number = 1i32;

    while remaining > 0 {
        let len = remaining.min(part_size);
        let body = read_exact_part(reader, len).await?;
        let part = store.upload_part(target, upload_id, part_number, body).await?;
        log::debug!("  part {part_number} uploaded ({len} bytes)");
        uploaded.push(part);
        remaining -= len;
        part_number += 1;
    }

    store
        .complete_multipart_upload(target, upload_id, uploaded)
        .await
}

/// Reads exactly `len` bytes from `reader`.
async fn read_exact_part<R: AsyncRead + Unpin>(
    reader: &mut R,
    len: u64,
) -> Result<Vec<u8>, UploadError> {
    let mut body = Vec::with_capacity(usize::try_from(len).unwrap_or(0));
    reader.take(len).read_to_end(&mut body).await?;
    if body.len() as u64 != len {
        return Err(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            format!("file shrank while uploading: expected {len} bytes, read {}", body.len()),
        )
        .into());
    }
    Ok(body)
}

//! Skip-or-upload decision for a single local file.

use std::path::Path;
use std::sync::Arc;

use s3_push_models::{UploadDecision, UploadOutcome, UploadReason, UploadTarget};

use crate::digest::compute_digest;
use crate::progress::ProgressCallback;
use crate::store::ObjectStore;
use crate::{PART_SIZE, UploadError, upload};

/// Decides whether a local file needs uploading and performs the upload.
pub struct UploadDecider<S> {
    store: S,
    part_size: u64,
}

impl<S: ObjectStore> UploadDecider<S> {
    /// Creates a decider that uploads in [`PART_SIZE`] parts.
    pub const fn new(store: S) -> Self {
        Self::with_part_size(store, PART_SIZE)
    }

    /// Creates a decider with a custom part size.
    pub const fn with_part_size(store: S, part_size: u64) -> Self {
        Self { store, part_size }
    }

    #[cfg(test)]
    pub(crate) const fn store(&self) -> &S {
        &self.store
    }

    /// Whether `local_path` is already stored, unchanged, at the key
    /// `local_path` in `bucket`.
    ///
    /// # Errors
    ///
    /// See [`UploadDecider::decide`].
    pub async fn is_already_uploaded(
        &self,
        local_path: &Path,
        bucket: &str,
    ) -> Result<bool, UploadError> {
        self.decide(local_path, bucket)
            .await
            .map(|decision| decision.is_skip())
    }

    /// Compares `local_path` against the object at the same key in
    /// `bucket`.
    ///
    /// 1. A missing object, or one without a content length, must be
    ///    uploaded.
    /// 2. Sizes are compared first; a mismatch is logged as
    ///    `size-mismatch`.
    /// 3. With equal sizes the local MD5 (or multipart tag) is compared to
    ///    the unquoted remote `ETag`, logging `already-uploaded` or
    ///    `md5-mismatch`.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::InvalidKey`] if the path is not UTF-8,
    /// [`UploadError::Head`] if the metadata lookup fails for any reason
    /// other than "not found", and [`UploadError::Io`] if the local file
    /// cannot be opened or read.
    pub async fn decide(
        &self,
        local_path: &Path,
        bucket: &str,
    ) -> Result<UploadDecision, UploadError> {
        let target = target_for(local_path, bucket)?;

        let Some(remote) = self.store.head(&target).await? else {
            return Ok(UploadDecision::Upload(UploadReason::NotFound));
        };
        let Some(remote_size) = remote.size_bytes else {
            return Ok(UploadDecision::Upload(UploadReason::MissingContentLength));
        };

        let local_size = tokio::fs::File::open(local_path)
            .await?
            .metadata()
            .await?
            .len();
        if local_size != remote_size {
            log::info!("size-mismatch {}", local_path.display());
            return Ok(UploadDecision::Upload(UploadReason::SizeMismatch {
                local: local_size,
                remote: remote_size,
            }));
        }

        let digest = compute_digest(local_path, self.part_size).await?;
        if remote
            .unquoted_tag()
            .is_some_and(|tag| digest.matches_tag(&tag))
        {
            log::info!("already-uploaded {}", local_path.display());
            Ok(UploadDecision::Skip)
        } else {
            log::info!("md5-mismatch {}", local_path.display());
            Ok(UploadDecision::Upload(UploadReason::ChecksumMismatch))
        }
    }

    /// Uploads `local_path` to the key `local_path` in `bucket`.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::InvalidKey`] for non-UTF-8 paths,
    /// [`UploadError::Io`] on local read errors, and the store's error if
    /// any request fails.
    pub async fn upload(
        &self,
        local_path: &Path,
        bucket: &str,
        progress: Arc<dyn ProgressCallback>,
    ) -> Result<UploadOutcome, UploadError> {
        let target = target_for(local_path, bucket)?;
        upload::upload_file(&self.store, &target, local_path, self.part_size, progress).await
    }
}

/// Resolves a decision result into whether to upload.
///
/// Any error from the check collapses to "upload" and is logged.
#[must_use]
pub fn should_upload(result: &Result<UploadDecision, UploadError>) -> bool {
    match result {
        Ok(UploadDecision::Skip) => false,
        Ok(UploadDecision::Upload(reason)) => {
            log::debug!("upload needed: {reason}");
            true
        }
        Err(e) => {
            log::warn!("Upload check failed, uploading anyway: {e}");
            true
        }
    }
}

fn target_for(local_path: &Path, bucket: &str) -> Result<UploadTarget, UploadError> {
    UploadTarget::from_path(bucket, local_path).ok_or_else(|| UploadError::InvalidKey {
        path: local_path.to_path_buf(),
    })
}

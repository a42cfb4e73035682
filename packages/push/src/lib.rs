#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Upload a local file to S3 unless an identical object is already there.
//!
//! ## Smart skip
//!
//! Before uploading, the destination key is checked with `HeadObject` and
//! compared against the local file using **size + MD5/ETag**. Only when
//! both match is the upload skipped. The outcome of that check is an
//! [`UploadDecision`]; errors from the check are resolved by
//! [`should_upload`], which fails open.
//!
//! Objects written in parts carry a composite `ETag` (`<hex>-<parts>`)
//! rather than a plain MD5. The local digest computes the same composite
//! for [`PART_SIZE`], so objects uploaded by this crate are recognised.
//! Objects uploaded in parts of another size always compare as changed.
//!
//! ## Transfer
//!
//! Files up to one part go out as a single `PutObject`. Larger files use a
//! multipart upload with [`PART_SIZE`] parts, sent one at a time. A failed
//! part aborts the multipart upload.
//!
//! # Environment Variables
//!
//! Credentials and endpoint are resolved by the standard AWS chain
//! (`AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY`, `AWS_PROFILE`,
//! `AWS_ENDPOINT_URL`, instance roles). The region is always set
//! explicitly by [`store::S3Store::connect`].

use std::path::PathBuf;

pub mod decider;
pub mod digest;
pub mod progress;
pub mod run;
pub mod store;
pub mod upload;

#[cfg(test)]
mod memory;

pub use decider::{UploadDecider, should_upload};
pub use run::{PushOutcome, run};
pub use s3_push_models::{
    LocalFileDigest, RemoteObjectMetadata, StoredObject, UploadDecision, UploadOutcome,
    UploadReason, UploadTarget,
};

/// Size of each part in a multipart upload (64 MiB).
pub const PART_SIZE: u64 = 64 * 1024 * 1024;

/// Maximum number of parts S3 accepts in one multipart upload.
pub const MAX_PARTS: u64 = 10_000;

/// Errors that can occur while checking or uploading a file.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// The local path cannot be used as an object key.
    #[error("Path is not valid UTF-8 and cannot be used as a key: {}", path.display())]
    InvalidKey {
        /// Offending path.
        path: PathBuf,
    },

    /// Credentials could not be resolved for the S3 session.
    #[error("Failed to establish S3 session: {source}")]
    Session {
        /// Underlying credentials error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// S3 `HeadObject` failed for a reason other than "not found".
    #[error("Failed to head s3://{bucket}/{key}: {source}")]
    Head {
        /// Bucket name.
        bucket: String,
        /// Object key.
        key: String,
        /// Underlying SDK error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// S3 `PutObject` or one of the multipart calls failed.
    #[error("Failed to upload s3://{bucket}/{key}: {source}")]
    Upload {
        /// Bucket name.
        bucket: String,
        /// Object key.
        key: String,
        /// Underlying SDK error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// `CreateMultipartUpload` succeeded but returned no upload ID.
    #[error("No upload ID returned for s3://{bucket}/{key}")]
    MissingUploadId {
        /// Bucket name.
        bucket: String,
        /// Object key.
        key: String,
    },

    /// S3 `AbortMultipartUpload` failed.
    #[error("Failed to abort upload {upload_id} for s3://{bucket}/{key}: {source}")]
    Abort {
        /// Bucket name.
        bucket: String,
        /// Object key.
        key: String,
        /// Multipart upload ID.
        upload_id: String,
        /// Underlying SDK error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// I/O error reading the local file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl UploadError {
    /// Builds an [`UploadError::Upload`] for `target`.
    pub(crate) fn upload(
        target: &UploadTarget,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Upload {
            bucket: target.bucket().to_string(),
            key: target.key().to_string(),
            source: source.into(),
        }
    }
}

/// Part size actually used for a file of `size` bytes.
///
/// Grows past `part_size` only when the file would otherwise need more
/// than [`MAX_PARTS`] parts.
#[must_use]
pub const fn effective_part_size(size: u64, part_size: u64) -> u64 {
    let min = size.div_ceil(MAX_PARTS);
    if min > part_size { min } else { part_size }
}

/// Number of parts a file of `size` bytes is split into. At least 1.
#[must_use]
pub const fn part_count(size: u64, part_size: u64) -> u64 {
    if size == 0 {
        1
    } else {
        size.div_ceil(effective_part_size(size, part_size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn part_size_grows_only_past_part_limit() {
        assert_eq!(effective_part_size(10, PART_SIZE), PART_SIZE);
        assert_eq!(effective_part_size(PART_SIZE * MAX_PARTS, PART_SIZE), PART_SIZE);
        assert_eq!(
            effective_part_size(PART_SIZE * MAX_PARTS + 1, PART_SIZE),
            PART_SIZE + 1
        );
    }

    #[test]
    fn counts_parts() {
        assert_eq!(part_count(0, 4), 1);
        assert_eq!(part_count(4, 4), 1);
        assert_eq!(part_count(5, 4), 2);
        assert_eq!(part_count(12, 4), 3);
        assert!(part_count(PART_SIZE * MAX_PARTS * 2, PART_SIZE) <= MAX_PARTS);
    }
}

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Upload target, remote metadata, local digest, and decision types.
//!
//! These are plain data carriers shared between the upload logic in
//! `s3_push` and the CLI. Nothing here touches the network or the
//! filesystem.

use std::path::Path;

use serde::Serialize;

/// Destination of an upload: a bucket plus the object key.
///
/// The key is the local file path used verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadTarget {
    bucket: String,
    key: String,
}

impl UploadTarget {
    /// Creates a target from an explicit bucket and key.
    #[must_use]
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Creates a target whose key is `path` exactly as given.
    ///
    /// Returns `None` if the path is not valid UTF-8, since object keys
    /// are strings.
    #[must_use]
    pub fn from_path(bucket: impl Into<String>, path: &Path) -> Option<Self> {
        path.to_str().map(|key| Self::new(bucket, key))
    }

    /// Bucket name.
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Object key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl std::fmt::Display for UploadTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

/// Remote object metadata from `HeadObject`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteObjectMetadata {
    /// Content length in bytes, if the backend reported one.
    pub size_bytes: Option<u64>,
    /// `ETag` as returned by the backend, usually the quoted MD5 hex digest
    /// for objects that were not uploaded in parts.
    pub content_tag: Option<String>,
}

impl RemoteObjectMetadata {
    /// The content tag with every `"` removed.
    #[must_use]
    pub fn unquoted_tag(&self) -> Option<String> {
        self.content_tag.as_deref().map(|tag| tag.replace('"', ""))
    }
}

/// Size and checksums of a local file, computed fresh for each decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFileDigest {
    /// File size in bytes.
    pub size_bytes: u64,
    /// Lowercase hex MD5 of the full contents.
    pub checksum: String,
    /// S3-style composite tag (`<md5 of part md5s>-<parts>`) for the
    /// upload part size. Only present when the file spans more than one
    /// part.
    pub multipart_tag: Option<String>,
}

impl LocalFileDigest {
    /// Whether `tag` (already unquoted) identifies the same content.
    #[must_use]
    pub fn matches_tag(&self, tag: &str) -> bool {
        self.checksum == tag || self.multipart_tag.as_deref() == Some(tag)
    }
}

/// Why an upload has to happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UploadReason {
    /// No object exists at the destination key.
    NotFound,
    /// The object exists but carries no content length.
    MissingContentLength,
    /// Local and remote sizes differ.
    SizeMismatch {
        /// Local file size.
        local: u64,
        /// Remote content length.
        remote: u64,
    },
    /// Sizes match but the checksum does not match the remote tag.
    ChecksumMismatch,
}

impl std::fmt::Display for UploadReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => f.write_str("not found"),
            Self::MissingContentLength => f.write_str("no content length"),
            Self::SizeMismatch { local, remote } => {
                write!(f, "size mismatch (local {local}, remote {remote})")
            }
            Self::ChecksumMismatch => f.write_str("md5 mismatch"),
        }
    }
}

/// Outcome of the skip-upload check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UploadDecision {
    /// An identical object is already stored.
    Skip,
    /// The file must be uploaded.
    Upload(UploadReason),
}

impl UploadDecision {
    /// `true` for [`UploadDecision::Skip`].
    #[must_use]
    pub const fn is_skip(&self) -> bool {
        matches!(self, Self::Skip)
    }
}

/// Result of a completed upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadOutcome {
    /// Where the object was stored.
    pub target: UploadTarget,
    /// Bytes uploaded.
    pub size_bytes: u64,
    /// `ETag` of the stored object.
    pub e_tag: Option<String>,
    /// Version ID, when the bucket is versioned.
    pub version_id: Option<String>,
    /// Multipart upload ID; `None` for single-request uploads.
    pub upload_id: Option<String>,
    /// Number of parts sent (1 for single-request uploads).
    pub parts: u32,
}

impl std::fmt::Display for UploadOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({} bytes, {} part(s), etag {})",
            self.target,
            self.size_bytes,
            self.parts,
            self.e_tag.as_deref().unwrap_or("-")
        )?;
        if let Some(version) = &self.version_id {
            write!(f, ", version {version}")?;
        }
        Ok(())
    }
}

/// What a single store write returned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredObject {
    /// `ETag` of the written object or part.
    pub e_tag: Option<String>,
    /// Version ID, when the bucket is versioned.
    pub version_id: Option<String>,
}

//! Object store seam and its S3 implementation.

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::provider::ProvideCredentials as _;
use aws_sdk_s3::operation::head_object::HeadObjectError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use s3_push_models::{RemoteObjectMetadata, StoredObject, UploadTarget};

use crate::UploadError;

/// A part that has been uploaded and must be listed on completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedPart {
    /// 1-based part number.
    pub part_number: i32,
    /// `ETag` the backend returned for the part.
    pub e_tag: Option<String>,
}

/// The object storage operations the upload path needs.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch object metadata.
    ///
    /// Returns `Ok(None)` if the object doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::Head`] for any failure other than "not found".
    async fn head(
        &self,
        target: &UploadTarget,
    ) -> Result<Option<RemoteObjectMetadata>, UploadError>;

    /// Store `body` as the whole object in one request.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::Upload`] on failure.
    async fn put_object(
        &self,
        target: &UploadTarget,
        body: Vec<u8>,
    ) -> Result<StoredObject, UploadError>;

    /// Start a multipart upload and return its ID.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::Upload`] on failure, or
    /// [`UploadError::MissingUploadId`] if no ID came back.
    async fn create_multipart_upload(&self, target: &UploadTarget) -> Result<String, UploadError>;

    /// Upload one part.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::Upload`] on failure.
    async fn upload_part(
        &self,
        target: &UploadTarget,
        upload_id: &str,
        part_number: i32,
        body: Vec<u8>,
    ) -> Result<UploadedPart, UploadError>;

    /// Assemble the uploaded parts into the final object.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::Upload`] on failure.
    async fn complete_multipart_upload(
        &self,
        target: &UploadTarget,
        upload_id: &str,
        parts: Vec<UploadedPart>,
    ) -> Result<StoredObject, UploadError>;

    /// Discard a multipart upload and any parts already stored.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::Abort`] on failure.
    async fn abort_multipart_upload(
        &self,
        target: &UploadTarget,
        upload_id: &str,
    ) -> Result<(), UploadError>;
}

/// [`ObjectStore`] backed by `aws-sdk-s3`.
pub struct S3Store {
    client: aws_sdk_s3::Client,
}

impl S3Store {
    /// Wraps an existing client.
    #[must_use]
    pub const fn new(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }

    /// Loads AWS configuration with `region` forced, overriding whatever
    /// region the environment or profile would supply, and verifies that
    /// credentials can be resolved.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::Session`] if no credentials provider is
    /// configured or credentials cannot be resolved.
    pub async fn connect(region: &str) -> Result<Self, UploadError> {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;

        let provider = config
            .credentials_provider()
            .ok_or_else(|| UploadError::Session {
                source: "no credentials provider configured".into(),
            })?;
        provider
            .provide_credentials()
            .await
            .map_err(|e| UploadError::Session { source: Box::new(e) })?;

        log::debug!("S3 session ready in {region}");

        Ok(Self::new(aws_sdk_s3::Client::new(&config)))
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn head(
        &self,
        target: &UploadTarget,
    ) -> Result<Option<RemoteObjectMetadata>, UploadError> {
        let result = self
            .client
            .head_object()
            .bucket(target.bucket())
            .key(target.key())
            .send()
            .await;

        match result {
            Ok(output) => Ok(Some(RemoteObjectMetadata {
                size_bytes: output.content_length().and_then(|len| u64::try_from(len).ok()),
                content_tag: output.e_tag().map(str::to_string),
            })),
            Err(err) => {
                // NotFound means the object doesn't exist
                if err
                    .as_service_error()
                    .is_some_and(HeadObjectError::is_not_found)
                {
                    return Ok(None);
                }
                Err(UploadError::Head {
                    bucket: target.bucket().to_string(),
                    key: target.key().to_string(),
                    source: Box::new(err),
                })
            }
        }
    }

    async fn put_object(
        &self,
        target: &UploadTarget,
        body: Vec<u8>,
    ) -> Result<StoredObject, UploadError> {
        let output = self
            .client
            .put_object()
            .bucket(target.bucket())
            .key(target.key())
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| UploadError::upload(target, e))?;

        Ok(StoredObject {
            e_tag: output.e_tag().map(str::to_string),
            version_id: output.version_id().map(str::to_string),
        })
    }

    async fn create_multipart_upload(&self, target: &UploadTarget) -> Result<String, UploadError> {
        let output = self
            .client
            .create_multipart_upload()
            .bucket(target.bucket())
            .key(target.key())
            .send()
            .await
            .map_err(|e| UploadError::upload(target, e))?;

        output
            .upload_id()
            .map(str::to_string)
            .ok_or_else(|| UploadError::MissingUploadId {
                bucket: target.bucket().to_string(),
                key: target.key().to_string(),
            })
    }

    async fn upload_part(
        &self,
        target: &UploadTarget,
        upload_id: &str,
        part_number: i32,
        body: Vec<u8>,
    ) -> Result<UploadedPart, UploadError> {
        let output = self
            .client
            .upload_part()
            .bucket(target.bucket())
            .key(target.key())
            .upload_id(upload_id)
            .part_number(part_number)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| UploadError::upload(target, e))?;

        Ok(UploadedPart {
            part_number,
            e_tag: output.e_tag().map(str::to_string),
        })
    }

    async fn complete_multipart_upload(
        &self,
        target: &UploadTarget,
        upload_id: &str,
        parts: Vec<UploadedPart>,
    ) -> Result<StoredObject, UploadError> {
        let parts = parts
            .into_iter()
            .map(|part| {
                CompletedPart::builder()
                    .part_number(part.part_number)
                    .set_e_tag(part.e_tag)
                    .build()
            })
            .collect();

        let output = self
            .client
            .complete_multipart_upload()
            .bucket(target.bucket())
            .key(target.key())
            .upload_id(upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(parts))
                    .build(),
            )
            .send()
            .await
            .map_err(|e| UploadError::upload(target, e))?;

        Ok(StoredObject {
            e_tag: output.e_tag().map(str::to_string),
            version_id: output.version_id().map(str::to_string),
        })
    }

    async fn abort_multipart_upload(
        &self,
        target: &UploadTarget,
        upload_id: &str,
    ) -> Result<(), UploadError> {
        self.client
            .abort_multipart_upload()
            .bucket(target.bucket())
            .key(target.key())
            .upload_id(upload_id)
            .send()
            .await
            .map_err(|e| UploadError::Abort {
                bucket: target.bucket().to_string(),
                key: target.key().to_string(),
                upload_id: upload_id.to_string(),
                source: Box::new(e),
            })?;

        Ok(())
    }
}

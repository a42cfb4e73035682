//! In-memory [`ObjectStore`] used by tests.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use s3_push_models::{RemoteObjectMetadata, StoredObject, UploadTarget};

use crate::UploadError;
use crate::digest::multipart_tag;
use crate::store::{ObjectStore, UploadedPart};

/// Calls seen by the store, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Head,
    Put { len: usize },
    Create,
    Part { number: i32, len: usize },
    Complete { parts: usize },
    Abort,
}

#[derive(Default)]
struct Stored {
    data: Vec<u8>,
    e_tag: String,
}

#[derive(Default)]
struct State {
    objects: BTreeMap<String, Stored>,
    pending: BTreeMap<i32, Vec<u8>>,
    calls: Vec<Call>,
}

/// Keeps objects in a map and computes `ETag`s the way S3 does.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    /// Make `head` fail with a non-"not found" error.
    pub fail_head: bool,
    /// Report metadata without a content length.
    pub hide_content_length: bool,
    /// Fail the upload of this part number.
    pub fail_part: Option<i32>,
}

impl MemoryStore {
    /// Seeds `key` with `data`, tagged like a single-request upload.
    pub fn insert(&self, key: &str, data: &[u8]) {
        self.insert_tagged(key, data, &format!("\"{:x}\"", md5::compute(data)));
    }

    /// Seeds `key` with `data` and an explicit `ETag`.
    pub fn insert_tagged(&self, key: &str, data: &[u8], e_tag: &str) {
        self.state.lock().unwrap().objects.insert(
            key.to_string(),
            Stored {
                data: data.to_vec(),
                e_tag: e_tag.to_string(),
            },
        );
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.state
            .lock()
            .unwrap()
            .objects
            .get(key)
            .map(|o| o.data.clone())
    }

    fn record(&self, call: Call) {
        self.state.lock().unwrap().calls.push(call);
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn head(
        &self,
        target: &UploadTarget,
    ) -> Result<Option<RemoteObjectMetadata>, UploadError> {
        self.record(Call::Head);
        if self.fail_head {
            return Err(UploadError::Head {
                bucket: target.bucket().to_string(),
                key: target.key().to_string(),
                source: "access denied".into(),
            });
        }
        let state = self.state.lock().unwrap();
        Ok(state.objects.get(target.key()).map(|o| RemoteObjectMetadata {
            size_bytes: (!self.hide_content_length).then_some(o.data.len() as u64),
            content_tag: Some(o.e_tag.clone()),
        }))
    }

    async fn put_object(
        &self,
        target: &UploadTarget,
        body: Vec<u8>,
    ) -> Result<StoredObject, UploadError> {
        self.record(Call::Put { len: body.len() });
        let e_tag = format!("\"{:x}\"", md5::compute(&body));
        self.insert_tagged(target.key(), &body, &e_tag);
        Ok(StoredObject {
            e_tag: Some(e_tag),
            version_id: None,
        })
    }

    async fn create_multipart_upload(&self, _target: &UploadTarget) -> Result<String, UploadError> {
        self.record(Call::Create);
        self.state.lock().unwrap().pending.clear();
        Ok("upload-1".to_string())
    }

    async fn upload_part(
        &self,
        target: &UploadTarget,
        _upload_id: &str,
        part_number: i32,
        body: Vec<u8>,
    ) -> Result<UploadedPart, UploadError> {
        self.record(Call::Part {
            number: part_number,
            len: body.len(),
        });
        if self.fail_part == Some(part_number) {
            return Err(UploadError::upload(target, "connection reset"));
        }
        let e_tag = format!("\"{:x}\"", md5::compute(&body));
        self.state.lock().unwrap().pending.insert(part_number, body);
        Ok(UploadedPart {
            part_number,
            e_tag: Some(e_tag),
        })
    }

    async fn complete_multipart_upload(
        &self,
        target: &UploadTarget,
        _upload_id: &str,
        parts: Vec<UploadedPart>,
    ) -> Result<StoredObject, UploadError> {
        self.record(Call::Complete { parts: parts.len() });
        let pending = std::mem::take(&mut self.state.lock().unwrap().pending);
        let digests: Vec<md5::Digest> = pending.values().map(md5::compute).collect();
        let data: Vec<u8> = pending.into_values().flatten().collect();
        let e_tag = format!("\"{}\"", multipart_tag(&digests));
        self.insert_tagged(target.key(), &data, &e_tag);
        Ok(StoredObject {
            e_tag: Some(e_tag),
            version_id: Some("v1".to_string()),
        })
    }

    async fn abort_multipart_upload(
        &self,
        _target: &UploadTarget,
        _upload_id: &str,
    ) -> Result<(), UploadError> {
        self.record(Call::Abort);
        self.state.lock().unwrap().pending.clear();
        Ok(())
    }
}

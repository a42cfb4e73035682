//! The whole push: pre-check, decide, and upload when needed.

use std::path::Path;
use std::sync::Arc;

use s3_push_models::UploadOutcome;

use crate::progress::ProgressCallback;
use crate::store::ObjectStore;
use crate::{UploadDecider, UploadError, should_upload};

/// How a push ended.
#[derive(Debug)]
pub enum PushOutcome {
    /// An identical object was already stored; nothing was sent.
    Skipped,
    /// The file was uploaded.
    Uploaded(UploadOutcome),
    /// The upload was attempted and failed. Logged, not fatal.
    Failed(UploadError),
}

/// Fails if `local_path` cannot be opened. The handle is closed on return.
///
/// # Errors
///
/// Returns [`UploadError::Io`] with the open error.
pub fn ensure_readable(local_path: &Path) -> Result<(), UploadError> {
    std::fs::File::open(local_path).map_err(|e| {
        log::error!("Cannot open {}: {e}", local_path.display());
        UploadError::Io(e)
    })?;
    Ok(())
}

/// Pushes `local_path` to the key `local_path` in `bucket`.
///
/// The file is checked for readability before any store request. A
/// failing check falls through to an upload; a failing upload is logged
/// and reported as [`PushOutcome::Failed`].
///
/// # Errors
///
/// Returns [`UploadError::Io`] only if the local file cannot be opened up
/// front.
pub async fn run<S: ObjectStore>(
    decider: &UploadDecider<S>,
    local_path: &Path,
    bucket: &str,
    progress: Arc<dyn ProgressCallback>,
) -> Result<PushOutcome, UploadError> {
    ensure_readable(local_path)?;

    let decision = decider.decide(local_path, bucket).await;
    if let Ok(decision) = &decision {
        log_json("decision", decision);
    }
    if !should_upload(&decision) {
        progress.finish_and_clear();
        return Ok(PushOutcome::Skipped);
    }

    match decider.upload(local_path, bucket, progress.clone()).await {
        Ok(outcome) => {
            progress.finish(format!("uploaded {}", local_path.display()));
            log::info!("Uploaded {outcome}");
            log_json("outcome", &outcome);
            Ok(PushOutcome::Uploaded(outcome))
        }
        Err(e) => {
            progress.finish_and_clear();
            log::error!("Upload failed: {e}");
            Ok(PushOutcome::Failed(e))
        }
    }
}

fn log_json(label: &str, value: &impl serde::Serialize) {
    if log::log_enabled!(log::Level::Debug) {
        match serde_json::to_string(value) {
            Ok(json) => log::debug!("{label}: {json}"),
            Err(e) => log::debug!("{label}: <unserializable: {e}>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::memory::{Call, MemoryStore};
    use crate::progress::null_progress;

    const BUCKET: &str = "test-bucket";

    fn write_temp(name: &str, contents: &[u8]) -> PathBuf {
        let dir = std::env::temp_dir().join("s3_push_run_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[tokio::test]
    async fn identical_object_only_heads() {
        let path = write_temp("report.csv", b"0123456789");
        let store = MemoryStore::default();
        store.insert(path.to_str().unwrap(), b"0123456789");
        let decider = UploadDecider::new(store);

        let outcome = run(&decider, &path, BUCKET, null_progress()).await.unwrap();

        assert!(matches!(outcome, PushOutcome::Skipped));
        assert_eq!(decider.store().calls(), vec![Call::Head]);
    }

    #[tokio::test]
    async fn missing_object_is_uploaded() {
        let path = write_temp("fresh.csv", b"0123456789");
        let decider = UploadDecider::new(MemoryStore::default());

        let outcome = run(&decider, &path, BUCKET, null_progress()).await.unwrap();

        assert!(matches!(outcome, PushOutcome::Uploaded(ref o) if o.size_bytes == 10));
        assert_eq!(
            decider.store().calls(),
            vec![Call::Head, Call::Put { len: 10 }]
        );
    }

    #[tokio::test]
    async fn head_failure_still_uploads() {
        let path = write_temp("denied.csv", b"0123456789");
        let mut store = MemoryStore::default();
        store.fail_head = true;
        let decider = UploadDecider::new(store);

        let outcome = run(&decider, &path, BUCKET, null_progress()).await.unwrap();

        assert!(matches!(outcome, PushOutcome::Uploaded(_)));
        assert_eq!(
            decider.store().calls(),
            vec![Call::Head, Call::Put { len: 10 }]
        );
    }

    #[tokio::test]
    async fn unopenable_file_fails_before_any_request() {
        let path = std::env::temp_dir().join("s3_push_run_test/does-not-exist.csv");
        let decider = UploadDecider::new(MemoryStore::default());

        let result = run(&decider, &path, BUCKET, null_progress()).await;

        assert!(matches!(result, Err(UploadError::Io(_))));
        assert!(decider.store().calls().is_empty());
    }

    #[tokio::test]
    async fn failed_upload_is_reported_not_fatal() {
        let path = write_temp("flaky.bin", b"aaaabbbbcc");
        let mut store = MemoryStore::default();
        store.fail_part = Some(1);
        let decider = UploadDecider::with_part_size(store, 4);

        let outcome = run(&decider, &path, BUCKET, null_progress()).await.unwrap();

        assert!(matches!(
            outcome,
            PushOutcome::Failed(UploadError::Upload { .. })
        ));
        assert_eq!(
            decider.store().calls(),
            vec![
                Call::Head,
                Call::Create,
                Call::Part { number: 1, len: 4 },
                Call::Abort,
            ]
        );
    }
}

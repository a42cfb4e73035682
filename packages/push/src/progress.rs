//! Byte-level progress reporting for uploads.
//!
//! Defines a [`ProgressCallback`] trait that decouples progress reporting
//! from any rendering backend, and [`ProgressReader`], a pass-through
//! reader that feeds every chunk it reads into a callback.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, ReadBuf};

/// Trait for reporting progress from long-running operations.
///
/// Implementations must be `Send + Sync` to support `Arc`-based sharing.
pub trait ProgressCallback: Send + Sync {
    /// Set the total expected units of work (enables percentage/ETA).
    fn set_total(&self, total: u64);

    /// Advance progress by `delta` units.
    fn inc(&self, delta: u64);

    /// Mark progress as complete with a final message.
    fn finish(&self, msg: String);

    /// Mark progress as complete and remove the progress indicator.
    fn finish_and_clear(&self);
}

/// A no-op implementation of [`ProgressCallback`].
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn finish(&self, _msg: String) {}
    fn finish_and_clear(&self) {}
}

/// Returns a shared [`NullProgress`] instance for convenient use.
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}

/// Reader that passes bytes through unchanged and reports how many were
/// read.
pub struct ProgressReader<R> {
    inner: R,
    read: u64,
    progress: Arc<dyn ProgressCallback>,
}

impl<R> ProgressReader<R> {
    /// Wraps `inner`, reporting to `progress`.
    pub fn new(inner: R, progress: Arc<dyn ProgressCallback>) -> Self {
        Self {
            inner,
            read: 0,
            progress,
        }
    }

    /// Total bytes read so far.
    #[must_use]
    pub const fn bytes_read(&self) -> u64 {
        self.read
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for ProgressReader<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        let this = self.get_mut();
        let before = buf.filled().len();
        let poll = Pin::new(&mut this.inner).poll_read(cx, buf);
        if matches!(poll, Poll::Ready(Ok(()))) {
            let n = (buf.filled().len() - before) as u64;
            if n > 0 {
                this.read += n;
                this.progress.inc(n);
            }
        }
        poll
    }
}

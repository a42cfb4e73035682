//! Local file checksums.
//!
//! A single streaming pass produces both the whole-file MD5 and the
//! S3-style multipart tag for a given part size.

use std::io::Read as _;
use std::path::Path;

use s3_push_models::LocalFileDigest;

use crate::effective_part_size;

/// Read buffer size for hashing.
const CHUNK_SIZE: usize = 256 * 1024;

/// Compute the digest of a local file.
///
/// Runs the hashing on a blocking thread. The file is opened here and
/// closed before returning.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be opened or read.
pub async fn compute_digest(
    path: &Path,
    part_size: u64,
) -> Result<LocalFileDigest, std::io::Error> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || compute_digest_sync(&path, part_size))
        .await
        .map_err(std::io::Error::other)?
}

/// Synchronous digest computation (runs in blocking thread).
///
/// # Errors
///
/// Returns an I/O error if the file cannot be opened or read.
pub fn compute_digest_sync(
    path: &Path,
    part_size: u64,
) -> Result<LocalFileDigest, std::io::Error> {
    let mut file = std::fs::File::open(path)?;
    let part_size = effective_part_size(file.metadata()?.len(), part_size);

    let mut whole = md5::Context::new();
    let mut parts = PartHasher::new(part_size);
    let mut size = 0u64;
    let mut buffer = vec![0u8; CHUNK_SIZE];

    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        let chunk = &buffer[..n];
        whole.consume(chunk);
        parts.consume(chunk);
        size += n as u64;
    }

    Ok(LocalFileDigest {
        size_bytes: size,
        checksum: format!("{:x}", whole.finalize()),
        multipart_tag: parts.finish(),
    })
}

/// Hashes a byte stream as consecutive parts of a fixed size.
struct PartHasher {
    part_size: u64,
    current: md5::Context,
    filled: u64,
    digests: Vec<md5::Digest>,
}

impl PartHasher {
    fn new(part_size: u64) -> Self {
        Self {
            part_size,
            current: md5::Context::new(),
            filled: 0,
            digests: Vec::new(),
        }
    }

    fn consume(&mut self, mut chunk: &[u8]) {
        while !chunk.is_empty() {
            let room = usize::try_from(self.part_size - self.filled).unwrap_or(usize::MAX);
            let take = room.min(chunk.len());
            self.current.consume(&chunk[..take]);
            self.filled += take as u64;
            chunk = &chunk[take..];

            if self.filled == self.part_size {
                let done = std::mem::replace(&mut self.current, md5::Context::new());
                self.digests.push(done.finalize());
                self.filled = 0;
            }
        }
    }

    /// The composite tag, or `None` when everything fit in one part.
    fn finish(mut self) -> Option<String> {
        if self.filled > 0 {
            self.digests.push(self.current.finalize());
        }
        if self.digests.len() < 2 {
            return None;
        }
        Some(multipart_tag(&self.digests))
    }
}

/// `hex(md5(d1 ‖ d2 ‖ … ‖ dN))-N`, the tag S3 assigns to an object
/// assembled from parts with digests `d1..dN`.
#[must_use]
pub fn multipart_tag(part_digests: &[md5::Digest]) -> String {
    let mut context = md5::Context::new();
    for digest in part_digests {
        context.consume(digest.0);
    }
    format!("{:x}-{}", context.finalize(), part_digests.len())
}

//! sync::etag
//!
//! Content fingerprints compatible with the remote store's ETag scheme.
//!
//! # Scheme
//!
//! Objects uploaded in a single part carry the MD5 of their content as
//! the ETag. Objects uploaded in multiple parts carry the MD5 of the
//! concatenated per-part MD5 digests, suffixed with `-{parts}`. The
//! planner computes the same fingerprint locally, so a local file and
//! its remote object compare consistently whichever way the object was
//! originally uploaded.
//!
//! Stores quote ETags in listings; [`etags_match`] strips the quotes
//! before comparing.

use std::io;
use std::path::Path;

use md5::{Digest, Md5};

/// Part size the store splits multipart uploads at.
pub const DEFAULT_PART_SIZE: u64 = 8 * 1024 * 1024;

/// Fingerprint a byte slice under the given part size.
pub fn fingerprint_bytes(data: &[u8], part_size: u64) -> String {
    let part_size = part_size.max(1) as usize;
    if data.len() <= part_size {
        return hex::encode(Md5::digest(data));
    }

    let mut combined = Md5::new();
    let mut parts = 0usize;
    for chunk in data.chunks(part_size) {
        combined.update(Md5::digest(chunk));
        parts += 1;
    }
    format!("{}-{}", hex::encode(combined.finalize()), parts)
}

/// Fingerprint a file on disk under the given part size.
pub async fn fingerprint_file(path: &Path, part_size: u64) -> io::Result<String> {
    let data = tokio::fs::read(path).await?;
    Ok(fingerprint_bytes(&data, part_size))
}

/// Compare two ETags, ignoring surrounding quotes.
pub fn etags_match(a: &str, b: &str) -> bool {
    a.trim_matches('"') == b.trim_matches('"')
}

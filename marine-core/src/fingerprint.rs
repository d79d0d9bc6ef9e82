//! Content fingerprinting.
//!
//! A fingerprint is the hex-encoded MD5 digest of a file's full byte stream.
//! It is a pure function of the bytes and is used as a content identity proxy,
//! not as a security primitive.

use md5::{Digest, Md5};

/// Length of a hex-encoded fingerprint.
pub const FINGERPRINT_HEX_LEN: usize = 32;

/// Compute the fingerprint of an in-memory buffer.
pub fn fingerprint(data: &[u8]) -> String {
    let mut hasher = Fingerprinter::new();
    hasher.update(data);
    hasher.finalize()
}

/// Incremental fingerprinter for content read in chunks.
///
/// Feeding the same bytes in any chunking produces the same digest as
/// [`fingerprint`] over the concatenation.
#[derive(Clone, Default)]
pub struct Fingerprinter {
    hasher: Md5,
    bytes_seen: u64,
}

impl Fingerprinter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next chunk of content.
    pub fn update(&mut self, chunk: &[u8]) {
        self.hasher.update(chunk);
        self.bytes_seen += chunk.len() as u64;
    }

    /// Number of bytes hashed so far.
    pub fn bytes_seen(&self) -> u64 {
        self.bytes_seen
    }

    /// Consume the fingerprinter and return the lowercase hex digest.
    pub fn finalize(self) -> String {
        hex::encode(self.hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_digest() {
        assert_eq!(fingerprint(b""), "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn test_known_digest() {
        assert_eq!(
            fingerprint(b"The quick brown fox jumps over the lazy dog"),
            "9e107d9d372bb6826bd81d3542a419d6"
        );
    }

    #[test]
    fn test_deterministic_across_calls() {
        let data = vec![7u8; 64 * 1024];
        let first = fingerprint(&data);
        for _ in 0..3 {
            assert_eq!(fingerprint(&data), first);
        }
        assert_eq!(first.len(), FINGERPRINT_HEX_LEN);
    }

    #[test]
    fn test_chunking_does_not_change_digest() {
        let data: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();

        let mut hasher = Fingerprinter::new();
        for chunk in data.chunks(333) {
            hasher.update(chunk);
        }
        assert_eq!(hasher.bytes_seen(), data.len() as u64);
        assert_eq!(hasher.finalize(), fingerprint(&data));
    }

    #[test]
    fn test_single_byte_change_changes_digest() {
        let a = b"video-bytes-0".to_vec();
        let mut b = a.clone();
        b[12] = b'1';
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }
}

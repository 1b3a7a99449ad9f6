// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Evidence integrity: streaming SHA-256 + SHA-512 over the plaintext.
//
// Digests are always computed before encryption so that they describe what
// was captured, not how it is stored.

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use custodia_core::error::Result;
use custodia_core::types::DigestPair;
use sha2::{Digest, Sha256, Sha512};
use tracing::{debug, instrument};

/// Default read chunk, matching `CoreConfig::hash_chunk_size`.
pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024;

/// Compute both digests in one pass over `reader`, reading at most
/// `chunk_size` bytes at a time.
///
/// Memory use is bounded by `chunk_size` regardless of input length. Any
/// read error aborts the computation; a partial digest is never returned.
pub fn compute_digests<R: Read>(mut reader: R, chunk_size: usize) -> Result<DigestPair> {
    let mut sha256 = Sha256::new();
    let mut sha512 = Sha512::new();
    let mut buf = vec![0u8; chunk_size.max(1)];
    let mut total: u64 = 0;

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        sha256.update(&buf[..n]);
        sha512.update(&buf[..n]);
        total += n as u64;
    }

    debug!(bytes = total, "digests computed");
    Ok(DigestPair {
        sha256: hex::encode(sha256.finalize()),
        sha512: hex::encode(sha512.finalize()),
    })
}

/// Compute both digests of the file at `path`.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn compute_file_digests(path: impl AsRef<Path>, chunk_size: usize) -> Result<DigestPair> {
    let file = File::open(path.as_ref())?;
    compute_digests(file, chunk_size)
}

/// Compute both digests of an in-memory buffer.
pub fn digest_bytes(data: &[u8]) -> DigestPair {
    DigestPair {
        sha256: hash_bytes(data),
        sha512: hex::encode(Sha512::digest(data)),
    }
}

/// SHA-256 of `data` as a lowercase hex string.
pub fn hash_bytes(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Cursor};

    /// SHA-256 of the empty byte slice (well-known constant).
    const EMPTY_SHA256: &str =
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    /// SHA-512 of the empty byte slice.
    const EMPTY_SHA512: &str = "cf83e1357eefb8bdf1542850d66d8007d620e4050b5715dc83f4a921d36ce9ce\
                                47d0d13c5d85f2b0ff8318d2877eec2f63b931bd47417a81a538327af927da3e";

    #[test]
    fn hash_empty_input() {
        let pair = compute_digests(Cursor::new(b""), DEFAULT_CHUNK_SIZE).unwrap();
        assert_eq!(pair.sha256, EMPTY_SHA256);
        assert_eq!(pair.sha512, EMPTY_SHA512);
    }

    #[test]
    fn hash_known_value() {
        // SHA-256("hello"), checked against coreutils sha256sum.
        let expected = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";
        assert_eq!(hash_bytes(b"hello"), expected);
    }

    #[test]
    fn chunk_size_does_not_change_digest() {
        let data: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();
        let a = compute_digests(Cursor::new(&data), 7).unwrap();
        let b = compute_digests(Cursor::new(&data), DEFAULT_CHUNK_SIZE).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, digest_bytes(&data));
    }

    #[test]
    fn deterministic_across_runs() {
        let a = digest_bytes(b"evidence01");
        let b = digest_bytes(b"evidence01");
        assert_eq!(a, b);
        assert_eq!(a.sha256.len(), 64);
        assert_eq!(a.sha512.len(), 128);
    }

    struct FailingReader {
        served: bool,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.served {
                Err(io::Error::new(io::ErrorKind::UnexpectedEof, "device removed"))
            } else {
                self.served = true;
                buf[0] = 1;
                Ok(1)
            }
        }
    }

    #[test]
    fn read_failure_yields_no_digest() {
        let result = compute_digests(FailingReader { served: false }, 4);
        assert!(matches!(result, Err(custodia_core::CustodiaError::Io(_))));
    }
}

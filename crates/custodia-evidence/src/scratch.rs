// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scoped plaintext scratch files.
//
// A `DecryptedScratch` owns a temporary file holding decrypted evidence. The
// file is deleted when the value is dropped, which covers success, mismatch,
// early return via `?`, and unwinding alike.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use custodia_core::error::Result;
use tempfile::NamedTempFile;
use tracing::debug;

const PREFIX: &str = "custodia-";

#[derive(Debug)]
pub struct DecryptedScratch {
    file: NamedTempFile,
    len: u64,
}

impl DecryptedScratch {
    /// Write `plaintext` to a fresh temporary file in the system temp dir.
    ///
    /// `suffix` (e.g. `.pdf`) lets external tools recognise the format.
    pub fn create(plaintext: &[u8], suffix: &str) -> Result<Self> {
        let mut file = tempfile::Builder::new()
            .prefix(PREFIX)
            .suffix(suffix)
            .tempfile()?;
        file.write_all(plaintext)?;
        file.as_file().sync_all()?;

        debug!(path = %file.path().display(), len = plaintext.len(), "scratch file created");
        Ok(Self {
            file,
            len: plaintext.len() as u64,
        })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// A fresh read handle positioned at the start.
    pub fn reopen(&self) -> Result<File> {
        Ok(self.file.reopen()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn contents_and_cleanup() {
        let scratch = DecryptedScratch::create(b"evidence01", ".txt").unwrap();
        let path = scratch.path().to_path_buf();
        assert!(path.exists());
        assert!(path.to_string_lossy().ends_with(".txt"));
        assert_eq!(scratch.len(), 10);

        let mut buf = String::new();
        scratch.reopen().unwrap().read_to_string(&mut buf).unwrap();
        assert_eq!(buf, "evidence01");

        drop(scratch);
        assert!(!path.exists());
    }

    #[test]
    fn removed_on_early_return() {
        fn failing(path_out: &mut Option<std::path::PathBuf>) -> Result<()> {
            let scratch = DecryptedScratch::create(b"x", "")?;
            *path_out = Some(scratch.path().to_path_buf());
            Err(custodia_core::CustodiaError::Crypto("simulated".into()))
        }

        let mut path = None;
        assert!(failing(&mut path).is_err());
        assert!(!path.unwrap().exists());
    }
}

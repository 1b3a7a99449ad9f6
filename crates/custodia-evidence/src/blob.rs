// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// On-disk blob directory. Blobs are written once with `create_new` and
// fsynced; nothing here overwrites an existing file.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use custodia_core::error::{CustodiaError, Result};
use tracing::{debug, info, instrument, warn};

use crate::classify::secure_filename;

/// Suffix of encrypted blobs.
pub const ENCRYPTED_SUFFIX: &str = ".enc";

/// Attempts at a de-duplicated name before giving up.
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// `<case_number>_<YYYYmmdd_HHMMSS>_<safe_name>`, without suffix.
pub fn stored_stem(case_number: &str, at: &DateTime<Utc>, safe_name: &str) -> String {
    format!(
        "{}_{}_{}",
        secure_filename(case_number),
        at.format("%Y%m%d_%H%M%S"),
        safe_name
    )
}

pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    /// Use `root` as the blob directory, creating it if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Write `bytes` to a new file named `<stem><suffix>`, adding `-N` to the
    /// stem if that name is taken. Returns the final file name and path.
    #[instrument(skip(self, bytes), fields(len = bytes.len()))]
    pub fn write_new(&self, stem: &str, suffix: &str, bytes: &[u8]) -> Result<(String, PathBuf)> {
        for attempt in 0..MAX_NAME_ATTEMPTS {
            let name = if attempt == 0 {
                format!("{stem}{suffix}")
            } else {
                format!("{stem}-{attempt}{suffix}")
            };
            let path = self.root.join(&name);

            let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(f) => f,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            };
            if let Err(e) = file.write_all(bytes).and_then(|()| file.sync_all()) {
                drop(file);
                let _ = fs::remove_file(&path);
                return Err(e.into());
            }

            info!(blob = %name, "blob written");
            return Ok((name, path));
        }

        Err(CustodiaError::Io(std::io::Error::new(
            ErrorKind::AlreadyExists,
            format!("no free blob name for {stem}{suffix}"),
        )))
    }

    pub fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let bytes = fs::read(path)?;
        debug!(path = %path.display(), len = bytes.len(), "blob read");
        Ok(bytes)
    }

    /// Remove a blob written by a request that did not complete.
    pub fn discard(&self, path: &Path) {
        match fs::remove_file(path) {
            Ok(()) => debug!(path = %path.display(), "orphan blob removed"),
            Err(e) => warn!(path = %path.display(), error = %e, "failed to remove orphan blob"),
        }
    }
}

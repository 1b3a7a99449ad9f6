// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Engine configuration and externally supplied secrets.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{CustodiaError, Result};

/// Name of the JSON settings file inside the data directory.
pub const CONFIG_FILE: &str = "config.json";

/// Environment variable holding the 64-hex-character evidence key.
pub const EVIDENCE_KEY_VAR: &str = "CUSTODIA_EVIDENCE_KEY";
/// Environment variable holding the application secret used for ledger signing.
pub const SECRET_KEY_VAR: &str = "CUSTODIA_SECRET_KEY";

/// Persistent engine settings. Secrets never live here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Root directory for the database and encrypted blobs.
    pub data_dir: PathBuf,
    /// Subdirectory of `data_dir` holding encrypted blobs.
    pub evidence_subdir: String,
    /// SQLite database file inside `data_dir`.
    pub database_file: String,
    /// Upload size ceiling in bytes.
    pub max_upload_bytes: u64,
    /// Read chunk used when hashing.
    pub hash_chunk_size: usize,
    /// Recorded when the uploader does not name an acquisition method.
    pub default_acquisition_method: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            evidence_subdir: "evidence".into(),
            database_file: "custodia.db".into(),
            max_upload_bytes: 500 * 1024 * 1024,
            hash_chunk_size: 8 * 1024,
            default_acquisition_method: "Direct upload".into(),
        }
    }
}

impl CoreConfig {
    /// Settings rooted at `data_dir`, everything else default.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Load settings: `config.json` in the data dir if present, then
    /// environment overrides.
    pub fn load() -> Result<Self> {
        let base = match std::env::var("CUSTODIA_DATA_DIR") {
            Ok(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
            _ => default_data_dir(),
        };

        let mut config = match Self::read_file(&base)? {
            Some(c) => c,
            None => Self::with_data_dir(&base),
        };
        config.data_dir = base;

        if let Ok(raw) = std::env::var("CUSTODIA_MAX_UPLOAD_BYTES") {
            config.max_upload_bytes = raw.trim().parse().map_err(|_| {
                CustodiaError::Config(format!("CUSTODIA_MAX_UPLOAD_BYTES is not a byte count: {raw:?}"))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Read `config.json` from `dir`, returning `None` if it does not exist.
    pub fn read_file(dir: &Path) -> Result<Option<Self>> {
        let path = dir.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let data = std::fs::read_to_string(&path)?;
        let config = serde_json::from_str(&data)?;
        debug!(path = %path.display(), "configuration file loaded");
        Ok(Some(config))
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_upload_bytes == 0 {
            return Err(CustodiaError::Config("max_upload_bytes must be positive".into()));
        }
        if self.hash_chunk_size == 0 {
            return Err(CustodiaError::Config("hash_chunk_size must be positive".into()));
        }
        Ok(())
    }

    pub fn evidence_dir(&self) -> PathBuf {
        self.data_dir.join(&self.evidence_subdir)
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_file)
    }
}

fn default_data_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(xdg).join("custodia");
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".local")
            .join("share")
            .join("custodia");
    }
    warn!("neither XDG_DATA_HOME nor HOME set; using temp dir for data");
    std::env::temp_dir().join("custodia")
}

/// Key material supplied from outside the engine.
///
/// The engine never generates, rotates, or persists either value.
#[derive(Clone)]
pub struct Secrets {
    /// 64 hex characters (256 bits).
    pub evidence_key_hex: String,
    /// Application secret from which the timestamp signing key is derived.
    pub app_secret: String,
}

impl Secrets {
    pub fn new(evidence_key_hex: impl Into<String>, app_secret: impl Into<String>) -> Self {
        Self {
            evidence_key_hex: evidence_key_hex.into(),
            app_secret: app_secret.into(),
        }
    }

    /// Read both secrets from the environment. Absence is fatal.
    pub fn from_env() -> Result<Self> {
        let evidence_key_hex = required_env(EVIDENCE_KEY_VAR)?;
        let app_secret = required_env(SECRET_KEY_VAR)?;
        Ok(Self {
            evidence_key_hex,
            app_secret,
        })
    }
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secrets")
            .field("evidence_key_hex", &"<redacted>")
            .field("app_secret", &"<redacted>")
            .finish()
    }
}

fn required_env(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v.trim().to_owned()),
        _ => Err(CustodiaError::Config(format!("{name} is not set"))),
    }
}

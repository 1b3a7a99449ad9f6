// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Custodia.
//
// Every integrity-related variant carries the evidence id and the values that
// disagreed, so an investigator can file the error itself as a record of
// possible tampering.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level error type for all Custodia operations.
#[derive(Debug, Error)]
pub enum CustodiaError {
    // -- Configuration --
    #[error("configuration error: {0}")]
    Config(String),

    // -- Upload gating --
    #[error("upload rejected: {0}")]
    Validation(#[from] ValidationError),

    // -- Tamper evidence --
    #[error("integrity failure: {0}")]
    Integrity(#[from] IntegrityError),

    #[error("immutable record violation on {table}: {detail}")]
    ImmutableRecordViolation { table: String, detail: String },

    // -- Lookup --
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    // -- Cryptographic plumbing --
    #[error("cryptographic operation failed: {0}")]
    Crypto(String),

    // -- Storage / persistence --
    #[error("database error: {0}")]
    Database(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CustodiaError {
    /// Whether this error should be treated as potential evidence of
    /// tampering rather than an operational fault.
    pub fn is_tamper_evidence(&self) -> bool {
        matches!(
            self,
            Self::Integrity(_) | Self::ImmutableRecordViolation { .. }
        )
    }
}

/// Reasons an upload is refused before any hashing or encryption happens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no filename supplied")]
    MissingFilename,

    #[error("file is empty")]
    EmptyFile,

    #[error("file too large: {size} bytes (max: {max})")]
    TooLarge { size: u64, max: u64 },

    #[error("case {case_number} has no validated legitimacy")]
    LegitimacyNotValidated { case_number: String },

    #[error("case {case_number} has a detected crime that has not been reported")]
    UnreportedCrime { case_number: String },
}

/// Authentication-tag and digest failures.
///
/// These are never corrected or retried internally; callers record them in
/// the chain of custody and surface them to a human.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntegrityError {
    #[error(
        "authentication tag mismatch for {} ({blob_len} byte blob): wrong key or corrupted ciphertext",
        .evidence_id.as_deref().unwrap_or("unattributed blob")
    )]
    AuthenticationFailed {
        evidence_id: Option<String>,
        blob_len: usize,
    },

    #[error(
        "blob for {} is {blob_len} bytes, shorter than nonce plus tag",
        .evidence_id.as_deref().unwrap_or("unattributed blob")
    )]
    TruncatedBlob {
        evidence_id: Option<String>,
        blob_len: usize,
    },

    #[error(
        "digest mismatch for evidence {evidence_id} at {checked_at}: \
         sha256 expected {expected_sha256}, computed {computed_sha256}; \
         sha512 expected {expected_sha512}, computed {computed_sha512}"
    )]
    DigestMismatch {
        evidence_id: String,
        expected_sha256: String,
        computed_sha256: String,
        expected_sha512: String,
        computed_sha512: String,
        checked_at: DateTime<Utc>,
    },

    /// A ledger row whose stored columns no longer decode. The table refuses
    /// updates, so this only happens through out-of-band edits.
    #[error("{table} entry {entry_id} no longer decodes: {detail}")]
    CorruptLedgerRecord {
        table: String,
        entry_id: String,
        detail: String,
    },
}

impl IntegrityError {
    /// Attach an evidence id to a blob-level failure raised before the
    /// caller knew which item it belonged to.
    pub fn for_evidence(self, id: impl Into<String>) -> Self {
        match self {
            Self::AuthenticationFailed { blob_len, .. } => Self::AuthenticationFailed {
                evidence_id: Some(id.into()),
                blob_len,
            },
            Self::TruncatedBlob { blob_len, .. } => Self::TruncatedBlob {
                evidence_id: Some(id.into()),
                blob_len,
            },
            other => other,
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, CustodiaError>;

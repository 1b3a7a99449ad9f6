// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! custodia-evidence — evidence lifecycle on top of custodia-security.
//!
//! Upload gating and classification, the SQLite evidence record store, the
//! on-disk blob directory, scoped plaintext scratch files, and the services
//! that tie each state change to an explicit ledger append.

pub mod blob;
pub mod classify;
pub mod scratch;
pub mod service;
pub mod store;
pub mod validate;
pub mod verification;

pub use classify::{classify_type, guess_mime, secure_filename};
pub use scratch::DecryptedScratch;
pub use service::{AccessKind, EvidenceService, ExtractionRequest, ExtractionStatus, UploadDetails};
pub use store::{EvidenceMetadata, EvidenceStats, EvidenceStore};
pub use validate::validate_upload;
pub use verification::VerificationService;

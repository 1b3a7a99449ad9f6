// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! custodia-security — cryptographic foundation of the evidence engine.
//!
//! Dual SHA-256/SHA-512 digests over plaintext, AES-256-GCM blob encryption,
//! the internal timestamp authority that hashes and signs ledger records, and
//! the append-only SQLite ledgers for chain of custody and audit events.

pub mod encryption;
pub mod integrity;
pub mod ledger;
pub mod timestamp;

pub use encryption::{EncryptedBlob, EncryptionEngine, EvidenceKey};
pub use integrity::{compute_digests, compute_file_digests, digest_bytes, hash_bytes};
pub use ledger::{AuditLedger, CustodyLedger, Ledger, LedgerReport, db_err};
pub use timestamp::{SignatureCheck, SignedRecord, TimestampAuthority, VerifyFailure};

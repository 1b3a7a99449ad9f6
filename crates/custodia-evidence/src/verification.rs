// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Verification service: decrypt to a scoped scratch file, re-hash, compare
// with the digests recorded at upload, update status, and record the run in
// the chain of custody.
//
// Outcomes:
//   digests match          -> Ok(verified = true),  HASH_VERIFIED match = true
//   digests differ         -> Ok(verified = false), HASH_VERIFIED match = false,
//                             EVIDENCE_INTEGRITY_FAILED audit entry
//   authentication failure -> same as "digests differ", computed = None
//   I/O failure            -> Err, HASH_VERIFIED with hash_verified = false,
//                             status left unchanged
//
// Ledger entries are appended before the status update, so a failing status
// write never leaves a completed run unrecorded.
//
// Failures are never retried or corrected here.

use std::path::Path;

use chrono::{SubsecRound, Utc};
use custodia_core::error::{CustodiaError, IntegrityError, Result};
use custodia_core::types::{
    Actor, AuditAction, AuditDraft, CustodyAction, CustodyDraft, DigestPair, EvidenceItem,
    HashCheck, RequestContext, VerificationResult,
};
use custodia_security::{AuditLedger, CustodyLedger, EncryptionEngine, compute_file_digests};
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::blob::BlobStore;
use crate::scratch::DecryptedScratch;
use crate::store::EvidenceStore;

pub struct VerificationService<'a> {
    engine: &'a EncryptionEngine,
    store: &'a EvidenceStore,
    custody: &'a CustodyLedger,
    audit: &'a AuditLedger,
    blobs: &'a BlobStore,
    chunk_size: usize,
}

impl<'a> VerificationService<'a> {
    pub fn new(
        engine: &'a EncryptionEngine,
        store: &'a EvidenceStore,
        custody: &'a CustodyLedger,
        audit: &'a AuditLedger,
        blobs: &'a BlobStore,
        chunk_size: usize,
    ) -> Self {
        Self {
            engine,
            store,
            custody,
            audit,
            blobs,
            chunk_size,
        }
    }

    /// Decrypt `item` into a scratch file that is removed when dropped.
    ///
    /// Unencrypted items are copied so callers always own a disposable file.
    pub fn decrypt_to_scratch(&self, item: &EvidenceItem) -> Result<DecryptedScratch> {
        let suffix = Path::new(&item.original_filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{e}"))
            .unwrap_or_default();

        let stored = self.blobs.read(Path::new(&item.blob_path))?;
        if !item.is_encrypted() {
            return DecryptedScratch::create(&stored, &suffix);
        }

        let plaintext = self.engine.decrypt(&stored).map_err(|e| match e {
            CustodiaError::Integrity(i) => CustodiaError::Integrity(i.for_evidence(item.id.to_string())),
            other => other,
        })?;
        DecryptedScratch::create(&plaintext, &suffix)
    }

    /// Digests of the item's current plaintext.
    fn recompute(&self, item: &EvidenceItem) -> Result<DigestPair> {
        if !item.is_encrypted() {
            return compute_file_digests(&item.blob_path, self.chunk_size);
        }
        let scratch = self.decrypt_to_scratch(item)?;
        compute_file_digests(scratch.path(), self.chunk_size)
    }

    /// Verify one item and record the run.
    #[instrument(skip_all, fields(evidence_id = %item.id, actor = %actor.id))]
    pub fn verify(
        &self,
        item: &EvidenceItem,
        actor: &Actor,
        context: &RequestContext,
    ) -> Result<VerificationResult> {
        let checked_at = Utc::now().trunc_subsecs(6);

        let (computed, failure) = match self.recompute(item) {
            Ok(computed) => {
                let failure = (!item.digests.matches(&computed)).then(|| {
                    IntegrityError::DigestMismatch {
                        evidence_id: item.id.to_string(),
                        expected_sha256: item.digests.sha256.clone(),
                        computed_sha256: computed.sha256.clone(),
                        expected_sha512: item.digests.sha512.clone(),
                        computed_sha512: computed.sha512.clone(),
                        checked_at,
                    }
                });
                (Some(computed), failure)
            }
            Err(CustodiaError::Integrity(e)) => (None, Some(e)),
            Err(e) => {
                warn!(error = %e, "verification could not run");
                self.custody.append(
                    CustodyDraft::new(item.id, CustodyAction::HashVerified, actor.id)
                        .with_context(context.clone())
                        .with_hash_check(HashCheck::aborted())
                        .with_notes(format!("Integrity verification aborted: {e}")),
                )?;
                return Err(e);
            }
        };

        let (sha256_match, sha512_match) = match &computed {
            Some(c) => item.digests.compare(c),
            None => (false, false),
        };
        let verified = failure.is_none();

        let entry = self.custody.append(
            CustodyDraft::new(item.id, CustodyAction::HashVerified, actor.id)
                .with_context(context.clone())
                .with_hash_check(HashCheck::completed(verified, computed.as_ref()))
                .with_notes("Integrity verification performed"),
        )?;

        if let Some(failure) = &failure {
            warn!(%failure, "evidence integrity verification failed");
            self.audit.append(
                AuditDraft::new(AuditAction::EvidenceIntegrityFailed, "evidence")
                    .on(item.id)
                    .by(actor)
                    .with_context(context.clone())
                    .with_description(format!(
                        "Integrity verification FAILED for evidence {}",
                        item.stored_filename
                    ))
                    .with_extra(json!({
                        "failure": failure.to_string(),
                        "sha256_match": sha256_match,
                        "sha512_match": sha512_match,
                        "custody_entry": entry.id.to_string(),
                    })),
            )?;
        } else {
            info!("evidence integrity verified");
        }

        self.store.record_verification(&item.id, verified, &checked_at)?;

        Ok(VerificationResult {
            evidence_id: item.id,
            verified,
            sha256_match,
            sha512_match,
            computed,
            failure,
            checked_at,
            custody_entry: entry.id,
        })
    }
}

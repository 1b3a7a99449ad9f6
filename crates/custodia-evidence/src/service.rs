// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Evidence workflow: upload, access logging, soft delete, plaintext hand-off,
// and verification, each followed by explicit ledger appends.
//
// Every `EvidenceService` owns its own database connections. Open one per
// worker thread; they share the database file and blob directory.

use std::fs::File;
use std::io::{Cursor, Read};
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use custodia_core::config::{CoreConfig, Secrets};
use custodia_core::error::Result;
use custodia_core::types::{
    AcquisitionInfo, Actor, AuditAction, AuditDraft, CaseContext, CaseId, ChainOfCustodyEntry,
    CustodyAction, CustodyDraft, EntryId, EvidenceId, EvidenceItem, HashCheck, RequestContext,
    VerificationResult,
};
use custodia_security::{
    AuditLedger, CustodyLedger, EncryptionEngine, TimestampAuthority, compute_digests,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::blob::{BlobStore, ENCRYPTED_SUFFIX, stored_stem};
use crate::classify::{classify_type, guess_mime, secure_filename};
use crate::scratch::DecryptedScratch;
use crate::store::{EvidenceMetadata, EvidenceStats, EvidenceStore};
use crate::validate::validate_upload;
use crate::verification::VerificationService;

/// Read-only interactions a caller may log against an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessKind {
    Viewed,
    Downloaded,
    Previewed,
}

impl From<AccessKind> for CustodyAction {
    fn from(kind: AccessKind) -> Self {
        match kind {
            AccessKind::Viewed => CustodyAction::Viewed,
            AccessKind::Downloaded => CustodyAction::Downloaded,
            AccessKind::Previewed => CustodyAction::Previewed,
        }
    }
}

/// Optional details an uploader may attach.
#[derive(Debug, Clone, Default)]
pub struct UploadDetails {
    pub description: Option<String>,
    pub acquisition: AcquisitionInfo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStatus {
    /// Handed to the external task facility; results arrive as ledger entries.
    Pending,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionRequest {
    pub evidence_id: EvidenceId,
    pub status: ExtractionStatus,
    pub custody_entry: EntryId,
}

pub struct EvidenceService {
    config: CoreConfig,
    engine: EncryptionEngine,
    store: EvidenceStore,
    custody: CustodyLedger,
    audit: AuditLedger,
    blobs: BlobStore,
}

impl EvidenceService {
    /// Open the database and blob directory named by `config`.
    ///
    /// Fails with a configuration error before touching the disk if either
    /// secret is missing or malformed.
    #[instrument(skip_all, fields(data_dir = %config.data_dir.display()))]
    pub fn open(config: CoreConfig, secrets: &Secrets) -> Result<Self> {
        config.validate()?;
        let engine = EncryptionEngine::from_secrets(secrets)?;
        let authority = Arc::new(TimestampAuthority::from_secrets(secrets)?);

        std::fs::create_dir_all(&config.data_dir)?;
        let db_path = config.database_path();
        let store = EvidenceStore::open(&db_path)?;
        let custody = CustodyLedger::open(&db_path, Arc::clone(&authority))?;
        let audit = AuditLedger::open(&db_path, authority)?;
        let blobs = BlobStore::open(config.evidence_dir())?;

        info!("evidence service ready");
        Ok(Self {
            config,
            engine,
            store,
            custody,
            audit,
            blobs,
        })
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn store(&self) -> &EvidenceStore {
        &self.store
    }

    pub fn custody(&self) -> &CustodyLedger {
        &self.custody
    }

    pub fn audit(&self) -> &AuditLedger {
        &self.audit
    }

    fn verifier(&self) -> VerificationService<'_> {
        VerificationService::new(
            &self.engine,
            &self.store,
            &self.custody,
            &self.audit,
            &self.blobs,
            self.config.hash_chunk_size,
        )
    }

    /// Upload an in-memory payload.
    pub fn upload(
        &self,
        filename: &str,
        data: &[u8],
        case: &CaseContext,
        actor: &Actor,
        context: &RequestContext,
        details: UploadDetails,
    ) -> Result<EvidenceItem> {
        validate_upload(filename, data.len() as u64, case, self.config.max_upload_bytes)?;
        self.store_validated(filename, data, case, actor, context, details)
    }

    /// Upload a file from disk. The size check runs on file metadata, before
    /// the contents are read.
    pub fn upload_file(
        &self,
        path: &Path,
        case: &CaseContext,
        actor: &Actor,
        context: &RequestContext,
        details: UploadDetails,
    ) -> Result<EvidenceItem> {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_owned();
        let max = self.config.max_upload_bytes;
        let size = std::fs::metadata(path)?.len();
        validate_upload(&filename, size, case, max)?;

        // The file may have grown since the metadata call.
        let data = read_capped(File::open(path)?, max)?;
        validate_upload(&filename, data.len() as u64, case, max)?;
        self.store_validated(&filename, &data, case, actor, context, details)
    }

    #[instrument(skip_all, fields(file = filename, case = %case.case_number, len = data.len()))]
    fn store_validated(
        &self,
        filename: &str,
        data: &[u8],
        case: &CaseContext,
        actor: &Actor,
        context: &RequestContext,
        details: UploadDetails,
    ) -> Result<EvidenceItem> {
        let safe_name = secure_filename(filename);
        let evidence_type = classify_type(filename);
        let mime_type = guess_mime(filename).map(str::to_owned);

        // Digests describe the plaintext, so they are taken before encryption.
        let digests = compute_digests(Cursor::new(data), self.config.hash_chunk_size)?;
        let blob = self.engine.encrypt(data)?;

        let now = Utc::now();
        let stem = stored_stem(&case.case_number, &now, &safe_name);
        let (stored_filename, blob_path) = self.blobs.write_new(&stem, ENCRYPTED_SUFFIX, &blob.bytes)?;

        let mut acquisition = details.acquisition;
        if acquisition.date.is_none() {
            acquisition.date = Some(now);
        }
        if acquisition.method.is_none() {
            acquisition.method = Some(self.config.default_acquisition_method.clone());
        }

        let metadata = EvidenceMetadata {
            case_id: case.case_id,
            original_filename: filename.to_owned(),
            stored_filename,
            blob_path: blob_path.to_string_lossy().into_owned(),
            file_size: data.len() as u64,
            mime_type,
            evidence_type,
            acquisition,
            description: details.description,
            uploaded_by: actor.id,
        };

        let item = match self.store.create(metadata, digests, Some(blob.info())) {
            Ok(item) => item,
            Err(e) => {
                warn!(error = %e, "record creation failed; discarding blob");
                self.blobs.discard(&blob_path);
                return Err(e);
            }
        };

        self.custody.append(
            CustodyDraft::new(item.id, CustodyAction::Uploaded, actor.id)
                .with_context(context.clone())
                .with_hash_check(HashCheck::completed(true, Some(&item.digests)))
                .with_notes(format!("Evidence uploaded: {}", item.original_filename))
                .with_extra(json!({
                    "file_size": item.file_size,
                    "mime_type": item.mime_type,
                    "evidence_type": item.evidence_type.as_str(),
                    "encryption": item.encryption,
                })),
        )?;

        self.audit.append(
            AuditDraft::new(AuditAction::EvidenceUploaded, "evidence")
                .on(item.id)
                .by(actor)
                .with_context(context.clone())
                .with_description(format!(
                    "Uploaded evidence {} to case {}",
                    item.original_filename, case.case_number
                ))
                .with_extra(json!({
                    "case_id": case.case_id.to_string(),
                    "file_size": item.file_size,
                    "sha256": item.digests.sha256,
                })),
        )?;

        info!(evidence_id = %item.id, "evidence uploaded");
        Ok(item)
    }

    /// Record a read-only access (view, download, preview).
    #[instrument(skip(self, actor, context), fields(actor = %actor.id))]
    pub fn record_access(
        &self,
        id: &EvidenceId,
        access: AccessKind,
        actor: &Actor,
        context: &RequestContext,
    ) -> Result<ChainOfCustodyEntry> {
        let item = self.store.require(id)?;
        self.custody.append(
            CustodyDraft::new(item.id, access.into(), actor.id).with_context(context.clone()),
        )
    }

    /// Log a metadata-extraction request. The work itself belongs to the
    /// external task facility.
    pub fn request_metadata_extraction(
        &self,
        id: &EvidenceId,
        actor: &Actor,
        context: &RequestContext,
    ) -> Result<ExtractionRequest> {
        let item = self.store.require(id)?;
        let entry = self.custody.append(
            CustodyDraft::new(item.id, CustodyAction::MetadataExtractionRequested, actor.id)
                .with_context(context.clone())
                .with_notes("Metadata extraction requested"),
        )?;
        Ok(ExtractionRequest {
            evidence_id: item.id,
            status: ExtractionStatus::Pending,
            custody_entry: entry.id,
        })
    }

    /// Soft-delete an item. Bytes, metadata, and ledger history are kept.
    /// Deleting an already deleted item changes nothing and logs nothing.
    #[instrument(skip(self, actor, context), fields(actor = %actor.id))]
    pub fn soft_delete(
        &self,
        id: &EvidenceId,
        actor: &Actor,
        context: &RequestContext,
    ) -> Result<EvidenceItem> {
        if self.store.soft_delete(id, &actor.id)?.is_some() {
            let item = self.store.require(id)?;
            self.custody.append(
                CustodyDraft::new(item.id, CustodyAction::Deleted, actor.id)
                    .with_context(context.clone())
                    .with_notes("Evidence soft deleted"),
            )?;
            self.audit.append(
                AuditDraft::new(AuditAction::EvidenceDeleted, "evidence")
                    .on(item.id)
                    .by(actor)
                    .with_context(context.clone())
                    .with_description(format!(
                        "Evidence {} soft deleted from case {}",
                        item.stored_filename, item.case_id
                    )),
            )?;
            return Ok(item);
        }
        self.store.require(id)
    }

    /// Decrypt an item for external analysis and log the access.
    ///
    /// The returned file is deleted when the value is dropped.
    pub fn open_plaintext(
        &self,
        id: &EvidenceId,
        access: AccessKind,
        actor: &Actor,
        context: &RequestContext,
    ) -> Result<DecryptedScratch> {
        let item = self.store.require(id)?;
        let scratch = self.verifier().decrypt_to_scratch(&item)?;
        self.custody.append(
            CustodyDraft::new(item.id, access.into(), actor.id)
                .with_context(context.clone())
                .with_notes("Plaintext copy opened"),
        )?;
        Ok(scratch)
    }

    /// Re-hash an item against its recorded digests.
    pub fn verify(
        &self,
        id: &EvidenceId,
        actor: &Actor,
        context: &RequestContext,
    ) -> Result<VerificationResult> {
        let item = self.store.require(id)?;
        self.verifier().verify(&item, actor, context)
    }

    pub fn get(&self, id: &EvidenceId) -> Result<EvidenceItem> {
        self.store.require(id)
    }

    pub fn custody_chain(&self, id: &EvidenceId) -> Result<Vec<ChainOfCustodyEntry>> {
        self.store.require(id)?;
        self.custody.entries_for_evidence(id)
    }

    pub fn stats(&self, case: Option<&CaseId>) -> Result<EvidenceStats> {
        self.store.stats(case)
    }
}

impl std::fmt::Debug for EvidenceService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvidenceService")
            .field("data_dir", &self.config.data_dir)
            .finish_non_exhaustive()
    }
}

/// Read at most `max + 1` bytes, enough to tell an oversized source from one
/// exactly at the limit.
fn read_capped(reader: impl Read, max: u64) -> std::io::Result<Vec<u8>> {
    let mut data = Vec::new();
    reader.take(max.saturating_add(1)).read_to_end(&mut data)?;
    Ok(data)
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// End-to-end evidence workflow against a real data directory: upload,
// verification, tampering, gating, soft delete, and plaintext hand-off.

use std::fs;
use std::thread;

use custodia_core::error::{CustodiaError, IntegrityError, ValidationError};
use custodia_core::types::{
    Actor, ActorId, AuditAction, CaseContext, CaseId, CustodyAction, EvidenceType, RequestContext,
};
use custodia_core::{CoreConfig, Secrets};
use custodia_evidence::{AccessKind, EvidenceService, UploadDetails, classify_type};
use custodia_security::integrity::digest_bytes;
use tempfile::TempDir;

const KEY_HEX: &str = "8f3b1c2d4e5f60718293a4b5c6d7e8f90a1b2c3d4e5f60718293a4b5c6d7e8f9";
const APP_SECRET: &str = "workflow-test-secret";

fn config(dir: &TempDir) -> CoreConfig {
    CoreConfig::with_data_dir(dir.path())
}

fn open(dir: &TempDir) -> EvidenceService {
    EvidenceService::open(config(dir), &Secrets::new(KEY_HEX, APP_SECRET)).unwrap()
}

fn case() -> CaseContext {
    CaseContext {
        case_id: CaseId::new(),
        case_number: "2026-0100".into(),
        legitimacy_validated: true,
        crime_detected: false,
        crime_reported: false,
    }
}

fn investigator() -> Actor {
    Actor::new(ActorId::new(), "investigator@example.com")
}

fn ctx() -> RequestContext {
    RequestContext::local("workflow-test")
}

fn blob_count(dir: &TempDir) -> usize {
    match fs::read_dir(config(dir).evidence_dir()) {
        Ok(entries) => entries.count(),
        Err(_) => 0,
    }
}

#[test]
fn upload_ten_byte_payload() {
    let dir = TempDir::new().unwrap();
    let svc = open(&dir);
    let who = investigator();

    let item = svc
        .upload("evidence01.txt", b"evidence01", &case(), &who, &ctx(), UploadDetails::default())
        .unwrap();

    assert_eq!(item.digests, digest_bytes(b"evidence01"));
    assert_eq!(item.file_size, 10);
    assert_eq!(fs::metadata(&item.blob_path).unwrap().len(), 38);
    assert!(item.is_encrypted());
    assert!(item.integrity_verified);
    assert_eq!(item.evidence_type, EvidenceType::Document);

    let chain = svc.custody_chain(&item.id).unwrap();
    assert_eq!(chain.len(), 1);
    assert_eq!(chain[0].action, CustodyAction::Uploaded);
    assert_eq!(chain[0].hash_check.hash_match, Some(true));
    assert_eq!(chain[0].hash_check.sha256_calculated.as_deref(), Some(item.digests.sha256.as_str()));

    let audit = svc.audit().entries_for_resource("evidence", &item.id.to_string()).unwrap();
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].action, AuditAction::EvidenceUploaded);
    assert_eq!(audit[0].actor.as_ref(), Some(&who));
}

#[test]
fn verify_untouched_item() {
    let dir = TempDir::new().unwrap();
    let svc = open(&dir);
    let who = investigator();
    let item = svc
        .upload("evidence01.txt", b"evidence01", &case(), &who, &ctx(), UploadDetails::default())
        .unwrap();

    let result = svc.verify(&item.id, &who, &ctx()).unwrap();
    assert!(result.verified);
    assert!(svc.get(&item.id).unwrap().integrity_verified);

    let chain = svc.custody_chain(&item.id).unwrap();
    assert_eq!(chain.len(), 2);
    assert_eq!(chain[1].action, CustodyAction::HashVerified);
    assert_eq!(chain[1].hash_check.hash_match, Some(true));
    assert_eq!(chain[1].id, result.custody_entry);
}

#[test]
fn corrupted_byte_flips_status() {
    let dir = TempDir::new().unwrap();
    let svc = open(&dir);
    let who = investigator();
    let item = svc
        .upload("evidence01.txt", b"evidence01", &case(), &who, &ctx(), UploadDetails::default())
        .unwrap();

    let mut blob = fs::read(&item.blob_path).unwrap();
    blob[30] ^= 0xFF;
    fs::write(&item.blob_path, &blob).unwrap();

    let result = svc.verify(&item.id, &who, &ctx()).unwrap();
    assert!(!result.verified);
    assert!(matches!(
        result.failure,
        Some(IntegrityError::AuthenticationFailed { .. })
    ));

    let stored = svc.get(&item.id).unwrap();
    assert!(!stored.integrity_verified);
    assert_eq!(stored.digests, item.digests);

    let chain = svc.custody_chain(&item.id).unwrap();
    let last = chain.last().unwrap();
    assert_eq!(last.action, CustodyAction::HashVerified);
    assert_eq!(last.hash_check.hash_match, Some(false));

    let failures: Vec<_> = svc
        .audit()
        .entries()
        .unwrap()
        .into_iter()
        .filter(|e| e.action == AuditAction::EvidenceIntegrityFailed)
        .collect();
    assert_eq!(failures.len(), 1);
}

#[test]
fn rejected_upload_leaves_no_trace() {
    let dir = TempDir::new().unwrap();
    let svc = open(&dir);
    let mut gated = case();
    gated.legitimacy_validated = false;

    let err = svc
        .upload("a.pdf", b"%PDF", &gated, &investigator(), &ctx(), UploadDetails::default())
        .unwrap_err();
    assert!(matches!(
        err,
        CustodiaError::Validation(ValidationError::LegitimacyNotValidated { .. })
    ));

    let mut unreported = case();
    unreported.crime_detected = true;
    let err = svc
        .upload("a.pdf", b"%PDF", &unreported, &investigator(), &ctx(), UploadDetails::default())
        .unwrap_err();
    assert!(matches!(
        err,
        CustodiaError::Validation(ValidationError::UnreportedCrime { .. })
    ));

    let err = svc
        .upload("a.pdf", b"", &case(), &investigator(), &ctx(), UploadDetails::default())
        .unwrap_err();
    assert!(matches!(err, CustodiaError::Validation(ValidationError::EmptyFile)));

    assert_eq!(blob_count(&dir), 0);
    assert_eq!(svc.stats(None).unwrap().total_count, 0);
    assert_eq!(svc.custody().count().unwrap(), 0);
    assert_eq!(svc.audit().count().unwrap(), 0);
}

#[test]
fn oversized_file_is_rejected_before_reading() {
    let dir = TempDir::new().unwrap();
    let mut cfg = config(&dir);
    cfg.max_upload_bytes = 16;
    let svc = EvidenceService::open(cfg, &Secrets::new(KEY_HEX, APP_SECRET)).unwrap();

    let source = dir.path().join("big.bin");
    fs::write(&source, vec![0u8; 17]).unwrap();
    let err = svc
        .upload_file(&source, &case(), &investigator(), &ctx(), UploadDetails::default())
        .unwrap_err();
    assert!(matches!(
        err,
        CustodiaError::Validation(ValidationError::TooLarge { size: 17, max: 16 })
    ));

    let small = dir.path().join("REPORT.PDF");
    fs::write(&small, b"%PDF-1.7 tiny").unwrap();
    let item = svc
        .upload_file(&small, &case(), &investigator(), &ctx(), UploadDetails::default())
        .unwrap();
    assert_eq!(item.original_filename, "REPORT.PDF");
    assert_eq!(item.evidence_type, EvidenceType::Document);
    assert_eq!(classify_type("REPORT.PDF"), EvidenceType::Document);
}

#[test]
fn soft_delete_retains_everything() {
    let dir = TempDir::new().unwrap();
    let svc = open(&dir);
    let who = investigator();
    let item = svc
        .upload("photo.jpg", b"jpeg bytes", &case(), &who, &ctx(), UploadDetails::default())
        .unwrap();

    let deleted = svc.soft_delete(&item.id, &who, &ctx()).unwrap();
    assert!(deleted.is_deleted());
    assert_eq!(deleted.deleted.as_ref().unwrap().deleted_by, who.id);
    assert!(fs::metadata(&item.blob_path).is_ok());

    // Idempotent: no further ledger entries.
    svc.soft_delete(&item.id, &who, &ctx()).unwrap();
    let chain = svc.custody_chain(&item.id).unwrap();
    assert_eq!(
        chain.iter().map(|e| e.action).collect::<Vec<_>>(),
        [CustodyAction::Uploaded, CustodyAction::Deleted]
    );
    let deletions = svc
        .audit()
        .entries()
        .unwrap()
        .into_iter()
        .filter(|e| e.action == AuditAction::EvidenceDeleted)
        .count();
    assert_eq!(deletions, 1);

    // Still verifiable after deletion; excluded from statistics.
    assert!(svc.verify(&item.id, &who, &ctx()).unwrap().verified);
    assert_eq!(svc.stats(Some(&deleted.case_id)).unwrap().total_count, 0);
}

#[test]
fn plaintext_handoff_is_scoped_and_logged() {
    let dir = TempDir::new().unwrap();
    let svc = open(&dir);
    let who = investigator();
    let item = svc
        .upload("export.json", br#"{"messages":[]}"#, &case(), &who, &ctx(), UploadDetails::default())
        .unwrap();

    let scratch = svc
        .open_plaintext(&item.id, AccessKind::Downloaded, &who, &ctx())
        .unwrap();
    let path = scratch.path().to_path_buf();
    assert_eq!(fs::read(&path).unwrap(), br#"{"messages":[]}"#);
    drop(scratch);
    assert!(!path.exists());

    let chain = svc.custody_chain(&item.id).unwrap();
    assert_eq!(chain.last().unwrap().action, CustodyAction::Downloaded);
}

#[test]
fn ledgers_verify_after_full_workflow() {
    let dir = TempDir::new().unwrap();
    let svc = open(&dir);
    let who = investigator();
    let c = case();
    let a = svc
        .upload("a.eml", b"From: x", &c, &who, &ctx(), UploadDetails::default())
        .unwrap();
    let b = svc
        .upload("b.mp4", b"\x00\x00\x00\x18ftyp", &c, &who, &ctx(), UploadDetails::default())
        .unwrap();
    svc.record_access(&a.id, AccessKind::Previewed, &who, &ctx()).unwrap();
    svc.verify(&b.id, &who, &ctx()).unwrap();
    svc.soft_delete(&a.id, &who, &ctx()).unwrap();

    assert!(svc.custody().verify_all().unwrap().is_clean());
    assert!(svc.audit().verify_all().unwrap().is_clean());

    let stats = svc.stats(Some(&c.case_id)).unwrap();
    assert_eq!(stats.total_count, 1);
    assert_eq!(stats.by_type["video"], 1);
    assert_eq!(stats.verification_rate, 100.0);
}

#[test]
fn reopened_service_sees_prior_state() {
    let dir = TempDir::new().unwrap();
    let id = {
        let svc = open(&dir);
        svc.upload("a.txt", b"persisted", &case(), &investigator(), &ctx(), UploadDetails::default())
            .unwrap()
            .id
    };
    let svc = open(&dir);
    assert_eq!(svc.get(&id).unwrap().file_size, 9);
    assert!(svc.verify(&id, &investigator(), &ctx()).unwrap().verified);
}

#[test]
fn wrong_secret_breaks_ledger_verification() {
    let dir = TempDir::new().unwrap();
    {
        let svc = open(&dir);
        svc.upload("a.txt", b"signed", &case(), &investigator(), &ctx(), UploadDetails::default())
            .unwrap();
    }
    let other = EvidenceService::open(config(&dir), &Secrets::new(KEY_HEX, "another-secret")).unwrap();
    let report = other.custody().verify_all().unwrap();
    assert_eq!(report.checked, 1);
    assert_eq!(report.tampered.len(), 1);
}

#[test]
fn concurrent_workers_share_one_data_dir() {
    let dir = TempDir::new().unwrap();
    drop(open(&dir));
    let case = case();

    let handles: Vec<_> = (0..3)
        .map(|w| {
            let cfg = config(&dir);
            let case = case.clone();
            thread::spawn(move || {
                let svc = EvidenceService::open(cfg, &Secrets::new(KEY_HEX, APP_SECRET)).unwrap();
                let who = investigator();
                for i in 0..3 {
                    svc.upload(
                        &format!("w{w}_{i}.txt"),
                        format!("payload {w}/{i}").as_bytes(),
                        &case,
                        &who,
                        &ctx(),
                        UploadDetails::default(),
                    )
                    .unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let svc = open(&dir);
    assert_eq!(svc.stats(Some(&case.case_id)).unwrap().total_count, 9);
    assert_eq!(svc.custody().count().unwrap(), 9);
    assert_eq!(blob_count(&dir), 9);
    assert!(svc.custody().verify_all().unwrap().is_clean());
}

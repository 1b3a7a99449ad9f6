// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Ledger behaviour against a real database file: direct SQL mutation is
// refused, out-of-band edits are caught by verification, and concurrent
// writers never lose entries.

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use custodia_core::CustodiaError;
use custodia_core::types::{
    Actor, ActorId, AuditAction, AuditDraft, CustodyAction, CustodyDraft, EvidenceId, HashCheck,
};
use custodia_security::{
    AuditLedger, CustodyLedger, TimestampAuthority, VerifyFailure, db_err,
};
use rusqlite::{Connection, params};
use tempfile::TempDir;

fn authority() -> Arc<TimestampAuthority> {
    Arc::new(TimestampAuthority::new("integration-secret").unwrap())
}

fn seeded_custody(dir: &TempDir, n: usize) -> (CustodyLedger, EvidenceId) {
    let ledger = CustodyLedger::open(dir.path().join("ledger.db"), authority()).unwrap();
    let evidence = EvidenceId::new();
    let actor = ActorId::new();
    for i in 0..n {
        ledger
            .append(
                CustodyDraft::new(evidence, CustodyAction::Viewed, actor)
                    .with_notes(format!("view #{i}")),
            )
            .unwrap();
    }
    (ledger, evidence)
}

#[test]
fn direct_update_and_delete_are_refused_for_every_entry() {
    let dir = TempDir::new().unwrap();
    let (ledger, evidence) = seeded_custody(&dir, 4);

    let raw = Connection::open(dir.path().join("ledger.db")).unwrap();
    for entry in ledger.entries_for_evidence(&evidence).unwrap() {
        let id = entry.id.to_string();

        let update = raw
            .execute(
                "UPDATE chain_of_custody SET notes = 'rewritten' WHERE id = ?1",
                params![id],
            )
            .map_err(|e| db_err("chain_of_custody", e));
        assert!(
            matches!(update, Err(CustodiaError::ImmutableRecordViolation { .. })),
            "update of {id} was not refused: {update:?}"
        );

        let delete = raw
            .execute("DELETE FROM chain_of_custody WHERE id = ?1", params![id])
            .map_err(|e| db_err("chain_of_custody", e));
        assert!(
            matches!(delete, Err(CustodiaError::ImmutableRecordViolation { .. })),
            "delete of {id} was not refused: {delete:?}"
        );
    }

    assert_eq!(ledger.count().unwrap(), 4);
    assert!(ledger.verify_all().unwrap().is_clean());
}

#[test]
fn audit_log_rejects_bulk_delete() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("audit.db");
    let ledger = AuditLedger::open(&path, authority()).unwrap();
    let actor = Actor::new(ActorId::new(), "investigator@example.com");
    ledger
        .append(AuditDraft::new(AuditAction::LoginSuccess, "user").by(&actor))
        .unwrap();

    let raw = Connection::open(&path).unwrap();
    let err = raw
        .execute("DELETE FROM audit_log", [])
        .map_err(|e| db_err("audit_log", e))
        .unwrap_err();
    assert!(err.is_tamper_evidence());
    assert_eq!(ledger.count().unwrap(), 1);
}

#[test]
fn edit_behind_dropped_trigger_is_detected() {
    let dir = TempDir::new().unwrap();
    let (ledger, evidence) = seeded_custody(&dir, 3);
    let victim = ledger.entries_for_evidence(&evidence).unwrap()[1].clone();

    let raw = Connection::open(dir.path().join("ledger.db")).unwrap();
    raw.execute_batch("DROP TRIGGER chain_of_custody_no_update;")
        .unwrap();
    raw.execute(
        "UPDATE chain_of_custody SET notes = 'nothing to see here' WHERE id = ?1",
        params![victim.id.to_string()],
    )
    .unwrap();

    let check = ledger.verify(&victim.id).unwrap();
    assert!(!check.valid);
    assert_eq!(check.failure, Some(VerifyFailure::HashMismatch));

    let report = ledger.verify_all().unwrap();
    assert_eq!(report.checked, 3);
    assert_eq!(report.valid, 2);
    assert_eq!(report.tampered.len(), 1);
    assert_eq!(report.tampered[0].0, victim.id.to_string());
}

#[test]
fn row_edited_into_undecodable_values_is_reported_as_tampered() {
    let dir = TempDir::new().unwrap();
    let (ledger, evidence) = seeded_custody(&dir, 2);
    let victim = ledger.entries_for_evidence(&evidence).unwrap()[0].clone();

    let raw = Connection::open(dir.path().join("ledger.db")).unwrap();
    raw.execute_batch("DROP TRIGGER chain_of_custody_no_update;")
        .unwrap();
    raw.execute(
        "UPDATE chain_of_custody SET action = 'EDITED' WHERE id = ?1",
        params![victim.id.to_string()],
    )
    .unwrap();

    // The untouched entry is still verified alongside the broken one.
    let report = ledger.verify_all().unwrap();
    assert_eq!(report.checked, 2);
    assert_eq!(report.valid, 1);
    assert_eq!(report.tampered.len(), 1);
    let (id, check) = &report.tampered[0];
    assert_eq!(id, &victim.id.to_string());
    assert_eq!(check.failure, Some(VerifyFailure::HashMismatch));
    assert_eq!(check.stored_hash, victim.record_hash);

    let check = ledger.verify(&victim.id).unwrap();
    assert!(!check.valid);
    assert_eq!(check.failure, Some(VerifyFailure::HashMismatch));

    let err = ledger.entries_for_evidence(&evidence).unwrap_err();
    assert!(err.is_tamper_evidence(), "{err:?}");
    assert!(err.to_string().contains(&victim.id.to_string()));
}

#[test]
fn edited_id_is_still_reported() {
    let dir = TempDir::new().unwrap();
    let (ledger, _) = seeded_custody(&dir, 1);

    let raw = Connection::open(dir.path().join("ledger.db")).unwrap();
    raw.execute_batch("DROP TRIGGER chain_of_custody_no_update;")
        .unwrap();
    raw.execute("UPDATE chain_of_custody SET id = 'not-a-uuid'", [])
        .unwrap();

    let report = ledger.verify_all().unwrap();
    assert_eq!(report.checked, 1);
    assert_eq!(report.tampered[0].0, "not-a-uuid");
    assert!(ledger.entries().unwrap_err().is_tamper_evidence());
}

#[test]
fn edited_hash_outcome_is_detected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ledger.db");
    let ledger = CustodyLedger::open(&path, authority()).unwrap();
    let entry = ledger
        .append(
            CustodyDraft::new(EvidenceId::new(), CustodyAction::HashVerified, ActorId::new())
                .with_hash_check(HashCheck::completed(false, None)),
        )
        .unwrap();

    let raw = Connection::open(&path).unwrap();
    raw.execute_batch("DROP TRIGGER chain_of_custody_no_update;")
        .unwrap();
    raw.execute(
        "UPDATE chain_of_custody SET hash_match = 1 WHERE id = ?1",
        params![entry.id.to_string()],
    )
    .unwrap();

    assert_eq!(
        ledger.verify(&entry.id).unwrap().failure,
        Some(VerifyFailure::HashMismatch)
    );
}

#[test]
fn concurrent_appends_from_separate_connections() {
    const WRITERS: usize = 4;
    const PER_WRITER: usize = 10;

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ledger.db");
    let authority = authority();
    // Create the schema before the writers race.
    let reader = CustodyLedger::open(&path, Arc::clone(&authority)).unwrap();
    let evidence = EvidenceId::new();

    let handles: Vec<_> = (0..WRITERS)
        .map(|w| {
            let path = path.clone();
            let authority = Arc::clone(&authority);
            thread::spawn(move || {
                let ledger = CustodyLedger::open(&path, authority).unwrap();
                let actor = ActorId::new();
                (0..PER_WRITER)
                    .map(|i| {
                        ledger
                            .append(
                                CustodyDraft::new(evidence, CustodyAction::Viewed, actor)
                                    .with_notes(format!("writer {w} entry {i}")),
                            )
                            .unwrap()
                            .id
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut ids = HashSet::new();
    for handle in handles {
        for id in handle.join().unwrap() {
            assert!(ids.insert(id), "duplicate entry id {id}");
        }
    }

    let chain = reader.entries_for_evidence(&evidence).unwrap();
    assert_eq!(chain.len(), WRITERS * PER_WRITER);
    assert!(chain.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    assert!(reader.verify_all().unwrap().is_clean());
}

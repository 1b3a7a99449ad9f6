// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Evidence record store backed by SQLite.
//
// The store holds metadata, digests, and encryption parameters; blob bytes
// live on disk and are referenced by path. Two triggers guard the table:
// digests cannot change once written, and rows cannot be hard-deleted.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, SubsecRound, Utc};
use custodia_core::error::{CustodiaError, Result};
use custodia_core::types::{
    AcquisitionInfo, ActorId, CaseId, DigestPair, EncryptionInfo, EvidenceId, EvidenceItem,
    EvidenceType, SoftDeletion,
};
use custodia_security::ledger::{IMMUTABLE_MARKER, conversion_err, parse_column, parse_timestamp};
use custodia_security::timestamp::format_timestamp;
use custodia_security::db_err;
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

const TABLE: &str = "evidence";

const CREATE_TABLE_SQL: &str = r#"
    CREATE TABLE IF NOT EXISTS evidence (
        id                   TEXT PRIMARY KEY,
        case_id              TEXT NOT NULL,
        original_filename    TEXT NOT NULL,
        stored_filename      TEXT NOT NULL,
        blob_path            TEXT NOT NULL,
        file_size            INTEGER NOT NULL,
        mime_type            TEXT,
        evidence_type        TEXT NOT NULL,
        sha256_hash          TEXT NOT NULL,
        sha512_hash          TEXT NOT NULL,
        is_encrypted         INTEGER NOT NULL,
        encryption_algorithm TEXT,
        encryption_nonce     TEXT,
        acquisition          TEXT NOT NULL DEFAULT '{}',
        description          TEXT,
        uploaded_by          TEXT NOT NULL,
        uploaded_at          TEXT NOT NULL,
        integrity_verified   INTEGER NOT NULL,
        last_verified_at     TEXT,
        is_deleted           INTEGER NOT NULL DEFAULT 0,
        deleted_at           TEXT,
        deleted_by           TEXT
    );
    CREATE INDEX IF NOT EXISTS idx_evidence_case ON evidence (case_id);
"#;

fn guard_triggers_sql() -> String {
    format!(
        "CREATE TRIGGER IF NOT EXISTS evidence_digests_fixed
         BEFORE UPDATE OF sha256_hash, sha512_hash ON evidence
         WHEN NEW.sha256_hash IS NOT OLD.sha256_hash OR NEW.sha512_hash IS NOT OLD.sha512_hash
         BEGIN
             SELECT RAISE(ABORT, '{IMMUTABLE_MARKER}: evidence digests cannot be changed');
         END;
         CREATE TRIGGER IF NOT EXISTS evidence_no_delete
         BEFORE DELETE ON evidence
         BEGIN
             SELECT RAISE(ABORT, '{IMMUTABLE_MARKER}: evidence items are soft-deleted only');
         END;"
    )
}

const SELECT_COLUMNS: &str = "id, case_id, original_filename, stored_filename, blob_path, \
     file_size, mime_type, evidence_type, sha256_hash, sha512_hash, is_encrypted, \
     encryption_algorithm, encryption_nonce, acquisition, description, uploaded_by, \
     uploaded_at, integrity_verified, last_verified_at, deleted_at, deleted_by";

/// Caller-supplied fields of a new evidence record.
#[derive(Debug, Clone)]
pub struct EvidenceMetadata {
    pub case_id: CaseId,
    pub original_filename: String,
    pub stored_filename: String,
    pub blob_path: String,
    pub file_size: u64,
    pub mime_type: Option<String>,
    pub evidence_type: EvidenceType,
    pub acquisition: AcquisitionInfo,
    pub description: Option<String>,
    pub uploaded_by: ActorId,
}

/// Aggregate figures over live (not soft-deleted) items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceStats {
    pub total_count: u64,
    pub total_size_bytes: u64,
    /// Count per evidence-type tag; every tag is present.
    pub by_type: BTreeMap<String, u64>,
    pub verified_count: u64,
    /// Percentage of items currently verified, one decimal place.
    pub verification_rate: f64,
}

pub struct EvidenceStore {
    conn: Connection,
}

impl EvidenceStore {
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref()).map_err(|e| db_err(TABLE, e))?;
        conn.busy_timeout(Duration::from_secs(5))
            .map_err(|e| db_err(TABLE, e))?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| db_err(TABLE, e))?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| db_err(TABLE, e))?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(CREATE_TABLE_SQL)
            .map_err(|e| db_err(TABLE, e))?;
        conn.execute_batch(&guard_triggers_sql())
            .map_err(|e| db_err(TABLE, e))?;
        debug!("evidence store opened");
        Ok(Self { conn })
    }

    /// Persist a new item. Verification status starts true: the digests were
    /// computed from exactly the bytes that were stored.
    #[instrument(skip_all, fields(case_id = %metadata.case_id, file = %metadata.original_filename))]
    pub fn create(
        &self,
        metadata: EvidenceMetadata,
        digests: DigestPair,
        encryption: Option<EncryptionInfo>,
    ) -> Result<EvidenceItem> {
        let now = Utc::now().trunc_subsecs(6);
        let item = EvidenceItem {
            id: EvidenceId::new(),
            case_id: metadata.case_id,
            original_filename: metadata.original_filename,
            stored_filename: metadata.stored_filename,
            blob_path: metadata.blob_path,
            file_size: metadata.file_size,
            mime_type: metadata.mime_type,
            evidence_type: metadata.evidence_type,
            digests,
            encryption,
            acquisition: metadata.acquisition,
            description: metadata.description,
            uploaded_by: metadata.uploaded_by,
            uploaded_at: now,
            integrity_verified: true,
            last_verified_at: Some(now),
            deleted: None,
        };

        let acquisition_json = serde_json::to_string(&item.acquisition)?;
        self.conn
            .execute(
                "INSERT INTO evidence (id, case_id, original_filename, stored_filename,
                 blob_path, file_size, mime_type, evidence_type, sha256_hash, sha512_hash,
                 is_encrypted, encryption_algorithm, encryption_nonce, acquisition,
                 description, uploaded_by, uploaded_at, integrity_verified, last_verified_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
                         ?16, ?17, ?18, ?19)",
                params![
                    item.id.to_string(),
                    item.case_id.to_string(),
                    item.original_filename,
                    item.stored_filename,
                    item.blob_path,
                    item.file_size as i64,
                    item.mime_type,
                    item.evidence_type.as_str(),
                    item.digests.sha256,
                    item.digests.sha512,
                    item.encryption.is_some(),
                    item.encryption.as_ref().map(|e| e.algorithm.clone()),
                    item.encryption.as_ref().map(|e| e.nonce_hex.clone()),
                    acquisition_json,
                    item.description,
                    item.uploaded_by.to_string(),
                    format_timestamp(&item.uploaded_at),
                    item.integrity_verified,
                    item.last_verified_at.as_ref().map(format_timestamp),
                ],
            )
            .map_err(|e| db_err(TABLE, e))?;

        info!(evidence_id = %item.id, "evidence record created");
        Ok(item)
    }

    /// Fetch an item by id, soft-deleted or not.
    pub fn get(&self, id: &EvidenceId) -> Result<Option<EvidenceItem>> {
        self.conn
            .query_row(
                &format!("SELECT {SELECT_COLUMNS} FROM evidence WHERE id = ?1"),
                params![id.to_string()],
                row_to_evidence,
            )
            .optional()
            .map_err(|e| db_err(TABLE, e))
    }

    /// Like [`get`](Self::get) but a missing item is an error.
    pub fn require(&self, id: &EvidenceId) -> Result<EvidenceItem> {
        self.get(id)?.ok_or_else(|| CustodiaError::NotFound {
            kind: "evidence item",
            id: id.to_string(),
        })
    }

    /// Items of one case, oldest upload first.
    #[instrument(skip(self), fields(case_id = %case_id))]
    pub fn list_for_case(&self, case_id: &CaseId, include_deleted: bool) -> Result<Vec<EvidenceItem>> {
        let filter = if include_deleted { "" } else { "AND is_deleted = 0" };
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM evidence WHERE case_id = ?1 {filter}
                 ORDER BY uploaded_at ASC, rowid ASC"
            ))
            .map_err(|e| db_err(TABLE, e))?;

        let items = stmt
            .query_map(params![case_id.to_string()], row_to_evidence)
            .map_err(|e| db_err(TABLE, e))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| db_err(TABLE, e))?;

        debug!(count = items.len(), "listed case evidence");
        Ok(items)
    }

    /// Record the outcome of a verification run. Only status and time change.
    #[instrument(skip(self), fields(evidence_id = %id))]
    pub fn record_verification(
        &self,
        id: &EvidenceId,
        verified: bool,
        at: &DateTime<Utc>,
    ) -> Result<()> {
        let rows = self
            .conn
            .execute(
                "UPDATE evidence SET integrity_verified = ?1, last_verified_at = ?2 WHERE id = ?3",
                params![verified, format_timestamp(at), id.to_string()],
            )
            .map_err(|e| db_err(TABLE, e))?;

        if rows == 0 {
            return Err(CustodiaError::NotFound {
                kind: "evidence item",
                id: id.to_string(),
            });
        }
        debug!(verified, "verification status recorded");
        Ok(())
    }

    /// Mark an item deleted. Returns `None` if it already was; the original
    /// deletion stands.
    #[instrument(skip(self), fields(evidence_id = %id, actor = %actor))]
    pub fn soft_delete(&self, id: &EvidenceId, actor: &ActorId) -> Result<Option<SoftDeletion>> {
        let deletion = SoftDeletion {
            deleted_at: Utc::now().trunc_subsecs(6),
            deleted_by: *actor,
        };
        let rows = self
            .conn
            .execute(
                "UPDATE evidence SET is_deleted = 1, deleted_at = ?1, deleted_by = ?2
                 WHERE id = ?3 AND is_deleted = 0",
                params![
                    format_timestamp(&deletion.deleted_at),
                    actor.to_string(),
                    id.to_string()
                ],
            )
            .map_err(|e| db_err(TABLE, e))?;

        if rows == 0 {
            // Either missing or already deleted.
            self.require(id)?;
            debug!("item already soft-deleted");
            return Ok(None);
        }
        info!("evidence soft-deleted");
        Ok(Some(deletion))
    }

    /// Totals over live items, optionally restricted to one case.
    pub fn stats(&self, case_id: Option<&CaseId>) -> Result<EvidenceStats> {
        let case_filter = case_id.map(|c| c.to_string());
        let mut stmt = self
            .conn
            .prepare(
                "SELECT evidence_type, COUNT(*), COALESCE(SUM(file_size), 0),
                        COALESCE(SUM(integrity_verified), 0)
                 FROM evidence
                 WHERE is_deleted = 0 AND (?1 IS NULL OR case_id = ?1)
                 GROUP BY evidence_type",
            )
            .map_err(|e| db_err(TABLE, e))?;

        let rows = stmt
            .query_map(params![case_filter], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            })
            .map_err(|e| db_err(TABLE, e))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| db_err(TABLE, e))?;

        let mut by_type: BTreeMap<String, u64> = EvidenceType::ALL
            .iter()
            .map(|t| (t.as_str().to_owned(), 0))
            .collect();
        let (mut total_count, mut total_size_bytes, mut verified_count) = (0u64, 0u64, 0u64);
        for (tag, count, size, verified) in rows {
            *by_type.entry(tag).or_default() += count as u64;
            total_count += count as u64;
            total_size_bytes += size as u64;
            verified_count += verified as u64;
        }

        let verification_rate = if total_count == 0 {
            0.0
        } else {
            (verified_count as f64 / total_count as f64 * 1000.0).round() / 10.0
        };

        Ok(EvidenceStats {
            total_count,
            total_size_bytes,
            by_type,
            verified_count,
            verification_rate,
        })
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

/// Column indices match `SELECT_COLUMNS`.
fn row_to_evidence(row: &rusqlite::Row<'_>) -> rusqlite::Result<EvidenceItem> {
    let id: String = row.get(0)?;
    let case_id: String = row.get(1)?;
    let evidence_type: String = row.get(7)?;
    let is_encrypted: bool = row.get(10)?;
    let algorithm: Option<String> = row.get(11)?;
    let nonce: Option<String> = row.get(12)?;
    let acquisition_json: String = row.get(13)?;
    let uploaded_by: String = row.get(15)?;
    let uploaded_at: String = row.get(16)?;
    let last_verified_at: Option<String> = row.get(18)?;
    let deleted_at: Option<String> = row.get(19)?;
    let deleted_by: Option<String> = row.get(20)?;

    let encryption = if is_encrypted {
        Some(EncryptionInfo {
            algorithm: algorithm.unwrap_or_default(),
            nonce_hex: nonce.unwrap_or_default(),
        })
    } else {
        None
    };

    let acquisition: AcquisitionInfo =
        serde_json::from_str(&acquisition_json).map_err(|e| conversion_err(13, e))?;

    let deleted = match (deleted_at, deleted_by) {
        (Some(at), Some(by)) => Some(SoftDeletion {
            deleted_at: parse_timestamp(19, &at)?,
            deleted_by: parse_column(20, &by)?,
        }),
        _ => None,
    };

    Ok(EvidenceItem {
        id: parse_column(0, &id)?,
        case_id: parse_column(1, &case_id)?,
        original_filename: row.get(2)?,
        stored_filename: row.get(3)?,
        blob_path: row.get(4)?,
        file_size: row.get::<_, i64>(5)? as u64,
        mime_type: row.get(6)?,
        evidence_type: parse_column(7, &evidence_type)?,
        digests: DigestPair {
            sha256: row.get(8)?,
            sha512: row.get(9)?,
        },
        encryption,
        acquisition,
        description: row.get(14)?,
        uploaded_by: parse_column(15, &uploaded_by)?,
        uploaded_at: parse_timestamp(16, &uploaded_at)?,
        integrity_verified: row.get(17)?,
        last_verified_at: last_verified_at
            .map(|s| parse_timestamp(18, &s))
            .transpose()?,
        deleted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(case_id: CaseId, name: &str, size: u64, kind: EvidenceType) -> EvidenceMetadata {
        EvidenceMetadata {
            case_id,
            original_filename: name.into(),
            stored_filename: format!("C-1_20260101_000000_{name}.enc"),
            blob_path: format!("/nonexistent/{name}.enc"),
            file_size: size,
            mime_type: None,
            evidence_type: kind,
            acquisition: AcquisitionInfo {
                method: Some("Direct upload".into()),
                ..AcquisitionInfo::default()
            },
            description: None,
            uploaded_by: ActorId::new(),
        }
    }

    fn digests(tag: &str) -> DigestPair {
        DigestPair {
            sha256: format!("{tag:0>64}"),
            sha512: format!("{tag:0>128}"),
        }
    }

    fn encryption() -> Option<EncryptionInfo> {
        Some(EncryptionInfo {
            algorithm: "AES-256-GCM".into(),
            nonce_hex: "00".repeat(12),
        })
    }

    #[test]
    fn create_then_get_round_trips() {
        let store = EvidenceStore::open_in_memory().unwrap();
        let created = store
            .create(
                metadata(CaseId::new(), "a.pdf", 10, EvidenceType::Document),
                digests("a"),
                encryption(),
            )
            .unwrap();

        assert!(created.integrity_verified);
        assert!(created.last_verified_at.is_some());
        let fetched = store.get(&created.id).unwrap().unwrap();
        assert_eq!(fetched, created);
    }

    #[test]
    fn unencrypted_item_round_trips() {
        let store = EvidenceStore::open_in_memory().unwrap();
        let created = store
            .create(
                metadata(CaseId::new(), "legacy.txt", 3, EvidenceType::Document),
                digests("b"),
                None,
            )
            .unwrap();
        assert!(!store.require(&created.id).unwrap().is_encrypted());
    }

    #[test]
    fn digests_cannot_be_rewritten() {
        let store = EvidenceStore::open_in_memory().unwrap();
        let item = store
            .create(
                metadata(CaseId::new(), "a.pdf", 10, EvidenceType::Document),
                digests("a"),
                encryption(),
            )
            .unwrap();

        let result = store
            .conn
            .execute(
                "UPDATE evidence SET sha256_hash = 'ff' WHERE id = ?1",
                params![item.id.to_string()],
            )
            .map_err(|e| db_err(TABLE, e));
        assert!(matches!(result, Err(CustodiaError::ImmutableRecordViolation { .. })));

        // Status updates still go through.
        store
            .record_verification(&item.id, false, &Utc::now())
            .unwrap();
        let after = store.require(&item.id).unwrap();
        assert!(!after.integrity_verified);
        assert_eq!(after.digests, item.digests);
    }

    #[test]
    fn hard_delete_is_refused() {
        let store = EvidenceStore::open_in_memory().unwrap();
        store
            .create(
                metadata(CaseId::new(), "a.pdf", 10, EvidenceType::Document),
                digests("a"),
                encryption(),
            )
            .unwrap();
        let result = store
            .conn
            .execute("DELETE FROM evidence", [])
            .map_err(|e| db_err(TABLE, e));
        assert!(matches!(result, Err(CustodiaError::ImmutableRecordViolation { .. })));
    }

    #[test]
    fn soft_delete_keeps_record() {
        let store = EvidenceStore::open_in_memory().unwrap();
        let case = CaseId::new();
        let item = store
            .create(metadata(case, "a.pdf", 10, EvidenceType::Document), digests("a"), encryption())
            .unwrap();
        let actor = ActorId::new();

        let deletion = store.soft_delete(&item.id, &actor).unwrap().unwrap();
        assert_eq!(deletion.deleted_by, actor);
        assert!(store.soft_delete(&item.id, &actor).unwrap().is_none());

        let fetched = store.require(&item.id).unwrap();
        assert_eq!(fetched.deleted, Some(deletion));
        assert_eq!(fetched.digests, item.digests);

        assert!(store.list_for_case(&case, false).unwrap().is_empty());
        assert_eq!(store.list_for_case(&case, true).unwrap().len(), 1);
    }

    #[test]
    fn missing_items() {
        let store = EvidenceStore::open_in_memory().unwrap();
        let id = EvidenceId::new();
        assert!(store.get(&id).unwrap().is_none());
        assert!(matches!(store.require(&id), Err(CustodiaError::NotFound { .. })));
        assert!(matches!(
            store.soft_delete(&id, &ActorId::new()),
            Err(CustodiaError::NotFound { .. })
        ));
        assert!(matches!(
            store.record_verification(&id, true, &Utc::now()),
            Err(CustodiaError::NotFound { .. })
        ));
    }

    #[test]
    fn stats_exclude_deleted_and_filter_by_case() {
        let store = EvidenceStore::open_in_memory().unwrap();
        let case = CaseId::new();
        let other = CaseId::new();

        let a = store
            .create(metadata(case, "a.pdf", 100, EvidenceType::Document), digests("a"), encryption())
            .unwrap();
        store
            .create(metadata(case, "b.png", 50, EvidenceType::Image), digests("b"), encryption())
            .unwrap();
        let c = store
            .create(metadata(case, "c.png", 25, EvidenceType::Image), digests("c"), encryption())
            .unwrap();
        store
            .create(metadata(other, "d.mp3", 7, EvidenceType::Audio), digests("d"), encryption())
            .unwrap();

        store.record_verification(&a.id, false, &Utc::now()).unwrap();
        store.soft_delete(&c.id, &ActorId::new()).unwrap();

        let stats = store.stats(Some(&case)).unwrap();
        assert_eq!(stats.total_count, 2);
        assert_eq!(stats.total_size_bytes, 150);
        assert_eq!(stats.by_type["document"], 1);
        assert_eq!(stats.by_type["image"], 1);
        assert_eq!(stats.by_type["audio"], 0);
        assert_eq!(stats.by_type.len(), EvidenceType::ALL.len());
        assert_eq!(stats.verified_count, 1);
        assert_eq!(stats.verification_rate, 50.0);

        let all = store.stats(None).unwrap();
        assert_eq!(all.total_count, 3);
        assert_eq!(all.by_type["audio"], 1);
    }

    #[test]
    fn empty_stats() {
        let stats = EvidenceStore::open_in_memory().unwrap().stats(None).unwrap();
        assert_eq!(stats.total_count, 0);
        assert_eq!(stats.verification_rate, 0.0);
    }
}

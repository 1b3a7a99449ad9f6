// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Immutable ledger: append-only SQLite tables for the chain of custody and
// the audit log, every row carrying a canonical hash and timestamp signature.
//
// Schema (chain_of_custody):
//   chain_of_custody(
//     id                  TEXT PRIMARY KEY,   -- UUID v4
//     evidence_id         TEXT NOT NULL,
//     action              TEXT NOT NULL,      -- e.g. "UPLOADED", "HASH_VERIFIED"
//     actor_id            TEXT NOT NULL,
//     timestamp           TEXT NOT NULL,      -- RFC 3339, microseconds, UTC
//     ip_address, user_agent, request_method, request_path TEXT,
//     notes               TEXT,
//     extra_data          TEXT,               -- JSON
//     hash_verified       INTEGER,            -- NULL unless a hash check ran
//     hash_match          INTEGER,
//     sha256_calculated   TEXT,
//     sha512_calculated   TEXT,
//     record_hash         TEXT NOT NULL,
//     timestamp_signature TEXT NOT NULL
//   )
//
// Schema (audit_log): same request-context, extra_data, timestamp and seal
// columns, plus action, resource_type, resource_id, description, and a
// nullable actor_id/actor_email pair.
//
// `Ledger` has no update or delete method. The tables additionally carry
// BEFORE UPDATE / BEFORE DELETE triggers, so a connection opened outside this
// module is refused as well, whoever holds it.

use std::marker::PhantomData;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, SubsecRound, Utc};
use custodia_core::error::{CustodiaError, IntegrityError, Result};
use custodia_core::types::{
    Actor, ActorId, AuditDraft, AuditLogEntry, ChainOfCustodyEntry, CustodyDraft, EntryId,
    EvidenceId, HashCheck, RequestContext,
};
use rusqlite::types::{Type, ValueRef};
use rusqlite::{Connection, Params, Row, params};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::timestamp::{SignatureCheck, SignedRecord, TimestampAuthority, VerifyFailure};

/// Prefix of every message raised by an immutability trigger.
pub const IMMUTABLE_MARKER: &str = "immutable record";

// ---------------------------------------------------------------------------
// Error helpers
// ---------------------------------------------------------------------------

/// Convert a `rusqlite::Error` raised while touching `table`.
///
/// Trigger aborts become `ImmutableRecordViolation`; everything else is a
/// `Database` error.
pub fn db_err(table: &str, e: rusqlite::Error) -> CustodiaError {
    let message = e.to_string();
    if message.contains(IMMUTABLE_MARKER) {
        warn!(table, %message, "rejected mutation of immutable record");
        CustodiaError::ImmutableRecordViolation {
            table: table.to_owned(),
            detail: message,
        }
    } else {
        CustodiaError::Database(format!("{table}: {message}"))
    }
}

/// Wrap a parse failure on column `idx` as a rusqlite conversion error.
pub fn conversion_err<E>(idx: usize, e: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

/// Parse an RFC 3339 column into UTC.
pub fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_err(idx, e))
}

/// Parse a column holding a `FromStr` value (ids, action tags).
pub fn parse_column<T>(idx: usize, raw: &str) -> rusqlite::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.parse().map_err(|e| conversion_err(idx, e))
}

fn parse_json(idx: usize, raw: Option<String>) -> rusqlite::Result<Option<Value>> {
    raw.map(|s| serde_json::from_str(&s).map_err(|e| conversion_err(idx, e)))
        .transpose()
}

fn json_text(v: &Option<Value>) -> Option<String> {
    v.as_ref().map(Value::to_string)
}

/// Column `idx` as text whatever its storage class.
fn raw_text(row: &Row<'_>, idx: usize) -> Option<String> {
    match row.get_ref(idx).ok()? {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        ValueRef::Text(t) => Some(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Some(hex::encode(b)),
    }
}

/// `CREATE TRIGGER` statements that make `table` insert-only.
fn immutability_triggers(table: &str) -> String {
    format!(
        "CREATE TRIGGER IF NOT EXISTS {table}_no_update
         BEFORE UPDATE ON {table}
         BEGIN
             SELECT RAISE(ABORT, '{IMMUTABLE_MARKER}: {table} entries cannot be updated');
         END;
         CREATE TRIGGER IF NOT EXISTS {table}_no_delete
         BEFORE DELETE ON {table}
         BEGIN
             SELECT RAISE(ABORT, '{IMMUTABLE_MARKER}: {table} entries cannot be deleted');
         END;"
    )
}

// ---------------------------------------------------------------------------
// Ledger kinds
// ---------------------------------------------------------------------------

/// Storage description of one append-only record type.
pub trait LedgerKind {
    const TABLE: &'static str;
    const CREATE_TABLE_SQL: &'static str;
    /// Column list in the order `from_row` expects.
    const COLUMNS: &'static str;
    /// Positions of `timestamp` and `record_hash` within `COLUMNS`.
    const TIMESTAMP_COLUMN: usize;
    const RECORD_HASH_COLUMN: usize;

    type Draft;
    type Entry: SignedRecord + Clone;

    /// Materialise a draft with the ledger-assigned id and time.
    fn build(draft: Self::Draft, id: EntryId, timestamp: DateTime<Utc>) -> Self::Entry;
    fn attach_seal(entry: &mut Self::Entry, record_hash: String, signature: String);
    fn entry_id(entry: &Self::Entry) -> EntryId;
    fn insert(conn: &Connection, entry: &Self::Entry) -> rusqlite::Result<usize>;
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self::Entry>;
}

/// Chain-of-custody records, keyed by evidence item.
pub struct Custody;

/// System-wide audit-log records.
pub struct Audit;

impl LedgerKind for Custody {
    const TABLE: &'static str = "chain_of_custody";
    const CREATE_TABLE_SQL: &'static str = r#"
        CREATE TABLE IF NOT EXISTS chain_of_custody (
            id                  TEXT PRIMARY KEY,
            evidence_id         TEXT NOT NULL,
            action              TEXT NOT NULL,
            actor_id            TEXT NOT NULL,
            timestamp           TEXT NOT NULL,
            ip_address          TEXT,
            user_agent          TEXT,
            request_method      TEXT,
            request_path        TEXT,
            notes               TEXT,
            extra_data          TEXT,
            hash_verified       INTEGER,
            hash_match          INTEGER,
            sha256_calculated   TEXT,
            sha512_calculated   TEXT,
            record_hash         TEXT NOT NULL,
            timestamp_signature TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_custody_evidence ON chain_of_custody (evidence_id);
        CREATE INDEX IF NOT EXISTS idx_custody_timestamp ON chain_of_custody (timestamp);
    "#;
    const COLUMNS: &'static str = "id, evidence_id, action, actor_id, timestamp, ip_address, \
         user_agent, request_method, request_path, notes, extra_data, hash_verified, \
         hash_match, sha256_calculated, sha512_calculated, record_hash, timestamp_signature";
    const TIMESTAMP_COLUMN: usize = 4;
    const RECORD_HASH_COLUMN: usize = 15;

    type Draft = CustodyDraft;
    type Entry = ChainOfCustodyEntry;

    fn build(draft: CustodyDraft, id: EntryId, timestamp: DateTime<Utc>) -> ChainOfCustodyEntry {
        ChainOfCustodyEntry {
            id,
            evidence_id: draft.evidence_id,
            action: draft.action,
            actor: draft.actor,
            timestamp,
            context: draft.context,
            hash_check: draft.hash_check,
            notes: draft.notes,
            extra_data: draft.extra_data,
            record_hash: None,
            timestamp_signature: None,
        }
    }

    fn attach_seal(entry: &mut ChainOfCustodyEntry, record_hash: String, signature: String) {
        entry.record_hash = Some(record_hash);
        entry.timestamp_signature = Some(signature);
    }

    fn entry_id(entry: &ChainOfCustodyEntry) -> EntryId {
        entry.id
    }

    fn insert(conn: &Connection, e: &ChainOfCustodyEntry) -> rusqlite::Result<usize> {
        conn.execute(
            "INSERT INTO chain_of_custody (id, evidence_id, action, actor_id, timestamp,
             ip_address, user_agent, request_method, request_path, notes, extra_data,
             hash_verified, hash_match, sha256_calculated, sha512_calculated,
             record_hash, timestamp_signature)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
            params![
                e.id.to_string(),
                e.evidence_id.to_string(),
                e.action.as_str(),
                e.actor.to_string(),
                crate::timestamp::format_timestamp(&e.timestamp),
                e.context.ip_address,
                e.context.user_agent,
                e.context.request_method,
                e.context.request_path,
                e.notes,
                json_text(&e.extra_data),
                e.hash_check.hash_verified,
                e.hash_check.hash_match,
                e.hash_check.sha256_calculated,
                e.hash_check.sha512_calculated,
                e.record_hash,
                e.timestamp_signature,
            ],
        )
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<ChainOfCustodyEntry> {
        let id: String = row.get(0)?;
        let evidence_id: String = row.get(1)?;
        let action: String = row.get(2)?;
        let actor_id: String = row.get(3)?;
        let timestamp: String = row.get(4)?;

        Ok(ChainOfCustodyEntry {
            id: parse_column(0, &id)?,
            evidence_id: parse_column(1, &evidence_id)?,
            action: parse_column(2, &action)?,
            actor: parse_column(3, &actor_id)?,
            timestamp: parse_timestamp(4, &timestamp)?,
            context: RequestContext {
                ip_address: row.get(5)?,
                user_agent: row.get(6)?,
                request_method: row.get(7)?,
                request_path: row.get(8)?,
            },
            notes: row.get(9)?,
            extra_data: parse_json(10, row.get(10)?)?,
            hash_check: HashCheck {
                hash_verified: row.get(11)?,
                hash_match: row.get(12)?,
                sha256_calculated: row.get(13)?,
                sha512_calculated: row.get(14)?,
            },
            record_hash: row.get(15)?,
            timestamp_signature: row.get(16)?,
        })
    }
}

impl LedgerKind for Audit {
    const TABLE: &'static str = "audit_log";
    const CREATE_TABLE_SQL: &'static str = r#"
        CREATE TABLE IF NOT EXISTS audit_log (
            id                  TEXT PRIMARY KEY,
            action              TEXT NOT NULL,
            resource_type       TEXT NOT NULL,
            resource_id         TEXT,
            description         TEXT,
            actor_id            TEXT,
            actor_email         TEXT,
            ip_address          TEXT,
            user_agent          TEXT,
            request_method      TEXT,
            request_path        TEXT,
            extra_data          TEXT,
            timestamp           TEXT NOT NULL,
            record_hash         TEXT NOT NULL,
            timestamp_signature TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_audit_actor ON audit_log (actor_id);
        CREATE INDEX IF NOT EXISTS idx_audit_resource ON audit_log (resource_type, resource_id);
        CREATE INDEX IF NOT EXISTS idx_audit_timestamp ON audit_log (timestamp);
    "#;
    const COLUMNS: &'static str = "id, action, resource_type, resource_id, description, \
         actor_id, actor_email, ip_address, user_agent, request_method, request_path, \
         extra_data, timestamp, record_hash, timestamp_signature";
    const TIMESTAMP_COLUMN: usize = 12;
    const RECORD_HASH_COLUMN: usize = 13;

    type Draft = AuditDraft;
    type Entry = AuditLogEntry;

    fn build(draft: AuditDraft, id: EntryId, timestamp: DateTime<Utc>) -> AuditLogEntry {
        AuditLogEntry {
            id,
            action: draft.action,
            resource_type: draft.resource_type,
            resource_id: draft.resource_id,
            description: draft.description,
            actor: draft.actor,
            context: draft.context,
            extra_data: draft.extra_data,
            timestamp,
            record_hash: None,
            timestamp_signature: None,
        }
    }

    fn attach_seal(entry: &mut AuditLogEntry, record_hash: String, signature: String) {
        entry.record_hash = Some(record_hash);
        entry.timestamp_signature = Some(signature);
    }

    fn entry_id(entry: &AuditLogEntry) -> EntryId {
        entry.id
    }

    fn insert(conn: &Connection, e: &AuditLogEntry) -> rusqlite::Result<usize> {
        conn.execute(
            "INSERT INTO audit_log (id, action, resource_type, resource_id, description,
             actor_id, actor_email, ip_address, user_agent, request_method, request_path,
             extra_data, timestamp, record_hash, timestamp_signature)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                e.id.to_string(),
                e.action.as_str(),
                e.resource_type,
                e.resource_id,
                e.description,
                e.actor.as_ref().map(|a| a.id.to_string()),
                e.actor.as_ref().map(|a| a.email.clone()),
                e.context.ip_address,
                e.context.user_agent,
                e.context.request_method,
                e.context.request_path,
                json_text(&e.extra_data),
                crate::timestamp::format_timestamp(&e.timestamp),
                e.record_hash,
                e.timestamp_signature,
            ],
        )
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<AuditLogEntry> {
        let id: String = row.get(0)?;
        let action: String = row.get(1)?;
        let actor_id: Option<String> = row.get(5)?;
        let actor_email: Option<String> = row.get(6)?;
        let timestamp: String = row.get(12)?;

        let actor = match actor_id {
            Some(raw) => Some(Actor {
                id: parse_column::<ActorId>(5, &raw)?,
                email: actor_email.unwrap_or_default(),
            }),
            None => None,
        };

        Ok(AuditLogEntry {
            id: parse_column(0, &id)?,
            action: parse_column(1, &action)?,
            resource_type: row.get(2)?,
            resource_id: row.get(3)?,
            description: row.get(4)?,
            actor,
            context: RequestContext {
                ip_address: row.get(7)?,
                user_agent: row.get(8)?,
                request_method: row.get(9)?,
                request_path: row.get(10)?,
            },
            extra_data: parse_json(11, row.get(11)?)?,
            timestamp: parse_timestamp(12, &timestamp)?,
            record_hash: row.get(13)?,
            timestamp_signature: row.get(14)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// Result of re-verifying every entry in a ledger.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerReport {
    pub table: String,
    pub checked: usize,
    pub valid: usize,
    /// Entries whose hash or signature no longer validates, keyed by the id
    /// text as stored (an edited id may no longer parse).
    pub tampered: Vec<(String, SignatureCheck)>,
}

impl LedgerReport {
    pub fn is_clean(&self) -> bool {
        self.tampered.is_empty()
    }
}

/// One stored row: a decoded entry, or what could still be read of a row
/// whose columns were edited into values the entry type rejects.
enum StoredRow<E> {
    Entry(E),
    Corrupt {
        id: String,
        timestamp: Option<String>,
        record_hash: Option<String>,
        detail: String,
    },
}

impl<E> StoredRow<E> {
    fn read<K: LedgerKind<Entry = E>>(row: &Row<'_>) -> Self {
        match K::from_row(row) {
            Ok(entry) => Self::Entry(entry),
            Err(e) => Self::Corrupt {
                id: raw_text(row, 0).unwrap_or_default(),
                timestamp: raw_text(row, K::TIMESTAMP_COLUMN),
                record_hash: raw_text(row, K::RECORD_HASH_COLUMN),
                detail: e.to_string(),
            },
        }
    }
}

/// Append-only store of signed records of kind `K`.
///
/// The only mutation is [`Ledger::append`]. Each worker thread should open
/// its own `Ledger` on the shared database file; appends from different
/// connections need no coordination beyond SQLite's own write lock, because
/// every entry gets a fresh random id.
pub struct Ledger<K: LedgerKind> {
    conn: Connection,
    authority: Arc<TimestampAuthority>,
    _kind: PhantomData<K>,
}

pub type CustodyLedger = Ledger<Custody>;
pub type AuditLedger = Ledger<Audit>;

impl<K: LedgerKind> Ledger<K> {
    /// Open (or create) the ledger table in the database at `path`.
    #[instrument(skip_all, fields(table = K::TABLE, path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>, authority: Arc<TimestampAuthority>) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| db_err(K::TABLE, e))?;

        conn.busy_timeout(Duration::from_secs(5))
            .map_err(|e| db_err(K::TABLE, e))?;
        // WAL lets readers proceed while another connection appends.
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| db_err(K::TABLE, e))?;

        Self::init(conn, authority)
    }

    /// Open an in-memory ledger (useful for tests).
    pub fn open_in_memory(authority: Arc<TimestampAuthority>) -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| db_err(K::TABLE, e))?;
        Self::init(conn, authority)
    }

    fn init(conn: Connection, authority: Arc<TimestampAuthority>) -> Result<Self> {
        conn.execute_batch(K::CREATE_TABLE_SQL)
            .map_err(|e| db_err(K::TABLE, e))?;
        conn.execute_batch(&immutability_triggers(K::TABLE))
            .map_err(|e| db_err(K::TABLE, e))?;

        debug!(table = K::TABLE, "ledger opened");
        Ok(Self {
            conn,
            authority,
            _kind: PhantomData,
        })
    }

    /// Append a new entry: assign id and server UTC time, seal, and insert in
    /// a single statement.
    #[instrument(skip_all, fields(table = K::TABLE))]
    pub fn append(&self, draft: K::Draft) -> Result<K::Entry> {
        let timestamp = Utc::now().trunc_subsecs(6);
        let mut entry = K::build(draft, EntryId::new(), timestamp);

        let (record_hash, signature) = self.authority.seal(&entry);
        K::attach_seal(&mut entry, record_hash, signature);

        K::insert(&self.conn, &entry).map_err(|e| db_err(K::TABLE, e))?;

        info!(table = K::TABLE, entry_id = %K::entry_id(&entry), "ledger entry appended");
        Ok(entry)
    }

    /// Fetch one entry by id.
    pub fn get(&self, id: &EntryId) -> Result<Option<K::Entry>> {
        let mut entries = self.query("WHERE id = ?1", params![id.to_string()])?;
        Ok(entries.pop())
    }

    /// Every entry, oldest first.
    pub fn entries(&self) -> Result<Vec<K::Entry>> {
        self.query("", [])
    }

    /// Total number of entries.
    pub fn count(&self) -> Result<u64> {
        self.conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", K::TABLE), [], |row| {
                row.get::<_, i64>(0)
            })
            .map(|n| n as u64)
            .map_err(|e| db_err(K::TABLE, e))
    }

    /// Re-verify one stored entry against its current field values.
    ///
    /// A row that no longer decodes is reported as a hash mismatch.
    pub fn verify(&self, id: &EntryId) -> Result<SignatureCheck> {
        let row = self
            .read_rows("WHERE id = ?1", "", params![id.to_string()])?
            .pop()
            .ok_or_else(|| CustodiaError::NotFound {
                kind: "ledger entry",
                id: id.to_string(),
            })?;
        Ok(self.check(row).1)
    }

    /// Re-verify every entry. Rows that no longer decode are counted and
    /// reported as tampered rather than aborting the run.
    #[instrument(skip_all, fields(table = K::TABLE))]
    pub fn verify_all(&self) -> Result<LedgerReport> {
        let mut report = LedgerReport {
            table: K::TABLE.to_owned(),
            ..LedgerReport::default()
        };
        for row in self.read_rows("", "ORDER BY timestamp ASC, rowid ASC", [])? {
            let (id, check) = self.check(row);
            report.checked += 1;
            if check.valid {
                report.valid += 1;
            } else {
                report.tampered.push((id, check));
            }
        }
        if !report.is_clean() {
            warn!(tampered = report.tampered.len(), "ledger verification found invalid entries");
        }
        Ok(report)
    }

    fn check(&self, row: StoredRow<K::Entry>) -> (String, SignatureCheck) {
        match row {
            StoredRow::Entry(entry) => {
                let check = self.authority.verify(&entry);
                (K::entry_id(&entry).to_string(), check)
            }
            StoredRow::Corrupt {
                id,
                timestamp,
                record_hash,
                detail,
            } => {
                warn!(table = K::TABLE, entry_id = %id, %detail, "ledger row no longer decodes");
                let check = SignatureCheck {
                    valid: false,
                    signed: record_hash.is_some(),
                    failure: Some(VerifyFailure::HashMismatch),
                    stored_hash: record_hash,
                    current_hash: String::new(),
                    timestamp: timestamp.unwrap_or_default(),
                };
                (id, check)
            }
        }
    }

    /// Run `SELECT <columns> FROM <table> <filter>` ordered oldest first.
    fn query<P: Params>(&self, filter: &str, params: P) -> Result<Vec<K::Entry>> {
        self.query_ordered(filter, "ORDER BY timestamp ASC, rowid ASC", params)
    }

    /// Like `read_rows`, but a row that no longer decodes fails the read as
    /// tamper evidence.
    fn query_ordered<P: Params>(&self, filter: &str, order: &str, params: P) -> Result<Vec<K::Entry>> {
        self.read_rows(filter, order, params)?
            .into_iter()
            .map(|row| match row {
                StoredRow::Entry(entry) => Ok(entry),
                StoredRow::Corrupt { id, detail, .. } => {
                    warn!(table = K::TABLE, entry_id = %id, %detail, "ledger row no longer decodes");
                    Err(IntegrityError::CorruptLedgerRecord {
                        table: K::TABLE.to_owned(),
                        entry_id: id,
                        detail,
                    }
                    .into())
                }
            })
            .collect()
    }

    fn read_rows<P: Params>(
        &self,
        filter: &str,
        order: &str,
        params: P,
    ) -> Result<Vec<StoredRow<K::Entry>>> {
        let sql = format!("SELECT {} FROM {} {filter} {order}", K::COLUMNS, K::TABLE);
        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| db_err(K::TABLE, e))?;
        let mut rows = stmt.query(params).map_err(|e| db_err(K::TABLE, e))?;

        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(|e| db_err(K::TABLE, e))? {
            out.push(StoredRow::read::<K>(row));
        }
        Ok(out)
    }
}

impl Ledger<Custody> {
    /// The chain of custody of one evidence item, oldest first.
    pub fn entries_for_evidence(&self, evidence_id: &EvidenceId) -> Result<Vec<ChainOfCustodyEntry>> {
        self.query("WHERE evidence_id = ?1", params![evidence_id.to_string()])
    }
}

impl Ledger<Audit> {
    /// Entries recorded against one actor, oldest first.
    pub fn entries_for_actor(&self, actor: &ActorId) -> Result<Vec<AuditLogEntry>> {
        self.query("WHERE actor_id = ?1", params![actor.to_string()])
    }

    /// Entries about one resource, oldest first.
    pub fn entries_for_resource(
        &self,
        resource_type: &str,
        resource_id: &str,
    ) -> Result<Vec<AuditLogEntry>> {
        self.query(
            "WHERE resource_type = ?1 AND resource_id = ?2",
            params![resource_type, resource_id],
        )
    }

    /// The most recent `limit` entries, newest first.
    pub fn recent(&self, limit: u32) -> Result<Vec<AuditLogEntry>> {
        self.query_ordered(
            "",
            "ORDER BY timestamp DESC, rowid DESC LIMIT ?1",
            params![limit],
        )
    }
}

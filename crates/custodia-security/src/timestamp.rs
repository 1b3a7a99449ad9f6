// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Internal timestamp authority: canonical record hashing and HMAC-SHA256
// signatures proving a record's content and claimed creation time.
//
// Signature input:
//
//   HMAC-SHA256(K, record_hash || "|" || RFC3339(timestamp))
//   K = SHA-256("timestamp-" || application secret)
//
// # Trust boundary
//
// No external timestamping service is involved. Whoever holds the application
// secret can mint a valid signature for any content and any time; the
// signatures prove only that a record was written by a holder of that secret
// and has not been edited since.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use custodia_core::config::Secrets;
use custodia_core::error::{CustodiaError, Result};
use custodia_core::types::{AuditLogEntry, ChainOfCustodyEntry};
use ring::hmac;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

/// Domain-separation label prepended to the secret before key derivation.
pub const SIGNING_KEY_LABEL: &str = "timestamp-";

/// Version tag and hashed fields for chain-of-custody entries.
pub const CUSTODY_SCHEMA: &str = "custody.v1";
pub const CUSTODY_FIELDS: [&str; 10] = [
    "action",
    "actor_id",
    "evidence_id",
    "hash_match",
    "hash_verified",
    "ip_address",
    "notes",
    "sha256_calculated",
    "sha512_calculated",
    "timestamp",
];

/// Version tag and hashed fields for audit-log entries.
pub const AUDIT_SCHEMA: &str = "audit.v1";
pub const AUDIT_FIELDS: [&str; 8] = [
    "action",
    "actor_email",
    "actor_id",
    "description",
    "ip_address",
    "resource_id",
    "resource_type",
    "timestamp",
];

/// Key under which the schema tag is hashed with the fields.
const SCHEMA_KEY: &str = "_schema";

/// Render a ledger timestamp the one way it is ever rendered for signing.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Derive the dedicated signing key. The raw secret is never used as a key.
pub fn derive_signing_key(secret: &str) -> Result<[u8; 32]> {
    if secret.is_empty() {
        return Err(CustodiaError::Config("application secret is not configured".into()));
    }
    let mut hasher = Sha256::new();
    hasher.update(SIGNING_KEY_LABEL.as_bytes());
    hasher.update(secret.as_bytes());
    Ok(hasher.finalize().into())
}

// ---------------------------------------------------------------------------
// Canonical documents
// ---------------------------------------------------------------------------

/// The fixed, named field set of one record, serialised with sorted keys.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalDocument {
    schema: &'static str,
    fields: BTreeMap<&'static str, Value>,
}

impl CanonicalDocument {
    pub fn new(schema: &'static str) -> Self {
        Self {
            schema,
            fields: BTreeMap::new(),
        }
    }

    pub fn field(mut self, name: &'static str, value: impl Into<Value>) -> Self {
        self.fields.insert(name, value.into());
        self
    }

    pub fn schema(&self) -> &'static str {
        self.schema
    }

    pub fn field_names(&self) -> Vec<&'static str> {
        self.fields.keys().copied().collect()
    }

    /// Deterministic byte encoding: compact JSON, keys sorted, schema tag
    /// included.
    pub fn to_canonical_bytes(&self) -> Vec<u8> {
        let schema = Value::from(self.schema);
        let mut map: BTreeMap<&str, &Value> = self.fields.iter().map(|(k, v)| (*k, v)).collect();
        map.insert(SCHEMA_KEY, &schema);
        // A BTreeMap of strings to JSON values always serialises.
        serde_json::to_vec(&map).unwrap_or_default()
    }
}

/// SHA-256 over the canonical encoding, lowercase hex.
pub fn canonical_hash(doc: &CanonicalDocument) -> String {
    hex::encode(Sha256::digest(doc.to_canonical_bytes()))
}

/// A ledger record that carries its own hash and timestamp signature.
pub trait SignedRecord {
    /// Rebuild the canonical document from the record's current field values.
    fn canonical_document(&self) -> CanonicalDocument;
    fn signed_at(&self) -> DateTime<Utc>;
    fn stored_hash(&self) -> Option<&str>;
    fn stored_signature(&self) -> Option<&str>;
}

fn opt_str(v: Option<&str>) -> Value {
    v.map(Value::from).unwrap_or(Value::Null)
}

fn opt_bool(v: Option<bool>) -> Value {
    v.map(Value::from).unwrap_or(Value::Null)
}

impl SignedRecord for ChainOfCustodyEntry {
    fn canonical_document(&self) -> CanonicalDocument {
        CanonicalDocument::new(CUSTODY_SCHEMA)
            .field("action", self.action.as_str())
            .field("actor_id", self.actor.to_string())
            .field("evidence_id", self.evidence_id.to_string())
            .field("hash_match", opt_bool(self.hash_check.hash_match))
            .field("hash_verified", opt_bool(self.hash_check.hash_verified))
            .field("ip_address", opt_str(self.context.ip_address.as_deref()))
            .field("notes", opt_str(self.notes.as_deref()))
            .field(
                "sha256_calculated",
                opt_str(self.hash_check.sha256_calculated.as_deref()),
            )
            .field(
                "sha512_calculated",
                opt_str(self.hash_check.sha512_calculated.as_deref()),
            )
            .field("timestamp", format_timestamp(&self.timestamp))
    }

    fn signed_at(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn stored_hash(&self) -> Option<&str> {
        self.record_hash.as_deref()
    }

    fn stored_signature(&self) -> Option<&str> {
        self.timestamp_signature.as_deref()
    }
}

impl SignedRecord for AuditLogEntry {
    fn canonical_document(&self) -> CanonicalDocument {
        CanonicalDocument::new(AUDIT_SCHEMA)
            .field("action", self.action.as_str())
            .field(
                "actor_email",
                opt_str(self.actor.as_ref().map(|a| a.email.as_str())),
            )
            .field(
                "actor_id",
                self.actor
                    .as_ref()
                    .map(|a| Value::from(a.id.to_string()))
                    .unwrap_or(Value::Null),
            )
            .field("description", opt_str(self.description.as_deref()))
            .field("ip_address", opt_str(self.context.ip_address.as_deref()))
            .field("resource_id", opt_str(self.resource_id.as_deref()))
            .field("resource_type", self.resource_type.as_str())
            .field("timestamp", format_timestamp(&self.timestamp))
    }

    fn signed_at(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn stored_hash(&self) -> Option<&str> {
        self.record_hash.as_deref()
    }

    fn stored_signature(&self) -> Option<&str> {
        self.timestamp_signature.as_deref()
    }
}

// ---------------------------------------------------------------------------
// Verification results
// ---------------------------------------------------------------------------

/// Why a record failed verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerifyFailure {
    /// The record carries no hash or signature.
    Unsigned,
    /// The record's fields no longer hash to the stored value.
    HashMismatch,
    /// The hash matches but the signature does not.
    SignatureInvalid,
}

impl fmt::Display for VerifyFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unsigned => "no timestamp signature found",
            Self::HashMismatch => "record hash mismatch - data may have been tampered",
            Self::SignatureInvalid => "signature verification failed",
        })
    }
}

/// Outcome of verifying one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureCheck {
    pub valid: bool,
    pub signed: bool,
    pub failure: Option<VerifyFailure>,
    pub stored_hash: Option<String>,
    pub current_hash: String,
    pub timestamp: String,
}

// ---------------------------------------------------------------------------
// Authority
// ---------------------------------------------------------------------------

/// Signs and verifies ledger records with a key derived from the
/// application secret.
pub struct TimestampAuthority {
    key: hmac::Key,
}

impl TimestampAuthority {
    pub fn new(secret: &str) -> Result<Self> {
        let derived = derive_signing_key(secret)?;
        Ok(Self {
            key: hmac::Key::new(hmac::HMAC_SHA256, &derived),
        })
    }

    pub fn from_secrets(secrets: &Secrets) -> Result<Self> {
        Self::new(&secrets.app_secret)
    }

    fn message(record_hash: &str, timestamp: &DateTime<Utc>) -> String {
        format!("{record_hash}|{}", format_timestamp(timestamp))
    }

    /// HMAC over `record_hash | timestamp`, lowercase hex.
    pub fn sign(&self, record_hash: &str, timestamp: &DateTime<Utc>) -> String {
        let tag = hmac::sign(&self.key, Self::message(record_hash, timestamp).as_bytes());
        hex::encode(tag.as_ref())
    }

    /// Constant-time check of `signature_hex` against a fresh signature.
    pub fn verify_signature(
        &self,
        record_hash: &str,
        timestamp: &DateTime<Utc>,
        signature_hex: &str,
    ) -> bool {
        let Ok(tag) = hex::decode(signature_hex) else {
            return false;
        };
        hmac::verify(
            &self.key,
            Self::message(record_hash, timestamp).as_bytes(),
            &tag,
        )
        .is_ok()
    }

    /// Compute `(record_hash, timestamp_signature)` for a record about to be
    /// stored.
    pub fn seal<R: SignedRecord>(&self, record: &R) -> (String, String) {
        let record_hash = canonical_hash(&record.canonical_document());
        let signature = self.sign(&record_hash, &record.signed_at());
        debug!(%record_hash, "record sealed");
        (record_hash, signature)
    }

    /// Verify a stored record against its current field values.
    ///
    /// A hash mismatch is reported without checking the signature.
    pub fn verify<R: SignedRecord>(&self, record: &R) -> SignatureCheck {
        let current_hash = canonical_hash(&record.canonical_document());
        let timestamp = format_timestamp(&record.signed_at());

        let (Some(stored_hash), Some(signature)) = (record.stored_hash(), record.stored_signature())
        else {
            return SignatureCheck {
                valid: false,
                signed: false,
                failure: Some(VerifyFailure::Unsigned),
                stored_hash: record.stored_hash().map(str::to_owned),
                current_hash,
                timestamp,
            };
        };

        if current_hash != stored_hash {
            warn!(%stored_hash, %current_hash, "ledger record hash mismatch");
            return SignatureCheck {
                valid: false,
                signed: true,
                failure: Some(VerifyFailure::HashMismatch),
                stored_hash: Some(stored_hash.to_owned()),
                current_hash,
                timestamp,
            };
        }

        let valid = self.verify_signature(stored_hash, &record.signed_at(), signature);
        if !valid {
            warn!(%stored_hash, "ledger record signature invalid");
        }
        SignatureCheck {
            valid,
            signed: true,
            failure: (!valid).then_some(VerifyFailure::SignatureInvalid),
            stored_hash: Some(stored_hash.to_owned()),
            current_hash,
            timestamp,
        }
    }
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Custodia evidence engine.
//
// Cases, evidence items, and ledger entries refer to one another only through
// the id newtypes below; nothing holds a pointer back to its owner.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for an evidence item.
    EvidenceId
);
uuid_id!(
    /// Identifier of the case an evidence item belongs to (owned by the
    /// external case component).
    CaseId
);
uuid_id!(
    /// Identifier of a user (owned by the external identity component).
    ActorId
);
uuid_id!(
    /// Identifier of a chain-of-custody or audit-log entry.
    EntryId
);

/// A stored tag string did not name any known variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} tag: {value:?}")]
pub struct UnknownTag {
    pub kind: &'static str,
    pub value: String,
}

// ---------------------------------------------------------------------------
// Closed tag sets
// ---------------------------------------------------------------------------

/// Taxonomy bucket of an evidence file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EvidenceType {
    Document,
    Image,
    Video,
    Audio,
    Email,
    WebCapture,
    StructuredData,
    Other,
}

impl EvidenceType {
    pub const ALL: [EvidenceType; 8] = [
        Self::Document,
        Self::Image,
        Self::Video,
        Self::Audio,
        Self::Email,
        Self::WebCapture,
        Self::StructuredData,
        Self::Other,
    ];

    /// Stable tag used in storage and ledger metadata.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Email => "email",
            Self::WebCapture => "web-capture",
            Self::StructuredData => "structured-data",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for EvidenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EvidenceType {
    type Err = UnknownTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownTag {
                kind: "evidence type",
                value: s.to_owned(),
            })
    }
}

/// Interactions recorded in an item's chain of custody.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CustodyAction {
    Uploaded,
    Viewed,
    Downloaded,
    Previewed,
    HashVerified,
    MetadataExtractionRequested,
    Deleted,
}

impl CustodyAction {
    pub const ALL: [CustodyAction; 7] = [
        Self::Uploaded,
        Self::Viewed,
        Self::Downloaded,
        Self::Previewed,
        Self::HashVerified,
        Self::MetadataExtractionRequested,
        Self::Deleted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uploaded => "UPLOADED",
            Self::Viewed => "VIEWED",
            Self::Downloaded => "DOWNLOADED",
            Self::Previewed => "PREVIEWED",
            Self::HashVerified => "HASH_VERIFIED",
            Self::MetadataExtractionRequested => "METADATA_EXTRACTION_REQUESTED",
            Self::Deleted => "DELETED",
        }
    }
}

impl fmt::Display for CustodyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CustodyAction {
    type Err = UnknownTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| UnknownTag {
                kind: "custody action",
                value: s.to_owned(),
            })
    }
}

/// System-wide security events recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    LoginSuccess,
    LoginFailed,
    Logout,
    MfaVerified,
    MfaFailed,
    CaseCreated,
    CaseClosed,
    LegitimacyValidated,
    EvidenceUploaded,
    EvidenceDeleted,
    EvidenceIntegrityFailed,
    ReportGenerated,
    ReportExported,
}

impl AuditAction {
    pub const ALL: [AuditAction; 13] = [
        Self::LoginSuccess,
        Self::LoginFailed,
        Self::Logout,
        Self::MfaVerified,
        Self::MfaFailed,
        Self::CaseCreated,
        Self::CaseClosed,
        Self::LegitimacyValidated,
        Self::EvidenceUploaded,
        Self::EvidenceDeleted,
        Self::EvidenceIntegrityFailed,
        Self::ReportGenerated,
        Self::ReportExported,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LoginSuccess => "LOGIN_SUCCESS",
            Self::LoginFailed => "LOGIN_FAILED",
            Self::Logout => "LOGOUT",
            Self::MfaVerified => "MFA_VERIFIED",
            Self::MfaFailed => "MFA_FAILED",
            Self::CaseCreated => "CASE_CREATED",
            Self::CaseClosed => "CASE_CLOSED",
            Self::LegitimacyValidated => "LEGITIMACY_VALIDATED",
            Self::EvidenceUploaded => "EVIDENCE_UPLOADED",
            Self::EvidenceDeleted => "EVIDENCE_DELETED",
            Self::EvidenceIntegrityFailed => "EVIDENCE_INTEGRITY_FAILED",
            Self::ReportGenerated => "REPORT_GENERATED",
            Self::ReportExported => "REPORT_EXPORTED",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditAction {
    type Err = UnknownTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| UnknownTag {
                kind: "audit action",
                value: s.to_owned(),
            })
    }
}

// ---------------------------------------------------------------------------
// Collaborator-supplied context
// ---------------------------------------------------------------------------

/// The authenticated user performing an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: ActorId,
    /// Denormalised so the audit trail survives account removal.
    pub email: String,
}

impl Actor {
    pub fn new(id: ActorId, email: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
        }
    }
}

/// Request metadata captured by whatever front end invoked the core.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub request_method: Option<String>,
    pub request_path: Option<String>,
}

impl RequestContext {
    /// Context for operations started from a local terminal or job runner.
    pub fn local(tool: &str) -> Self {
        Self {
            ip_address: Some("127.0.0.1".into()),
            user_agent: Some(tool.to_owned()),
            request_method: None,
            request_path: None,
        }
    }
}

/// Case gating flags, owned by the external case component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseContext {
    pub case_id: CaseId,
    /// Human-facing case number, used in stored filenames.
    pub case_number: String,
    pub legitimacy_validated: bool,
    pub crime_detected: bool,
    pub crime_reported: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geolocation {
    pub latitude: f64,
    pub longitude: f64,
    pub description: Option<String>,
}

/// How and where an evidence file was obtained.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionInfo {
    pub date: Option<DateTime<Utc>>,
    pub method: Option<String>,
    pub tool: Option<String>,
    pub notes: Option<String>,
    pub source_device: Option<String>,
    pub source_location: Option<String>,
    pub geolocation: Option<Geolocation>,
}

// ---------------------------------------------------------------------------
// Integrity material
// ---------------------------------------------------------------------------

/// SHA-256 and SHA-512 of the same bytes, lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestPair {
    pub sha256: String,
    pub sha512: String,
}

impl DigestPair {
    /// Case-insensitive comparison, returning `(sha256_match, sha512_match)`.
    pub fn compare(&self, other: &DigestPair) -> (bool, bool) {
        (
            self.sha256.eq_ignore_ascii_case(&other.sha256),
            self.sha512.eq_ignore_ascii_case(&other.sha512),
        )
    }

    pub fn matches(&self, other: &DigestPair) -> bool {
        let (a, b) = self.compare(other);
        a && b
    }
}

/// Out-of-band encryption parameters recorded with an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionInfo {
    pub algorithm: String,
    pub nonce_hex: String,
}

// ---------------------------------------------------------------------------
// Evidence
// ---------------------------------------------------------------------------

/// A single forensic artefact tied to a case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceItem {
    pub id: EvidenceId,
    pub case_id: CaseId,
    pub original_filename: String,
    pub stored_filename: String,
    /// Location of the (normally encrypted) blob on disk.
    pub blob_path: String,
    /// Plaintext size in bytes.
    pub file_size: u64,
    pub mime_type: Option<String>,
    pub evidence_type: EvidenceType,
    /// Written once at creation, computed over the plaintext.
    pub digests: DigestPair,
    /// `None` for items stored in the clear.
    pub encryption: Option<EncryptionInfo>,
    pub acquisition: AcquisitionInfo,
    pub description: Option<String>,
    pub uploaded_by: ActorId,
    pub uploaded_at: DateTime<Utc>,
    pub integrity_verified: bool,
    pub last_verified_at: Option<DateTime<Utc>>,
    pub deleted: Option<SoftDeletion>,
}

impl EvidenceItem {
    pub fn is_encrypted(&self) -> bool {
        self.encryption.is_some()
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoftDeletion {
    pub deleted_at: DateTime<Utc>,
    pub deleted_by: ActorId,
}

// ---------------------------------------------------------------------------
// Ledger records
// ---------------------------------------------------------------------------

/// Outcome fields carried by HASH_VERIFIED (and UPLOADED) custody entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashCheck {
    pub hash_verified: Option<bool>,
    pub hash_match: Option<bool>,
    pub sha256_calculated: Option<String>,
    pub sha512_calculated: Option<String>,
}

impl HashCheck {
    pub fn completed(matched: bool, computed: Option<&DigestPair>) -> Self {
        Self {
            hash_verified: Some(true),
            hash_match: Some(matched),
            sha256_calculated: computed.map(|d| d.sha256.clone()),
            sha512_calculated: computed.map(|d| d.sha512.clone()),
        }
    }

    /// A check that could not run to completion (I/O failure, missing blob).
    pub fn aborted() -> Self {
        Self {
            hash_verified: Some(false),
            ..Self::default()
        }
    }
}

/// What a caller supplies to append a custody entry. The ledger assigns the
/// id, timestamp, hash, and signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustodyDraft {
    pub evidence_id: EvidenceId,
    pub action: CustodyAction,
    pub actor: ActorId,
    pub context: RequestContext,
    pub hash_check: HashCheck,
    pub notes: Option<String>,
    pub extra_data: Option<Value>,
}

impl CustodyDraft {
    pub fn new(evidence_id: EvidenceId, action: CustodyAction, actor: ActorId) -> Self {
        Self {
            evidence_id,
            action,
            actor,
            context: RequestContext::default(),
            hash_check: HashCheck::default(),
            notes: None,
            extra_data: None,
        }
    }

    pub fn with_context(mut self, context: RequestContext) -> Self {
        self.context = context;
        self
    }

    pub fn with_hash_check(mut self, check: HashCheck) -> Self {
        self.hash_check = check;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_extra(mut self, extra: Value) -> Self {
        self.extra_data = Some(extra);
        self
    }
}

/// An immutable chain-of-custody record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainOfCustodyEntry {
    pub id: EntryId,
    pub evidence_id: EvidenceId,
    pub action: CustodyAction,
    pub actor: ActorId,
    pub timestamp: DateTime<Utc>,
    pub context: RequestContext,
    pub hash_check: HashCheck,
    pub notes: Option<String>,
    pub extra_data: Option<Value>,
    pub record_hash: Option<String>,
    pub timestamp_signature: Option<String>,
}

/// What a caller supplies to append an audit-log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditDraft {
    pub action: AuditAction,
    pub resource_type: String,
    pub resource_id: Option<String>,
    pub description: Option<String>,
    /// `None` for anonymous events such as failed logins.
    pub actor: Option<Actor>,
    pub context: RequestContext,
    pub extra_data: Option<Value>,
}

impl AuditDraft {
    pub fn new(action: AuditAction, resource_type: impl Into<String>) -> Self {
        Self {
            action,
            resource_type: resource_type.into(),
            resource_id: None,
            description: None,
            actor: None,
            context: RequestContext::default(),
            extra_data: None,
        }
    }

    pub fn by(mut self, actor: &Actor) -> Self {
        self.actor = Some(actor.clone());
        self
    }

    pub fn on(mut self, resource_id: impl fmt::Display) -> Self {
        self.resource_id = Some(resource_id.to_string());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_context(mut self, context: RequestContext) -> Self {
        self.context = context;
        self
    }

    pub fn with_extra(mut self, extra: Value) -> Self {
        self.extra_data = Some(extra);
        self
    }
}

/// An immutable audit-log record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: EntryId,
    pub action: AuditAction,
    pub resource_type: String,
    pub resource_id: Option<String>,
    pub description: Option<String>,
    pub actor: Option<Actor>,
    pub context: RequestContext,
    pub extra_data: Option<Value>,
    pub timestamp: DateTime<Utc>,
    pub record_hash: Option<String>,
    pub timestamp_signature: Option<String>,
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

/// Result of re-hashing a stored evidence item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub evidence_id: EvidenceId,
    /// Both digests matched the values recorded at upload.
    pub verified: bool,
    pub sha256_match: bool,
    pub sha512_match: bool,
    /// `None` when decryption failed before anything could be hashed.
    pub computed: Option<DigestPair>,
    /// Populated whenever `verified` is false.
    pub failure: Option<crate::error::IntegrityError>,
    pub checked_at: DateTime<Utc>,
    /// The HASH_VERIFIED custody entry recording this run.
    pub custody_entry: EntryId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evidence_type_tags_round_trip() {
        for t in EvidenceType::ALL {
            assert_eq!(t.as_str().parse::<EvidenceType>().unwrap(), t);
        }
        assert!("spreadsheet".parse::<EvidenceType>().is_err());
    }

    #[test]
    fn custody_action_tags_match_wire_names() {
        assert_eq!(CustodyAction::HashVerified.as_str(), "HASH_VERIFIED");
        assert_eq!(
            serde_json::to_string(&CustodyAction::MetadataExtractionRequested).unwrap(),
            "\"METADATA_EXTRACTION_REQUESTED\""
        );
        for a in CustodyAction::ALL {
            assert_eq!(a.as_str().parse::<CustodyAction>().unwrap(), a);
        }
    }

    #[test]
    fn audit_action_parse_rejects_unknown() {
        assert_eq!(
            "LOGIN_FAILED".parse::<AuditAction>().unwrap(),
            AuditAction::LoginFailed
        );
        let err = "CASE_UPDATED".parse::<AuditAction>().unwrap_err();
        assert_eq!(err.kind, "audit action");
    }

    #[test]
    fn digest_comparison_ignores_case() {
        let stored = DigestPair {
            sha256: "ABCDEF".into(),
            sha512: "0123".into(),
        };
        let computed = DigestPair {
            sha256: "abcdef".into(),
            sha512: "0124".into(),
        };
        assert_eq!(stored.compare(&computed), (true, false));
        assert!(!stored.matches(&computed));
    }
}

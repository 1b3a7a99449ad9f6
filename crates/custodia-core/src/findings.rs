// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Investigator-facing findings.
//
// Every technical error is mapped to a short headline, a detail paragraph
// that keeps the concrete values (ids, digests, timestamps), and a severity
// that tells the investigator whether to treat it as tamper evidence.

use crate::error::{CustodiaError, IntegrityError, ValidationError};

/// How an investigator should treat an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Possible tampering: preserve the error text alongside the case file.
    TamperEvidence,
    /// The request was refused; the caller must fix something and retry.
    ActionRequired,
    /// The engine cannot run (bad configuration, unreadable database).
    Fatal,
    /// An operational failure that the calling collaborator may retry.
    Transient,
}

/// A human-readable account of an error.
#[derive(Debug, Clone)]
pub struct Finding {
    pub headline: String,
    pub detail: String,
    pub severity: Severity,
}

impl Finding {
    pub fn is_tamper_indicator(&self) -> bool {
        self.severity == Severity::TamperEvidence
    }
}

/// Describe `err` for the investigator.
pub fn describe(err: &CustodiaError) -> Finding {
    match err {
        CustodiaError::Config(detail) => Finding {
            headline: "The engine is not configured correctly.".into(),
            detail: format!("{detail}. Supply the evidence key and application secret, then restart."),
            severity: Severity::Fatal,
        },

        CustodiaError::Validation(v) => describe_validation(v),

        CustodiaError::Integrity(i) => describe_integrity(i),

        CustodiaError::ImmutableRecordViolation { table, detail } => Finding {
            headline: "Someone attempted to alter a ledger record.".into(),
            detail: format!(
                "The {table} store refused the change ({detail}). Ledger records can only be \
                 appended; record who issued this request."
            ),
            severity: Severity::TamperEvidence,
        },

        CustodiaError::NotFound { kind, id } => Finding {
            headline: format!("No {kind} with id {id}."),
            detail: "Check the identifier. Soft-deleted items remain retrievable by id.".into(),
            severity: Severity::ActionRequired,
        },

        CustodiaError::Crypto(detail) => Finding {
            headline: "A cryptographic primitive failed.".into(),
            detail: detail.clone(),
            severity: Severity::Fatal,
        },

        CustodiaError::Database(detail) => Finding {
            headline: "The evidence database reported an error.".into(),
            detail: detail.clone(),
            severity: Severity::Transient,
        },

        CustodiaError::Io(e) => Finding {
            headline: "A file could not be read or written.".into(),
            detail: e.to_string(),
            severity: Severity::Transient,
        },

        CustodiaError::Serialization(e) => Finding {
            headline: "Stored metadata could not be decoded.".into(),
            detail: e.to_string(),
            severity: Severity::Transient,
        },
    }
}

fn describe_validation(v: &ValidationError) -> Finding {
    let headline = match v {
        ValidationError::MissingFilename | ValidationError::EmptyFile => {
            "The upload contained no usable file."
        }
        ValidationError::TooLarge { .. } => "The file exceeds the upload size limit.",
        ValidationError::LegitimacyNotValidated { .. } => {
            "The case's legitimate interest has not been validated."
        }
        ValidationError::UnreportedCrime { .. } => {
            "The case has a detected crime that must be reported first."
        }
    };
    Finding {
        headline: headline.into(),
        detail: format!("{v}. Nothing was stored."),
        severity: Severity::ActionRequired,
    }
}

fn describe_integrity(i: &IntegrityError) -> Finding {
    let headline = match i {
        IntegrityError::AuthenticationFailed { .. } => {
            "The stored evidence blob failed authentication."
        }
        IntegrityError::TruncatedBlob { .. } => "The stored evidence blob has been truncated.",
        IntegrityError::DigestMismatch { .. } => {
            "The evidence no longer matches the digests recorded at acquisition."
        }
        IntegrityError::CorruptLedgerRecord { .. } => {
            "A ledger record was altered outside the engine and no longer decodes."
        }
    };
    Finding {
        headline: headline.into(),
        detail: i.to_string(),
        severity: Severity::TamperEvidence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn digest_mismatch_keeps_values() {
        let err = CustodiaError::Integrity(IntegrityError::DigestMismatch {
            evidence_id: "ev-1".into(),
            expected_sha256: "aa".into(),
            computed_sha256: "bb".into(),
            expected_sha512: "cc".into(),
            computed_sha512: "dd".into(),
            checked_at: Utc::now(),
        });
        let finding = describe(&err);
        assert!(finding.is_tamper_indicator());
        assert!(finding.detail.contains("ev-1"));
        assert!(finding.detail.contains("bb"));
    }

    #[test]
    fn undecodable_ledger_row_is_tamper_evidence() {
        let err = CustodiaError::Integrity(IntegrityError::CorruptLedgerRecord {
            table: "audit_log".into(),
            entry_id: "0b7c".into(),
            detail: "column 1: unknown action".into(),
        });
        let finding = describe(&err);
        assert_eq!(finding.severity, Severity::TamperEvidence);
        assert!(finding.detail.contains("0b7c"));
    }

    #[test]
    fn validation_is_actionable() {
        let err = CustodiaError::Validation(ValidationError::TooLarge { size: 10, max: 5 });
        let finding = describe(&err);
        assert_eq!(finding.severity, Severity::ActionRequired);
        assert!(finding.detail.contains("Nothing was stored"));
    }

    #[test]
    fn missing_key_is_fatal() {
        let finding = describe(&CustodiaError::Config("CUSTODIA_EVIDENCE_KEY is not set".into()));
        assert_eq!(finding.severity, Severity::Fatal);
    }
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Upload gating. Runs on the filename, declared size, and case flags only,
// so a doomed request is refused before any byte is hashed or encrypted.

use custodia_core::error::ValidationError;
use custodia_core::types::CaseContext;
use tracing::debug;

/// Check an upload against the size ceiling and the case's gating flags.
pub fn validate_upload(
    filename: &str,
    size: u64,
    case: &CaseContext,
    max_bytes: u64,
) -> Result<(), ValidationError> {
    if filename.trim().is_empty() {
        return Err(ValidationError::MissingFilename);
    }
    if size > max_bytes {
        return Err(ValidationError::TooLarge {
            size,
            max: max_bytes,
        });
    }
    if size == 0 {
        return Err(ValidationError::EmptyFile);
    }
    if !case.legitimacy_validated {
        return Err(ValidationError::LegitimacyNotValidated {
            case_number: case.case_number.clone(),
        });
    }
    if case.crime_detected && !case.crime_reported {
        return Err(ValidationError::UnreportedCrime {
            case_number: case.case_number.clone(),
        });
    }

    debug!(filename, size, case = %case.case_number, "upload passed validation");
    Ok(())
}

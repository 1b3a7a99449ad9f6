// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Evidence encryption: AES-256-GCM via `ring`.
//
// Blob layout on disk:
//
//   [12-byte nonce][ciphertext || 16-byte authentication tag]
//
// The algorithm name and nonce are also recorded out-of-band in the evidence
// record. No associated data is bound. A single externally supplied key
// encrypts every blob; there is no rotation or per-file key wrapping.

use std::fmt;

use custodia_core::config::Secrets;
use custodia_core::error::{CustodiaError, IntegrityError, Result};
use custodia_core::types::EncryptionInfo;
use ring::aead::{AES_256_GCM, Aad, LessSafeKey, NONCE_LEN, Nonce, UnboundKey};
use ring::rand::{SecureRandom, SystemRandom};
use tracing::{debug, instrument, warn};

/// Algorithm tag stored alongside each item.
pub const ALGORITHM: &str = "AES-256-GCM";
/// Key length in bytes.
pub const KEY_LEN: usize = 32;
/// Authentication tag length in bytes.
pub const TAG_LEN: usize = 16;
/// Smallest well-formed blob: nonce plus tag over an empty plaintext.
pub const MIN_BLOB_LEN: usize = NONCE_LEN + TAG_LEN;

/// A 256-bit evidence key.
pub struct EvidenceKey([u8; KEY_LEN]);

impl EvidenceKey {
    /// Parse a 64-hex-character key. Anything else is a configuration error.
    pub fn from_hex(key_hex: &str) -> Result<Self> {
        let trimmed = key_hex.trim();
        if trimmed.is_empty() {
            return Err(CustodiaError::Config("evidence key is not configured".into()));
        }
        if trimmed.len() != KEY_LEN * 2 {
            return Err(CustodiaError::Config(format!(
                "evidence key must be {} hex characters (256 bits), got {}",
                KEY_LEN * 2,
                trimmed.len()
            )));
        }
        let mut bytes = [0u8; KEY_LEN];
        hex::decode_to_slice(trimmed, &mut bytes)
            .map_err(|e| CustodiaError::Config(format!("evidence key is not valid hex: {e}")))?;
        Ok(Self(bytes))
    }

    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for EvidenceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EvidenceKey(<redacted>)")
    }
}

/// The output of one encryption call.
#[derive(Debug, Clone)]
pub struct EncryptedBlob {
    /// Complete on-disk blob: nonce followed by ciphertext and tag.
    pub bytes: Vec<u8>,
    pub nonce: [u8; NONCE_LEN],
}

impl EncryptedBlob {
    pub fn info(&self) -> EncryptionInfo {
        EncryptionInfo {
            algorithm: ALGORITHM.to_owned(),
            nonce_hex: hex::encode(self.nonce),
        }
    }
}

/// Authenticated encryption of evidence payloads under one key.
///
/// Stateless apart from the key, so a single engine may be shared by
/// reference across threads.
pub struct EncryptionEngine {
    key: LessSafeKey,
    rng: SystemRandom,
}

impl EncryptionEngine {
    pub fn new(key: &EvidenceKey) -> Result<Self> {
        let unbound = UnboundKey::new(&AES_256_GCM, &key.0)
            .map_err(|_| CustodiaError::Config("AES-256-GCM rejected the evidence key".into()))?;
        Ok(Self {
            key: LessSafeKey::new(unbound),
            rng: SystemRandom::new(),
        })
    }

    /// Build an engine from the configured secrets, failing fast when the
    /// key is absent or malformed.
    pub fn from_secrets(secrets: &Secrets) -> Result<Self> {
        Self::new(&EvidenceKey::from_hex(&secrets.evidence_key_hex)?)
    }

    /// Encrypt `plaintext` under a fresh random 96-bit nonce.
    #[instrument(skip_all, fields(plaintext_len = plaintext.len()))]
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<EncryptedBlob> {
        let mut nonce = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut nonce)
            .map_err(|_| CustodiaError::Crypto("system RNG unavailable".into()))?;

        let mut in_out = Vec::with_capacity(NONCE_LEN + plaintext.len() + TAG_LEN);
        in_out.extend_from_slice(plaintext);
        self.key
            .seal_in_place_append_tag(Nonce::assume_unique_for_key(nonce), Aad::empty(), &mut in_out)
            .map_err(|_| CustodiaError::Crypto("AES-256-GCM sealing failed".into()))?;

        let mut bytes = Vec::with_capacity(NONCE_LEN + in_out.len());
        bytes.extend_from_slice(&nonce);
        bytes.extend_from_slice(&in_out);

        debug!(blob_len = bytes.len(), "encryption complete");
        Ok(EncryptedBlob { bytes, nonce })
    }

    /// Split the nonce from `blob`, authenticate, and decrypt.
    ///
    /// Any tag mismatch is an [`IntegrityError`]; no plaintext is returned
    /// unless the whole blob authenticates.
    #[instrument(skip_all, fields(blob_len = blob.len()))]
    pub fn decrypt(&self, blob: &[u8]) -> Result<Vec<u8>> {
        if blob.len() < MIN_BLOB_LEN {
            warn!("blob shorter than nonce plus tag");
            return Err(IntegrityError::TruncatedBlob {
                evidence_id: None,
                blob_len: blob.len(),
            }
            .into());
        }

        let (nonce_bytes, sealed) = blob.split_at(NONCE_LEN);
        let nonce = Nonce::try_assume_unique_for_key(nonce_bytes)
            .map_err(|_| CustodiaError::Crypto("nonce has wrong length".into()))?;

        let mut in_out = sealed.to_vec();
        let plaintext_len = match self.key.open_in_place(nonce, Aad::empty(), &mut in_out) {
            Ok(plaintext) => plaintext.len(),
            Err(_) => {
                warn!("authentication tag mismatch");
                return Err(IntegrityError::AuthenticationFailed {
                    evidence_id: None,
                    blob_len: blob.len(),
                }
                .into());
            }
        };
        in_out.truncate(plaintext_len);

        debug!(plaintext_len, "decryption complete");
        Ok(in_out)
    }
}

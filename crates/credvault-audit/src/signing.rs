// SPDX-FileCopyrightText: 2026 Credvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HMAC-SHA256 signatures over audit records.

use credvault_core::CredvaultError;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

use crate::event::AuditEvent;

type HmacSha256 = Hmac<Sha256>;

/// Shortest accepted signing key, in bytes.
pub const MIN_SIGNING_KEY_BYTES: usize = 16;

/// Signs and verifies audit records with a keyed MAC.
///
/// Holds a keyed MAC prototype; each signature works on a clone of it.
#[derive(Clone)]
pub struct EventSigner {
    mac: HmacSha256,
}

impl std::fmt::Debug for EventSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSigner")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

impl EventSigner {
    /// Build a signer. There is no fallback key: an empty or short key is a
    /// configuration error.
    pub fn new(key: &SecretString) -> Result<Self, CredvaultError> {
        let bytes = key.expose_secret().as_bytes();
        if bytes.is_empty() {
            return Err(CredvaultError::Config(
                "audit signing key is required (set AUDIT_SIGNING_KEY)".to_string(),
            ));
        }
        if bytes.len() < MIN_SIGNING_KEY_BYTES {
            return Err(CredvaultError::Config(format!(
                "audit signing key must be at least {MIN_SIGNING_KEY_BYTES} bytes"
            )));
        }
        let mac = HmacSha256::new_from_slice(bytes)
            .map_err(|e| CredvaultError::Config(format!("invalid audit signing key: {e}")))?;
        Ok(Self { mac })
    }

    /// Lowercase hex HMAC of the event's canonical string.
    pub fn sign(&self, event: &AuditEvent) -> String {
        let mut mac = self.mac.clone();
        mac.update(event.canonical_string().as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Constant-time check of the stored signature.
    pub fn verify(&self, event: &AuditEvent) -> bool {
        let Ok(expected) = hex::decode(&event.signature) else {
            return false;
        };
        let mut mac = self.mac.clone();
        mac.update(event.canonical_string().as_bytes());
        mac.verify_slice(&expected).is_ok()
    }
}

// SPDX-FileCopyrightText: 2026 Credvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The persisted credential record and its integrity hash.

use chrono::{DateTime, SecondsFormat, Utc};
use credvault_core::{CredvaultError, Environment};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Name under which the API key is exposed to consumers.
pub const RESEND_API_KEY: &str = "RESEND_API_KEY";

/// Render a timestamp the way it is stored and hashed: RFC 3339, UTC,
/// millisecond precision.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Lowercase hex SHA-256 over the concatenated fields, no separator.
pub fn compute_integrity_hash(
    api_key: &str,
    environment: Environment,
    rotation_schedule: &str,
    last_rotated: &DateTime<Utc>,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(api_key.as_bytes());
    hasher.update(environment.to_string().as_bytes());
    hasher.update(rotation_schedule.as_bytes());
    hasher.update(format_timestamp(last_rotated).as_bytes());
    hex::encode(hasher.finalize())
}

/// A credential set supplied for storage; the hash is computed on store.
pub struct NewCredentials {
    pub api_key: SecretString,
    pub environment: Environment,
    pub rotation_schedule: String,
    pub last_rotated: DateTime<Utc>,
}

impl std::fmt::Debug for NewCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewCredentials")
            .field("api_key", &"[REDACTED]")
            .field("environment", &self.environment)
            .field("rotation_schedule", &self.rotation_schedule)
            .field("last_rotated", &self.last_rotated)
            .finish()
    }
}

/// The decrypted on-disk payload.
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRecord {
    pub api_key: String,
    #[zeroize(skip)]
    pub environment: Environment,
    pub rotation_schedule: String,
    #[zeroize(skip)]
    #[serde(with = "millis_rfc3339")]
    pub last_rotated: DateTime<Utc>,
    pub integrity_hash: String,
}

impl std::fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("api_key", &"[REDACTED]")
            .field("environment", &self.environment)
            .field("rotation_schedule", &self.rotation_schedule)
            .field("last_rotated", &self.last_rotated)
            .field("integrity_hash", &self.integrity_hash)
            .finish()
    }
}

impl CredentialRecord {
    /// Build the record to persist, stamping its integrity hash.
    pub fn seal(new: &NewCredentials) -> Self {
        let api_key = new.api_key.expose_secret().to_string();
        let integrity_hash = compute_integrity_hash(
            &api_key,
            new.environment,
            &new.rotation_schedule,
            &new.last_rotated,
        );
        Self {
            api_key,
            environment: new.environment,
            rotation_schedule: new.rotation_schedule.clone(),
            last_rotated: new.last_rotated,
            integrity_hash,
        }
    }

    pub fn expected_hash(&self) -> String {
        compute_integrity_hash(
            &self.api_key,
            self.environment,
            &self.rotation_schedule,
            &self.last_rotated,
        )
    }

    /// Recompute the hash and compare it with the stored one.
    pub fn verify_integrity(&self) -> Result<(), CredvaultError> {
        if self.expected_hash() != self.integrity_hash {
            return Err(CredvaultError::Integrity(
                "credential integrity hash mismatch; stored record was modified".to_string(),
            ));
        }
        Ok(())
    }

    /// The externally consumed key set.
    pub fn project(&self) -> LoadedCredentials {
        LoadedCredentials {
            resend_api_key: SecretString::from(self.api_key.clone()),
        }
    }
}

/// Decrypted credentials handed to callers.
pub struct LoadedCredentials {
    resend_api_key: SecretString,
}

impl LoadedCredentials {
    pub fn resend_api_key(&self) -> &SecretString {
        &self.resend_api_key
    }

    /// Look a credential up by its exported name.
    pub fn get(&self, name: &str) -> Option<&SecretString> {
        (name == RESEND_API_KEY).then_some(&self.resend_api_key)
    }

    /// Exported names, in a stable order.
    pub fn keys(&self) -> &'static [&'static str] {
        &[RESEND_API_KEY]
    }
}

impl std::fmt::Debug for LoadedCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedCredentials")
            .field(RESEND_API_KEY, &"[REDACTED]")
            .finish()
    }
}

mod millis_rfc3339 {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_timestamp(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_credentials() -> NewCredentials {
        NewCredentials {
            api_key: SecretString::from("re_Live_Key_0123456789".to_string()),
            environment: Environment::Production,
            rotation_schedule: "monthly".to_string(),
            last_rotated: "2026-01-15T08:30:00.250Z".parse().unwrap(),
        }
    }

    #[test]
    fn hash_covers_all_fields_without_separator() {
        let expected = {
            let mut h = Sha256::new();
            h.update(b"re_Live_Key_0123456789productionmonthly2026-01-15T08:30:00.250Z");
            hex::encode(h.finalize())
        };
        let record = CredentialRecord::seal(&new_credentials());
        assert_eq!(record.integrity_hash, expected);
        assert!(record.verify_integrity().is_ok());
    }

    #[test]
    fn any_field_change_breaks_integrity() {
        let sealed = CredentialRecord::seal(&new_credentials());

        let mut r = sealed.clone();
        r.api_key.push('x');
        assert!(r.verify_integrity().is_err());

        let mut r = sealed.clone();
        r.environment = Environment::Staging;
        assert!(r.verify_integrity().is_err());

        let mut r = sealed.clone();
        r.rotation_schedule = "weekly".to_string();
        assert!(r.verify_integrity().is_err());

        let mut r = sealed.clone();
        r.last_rotated += chrono::Duration::milliseconds(1);
        assert!(r.verify_integrity().is_err());
    }

    #[test]
    fn wire_format_is_camel_case_with_millis() {
        let record = CredentialRecord::seal(&new_credentials());
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["apiKey"], "re_Live_Key_0123456789");
        assert_eq!(json["environment"], "production");
        assert_eq!(json["rotationSchedule"], "monthly");
        assert_eq!(json["lastRotated"], "2026-01-15T08:30:00.250Z");
        assert_eq!(json["integrityHash"], record.integrity_hash.as_str());

        let back: CredentialRecord = serde_json::from_value(json).unwrap();
        assert!(back.verify_integrity().is_ok());
    }

    #[test]
    fn debug_output_never_shows_the_key() {
        let record = CredentialRecord::seal(&new_credentials());
        assert!(!format!("{record:?}").contains("re_Live"));
        assert!(!format!("{:?}", record.project()).contains("re_Live"));
        assert!(!format!("{:?}", new_credentials()).contains("re_Live"));
    }

    #[test]
    fn projection_exposes_resend_key() {
        let loaded = CredentialRecord::seal(&new_credentials()).project();
        assert_eq!(
            loaded.get(RESEND_API_KEY).unwrap().expose_secret(),
            "re_Live_Key_0123456789"
        );
        assert!(loaded.get("OTHER").is_none());
        assert_eq!(loaded.keys(), &[RESEND_API_KEY]);
    }
}

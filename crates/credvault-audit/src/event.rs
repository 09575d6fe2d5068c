// SPDX-FileCopyrightText: 2026 Credvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The audit record written to the log, one JSON object per line.

use chrono::{DateTime, SecondsFormat, Utc};
use credvault_core::Severity;
use serde::{Deserialize, Serialize};

/// Action tags recorded by the vault and the convenience wrappers.
pub mod actions {
    pub const ENCRYPT_CREDENTIAL: &str = "ENCRYPT_CREDENTIAL";
    pub const DECRYPT_CREDENTIAL: &str = "DECRYPT_CREDENTIAL";
    pub const LOAD_CREDENTIALS: &str = "LOAD_CREDENTIALS";
    pub const STORE_CREDENTIALS: &str = "STORE_CREDENTIALS";
    pub const ROTATE_CREDENTIAL: &str = "ROTATE_CREDENTIAL";
    pub const CREDENTIAL_ERROR: &str = "CREDENTIAL_ERROR";
    pub const ACCESS_CREDENTIALS: &str = "ACCESS_CREDENTIALS";
    pub const STORE_CREDENTIAL: &str = "STORE_CREDENTIAL";
    pub const TEST_CREDENTIAL_ENCRYPTION: &str = "TEST_CREDENTIAL_ENCRYPTION";

    /// Prefix shared by every `SECURITY_<SEVERITY>` action.
    pub const SECURITY_PREFIX: &str = "SECURITY_";
}

/// Build the `SECURITY_<SEVERITY>` action tag.
pub fn security_action(severity: Severity) -> String {
    format!("{}{severity}", actions::SECURITY_PREFIX)
}

/// Parse the severity out of a `SECURITY_<SEVERITY>` action tag.
pub fn security_severity(action: &str) -> Option<Severity> {
    action
        .strip_prefix(actions::SECURITY_PREFIX)
        .and_then(|s| s.parse().ok())
}

/// Optional caller context attached to security events.
///
/// Not covered by the record signature.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geolocation: Option<String>,
}

/// One audit log record.
///
/// `verified` is never persisted; it is filled in when the record is read
/// back and its signature recomputed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub key_id: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub request_id: String,
    pub pid: u32,
    pub environment: String,
    #[serde(default)]
    pub signature: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_context: Option<SecurityContext>,
}

impl AuditEvent {
    /// The byte string covered by the HMAC signature.
    ///
    /// Fields are joined with `\n`, which sanitized fields can never contain,
    /// so values cannot be shifted across field boundaries.
    pub fn canonical_string(&self) -> String {
        [
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true).as_str(),
            &self.action,
            &self.key_id,
            if self.success { "true" } else { "false" },
            self.error.as_deref().unwrap_or(""),
            &self.request_id,
            &self.pid.to_string(),
            &self.environment,
        ]
        .join("\n")
    }

    pub fn is_security_event(&self) -> bool {
        self.action.starts_with(actions::SECURITY_PREFIX)
    }

    pub fn is_verified(&self) -> bool {
        self.verified == Some(true)
    }
}

// SPDX-FileCopyrightText: 2026 Credvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for credvault.
//!
//! Callers see a small, stable set of kinds. Anything that crosses a trust
//! boundary (subprocess stderr, file content) is sanitized before it is put
//! into a variant's message.

use thiserror::Error;

/// The primary error type used by the vault, the audit trail, and the CLI.
#[derive(Debug, Error)]
pub enum CredvaultError {
    /// Configuration errors (missing key id, missing signing key, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Input rejected before any I/O or subprocess spawn.
    #[error("validation error: {0}")]
    Validation(String),

    /// The OpenPGP utility could not be spawned or exited non-zero.
    #[error("process error: {message}")]
    Process {
        message: String,
        /// Captured (sanitized, truncated) stderr of the child process.
        stderr: String,
    },

    /// A stored integrity hash did not match the recomputed one.
    #[error("integrity error: {0}")]
    Integrity(String),

    /// Missing or unreadable file, permission failure.
    #[error("io error while {context}: {source}")]
    Io {
        context: String,
        source: std::io::Error,
    },

    /// An audit record's signature failed verification.
    #[error("signature error: {0}")]
    Signature(String),

    /// A payload could not be serialized or parsed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A subprocess exceeded the configured deadline.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Audit side-channel failure. Reported to the fallback sink, never
    /// returned from a primary credential operation.
    #[error("audit error: {0}")]
    Audit(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Discriminant of [`CredvaultError`] without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Config,
    Validation,
    Process,
    Integrity,
    Io,
    Signature,
    Serialization,
    Timeout,
    Audit,
    Internal,
}

impl CredvaultError {
    /// Wrap an I/O error with a short description of what was being done.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Config,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Process { .. } => ErrorKind::Process,
            Self::Integrity(_) => ErrorKind::Integrity,
            Self::Io { .. } => ErrorKind::Io,
            Self::Signature(_) => ErrorKind::Signature,
            Self::Serialization(_) => ErrorKind::Serialization,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Audit(_) => ErrorKind::Audit,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<serde_json::Error> for CredvaultError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

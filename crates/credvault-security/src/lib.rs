// SPDX-FileCopyrightText: 2026 Credvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Input validation and text sanitization for credvault.
//!
//! Validation is the only defense between caller-supplied identifiers and the
//! argument vector of the OpenPGP subprocess, so it runs synchronously and
//! before any I/O. Sanitization makes arbitrary text (subprocess stderr,
//! caller error strings) safe to embed in a single JSON log line.

pub mod sanitize;
pub mod validate;

pub use sanitize::{redact, sanitize_log_text, truncate_chars, MAX_LOG_TEXT_CHARS};
pub use validate::{
    validate_api_key, validate_credential_path, validate_key_id, validate_rotation_schedule,
};

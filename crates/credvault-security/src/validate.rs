// SPDX-FileCopyrightText: 2026 Credvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Synchronous validators for identifiers, paths, and API keys.

use credvault_core::CredvaultError;

const KEY_ID_MIN_LEN: usize = 8;
const KEY_ID_MAX_LEN: usize = 40;

const PATH_MAX_LEN: usize = 500;

const API_KEY_MIN_LEN: usize = 10;
const API_KEY_MAX_LEN: usize = 200;

/// All-lowercase alphabetic keys shorter than this look like placeholders.
const WEAK_LOWERCASE_LEN: usize = 16;

const ROTATION_SCHEDULE_MAX_LEN: usize = 64;

/// Absolute prefixes a credential file may never live under (compared
/// case-insensitively, with `\` normalized to `/`).
const FORBIDDEN_PATH_PREFIXES: &[&str] = &[
    "/etc/",
    "/var/",
    "/usr/",
    "/root/",
    "/home/",
    "/bin/",
    "/sbin/",
    "/boot/",
    "/proc/",
    "/sys/",
    "/dev/",
    "c:/windows/",
    "c:/program files",
    "c:/programdata/",
];

/// Fragments that identify Windows system directories anywhere in a path.
const FORBIDDEN_PATH_FRAGMENTS: &[&str] = &["windows/system32", "windows/syswow64"];

/// Characters with meaning to a POSIX shell or cmd.exe.
const SHELL_METACHARACTERS: &[char] = &[
    ';', '$', '|', '`', '&', '<', '>', '(', ')', '{', '}', '[', ']', '\'', '"', '!', '*', '?',
    '\n', '\r', '\0',
];

/// Validate an OpenPGP key identifier.
///
/// Accepts 8 to 40 characters from `[A-Za-z0-9_]`. Everything else is
/// rejected, which keeps the value inert when it is passed as a
/// `--recipient` argument.
pub fn validate_key_id(key_id: &str) -> Result<(), CredvaultError> {
    let len = key_id.chars().count();
    if !(KEY_ID_MIN_LEN..=KEY_ID_MAX_LEN).contains(&len) {
        return Err(CredvaultError::Validation(format!(
            "Invalid GPG key ID format: length must be {KEY_ID_MIN_LEN}-{KEY_ID_MAX_LEN} characters"
        )));
    }
    if !key_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(CredvaultError::Validation(
            "Invalid GPG key ID format: only letters, digits and '_' are allowed".to_string(),
        ));
    }
    Ok(())
}

/// Validate the location of the encrypted credential file.
pub fn validate_credential_path(path: &str) -> Result<(), CredvaultError> {
    if path.trim().is_empty() {
        return Err(CredvaultError::Validation(
            "Invalid credential path: must not be empty".to_string(),
        ));
    }
    if path.chars().count() > PATH_MAX_LEN {
        return Err(CredvaultError::Validation(format!(
            "Invalid credential path: longer than {PATH_MAX_LEN} characters"
        )));
    }
    if path.contains("..") {
        return Err(CredvaultError::Validation(
            "Invalid credential path: parent directory traversal is not allowed".to_string(),
        ));
    }
    if let Some(c) = path.chars().find(|c| SHELL_METACHARACTERS.contains(c)) {
        return Err(CredvaultError::Validation(format!(
            "Invalid credential path: shell metacharacter {c:?} is not allowed"
        )));
    }

    let normalized = path.replace('\\', "/").to_ascii_lowercase();
    if FORBIDDEN_PATH_PREFIXES
        .iter()
        .any(|prefix| normalized.starts_with(prefix))
        || FORBIDDEN_PATH_FRAGMENTS
            .iter()
            .any(|fragment| normalized.contains(fragment))
    {
        return Err(CredvaultError::Validation(
            "Invalid credential path: system directories are not allowed".to_string(),
        ));
    }
    Ok(())
}

/// Validate an API key before it is stored.
///
/// Rejects empty, short, long, and non-`[A-Za-z0-9_-]` values, plus values
/// that look like test data: anything mentioning "password" or "secret", and
/// short all-lowercase words.
pub fn validate_api_key(api_key: &str) -> Result<(), CredvaultError> {
    if api_key.is_empty() {
        return Err(CredvaultError::Validation(
            "Invalid API key format: API key is required".to_string(),
        ));
    }
    let len = api_key.chars().count();
    if len < API_KEY_MIN_LEN {
        return Err(CredvaultError::Validation(format!(
            "Invalid API key format: too short (minimum {API_KEY_MIN_LEN} characters)"
        )));
    }
    if len > API_KEY_MAX_LEN {
        return Err(CredvaultError::Validation(format!(
            "Invalid API key format: too long (maximum {API_KEY_MAX_LEN} characters)"
        )));
    }
    if !api_key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(CredvaultError::Validation(
            "Invalid API key format: Invalid characters (allowed: letters, digits, '_' and '-')"
                .to_string(),
        ));
    }

    let lowered = api_key.to_ascii_lowercase();
    let looks_like_placeholder = lowered.contains("password") || lowered.contains("secret");
    let short_lowercase_word =
        len < WEAK_LOWERCASE_LEN && api_key.chars().all(|c| c.is_ascii_lowercase());
    if looks_like_placeholder || short_lowercase_word {
        return Err(CredvaultError::Validation(
            "Invalid API key format: value looks like weak or test data".to_string(),
        ));
    }
    Ok(())
}

/// Validate a rotation schedule label such as `monthly` or `every-90-days`.
pub fn validate_rotation_schedule(schedule: &str) -> Result<(), CredvaultError> {
    let trimmed = schedule.trim();
    if trimmed.is_empty() {
        return Err(CredvaultError::Validation(
            "Invalid rotation schedule: must not be empty".to_string(),
        ));
    }
    if trimmed.chars().count() > ROTATION_SCHEDULE_MAX_LEN {
        return Err(CredvaultError::Validation(format!(
            "Invalid rotation schedule: longer than {ROTATION_SCHEDULE_MAX_LEN} characters"
        )));
    }
    if trimmed.chars().any(|c| c.is_control()) {
        return Err(CredvaultError::Validation(
            "Invalid rotation schedule: control characters are not allowed".to_string(),
        ));
    }
    Ok(())
}

// SPDX-FileCopyrightText: 2026 Credvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! API key acquisition via `CREDVAULT_API_KEY` or a TTY prompt.

use credvault_core::CredvaultError;
use secrecy::SecretString;

/// Environment variable consulted before prompting.
pub const API_KEY_ENV_VAR: &str = "CREDVAULT_API_KEY";

/// Read the API key to store.
///
/// The environment variable wins so the command can run under systemd or in
/// CI. Otherwise an interactive prompt reads it without echo.
pub fn read_api_key() -> Result<SecretString, CredvaultError> {
    if let Ok(key) = std::env::var(API_KEY_ENV_VAR) {
        if !key.is_empty() {
            return Ok(SecretString::from(key));
        }
    }

    if std::io::IsTerminal::is_terminal(&std::io::stdin()) {
        eprint!("API key: ");
        let key = rpassword::read_password()
            .map_err(|e| CredvaultError::io("reading API key from terminal", e))?;
        if key.is_empty() {
            return Err(CredvaultError::Validation(
                "Invalid API key format: API key is required".to_string(),
            ));
        }
        return Ok(SecretString::from(key));
    }

    Err(CredvaultError::Config(format!(
        "no API key provided; set {API_KEY_ENV_VAR} or run interactively"
    )))
}

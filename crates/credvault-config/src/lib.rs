// SPDX-FileCopyrightText: 2026 Credvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for credvault.
//!
//! TOML files in the XDG hierarchy are merged over compiled defaults, then
//! `CREDVAULT_*` variables, then the legacy deployment variables
//! (`GPG_KEY_ID`, `CREDENTIAL_PATH`, `AUDIT_LOG_DIR`, `AUDIT_SIGNING_KEY`,
//! `NODE_ENV`). Unknown keys are rejected and rendered as miette diagnostics
//! with typo suggestions.
//!
//! # Usage
//!
//! ```no_run
//! use credvault_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("audit log: {}", config.audit.log_path().display());
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

pub use diagnostic::{render_errors, ConfigError};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::{AuditConfig, CredvaultConfig, LoggingConfig, VaultConfig};

/// Load configuration from the XDG hierarchy and validate it.
///
/// Returns either a valid `CredvaultConfig` or every diagnostic found.
pub fn load_and_validate() -> Result<CredvaultConfig, Vec<ConfigError>> {
    match loader::load_config() {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => {
            let toml_sources = collect_toml_sources();
            Err(diagnostic::figment_to_config_errors(err, &toml_sources))
        }
    }
}

/// Load configuration from a TOML string and validate it.
pub fn load_and_validate_str(toml_content: &str) -> Result<CredvaultConfig, Vec<ConfigError>> {
    match loader::load_config_from_str(toml_content) {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => {
            let sources = vec![("<inline>".to_string(), toml_content.to_string())];
            Err(diagnostic::figment_to_config_errors(err, &sources))
        }
    }
}

/// Collect TOML source file contents for error span resolution.
fn collect_toml_sources() -> Vec<(String, String)> {
    loader::config_file_candidates()
        .into_iter()
        .filter_map(|path| {
            std::fs::read_to_string(&path)
                .ok()
                .map(|content| (path.display().to_string(), content))
        })
        .collect()
}

// SPDX-FileCopyrightText: 2026 Credvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./credvault.toml` > `~/.config/credvault/credvault.toml`
//! > `/etc/credvault/credvault.toml`, then `CREDVAULT_` variables, then the
//! legacy deployment variables.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::CredvaultConfig;

/// Legacy variable names and the config keys they populate.
const LEGACY_ENV_KEYS: &[(&str, &str)] = &[
    ("GPG_KEY_ID", "vault.key_id"),
    ("CREDENTIAL_PATH", "vault.credential_path"),
    ("AUDIT_LOG_DIR", "audit.log_dir"),
    ("AUDIT_SIGNING_KEY", "audit.signing_key"),
    ("NODE_ENV", "audit.environment"),
];

/// Config files consulted, lowest precedence first.
pub fn config_file_candidates() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("/etc/credvault/credvault.toml")];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("credvault/credvault.toml"));
    }
    paths.push(PathBuf::from("credvault.toml"));
    paths
}

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/credvault/credvault.toml`
/// 3. `~/.config/credvault/credvault.toml`
/// 4. `./credvault.toml`
/// 5. `CREDVAULT_*` environment variables
/// 6. Legacy variables (`GPG_KEY_ID`, `CREDENTIAL_PATH`, ...)
pub fn load_config() -> Result<CredvaultConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no files, no environment).
pub fn load_config_from_str(toml_content: &str) -> Result<CredvaultConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CredvaultConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<CredvaultConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CredvaultConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .merge(legacy_env_provider())
        .extract()
}

/// Build the Figment used for config loading before extraction.
pub fn build_figment() -> Figment {
    let figment = config_file_candidates()
        .into_iter()
        .fold(
            Figment::new().merge(Serialized::defaults(CredvaultConfig::default())),
            |figment, path| figment.merge(Toml::file(path)),
        );
    figment.merge(env_provider()).merge(legacy_env_provider())
}

/// `CREDVAULT_<SECTION>_<KEY>` → `<section>.<key>`.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `CREDVAULT_AUDIT_MAX_LOG_BYTES` must become
/// `audit.max_log_bytes`, not `audit.max.log.bytes`.
fn env_provider() -> Env {
    Env::prefixed("CREDVAULT_").map(|key| {
        // Variable names arrive in their original (upper) case.
        let key_str = key.as_str().to_ascii_lowercase();
        let mapped = ["vault_", "audit_", "logging_"]
            .iter()
            .find_map(|section| {
                key_str.strip_prefix(section).map(|rest| {
                    format!("{}.{rest}", section.trim_end_matches('_'))
                })
            })
            .unwrap_or(key_str);
        mapped.into()
    })
}

fn legacy_env_provider() -> Env {
    let names: Vec<&str> = LEGACY_ENV_KEYS.iter().map(|(name, _)| *name).collect();
    Env::raw().only(&names).map(|key| {
        LEGACY_ENV_KEYS
            .iter()
            .find(|(name, _)| key.as_str().eq_ignore_ascii_case(name))
            .map(|(_, target)| (*target).into())
            .unwrap_or_else(|| key.as_str().to_string().into())
    })
}

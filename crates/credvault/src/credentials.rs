// SPDX-FileCopyrightText: 2026 Credvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `credvault store` and `credvault load`.

use chrono::Utc;
use credvault_audit::generate_request_id;
use credvault_core::{CredvaultError, Environment};
use credvault_vault::{mask_secret, CredentialVault, LoadOptions, LoadedCredentials, NewCredentials};
use secrecy::{ExposeSecret, SecretString};
use tracing::info;

/// Seal, encrypt, and write a new API key.
pub async fn run_store(
    vault: &CredentialVault,
    api_key: SecretString,
    environment: Environment,
    rotation_schedule: String,
) -> Result<(), CredvaultError> {
    let request_id = generate_request_id();
    let new = NewCredentials {
        api_key,
        environment,
        rotation_schedule,
        last_rotated: Utc::now(),
    };

    if let Err(e) = vault.store_credentials(new).await {
        vault
            .audit()
            .log_credential_error(&e.to_string(), &request_id)
            .await;
        return Err(e);
    }

    vault
        .audit()
        .log_credential_store(&request_id, &environment.to_string())
        .await;
    info!(%request_id, %environment, "credentials stored");
    println!(
        "Stored credentials for {environment} in {}",
        vault.credential_path().display()
    );
    Ok(())
}

/// Decrypt the credential file and print masked previews.
pub async fn run_load(vault: &CredentialVault, no_cache: bool) -> Result<(), CredvaultError> {
    let request_id = generate_request_id();
    let options = if no_cache {
        LoadOptions::no_cache()
    } else {
        LoadOptions::default()
    };

    let loaded = match vault.load_credentials(options).await {
        Ok(loaded) => loaded,
        Err(e) => {
            vault
                .audit()
                .log_credential_error(&e.to_string(), &request_id)
                .await;
            return Err(e);
        }
    };

    vault
        .audit()
        .log_credential_access(&request_id, loaded.keys())
        .await;
    for line in masked_lines(&loaded) {
        println!("{line}");
    }
    Ok(())
}

fn masked_lines(loaded: &LoadedCredentials) -> Vec<String> {
    loaded
        .keys()
        .iter()
        .filter_map(|name| {
            loaded
                .get(name)
                .map(|value| format!("{name} = {}", mask_secret(value.expose_secret())))
        })
        .collect()
}

// SPDX-FileCopyrightText: 2026 Credvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `credvault check` command implementation.
//!
//! Probes the keyring, the credential file, an encrypt/decrypt round trip,
//! and the audit log signatures, then prints one line per check.

use std::io::IsTerminal;
use std::time::{Duration, Instant};

use credvault_audit::generate_request_id;
use credvault_vault::CredentialVault;

/// Status of a single check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

/// Result of a single check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: &'static str,
    pub status: CheckStatus,
    pub message: String,
    pub duration: Duration,
}

/// Run every check and print the report. Returns `false` if any check failed.
pub async fn run_check(vault: &CredentialVault, plain: bool) -> bool {
    let use_color = !plain && std::io::stdout().is_terminal();
    let results = collect_checks(vault).await;

    println!();
    println!("  credvault check");
    println!("  {}", "-".repeat(50));
    for result in &results {
        println!("{}", render_line(result, use_color));
    }
    println!();
    println!("  {}", summary(&results));
    println!();

    results.iter().all(|r| r.status != CheckStatus::Fail)
}

pub async fn collect_checks(vault: &CredentialVault) -> Vec<CheckResult> {
    vec![
        check_key(vault).await,
        check_credential_file(vault).await,
        check_round_trip(vault).await,
        check_audit_log(vault).await,
    ]
}

async fn check_key(vault: &CredentialVault) -> CheckResult {
    let start = Instant::now();
    let (status, message) = if vault.validate_gpg_key().await {
        (CheckStatus::Pass, format!("{} present in keyring", vault.key_id()))
    } else {
        (CheckStatus::Fail, format!("{} not found in keyring", vault.key_id()))
    };
    CheckResult {
        name: "GPG key",
        status,
        message,
        duration: start.elapsed(),
    }
}

async fn check_credential_file(vault: &CredentialVault) -> CheckResult {
    let start = Instant::now();
    let path = vault.credential_path();
    let (status, message) = match tokio::fs::try_exists(path).await {
        Ok(true) => (CheckStatus::Pass, path.display().to_string()),
        Ok(false) => (
            CheckStatus::Warn,
            format!("{} not found; run `credvault store`", path.display()),
        ),
        Err(e) => (CheckStatus::Fail, format!("cannot access {}: {e}", path.display())),
    };
    CheckResult {
        name: "Credential file",
        status,
        message,
        duration: start.elapsed(),
    }
}

async fn check_round_trip(vault: &CredentialVault) -> CheckResult {
    let start = Instant::now();
    let passed = vault.test_encryption_decryption().await;
    vault
        .audit()
        .log_credential_test(&generate_request_id(), passed)
        .await;
    let (status, message) = if passed {
        (CheckStatus::Pass, "encrypt/decrypt ok".to_string())
    } else {
        (CheckStatus::Fail, "encrypt/decrypt failed".to_string())
    };
    CheckResult {
        name: "Round trip",
        status,
        message,
        duration: start.elapsed(),
    }
}

async fn check_audit_log(vault: &CredentialVault) -> CheckResult {
    let start = Instant::now();
    let (status, message) = match vault.audit().verify_log().await {
        Ok(report) if !report.tampered_lines.is_empty() => (
            CheckStatus::Fail,
            format!(
                "{} tampered record(s) at lines {:?}",
                report.tampered_lines.len(),
                report.tampered_lines
            ),
        ),
        Ok(report) if !report.malformed_lines.is_empty() => (
            CheckStatus::Warn,
            format!(
                "{} verified, {} malformed line(s)",
                report.verified,
                report.malformed_lines.len()
            ),
        ),
        Ok(report) => (CheckStatus::Pass, format!("{} records verified", report.verified)),
        Err(e) => (CheckStatus::Fail, e.to_string()),
    };
    CheckResult {
        name: "Audit log",
        status,
        message,
        duration: start.elapsed(),
    }
}

fn render_line(result: &CheckResult, use_color: bool) -> String {
    let duration_ms = result.duration.as_millis();
    if use_color {
        use colored::Colorize;
        let (symbol, message) = match result.status {
            CheckStatus::Pass => ("✓".green().to_string(), result.message.normal().to_string()),
            CheckStatus::Warn => ("!".yellow().to_string(), result.message.yellow().to_string()),
            CheckStatus::Fail => ("✗".red().to_string(), result.message.red().to_string()),
        };
        format!("    {symbol} {:<16} {message} ({duration_ms}ms)", result.name)
    } else {
        let tag = match result.status {
            CheckStatus::Pass => "[OK]  ",
            CheckStatus::Warn => "[WARN]",
            CheckStatus::Fail => "[FAIL]",
        };
        format!(
            "    {tag} {:<16} {} ({duration_ms}ms)",
            result.name, result.message
        )
    }
}

fn summary(results: &[CheckResult]) -> String {
    let issues = results
        .iter()
        .filter(|r| r.status != CheckStatus::Pass)
        .count();
    match issues {
        0 => "All checks passed.".to_string(),
        1 => "1 issue found.".to_string(),
        n => format!("{n} issues found."),
    }
}

// SPDX-FileCopyrightText: 2026 Credvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `credvault audit ...` subcommands. Every query prints JSON on stdout.

use clap::Subcommand;
use credvault_audit::AuditTrail;
use credvault_core::CredvaultError;
use serde::Serialize;

#[derive(Subcommand, Debug)]
pub enum AuditCommand {
    /// Verified records from the last N hours, newest first.
    Recent {
        #[arg(long, default_value_t = 24)]
        hours: u64,
    },
    /// Security events, failures, and suspicious access records.
    Alerts,
    /// Aggregate security metrics for the last 24 hours.
    Metrics,
    /// Detected threat patterns.
    Threats,
    /// Recompute every signature in the active log.
    Verify,
    /// Rotate the active log if it has outgrown the size limit.
    Rotate,
    /// Apply the retention policy to the log and its backups.
    Prune,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RotateOutput {
    rotated_to: Option<String>,
}

/// Run a subcommand. Returns `false` when `verify` finds a damaged log.
pub async fn run_audit(audit: &AuditTrail, command: AuditCommand) -> Result<bool, CredvaultError> {
    let (json, ok) = render(audit, command).await?;
    println!("{json}");
    Ok(ok)
}

async fn render(audit: &AuditTrail, command: AuditCommand) -> Result<(String, bool), CredvaultError> {
    match command {
        AuditCommand::Recent { hours } => Ok((to_json(&audit.get_recent_events(hours).await?)?, true)),
        AuditCommand::Alerts => Ok((to_json(&audit.get_security_alerts().await?)?, true)),
        AuditCommand::Metrics => Ok((to_json(&audit.get_security_metrics().await?)?, true)),
        AuditCommand::Threats => Ok((to_json(&audit.analyze_threat_patterns().await?)?, true)),
        AuditCommand::Verify => {
            let report = audit.verify_log().await?;
            let intact = report.is_intact();
            Ok((to_json(&report)?, intact))
        }
        AuditCommand::Rotate => {
            let rotated = audit.rotate_logs().await?;
            let output = RotateOutput {
                rotated_to: rotated.map(|p| p.display().to_string()),
            };
            Ok((to_json(&output)?, true))
        }
        AuditCommand::Prune => Ok((to_json(&audit.apply_retention_policy().await?)?, true)),
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, CredvaultError> {
    serde_json::to_string_pretty(value).map_err(|e| CredvaultError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use credvault_core::Severity;
    use credvault_test_utils::TestHarness;

    #[tokio::test]
    async fn recent_lists_records_as_json() {
        let h = TestHarness::builder().build().unwrap();
        h.audit.log_encryption("ABCDEF0123456789").await;

        let (json, ok) = render(&h.audit, AuditCommand::Recent { hours: 1 })
            .await
            .unwrap();
        assert!(ok);
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.as_array().unwrap().len(), 1);
        assert_eq!(parsed[0]["action"], "ENCRYPT_CREDENTIAL");
        assert_eq!(parsed[0]["verified"], true);
    }

    #[tokio::test]
    async fn verify_reports_tampering_as_not_ok() {
        let h = TestHarness::builder().build().unwrap();
        h.audit.log_encryption("ABCDEF0123456789").await;
        let original = std::fs::read_to_string(&h.log_path).unwrap();
        std::fs::write(&h.log_path, original.replace("ABCDEF0123456789", "FFFFFF0123456789"))
            .unwrap();

        let (json, ok) = render(&h.audit, AuditCommand::Verify).await.unwrap();
        assert!(!ok);
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["tamperedLines"][0], 1);
    }

    #[tokio::test]
    async fn alerts_include_security_events() {
        let h = TestHarness::builder().build().unwrap();
        h.audit
            .log_security_event("PORT_SCAN", Severity::High, "probe from 10.0.0.1")
            .await;
        h.audit.log_encryption("ABCDEF0123456789").await;

        let (json, _) = render(&h.audit, AuditCommand::Alerts).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.as_array().unwrap().len(), 1);
        assert_eq!(parsed[0]["action"], "SECURITY_HIGH");
    }

    #[tokio::test]
    async fn rotate_with_empty_log_reports_nothing() {
        let h = TestHarness::builder().build().unwrap();
        let (json, ok) = render(&h.audit, AuditCommand::Rotate).await.unwrap();
        assert!(ok);
        assert!(json.contains("\"rotatedTo\": null"));
    }
}

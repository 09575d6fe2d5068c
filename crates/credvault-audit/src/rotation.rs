// SPDX-FileCopyrightText: 2026 Credvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Size-based rotation and age-based retention for the audit log.
//!
//! Backups live next to the active log as `<log_file>.<unix_millis>`.
//! Only names with an all-digit suffix are treated as backups, so the
//! temporary file used by the retention rewrite is never pruned by mistake.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use credvault_core::CredvaultError;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::event::AuditEvent;
use crate::writer::{restrict_permissions, LogWriter};

/// Rotation threshold and retention limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Active log size that triggers rotation.
    pub max_log_bytes: u64,
    /// Rotated backups kept, newest first.
    pub max_backups: usize,
    /// Records and backups older than this are pruned by
    /// [`AuditTrail::apply_retention_policy`](crate::AuditTrail::apply_retention_policy).
    pub max_age: Option<Duration>,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_log_bytes: 10 * 1024 * 1024,
            max_backups: 5,
            max_age: None,
        }
    }
}

impl RetentionPolicy {
    pub fn validate(&self) -> Result<(), CredvaultError> {
        if self.max_log_bytes == 0 {
            return Err(CredvaultError::Validation(
                "retention max_log_bytes must be greater than zero".to_string(),
            ));
        }
        if self.max_backups == 0 {
            return Err(CredvaultError::Validation(
                "retention max_backups must be greater than zero".to_string(),
            ));
        }
        if self.max_age.is_some_and(|age| age.is_zero()) {
            return Err(CredvaultError::Validation(
                "retention max_age must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Outcome of one retention pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetentionReport {
    pub removed_records: usize,
    pub retained_records: usize,
    pub deleted_backups: Vec<PathBuf>,
}

/// A rotated backup and the millisecond stamp parsed from its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Backup {
    pub stamp: i64,
    pub path: PathBuf,
}

/// Rotated backups of `log_path`, oldest first.
pub(crate) async fn list_backups(log_path: &Path) -> Result<Vec<Backup>, CredvaultError> {
    let (dir, file_name) = split_log_path(log_path)?;
    let prefix = format!("{file_name}.");

    let mut entries = match tokio::fs::read_dir(&dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(CredvaultError::io("listing audit log directory", e)),
    };

    let mut backups = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| CredvaultError::io("listing audit log directory", e))?
    {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        let Some(suffix) = name.strip_prefix(&prefix) else { continue };
        if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
            continue;
        }
        if let Ok(stamp) = suffix.parse::<i64>() {
            backups.push(Backup {
                stamp,
                path: entry.path(),
            });
        }
    }
    backups.sort_by_key(|b| b.stamp);
    Ok(backups)
}

/// Rename the active log to a timestamped backup when it exceeds the size
/// threshold, then prune old backups. Returns the backup path if a rotation
/// happened.
pub(crate) async fn rotate_if_needed(
    writer: &LogWriter,
    policy: &RetentionPolicy,
    now: DateTime<Utc>,
) -> Result<Option<PathBuf>, CredvaultError> {
    let _guard = writer.lock().await;

    let size = writer.size().await?;
    if size <= policy.max_log_bytes {
        return Ok(None);
    }

    let log_path = writer.path();
    let mut stamp = now.timestamp_millis();
    let backup = loop {
        let candidate = backup_path(log_path, stamp)?;
        if !path_exists(&candidate).await? {
            break candidate;
        }
        stamp += 1;
    };

    tokio::fs::rename(log_path, &backup)
        .await
        .map_err(|e| CredvaultError::io("rotating audit log", e))?;
    info!(backup = %backup.display(), size, "audit log rotated");

    prune_backups(log_path, policy.max_backups).await?;
    Ok(Some(backup))
}

/// Delete all but the newest `keep` backups.
pub(crate) async fn prune_backups(
    log_path: &Path,
    keep: usize,
) -> Result<Vec<PathBuf>, CredvaultError> {
    let backups = list_backups(log_path).await?;
    let excess = backups.len().saturating_sub(keep);
    let mut deleted = Vec::with_capacity(excess);
    for backup in backups.into_iter().take(excess) {
        remove_backup(&backup.path).await?;
        deleted.push(backup.path);
    }
    Ok(deleted)
}

/// Drop records older than the policy's maximum age from the active log and
/// delete backups rotated before the cutoff. Lines that do not parse are
/// kept as they are.
pub(crate) async fn apply_retention(
    writer: &LogWriter,
    policy: &RetentionPolicy,
    now: DateTime<Utc>,
) -> Result<RetentionReport, CredvaultError> {
    let _guard = writer.lock().await;
    let log_path = writer.path();
    let mut report = RetentionReport::default();

    let content = match tokio::fs::read_to_string(log_path).await {
        Ok(content) => Some(content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => return Err(CredvaultError::io("reading audit log", e)),
    };

    let cutoff = policy.max_age.and_then(|age| {
        chrono::Duration::from_std(age)
            .ok()
            .and_then(|age| now.checked_sub_signed(age))
    });

    if let (Some(content), Some(cutoff)) = (content, cutoff) {
        let mut kept = String::with_capacity(content.len());
        for line in content.lines().filter(|l| !l.trim().is_empty()) {
            let expired = serde_json::from_str::<AuditEvent>(line)
                .map(|event| event.timestamp < cutoff)
                .unwrap_or(false);
            if expired {
                report.removed_records += 1;
            } else {
                report.retained_records += 1;
                kept.push_str(line);
                kept.push('\n');
            }
        }

        if report.removed_records > 0 {
            let tmp = temp_path(log_path)?;
            tokio::fs::write(&tmp, kept.as_bytes())
                .await
                .map_err(|e| CredvaultError::io("writing retained audit log", e))?;
            restrict_permissions(&tmp).await?;
            tokio::fs::rename(&tmp, log_path)
                .await
                .map_err(|e| CredvaultError::io("replacing audit log", e))?;
            info!(
                removed = report.removed_records,
                retained = report.retained_records,
                "expired audit records pruned"
            );
        }
    }

    if let Some(cutoff) = cutoff {
        let cutoff_ms = cutoff.timestamp_millis();
        for backup in list_backups(log_path).await? {
            if backup.stamp < cutoff_ms {
                remove_backup(&backup.path).await?;
                report.deleted_backups.push(backup.path);
            }
        }
    }

    report
        .deleted_backups
        .extend(prune_backups(log_path, policy.max_backups).await?);
    Ok(report)
}

async fn remove_backup(path: &Path) -> Result<(), CredvaultError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            debug!(backup = %path.display(), "audit log backup deleted");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(backup = %path.display(), "audit log backup vanished before pruning");
            Ok(())
        }
        Err(e) => Err(CredvaultError::io("deleting audit log backup", e)),
    }
}

async fn path_exists(path: &Path) -> Result<bool, CredvaultError> {
    tokio::fs::try_exists(path)
        .await
        .map_err(|e| CredvaultError::io("checking audit log backup", e))
}

fn split_log_path(log_path: &Path) -> Result<(PathBuf, String), CredvaultError> {
    let file_name = log_path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            CredvaultError::Config(format!(
                "audit log path has no usable file name: {}",
                log_path.display()
            ))
        })?
        .to_string();
    let dir = match log_path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((dir, file_name))
}

fn backup_path(log_path: &Path, stamp: i64) -> Result<PathBuf, CredvaultError> {
    let (dir, file_name) = split_log_path(log_path)?;
    Ok(dir.join(format!("{file_name}.{stamp}")))
}

fn temp_path(log_path: &Path) -> Result<PathBuf, CredvaultError> {
    let (dir, file_name) = split_log_path(log_path)?;
    Ok(dir.join(format!("{file_name}.retain.tmp")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(ms: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(ms).unwrap()
    }

    async fn fill(writer: &LogWriter, bytes: usize) {
        writer.append(&"x".repeat(bytes)).await.unwrap();
    }

    #[tokio::test]
    async fn below_threshold_does_not_rotate() {
        let dir = tempfile::tempdir().unwrap();
        let writer = LogWriter::new(dir.path().join("audit.log"));
        fill(&writer, 10).await;

        let policy = RetentionPolicy {
            max_log_bytes: 100,
            ..RetentionPolicy::default()
        };
        let rotated = rotate_if_needed(&writer, &policy, at(1_700_000_000_000))
            .await
            .unwrap();
        assert!(rotated.is_none());
        assert!(list_backups(writer.path()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rotation_keeps_newest_backups_only() {
        let dir = tempfile::tempdir().unwrap();
        let writer = LogWriter::new(dir.path().join("audit.log"));
        let policy = RetentionPolicy {
            max_log_bytes: 16,
            max_backups: 2,
            max_age: None,
        };

        for i in 0..4 {
            fill(&writer, 32).await;
            let rotated = rotate_if_needed(&writer, &policy, at(1_700_000_000_000 + i))
                .await
                .unwrap();
            assert!(rotated.is_some());
        }

        let backups = list_backups(writer.path()).await.unwrap();
        let stamps: Vec<i64> = backups.iter().map(|b| b.stamp).collect();
        assert_eq!(stamps, vec![1_700_000_000_002, 1_700_000_000_003]);
        assert!(!writer.path().exists());
    }

    #[tokio::test]
    async fn colliding_stamps_are_bumped() {
        let dir = tempfile::tempdir().unwrap();
        let writer = LogWriter::new(dir.path().join("audit.log"));
        let policy = RetentionPolicy {
            max_log_bytes: 1,
            max_backups: 5,
            max_age: None,
        };

        for _ in 0..3 {
            fill(&writer, 8).await;
            rotate_if_needed(&writer, &policy, at(5_000)).await.unwrap();
        }
        let stamps: Vec<i64> = list_backups(writer.path())
            .await
            .unwrap()
            .iter()
            .map(|b| b.stamp)
            .collect();
        assert_eq!(stamps, vec![5_000, 5_001, 5_002]);
    }

    #[tokio::test]
    async fn non_numeric_siblings_are_not_backups() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("audit.log.retain.tmp"), "x").unwrap();
        std::fs::write(dir.path().join("audit.log.bak"), "x").unwrap();
        std::fs::write(dir.path().join("other.log.123"), "x").unwrap();
        std::fs::write(dir.path().join("audit.log.42"), "x").unwrap();

        let backups = list_backups(&dir.path().join("audit.log")).await.unwrap();
        assert_eq!(backups.len(), 1);
        assert_eq!(backups[0].stamp, 42);
    }

    #[test]
    fn zero_limits_are_rejected() {
        let policy = RetentionPolicy {
            max_log_bytes: 0,
            ..RetentionPolicy::default()
        };
        assert!(policy.validate().is_err());

        let policy = RetentionPolicy {
            max_backups: 0,
            ..RetentionPolicy::default()
        };
        assert!(policy.validate().is_err());

        let policy = RetentionPolicy {
            max_age: Some(Duration::ZERO),
            ..RetentionPolicy::default()
        };
        assert!(policy.validate().is_err());
        assert!(RetentionPolicy::default().validate().is_ok());
    }
}

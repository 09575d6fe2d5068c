// SPDX-FileCopyrightText: 2026 Credvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only JSONL file access.

use std::path::{Path, PathBuf};

use credvault_core::CredvaultError;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, MutexGuard};

/// Serializes every mutation of the active log.
///
/// Appends, rotation, and retention rewrites all take the same lock, so a
/// rename can never land between two halves of a record. Each record is a
/// single `write_all` on an `O_APPEND` handle.
#[derive(Debug)]
pub(crate) struct LogWriter {
    path: PathBuf,
    lock: Mutex<()>,
}

impl LogWriter {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) async fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().await
    }

    /// Append one record and return the file size afterwards.
    pub(crate) async fn append(&self, line: &str) -> Result<u64, CredvaultError> {
        let _guard = self.lock.lock().await;

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| CredvaultError::io("creating audit log directory", e))?;
        }

        let mut options = tokio::fs::OpenOptions::new();
        options.create(true).append(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options
            .open(&self.path)
            .await
            .map_err(|e| CredvaultError::io("opening audit log", e))?;

        let mut buf = Vec::with_capacity(line.len() + 1);
        buf.extend_from_slice(line.as_bytes());
        buf.push(b'\n');
        file.write_all(&buf)
            .await
            .map_err(|e| CredvaultError::io("appending to audit log", e))?;
        file.flush()
            .await
            .map_err(|e| CredvaultError::io("flushing audit log", e))?;

        restrict_permissions(&self.path).await?;

        let meta = file
            .metadata()
            .await
            .map_err(|e| CredvaultError::io("reading audit log metadata", e))?;
        Ok(meta.len())
    }

    /// Current size of the active log, zero if it does not exist yet.
    pub(crate) async fn size(&self) -> Result<u64, CredvaultError> {
        match tokio::fs::metadata(&self.path).await {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(CredvaultError::io("reading audit log metadata", e)),
        }
    }
}

/// Owner read/write only. Applied after every append, not just on create,
/// so a log whose mode was loosened out-of-band is tightened again.
pub(crate) async fn restrict_permissions(path: &Path) -> Result<(), CredvaultError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
            .await
            .map_err(|e| CredvaultError::io("restricting audit log permissions", e))?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

/// Read every line of a log file. A missing file reads as empty.
pub(crate) async fn read_lines(path: &Path) -> Result<Vec<String>, CredvaultError> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(str::to_string)
            .collect()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(CredvaultError::io("reading audit log", e)),
    }
}

// SPDX-FileCopyrightText: 2026 Credvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Production [`ProcessRunner`] for the `gpg` binary, and the fixed
//! argument vectors the vault sends to it.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use credvault_core::{CredvaultError, ProcessOutput, ProcessRunner};
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Arguments for armored encryption to `key_id`. Plaintext goes on stdin.
pub fn encrypt_args(key_id: &str) -> Vec<String> {
    [
        "--batch",
        "--encrypt",
        "--armor",
        "--trust-model",
        "always",
        "--recipient",
        key_id,
        "--output",
        "-",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Arguments for decryption. Ciphertext goes on stdin.
pub fn decrypt_args() -> Vec<String> {
    ["--decrypt", "--quiet", "--batch", "--no-tty"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Arguments for a keyring lookup; only the exit code matters.
pub fn list_keys_args(key_id: &str) -> Vec<String> {
    vec!["--batch".to_string(), "--list-keys".to_string(), key_id.to_string()]
}

/// Spawns the OpenPGP binary directly; arguments never pass through a
/// shell.
#[derive(Debug, Clone)]
pub struct GpgRunner {
    binary: String,
    timeout: Option<Duration>,
}

impl GpgRunner {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            timeout: None,
        }
    }

    /// Kill the child and fail with [`CredvaultError::Timeout`] if it runs
    /// longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    async fn spawn_and_wait(
        &self,
        args: &[String],
        stdin: Option<&[u8]>,
    ) -> Result<ProcessOutput, CredvaultError> {
        let mut child = tokio::process::Command::new(&self.binary)
            .args(args)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| CredvaultError::Process {
                message: format!("failed to spawn {}: {e}", self.binary),
                stderr: String::new(),
            })?;

        // Feed stdin while collecting output so a chatty child cannot fill
        // its stdout pipe and stall on our write.
        let pipe = child.stdin.take();
        let feed = async move {
            if let (Some(input), Some(mut pipe)) = (stdin, pipe) {
                pipe.write_all(input)
                    .await
                    .map_err(|e| CredvaultError::io("writing to gpg stdin", e))?;
                pipe.shutdown()
                    .await
                    .map_err(|e| CredvaultError::io("closing gpg stdin", e))?;
            }
            Ok::<(), CredvaultError>(())
        };

        let (fed, output) = tokio::join!(feed, child.wait_with_output());
        let output = output.map_err(|e| CredvaultError::io("waiting for gpg", e))?;
        if let Err(e) = fed {
            // A child that exits early closes its stdin; its exit status and
            // stderr say more than the broken pipe does.
            if output.status.success() {
                return Err(e);
            }
            debug!(error = %e, "gpg closed stdin before reading all input");
        }

        debug!(binary = %self.binary, status = ?output.status.code(), "gpg exited");
        Ok(ProcessOutput {
            status: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

impl Default for GpgRunner {
    fn default() -> Self {
        Self::new("gpg")
    }
}

#[async_trait]
impl ProcessRunner for GpgRunner {
    async fn run(
        &self,
        args: &[String],
        stdin: Option<&[u8]>,
    ) -> Result<ProcessOutput, CredvaultError> {
        match self.timeout {
            // Dropping the timed-out future drops the child, and
            // kill_on_drop reaps it.
            Some(duration) => tokio::time::timeout(duration, self.spawn_and_wait(args, stdin))
                .await
                .map_err(|_| CredvaultError::Timeout { duration })?,
            None => self.spawn_and_wait(args, stdin).await,
        }
    }
}

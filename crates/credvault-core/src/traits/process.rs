// SPDX-FileCopyrightText: 2026 Credvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! External process invocation port.

use async_trait::async_trait;

use crate::error::CredvaultError;

/// Captured result of a finished child process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code, `None` if the child was terminated by a signal.
    pub status: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Stderr decoded lossily as UTF-8.
    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Runs the OpenPGP utility with a fixed argument vector.
///
/// Implementations must never route `args` through a shell. `stdin`, when
/// present, is written in full and the stream is closed before waiting for
/// the child to exit.
///
/// A non-zero exit is *not* an error at this layer: it is reported through
/// [`ProcessOutput::status`]. `Err` is reserved for spawn and pipe failures
/// (and an expired deadline, if the implementation enforces one).
#[async_trait]
pub trait ProcessRunner: Send + Sync + 'static {
    async fn run(
        &self,
        args: &[String],
        stdin: Option<&[u8]>,
    ) -> Result<ProcessOutput, CredvaultError>;
}

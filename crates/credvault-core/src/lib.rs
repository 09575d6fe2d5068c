// SPDX-FileCopyrightText: 2026 Credvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for credvault.
//!
//! Holds the error taxonomy shared by every crate in the workspace, the small
//! set of domain enums (deployment environment, threat severity), and the two
//! ports the vault and audit trail are written against: [`ProcessRunner`] for
//! spawning the OpenPGP utility and [`Clock`] for reading the current time.

pub mod error;
pub mod traits;
pub mod types;

pub use error::{CredvaultError, ErrorKind};
pub use traits::{Clock, ProcessOutput, ProcessRunner, SystemClock};
pub use types::{Environment, Severity};

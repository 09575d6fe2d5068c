// SPDX-FileCopyrightText: 2026 Credvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ports the vault and audit trail depend on.
//!
//! Production code uses the real implementations; tests substitute fakes so
//! no subprocess is spawned and time can be advanced by hand.

pub mod clock;
pub mod process;

pub use clock::{Clock, SystemClock};
pub use process::{ProcessOutput, ProcessRunner};

// SPDX-FileCopyrightText: 2026 Credvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for credvault integration tests.
//!
//! Provides fakes for the two ports and a harness that wires a vault and an
//! audit trail into a temporary directory, so tests never spawn a real
//! OpenPGP process or depend on wall-clock time.
//!
//! # Components
//!
//! - [`FakeGpg`] - In-memory OpenPGP stand-in with invocation counters
//! - [`ManualClock`] - Clock that only moves when told to
//! - [`TestHarness`] - Vault + audit trail in a temp dir

pub mod clock;
pub mod fake_gpg;
pub mod harness;

pub use clock::ManualClock;
pub use fake_gpg::FakeGpg;
pub use harness::{TestHarness, TestHarnessBuilder};

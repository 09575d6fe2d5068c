// SPDX-FileCopyrightText: 2026 Credvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenPGP-backed credential vault.
//!
//! The credential record is stored as armored ciphertext produced by an
//! external OpenPGP utility. On load it is decrypted, its SHA-256 integrity
//! hash is recomputed, and only then is it projected to the exported key
//! set and cached for a bounded time.

pub mod cache;
pub mod process;
pub mod record;
pub mod vault;

pub use cache::CredentialCache;
pub use process::GpgRunner;
pub use record::{CredentialRecord, LoadedCredentials, NewCredentials, RESEND_API_KEY};
pub use vault::{
    generate_secure_random, mask_secret, CredentialStatus, CredentialVault, LoadOptions,
    DEFAULT_CACHE_TTL,
};

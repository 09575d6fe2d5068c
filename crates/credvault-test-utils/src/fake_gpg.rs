// SPDX-FileCopyrightText: 2026 Credvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory stand-in for the OpenPGP utility.
//!
//! `FakeGpg` implements [`ProcessRunner`] by interpreting the same argument
//! vectors the vault sends to the real binary. "Ciphertext" is the hex of
//! the plaintext wrapped in armor lines, which keeps it printable and makes
//! single-byte corruption easy to stage in tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use credvault_core::{CredvaultError, ProcessOutput, ProcessRunner};

pub const ARMOR_BEGIN: &str = "-----BEGIN PGP MESSAGE-----";
pub const ARMOR_END: &str = "-----END PGP MESSAGE-----";

/// A fake OpenPGP process runner that counts every invocation.
pub struct FakeGpg {
    /// `None` accepts every key id.
    known_keys: Mutex<Option<HashSet<String>>>,
    fail_encrypt: AtomicBool,
    fail_decrypt: AtomicBool,
    fail_spawn: AtomicBool,
    invocations: AtomicUsize,
    encrypt_calls: AtomicUsize,
    decrypt_calls: AtomicUsize,
    list_key_calls: AtomicUsize,
    calls: Mutex<Vec<Vec<String>>>,
}

impl FakeGpg {
    /// Create a fake that accepts any key id.
    pub fn new() -> Self {
        Self {
            known_keys: Mutex::new(None),
            fail_encrypt: AtomicBool::new(false),
            fail_decrypt: AtomicBool::new(false),
            fail_spawn: AtomicBool::new(false),
            invocations: AtomicUsize::new(0),
            encrypt_calls: AtomicUsize::new(0),
            decrypt_calls: AtomicUsize::new(0),
            list_key_calls: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Create a fake whose keyring holds exactly the given key ids.
    pub fn with_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fake = Self::new();
        *fake.known_keys.lock().unwrap_or_else(|p| p.into_inner()) =
            Some(keys.into_iter().map(Into::into).collect());
        fake
    }

    /// Make every encryption exit non-zero.
    pub fn set_fail_encrypt(&self, fail: bool) {
        self.fail_encrypt.store(fail, Ordering::SeqCst);
    }

    /// Make every decryption exit non-zero.
    pub fn set_fail_decrypt(&self, fail: bool) {
        self.fail_decrypt.store(fail, Ordering::SeqCst);
    }

    /// Make every invocation fail as if the binary were missing.
    pub fn set_fail_spawn(&self, fail: bool) {
        self.fail_spawn.store(fail, Ordering::SeqCst);
    }

    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }

    pub fn encrypt_calls(&self) -> usize {
        self.encrypt_calls.load(Ordering::SeqCst)
    }

    pub fn decrypt_calls(&self) -> usize {
        self.decrypt_calls.load(Ordering::SeqCst)
    }

    pub fn list_key_calls(&self) -> usize {
        self.list_key_calls.load(Ordering::SeqCst)
    }

    /// Every argument vector received, in order.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    /// Produce the fake armor for `plaintext` without counting an invocation.
    pub fn armor(plaintext: &[u8]) -> String {
        format!("{ARMOR_BEGIN}\n\n{}\n{ARMOR_END}\n", hex::encode(plaintext))
    }

    fn has_key(&self, key_id: &str) -> bool {
        match &*self.known_keys.lock().unwrap_or_else(|p| p.into_inner()) {
            Some(keys) => keys.contains(key_id),
            None => true,
        }
    }

    fn encrypt(&self, args: &[String], stdin: Option<&[u8]>) -> ProcessOutput {
        self.encrypt_calls.fetch_add(1, Ordering::SeqCst);
        let recipient = value_after(args, "--recipient").unwrap_or_default();
        if self.fail_encrypt.load(Ordering::SeqCst) || !self.has_key(recipient) {
            return exit_with(
                2,
                format!("gpg: {recipient}: skipped: No public key\ngpg: [stdin]: encryption failed: No public key\n"),
            );
        }
        ProcessOutput {
            status: Some(0),
            stdout: Self::armor(stdin.unwrap_or_default()).into_bytes(),
            stderr: Vec::new(),
        }
    }

    fn decrypt(&self, stdin: Option<&[u8]>) -> ProcessOutput {
        self.decrypt_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_decrypt.load(Ordering::SeqCst) {
            return exit_with(2, "gpg: decryption failed: No secret key\n".to_string());
        }
        let input = String::from_utf8_lossy(stdin.unwrap_or_default());
        match dearmor(&input) {
            Some(plaintext) => ProcessOutput {
                status: Some(0),
                stdout: plaintext,
                stderr: Vec::new(),
            },
            None => exit_with(2, "gpg: no valid OpenPGP data found.\ngpg: decrypt_message failed: Unknown system error\n".to_string()),
        }
    }

    fn list_keys(&self, args: &[String]) -> ProcessOutput {
        self.list_key_calls.fetch_add(1, Ordering::SeqCst);
        let key_id = value_after(args, "--list-keys").unwrap_or_default();
        if self.has_key(key_id) {
            ProcessOutput {
                status: Some(0),
                stdout: format!("pub   rsa4096 2026-01-01 [SC]\n      {key_id}\n").into_bytes(),
                stderr: Vec::new(),
            }
        } else {
            exit_with(2, format!("gpg: error reading key: No public key\n{key_id}\n"))
        }
    }
}

impl Default for FakeGpg {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProcessRunner for FakeGpg {
    async fn run(
        &self,
        args: &[String],
        stdin: Option<&[u8]>,
    ) -> Result<ProcessOutput, CredvaultError> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        self.calls
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(args.to_vec());

        if self.fail_spawn.load(Ordering::SeqCst) {
            return Err(CredvaultError::Process {
                message: "failed to spawn gpg: No such file or directory".to_string(),
                stderr: String::new(),
            });
        }

        let has = |flag: &str| args.iter().any(|a| a == flag);
        let output = if has("--encrypt") {
            self.encrypt(args, stdin)
        } else if has("--decrypt") {
            self.decrypt(stdin)
        } else if has("--list-keys") {
            self.list_keys(args)
        } else {
            exit_with(2, format!("gpg: unsupported invocation: {}\n", args.join(" ")))
        };
        Ok(output)
    }
}

fn value_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn exit_with(code: i32, stderr: String) -> ProcessOutput {
    ProcessOutput {
        status: Some(code),
        stdout: Vec::new(),
        stderr: stderr.into_bytes(),
    }
}

fn dearmor(input: &str) -> Option<Vec<u8>> {
    let start = input.find(ARMOR_BEGIN)? + ARMOR_BEGIN.len();
    let end = input.find(ARMOR_END)?;
    let body: String = input
        .get(start..end)?
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    hex::decode(body).ok()
}

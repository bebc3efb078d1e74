// SPDX-FileCopyrightText: 2026 Tidewire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Token vault: channel access tokens encrypted at rest.
//!
//! Tokens are sealed with AES-256-GCM under a single master key and stored
//! as `(ciphertext, nonce)` BLOB pairs. Decryption yields a
//! [`secrecy::SecretString`] so plaintext only escapes at the platform
//! adapter call site via an explicit `expose_secret()`.

pub mod crypto;
pub mod store;

pub use store::{SealedSecret, SecretStore};

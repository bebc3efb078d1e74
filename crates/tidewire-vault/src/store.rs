// SPDX-FileCopyrightText: 2026 Tidewire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The [`SecretStore`]: the only place channel tokens cross the
//! plaintext/ciphertext boundary.

use secrecy::SecretString;
use tidewire_config::model::VaultConfig;
use tidewire_core::TidewireError;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto;

/// An encrypted secret as persisted in the channels table: ciphertext with
/// appended GCM tag, plus the 96-bit nonce used to seal it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedSecret {
    pub ciphertext: Vec<u8>,
    pub nonce: [u8; 12],
}

impl SealedSecret {
    /// Reassembles a sealed secret from raw database columns.
    pub fn from_columns(ciphertext: Vec<u8>, nonce: Vec<u8>) -> Result<Self, TidewireError> {
        let nonce: [u8; 12] = nonce
            .try_into()
            .map_err(|_| TidewireError::Vault("stored nonce is not 12 bytes".to_string()))?;
        Ok(Self { ciphertext, nonce })
    }
}

/// Seals and opens channel tokens with the workspace master key.
///
/// The key is zeroized on drop. Decryption returns a [`SecretString`];
/// callers must name the exposure (`expose_secret()`) to get plaintext,
/// which keeps accidental logging of tokens out of the codebase.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SecretStore {
    key: [u8; 32],
}

impl SecretStore {
    /// Builds a store from the vault config section.
    ///
    /// The master key must be 64 hex characters (32 bytes); it is usually
    /// injected via `TIDEWIRE_VAULT_MASTER_KEY`.
    pub fn from_config(config: &VaultConfig) -> Result<Self, TidewireError> {
        let hex_key = config.master_key.as_deref().ok_or_else(|| {
            TidewireError::Config(
                "vault.master_key is required (set TIDEWIRE_VAULT_MASTER_KEY)".to_string(),
            )
        })?;
        Self::from_hex(hex_key)
    }

    /// Builds a store from a hex-encoded 32-byte key.
    pub fn from_hex(hex_key: &str) -> Result<Self, TidewireError> {
        let mut bytes = hex::decode(hex_key.trim())
            .map_err(|_| TidewireError::Vault("vault master key is not valid hex".to_string()))?;
        if bytes.len() != 32 {
            bytes.zeroize();
            return Err(TidewireError::Vault(
                "vault master key must be 32 bytes (64 hex chars)".to_string(),
            ));
        }
        let mut key = [0u8; 32];
        key.copy_from_slice(&bytes);
        bytes.zeroize();
        Ok(Self { key })
    }

    /// Generates a store with a fresh random key (tests, key bootstrap).
    pub fn generate() -> Result<Self, TidewireError> {
        Ok(Self {
            key: crypto::generate_random_key()?,
        })
    }

    /// Encrypts a plaintext token for storage.
    pub fn seal(&self, plaintext: &str) -> Result<SealedSecret, TidewireError> {
        let (ciphertext, nonce) = crypto::seal(&self.key, plaintext.as_bytes())?;
        Ok(SealedSecret { ciphertext, nonce })
    }

    /// Decrypts a sealed token. The result is wrapped in [`SecretString`];
    /// only the platform adapter call site should expose it.
    pub fn open(&self, sealed: &SealedSecret) -> Result<SecretString, TidewireError> {
        let mut plaintext = crypto::open(&self.key, &sealed.nonce, &sealed.ciphertext)?;
        let token = String::from_utf8(plaintext.clone())
            .map_err(|_| TidewireError::Vault("decrypted token is not valid UTF-8".to_string()));
        plaintext.zeroize();
        Ok(SecretString::from(token?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn seal_open_roundtrip_through_store() {
        let store = SecretStore::generate().unwrap();
        let sealed = store.seal("EAAB.page.token").unwrap();
        let opened = store.open(&sealed).unwrap();
        assert_eq!(opened.expose_secret(), "EAAB.page.token");
    }

    #[test]
    fn from_hex_rejects_short_keys() {
        assert!(SecretStore::from_hex("deadbeef").is_err());
        assert!(SecretStore::from_hex("not hex at all").is_err());
    }

    #[test]
    fn from_config_requires_master_key() {
        let config = VaultConfig { master_key: None };
        assert!(SecretStore::from_config(&config).is_err());

        let config = VaultConfig {
            master_key: Some(hex::encode([7u8; 32])),
        };
        assert!(SecretStore::from_config(&config).is_ok());
    }

    #[test]
    fn sealed_secret_from_columns_validates_nonce_length() {
        assert!(SealedSecret::from_columns(vec![1, 2, 3], vec![0u8; 12]).is_ok());
        assert!(SealedSecret::from_columns(vec![1, 2, 3], vec![0u8; 8]).is_err());
    }
}

//! Key resolution, transaction signing and evidence attestations.
//!
//! # Security
//! - Key material comes from a secret store first, plain configuration second
//! - Keys are never logged, serialized or echoed in error messages
//! - A [`Wallet`] lives for one signing operation and is dropped right after

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use alloy::consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy::eips::eip2718::Encodable2718;
use alloy::network::TxSignerSync;
use alloy::primitives::{Address, Bytes, Signature, TxHash};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use secrecy::{ExposeSecret, SecretString};
use zeroize::Zeroizing;

use crate::blockchain::types::{BlockchainError, BlockchainResult};
use crate::evidence::EvidenceHash;

/// Scoped-access secret storage.
///
/// `scoped_get` hands out a buffer that is wiped when dropped, so the
/// caller's scope bounds the lifetime of the plaintext.
pub trait SecretStore: Send + Sync {
    fn exists(&self, name: &str) -> bool;

    fn scoped_get(&self, name: &str) -> io::Result<Zeroizing<Vec<u8>>>;
}

/// One file per secret under a root directory, as mounted by container
/// runtimes (`/run/secrets/<name>`).
#[derive(Debug, Clone)]
pub struct DirectorySecretStore {
    root: PathBuf,
}

impl DirectorySecretStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, name: &str) -> Option<PathBuf> {
        // Secret names are flat; anything that could walk the tree is refused.
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return None;
        }
        Some(self.root.join(name))
    }
}

impl SecretStore for DirectorySecretStore {
    fn exists(&self, name: &str) -> bool {
        self.path_for(name).is_some_and(|p| p.is_file())
    }

    fn scoped_get(&self, name: &str) -> io::Result<Zeroizing<Vec<u8>>> {
        let path = self
            .path_for(name)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "invalid secret name"))?;
        Ok(Zeroizing::new(fs::read(path)?))
    }
}

/// Where a key came from, for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOrigin {
    SecretStore,
    Config,
}

impl KeyOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyOrigin::SecretStore => "secret_store",
            KeyOrigin::Config => "config",
        }
    }
}

/// Key material resolved for a single invocation.
pub struct ResolvedKey {
    secret: Zeroizing<String>,
    origin: KeyOrigin,
}

impl ResolvedKey {
    pub fn origin(&self) -> KeyOrigin {
        self.origin
    }

    /// Parse the key into a signing wallet.
    pub fn into_wallet(self) -> BlockchainResult<Wallet> {
        Wallet::from_private_key(&self.secret)
    }
}

impl fmt::Debug for ResolvedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedKey")
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

/// Finds the signing key: secret store first, then plain configuration.
#[derive(Clone)]
pub struct KeyResolver {
    key_name: String,
    store: Option<Arc<dyn SecretStore>>,
    plain: Option<SecretString>,
}

impl KeyResolver {
    pub fn new(key_name: impl Into<String>) -> Self {
        Self {
            key_name: key_name.into(),
            store: None,
            plain: None,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn SecretStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Plain key from configuration. Empty values count as absent.
    pub fn with_plain(mut self, key: Option<String>) -> Self {
        self.plain = key
            .filter(|k| !k.trim().is_empty())
            .map(SecretString::from);
        self
    }

    pub fn key_name(&self) -> &str {
        &self.key_name
    }

    /// `None` when neither source holds the key.
    pub fn resolve(&self) -> Option<ResolvedKey> {
        if let Some(store) = &self.store {
            if store.exists(&self.key_name) {
                match store.scoped_get(&self.key_name) {
                    Ok(bytes) => match std::str::from_utf8(&bytes) {
                        Ok(text) if !text.trim().is_empty() => {
                            return Some(ResolvedKey {
                                secret: Zeroizing::new(text.trim().to_string()),
                                origin: KeyOrigin::SecretStore,
                            });
                        }
                        Ok(_) => {
                            tracing::warn!(key_name = %self.key_name, "Secret store entry is empty");
                        }
                        Err(_) => {
                            tracing::warn!(key_name = %self.key_name, "Secret store entry is not UTF-8");
                        }
                    },
                    Err(e) => {
                        tracing::warn!(key_name = %self.key_name, error = %e, "Secret store read failed");
                    }
                }
            }
        }

        self.plain.as_ref().map(|key| ResolvedKey {
            secret: Zeroizing::new(key.expose_secret().trim().to_string()),
            origin: KeyOrigin::Config,
        })
    }
}

impl fmt::Debug for KeyResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyResolver")
            .field("key_name", &self.key_name)
            .field("store", &self.store.is_some())
            .field("plain", &self.plain.is_some())
            .finish()
    }
}

/// Signed transaction ready for broadcast.
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    pub raw: Bytes,
    pub tx_hash: TxHash,
}

/// Signing wallet for a single anchoring operation.
pub struct Wallet {
    signer: PrivateKeySigner,
}

impl Wallet {
    /// Create a wallet from a hex-encoded private key, with or without `0x`.
    pub fn from_private_key(private_key_hex: &str) -> BlockchainResult<Self> {
        let key_hex = private_key_hex.strip_prefix("0x").unwrap_or(private_key_hex);

        // The parse error is dropped: some formats echo the input.
        let signer: PrivateKeySigner = key_hex
            .parse()
            .map_err(|_| BlockchainError::Wallet("invalid private key format".to_string()))?;

        Ok(Self { signer })
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Sign a legacy transaction. The transaction's chain id makes this an
    /// EIP-155 signature.
    pub fn sign_transaction(&self, mut tx: TxLegacy) -> BlockchainResult<SignedTransaction> {
        let signature = self
            .signer
            .sign_transaction_sync(&mut tx)
            .map_err(|e| BlockchainError::Wallet(format!("transaction signing failed: {e}")))?;

        let envelope = TxEnvelope::from(tx.into_signed(signature));
        let tx_hash = *envelope.tx_hash();
        let raw = Bytes::from(envelope.encoded_2718());

        Ok(SignedTransaction { raw, tx_hash })
    }

    /// EIP-191 signature over [`attestation_message`]. Returned as
    /// `0x`-prefixed 65-byte hex.
    pub fn sign_attestation(&self, hash: &EvidenceHash, timestamp: &str) -> BlockchainResult<String> {
        let message = attestation_message(hash, timestamp);
        let signature = self
            .signer
            .sign_message_sync(message.as_bytes())
            .map_err(|e| BlockchainError::Wallet(format!("attestation signing failed: {e}")))?;
        Ok(format!("0x{}", hex::encode(signature.as_bytes())))
    }
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address())
            .finish()
    }
}

/// Human-readable text covered by the attestation signature.
pub fn attestation_message(hash: &EvidenceHash, timestamp: &str) -> String {
    format!("Evidence Hash: {}\nTimestamp: {}", hash.to_hex(), timestamp)
}

/// Address that produced an attestation signature.
pub fn recover_attestation_signer(
    hash: &EvidenceHash,
    timestamp: &str,
    signature_hex: &str,
) -> BlockchainResult<Address> {
    let raw = signature_hex.strip_prefix("0x").unwrap_or(signature_hex);
    let bytes = hex::decode(raw).map_err(|e| BlockchainError::Wallet(format!("invalid signature hex: {e}")))?;
    let signature = Signature::from_raw(&bytes)
        .map_err(|e| BlockchainError::Wallet(format!("invalid signature: {e}")))?;
    signature
        .recover_address_from_msg(attestation_message(hash, timestamp))
        .map_err(|e| BlockchainError::Wallet(format!("signature recovery failed: {e}")))
}

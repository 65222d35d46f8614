//! FHE client interfaces
//!
//! Encryption of inputs and attested decryption are delegated to the FHE
//! SDK. The decryption round trip ends with an on-chain write which the
//! verifier performs through the caller-supplied [`Finalizer`].

use std::collections::HashMap;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::contract::{Handle, PendingSubmission};
use crate::error::{ContractError, FheError};

/// Ciphertext input together with its validity proof
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedInput {
    pub payload: Vec<u8>,
    pub proof: Vec<u8>,
}

/// Submits `(clear_values, decryption_proof)` to the contract
pub type Finalizer = Box<
    dyn FnOnce(
            Vec<u8>,
            Vec<u8>,
        ) -> BoxFuture<'static, Result<Box<dyn PendingSubmission>, ContractError>>
        + Send,
>;

/// Outcome of a decryption verification
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecryptionResult {
    pub clear_values: HashMap<Handle, u64>,
}

/// Lifecycle of the FHE client
#[async_trait]
pub trait FheRuntime: Send + Sync {
    /// Load keys and connect to the coprocessor
    async fn initialize(&self) -> Result<(), FheError>;

    fn is_initialized(&self) -> bool;
}

#[async_trait]
pub trait Encryptor: Send + Sync {
    /// Encrypt `plaintext` as an input for `target_contract`, bound to `caller`
    async fn encrypt(
        &self,
        target_contract: &str,
        caller: &str,
        plaintext: u64,
    ) -> Result<EncryptedInput, FheError>;
}

#[async_trait]
pub trait DecryptionVerifier: Send + Sync {
    /// Decrypt `handles` through the attestation service, submit the result
    /// with `finalize` and wait for its confirmation
    async fn verify(
        &self,
        handles: &[Handle],
        target_contract: &str,
        finalize: Finalizer,
    ) -> Result<DecryptionResult, FheError>;
}

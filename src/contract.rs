//! Contract collaborator interfaces
//!
//! The confidential pool contract is reached through two traits: a read-only
//! [`PoolReader`] and a signing [`PoolWriter`]. Every write hands back a
//! [`PendingSubmission`] that resolves once the transaction is confirmed.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ContractError;

/// Opaque reference to a ciphertext held by the FHE coprocessor
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Handle(pub String);

impl Handle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Raw pool data as returned by the contract's read path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolData {
    /// Token pair label stored with the pool
    pub name: String,
    /// Public volume figure
    pub public_value_1: u64,
    /// Public fees figure
    pub public_value_2: u64,
    /// Creator address
    pub creator: String,
    /// Creation time, unix seconds
    pub timestamp: i64,
    /// Whether a verified cleartext has been recorded
    pub is_verified: bool,
    /// Recorded cleartext, meaningful only once verified
    pub decrypted_value: u64,
}

/// Arguments of the pool creation call
#[derive(Debug, Clone, PartialEq)]
pub struct CreatePoolRequest {
    /// Locally generated pool identifier
    pub pool_id: String,
    /// Token pair label, e.g. `ETH/ZAMA`
    pub pair_label: String,
    /// Encrypted liquidity input
    pub encrypted_payload: Vec<u8>,
    /// Input validity proof
    pub proof: Vec<u8>,
    /// Initial public volume
    pub public_volume: u64,
    /// Initial public fees
    pub public_fees: u64,
    /// Free-form category stored with the pool
    pub category: String,
}

/// Receipt of a confirmed submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub tx_hash: String,
    pub block_number: u64,
}

/// A transaction that was accepted by the wallet and awaits inclusion
#[async_trait]
pub trait PendingSubmission: Send {
    /// Hash of the submitted transaction
    fn tx_hash(&self) -> &str;

    /// Wait until the transaction is confirmed
    async fn await_confirmation(self: Box<Self>) -> Result<Receipt, ContractError>;
}

/// Read-only access to the pool contract
#[async_trait]
pub trait PoolReader: Send + Sync {
    /// Address of the contract this reader talks to
    fn contract_address(&self) -> &str;

    /// Identifiers of every pool ever created, in creation order
    async fn list_pool_ids(&self) -> Result<Vec<String>, ContractError>;

    /// Raw data of one pool; `ContractError::NotFound` if unknown
    async fn get_pool(&self, pool_id: &str) -> Result<PoolData, ContractError>;

    /// Handle of the pool's encrypted liquidity
    async fn get_encrypted_handle(&self, pool_id: &str) -> Result<Handle, ContractError>;
}

/// State-changing calls on the pool contract, signed by the connected wallet
#[async_trait]
pub trait PoolWriter: Send + Sync {
    async fn create_pool(
        &self,
        request: CreatePoolRequest,
    ) -> Result<Box<dyn PendingSubmission>, ContractError>;

    /// Record an attested cleartext for a pool
    async fn record_verified_value(
        &self,
        pool_id: &str,
        clear_values: Vec<u8>,
        proof: Vec<u8>,
    ) -> Result<Box<dyn PendingSubmission>, ContractError>;

    /// Liveness probe used by the swap path
    async fn probe_availability(&self) -> Result<Box<dyn PendingSubmission>, ContractError>;
}

//! In-process confidential pool contract and FHE service.
//!
//! [`LocalDevnet`] implements every collaborator trait against shared
//! in-memory state so the workflow can run without a chain or relayer.
//! Writes are checked when submitted and applied when confirmed. Faults can
//! be injected to drive error paths.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tokio::sync::Mutex;

use crate::contract::{
    CreatePoolRequest, Handle, PendingSubmission, PoolData, PoolReader, PoolWriter, Receipt,
};
use crate::error::{ContractError, FheError};
use crate::fhe::{
    DecryptionResult, DecryptionVerifier, EncryptedInput, Encryptor, FheRuntime, Finalizer,
};
use crate::wallet::IdentityProvider;
use crate::workflow::Collaborators;

type Effect = Box<dyn FnOnce(&mut DevnetState) -> Result<(), ContractError> + Send>;

struct StoredPool {
    data: PoolData,
    handle: Handle,
    category: String,
}

#[derive(Default)]
struct DevnetState {
    order: Vec<String>,
    pools: HashMap<String, StoredPool>,
    ciphertexts: HashMap<Handle, u64>,
}

#[derive(Default)]
struct Faults {
    reject_next_signature: AtomicBool,
    fail_next_confirmation: AtomicBool,
    fail_listing: AtomicBool,
    fail_fhe_init: AtomicBool,
    failing_reads: std::sync::Mutex<HashSet<String>>,
}

#[derive(Default)]
struct Counters {
    listings: AtomicUsize,
    reads: AtomicUsize,
    writes: AtomicUsize,
    encryptions: AtomicUsize,
}

/// Snapshot of the devnet call counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub listings: usize,
    pub reads: usize,
    pub writes: usize,
    pub encryptions: usize,
}

struct Inner {
    contract_address: String,
    identity: Arc<dyn IdentityProvider>,
    state: Mutex<DevnetState>,
    faults: Faults,
    counters: Counters,
    block_number: AtomicU64,
    fhe_ready: AtomicBool,
    confirmation_delay: Option<Duration>,
}

/// Local stand-in for the pool contract, the relayer and the wallet signer
#[derive(Clone)]
pub struct LocalDevnet {
    inner: Arc<Inner>,
}

impl LocalDevnet {
    /// A devnet at `contract_address` whose writes are signed by `identity`
    pub fn new(contract_address: &str, identity: Arc<dyn IdentityProvider>) -> Self {
        Self::build(contract_address, identity, None)
    }

    /// Like [`LocalDevnet::new`], with every confirmation taking `delay`
    pub fn with_confirmation_delay(
        contract_address: &str,
        identity: Arc<dyn IdentityProvider>,
        delay: Duration,
    ) -> Self {
        Self::build(contract_address, identity, Some(delay))
    }

    fn build(
        contract_address: &str,
        identity: Arc<dyn IdentityProvider>,
        confirmation_delay: Option<Duration>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                contract_address: contract_address.to_string(),
                identity,
                state: Mutex::new(DevnetState::default()),
                faults: Faults::default(),
                counters: Counters::default(),
                block_number: AtomicU64::new(0),
                fhe_ready: AtomicBool::new(false),
                confirmation_delay,
            }),
        }
    }

    /// Trait objects for the workflow, all backed by this devnet
    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            identity: Arc::clone(&self.inner.identity),
            reader: Arc::new(self.clone()),
            writer: Arc::new(self.clone()),
            encryptor: Arc::new(self.clone()),
            verifier: Arc::new(self.clone()),
        }
    }

    /// Insert a pool directly, bypassing signing and confirmation
    pub async fn seed_pool(
        &self,
        pool_id: &str,
        pair_label: &str,
        liquidity: u64,
        creator: &str,
        verified: bool,
    ) -> Result<Handle, ContractError> {
        let handle = random_handle();
        let mut state = self.inner.state.lock().await;
        if state.pools.contains_key(pool_id) {
            return Err(ContractError::Reverted(format!("Pool {} already exists", pool_id)));
        }
        state.ciphertexts.insert(handle.clone(), liquidity);
        state.order.push(pool_id.to_string());
        state.pools.insert(
            pool_id.to_string(),
            StoredPool {
                data: PoolData {
                    name: pair_label.to_string(),
                    public_value_1: 0,
                    public_value_2: 0,
                    creator: creator.to_string(),
                    timestamp: chrono::Utc::now().timestamp(),
                    is_verified: verified,
                    decrypted_value: if verified { liquidity } else { 0 },
                },
                handle: handle.clone(),
                category: crate::workflow::POOL_CATEGORY.to_string(),
            },
        );
        Ok(handle)
    }

    /// Category stored with a pool
    pub async fn category(&self, pool_id: &str) -> Option<String> {
        let state = self.inner.state.lock().await;
        state.pools.get(pool_id).map(|p| p.category.clone())
    }

    pub fn counts(&self) -> CallCounts {
        let c = &self.inner.counters;
        CallCounts {
            listings: c.listings.load(Ordering::SeqCst),
            reads: c.reads.load(Ordering::SeqCst),
            writes: c.writes.load(Ordering::SeqCst),
            encryptions: c.encryptions.load(Ordering::SeqCst),
        }
    }

    pub fn block_number(&self) -> u64 {
        self.inner.block_number.load(Ordering::SeqCst)
    }

    /// The next write is refused as if the user declined the wallet prompt
    pub fn reject_next_signature(&self) {
        self.inner
            .faults
            .reject_next_signature
            .store(true, Ordering::SeqCst);
    }

    /// The next confirmation wait fails and its write is not applied
    pub fn fail_next_confirmation(&self) {
        self.inner
            .faults
            .fail_next_confirmation
            .store(true, Ordering::SeqCst);
    }

    pub fn fail_listing(&self, fail: bool) {
        self.inner.faults.fail_listing.store(fail, Ordering::SeqCst);
    }

    pub fn fail_fhe_init(&self, fail: bool) {
        self.inner.faults.fail_fhe_init.store(fail, Ordering::SeqCst);
    }

    /// Make every read of `pool_id` fail with a transport error
    pub fn fail_reads_for(&self, pool_id: &str) {
        if let Ok(mut ids) = self.inner.faults.failing_reads.lock() {
            ids.insert(pool_id.to_string());
        }
    }

    pub fn clear_read_failures(&self) {
        if let Ok(mut ids) = self.inner.faults.failing_reads.lock() {
            ids.clear();
        }
    }

    fn read_fails(&self, pool_id: &str) -> bool {
        self.inner
            .faults
            .failing_reads
            .lock()
            .map(|ids| ids.contains(pool_id))
            .unwrap_or(false)
    }

    fn require_fhe(&self) -> Result<(), FheError> {
        if self.inner.fhe_ready.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(FheError::NotInitialized)
        }
    }

    fn signer(&self) -> Result<String, ContractError> {
        self.inner
            .identity
            .authenticated_address()
            .ok_or_else(|| ContractError::Transport("no signer connected".to_string()))
    }

    /// Accept a write: consumes a pending signature rejection, otherwise
    /// returns a submission that applies `effect` once confirmed
    fn submit(&self, effect: Effect) -> Result<Box<dyn PendingSubmission>, ContractError> {
        if self
            .inner
            .faults
            .reject_next_signature
            .swap(false, Ordering::SeqCst)
        {
            return Err(ContractError::UserRejected(
                "user rejected transaction".to_string(),
            ));
        }
        self.inner.counters.writes.fetch_add(1, Ordering::SeqCst);

        let tx_hash = format!("0x{}", hex::encode(rand::thread_rng().gen::<[u8; 32]>()));
        tracing::debug!(%tx_hash, "devnet accepted transaction");
        Ok(Box::new(DevnetSubmission {
            inner: Arc::clone(&self.inner),
            tx_hash,
            effect,
        }))
    }
}

struct DevnetSubmission {
    inner: Arc<Inner>,
    tx_hash: String,
    effect: Effect,
}

#[async_trait]
impl PendingSubmission for DevnetSubmission {
    fn tx_hash(&self) -> &str {
        &self.tx_hash
    }

    async fn await_confirmation(self: Box<Self>) -> Result<Receipt, ContractError> {
        let DevnetSubmission {
            inner,
            tx_hash,
            effect,
        } = *self;

        if let Some(delay) = inner.confirmation_delay {
            tokio::time::sleep(delay).await;
        }
        if inner
            .faults
            .fail_next_confirmation
            .swap(false, Ordering::SeqCst)
        {
            return Err(ContractError::Confirmation(format!(
                "transaction {} was dropped",
                tx_hash
            )));
        }

        let mut state = inner.state.lock().await;
        effect(&mut *state)?;
        let block_number = inner.block_number.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Receipt {
            tx_hash,
            block_number,
        })
    }
}

fn random_handle() -> Handle {
    Handle(format!(
        "0x{}",
        hex::encode(rand::thread_rng().gen::<[u8; 32]>())
    ))
}

/// Proof binding an encrypted input to its contract and caller
fn input_proof(handle: &Handle, contract: &str, caller: &str) -> Vec<u8> {
    format!(
        "input:{}:{}:{}",
        handle,
        contract.to_lowercase(),
        caller.to_lowercase()
    )
    .into_bytes()
}

/// Attestation over the decrypted handles
fn decryption_proof(handles: &[Handle]) -> Vec<u8> {
    let joined: Vec<&str> = handles.iter().map(Handle::as_str).collect();
    format!("kms:{}", joined.join(",")).into_bytes()
}

#[async_trait]
impl PoolReader for LocalDevnet {
    fn contract_address(&self) -> &str {
        &self.inner.contract_address
    }

    async fn list_pool_ids(&self) -> Result<Vec<String>, ContractError> {
        self.inner.counters.listings.fetch_add(1, Ordering::SeqCst);
        if self.inner.faults.fail_listing.load(Ordering::SeqCst) {
            return Err(ContractError::Transport(
                "getAllPoolIds: connection refused".to_string(),
            ));
        }
        Ok(self.inner.state.lock().await.order.clone())
    }

    async fn get_pool(&self, pool_id: &str) -> Result<PoolData, ContractError> {
        self.inner.counters.reads.fetch_add(1, Ordering::SeqCst);
        if self.read_fails(pool_id) {
            return Err(ContractError::Transport(format!(
                "getPoolData({}): connection reset",
                pool_id
            )));
        }
        let state = self.inner.state.lock().await;
        state
            .pools
            .get(pool_id)
            .map(|p| p.data.clone())
            .ok_or_else(|| ContractError::NotFound(pool_id.to_string()))
    }

    async fn get_encrypted_handle(&self, pool_id: &str) -> Result<Handle, ContractError> {
        self.inner.counters.reads.fetch_add(1, Ordering::SeqCst);
        if self.read_fails(pool_id) {
            return Err(ContractError::Transport(format!(
                "getEncryptedData({}): connection reset",
                pool_id
            )));
        }
        let state = self.inner.state.lock().await;
        state
            .pools
            .get(pool_id)
            .map(|p| p.handle.clone())
            .ok_or_else(|| ContractError::NotFound(pool_id.to_string()))
    }
}

#[async_trait]
impl PoolWriter for LocalDevnet {
    async fn create_pool(
        &self,
        request: CreatePoolRequest,
    ) -> Result<Box<dyn PendingSubmission>, ContractError> {
        let signer = self.signer()?;
        let handle = Handle(format!("0x{}", hex::encode(&request.encrypted_payload)));
        {
            let state = self.inner.state.lock().await;
            if state.pools.contains_key(&request.pool_id) {
                return Err(ContractError::Reverted(format!(
                    "Pool {} already exists",
                    request.pool_id
                )));
            }
            if !state.ciphertexts.contains_key(&handle) {
                return Err(ContractError::Reverted("unknown ciphertext handle".to_string()));
            }
        }
        if request.proof != input_proof(&handle, &self.inner.contract_address, &signer) {
            return Err(ContractError::Reverted("invalid input proof".to_string()));
        }

        self.submit(Box::new(move |state: &mut DevnetState| {
            if state.pools.contains_key(&request.pool_id) {
                return Err(ContractError::Reverted(format!(
                    "Pool {} already exists",
                    request.pool_id
                )));
            }
            state.order.push(request.pool_id.clone());
            state.pools.insert(
                request.pool_id,
                StoredPool {
                    data: PoolData {
                        name: request.pair_label,
                        public_value_1: request.public_volume,
                        public_value_2: request.public_fees,
                        creator: signer,
                        timestamp: chrono::Utc::now().timestamp(),
                        is_verified: false,
                        decrypted_value: 0,
                    },
                    handle,
                    category: request.category,
                },
            );
            Ok(())
        }))
    }

    async fn record_verified_value(
        &self,
        pool_id: &str,
        clear_values: Vec<u8>,
        proof: Vec<u8>,
    ) -> Result<Box<dyn PendingSubmission>, ContractError> {
        self.signer()?;
        let value = clear_values
            .get(..8)
            .and_then(|word| <[u8; 8]>::try_from(word).ok())
            .map(u64::from_be_bytes)
            .ok_or_else(|| ContractError::Reverted("malformed clear values".to_string()))?;

        {
            let state = self.inner.state.lock().await;
            let pool = state
                .pools
                .get(pool_id)
                .ok_or_else(|| ContractError::NotFound(pool_id.to_string()))?;
            if pool.data.is_verified {
                return Err(ContractError::AlreadyVerified(
                    "Data already verified".to_string(),
                ));
            }
            if proof != decryption_proof(std::slice::from_ref(&pool.handle)) {
                return Err(ContractError::Reverted(
                    "invalid decryption proof".to_string(),
                ));
            }
        }

        let pool_id = pool_id.to_string();
        self.submit(Box::new(move |state: &mut DevnetState| {
            let pool = state
                .pools
                .get_mut(&pool_id)
                .ok_or_else(|| ContractError::NotFound(pool_id.clone()))?;
            if pool.data.is_verified {
                return Err(ContractError::AlreadyVerified(
                    "Data already verified".to_string(),
                ));
            }
            pool.data.is_verified = true;
            pool.data.decrypted_value = value;
            Ok(())
        }))
    }

    async fn probe_availability(&self) -> Result<Box<dyn PendingSubmission>, ContractError> {
        self.signer()?;
        self.submit(Box::new(|_: &mut DevnetState| Ok(())))
    }
}

#[async_trait]
impl FheRuntime for LocalDevnet {
    async fn initialize(&self) -> Result<(), FheError> {
        if self.inner.faults.fail_fhe_init.load(Ordering::SeqCst) {
            return Err(FheError::Initialization(
                "relayer public key unavailable".to_string(),
            ));
        }
        self.inner.fhe_ready.store(true, Ordering::SeqCst);
        tracing::info!("devnet FHE runtime ready");
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.inner.fhe_ready.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Encryptor for LocalDevnet {
    async fn encrypt(
        &self,
        target_contract: &str,
        caller: &str,
        plaintext: u64,
    ) -> Result<EncryptedInput, FheError> {
        self.require_fhe()?;
        if !target_contract.eq_ignore_ascii_case(&self.inner.contract_address) {
            return Err(FheError::Encryption(format!(
                "unknown target contract {}",
                target_contract
            )));
        }
        self.inner.counters.encryptions.fetch_add(1, Ordering::SeqCst);

        let handle = random_handle();
        let payload = hex::decode(handle.as_str().trim_start_matches("0x"))
            .map_err(|e| FheError::Encryption(e.to_string()))?;
        self.inner
            .state
            .lock()
            .await
            .ciphertexts
            .insert(handle.clone(), plaintext);

        Ok(EncryptedInput {
            payload,
            proof: input_proof(&handle, target_contract, caller),
        })
    }
}

#[async_trait]
impl DecryptionVerifier for LocalDevnet {
    async fn verify(
        &self,
        handles: &[Handle],
        target_contract: &str,
        finalize: Finalizer,
    ) -> Result<DecryptionResult, FheError> {
        self.require_fhe()?;
        if !target_contract.eq_ignore_ascii_case(&self.inner.contract_address) {
            return Err(FheError::Verification(format!(
                "handles are not bound to {}",
                target_contract
            )));
        }

        let mut clear_values = HashMap::with_capacity(handles.len());
        let mut encoded = Vec::with_capacity(handles.len() * 8);
        {
            let state = self.inner.state.lock().await;
            for handle in handles {
                let value = state.ciphertexts.get(handle).copied().ok_or_else(|| {
                    FheError::Verification(format!("unknown handle {}", handle))
                })?;
                encoded.extend_from_slice(&value.to_be_bytes());
                clear_values.insert(handle.clone(), value);
            }
        }

        let pending = finalize(encoded, decryption_proof(handles)).await?;
        pending.await_confirmation().await?;
        Ok(DecryptionResult { clear_values })
    }
}

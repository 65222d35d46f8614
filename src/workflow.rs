//! Transaction Workflow
//!
//! The three wallet-signed operations of the exchange. Each one runs the same
//! lifecycle:
//!
//! ```text
//! Idle -> PreconditionChecking -> Submitting -> AwaitingConfirmation -> Finalizing -> Idle(success)
//!                         \______________\___________________\__________________________> Idle(error)
//! ```
//!
//! Every operation is the final handler of its own failures: it always ends
//! with exactly one status notification and returns a typed outcome. Each
//! operation type is single-flight; different types may run concurrently.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use futures::FutureExt;
use tokio::sync::Mutex;

use crate::contract::{CreatePoolRequest, PoolReader, PoolWriter, Receipt};
use crate::error::{Error, WorkflowError};
use crate::fhe::{DecryptionVerifier, Encryptor, Finalizer};
use crate::ledger::{TradeLedger, TradeRecord};
use crate::notifier::StatusNotifier;
use crate::registry::PoolRegistry;
use crate::wallet::IdentityProvider;

/// Category stored with every pool created from this client
pub const POOL_CATEGORY: &str = "Liquidity Pool";

const CONNECT_WALLET: &str = "Connect wallet first";
const TX_REJECTED: &str = "Transaction rejected";

/// Operation kinds, each with its own in-flight flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreatePool,
    DecryptVerify,
    Swap,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::CreatePool => "create-pool",
            Operation::DecryptVerify => "decrypt-verify",
            Operation::Swap => "swap",
        }
    }

    fn failure_message(&self) -> &'static str {
        match self {
            Operation::CreatePool => "Creation failed",
            Operation::DecryptVerify => "Decryption failed",
            Operation::Swap => "Swap failed",
        }
    }
}

/// Lifecycle state of one operation type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowState {
    Idle,
    PreconditionChecking,
    Submitting,
    AwaitingConfirmation,
    Finalizing,
    Succeeded,
    Failed(WorkflowError),
}

impl WorkflowState {
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            WorkflowState::PreconditionChecking
                | WorkflowState::Submitting
                | WorkflowState::AwaitingConfirmation
                | WorkflowState::Finalizing
        )
    }
}

/// Generates `<prefix>-<unix millis>` identifiers, bumping the millisecond
/// component so identifiers never repeat within a process
#[derive(Debug, Default)]
pub struct IdGenerator {
    last_millis: AtomicI64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self, prefix: &str) -> String {
        let now = chrono::Utc::now().timestamp_millis();
        let mut last = self.last_millis.load(Ordering::SeqCst);
        loop {
            let next = now.max(last + 1);
            match self.last_millis.compare_exchange_weak(
                last,
                next,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return format!("{}-{}", prefix, next),
                Err(actual) => last = actual,
            }
        }
    }
}

/// Input of the create-pool operation
#[derive(Debug, Clone, PartialEq)]
pub struct CreatePoolParams {
    pub pair_label: String,
    pub liquidity: u64,
}

/// Result of a confirmed pool creation
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedPool {
    pub pool_id: String,
    pub receipt: Receipt,
}

/// Terminal non-error outcomes of decrypt-verify
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecryptOutcome {
    /// The verification round trip revealed this value
    Revealed(u64),
    /// The pool was already verified; the stored value, nothing submitted
    Stored(u64),
    /// The contract reported the value as already verified while submitting
    Duplicate,
}

impl DecryptOutcome {
    pub fn value(&self) -> Option<u64> {
        match self {
            DecryptOutcome::Revealed(v) | DecryptOutcome::Stored(v) => Some(*v),
            DecryptOutcome::Duplicate => None,
        }
    }
}

/// Input of the swap operation, as typed in the swap form
#[derive(Debug, Clone, PartialEq)]
pub struct SwapParams {
    pub input_token: String,
    pub output_token: String,
    pub input_amount: String,
    pub output_amount: String,
}

/// Collaborators the workflow drives
#[derive(Clone)]
pub struct Collaborators {
    pub identity: Arc<dyn IdentityProvider>,
    pub reader: Arc<dyn PoolReader>,
    pub writer: Arc<dyn PoolWriter>,
    pub encryptor: Arc<dyn Encryptor>,
    pub verifier: Arc<dyn DecryptionVerifier>,
}

/// Clears an operation's in-flight flag when it ends, however it ends. An
/// operation abandoned mid-way is put back to `Idle`.
struct FlightGuard<'a> {
    workflow: &'a TransactionWorkflow,
    operation: Operation,
}

impl<'a> FlightGuard<'a> {
    fn acquire(workflow: &'a TransactionWorkflow, operation: Operation) -> Option<Self> {
        workflow
            .flag(operation)
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self {
                workflow,
                operation,
            })
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut states) = self.workflow.states.lock() {
            if states.get(&self.operation).is_some_and(WorkflowState::is_busy) {
                tracing::debug!(operation = self.operation.name(), "operation abandoned");
                states.insert(self.operation, WorkflowState::Idle);
            }
        }
        self.workflow.flag(self.operation).store(false, Ordering::SeqCst);
    }
}

/// The transaction workflow state machine
pub struct TransactionWorkflow {
    collaborators: Collaborators,
    registry: Arc<PoolRegistry>,
    notifier: Arc<StatusNotifier>,
    ledger: Mutex<TradeLedger>,
    ids: IdGenerator,
    creating: AtomicBool,
    decrypting: AtomicBool,
    swapping: AtomicBool,
    states: StdMutex<HashMap<Operation, WorkflowState>>,
}

impl TransactionWorkflow {
    pub fn new(
        collaborators: Collaborators,
        registry: Arc<PoolRegistry>,
        notifier: Arc<StatusNotifier>,
        ledger: TradeLedger,
    ) -> Self {
        Self {
            collaborators,
            registry,
            notifier,
            ledger: Mutex::new(ledger),
            ids: IdGenerator::new(),
            creating: AtomicBool::new(false),
            decrypting: AtomicBool::new(false),
            swapping: AtomicBool::new(false),
            states: StdMutex::new(HashMap::new()),
        }
    }

    /// Current lifecycle state of `operation`
    pub fn state(&self, operation: Operation) -> WorkflowState {
        self.states
            .lock()
            .ok()
            .and_then(|states| states.get(&operation).cloned())
            .unwrap_or(WorkflowState::Idle)
    }

    pub fn is_in_flight(&self, operation: Operation) -> bool {
        self.flag(operation).load(Ordering::SeqCst)
    }

    /// Recent trades, newest first
    pub async fn trades(&self) -> Vec<TradeRecord> {
        self.ledger.lock().await.entries()
    }

    pub fn registry(&self) -> &Arc<PoolRegistry> {
        &self.registry
    }

    pub fn notifier(&self) -> &Arc<StatusNotifier> {
        &self.notifier
    }

    fn flag(&self, operation: Operation) -> &AtomicBool {
        match operation {
            Operation::CreatePool => &self.creating,
            Operation::DecryptVerify => &self.decrypting,
            Operation::Swap => &self.swapping,
        }
    }

    fn transition(&self, operation: Operation, state: WorkflowState) {
        tracing::debug!(operation = operation.name(), ?state, "workflow transition");
        if let Ok(mut states) = self.states.lock() {
            states.insert(operation, state);
        }
    }

    /// Enter the operation: single-flight gate, then the wallet precondition
    async fn begin(
        &self,
        operation: Operation,
    ) -> Result<(FlightGuard<'_>, String), WorkflowError> {
        let guard = FlightGuard::acquire(self, operation)
            .ok_or(WorkflowError::InFlight(operation.name()))?;

        self.transition(operation, WorkflowState::PreconditionChecking);
        match self.collaborators.identity.authenticated_address() {
            Some(address) => Ok((guard, address)),
            None => {
                let err = WorkflowError::NotConnected;
                self.notifier.error(CONNECT_WALLET).await;
                self.transition(operation, WorkflowState::Failed(err.clone()));
                Err(err)
            }
        }
    }

    /// Report a terminal failure and record it
    async fn fail(&self, operation: Operation, err: WorkflowError) -> WorkflowError {
        let message = match err {
            WorkflowError::UserRejected => TX_REJECTED,
            _ => operation.failure_message(),
        };
        tracing::warn!(operation = operation.name(), error = %err, "operation failed");
        self.notifier.error(message).await;
        self.transition(operation, WorkflowState::Failed(err.clone()));
        err
    }

    /// Encrypt `liquidity`, submit the pool and wait for confirmation.
    ///
    /// On success the registry is refreshed; the caller closes its creation
    /// form.
    pub async fn create_pool(
        &self,
        params: CreatePoolParams,
    ) -> Result<CreatedPool, WorkflowError> {
        let op = Operation::CreatePool;
        let (_guard, caller) = self.begin(op).await?;
        if params.pair_label.trim().is_empty() {
            let err = WorkflowError::InvalidInput("token pair is required".to_string());
            return Err(self.fail(op, err).await);
        }

        self.transition(op, WorkflowState::Submitting);
        self.notifier.pending("Creating pool with FHE...").await;

        let pool_id = self.ids.next("pool");
        let contract = self.collaborators.reader.contract_address().to_string();

        let submission = async {
            let encrypted = self
                .collaborators
                .encryptor
                .encrypt(&contract, &caller, params.liquidity)
                .await?;
            let pending = self
                .collaborators
                .writer
                .create_pool(CreatePoolRequest {
                    pool_id: pool_id.clone(),
                    pair_label: params.pair_label.clone(),
                    encrypted_payload: encrypted.payload,
                    proof: encrypted.proof,
                    public_volume: 0,
                    public_fees: 0,
                    category: POOL_CATEGORY.to_string(),
                })
                .await?;
            Ok::<_, Error>(pending)
        }
        .await;

        let pending = match submission {
            Ok(pending) => pending,
            Err(e) => return Err(self.fail(op, WorkflowError::from_submission(&e)).await),
        };
        tracing::debug!(%pool_id, tx_hash = pending.tx_hash(), "pool creation submitted");

        self.transition(op, WorkflowState::AwaitingConfirmation);
        self.notifier.pending("Waiting for confirmation...").await;
        let receipt = match pending.await_confirmation().await {
            Ok(receipt) => receipt,
            Err(e) => {
                let err = WorkflowError::from_confirmation(&Error::from(e));
                return Err(self.fail(op, err).await);
            }
        };

        self.transition(op, WorkflowState::Finalizing);
        self.notifier.success("Pool created!").await;
        if let Err(e) = self.registry.refresh_silently().await {
            tracing::warn!(error = %e, "refresh after pool creation failed");
        }

        tracing::info!(%pool_id, tx_hash = %receipt.tx_hash, "pool created");
        self.transition(op, WorkflowState::Succeeded);
        Ok(CreatedPool { pool_id, receipt })
    }

    /// Reveal a pool's liquidity through on-chain decryption verification
    pub async fn decrypt_verify(&self, pool_id: &str) -> Result<DecryptOutcome, WorkflowError> {
        let op = Operation::DecryptVerify;
        let (_guard, _caller) = self.begin(op).await?;

        self.transition(op, WorkflowState::Submitting);
        let reader = Arc::clone(&self.collaborators.reader);

        let current = match reader.get_pool(pool_id).await {
            Ok(data) => data,
            Err(e) => {
                let err = WorkflowError::from_submission(&Error::from(e));
                return Err(self.fail(op, err).await);
            }
        };
        if current.is_verified {
            let value = current.decrypted_value;
            self.notifier.success("Already verified").await;
            self.transition(op, WorkflowState::Succeeded);
            return Ok(DecryptOutcome::Stored(value));
        }

        let handle = match reader.get_encrypted_handle(pool_id).await {
            Ok(handle) => handle,
            Err(e) => {
                let err = WorkflowError::from_submission(&Error::from(e));
                return Err(self.fail(op, err).await);
            }
        };

        let writer = Arc::clone(&self.collaborators.writer);
        let target = pool_id.to_string();
        let finalize: Finalizer = Box::new(move |clear_values, proof| {
            async move {
                let pending = writer
                    .record_verified_value(&target, clear_values, proof)
                    .await?;
                tracing::debug!(
                    pool_id = %target,
                    tx_hash = pending.tx_hash(),
                    "verification submitted"
                );
                Ok(pending)
            }
            .boxed()
        });

        self.transition(op, WorkflowState::AwaitingConfirmation);
        self.notifier.pending("Verifying decryption...").await;
        let result = self
            .collaborators
            .verifier
            .verify(
                std::slice::from_ref(&handle),
                reader.contract_address(),
                finalize,
            )
            .await;

        let result = match result {
            Ok(result) => result,
            Err(e) if e.is_already_verified() => {
                tracing::info!(pool_id, "decryption already recorded on-chain");
                self.notifier.success("Already verified").await;
                if let Err(e) = self.registry.refresh_silently().await {
                    tracing::warn!(error = %e, "refresh after duplicate verification failed");
                }
                self.transition(op, WorkflowState::Succeeded);
                return Ok(DecryptOutcome::Duplicate);
            }
            Err(e) => {
                let err = WorkflowError::from_confirmation(&Error::from(e));
                return Err(self.fail(op, err).await);
            }
        };

        self.transition(op, WorkflowState::Finalizing);
        let value = match result.clear_values.get(&handle) {
            Some(value) => *value,
            None => {
                let err = WorkflowError::ConfirmationFailed(format!(
                    "no clear value returned for handle {}",
                    handle
                ));
                return Err(self.fail(op, err).await);
            }
        };

        if let Err(e) = self.registry.refresh_silently().await {
            tracing::warn!(error = %e, "refresh after decryption failed");
        }
        self.notifier.success("Decryption verified!").await;

        tracing::info!(pool_id, value, "decryption verified");
        self.transition(op, WorkflowState::Succeeded);
        Ok(DecryptOutcome::Revealed(value))
    }

    /// Execute a swap.
    ///
    /// The contract exposes no exchange entry point yet: the swap confirms an
    /// availability probe and records the trade locally.
    pub async fn swap(&self, params: SwapParams) -> Result<TradeRecord, WorkflowError> {
        let op = Operation::Swap;
        let (_guard, trader) = self.begin(op).await?;
        if params.input_amount.trim().is_empty() || params.output_amount.trim().is_empty() {
            let err =
                WorkflowError::InvalidInput("input and output amounts are required".to_string());
            return Err(self.fail(op, err).await);
        }

        self.transition(op, WorkflowState::Submitting);
        self.notifier.pending("Executing swap...").await;

        let pending = match self.collaborators.writer.probe_availability().await {
            Ok(pending) => pending,
            Err(e) => {
                let err = WorkflowError::from_submission(&Error::from(e));
                return Err(self.fail(op, err).await);
            }
        };

        self.transition(op, WorkflowState::AwaitingConfirmation);
        tracing::debug!(tx_hash = pending.tx_hash(), "swap submitted");
        if let Err(e) = pending.await_confirmation().await {
            let err = WorkflowError::from_confirmation(&Error::from(e));
            return Err(self.fail(op, err).await);
        }

        self.transition(op, WorkflowState::Finalizing);
        let trade = TradeRecord {
            id: self.ids.next("trade"),
            input_token: params.input_token,
            output_token: params.output_token,
            input_amount: parse_amount(&params.input_amount),
            output_amount: parse_amount(&params.output_amount),
            executed_at: chrono::Utc::now().timestamp(),
            trader,
        };
        self.ledger.lock().await.append(trade.clone());
        self.notifier.success("Swap executed!").await;

        tracing::info!(trade_id = %trade.id, "swap executed");
        self.transition(op, WorkflowState::Succeeded);
        Ok(trade)
    }
}

/// Parse a typed amount, treating anything unparsable or negative as zero
pub fn parse_amount(input: &str) -> f64 {
    match input.trim().parse::<f64>() {
        Ok(value) if value.is_finite() && value > 0.0 => value,
        _ => 0.0,
    }
}

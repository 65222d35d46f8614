//! Application session
//!
//! Binds the wallet session, the FHE runtime and the view state to the
//! transaction workflow. Front-ends drive this type; it owns no rendering.

use std::sync::Arc;

use crate::config::Config;
use crate::devnet::LocalDevnet;
use crate::error::{Error, WorkflowError};
use crate::fhe::FheRuntime;
use crate::ledger::{TradeLedger, TradeRecord};
use crate::notifier::{DismissPolicy, StatusNotifier, WorkflowStatus};
use crate::registry::{PoolRecord, PoolRegistry, PoolStats};
use crate::view::ViewState;
use crate::wallet::{IdentityProvider, WalletSession};
use crate::workflow::{Collaborators, CreatedPool, DecryptOutcome, Operation, TransactionWorkflow};

/// One connected front-end session
pub struct App {
    config: Config,
    wallet: Arc<WalletSession>,
    fhe: Arc<dyn FheRuntime>,
    notifier: Arc<StatusNotifier>,
    registry: Arc<PoolRegistry>,
    workflow: TransactionWorkflow,
    view: ViewState,
}

impl App {
    /// Assemble a session. `collaborators.identity` is expected to be `wallet`.
    pub fn new(
        config: Config,
        wallet: Arc<WalletSession>,
        fhe: Arc<dyn FheRuntime>,
        collaborators: Collaborators,
    ) -> Self {
        let notifier = Arc::new(StatusNotifier::new(DismissPolicy::from(&config.workflow)));
        let registry = Arc::new(PoolRegistry::new(
            Arc::clone(&collaborators.reader),
            Arc::clone(&notifier),
            config.workflow.refresh_concurrency,
        ));
        let workflow = TransactionWorkflow::new(
            collaborators,
            Arc::clone(&registry),
            Arc::clone(&notifier),
            TradeLedger::new(config.workflow.ledger_capacity),
        );

        let mut view = ViewState::default();
        if let Some(pair) = config.pairs.first() {
            view.new_pool_form.token_pair = pair.clone();
        }

        Self {
            config,
            wallet,
            fhe,
            notifier,
            registry,
            workflow,
            view,
        }
    }

    /// A session backed by an in-process devnet at the configured contract
    pub fn with_devnet(config: Config) -> (Self, LocalDevnet) {
        let wallet = Arc::new(WalletSession::new());
        let identity: Arc<dyn IdentityProvider> = wallet.clone();
        let devnet = LocalDevnet::new(&config.network.contract_address, identity);
        let fhe: Arc<dyn FheRuntime> = Arc::new(devnet.clone());
        let app = Self::new(config, wallet, fhe, devnet.collaborators());
        (app, devnet)
    }

    /// Connect `address` and run the post-connection setup
    pub async fn connect(&mut self, address: &str) -> Result<(), Error> {
        self.wallet.connect(address)?;
        self.on_connected().await
    }

    pub fn disconnect(&mut self) {
        self.wallet.disconnect();
        self.view.close_pool_detail();
        self.view.close_create_pool();
    }

    /// Initialize the FHE runtime if needed, then load the pools
    pub async fn on_connected(&mut self) -> Result<(), Error> {
        if !self.fhe.is_initialized() {
            self.view.fhe_initializing = true;
            let initialized = self.fhe.initialize().await;
            self.view.fhe_initializing = false;
            if let Err(e) = initialized {
                tracing::error!(error = %e, "FHE runtime initialization failed");
                self.notifier.error("FHEVM initialization failed").await;
                return Err(e.into());
            }
        }

        self.view.loading = true;
        let loaded = self.registry.refresh().await;
        self.view.contract_address = Some(self.registry.contract_address().to_string());
        self.view.loading = false;

        let pools = loaded?;
        self.view.sync_selection(&pools);
        Ok(())
    }

    /// Submit the new-pool form; on success the modal closes and the form resets
    pub async fn submit_create_pool(&mut self) -> Result<CreatedPool, WorkflowError> {
        if !self.view.new_pool_form.can_submit() {
            return Err(WorkflowError::InvalidInput(
                "token pair and liquidity are required".to_string(),
            ));
        }
        let created = self
            .workflow
            .create_pool(self.view.new_pool_form.to_params())
            .await?;

        self.view.close_create_pool();
        self.view.new_pool_form.reset();
        if let Some(pair) = self.config.pairs.first() {
            self.view.new_pool_form.token_pair = pair.clone();
        }
        self.sync_selection().await;
        Ok(created)
    }

    /// Decrypt the selected pool's liquidity
    pub async fn decrypt_selected(&mut self) -> Result<DecryptOutcome, WorkflowError> {
        let pool_id = match &self.view.selected_pool {
            Some(pool) => pool.id.clone(),
            None => return Err(WorkflowError::InvalidInput("no pool selected".to_string())),
        };

        let outcome = self.workflow.decrypt_verify(&pool_id).await?;
        if let Some(value) = outcome.value() {
            self.view.decrypted_liquidity = Some(value);
        }
        self.sync_selection().await;
        Ok(outcome)
    }

    /// Submit the swap form; on success both amounts are cleared
    pub async fn submit_swap(&mut self) -> Result<TradeRecord, WorkflowError> {
        if !self.view.swap_form.can_submit() {
            return Err(WorkflowError::InvalidInput(
                "input and output amounts are required".to_string(),
            ));
        }
        let trade = self.workflow.swap(self.view.swap_form.to_params()).await?;
        self.view.swap_form.clear_amounts();
        Ok(trade)
    }

    pub async fn refresh(&mut self) -> Result<Vec<PoolRecord>, Error> {
        let pools = self.registry.refresh().await?;
        self.view.sync_selection(&pools);
        Ok(pools)
    }

    /// Open the detail of a cached pool; false if the id is unknown
    pub async fn select_pool(&mut self, pool_id: &str) -> bool {
        match self.registry.get(pool_id).await {
            Some(pool) => {
                self.view.select_pool(pool);
                true
            }
            None => false,
        }
    }

    async fn sync_selection(&mut self) {
        let pools = self.registry.pools().await;
        self.view.sync_selection(&pools);
    }

    pub fn is_decrypting(&self) -> bool {
        self.workflow.is_in_flight(Operation::DecryptVerify)
    }

    pub fn is_creating(&self) -> bool {
        self.workflow.is_in_flight(Operation::CreatePool)
    }

    pub fn is_connected(&self) -> bool {
        self.wallet.is_connected()
    }

    pub fn address(&self) -> Option<String> {
        self.wallet.address()
    }

    pub fn status(&self) -> WorkflowStatus {
        self.notifier.current()
    }

    pub async fn pools(&self) -> Vec<PoolRecord> {
        self.registry.pools().await
    }

    pub async fn stats(&self) -> PoolStats {
        self.registry.stats().await
    }

    pub async fn trades(&self) -> Vec<TradeRecord> {
        self.workflow.trades().await
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut ViewState {
        &mut self.view
    }

    pub fn workflow(&self) -> &TransactionWorkflow {
        &self.workflow
    }

    pub fn notifier(&self) -> &Arc<StatusNotifier> {
        &self.notifier
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::StatusPhase;

    const ALICE: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";

    #[tokio::test]
    async fn test_connect_initializes_fhe_and_loads_pools() {
        let (mut app, devnet) = App::with_devnet(Config::default());
        devnet
            .seed_pool("pool-1", "ETH/ZAMA", 10, ALICE, false)
            .await
            .unwrap();

        app.connect(ALICE).await.unwrap();

        assert!(devnet.is_initialized());
        assert!(!app.view().loading);
        assert_eq!(app.pools().await.len(), 1);
        assert_eq!(
            app.view().contract_address.as_deref(),
            Some(Config::default().network.contract_address.as_str())
        );
    }

    #[tokio::test]
    async fn test_fhe_init_failure_is_reported() {
        let (mut app, devnet) = App::with_devnet(Config::default());
        devnet.fail_fhe_init(true);

        let result = app.connect(ALICE).await;
        assert!(matches!(result, Err(Error::Fhe(_))));

        let status = app.status();
        assert_eq!(status.phase, StatusPhase::Error);
        assert_eq!(status.message, "FHEVM initialization failed");
        assert!(!app.view().fhe_initializing);
        assert_eq!(devnet.counts().listings, 0);
    }

    #[tokio::test]
    async fn test_invalid_address_is_refused() {
        let (mut app, _devnet) = App::with_devnet(Config::default());
        assert!(matches!(app.connect("0x1234").await, Err(Error::Wallet(_))));
        assert!(!app.is_connected());
    }

    #[tokio::test]
    async fn test_disabled_submit_does_nothing() {
        let (mut app, devnet) = App::with_devnet(Config::default());
        app.connect(ALICE).await.unwrap();

        assert!(matches!(
            app.submit_swap().await,
            Err(WorkflowError::InvalidInput(_))
        ));
        assert!(matches!(
            app.submit_create_pool().await,
            Err(WorkflowError::InvalidInput(_))
        ));
        assert_eq!(devnet.counts().writes, 0);
        assert!(!app.status().visible);
    }
}

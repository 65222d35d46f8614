#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use cipherswap_sdk::{
    notifier::DismissPolicy, Collaborators, CreatePoolParams, LocalDevnet, PoolRegistry,
    StatusNotifier, SwapParams, TradeLedger, TransactionWorkflow, WalletSession,
};
use cipherswap_sdk::{FheRuntime, IdentityProvider};

#[cfg(test)]
pub mod test_utils {
    use super::*;

    pub const CONTRACT: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";
    pub const ALICE: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";
    pub const BOB: &str = "0x3C44CdDdB6a900fa2b585dd299e03d12FA4293BC";

    /// A workflow wired to a local devnet
    pub struct TestEnv {
        pub wallet: Arc<WalletSession>,
        pub devnet: LocalDevnet,
        pub notifier: Arc<StatusNotifier>,
        pub registry: Arc<PoolRegistry>,
        pub workflow: Arc<TransactionWorkflow>,
    }

    /// Connected wallet, initialized FHE runtime
    pub async fn setup() -> TestEnv {
        build(Some(ALICE), None, |c| c).await
    }

    /// No wallet connected
    pub async fn setup_disconnected() -> TestEnv {
        build(None, None, |c| c).await
    }

    /// Every confirmation takes `delay`
    pub async fn setup_with_delay(delay: Duration) -> TestEnv {
        build(Some(ALICE), Some(delay), |c| c).await
    }

    /// Swap some collaborators before the workflow is built
    pub async fn setup_with<F>(customize: F) -> TestEnv
    where
        F: FnOnce(Collaborators) -> Collaborators,
    {
        build(Some(ALICE), None, customize).await
    }

    async fn build<F>(address: Option<&str>, delay: Option<Duration>, customize: F) -> TestEnv
    where
        F: FnOnce(Collaborators) -> Collaborators,
    {
        let wallet = Arc::new(match address {
            Some(address) => WalletSession::connected(address).expect("valid test address"),
            None => WalletSession::new(),
        });
        let identity: Arc<dyn IdentityProvider> = wallet.clone();
        let devnet = match delay {
            Some(delay) => LocalDevnet::with_confirmation_delay(CONTRACT, identity, delay),
            None => LocalDevnet::new(CONTRACT, identity),
        };
        devnet.initialize().await.expect("devnet FHE runtime");

        let collaborators = customize(devnet.collaborators());
        let notifier = Arc::new(StatusNotifier::new(DismissPolicy::default()));
        let registry = Arc::new(PoolRegistry::new(
            Arc::clone(&collaborators.reader),
            Arc::clone(&notifier),
            8,
        ));
        let workflow = Arc::new(TransactionWorkflow::new(
            collaborators,
            Arc::clone(&registry),
            Arc::clone(&notifier),
            TradeLedger::default(),
        ));

        TestEnv {
            wallet,
            devnet,
            notifier,
            registry,
            workflow,
        }
    }

    pub fn create_params(pair: &str, liquidity: u64) -> CreatePoolParams {
        CreatePoolParams {
            pair_label: pair.to_string(),
            liquidity,
        }
    }

    pub fn swap_params(input_amount: &str, output_amount: &str) -> SwapParams {
        SwapParams {
            input_token: "ETH".to_string(),
            output_token: "ZAMA".to_string(),
            input_amount: input_amount.to_string(),
            output_amount: output_amount.to_string(),
        }
    }
}

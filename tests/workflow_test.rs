mod utils;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cipherswap_sdk::fhe::{DecryptionResult, Finalizer};
use cipherswap_sdk::workflow::WorkflowState;
use cipherswap_sdk::{
    ContractError, DecryptOutcome, DecryptionVerifier, FheError, Handle, Operation, PoolData,
    PoolReader, StatusPhase, WorkflowError,
};
use tokio_test::{assert_err, assert_ok};
use utils::test_utils::{
    create_params, setup, setup_disconnected, setup_with, setup_with_delay, swap_params, ALICE,
    BOB,
};

/// Reports every pool as unverified, like a read that raced a verification
struct StaleReader {
    inner: Arc<dyn PoolReader>,
}

#[async_trait]
impl PoolReader for StaleReader {
    fn contract_address(&self) -> &str {
        self.inner.contract_address()
    }

    async fn list_pool_ids(&self) -> Result<Vec<String>, ContractError> {
        self.inner.list_pool_ids().await
    }

    async fn get_pool(&self, pool_id: &str) -> Result<PoolData, ContractError> {
        let mut data = self.inner.get_pool(pool_id).await?;
        data.is_verified = false;
        data.decrypted_value = 0;
        Ok(data)
    }

    async fn get_encrypted_handle(&self, pool_id: &str) -> Result<Handle, ContractError> {
        self.inner.get_encrypted_handle(pool_id).await
    }
}

/// Finalizes nothing and reports no clear values
struct EmptyVerifier;

#[async_trait]
impl DecryptionVerifier for EmptyVerifier {
    async fn verify(
        &self,
        _handles: &[Handle],
        _target_contract: &str,
        _finalize: Finalizer,
    ) -> Result<DecryptionResult, FheError> {
        Ok(DecryptionResult::default())
    }
}

#[tokio::test]
async fn test_create_pool_appears_after_refresh() {
    let env = setup().await;

    let first = assert_ok!(env.workflow.create_pool(create_params("ETH/ZAMA", 1000)).await);
    let second = assert_ok!(env.workflow.create_pool(create_params("ZAMA/USDC", 50)).await);
    assert!(first.pool_id.starts_with("pool-"));
    assert_ne!(first.pool_id, second.pool_id);

    let pools = env.registry.pools().await;
    let ids: Vec<_> = pools.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec![first.pool_id.as_str(), second.pool_id.as_str()]);

    let pool = &pools[0];
    assert_eq!(pool.token_pair, "ETH/ZAMA");
    assert_eq!(pool.creator, ALICE);
    assert_eq!(pool.public_volume, 0);
    assert_eq!(pool.public_fees, 0);
    assert!(!pool.is_verified);
    assert_eq!(pool.decrypted_value, None);
    assert_eq!(
        env.devnet.category(&first.pool_id).await.as_deref(),
        Some("Liquidity Pool")
    );

    let status = env.notifier.current();
    assert_eq!(status.phase, StatusPhase::Success);
    assert_eq!(status.message, "Pool created!");
    assert_eq!(env.workflow.state(Operation::CreatePool), WorkflowState::Succeeded);
}

#[tokio::test]
async fn test_disconnected_create_pool_makes_no_calls() {
    let env = setup_disconnected().await;

    let result = env.workflow.create_pool(create_params("ETH/ZAMA", 1000)).await;
    assert_eq!(result, Err(WorkflowError::NotConnected));

    let status = env.notifier.current();
    assert_eq!(status.phase, StatusPhase::Error);
    assert_eq!(status.message, "Connect wallet first");

    let counts = env.devnet.counts();
    assert_eq!(counts.encryptions, 0);
    assert_eq!(counts.writes, 0);
    assert_eq!(counts.reads, 0);
    assert_eq!(counts.listings, 0);
}

#[tokio::test]
async fn test_user_rejection_has_its_own_message() {
    let env = setup().await;
    env.devnet.reject_next_signature();

    let result = env.workflow.create_pool(create_params("ETH/ZAMA", 1000)).await;
    assert_eq!(result, Err(WorkflowError::UserRejected));

    let status = env.notifier.current();
    assert_eq!(status.phase, StatusPhase::Error);
    assert_eq!(status.message, "Transaction rejected");
    assert!(env.devnet.list_pool_ids().await.unwrap().is_empty());
    assert_eq!(env.devnet.counts().writes, 0);
}

#[tokio::test]
async fn test_failed_confirmation_reports_creation_failed() {
    let env = setup().await;
    env.devnet.fail_next_confirmation();

    let result = env.workflow.create_pool(create_params("ETH/ZAMA", 1000)).await;
    assert!(matches!(result, Err(WorkflowError::ConfirmationFailed(_))));
    assert_eq!(env.notifier.current().message, "Creation failed");
    assert!(env.registry.pools().await.is_empty());
    assert!(!env.workflow.is_in_flight(Operation::CreatePool));
}

#[tokio::test]
async fn test_empty_pair_is_invalid_input() {
    let env = setup().await;

    let result = env.workflow.create_pool(create_params("  ", 1000)).await;
    assert!(matches!(result, Err(WorkflowError::InvalidInput(_))));
    assert_eq!(env.notifier.current().message, "Creation failed");
    assert_eq!(env.devnet.counts().encryptions, 0);
}

#[tokio::test(start_paused = true)]
async fn test_second_create_is_refused_while_first_in_flight() {
    let env = setup_with_delay(Duration::from_millis(500)).await;

    let (first, second) = tokio::join!(
        env.workflow.create_pool(create_params("ETH/ZAMA", 1)),
        env.workflow.create_pool(create_params("ETH/USDC", 2)),
    );

    assert_ok!(first);
    assert_eq!(second, Err(WorkflowError::InFlight("create-pool")));
    assert_eq!(env.devnet.counts().writes, 1);
    assert_eq!(env.devnet.counts().encryptions, 1);
    assert_eq!(env.registry.pools().await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_different_operations_run_concurrently() {
    let env = setup_with_delay(Duration::from_millis(500)).await;

    let (created, traded) = tokio::join!(
        env.workflow.create_pool(create_params("ETH/ZAMA", 1)),
        env.workflow.swap(swap_params("1", "400")),
    );

    assert_ok!(created);
    assert_ok!(traded);
}

#[tokio::test]
async fn test_decrypt_reveals_and_records_value() {
    let env = setup().await;
    let created = assert_ok!(env.workflow.create_pool(create_params("ETH/ZAMA", 4242)).await);

    let outcome = assert_ok!(env.workflow.decrypt_verify(&created.pool_id).await);
    assert_eq!(outcome, DecryptOutcome::Revealed(4242));

    let pool = env.registry.get(&created.pool_id).await.unwrap();
    assert!(pool.is_verified);
    assert_eq!(pool.decrypted_value, Some(4242));
    assert_eq!(env.notifier.current().message, "Decryption verified!");
}

#[tokio::test]
async fn test_verified_pool_short_circuits() {
    let env = setup().await;
    env.devnet
        .seed_pool("pool-1", "ETH/ZAMA", 777, BOB, true)
        .await
        .unwrap();
    let writes_before = env.devnet.counts().writes;

    let outcome = assert_ok!(env.workflow.decrypt_verify("pool-1").await);
    assert_eq!(outcome, DecryptOutcome::Stored(777));
    assert_eq!(outcome.value(), Some(777));
    assert_eq!(env.devnet.counts().writes, writes_before);

    let status = env.notifier.current();
    assert_eq!(status.phase, StatusPhase::Success);
    assert_eq!(status.message, "Already verified");
}

#[tokio::test]
async fn test_duplicate_verification_is_benign() {
    let env = setup_with(|mut collaborators| {
        collaborators.reader = Arc::new(StaleReader {
            inner: collaborators.reader,
        });
        collaborators
    })
    .await;
    env.devnet
        .seed_pool("pool-1", "ETH/ZAMA", 10, BOB, true)
        .await
        .unwrap();
    assert_eq!(env.registry.refresh_count(), 0);
    let mut events = env.notifier.events();

    let outcome = assert_ok!(env.workflow.decrypt_verify("pool-1").await);
    assert_eq!(outcome, DecryptOutcome::Duplicate);
    assert_eq!(outcome.value(), None);
    assert_eq!(env.registry.refresh_count(), 1);

    let shown: Vec<_> = std::iter::from_fn(|| events.try_recv().ok()).collect();
    assert!(shown.iter().all(|status| status.phase != StatusPhase::Error));
    let messages: Vec<_> = shown.iter().map(|status| status.message.as_str()).collect();
    assert_eq!(messages, vec!["Verifying decryption...", "Already verified"]);

    let status = env.notifier.current();
    assert_eq!(status.phase, StatusPhase::Success);
    assert_eq!(status.message, "Already verified");
}

#[tokio::test]
async fn test_decrypt_unknown_pool_fails() {
    let env = setup().await;

    let result = env.workflow.decrypt_verify("pool-missing").await;
    assert_err!(result);
    assert_eq!(env.notifier.current().message, "Decryption failed");
    assert!(matches!(
        env.workflow.state(Operation::DecryptVerify),
        WorkflowState::Failed(_)
    ));
}

#[tokio::test]
async fn test_rejected_verification_has_its_own_message() {
    let env = setup().await;
    env.devnet
        .seed_pool("pool-1", "ETH/ZAMA", 10, BOB, false)
        .await
        .unwrap();
    env.devnet.reject_next_signature();

    let result = env.workflow.decrypt_verify("pool-1").await;
    assert_eq!(result, Err(WorkflowError::UserRejected));

    let status = env.notifier.current();
    assert_eq!(status.phase, StatusPhase::Error);
    assert_eq!(status.message, "Transaction rejected");
    assert!(!env.devnet.get_pool("pool-1").await.unwrap().is_verified);
}

#[tokio::test]
async fn test_failed_record_confirmation_reports_decryption_failed() {
    let env = setup().await;
    env.devnet
        .seed_pool("pool-1", "ETH/ZAMA", 10, BOB, false)
        .await
        .unwrap();
    env.devnet.fail_next_confirmation();

    let result = env.workflow.decrypt_verify("pool-1").await;
    assert!(matches!(result, Err(WorkflowError::ConfirmationFailed(_))));
    assert_eq!(env.notifier.current().message, "Decryption failed");
    assert!(!env.devnet.get_pool("pool-1").await.unwrap().is_verified);
}

#[tokio::test]
async fn test_missing_clear_value_reports_decryption_failed() {
    let env = setup_with(|mut collaborators| {
        collaborators.verifier = Arc::new(EmptyVerifier);
        collaborators
    })
    .await;
    env.devnet
        .seed_pool("pool-1", "ETH/ZAMA", 10, BOB, false)
        .await
        .unwrap();

    let result = env.workflow.decrypt_verify("pool-1").await;
    assert!(matches!(result, Err(WorkflowError::ConfirmationFailed(_))));

    let status = env.notifier.current();
    assert_eq!(status.phase, StatusPhase::Error);
    assert_eq!(status.message, "Decryption failed");
    assert!(matches!(
        env.workflow.state(Operation::DecryptVerify),
        WorkflowState::Failed(WorkflowError::ConfirmationFailed(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_second_decrypt_is_refused_while_first_in_flight() {
    let env = setup_with_delay(Duration::from_millis(500)).await;
    env.devnet
        .seed_pool("pool-1", "ETH/ZAMA", 64, BOB, false)
        .await
        .unwrap();

    let (first, second) = tokio::join!(
        env.workflow.decrypt_verify("pool-1"),
        env.workflow.decrypt_verify("pool-1"),
    );

    assert_eq!(assert_ok!(first), DecryptOutcome::Revealed(64));
    assert_eq!(second, Err(WorkflowError::InFlight("decrypt-verify")));
    assert_eq!(env.devnet.counts().writes, 1);
    assert_eq!(env.notifier.current().message, "Decryption verified!");
}

#[tokio::test(start_paused = true)]
async fn test_second_swap_is_refused_while_first_in_flight() {
    let env = setup_with_delay(Duration::from_millis(500)).await;

    let (first, second) = tokio::join!(
        env.workflow.swap(swap_params("1", "400")),
        env.workflow.swap(swap_params("2", "800")),
    );

    assert_ok!(first);
    assert_eq!(second, Err(WorkflowError::InFlight("swap")));
    assert_eq!(env.devnet.counts().writes, 1);
    assert_eq!(env.workflow.trades().await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_create_returns_to_idle() {
    let env = setup_with_delay(Duration::from_millis(500)).await;

    let abandoned = tokio::time::timeout(
        Duration::from_millis(100),
        env.workflow.create_pool(create_params("ETH/ZAMA", 1)),
    )
    .await;
    assert!(abandoned.is_err());

    assert_eq!(env.workflow.state(Operation::CreatePool), WorkflowState::Idle);
    assert!(!env.workflow.is_in_flight(Operation::CreatePool));

    // The operation can be started again
    assert_ok!(env.workflow.create_pool(create_params("ETH/ZAMA", 2)).await);
}

//! Pool Registry Cache
//!
//! In-memory list of pool records rebuilt from the contract on every refresh.
//! Each refresh lists all pool identifiers and then reads every pool with
//! bounded concurrency; a pool that fails to load is logged and left out.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};

use crate::contract::{PoolData, PoolReader};
use crate::error::{ContractError, Error};
use crate::notifier::StatusNotifier;

/// A pool as held by the cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolRecord {
    pub id: String,
    pub token_pair: String,
    pub public_volume: u64,
    pub public_fees: u64,
    pub creator: String,
    /// Creation time, unix seconds
    pub created_at: i64,
    pub is_verified: bool,
    /// Only present once the pool is verified
    pub decrypted_value: Option<u64>,
}

impl PoolRecord {
    /// Build a record from raw contract data. Unverified pools never carry a
    /// decrypted value, whatever the contract returned.
    pub fn from_contract(id: &str, data: PoolData) -> Self {
        let decrypted_value = data.is_verified.then_some(data.decrypted_value);
        Self {
            id: id.to_string(),
            token_pair: data.name,
            public_volume: data.public_value_1,
            public_fees: data.public_value_2,
            creator: data.creator,
            created_at: data.timestamp,
            is_verified: data.is_verified,
            decrypted_value,
        }
    }
}

/// Aggregates shown on the stats tab
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PoolStats {
    pub total_pools: usize,
    pub verified_pools: usize,
    pub total_volume: u64,
    pub total_fees: u64,
}

impl PoolStats {
    pub fn from_pools(pools: &[PoolRecord]) -> Self {
        Self {
            total_pools: pools.len(),
            verified_pools: pools.iter().filter(|p| p.is_verified).count(),
            total_volume: pools
                .iter()
                .fold(0u64, |acc, p| acc.saturating_add(p.public_volume)),
            total_fees: pools
                .iter()
                .fold(0u64, |acc, p| acc.saturating_add(p.public_fees)),
        }
    }
}

/// Cached pool list with a single-flight refresh
pub struct PoolRegistry {
    reader: Arc<dyn PoolReader>,
    notifier: Arc<StatusNotifier>,
    pools: RwLock<Vec<PoolRecord>>,
    refresh_gate: Mutex<()>,
    refreshing: AtomicBool,
    refresh_count: AtomicU64,
    concurrency: usize,
}

impl PoolRegistry {
    pub fn new(
        reader: Arc<dyn PoolReader>,
        notifier: Arc<StatusNotifier>,
        concurrency: usize,
    ) -> Self {
        Self {
            reader,
            notifier,
            pools: RwLock::new(Vec::new()),
            refresh_gate: Mutex::new(()),
            refreshing: AtomicBool::new(false),
            refresh_count: AtomicU64::new(0),
            concurrency: concurrency.max(1),
        }
    }

    /// Reload every pool. A failed listing keeps the previous list and shows
    /// "Failed to load data".
    pub async fn refresh(&self) -> Result<Vec<PoolRecord>, Error> {
        match self.refresh_silently().await {
            Ok(pools) => Ok(pools),
            Err(e) => {
                self.notifier.error("Failed to load data").await;
                Err(e)
            }
        }
    }

    /// Reload every pool without touching the notification.
    ///
    /// Refreshes never overlap: a call made while another is running waits
    /// for it and then performs its own pass.
    pub async fn refresh_silently(&self) -> Result<Vec<PoolRecord>, Error> {
        let _gate = self.refresh_gate.lock().await;
        self.refreshing.store(true, Ordering::SeqCst);
        let result = self.load_all().await;
        self.refreshing.store(false, Ordering::SeqCst);
        self.refresh_count.fetch_add(1, Ordering::SeqCst);

        let pools = result?;
        *self.pools.write().await = pools.clone();
        tracing::info!(pools = pools.len(), "pool registry refreshed");
        Ok(pools)
    }

    async fn load_all(&self) -> Result<Vec<PoolRecord>, Error> {
        let ids = self.reader.list_pool_ids().await?;
        let total = ids.len();

        let results: Vec<Result<PoolRecord, ContractError>> = stream::iter(ids)
            .map(|id| {
                let reader = Arc::clone(&self.reader);
                async move {
                    reader
                        .get_pool(&id)
                        .await
                        .map(|data| PoolRecord::from_contract(&id, data))
                }
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let pools: Vec<PoolRecord> = results
            .into_iter()
            .filter_map(|result| match result {
                Ok(pool) => Some(pool),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping pool that failed to load");
                    None
                }
            })
            .collect();

        if pools.len() < total {
            tracing::warn!(
                loaded = pools.len(),
                total,
                "some pools could not be loaded"
            );
        }
        Ok(pools)
    }

    /// Snapshot of the cached pools in listing order
    pub async fn pools(&self) -> Vec<PoolRecord> {
        self.pools.read().await.clone()
    }

    pub async fn get(&self, pool_id: &str) -> Option<PoolRecord> {
        self.pools
            .read()
            .await
            .iter()
            .find(|p| p.id == pool_id)
            .cloned()
    }

    pub async fn stats(&self) -> PoolStats {
        PoolStats::from_pools(&self.pools.read().await)
    }

    /// Whether a refresh pass is running
    pub fn is_refreshing(&self) -> bool {
        self.refreshing.load(Ordering::SeqCst)
    }

    /// Number of completed refresh passes, successful or not
    pub fn refresh_count(&self) -> u64 {
        self.refresh_count.load(Ordering::SeqCst)
    }

    pub fn contract_address(&self) -> &str {
        self.reader.contract_address()
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Pool of custody integration handles.
//!
//! One handle per `(vault_account_id, chain)` pair. Building a handle costs
//! a custody round trip (primary address lookup), so idle handles are kept
//! and reused until capacity pressure or the idle sweep removes them.
//!
//! Ownership rules: an acquired handle is exclusively held until its lease
//! drops; in-use entries are never evicted, never handed out twice. A full
//! pool with no idle entry fails acquisition rather than queueing. Release
//! is keyed by the same `(vault_account_id, chain)` pair as acquire;
//! releasing an unknown key is a no-op.

use std::collections::{BTreeMap, HashMap};
use std::ops::Deref;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use utoipa::ToSchema;

use super::client::{CustodyError, CustodySigner};
use super::types::{Chain, SigningRequest};

/// Default maximum number of pooled handles.
pub const DEFAULT_POOL_CAPACITY: usize = 32;

/// Default idle lifetime before the sweep removes a handle.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// Default interval between sweep passes.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Pool key: one entry per vault account per chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PoolKey {
    pub vault_account_id: String,
    pub chain: Chain,
}

impl PoolKey {
    pub fn new(vault_account_id: impl Into<String>, chain: Chain) -> Self {
        Self {
            vault_account_id: vault_account_id.into(),
            chain,
        }
    }
}

impl std::fmt::Display for PoolKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.vault_account_id, self.chain)
    }
}

/// A ready-to-use custody integration for one vault account on one chain.
#[derive(Debug)]
pub struct VaultIntegration {
    pub vault_account_id: String,
    pub chain: Chain,
    pub primary_address: String,
}

impl VaultIntegration {
    /// Raw-message signing request against this integration's vault key.
    pub fn raw_request(&self, content_hex: &str, note: impl Into<String>) -> SigningRequest {
        SigningRequest::raw_message(self.chain, &self.vault_account_id, content_hex, note)
    }
}

struct PoolEntry {
    handle: Arc<VaultIntegration>,
    last_used_at: Instant,
    in_use: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("integration {key} is already in use")]
    Busy { key: String },

    #[error("pool is at capacity ({capacity}) with no idle entry to evict")]
    Capacity { capacity: usize },

    #[error("failed to build integration for {key}: {source}")]
    Construction {
        key: String,
        #[source]
        source: CustodyError,
    },
}

/// Point-in-time pool occupancy, for the admin surface.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PoolMetrics {
    pub total_instances: usize,
    pub active_instances: usize,
    pub idle_instances: usize,
    /// `vault_account_id:chain` → currently in use.
    pub per_key_in_use: BTreeMap<String, bool>,
}

struct PoolInner {
    custody: Arc<dyn CustodySigner>,
    entries: Mutex<HashMap<PoolKey, PoolEntry>>,
    capacity: usize,
    idle_timeout: Duration,
    sweep_interval: Duration,
}

/// Keyed pool of custody integrations with LRU eviction and idle expiry.
///
/// Cheap to clone; clones share the same entry map.
#[derive(Clone)]
pub struct IntegrationPool {
    inner: Arc<PoolInner>,
}

impl IntegrationPool {
    pub fn new(custody: Arc<dyn CustodySigner>) -> Self {
        Self::with_limits(
            custody,
            DEFAULT_POOL_CAPACITY,
            DEFAULT_IDLE_TIMEOUT,
            DEFAULT_SWEEP_INTERVAL,
        )
    }

    pub fn with_limits(
        custody: Arc<dyn CustodySigner>,
        capacity: usize,
        idle_timeout: Duration,
        sweep_interval: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                custody,
                entries: Mutex::new(HashMap::new()),
                capacity: capacity.max(1),
                idle_timeout,
                sweep_interval,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PoolKey, PoolEntry>> {
        // A panicked holder leaves the map consistent; keep serving.
        self.inner.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Acquire the integration for `key`, building it on first use.
    ///
    /// The returned lease releases the entry when dropped.
    pub async fn acquire(&self, key: PoolKey) -> Result<PoolLease, PoolError> {
        {
            let mut entries = self.lock();
            if let Some(entry) = entries.get_mut(&key) {
                if entry.in_use {
                    return Err(PoolError::Busy {
                        key: key.to_string(),
                    });
                }
                entry.in_use = true;
                entry.last_used_at = Instant::now();
                debug!(key = %key, "reusing pooled custody integration");
                return Ok(PoolLease {
                    pool: self.clone(),
                    key,
                    handle: Arc::clone(&entry.handle),
                });
            }

            // New key on a full pool with nothing evictable: fail before
            // spending a custody round trip.
            if entries.len() >= self.inner.capacity && !entries.values().any(|e| !e.in_use) {
                return Err(PoolError::Capacity {
                    capacity: self.inner.capacity,
                });
            }
        }

        // Build outside the lock; the address lookup is a network call.
        let address = self
            .inner
            .custody
            .get_address(&key.vault_account_id, key.chain.asset_id())
            .await
            .map_err(|source| PoolError::Construction {
                key: key.to_string(),
                source,
            })?;
        let handle = Arc::new(VaultIntegration {
            vault_account_id: key.vault_account_id.clone(),
            chain: key.chain,
            primary_address: address,
        });

        let mut entries = self.lock();

        // Another task may have inserted the same key while we were building.
        if let Some(entry) = entries.get_mut(&key) {
            if entry.in_use {
                return Err(PoolError::Busy {
                    key: key.to_string(),
                });
            }
            entry.in_use = true;
            entry.last_used_at = Instant::now();
            return Ok(PoolLease {
                pool: self.clone(),
                key,
                handle: Arc::clone(&entry.handle),
            });
        }

        if entries.len() >= self.inner.capacity {
            self.evict_oldest_idle(&mut entries)?;
        }

        info!(key = %key, address = %handle.primary_address, "built custody integration");
        entries.insert(
            key.clone(),
            PoolEntry {
                handle: Arc::clone(&handle),
                last_used_at: Instant::now(),
                in_use: true,
            },
        );
        Ok(PoolLease {
            pool: self.clone(),
            key,
            handle,
        })
    }

    fn evict_oldest_idle(
        &self,
        entries: &mut HashMap<PoolKey, PoolEntry>,
    ) -> Result<(), PoolError> {
        let oldest = entries
            .iter()
            .filter(|(_, e)| !e.in_use)
            .min_by_key(|(_, e)| e.last_used_at)
            .map(|(k, _)| k.clone());
        match oldest {
            Some(key) => {
                entries.remove(&key);
                info!(key = %key, "evicted idle custody integration (capacity)");
                Ok(())
            }
            None => Err(PoolError::Capacity {
                capacity: self.inner.capacity,
            }),
        }
    }

    /// Mark the entry for `key` idle. Unknown keys are a no-op.
    pub fn release(&self, key: &PoolKey) {
        let mut entries = self.lock();
        match entries.get_mut(key) {
            Some(entry) if entry.in_use => {
                entry.in_use = false;
                entry.last_used_at = Instant::now();
            }
            _ => {
                debug!(key = %key, "release for unknown or idle pool key ignored");
            }
        }
    }

    /// Remove entries idle longer than the timeout. Returns removal count.
    pub fn sweep_idle(&self) -> usize {
        let mut entries = self.lock();
        let expired: Vec<PoolKey> = entries
            .iter()
            .filter(|(_, e)| !e.in_use && e.last_used_at.elapsed() >= self.inner.idle_timeout)
            .map(|(k, _)| k.clone())
            .collect();
        for key in &expired {
            entries.remove(key);
            info!(key = %key, "removed idle custody integration (timeout)");
        }
        expired.len()
    }

    /// Run the periodic idle sweep until the token is cancelled.
    ///
    /// Spawn as a background task:
    /// ```rust,ignore
    /// tokio::spawn(pool.clone().run_sweeper(shutdown.clone()));
    /// ```
    pub async fn run_sweeper(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.inner.sweep_interval.as_secs(),
            idle_timeout_secs = self.inner.idle_timeout.as_secs(),
            "pool sweeper starting"
        );
        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.inner.sweep_interval) => {},
                _ = shutdown.cancelled() => {
                    info!("pool sweeper shutting down");
                    return;
                }
            }
            let removed = self.sweep_idle();
            if removed > 0 {
                debug!(removed, "pool sweep pass complete");
            }
        }
    }

    /// Drop all entries unconditionally. Eviction is destructive, not
    /// cooperative; in-flight holders keep their `Arc` until they finish.
    pub fn clear(&self) {
        let mut entries = self.lock();
        let count = entries.len();
        entries.clear();
        info!(count, "pool cleared");
    }

    pub fn metrics(&self) -> PoolMetrics {
        let entries = self.lock();
        let active = entries.values().filter(|e| e.in_use).count();
        PoolMetrics {
            total_instances: entries.len(),
            active_instances: active,
            idle_instances: entries.len() - active,
            per_key_in_use: entries
                .iter()
                .map(|(k, e)| (k.to_string(), e.in_use))
                .collect(),
        }
    }
}

/// Exclusive lease on a pooled integration; releases on drop.
pub struct PoolLease {
    pool: IntegrationPool,
    key: PoolKey,
    handle: Arc<VaultIntegration>,
}

impl PoolLease {
    pub fn key(&self) -> &PoolKey {
        &self.key
    }
}

impl std::fmt::Debug for PoolLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolLease").field("key", &self.key).finish()
    }
}

impl Deref for PoolLease {
    type Target = VaultIntegration;

    fn deref(&self) -> &Self::Target {
        &self.handle
    }
}

impl Drop for PoolLease {
    fn drop(&mut self) {
        self.pool.release(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::custody::types::OperationState;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct FakeCustody {
        address_calls: AtomicUsize,
        fail: AtomicBool,
    }

    impl FakeCustody {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                address_calls: AtomicUsize::new(0),
                fail: AtomicBool::new(false),
            })
        }
    }

    #[async_trait]
    impl CustodySigner for FakeCustody {
        async fn create_signing_operation(
            &self,
            _request: &SigningRequest,
        ) -> Result<String, CustodyError> {
            unimplemented!("not used by pool tests")
        }

        async fn get_operation_status(
            &self,
            _operation_id: &str,
        ) -> Result<OperationState, CustodyError> {
            unimplemented!("not used by pool tests")
        }

        async fn get_address(
            &self,
            vault_account_id: &str,
            asset_id: &str,
        ) -> Result<String, CustodyError> {
            self.address_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(CustodyError::Transport("boom".to_string()));
            }
            Ok(format!("addr-{vault_account_id}-{asset_id}"))
        }

        async fn get_addresses(
            &self,
            vault_account_id: &str,
            asset_id: &str,
        ) -> Result<Vec<String>, CustodyError> {
            Ok(vec![self.get_address(vault_account_id, asset_id).await?])
        }
    }

    fn pool(custody: Arc<FakeCustody>, capacity: usize) -> IntegrationPool {
        IntegrationPool::with_limits(
            custody,
            capacity,
            Duration::from_millis(5),
            Duration::from_secs(60),
        )
    }

    #[tokio::test]
    async fn builds_once_and_reuses_idle_entries() {
        let custody = FakeCustody::new();
        let pool = pool(Arc::clone(&custody), 4);
        let key = PoolKey::new("va-1", Chain::Cardano);

        let lease = pool.acquire(key.clone()).await.unwrap();
        assert_eq!(lease.primary_address, "addr-va-1-ADA");
        drop(lease);

        let lease = pool.acquire(key).await.unwrap();
        assert_eq!(custody.address_calls.load(Ordering::SeqCst), 1);
        drop(lease);
    }

    #[tokio::test]
    async fn in_use_entry_is_never_handed_out_twice() {
        let custody = FakeCustody::new();
        let pool = pool(custody, 4);
        let key = PoolKey::new("va-1", Chain::Cardano);

        let _lease = pool.acquire(key.clone()).await.unwrap();
        let err = pool.acquire(key).await.unwrap_err();
        assert!(matches!(err, PoolError::Busy { .. }));
    }

    #[tokio::test]
    async fn same_account_different_chain_gets_its_own_entry() {
        let custody = FakeCustody::new();
        let pool = pool(custody, 4);

        let _ada = pool.acquire(PoolKey::new("va-1", Chain::Cardano)).await.unwrap();
        let _btc = pool.acquire(PoolKey::new("va-1", Chain::Bitcoin)).await.unwrap();
        assert_eq!(pool.metrics().active_instances, 2);
    }

    #[tokio::test]
    async fn full_pool_evicts_the_oldest_idle_entry() {
        let custody = FakeCustody::new();
        let pool = pool(custody, 2);

        drop(pool.acquire(PoolKey::new("va-old", Chain::Cardano)).await.unwrap());
        tokio::time::sleep(Duration::from_millis(2)).await;
        drop(pool.acquire(PoolKey::new("va-new", Chain::Cardano)).await.unwrap());

        drop(pool.acquire(PoolKey::new("va-extra", Chain::Cardano)).await.unwrap());

        let metrics = pool.metrics();
        assert_eq!(metrics.total_instances, 2);
        assert!(!metrics.per_key_in_use.contains_key("va-old:cardano"));
        assert!(metrics.per_key_in_use.contains_key("va-new:cardano"));
        assert!(metrics.per_key_in_use.contains_key("va-extra:cardano"));
    }

    #[tokio::test]
    async fn full_pool_with_no_idle_entry_rejects_new_keys() {
        let custody = FakeCustody::new();
        let pool = pool(Arc::clone(&custody), 1);

        let _held = pool.acquire(PoolKey::new("va-1", Chain::Cardano)).await.unwrap();
        let err = pool.acquire(PoolKey::new("va-2", Chain::Cardano)).await.unwrap_err();
        assert!(matches!(err, PoolError::Capacity { capacity: 1 }));
        // Rejected before spending a custody round trip.
        assert_eq!(custody.address_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn construction_failure_adds_no_entry() {
        let custody = FakeCustody::new();
        custody.fail.store(true, Ordering::SeqCst);
        let pool = pool(custody, 4);

        let err = pool.acquire(PoolKey::new("va-1", Chain::Cardano)).await.unwrap_err();
        assert!(matches!(err, PoolError::Construction { .. }));
        assert_eq!(pool.metrics().total_instances, 0);
    }

    #[tokio::test]
    async fn release_of_unknown_key_is_a_noop() {
        let custody = FakeCustody::new();
        let pool = pool(custody, 4);
        pool.release(&PoolKey::new("never-acquired", Chain::Bitcoin));
        assert_eq!(pool.metrics().total_instances, 0);
    }

    #[tokio::test]
    async fn lease_drop_marks_entry_idle() {
        let custody = FakeCustody::new();
        let pool = pool(custody, 4);
        let key = PoolKey::new("va-1", Chain::Cardano);

        let lease = pool.acquire(key.clone()).await.unwrap();
        assert_eq!(pool.metrics().active_instances, 1);
        drop(lease);

        let metrics = pool.metrics();
        assert_eq!(metrics.active_instances, 0);
        assert_eq!(metrics.idle_instances, 1);
        assert_eq!(metrics.per_key_in_use.get("va-1:cardano"), Some(&false));
    }

    #[tokio::test]
    async fn sweep_removes_expired_idle_entries_only() {
        let custody = FakeCustody::new();
        let pool = pool(custody, 4);

        drop(pool.acquire(PoolKey::new("va-expired", Chain::Cardano)).await.unwrap());
        let _held = pool.acquire(PoolKey::new("va-held", Chain::Cardano)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(10)).await;
        // Acquired after the sleep, so still inside the idle window.
        drop(pool.acquire(PoolKey::new("va-fresh", Chain::Cardano)).await.unwrap());

        let removed = pool.sweep_idle();
        assert_eq!(removed, 1);

        let metrics = pool.metrics();
        assert!(!metrics.per_key_in_use.contains_key("va-expired:cardano"));
        assert!(metrics.per_key_in_use.contains_key("va-held:cardano"));
        assert!(metrics.per_key_in_use.contains_key("va-fresh:cardano"));
    }

    #[tokio::test]
    async fn clear_drops_everything() {
        let custody = FakeCustody::new();
        let pool = pool(custody, 4);
        drop(pool.acquire(PoolKey::new("va-1", Chain::Cardano)).await.unwrap());
        drop(pool.acquire(PoolKey::new("va-2", Chain::Cardano)).await.unwrap());

        pool.clear();
        assert_eq!(pool.metrics().total_instances, 0);
    }
}

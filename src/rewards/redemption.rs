// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token redemption workflow.
//!
//! A strict sequence: phase window → thaw eligibility → funding UTXO →
//! build → sign → submit → audit. Steps never reorder because selection,
//! signing, and submission must all reference the same funding set. Each
//! failure carries its step so operators can tell "window closed" from
//! "build failed" at a glance.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::chain::{ChainData, ChainDataError, Utxo, VkeyWitness};
use crate::custody::{SigningError, SigningMachine, VaultIntegration};
use crate::storage::{AuditEvent, AuditEventType, AuditStore};

use super::api::{PhaseConfig, RedemptionApi, RewardsApiError, SubmittedRedemption, ThawStatus};

/// The redemption window derived from phase configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedemptionWindow {
    /// Unix seconds, inclusive.
    pub start: i64,
    /// Unix seconds, exclusive.
    pub end: i64,
}

impl RedemptionWindow {
    pub fn from_phase(phase: &PhaseConfig) -> Self {
        Self {
            start: phase.genesis_timestamp,
            end: phase.genesis_timestamp + phase.increment_period * phase.increment_count,
        }
    }

    /// Open over the half-open interval `[start, end)`.
    pub fn is_open_at(&self, unix_seconds: i64) -> bool {
        unix_seconds >= self.start && unix_seconds < self.end
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RedemptionError {
    #[error("redemption phase lookup failed for {address}: {source}")]
    Phase {
        address: String,
        #[source]
        source: RewardsApiError,
    },

    #[error("redemption window closed for {address}: open [{start}, {end})")]
    WindowClosed {
        address: String,
        start: i64,
        end: i64,
    },

    #[error("thaw schedule lookup failed for {address}: {source}")]
    Thaw {
        address: String,
        #[source]
        source: RewardsApiError,
    },

    #[error("no redeemable thaw entry for {address}")]
    NoRedeemableThaw { address: String },

    #[error("UTXO fetch failed for {address}: {source}")]
    Utxos {
        address: String,
        #[source]
        source: ChainDataError,
    },

    #[error("no funding UTXO at {address}")]
    NoFundingUtxo { address: String },

    #[error("redemption build failed for {address}: {source}")]
    Build {
        address: String,
        #[source]
        source: RewardsApiError,
    },

    #[error("redemption signing failed for {address}: {source}")]
    Signing {
        address: String,
        #[source]
        source: SigningError,
    },

    #[error("redemption submit failed for {address}: {source}")]
    Submit {
        address: String,
        #[source]
        source: RewardsApiError,
    },
}

/// Drives one redemption attempt end to end.
pub struct RedemptionWorkflow {
    rewards: Arc<dyn RedemptionApi>,
    chain_data: Arc<dyn ChainData>,
    signing: SigningMachine,
    audit: AuditStore,
}

impl RedemptionWorkflow {
    pub fn new(
        rewards: Arc<dyn RedemptionApi>,
        chain_data: Arc<dyn ChainData>,
        signing: SigningMachine,
        audit: AuditStore,
    ) -> Self {
        Self {
            rewards,
            chain_data,
            signing,
            audit,
        }
    }

    /// Redeem the thawed allocation at the integration's primary address.
    pub async fn redeem(
        &self,
        handle: &VaultIntegration,
        cancel: &CancellationToken,
    ) -> Result<SubmittedRedemption, RedemptionError> {
        let address = handle.primary_address.clone();

        // Step 1: phase window. Fetched fresh every attempt; the window is
        // time-dependent and must not be cached across runs.
        let phase = self
            .rewards
            .phase_config()
            .await
            .map_err(|source| RedemptionError::Phase {
                address: address.clone(),
                source,
            })?;
        let window = RedemptionWindow::from_phase(&phase);
        let now = Utc::now().timestamp();
        if !window.is_open_at(now) {
            return Err(RedemptionError::WindowClosed {
                address,
                start: window.start,
                end: window.end,
            });
        }

        // Step 2: thaw eligibility.
        let schedule = self
            .rewards
            .thaw_schedule(&address)
            .await
            .map_err(|source| RedemptionError::Thaw {
                address: address.clone(),
                source,
            })?;
        if !schedule.iter().any(|e| e.status == ThawStatus::Redeemable) {
            return Err(RedemptionError::NoRedeemableThaw { address });
        }

        // Step 3: funding input. Redemption spends only base asset, so the
        // single largest output is enough; no token-aware selection.
        let utxos = self
            .chain_data
            .list_utxos(&address)
            .await
            .map_err(|source| RedemptionError::Utxos {
                address: address.clone(),
                source,
            })?;
        let funding: &Utxo = utxos
            .iter()
            .max_by_key(|u| u.base_asset())
            .ok_or_else(|| RedemptionError::NoFundingUtxo {
                address: address.clone(),
            })?;

        // Step 4: build the unsigned transaction.
        let built = self
            .rewards
            .build_redemption(&address, funding)
            .await
            .map_err(|source| RedemptionError::Build {
                address: address.clone(),
                source,
            })?;
        info!(
            address = %address,
            funding = %funding.reference(),
            tx_id = %built.tx_id,
            "redemption transaction built"
        );

        // Step 5: sign the transaction id and wrap it as a witness.
        let request = handle.raw_request(&built.tx_id, "reward redemption");
        let outcome = self
            .signing
            .sign(&request, cancel)
            .await
            .map_err(|source| RedemptionError::Signing {
                address: address.clone(),
                source,
            })?;
        let witness = VkeyWitness::new(outcome.public_key, outcome.signature.full_sig);

        // Step 6: submit.
        let submitted = self
            .rewards
            .submit_redemption(&built.tx_body, &witness)
            .await
            .map_err(|source| RedemptionError::Submit {
                address: address.clone(),
                source,
            })?;
        info!(
            address = %address,
            tx_hash = %submitted.tx_hash,
            "redemption submitted"
        );

        // Step 7: audit record. The transaction is already on the wire, so
        // a write failure is logged, not raised.
        let event = AuditEvent::new(AuditEventType::RedemptionSubmitted)
            .with_vault(&handle.vault_account_id, handle.chain)
            .with_address(&address)
            .with_details(json!({
                "tx_hash": submitted.tx_hash.clone(),
                "tx_id": built.tx_id,
                "funding_utxo": funding.reference(),
            }));
        if let Err(e) = self.audit.log(&event) {
            warn!(address = %address, error = %e, "failed to write redemption audit record");
        }

        Ok(submitted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::types::{AssetQuantity, BASE_ASSET_UNIT};
    use crate::custody::client::{CustodyError, CustodySigner};
    use crate::custody::types::{
        Chain, OperationState, OperationStatus, SignatureParts, SignedMessage, SigningAlgorithm,
        SigningRequest,
    };
    use crate::rewards::api::{BuiltRedemption, ThawEntry};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct FakeRewards {
        phase: PhaseConfig,
        schedule: Vec<ThawEntry>,
        thaw_calls: AtomicUsize,
        built_with: Mutex<Option<String>>,
        submitted_witness: Mutex<Option<VkeyWitness>>,
    }

    impl FakeRewards {
        fn new(phase: PhaseConfig, schedule: Vec<ThawEntry>) -> Arc<Self> {
            Arc::new(Self {
                phase,
                schedule,
                thaw_calls: AtomicUsize::new(0),
                built_with: Mutex::new(None),
                submitted_witness: Mutex::new(None),
            })
        }
    }

    #[async_trait]
    impl RedemptionApi for FakeRewards {
        async fn phase_config(&self) -> Result<PhaseConfig, RewardsApiError> {
            Ok(self.phase)
        }

        async fn thaw_schedule(&self, _address: &str) -> Result<Vec<ThawEntry>, RewardsApiError> {
            self.thaw_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.schedule.clone())
        }

        async fn build_redemption(
            &self,
            _address: &str,
            funding: &Utxo,
        ) -> Result<BuiltRedemption, RewardsApiError> {
            *self.built_with.lock().unwrap() = Some(funding.reference());
            Ok(BuiltRedemption {
                tx_body: "84a300".to_string(),
                tx_id: "ab".repeat(32),
            })
        }

        async fn submit_redemption(
            &self,
            _tx_body: &str,
            witness: &VkeyWitness,
        ) -> Result<SubmittedRedemption, RewardsApiError> {
            *self.submitted_witness.lock().unwrap() = Some(witness.clone());
            Ok(SubmittedRedemption {
                tx_hash: "cd".repeat(32),
            })
        }
    }

    struct FakeChainData {
        utxos: Vec<Utxo>,
    }

    #[async_trait]
    impl ChainData for FakeChainData {
        async fn list_utxos(&self, _address: &str) -> Result<Vec<Utxo>, ChainDataError> {
            Ok(self.utxos.clone())
        }

        async fn latest_slot(&self) -> Result<u64, ChainDataError> {
            Ok(0)
        }
    }

    struct FakeCustody {
        fail_signing: AtomicBool,
    }

    #[async_trait]
    impl CustodySigner for FakeCustody {
        async fn create_signing_operation(
            &self,
            _request: &SigningRequest,
        ) -> Result<String, CustodyError> {
            Ok("op-1".to_string())
        }

        async fn get_operation_status(
            &self,
            _operation_id: &str,
        ) -> Result<OperationState, CustodyError> {
            if self.fail_signing.load(Ordering::SeqCst) {
                return Ok(OperationState {
                    id: "op-1".to_string(),
                    status: OperationStatus::Rejected,
                    sub_status: Some("REJECTED_BY_POLICY".to_string()),
                    signed_messages: vec![],
                });
            }
            Ok(OperationState {
                id: "op-1".to_string(),
                status: OperationStatus::Completed,
                sub_status: None,
                signed_messages: vec![SignedMessage {
                    content: "ab".repeat(32),
                    algorithm: SigningAlgorithm::EddsaEd25519,
                    signature: SignatureParts {
                        full_sig: "ee".repeat(64),
                        ..Default::default()
                    },
                    public_key: "aa".repeat(32),
                }],
            })
        }

        async fn get_address(&self, _v: &str, _a: &str) -> Result<String, CustodyError> {
            Ok("addr_test1qz".to_string())
        }

        async fn get_addresses(&self, _v: &str, _a: &str) -> Result<Vec<String>, CustodyError> {
            Ok(vec!["addr_test1qz".to_string()])
        }
    }

    fn open_phase() -> PhaseConfig {
        PhaseConfig {
            genesis_timestamp: Utc::now().timestamp() - 100,
            increment_period: 600,
            increment_count: 10,
        }
    }

    fn closed_phase() -> PhaseConfig {
        PhaseConfig {
            genesis_timestamp: Utc::now().timestamp() - 10_000,
            increment_period: 600,
            increment_count: 10,
        }
    }

    fn redeemable_entry() -> ThawEntry {
        ThawEntry {
            amount: 1_000_000,
            status: ThawStatus::Redeemable,
            thaws_at: Utc::now(),
        }
    }

    fn locked_entry() -> ThawEntry {
        ThawEntry {
            amount: 1_000_000,
            status: ThawStatus::Locked,
            thaws_at: Utc::now(),
        }
    }

    fn base_utxo(tag: u32, base: u128) -> Utxo {
        Utxo {
            address: "addr_test1qz".to_string(),
            tx_hash: format!("{tag:064x}"),
            output_index: 0,
            assets: vec![AssetQuantity {
                unit: BASE_ASSET_UNIT.to_string(),
                quantity: base,
            }],
        }
    }

    fn handle() -> VaultIntegration {
        VaultIntegration {
            vault_account_id: "va-1".to_string(),
            chain: Chain::Cardano,
            primary_address: "addr_test1qz".to_string(),
        }
    }

    fn workflow(
        rewards: Arc<FakeRewards>,
        utxos: Vec<Utxo>,
        fail_signing: bool,
    ) -> (TempDir, RedemptionWorkflow) {
        let temp = TempDir::new().unwrap();
        let custody = Arc::new(FakeCustody {
            fail_signing: AtomicBool::new(fail_signing),
        });
        let wf = RedemptionWorkflow::new(
            rewards,
            Arc::new(FakeChainData { utxos }),
            SigningMachine::with_poll_interval(custody, std::time::Duration::from_millis(1)),
            AuditStore::new(temp.path()),
        );
        (temp, wf)
    }

    #[test]
    fn window_derivation_is_half_open() {
        let phase = PhaseConfig {
            genesis_timestamp: 1_000,
            increment_period: 600,
            increment_count: 10,
        };
        let window = RedemptionWindow::from_phase(&phase);
        assert_eq!(window.start, 1_000);
        assert_eq!(window.end, 7_000);
        assert!(!window.is_open_at(999));
        assert!(window.is_open_at(1_000));
        assert!(window.is_open_at(6_999));
        assert!(!window.is_open_at(7_000));
    }

    #[tokio::test]
    async fn closed_window_fails_before_any_thaw_lookup() {
        let rewards = FakeRewards::new(closed_phase(), vec![redeemable_entry()]);
        let (_temp, wf) = workflow(Arc::clone(&rewards), vec![base_utxo(1, 5_000_000)], false);

        let err = wf.redeem(&handle(), &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, RedemptionError::WindowClosed { .. }));
        assert_eq!(rewards.thaw_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_redeemable_thaw_is_a_precondition_failure() {
        let rewards = FakeRewards::new(open_phase(), vec![locked_entry()]);
        let (_temp, wf) = workflow(rewards, vec![base_utxo(1, 5_000_000)], false);

        let err = wf.redeem(&handle(), &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, RedemptionError::NoRedeemableThaw { .. }));
    }

    #[tokio::test]
    async fn empty_address_has_no_funding_utxo() {
        let rewards = FakeRewards::new(open_phase(), vec![redeemable_entry()]);
        let (_temp, wf) = workflow(rewards, vec![], false);

        let err = wf.redeem(&handle(), &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, RedemptionError::NoFundingUtxo { .. }));
    }

    #[tokio::test]
    async fn funds_from_the_largest_base_utxo_and_submits_the_witness() {
        let rewards = FakeRewards::new(open_phase(), vec![redeemable_entry()]);
        let utxos = vec![
            base_utxo(1, 2_000_000),
            base_utxo(2, 9_000_000),
            base_utxo(3, 4_000_000),
        ];
        let (_temp, wf) = workflow(Arc::clone(&rewards), utxos, false);

        let submitted = wf.redeem(&handle(), &CancellationToken::new()).await.unwrap();
        assert_eq!(submitted.tx_hash, "cd".repeat(32));

        let built_with = rewards.built_with.lock().unwrap().clone().unwrap();
        assert!(built_with.starts_with(&format!("{:064x}", 2)));

        let witness = rewards.submitted_witness.lock().unwrap().clone().unwrap();
        assert_eq!(witness.vkey, "aa".repeat(32));
        assert_eq!(witness.signature, "ee".repeat(64));
    }

    #[tokio::test]
    async fn successful_redemption_writes_an_audit_record() {
        let rewards = FakeRewards::new(open_phase(), vec![redeemable_entry()]);
        let (temp, wf) = workflow(rewards, vec![base_utxo(1, 5_000_000)], false);

        wf.redeem(&handle(), &CancellationToken::new()).await.unwrap();

        let store = AuditStore::new(temp.path());
        let today = Utc::now().format("%Y-%m-%d").to_string();
        let events = store.read_events(&today).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, AuditEventType::RedemptionSubmitted);
        assert_eq!(events[0].vault_account_id.as_deref(), Some("va-1"));
    }

    #[tokio::test]
    async fn custody_rejection_surfaces_as_a_signing_step_failure() {
        let rewards = FakeRewards::new(open_phase(), vec![redeemable_entry()]);
        let (_temp, wf) = workflow(rewards, vec![base_utxo(1, 5_000_000)], true);

        let err = wf.redeem(&handle(), &CancellationToken::new()).await.unwrap_err();
        match err {
            RedemptionError::Signing { source, .. } => {
                assert!(matches!(source, SigningError::Terminal { .. }));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Operation orchestrator: one entry point per transaction type.
//!
//! Every operation follows the same shape: lease the vault account's
//! custody integration from the pool, run the chain-specific steps, and
//! let the lease drop back into the pool on every exit path. Signing runs
//! under a per-operation deadline; the custody service can legitimately
//! sit in `PendingAuthorization` until a human approves, and callers must
//! not hang with it.

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::chain::{
    select_and_plan, ChainData, SelectionTargets, TokenId, TxCodec, VkeyWitness,
};
use crate::config::Config;
use crate::custody::{
    format_signature, Chain, CustodySigner, IntegrationPool, PoolKey, PoolLease, PoolMetrics,
    SigningMachine, SigningOutcome, SigningRequest,
};
use crate::error::ApiError;
use crate::models::{SolveResponse, TransferResponse};
use crate::rewards::{
    AllocationProof, ClaimReceipt, ClaimRecord, ClaimsCache, DonationReceipt, PhaseConfig,
    RedemptionApi, RedemptionWorkflow, RegistrationReceipt, RewardsClient, SubmittedRedemption,
    ThawEntry, TransactionStatus,
};
use crate::storage::{AuditEvent, AuditEventType, AuditStore};

/// Claims-history cache sizing.
const CLAIMS_CACHE_CAPACITY: usize = 256;
const CLAIMS_CACHE_TTL: Duration = Duration::from_secs(300);

pub struct Orchestrator {
    pool: IntegrationPool,
    custody: Arc<dyn CustodySigner>,
    chain_data: Arc<dyn ChainData>,
    codec: Arc<dyn TxCodec>,
    rewards: Arc<RewardsClient>,
    signing: SigningMachine,
    redemption: RedemptionWorkflow,
    claims_cache: ClaimsCache,
    audit: AuditStore,

    token: TokenId,
    transfer_fee: u128,
    recipient_min: u128,
    change_min: u128,
    signing_timeout: Duration,
    mining_max_attempts: Option<u64>,

    shutdown: CancellationToken,
}

impl Orchestrator {
    pub fn new(
        config: &Config,
        custody: Arc<dyn CustodySigner>,
        chain_data: Arc<dyn ChainData>,
        codec: Arc<dyn TxCodec>,
        rewards: Arc<RewardsClient>,
    ) -> Self {
        let pool = IntegrationPool::with_limits(
            Arc::clone(&custody),
            config.pool_capacity,
            config.pool_idle_timeout,
            config.pool_sweep_interval,
        );
        let signing =
            SigningMachine::with_poll_interval(Arc::clone(&custody), config.signing_poll_interval);
        let audit = AuditStore::new(&config.data_dir);
        let redemption = RedemptionWorkflow::new(
            Arc::clone(&rewards) as Arc<dyn RedemptionApi>,
            Arc::clone(&chain_data),
            signing.clone(),
            audit.clone(),
        );

        Self {
            pool,
            custody,
            chain_data,
            codec,
            rewards,
            signing,
            redemption,
            claims_cache: ClaimsCache::new(CLAIMS_CACHE_CAPACITY, CLAIMS_CACHE_TTL),
            audit,
            token: config.token.clone(),
            transfer_fee: config.transfer_fee,
            recipient_min: config.recipient_min,
            change_min: config.change_min,
            signing_timeout: config.signing_timeout,
            mining_max_attempts: config.mining_max_attempts,
            shutdown: CancellationToken::new(),
        }
    }

    /// Spawn the pool's idle sweeper; runs until shutdown.
    pub fn start_background_tasks(&self) {
        tokio::spawn(self.pool.clone().run_sweeper(self.shutdown.clone()));
    }

    async fn lease(&self, vault_account_id: &str, chain: Chain) -> Result<PoolLease, ApiError> {
        Ok(self
            .pool
            .acquire(PoolKey::new(vault_account_id, chain))
            .await?)
    }

    /// Run one signing operation under the configured deadline.
    async fn sign_with_deadline(
        &self,
        request: &SigningRequest,
    ) -> Result<SigningOutcome, ApiError> {
        let cancel = self.shutdown.child_token();
        let watchdog_token = cancel.clone();
        let timeout = self.signing_timeout;
        let watchdog = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            watchdog_token.cancel();
        });
        let result = self.signing.sign(request, &cancel).await;
        watchdog.abort();
        Ok(result?)
    }

    fn log_audit(&self, event: AuditEvent) {
        if let Err(e) = self.audit.log(&event) {
            warn!(error = %e, "failed to write audit record");
        }
    }

    // ------------------------------------------------------------------
    // Claims
    // ------------------------------------------------------------------

    pub async fn check_allocation(
        &self,
        vault_account_id: &str,
        chain: Chain,
    ) -> Result<AllocationProof, ApiError> {
        let lease = self.lease(vault_account_id, chain).await?;
        Ok(self.rewards.allocation(&lease.primary_address).await?)
    }

    pub async fn claims_history(
        &self,
        vault_account_id: &str,
        chain: Chain,
    ) -> Result<Vec<ClaimRecord>, ApiError> {
        let lease = self.lease(vault_account_id, chain).await?;
        let address = lease.primary_address.clone();
        drop(lease);

        if let Some(cached) = self.claims_cache.get(&address) {
            return Ok(cached);
        }
        let records = self.rewards.claims_history(&address).await?;
        self.claims_cache.put(&address, records.clone());
        Ok(records)
    }

    /// Claim the outstanding allocation: prove address ownership with a
    /// custody signature, then submit.
    pub async fn make_claim(
        &self,
        vault_account_id: &str,
        chain: Chain,
    ) -> Result<ClaimReceipt, ApiError> {
        let lease = self.lease(vault_account_id, chain).await?;
        let address = lease.primary_address.clone();

        let allocation = self.rewards.allocation(&address).await?;
        if allocation.claimable == 0 {
            return Err(ApiError::new(
                StatusCode::PRECONDITION_FAILED,
                "claim_precondition",
                format!("nothing claimable for {address}"),
            ));
        }

        let message = format!("claim:{address}:{}", allocation.claimable);
        let request = lease.raw_request(&hex::encode(message.as_bytes()), "reward claim");
        let outcome = self.sign_with_deadline(&request).await?;
        let signature = format_signature(outcome.algorithm, chain, &outcome.signature)?;

        let receipt = self
            .rewards
            .submit_claim(&address, &signature, &outcome.public_key)
            .await?;
        self.claims_cache.invalidate(&address);

        info!(
            vault_account_id = %vault_account_id,
            chain = %chain,
            address = %address,
            claim_id = %receipt.claim_id,
            "claim submitted"
        );
        self.log_audit(
            AuditEvent::new(AuditEventType::ClaimSubmitted)
                .with_vault(vault_account_id, chain)
                .with_address(&address)
                .with_details(json!({
                    "claim_id": receipt.claim_id.clone(),
                    "amount": allocation.claimable.to_string(),
                })),
        );
        Ok(receipt)
    }

    // ------------------------------------------------------------------
    // Transfers
    // ------------------------------------------------------------------

    /// Transfer reward tokens to a destination address.
    pub async fn transfer(
        &self,
        vault_account_id: &str,
        chain: Chain,
        destination_address: &str,
        amount: u128,
    ) -> Result<TransferResponse, ApiError> {
        let lease = self.lease(vault_account_id, chain).await?;
        let address = lease.primary_address.clone();

        let utxos = self.chain_data.list_utxos(&address).await?;
        let targets = SelectionTargets {
            required_token: amount,
            fee: self.transfer_fee,
            recipient_min: self.recipient_min,
            change_min: self.change_min,
        };
        let unit = self.token.unit();
        let (selection, plan) = select_and_plan(&utxos, &unit, &targets)?;
        info!(
            vault_account_id = %vault_account_id,
            address = %address,
            inputs = selection.selected.len(),
            accumulated_base = %selection.accumulated_base,
            accumulated_token = %selection.accumulated_token,
            "transfer inputs selected"
        );

        let built = self
            .codec
            .build_transfer(&selection.selected, &plan, destination_address, &address, &unit)
            .await?;

        let request = lease.raw_request(&built.tx_id, "reward transfer");
        let outcome = self.sign_with_deadline(&request).await?;
        let witness = VkeyWitness::new(outcome.public_key, outcome.signature.full_sig);

        let tx_hash = self.codec.submit(&built.tx_body, &witness).await?;
        info!(
            vault_account_id = %vault_account_id,
            tx_hash = %tx_hash,
            "transfer submitted"
        );
        self.log_audit(
            AuditEvent::new(AuditEventType::TransferSubmitted)
                .with_vault(vault_account_id, chain)
                .with_address(&address)
                .with_details(json!({
                    "tx_hash": tx_hash.clone(),
                    "destination": destination_address,
                    "amount": amount.to_string(),
                    "inputs": selection.selected.len(),
                })),
        );

        Ok(TransferResponse {
            tx_hash,
            inputs: selection.selected.len(),
        })
    }

    pub async fn get_addresses(
        &self,
        vault_account_id: &str,
        chain: Chain,
    ) -> Result<Vec<String>, ApiError> {
        Ok(self
            .custody
            .get_addresses(vault_account_id, chain.asset_id())
            .await?)
    }

    // ------------------------------------------------------------------
    // Scavenger hunt
    // ------------------------------------------------------------------

    pub async fn scavenger_register(
        &self,
        vault_account_id: &str,
        chain: Chain,
    ) -> Result<RegistrationReceipt, ApiError> {
        let lease = self.lease(vault_account_id, chain).await?;
        let address = lease.primary_address.clone();

        let message = format!("register:{address}");
        let request = lease.raw_request(&hex::encode(message.as_bytes()), "hunt registration");
        let outcome = self.sign_with_deadline(&request).await?;
        let signature = format_signature(outcome.algorithm, chain, &outcome.signature)?;

        let receipt = self
            .rewards
            .register_address(&address, &signature, &outcome.public_key)
            .await?;
        self.log_audit(
            AuditEvent::new(AuditEventType::AddressRegistered)
                .with_vault(vault_account_id, chain)
                .with_address(&address),
        );
        Ok(receipt)
    }

    /// Fetch the current challenge, search for a nonce, submit it.
    pub async fn scavenger_solve(
        &self,
        vault_account_id: &str,
        max_attempts: Option<u64>,
    ) -> Result<SolveResponse, ApiError> {
        let lease = self.lease(vault_account_id, Chain::Cardano).await?;
        let address = lease.primary_address.clone();

        let challenge = self.rewards.challenge(&address).await?;
        let cap = max_attempts.or(self.mining_max_attempts);
        let cancel = self.shutdown.child_token();

        // CPU-bound search; keep it off the async workers.
        let solve_address = address.clone();
        let solve_challenge = challenge.clone();
        let solution = tokio::task::spawn_blocking(move || {
            let mut progress = |attempts: u64, rate: f64| {
                tracing::debug!(attempts, rate, "mining progress");
            };
            crate::rewards::solve(
                &solve_address,
                &solve_challenge,
                cap,
                &cancel,
                Some(&mut progress),
            )
        })
        .await
        .map_err(|e| ApiError::internal(format!("mining task failed: {e}")))??;

        self.log_audit(
            AuditEvent::new(AuditEventType::SolutionFound)
                .with_vault(vault_account_id, Chain::Cardano)
                .with_address(&address)
                .with_details(json!({
                    "challenge_id": challenge.challenge_id.clone(),
                    "nonce": solution.nonce.clone(),
                    "attempts": solution.attempts,
                })),
        );

        let receipt = self
            .rewards
            .submit_solution(&address, &challenge.challenge_id, &solution.nonce, &solution.hash)
            .await?;
        self.log_audit(
            AuditEvent::new(AuditEventType::SolutionSubmitted)
                .with_vault(vault_account_id, Chain::Cardano)
                .with_address(&address)
                .with_details(json!({
                    "challenge_id": challenge.challenge_id.clone(),
                    "accepted": receipt.accepted,
                })),
        );

        Ok(SolveResponse {
            nonce: solution.nonce,
            hash: solution.hash,
            attempts: solution.attempts,
            elapsed_ms: solution.elapsed.as_millis() as u64,
            accepted: receipt.accepted,
        })
    }

    pub async fn scavenger_donate(
        &self,
        vault_account_id: &str,
        amount: u128,
    ) -> Result<DonationReceipt, ApiError> {
        let lease = self.lease(vault_account_id, Chain::Cardano).await?;
        let address = lease.primary_address.clone();

        let receipt = self.rewards.donate(&address, amount).await?;
        self.log_audit(
            AuditEvent::new(AuditEventType::DonationSubmitted)
                .with_vault(vault_account_id, Chain::Cardano)
                .with_address(&address)
                .with_details(json!({ "amount": amount.to_string() })),
        );
        Ok(receipt)
    }

    // ------------------------------------------------------------------
    // Redemption
    // ------------------------------------------------------------------

    pub async fn phase_config(&self) -> Result<PhaseConfig, ApiError> {
        Ok(self.rewards.phase_config().await?)
    }

    pub async fn thaw_schedule(
        &self,
        vault_account_id: &str,
    ) -> Result<Vec<ThawEntry>, ApiError> {
        let lease = self.lease(vault_account_id, Chain::Cardano).await?;
        Ok(self.rewards.thaw_schedule(&lease.primary_address).await?)
    }

    pub async fn thaw_status(&self, tx_hash: &str) -> Result<TransactionStatus, ApiError> {
        Ok(self.rewards.transaction_status(tx_hash).await?)
    }

    pub async fn redeem(
        &self,
        vault_account_id: &str,
    ) -> Result<SubmittedRedemption, ApiError> {
        let lease = self.lease(vault_account_id, Chain::Cardano).await?;

        let cancel = self.shutdown.child_token();
        let watchdog_token = cancel.clone();
        let timeout = self.signing_timeout;
        let watchdog = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            watchdog_token.cancel();
        });
        let result = self.redemption.redeem(&lease, &cancel).await;
        watchdog.abort();
        Ok(result?)
    }

    // ------------------------------------------------------------------
    // Admin
    // ------------------------------------------------------------------

    pub fn pool_metrics(&self) -> PoolMetrics {
        self.pool.metrics()
    }

    /// Stop background tasks and drop all pooled integrations.
    pub fn shutdown(&self) {
        info!("orchestrator shutting down");
        self.shutdown.cancel();
        self.pool.clear();
    }
}

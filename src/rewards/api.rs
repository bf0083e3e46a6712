// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Rewards platform REST client.
//!
//! Thin wrappers over the claims, redemption, and scavenger-hunt
//! endpoints. Every non-200 response maps to [`RewardsApiError::Api`]
//! carrying the status code, the server's error type when it sends one,
//! and the raw payload for diagnostics.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use crate::chain::types::quantity;
use crate::chain::{Utxo, VkeyWitness};

use super::mining::MiningChallenge;

#[derive(Debug, thiserror::Error)]
pub enum RewardsApiError {
    #[error("rewards request failed: {0}")]
    Transport(String),

    #[error("rewards API returned {status} ({error_type}): {body}")]
    Api {
        status: u16,
        error_type: String,
        body: String,
    },

    #[error("rewards response was invalid: {0}")]
    InvalidResponse(String),
}

/// One historical claim for an address.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ClaimRecord {
    pub claim_id: String,
    pub address: String,
    #[serde(deserialize_with = "quantity::deserialize")]
    #[schema(value_type = String)]
    pub amount: u128,
    pub status: String,
    pub submitted_at: DateTime<Utc>,
}

/// Allocation proof for an address: what it may still claim.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AllocationProof {
    pub address: String,
    #[serde(deserialize_with = "quantity::deserialize")]
    #[schema(value_type = String)]
    pub total: u128,
    #[serde(deserialize_with = "quantity::deserialize")]
    #[schema(value_type = String)]
    pub claimed: u128,
    #[serde(deserialize_with = "quantity::deserialize")]
    #[schema(value_type = String)]
    pub claimable: u128,
}

/// Receipt for a submitted claim.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ClaimReceipt {
    pub claim_id: String,
    pub status: String,
}

/// Redemption phase configuration; the window derives from these.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
pub struct PhaseConfig {
    /// Unix seconds at which the phase opened.
    pub genesis_timestamp: i64,
    /// Seconds per increment.
    pub increment_period: i64,
    /// Number of increments in the window.
    pub increment_count: i64,
}

/// Thaw state of one previously locked allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ThawStatus {
    Locked,
    Thawing,
    Redeemable,
    Redeemed,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ThawEntry {
    #[serde(deserialize_with = "quantity::deserialize")]
    #[schema(value_type = String)]
    pub amount: u128,
    pub status: ThawStatus,
    pub thaws_at: DateTime<Utc>,
}

/// Unsigned redemption transaction from the build endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct BuiltRedemption {
    /// CBOR-serialized transaction body, hex.
    pub tx_body: String,
    /// Transaction id to sign, hex.
    pub tx_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubmittedRedemption {
    pub tx_hash: String,
}

/// On-chain status of a previously submitted transaction.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransactionStatus {
    pub tx_hash: String,
    pub status: String,
    #[serde(default)]
    pub confirmations: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SolutionReceipt {
    pub accepted: bool,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegistrationReceipt {
    pub address: String,
    pub registered: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DonationReceipt {
    pub accepted: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// The subset of the rewards API the redemption workflow depends on.
#[async_trait]
pub trait RedemptionApi: Send + Sync {
    async fn phase_config(&self) -> Result<PhaseConfig, RewardsApiError>;

    async fn thaw_schedule(&self, address: &str) -> Result<Vec<ThawEntry>, RewardsApiError>;

    async fn build_redemption(
        &self,
        address: &str,
        funding: &Utxo,
    ) -> Result<BuiltRedemption, RewardsApiError>;

    async fn submit_redemption(
        &self,
        tx_body: &str,
        witness: &VkeyWitness,
    ) -> Result<SubmittedRedemption, RewardsApiError>;
}

/// HTTP client for the rewards platform.
#[derive(Debug, Clone)]
pub struct RewardsClient {
    base_url: String,
    http: Client,
}

impl RewardsClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, RewardsApiError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| RewardsApiError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, RewardsApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let error_type = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| {
                    v.get("error_type")
                        .or_else(|| v.get("error"))
                        .and_then(|e| e.as_str())
                        .map(str::to_string)
                })
                .unwrap_or_else(|| "unknown".to_string());
            return Err(RewardsApiError::Api {
                status: status.as_u16(),
                error_type,
                body,
            });
        }
        response
            .json::<T>()
            .await
            .map_err(|e| RewardsApiError::InvalidResponse(e.to_string()))
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, RewardsApiError> {
        let response = self
            .http
            .get(format!("{}{path}", self.base_url))
            .send()
            .await
            .map_err(|e| RewardsApiError::Transport(e.to_string()))?;
        Self::decode(response).await
    }

    async fn post<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        payload: &serde_json::Value,
    ) -> Result<T, RewardsApiError> {
        let response = self
            .http
            .post(format!("{}{path}", self.base_url))
            .json(payload)
            .send()
            .await
            .map_err(|e| RewardsApiError::Transport(e.to_string()))?;
        Self::decode(response).await
    }

    pub async fn claims_history(&self, address: &str) -> Result<Vec<ClaimRecord>, RewardsApiError> {
        self.get(&format!("/claims/{address}/history")).await
    }

    pub async fn allocation(&self, address: &str) -> Result<AllocationProof, RewardsApiError> {
        self.get(&format!("/claims/{address}/allocation")).await
    }

    pub async fn submit_claim(
        &self,
        address: &str,
        signature: &str,
        public_key: &str,
    ) -> Result<ClaimReceipt, RewardsApiError> {
        self.post(
            "/claims",
            &json!({
                "address": address,
                "signature": signature,
                "public_key": public_key,
            }),
        )
        .await
    }

    pub async fn transaction_status(
        &self,
        tx_hash: &str,
    ) -> Result<TransactionStatus, RewardsApiError> {
        self.get(&format!("/transactions/{tx_hash}/status")).await
    }

    pub async fn challenge(&self, address: &str) -> Result<MiningChallenge, RewardsApiError> {
        self.get(&format!("/scavenger/challenge?address={address}")).await
    }

    pub async fn submit_solution(
        &self,
        address: &str,
        challenge_id: &str,
        nonce: &str,
        hash: &str,
    ) -> Result<SolutionReceipt, RewardsApiError> {
        self.post(
            "/scavenger/solutions",
            &json!({
                "address": address,
                "challenge_id": challenge_id,
                "nonce": nonce,
                "hash": hash,
            }),
        )
        .await
    }

    pub async fn register_address(
        &self,
        address: &str,
        signature: &str,
        public_key: &str,
    ) -> Result<RegistrationReceipt, RewardsApiError> {
        self.post(
            "/scavenger/register",
            &json!({
                "address": address,
                "signature": signature,
                "public_key": public_key,
            }),
        )
        .await
    }

    pub async fn donate(&self, address: &str, amount: u128) -> Result<DonationReceipt, RewardsApiError> {
        self.post(
            "/scavenger/donate",
            &json!({
                "address": address,
                "amount": amount.to_string(),
            }),
        )
        .await
    }
}

#[async_trait]
impl RedemptionApi for RewardsClient {
    async fn phase_config(&self) -> Result<PhaseConfig, RewardsApiError> {
        self.get("/redemption/phase").await
    }

    async fn thaw_schedule(&self, address: &str) -> Result<Vec<ThawEntry>, RewardsApiError> {
        self.get(&format!("/redemption/{address}/thaw-schedule")).await
    }

    async fn build_redemption(
        &self,
        address: &str,
        funding: &Utxo,
    ) -> Result<BuiltRedemption, RewardsApiError> {
        self.post(
            "/redemption/build",
            &json!({
                "address": address,
                "funding_utxo": {
                    "tx_hash": funding.tx_hash,
                    "output_index": funding.output_index,
                },
            }),
        )
        .await
    }

    async fn submit_redemption(
        &self,
        tx_body: &str,
        witness: &VkeyWitness,
    ) -> Result<SubmittedRedemption, RewardsApiError> {
        self.post(
            "/redemption/submit",
            &json!({
                "tx_body": tx_body,
                "witness": witness,
            }),
        )
        .await
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transaction construction and submission seam.
//!
//! Serialization, fee balancing, and transaction-id computation live in a
//! construction sidecar service; this module only moves bytes to and from
//! it. The witness wrapper is the one piece owned here: a raw custody
//! signature plus the signing key, attached verbatim to the built body.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::selection::TransferPlan;
use super::types::Utxo;

/// A verification-key witness: public key and signature, both hex.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VkeyWitness {
    pub vkey: String,
    pub signature: String,
}

impl VkeyWitness {
    pub fn new(vkey: impl Into<String>, signature: impl Into<String>) -> Self {
        Self {
            vkey: vkey.into(),
            signature: signature.into(),
        }
    }
}

/// An unsigned transaction as returned by the construction service.
#[derive(Debug, Clone, Deserialize)]
pub struct BuiltTransaction {
    /// CBOR-serialized transaction body, hex.
    pub tx_body: String,
    /// Transaction id to be signed, hex.
    pub tx_id: String,
}

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("transaction build failed: {0}")]
    Build(String),

    #[error("transaction submit failed: {0}")]
    Submit(String),

    #[error("construction service returned {status}: {body}")]
    Api { status: u16, body: String },
}

/// Builds, assembles, and submits transactions.
#[async_trait]
pub trait TxCodec: Send + Sync {
    /// Build an unsigned transfer from selected inputs and planned outputs.
    async fn build_transfer(
        &self,
        inputs: &[Utxo],
        plan: &TransferPlan,
        recipient_address: &str,
        change_address: &str,
        token_unit: &str,
    ) -> Result<BuiltTransaction, CodecError>;

    /// Attach the witness set and submit; returns the on-chain tx hash.
    async fn submit(&self, tx_body: &str, witness: &VkeyWitness) -> Result<String, CodecError>;
}

/// HTTP client for the transaction construction sidecar.
#[derive(Debug, Clone)]
pub struct TxCodecClient {
    base_url: String,
    http: Client,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    tx_hash: String,
}

impl TxCodecClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, CodecError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| CodecError::Build(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    async fn post_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        payload: &serde_json::Value,
    ) -> Result<T, CodecError> {
        let response = self
            .http
            .post(format!("{}{path}", self.base_url))
            .json(payload)
            .send()
            .await
            .map_err(|e| CodecError::Submit(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CodecError::Api {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| CodecError::Build(format!("invalid response: {e}")))
    }
}

#[async_trait]
impl TxCodec for TxCodecClient {
    async fn build_transfer(
        &self,
        inputs: &[Utxo],
        plan: &TransferPlan,
        recipient_address: &str,
        change_address: &str,
        token_unit: &str,
    ) -> Result<BuiltTransaction, CodecError> {
        let outputs = [
            (recipient_address, &plan.recipient),
            (change_address, &plan.change),
        ]
        .into_iter()
        .map(|(address, output)| {
            let mut value = json!({ "lovelace": output.base_asset.to_string() });
            if let Some(token) = output.token {
                value[token_unit] = json!(token.to_string());
            }
            json!({ "address": address, "value": value })
        })
        .collect::<Vec<_>>();

        let payload = json!({
            "inputs": inputs
                .iter()
                .map(|u| json!({ "tx_hash": u.tx_hash, "output_index": u.output_index }))
                .collect::<Vec<_>>(),
            "outputs": outputs,
        });

        self.post_json("/transactions/build", &payload).await
    }

    async fn submit(&self, tx_body: &str, witness: &VkeyWitness) -> Result<String, CodecError> {
        let payload = json!({
            "tx_body": tx_body,
            "witnesses": [witness],
        });
        let response: SubmitResponse = self.post_json("/transactions/submit", &payload).await?;
        Ok(response.tx_hash)
    }
}

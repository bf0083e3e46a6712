// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Read-only on-chain data provider client.
//!
//! Wraps the provider's REST API (UTXO listing and chain tip). Responses
//! carry quantities as decimal strings; parsing into `u128` happens in the
//! deserializers on [`Utxo`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::types::Utxo;

/// Source of on-chain data for selection and submission flows.
#[async_trait]
pub trait ChainData: Send + Sync {
    /// All unspent outputs currently held at `address`.
    async fn list_utxos(&self, address: &str) -> Result<Vec<Utxo>, ChainDataError>;

    /// Slot number of the latest known block.
    async fn latest_slot(&self) -> Result<u64, ChainDataError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ChainDataError {
    #[error("chain data request failed: {0}")]
    Transport(String),

    #[error("chain data provider returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("chain data response was invalid: {0}")]
    InvalidResponse(String),
}

/// HTTP client for the on-chain data provider.
#[derive(Debug, Clone)]
pub struct ChainDataClient {
    base_url: String,
    project_id: String,
    http: Client,
}

#[derive(Debug, Deserialize)]
struct LatestBlock {
    slot: u64,
}

impl ChainDataClient {
    pub fn new(base_url: impl Into<String>, project_id: impl Into<String>) -> Result<Self, ChainDataError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| ChainDataError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            project_id: project_id.into(),
            http,
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, ChainDataError> {
        let response = self
            .http
            .get(format!("{}{path}", self.base_url))
            .header("project_id", &self.project_id)
            .send()
            .await
            .map_err(|e| ChainDataError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChainDataError::Api {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ChainDataError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl ChainData for ChainDataClient {
    async fn list_utxos(&self, address: &str) -> Result<Vec<Utxo>, ChainDataError> {
        let mut utxos: Vec<Utxo> = self
            .get_json(&format!("/addresses/{address}/utxos"))
            .await?;
        // Provider omits the owning address on this endpoint.
        for utxo in &mut utxos {
            if utxo.address.is_empty() {
                utxo.address = address.to_string();
            }
        }
        Ok(utxos)
    }

    async fn latest_slot(&self) -> Result<u64, ChainDataError> {
        let block: LatestBlock = self.get_json("/blocks/latest").await?;
        Ok(block.slot)
    }
}

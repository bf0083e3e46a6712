// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP client for the custody service.
//!
//! Every request carries a short-lived RS256 JWT signed with the API
//! secret; the claims bind the request path and a SHA-256 hash of the
//! body, so a captured token cannot be replayed against another endpoint.

use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::Serialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::types::{OperationState, SigningRequest};

/// Token lifetime; the custody API rejects anything longer than 30 s.
const TOKEN_TTL_SECS: i64 = 25;

#[derive(Debug, thiserror::Error)]
pub enum CustodyError {
    #[error("custody configuration missing: {0}")]
    MissingConfig(String),

    #[error("custody request signing failed: {0}")]
    Signing(String),

    #[error("custody request failed: {0}")]
    Transport(String),

    #[error("custody service returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("custody response was invalid: {0}")]
    InvalidResponse(String),

    #[error("vault account {vault_account_id} has no address for asset {asset_id}")]
    NoAddress {
        vault_account_id: String,
        asset_id: String,
    },
}

/// Asynchronous signer boundary. Private keys never cross it.
#[async_trait]
pub trait CustodySigner: Send + Sync {
    /// Submit a signing request; returns the custody operation id.
    async fn create_signing_operation(&self, request: &SigningRequest)
        -> Result<String, CustodyError>;

    /// Current state of a previously created operation.
    async fn get_operation_status(&self, operation_id: &str)
        -> Result<OperationState, CustodyError>;

    /// Primary deposit address of a vault account for an asset.
    async fn get_address(
        &self,
        vault_account_id: &str,
        asset_id: &str,
    ) -> Result<String, CustodyError>;

    /// All deposit addresses of a vault account for an asset.
    async fn get_addresses(
        &self,
        vault_account_id: &str,
        asset_id: &str,
    ) -> Result<Vec<String>, CustodyError>;
}

#[derive(Debug, Serialize)]
struct TokenClaims<'a> {
    uri: &'a str,
    nonce: String,
    iat: i64,
    exp: i64,
    sub: &'a str,
    #[serde(rename = "bodyHash")]
    body_hash: String,
}

#[derive(Debug, serde::Deserialize)]
struct CreatedOperation {
    id: String,
}

#[derive(Debug, serde::Deserialize)]
struct VaultAddress {
    address: String,
}

/// Custody service HTTP client.
pub struct CustodyClient {
    base_url: String,
    api_key: String,
    signing_key: EncodingKey,
    http: Client,
}

impl CustodyClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        secret_pem: &[u8],
    ) -> Result<Self, CustodyError> {
        let signing_key = EncodingKey::from_rsa_pem(secret_pem)
            .map_err(|e| CustodyError::MissingConfig(format!("invalid API secret key: {e}")))?;
        let http = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| CustodyError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            signing_key,
            http,
        })
    }

    fn bearer_token(&self, uri: &str, body: &str) -> Result<String, CustodyError> {
        let now = chrono::Utc::now().timestamp();
        let claims = TokenClaims {
            uri,
            nonce: Uuid::new_v4().to_string(),
            iat: now,
            exp: now + TOKEN_TTL_SECS,
            sub: &self.api_key,
            body_hash: hex::encode(Sha256::digest(body.as_bytes())),
        };
        encode(&Header::new(Algorithm::RS256), &claims, &self.signing_key)
            .map_err(|e| CustodyError::Signing(e.to_string()))
    }

    async fn request_json<T: serde::de::DeserializeOwned>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<T, CustodyError> {
        let body_text = body
            .as_ref()
            .map(|b| b.to_string())
            .unwrap_or_default();
        let token = self.bearer_token(path, &body_text)?;

        let mut request = self
            .http
            .request(method, format!("{}{path}", self.base_url))
            .header("X-API-Key", &self.api_key)
            .bearer_auth(token);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| CustodyError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CustodyError::Api {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| CustodyError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl CustodySigner for CustodyClient {
    async fn create_signing_operation(
        &self,
        request: &SigningRequest,
    ) -> Result<String, CustodyError> {
        let payload = json!({
            "assetId": request.asset_id,
            "operation": request.operation,
            "source": { "type": "VAULT_ACCOUNT", "id": request.source_vault_id },
            "note": request.note,
            "extraParameters": {
                "rawMessageData": {
                    "messages": [{
                        "content": request.content,
                        "bip44addressIndex": 0,
                        "derivationPath": request.derivation_path,
                    }]
                }
            }
        });
        let created: CreatedOperation = self
            .request_json(reqwest::Method::POST, "/v1/transactions", Some(payload))
            .await?;
        Ok(created.id)
    }

    async fn get_operation_status(
        &self,
        operation_id: &str,
    ) -> Result<OperationState, CustodyError> {
        self.request_json(
            reqwest::Method::GET,
            &format!("/v1/transactions/{operation_id}"),
            None,
        )
        .await
    }

    async fn get_address(
        &self,
        vault_account_id: &str,
        asset_id: &str,
    ) -> Result<String, CustodyError> {
        self.get_addresses(vault_account_id, asset_id)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| CustodyError::NoAddress {
                vault_account_id: vault_account_id.to_string(),
                asset_id: asset_id.to_string(),
            })
    }

    async fn get_addresses(
        &self,
        vault_account_id: &str,
        asset_id: &str,
    ) -> Result<Vec<String>, CustodyError> {
        let addresses: Vec<VaultAddress> = self
            .request_json(
                reqwest::Method::GET,
                &format!("/v1/vault/accounts/{vault_account_id}/{asset_id}/addresses"),
                None,
            )
            .await?;
        Ok(addresses.into_iter().map(|a| a.address).collect())
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Claim endpoints: allocation lookup, history, and claim submission.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    custody::Chain,
    error::ApiError,
    models::ClaimRequest,
    rewards::{AllocationProof, ClaimReceipt, ClaimRecord},
    state::AppState,
};

/// Query parameters selecting the target chain.
#[derive(Debug, Deserialize, IntoParams)]
pub struct ChainQuery {
    /// Target chain (defaults to cardano).
    pub chain: Option<Chain>,
}

impl ChainQuery {
    pub fn chain(&self) -> Chain {
        self.chain.unwrap_or(Chain::Cardano)
    }
}

/// Check the outstanding allocation for a vault account.
#[utoipa::path(
    get,
    path = "/v1/vaults/{vault_account_id}/allocation",
    tag = "Claims",
    params(
        ("vault_account_id" = String, Path, description = "Vault account ID"),
        ChainQuery
    ),
    responses(
        (status = 200, description = "Allocation retrieved", body = AllocationProof),
        (status = 502, description = "Upstream failure"),
        (status = 503, description = "Pool at capacity")
    )
)]
pub async fn check_allocation(
    State(state): State<AppState>,
    Path(vault_account_id): Path<String>,
    Query(query): Query<ChainQuery>,
) -> Result<Json<AllocationProof>, ApiError> {
    let allocation = state
        .orchestrator
        .check_allocation(&vault_account_id, query.chain())
        .await?;
    Ok(Json(allocation))
}

/// List past claims for a vault account's address.
#[utoipa::path(
    get,
    path = "/v1/vaults/{vault_account_id}/claims",
    tag = "Claims",
    params(
        ("vault_account_id" = String, Path, description = "Vault account ID"),
        ChainQuery
    ),
    responses(
        (status = 200, description = "Claims history retrieved", body = [ClaimRecord]),
        (status = 502, description = "Upstream failure")
    )
)]
pub async fn claims_history(
    State(state): State<AppState>,
    Path(vault_account_id): Path<String>,
    Query(query): Query<ChainQuery>,
) -> Result<Json<Vec<ClaimRecord>>, ApiError> {
    let records = state
        .orchestrator
        .claims_history(&vault_account_id, query.chain())
        .await?;
    Ok(Json(records))
}

/// Claim the outstanding allocation.
#[utoipa::path(
    post,
    path = "/v1/claims",
    tag = "Claims",
    request_body = ClaimRequest,
    responses(
        (status = 200, description = "Claim submitted", body = ClaimReceipt),
        (status = 412, description = "Nothing claimable"),
        (status = 502, description = "Custody or upstream failure")
    )
)]
pub async fn make_claim(
    State(state): State<AppState>,
    Json(request): Json<ClaimRequest>,
) -> Result<Json<ClaimReceipt>, ApiError> {
    let receipt = state
        .orchestrator
        .make_claim(&request.vault_account_id, request.chain)
        .await?;
    Ok(Json(receipt))
}

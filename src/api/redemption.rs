// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Redemption endpoints: phase window, thaw schedule, and redemption.

use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    error::ApiError,
    models::RedeemRequest,
    rewards::{PhaseConfig, SubmittedRedemption, ThawEntry, TransactionStatus},
    state::AppState,
};

/// Current redemption phase configuration.
#[utoipa::path(
    get,
    path = "/v1/redemption/phase",
    tag = "Redemption",
    responses(
        (status = 200, description = "Phase configuration", body = PhaseConfig),
        (status = 502, description = "Upstream failure")
    )
)]
pub async fn phase_config(
    State(state): State<AppState>,
) -> Result<Json<PhaseConfig>, ApiError> {
    Ok(Json(state.orchestrator.phase_config().await?))
}

/// Thaw schedule for a vault account's address.
#[utoipa::path(
    get,
    path = "/v1/vaults/{vault_account_id}/thaw-schedule",
    tag = "Redemption",
    params(("vault_account_id" = String, Path, description = "Vault account ID")),
    responses(
        (status = 200, description = "Thaw schedule", body = [ThawEntry]),
        (status = 502, description = "Upstream failure")
    )
)]
pub async fn thaw_schedule(
    State(state): State<AppState>,
    Path(vault_account_id): Path<String>,
) -> Result<Json<Vec<ThawEntry>>, ApiError> {
    Ok(Json(state.orchestrator.thaw_schedule(&vault_account_id).await?))
}

/// Status of a previously submitted redemption transaction.
#[utoipa::path(
    get,
    path = "/v1/redemption/status/{tx_hash}",
    tag = "Redemption",
    params(("tx_hash" = String, Path, description = "Transaction hash")),
    responses(
        (status = 200, description = "Transaction status", body = TransactionStatus),
        (status = 502, description = "Upstream failure")
    )
)]
pub async fn thaw_status(
    State(state): State<AppState>,
    Path(tx_hash): Path<String>,
) -> Result<Json<TransactionStatus>, ApiError> {
    Ok(Json(state.orchestrator.thaw_status(&tx_hash).await?))
}

/// Redeem the thawed allocation for a vault account.
#[utoipa::path(
    post,
    path = "/v1/redemption/redeem",
    tag = "Redemption",
    request_body = RedeemRequest,
    responses(
        (status = 200, description = "Redemption submitted", body = SubmittedRedemption),
        (status = 412, description = "Window closed or nothing redeemable"),
        (status = 502, description = "Custody or upstream failure")
    )
)]
pub async fn redeem(
    State(state): State<AppState>,
    Json(request): Json<RedeemRequest>,
) -> Result<Json<SubmittedRedemption>, ApiError> {
    Ok(Json(
        state.orchestrator.redeem(&request.vault_account_id).await?,
    ))
}

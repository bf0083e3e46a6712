// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Scavenger-hunt endpoints: registration, mining, donation.

use axum::{extract::State, Json};

use crate::{
    error::ApiError,
    models::{parse_amount, DonateRequest, RegisterRequest, SolveRequest, SolveResponse},
    rewards::{DonationReceipt, RegistrationReceipt},
    state::AppState,
};

/// Register a vault account's address for the scavenger hunt.
#[utoipa::path(
    post,
    path = "/v1/scavenger/register",
    tag = "Scavenger",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Address registered", body = RegistrationReceipt),
        (status = 502, description = "Custody or upstream failure")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<RegistrationReceipt>, ApiError> {
    let receipt = state
        .orchestrator
        .scavenger_register(&request.vault_account_id, request.chain)
        .await?;
    Ok(Json(receipt))
}

/// Solve the current mining challenge and submit the nonce.
#[utoipa::path(
    post,
    path = "/v1/scavenger/solve",
    tag = "Scavenger",
    request_body = SolveRequest,
    responses(
        (status = 200, description = "Solution found and submitted", body = SolveResponse),
        (status = 422, description = "Attempt cap exhausted"),
        (status = 502, description = "Upstream failure")
    )
)]
pub async fn solve(
    State(state): State<AppState>,
    Json(request): Json<SolveRequest>,
) -> Result<Json<SolveResponse>, ApiError> {
    let response = state
        .orchestrator
        .scavenger_solve(&request.vault_account_id, request.max_attempts)
        .await?;
    Ok(Json(response))
}

/// Donate reward tokens to the community pot.
#[utoipa::path(
    post,
    path = "/v1/scavenger/donate",
    tag = "Scavenger",
    request_body = DonateRequest,
    responses(
        (status = 200, description = "Donation submitted", body = DonationReceipt),
        (status = 502, description = "Upstream failure")
    )
)]
pub async fn donate(
    State(state): State<AppState>,
    Json(request): Json<DonateRequest>,
) -> Result<Json<DonationReceipt>, ApiError> {
    let amount = parse_amount(&request.amount).map_err(ApiError::bad_request)?;
    let receipt = state
        .orchestrator
        .scavenger_donate(&request.vault_account_id, amount)
        .await?;
    Ok(Json(receipt))
}

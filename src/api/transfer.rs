// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transfer and address endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::{
    error::ApiError,
    models::{parse_amount, AddressesResponse, TransferRequest, TransferResponse},
    state::AppState,
};

use super::claims::ChainQuery;

/// Transfer reward tokens from a vault account to a destination address.
#[utoipa::path(
    post,
    path = "/v1/transfers",
    tag = "Transfers",
    request_body = TransferRequest,
    responses(
        (status = 200, description = "Transfer submitted", body = TransferResponse),
        (status = 422, description = "Insufficient funds"),
        (status = 502, description = "Custody or upstream failure"),
        (status = 503, description = "Pool at capacity")
    )
)]
pub async fn transfer(
    State(state): State<AppState>,
    Json(request): Json<TransferRequest>,
) -> Result<Json<TransferResponse>, ApiError> {
    let amount = parse_amount(&request.amount).map_err(ApiError::bad_request)?;
    let response = state
        .orchestrator
        .transfer(
            &request.vault_account_id,
            request.chain,
            &request.destination_address,
            amount,
        )
        .await?;
    Ok(Json(response))
}

/// List the custody deposit addresses of a vault account.
#[utoipa::path(
    get,
    path = "/v1/vaults/{vault_account_id}/addresses",
    tag = "Transfers",
    params(
        ("vault_account_id" = String, Path, description = "Vault account ID"),
        ChainQuery
    ),
    responses(
        (status = 200, description = "Addresses retrieved", body = AddressesResponse),
        (status = 502, description = "Custody failure")
    )
)]
pub async fn get_addresses(
    State(state): State<AppState>,
    Path(vault_account_id): Path<String>,
    Query(query): Query<ChainQuery>,
) -> Result<Json<AddressesResponse>, ApiError> {
    let chain = query.chain();
    let addresses = state
        .orchestrator
        .get_addresses(&vault_account_id, chain)
        .await?;
    Ok(Json(AddressesResponse {
        vault_account_id,
        chain,
        addresses,
    }))
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    custody::PoolMetrics,
    models::{
        AddressesResponse, ClaimRequest, DonateRequest, RedeemRequest, RegisterRequest,
        SolveRequest, SolveResponse, TransferRequest, TransferResponse,
    },
    rewards::{
        AllocationProof, ClaimReceipt, ClaimRecord, DonationReceipt, PhaseConfig,
        RegistrationReceipt, SubmittedRedemption, ThawEntry, TransactionStatus,
    },
    state::AppState,
};

pub mod admin;
pub mod claims;
pub mod health;
pub mod redemption;
pub mod scavenger;
pub mod transfer;

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/health", get(health::health))
        .route(
            "/vaults/{vault_account_id}/allocation",
            get(claims::check_allocation),
        )
        .route(
            "/vaults/{vault_account_id}/claims",
            get(claims::claims_history),
        )
        .route("/claims", post(claims::make_claim))
        .route("/transfers", post(transfer::transfer))
        .route(
            "/vaults/{vault_account_id}/addresses",
            get(transfer::get_addresses),
        )
        .route("/scavenger/register", post(scavenger::register))
        .route("/scavenger/solve", post(scavenger::solve))
        .route("/scavenger/donate", post(scavenger::donate))
        .route("/redemption/phase", get(redemption::phase_config))
        .route(
            "/vaults/{vault_account_id}/thaw-schedule",
            get(redemption::thaw_schedule),
        )
        .route("/redemption/status/{tx_hash}", get(redemption::thaw_status))
        .route("/redemption/redeem", post(redemption::redeem))
        .route("/admin/pool", get(admin::pool_metrics))
        .route("/admin/shutdown", post(admin::shutdown))
        .with_state(state);

    Router::new()
        .nest("/v1", v1_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        claims::check_allocation,
        claims::claims_history,
        claims::make_claim,
        transfer::transfer,
        transfer::get_addresses,
        scavenger::register,
        scavenger::solve,
        scavenger::donate,
        redemption::phase_config,
        redemption::thaw_schedule,
        redemption::thaw_status,
        redemption::redeem,
        admin::pool_metrics,
        admin::shutdown
    ),
    components(
        schemas(
            TransferRequest,
            TransferResponse,
            ClaimRequest,
            RedeemRequest,
            RegisterRequest,
            SolveRequest,
            SolveResponse,
            DonateRequest,
            AddressesResponse,
            AllocationProof,
            ClaimReceipt,
            ClaimRecord,
            DonationReceipt,
            PhaseConfig,
            RegistrationReceipt,
            SubmittedRedemption,
            ThawEntry,
            TransactionStatus,
            PoolMetrics,
            health::HealthResponse,
            admin::ShutdownResponse
        )
    ),
    tags(
        (name = "Health", description = "Liveness"),
        (name = "Claims", description = "Allocation lookup and claims"),
        (name = "Transfers", description = "Token transfers and addresses"),
        (name = "Scavenger", description = "Scavenger-hunt registration and mining"),
        (name = "Redemption", description = "Thaw schedule and redemption"),
        (name = "Admin", description = "Pool metrics and shutdown")
    )
)]
struct ApiDoc;

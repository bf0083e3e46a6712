// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Administrative endpoints: pool metrics and shutdown.

use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{custody::PoolMetrics, state::AppState};

#[derive(Debug, Serialize, ToSchema)]
pub struct ShutdownResponse {
    pub stopped: bool,
}

/// Current pool occupancy.
#[utoipa::path(
    get,
    path = "/v1/admin/pool",
    tag = "Admin",
    responses((status = 200, description = "Pool metrics", body = PoolMetrics))
)]
pub async fn pool_metrics(State(state): State<AppState>) -> Json<PoolMetrics> {
    Json(state.orchestrator.pool_metrics())
}

/// Stop background tasks and clear the pool.
#[utoipa::path(
    post,
    path = "/v1/admin/shutdown",
    tag = "Admin",
    responses((status = 200, description = "Shutdown initiated", body = ShutdownResponse))
)]
pub async fn shutdown(State(state): State<AppState>) -> Json<ShutdownResponse> {
    state.orchestrator.shutdown();
    Json(ShutdownResponse { stopped: true })
}

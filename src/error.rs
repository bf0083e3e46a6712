// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP-facing error type and the mapping from domain errors.
//!
//! The taxonomy, by status: configuration problems are 500s and fatal;
//! capacity exhaustion is a retryable 503; custody terminal failures and
//! upstream transport problems are 502s; insufficient funds is a 422 that
//! never partially executes; window/eligibility preconditions are 412s,
//! distinct from transient faults. Unknown errors fall through to 500.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::chain::{ChainDataError, CodecError, SelectionError};
use crate::custody::{CustodyError, PoolError, SignatureError, SigningError};
use crate::rewards::{MiningError, RedemptionError, RewardsApiError};

/// Service name reported in every error body.
pub const SERVICE_NAME: &str = "reward-vault-server";

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error_type: &'static str,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    error_type: &'static str,
    service: &'static str,
}

impl ApiError {
    pub fn new(status: StatusCode, error_type: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            error_type,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "bad_request", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
            error_type: self.error_type,
            service: SERVICE_NAME,
        });
        (self.status, body).into_response()
    }
}

impl From<PoolError> for ApiError {
    fn from(err: PoolError) -> Self {
        match &err {
            PoolError::Busy { .. } | PoolError::Capacity { .. } => {
                Self::new(StatusCode::SERVICE_UNAVAILABLE, "pool_capacity", err.to_string())
            }
            PoolError::Construction { .. } => {
                Self::new(StatusCode::BAD_GATEWAY, "custody", err.to_string())
            }
        }
    }
}

impl From<SigningError> for ApiError {
    fn from(err: SigningError) -> Self {
        match &err {
            SigningError::Terminal { .. } | SigningError::SignatureMissing { .. } => {
                Self::new(StatusCode::BAD_GATEWAY, "signing_failed", err.to_string())
            }
            SigningError::Cancelled { .. } => {
                Self::new(StatusCode::GATEWAY_TIMEOUT, "signing_timeout", err.to_string())
            }
            SigningError::Custody(_) => {
                Self::new(StatusCode::BAD_GATEWAY, "custody", err.to_string())
            }
        }
    }
}

impl From<SelectionError> for ApiError {
    fn from(err: SelectionError) -> Self {
        Self::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            "insufficient_funds",
            err.to_string(),
        )
    }
}

impl From<RedemptionError> for ApiError {
    fn from(err: RedemptionError) -> Self {
        match &err {
            RedemptionError::WindowClosed { .. }
            | RedemptionError::NoRedeemableThaw { .. }
            | RedemptionError::NoFundingUtxo { .. } => Self::new(
                StatusCode::PRECONDITION_FAILED,
                "redemption_precondition",
                err.to_string(),
            ),
            RedemptionError::Signing { source, .. } => match source {
                SigningError::Cancelled { .. } => Self::new(
                    StatusCode::GATEWAY_TIMEOUT,
                    "signing_timeout",
                    err.to_string(),
                ),
                _ => Self::new(StatusCode::BAD_GATEWAY, "signing_failed", err.to_string()),
            },
            _ => Self::new(StatusCode::BAD_GATEWAY, "redemption_upstream", err.to_string()),
        }
    }
}

impl From<RewardsApiError> for ApiError {
    fn from(err: RewardsApiError) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, "rewards_api", err.to_string())
    }
}

impl From<ChainDataError> for ApiError {
    fn from(err: ChainDataError) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, "chain_data", err.to_string())
    }
}

impl From<CodecError> for ApiError {
    fn from(err: CodecError) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, "tx_codec", err.to_string())
    }
}

impl From<CustodyError> for ApiError {
    fn from(err: CustodyError) -> Self {
        match &err {
            CustodyError::MissingConfig(_) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "configuration",
                err.to_string(),
            ),
            _ => Self::new(StatusCode::BAD_GATEWAY, "custody", err.to_string()),
        }
    }
}

impl From<SignatureError> for ApiError {
    fn from(err: SignatureError) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, "signing_failed", err.to_string())
    }
}

impl From<MiningError> for ApiError {
    fn from(err: MiningError) -> Self {
        match &err {
            MiningError::AttemptsExhausted { .. } => Self::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                "mining_exhausted",
                err.to_string(),
            ),
            MiningError::Cancelled { .. } => {
                Self::new(StatusCode::GATEWAY_TIMEOUT, "mining_timeout", err.to_string())
            }
            MiningError::InvalidDifficulty(_) => {
                Self::new(StatusCode::BAD_GATEWAY, "rewards_api", err.to_string())
            }
        }
    }
}

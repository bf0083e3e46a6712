// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Signing state machine: submit a request, poll to a terminal state.
//!
//! The custody service signs asynchronously; an operation can sit in
//! `PendingAuthorization` for as long as a human approver takes. The loop
//! therefore has no built-in deadline of its own — callers pass a
//! `CancellationToken` and decide how long they are willing to wait.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::client::{CustodyError, CustodySigner};
use super::types::{OperationStatus, SigningOutcome, SigningRequest, StatusClass};

/// Default delay between status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    #[error("custody call failed: {0}")]
    Custody(#[from] CustodyError),

    #[error("signing operation {operation_id} ended {status} ({sub_status})")]
    Terminal {
        operation_id: String,
        status: OperationStatus,
        sub_status: String,
    },

    #[error("signing operation {operation_id} completed without a signed message")]
    SignatureMissing { operation_id: String },

    #[error("signing operation {operation_id} cancelled while {status}")]
    Cancelled {
        operation_id: String,
        status: OperationStatus,
    },
}

/// Drives one custody signing operation from submission to terminal state.
#[derive(Clone)]
pub struct SigningMachine {
    custody: Arc<dyn CustodySigner>,
    poll_interval: Duration,
}

impl SigningMachine {
    pub fn new(custody: Arc<dyn CustodySigner>) -> Self {
        Self {
            custody,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(custody: Arc<dyn CustodySigner>, poll_interval: Duration) -> Self {
        Self {
            custody,
            poll_interval,
        }
    }

    /// Submit `request` and poll until terminal.
    pub async fn sign(
        &self,
        request: &SigningRequest,
        cancel: &CancellationToken,
    ) -> Result<SigningOutcome, SigningError> {
        let operation_id = self.custody.create_signing_operation(request).await?;
        info!(
            operation_id = %operation_id,
            asset_id = %request.asset_id,
            vault_account_id = %request.source_vault_id,
            "signing operation submitted"
        );

        let mut last_status: Option<OperationStatus> = None;
        loop {
            let state = self.custody.get_operation_status(&operation_id).await?;

            // One log line per transition, not per poll.
            if last_status != Some(state.status) {
                info!(
                    operation_id = %operation_id,
                    status = %state.status,
                    sub_status = state.sub_status.as_deref().unwrap_or(""),
                    "signing operation state changed"
                );
                last_status = Some(state.status);
            }

            match state.status.classify() {
                StatusClass::Success => {
                    return SigningOutcome::from_state(&state).ok_or_else(|| {
                        warn!(operation_id = %operation_id, "terminal success without signature");
                        SigningError::SignatureMissing {
                            operation_id: operation_id.clone(),
                        }
                    });
                }
                StatusClass::Failure => {
                    return Err(SigningError::Terminal {
                        operation_id,
                        status: state.status,
                        sub_status: state.sub_status.unwrap_or_default(),
                    });
                }
                StatusClass::Pending => {
                    tokio::select! {
                        _ = tokio::time::sleep(self.poll_interval) => {}
                        _ = cancel.cancelled() => {
                            return Err(SigningError::Cancelled {
                                operation_id,
                                status: state.status,
                            });
                        }
                    }
                }
            }
        }
    }
}

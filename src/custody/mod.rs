// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Custody service integration: client, handle pool, signing state
//! machine, and per-chain signature formatting.

pub mod client;
pub mod pool;
pub mod signature;
pub mod signer;
pub mod types;

pub use client::{CustodyClient, CustodyError, CustodySigner};
pub use pool::{
    IntegrationPool, PoolError, PoolKey, PoolLease, PoolMetrics, VaultIntegration,
};
pub use signature::{format_signature, SignatureError};
pub use signer::{SigningError, SigningMachine};
pub use types::{
    Chain, OperationState, OperationStatus, SignatureParts, SignedMessage, SigningAlgorithm,
    SigningOutcome, SigningRequest, StatusClass,
};

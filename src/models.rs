// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response structures for the REST surface. Token amounts
//! cross the wire as decimal strings and are parsed into `u128` before any
//! arithmetic happens.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::custody::Chain;

/// Request a reward-token transfer from a vault account.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct TransferRequest {
    pub vault_account_id: String,
    pub chain: Chain,
    /// Destination address on the target chain.
    pub destination_address: String,
    /// Token amount, decimal string.
    pub amount: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TransferResponse {
    pub tx_hash: String,
    /// Number of UTXOs spent.
    pub inputs: usize,
}

/// Claim the outstanding allocation for a vault account's address.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ClaimRequest {
    pub vault_account_id: String,
    pub chain: Chain,
}

/// Redeem the thawed allocation for a vault account.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RedeemRequest {
    pub vault_account_id: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub vault_account_id: String,
    pub chain: Chain,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SolveRequest {
    pub vault_account_id: String,
    /// Attempt cap; unbounded when omitted.
    pub max_attempts: Option<u64>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SolveResponse {
    pub nonce: String,
    pub hash: String,
    pub attempts: u64,
    pub elapsed_ms: u64,
    pub accepted: bool,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct DonateRequest {
    pub vault_account_id: String,
    /// Token amount to donate, decimal string.
    pub amount: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AddressesResponse {
    pub vault_account_id: String,
    pub chain: Chain,
    pub addresses: Vec<String>,
}

/// Parse a wire amount (decimal string) into `u128`.
pub fn parse_amount(raw: &str) -> Result<u128, String> {
    raw.trim()
        .parse::<u128>()
        .map_err(|e| format!("invalid amount {raw:?}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amounts_parse_from_decimal_strings() {
        assert_eq!(parse_amount("1000").unwrap(), 1000);
        assert_eq!(parse_amount(" 42 ").unwrap(), 42);
        assert!(parse_amount("1.5").is_err());
        assert!(parse_amount("-3").is_err());
        assert!(parse_amount("").is_err());
    }

    #[test]
    fn transfer_request_deserializes_chain_names() {
        let json = r#"{
            "vault_account_id": "va-1",
            "chain": "cardano",
            "destination_address": "addr_test1qz",
            "amount": "1000"
        }"#;
        let request: TransferRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.chain, Chain::Cardano);
    }
}

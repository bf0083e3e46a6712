// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Custody service data types: chains, signing operations, and outcomes.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Supported target chains.
///
/// Signing payload construction and signature formatting match on this
/// exhaustively; adding a chain means the compiler walks you through every
/// site that needs a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Cardano,
    Bitcoin,
    Ethereum,
    XrpLedger,
}

impl Chain {
    /// Custody-side asset identifier for this chain's base asset.
    pub fn asset_id(&self) -> &'static str {
        match self {
            Chain::Cardano => "ADA",
            Chain::Bitcoin => "BTC",
            Chain::Ethereum => "ETH",
            Chain::XrpLedger => "XRP",
        }
    }

    /// Signature algorithm the custody service uses for this chain.
    pub fn algorithm(&self) -> SigningAlgorithm {
        match self {
            Chain::Cardano => SigningAlgorithm::EddsaEd25519,
            Chain::Bitcoin | Chain::Ethereum | Chain::XrpLedger => {
                SigningAlgorithm::EcdsaSecp256k1
            }
        }
    }
}

impl std::fmt::Display for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Chain::Cardano => "cardano",
            Chain::Bitcoin => "bitcoin",
            Chain::Ethereum => "ethereum",
            Chain::XrpLedger => "xrpledger",
        };
        write!(f, "{name}")
    }
}

impl std::str::FromStr for Chain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cardano" | "ada" => Ok(Chain::Cardano),
            "bitcoin" | "btc" => Ok(Chain::Bitcoin),
            "ethereum" | "eth" => Ok(Chain::Ethereum),
            "xrpledger" | "xrp" => Ok(Chain::XrpLedger),
            other => Err(format!("unknown chain: {other}")),
        }
    }
}

/// Signature scheme reported by the custody service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SigningAlgorithm {
    #[serde(rename = "MPC_ECDSA_SECP256K1")]
    EcdsaSecp256k1,
    #[serde(rename = "MPC_EDDSA_ED25519")]
    EddsaEd25519,
}

/// Custody operation status, exactly the provider's enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationStatus {
    Submitted,
    Queued,
    PendingSignature,
    PendingAuthorization,
    #[serde(rename = "PENDING_3RD_PARTY_MANUAL_APPROVAL")]
    PendingThirdPartyApproval,
    #[serde(rename = "PENDING_3RD_PARTY")]
    PendingThirdParty,
    Completed,
    Broadcasting,
    Blocked,
    Cancelled,
    Failed,
    Rejected,
}

/// Disjoint classification of an operation status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// Signature material is available.
    Success,
    /// The operation will never produce a signature.
    Failure,
    /// Keep polling.
    Pending,
}

impl OperationStatus {
    pub fn classify(&self) -> StatusClass {
        match self {
            OperationStatus::Completed | OperationStatus::Broadcasting => StatusClass::Success,
            OperationStatus::Blocked
            | OperationStatus::Cancelled
            | OperationStatus::Failed
            | OperationStatus::Rejected => StatusClass::Failure,
            OperationStatus::Submitted
            | OperationStatus::Queued
            | OperationStatus::PendingSignature
            | OperationStatus::PendingAuthorization
            | OperationStatus::PendingThirdPartyApproval
            | OperationStatus::PendingThirdParty => StatusClass::Pending,
        }
    }
}

impl std::fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// A raw-message signing request submitted to the custody service.
///
/// Immutable once built; use [`SigningRequest::raw_message`].
#[derive(Debug, Clone, Serialize)]
pub struct SigningRequest {
    pub asset_id: String,
    pub operation: String,
    pub source_vault_id: String,
    /// Hex-encoded content to sign.
    pub content: String,
    /// BIP-44 derivation path for the signing key.
    pub derivation_path: Vec<u32>,
    pub note: String,
}

impl SigningRequest {
    /// Build a raw-message request for the given chain and vault account.
    ///
    /// Payload shape is chain-specific: the asset id selects the custody
    /// wallet and the derivation path selects the key under it.
    pub fn raw_message(
        chain: Chain,
        vault_account_id: &str,
        content_hex: &str,
        note: impl Into<String>,
    ) -> Self {
        let derivation_path = match chain {
            Chain::Cardano => vec![44, 1815, 0, 0, 0],
            Chain::Bitcoin => vec![44, 0, 0, 0, 0],
            Chain::Ethereum => vec![44, 60, 0, 0, 0],
            Chain::XrpLedger => vec![44, 144, 0, 0, 0],
        };
        Self {
            asset_id: chain.asset_id().to_string(),
            operation: "RAW".to_string(),
            source_vault_id: vault_account_id.to_string(),
            content: content_hex.to_string(),
            derivation_path,
            note: note.into(),
        }
    }
}

/// Signature components of a signed message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignatureParts {
    #[serde(rename = "fullSig")]
    pub full_sig: String,
    #[serde(default)]
    pub r: Option<String>,
    #[serde(default)]
    pub s: Option<String>,
    #[serde(default)]
    pub v: Option<u8>,
}

/// One signed message record from a completed operation.
#[derive(Debug, Clone, Deserialize)]
pub struct SignedMessage {
    pub content: String,
    pub algorithm: SigningAlgorithm,
    pub signature: SignatureParts,
    #[serde(rename = "publicKey")]
    pub public_key: String,
}

/// Current state of a custody operation.
#[derive(Debug, Clone, Deserialize)]
pub struct OperationState {
    pub id: String,
    pub status: OperationStatus,
    #[serde(default, rename = "subStatus")]
    pub sub_status: Option<String>,
    #[serde(default, rename = "signedMessages")]
    pub signed_messages: Vec<SignedMessage>,
}

/// Normalized result of a successful signing operation.
#[derive(Debug, Clone)]
pub struct SigningOutcome {
    pub signature: SignatureParts,
    pub public_key: String,
    pub algorithm: SigningAlgorithm,
    pub signed_content: String,
}

impl SigningOutcome {
    /// Extract the outcome from a terminal-success operation state.
    ///
    /// Returns `None` when the state carries no signed-message record;
    /// callers report that as a distinct "signature missing" error.
    pub fn from_state(state: &OperationState) -> Option<Self> {
        let message = state.signed_messages.first()?;
        Some(Self {
            signature: message.signature.clone(),
            public_key: message.public_key.clone(),
            algorithm: message.algorithm,
            signed_content: message.content.clone(),
        })
    }
}

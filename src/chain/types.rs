// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Core on-chain data types.
//!
//! Quantities arrive from the data provider as decimal strings and are
//! converted to `u128` at the wire boundary. No arithmetic on chain
//! amounts ever goes through floating point.

use serde::{Deserialize, Serialize};

/// Unit name of the chain's base asset in provider responses.
pub const BASE_ASSET_UNIT: &str = "lovelace";

/// A single asset line inside a UTXO: unit identifier plus quantity.
///
/// The base asset uses the unit [`BASE_ASSET_UNIT`]; native tokens use
/// `policy_id ++ hex(asset_name)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetQuantity {
    pub unit: String,
    #[serde(deserialize_with = "quantity::deserialize")]
    pub quantity: u128,
}

/// An unspent transaction output snapshot from the data provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    #[serde(default)]
    pub address: String,
    pub tx_hash: String,
    pub output_index: u32,
    #[serde(rename = "amount")]
    pub assets: Vec<AssetQuantity>,
}

impl Utxo {
    /// Quantity of the base asset held by this output.
    pub fn base_asset(&self) -> u128 {
        self.quantity_of(BASE_ASSET_UNIT)
    }

    /// Quantity of the given asset unit held by this output (0 if absent).
    pub fn quantity_of(&self, unit: &str) -> u128 {
        self.assets
            .iter()
            .filter(|a| a.unit == unit)
            .map(|a| a.quantity)
            .sum()
    }

    /// Whether this output carries any of the given asset unit.
    pub fn holds(&self, unit: &str) -> bool {
        self.assets.iter().any(|a| a.unit == unit && a.quantity > 0)
    }

    /// Stable `tx_hash#index` reference for logs and build requests.
    pub fn reference(&self) -> String {
        format!("{}#{}", self.tx_hash, self.output_index)
    }
}

/// Reward token identity: minting policy plus asset name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenId {
    pub policy_id: String,
    pub asset_name: String,
}

impl TokenId {
    pub fn new(policy_id: impl Into<String>, asset_name: impl Into<String>) -> Self {
        Self {
            policy_id: policy_id.into(),
            asset_name: asset_name.into(),
        }
    }

    /// Provider-side unit string: `policy_id ++ hex(asset_name)`.
    pub fn unit(&self) -> String {
        format!("{}{}", self.policy_id, hex::encode(self.asset_name.as_bytes()))
    }
}

/// Wire boundary for chain amounts: decimal strings (or plain integers)
/// parsed straight into `u128`.
pub mod quantity {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<u128, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(u64),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Text(s) => s
                .parse::<u128>()
                .map_err(|e| serde::de::Error::custom(format!("invalid quantity {s:?}: {e}"))),
            Raw::Number(n) => Ok(n as u128),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utxo(assets: Vec<(&str, u128)>) -> Utxo {
        Utxo {
            address: "addr_test1qz".to_string(),
            tx_hash: "aa".repeat(32),
            output_index: 0,
            assets: assets
                .into_iter()
                .map(|(unit, quantity)| AssetQuantity {
                    unit: unit.to_string(),
                    quantity,
                })
                .collect(),
        }
    }

    #[test]
    fn base_asset_and_token_lookup() {
        let u = utxo(vec![(BASE_ASSET_UNIT, 2_000_000), ("cafe0001", 5000)]);
        assert_eq!(u.base_asset(), 2_000_000);
        assert_eq!(u.quantity_of("cafe0001"), 5000);
        assert_eq!(u.quantity_of("missing"), 0);
        assert!(u.holds("cafe0001"));
        assert!(!u.holds("missing"));
    }

    #[test]
    fn token_unit_appends_hex_name() {
        let token = TokenId::new("cafe", "REWARD");
        assert_eq!(token.unit(), format!("cafe{}", hex::encode("REWARD")));
    }

    #[test]
    fn quantities_parse_from_decimal_strings() {
        let json = r#"{
            "address": "addr_test1qz",
            "tx_hash": "deadbeef",
            "output_index": 1,
            "amount": [
                {"unit": "lovelace", "quantity": "340282366920938463463374607431768211455"}
            ]
        }"#;
        let u: Utxo = serde_json::from_str(json).unwrap();
        // Full u128 range survives the string boundary.
        assert_eq!(u.base_asset(), u128::MAX);
    }

    #[test]
    fn invalid_quantity_string_is_rejected() {
        let json = r#"{
            "address": "a",
            "tx_hash": "b",
            "output_index": 0,
            "amount": [{"unit": "lovelace", "quantity": "12.5"}]
        }"#;
        assert!(serde_json::from_str::<Utxo>(json).is_err());
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Chain-specific signature formatting.
//!
//! The custody service hands back raw signature components; every chain
//! wants them packaged differently before submission. Formatting is a pure
//! function of `(algorithm, chain, components)` so each shape is testable
//! without a custody round trip.

use base64ct::{Base64, Encoding};

use super::types::{Chain, SignatureParts, SigningAlgorithm};

#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    #[error("signature is missing component {0}")]
    MissingComponent(&'static str),

    #[error("signature component {component} is not valid hex: {detail}")]
    InvalidHex {
        component: &'static str,
        detail: String,
    },

    #[error("algorithm {algorithm:?} cannot be formatted for chain {chain}")]
    AlgorithmMismatch {
        algorithm: SigningAlgorithm,
        chain: Chain,
    },
}

/// Package raw signature components into the chain's expected encoding.
///
/// - Bitcoin: recovery byte (`31 + v`, compressed-key message signature)
///   prepended to `r ++ s`, base64-encoded.
/// - XRP Ledger: `r ++ s` concatenated, uppercase hex.
/// - Ethereum: `r ++ s ++ hex(v + 27)`, lowercase hex.
/// - Cardano: the raw Ed25519 signature unchanged.
pub fn format_signature(
    algorithm: SigningAlgorithm,
    chain: Chain,
    parts: &SignatureParts,
) -> Result<String, SignatureError> {
    match (algorithm, chain) {
        (SigningAlgorithm::EddsaEd25519, Chain::Cardano) => Ok(parts.full_sig.clone()),

        (SigningAlgorithm::EcdsaSecp256k1, Chain::Bitcoin) => {
            let r = require_hex(parts.r.as_deref(), "r")?;
            let s = require_hex(parts.s.as_deref(), "s")?;
            let v = parts.v.ok_or(SignatureError::MissingComponent("v"))?;
            let mut bytes = Vec::with_capacity(1 + r.len() + s.len());
            bytes.push(31 + v);
            bytes.extend_from_slice(&r);
            bytes.extend_from_slice(&s);
            Ok(Base64::encode_string(&bytes))
        }

        (SigningAlgorithm::EcdsaSecp256k1, Chain::XrpLedger) => {
            let r = parts.r.as_deref().ok_or(SignatureError::MissingComponent("r"))?;
            let s = parts.s.as_deref().ok_or(SignatureError::MissingComponent("s"))?;
            Ok(format!("{r}{s}").to_uppercase())
        }

        (SigningAlgorithm::EcdsaSecp256k1, Chain::Ethereum) => {
            let r = parts.r.as_deref().ok_or(SignatureError::MissingComponent("r"))?;
            let s = parts.s.as_deref().ok_or(SignatureError::MissingComponent("s"))?;
            let v = parts.v.ok_or(SignatureError::MissingComponent("v"))?;
            Ok(format!("{r}{s}{:02x}", v as u16 + 27))
        }

        (algorithm, chain) => Err(SignatureError::AlgorithmMismatch { algorithm, chain }),
    }
}

fn require_hex(value: Option<&str>, component: &'static str) -> Result<Vec<u8>, SignatureError> {
    let value = value.ok_or(SignatureError::MissingComponent(component))?;
    hex::decode(value).map_err(|e| SignatureError::InvalidHex {
        component,
        detail: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts(r: &str, s: &str, v: Option<u8>) -> SignatureParts {
        SignatureParts {
            full_sig: format!("{r}{s}"),
            r: Some(r.to_string()),
            s: Some(s.to_string()),
            v,
        }
    }

    #[test]
    fn cardano_passes_raw_signature_through() {
        let p = SignatureParts {
            full_sig: "ab".repeat(64),
            ..Default::default()
        };
        let sig = format_signature(SigningAlgorithm::EddsaEd25519, Chain::Cardano, &p).unwrap();
        assert_eq!(sig, "ab".repeat(64));
    }

    #[test]
    fn bitcoin_prepends_recovery_byte_and_base64_encodes() {
        let p = parts(&"11".repeat(32), &"22".repeat(32), Some(1));
        let sig = format_signature(SigningAlgorithm::EcdsaSecp256k1, Chain::Bitcoin, &p).unwrap();
        let decoded = Base64::decode_vec(&sig).unwrap();
        assert_eq!(decoded.len(), 65);
        assert_eq!(decoded[0], 32); // 31 + v
        assert_eq!(&decoded[1..33], &[0x11; 32]);
        assert_eq!(&decoded[33..], &[0x22; 32]);
    }

    #[test]
    fn xrp_concatenates_uppercase() {
        let p = parts("ab12", "cd34", None);
        let sig = format_signature(SigningAlgorithm::EcdsaSecp256k1, Chain::XrpLedger, &p).unwrap();
        assert_eq!(sig, "AB12CD34");
    }

    #[test]
    fn ethereum_appends_offset_recovery_id() {
        let p = parts(&"11".repeat(32), &"22".repeat(32), Some(0));
        let sig = format_signature(SigningAlgorithm::EcdsaSecp256k1, Chain::Ethereum, &p).unwrap();
        assert!(sig.ends_with("1b")); // 0 + 27
        assert_eq!(sig.len(), 64 + 64 + 2);

        let p = parts(&"11".repeat(32), &"22".repeat(32), Some(1));
        let sig = format_signature(SigningAlgorithm::EcdsaSecp256k1, Chain::Ethereum, &p).unwrap();
        assert!(sig.ends_with("1c")); // 1 + 27
    }

    #[test]
    fn missing_components_are_reported_by_name() {
        let p = SignatureParts::default();
        let err = format_signature(SigningAlgorithm::EcdsaSecp256k1, Chain::Ethereum, &p)
            .unwrap_err();
        assert!(matches!(err, SignatureError::MissingComponent("r")));

        let p = parts(&"11".repeat(32), &"22".repeat(32), None);
        let err = format_signature(SigningAlgorithm::EcdsaSecp256k1, Chain::Bitcoin, &p)
            .unwrap_err();
        assert!(matches!(err, SignatureError::MissingComponent("v")));
    }

    #[test]
    fn algorithm_chain_mismatch_is_rejected() {
        let p = parts("ab", "cd", Some(0));
        let err = format_signature(SigningAlgorithm::EddsaEd25519, Chain::Bitcoin, &p)
            .unwrap_err();
        assert!(matches!(err, SignatureError::AlgorithmMismatch { .. }));
    }
}

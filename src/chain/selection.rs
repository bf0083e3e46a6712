// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! UTXO coin selection and transfer output planning.
//!
//! Two-phase greedy selection: phase 1 accumulates token-bearing outputs
//! (largest token quantity first) until both the requested token amount and
//! the recipient-minimum-plus-fee base requirement are covered; phase 2
//! tops up the base asset from the remaining outputs (largest base quantity
//! first) until the change minimum is also covered. Greedy is not optimal,
//! but fewer, larger inputs keep transaction size and fee down.
//!
//! A selection either satisfies every requirement or fails with the exact
//! shortfall. Nothing downstream ever sees a partially funded plan.

use super::types::Utxo;

/// Funding requirements for a token transfer.
#[derive(Debug, Clone, Copy)]
pub struct SelectionTargets {
    /// Token amount the recipient must receive.
    pub required_token: u128,
    /// Network fee estimate in base-asset units.
    pub fee: u128,
    /// Minimum base asset the recipient output must carry.
    pub recipient_min: u128,
    /// Minimum base asset the change output must carry.
    pub change_min: u128,
}

impl SelectionTargets {
    fn base_with_change(&self) -> u128 {
        self.recipient_min + self.fee + self.change_min
    }

    fn base_without_change(&self) -> u128 {
        self.recipient_min + self.fee
    }
}

/// A completed selection: inputs plus their accumulated totals.
#[derive(Debug, Clone)]
pub struct CoinSelection {
    pub selected: Vec<Utxo>,
    pub accumulated_base: u128,
    pub accumulated_token: u128,
}

/// One output of a planned transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedOutput {
    pub base_asset: u128,
    /// Token line, omitted entirely when the amount would be zero.
    pub token: Option<u128>,
}

/// The two outputs of a planned transfer transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferPlan {
    pub recipient: PlannedOutput,
    pub change: PlannedOutput,
}

#[derive(Debug, thiserror::Error)]
pub enum SelectionError {
    #[error("no outputs at the source address hold token unit {unit}")]
    NoTokenUtxos { unit: String },

    #[error(
        "insufficient balance: short {base_shortfall} base units and {token_shortfall} token units"
    )]
    InsufficientBalance {
        base_shortfall: u128,
        token_shortfall: u128,
    },

    #[error("token balance too low: hold {held}, transfer requires {required}")]
    TokenBalanceTooLow { held: u128, required: u128 },
}

/// Select UTXOs covering `targets` for a transfer of `token_unit`.
pub fn select_utxos(
    utxos: &[Utxo],
    token_unit: &str,
    targets: &SelectionTargets,
) -> Result<CoinSelection, SelectionError> {
    let mut token_bearing: Vec<&Utxo> = utxos.iter().filter(|u| u.holds(token_unit)).collect();
    if token_bearing.is_empty() {
        return Err(SelectionError::NoTokenUtxos {
            unit: token_unit.to_string(),
        });
    }
    token_bearing.sort_by(|a, b| b.quantity_of(token_unit).cmp(&a.quantity_of(token_unit)));

    let mut selected: Vec<Utxo> = Vec::new();
    let mut accumulated_base: u128 = 0;
    let mut accumulated_token: u128 = 0;

    // Phase 1: token-bearing outputs until token and recipient+fee base are met.
    for utxo in token_bearing {
        if accumulated_token >= targets.required_token
            && accumulated_base >= targets.base_without_change()
        {
            break;
        }
        accumulated_base += utxo.base_asset();
        accumulated_token += utxo.quantity_of(token_unit);
        selected.push(utxo.clone());
    }

    // Phase 2: top up base asset until the change minimum is also covered.
    if accumulated_base < targets.base_with_change() {
        let is_selected =
            |u: &Utxo| selected.iter().any(|s| s.tx_hash == u.tx_hash && s.output_index == u.output_index);
        let mut remaining: Vec<&Utxo> = utxos.iter().filter(|u| !is_selected(u)).collect();
        remaining.sort_by(|a, b| b.base_asset().cmp(&a.base_asset()));

        for utxo in remaining {
            if accumulated_base >= targets.base_with_change() {
                break;
            }
            accumulated_base += utxo.base_asset();
            accumulated_token += utxo.quantity_of(token_unit);
            selected.push(utxo.clone());
        }
    }

    if accumulated_token < targets.required_token || accumulated_base < targets.base_with_change() {
        return Err(SelectionError::InsufficientBalance {
            base_shortfall: targets.base_with_change().saturating_sub(accumulated_base),
            token_shortfall: targets.required_token.saturating_sub(accumulated_token),
        });
    }

    Ok(CoinSelection {
        selected,
        accumulated_base,
        accumulated_token,
    })
}

/// Build the recipient and change outputs for a completed selection.
///
/// The change output drops its token line when the transfer drains the
/// token balance completely; the resulting token-free output is usable
/// as collateral later.
pub fn build_outputs(
    selection: &CoinSelection,
    targets: &SelectionTargets,
) -> Result<TransferPlan, SelectionError> {
    if selection.accumulated_token < targets.required_token {
        return Err(SelectionError::TokenBalanceTooLow {
            held: selection.accumulated_token,
            required: targets.required_token,
        });
    }

    let change_token = selection.accumulated_token - targets.required_token;
    let change_base = selection
        .accumulated_base
        .saturating_sub(targets.recipient_min)
        .saturating_sub(targets.fee);

    Ok(TransferPlan {
        recipient: PlannedOutput {
            base_asset: targets.recipient_min,
            token: Some(targets.required_token),
        },
        change: PlannedOutput {
            base_asset: change_base,
            token: (change_token > 0).then_some(change_token),
        },
    })
}

/// Convenience wrapper: select inputs and plan outputs in one step.
pub fn select_and_plan(
    utxos: &[Utxo],
    token_unit: &str,
    targets: &SelectionTargets,
) -> Result<(CoinSelection, TransferPlan), SelectionError> {
    let selection = select_utxos(utxos, token_unit, targets)?;
    let plan = build_outputs(&selection, targets)?;
    Ok((selection, plan))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::types::{AssetQuantity, BASE_ASSET_UNIT};

    const TOKEN: &str = "cafe52455741524453";

    fn utxo(tag: u32, base: u128, token: u128) -> Utxo {
        let mut assets = vec![AssetQuantity {
            unit: BASE_ASSET_UNIT.to_string(),
            quantity: base,
        }];
        if token > 0 {
            assets.push(AssetQuantity {
                unit: TOKEN.to_string(),
                quantity: token,
            });
        }
        Utxo {
            address: "addr_test1qz".to_string(),
            tx_hash: format!("{tag:064x}"),
            output_index: 0,
            assets,
        }
    }

    fn targets(required_token: u128, fee: u128, recipient_min: u128, change_min: u128) -> SelectionTargets {
        SelectionTargets {
            required_token,
            fee,
            recipient_min,
            change_min,
        }
    }

    #[test]
    fn fails_when_no_output_holds_the_token() {
        let utxos = vec![utxo(1, 5_000_000, 0)];
        let err = select_utxos(&utxos, TOKEN, &targets(100, 200_000, 1_200_000, 1_200_000))
            .unwrap_err();
        assert!(matches!(err, SelectionError::NoTokenUtxos { .. }));
    }

    #[test]
    fn single_utxo_covers_everything() {
        let utxos = vec![utxo(1, 5_000_000, 2000)];
        let t = targets(1000, 200_000, 1_200_000, 1_200_000);
        let selection = select_utxos(&utxos, TOKEN, &t).unwrap();
        assert_eq!(selection.selected.len(), 1);
        assert_eq!(selection.accumulated_base, 5_000_000);
        assert_eq!(selection.accumulated_token, 2000);
    }

    #[test]
    fn prefers_larger_token_outputs_first() {
        let utxos = vec![
            utxo(1, 2_000_000, 100),
            utxo(2, 2_000_000, 5000),
            utxo(3, 2_000_000, 300),
        ];
        let t = targets(4000, 200_000, 1_200_000, 500_000);
        let selection = select_utxos(&utxos, TOKEN, &t).unwrap();
        assert_eq!(selection.selected.len(), 1);
        assert_eq!(selection.selected[0].quantity_of(TOKEN), 5000);
    }

    #[test]
    fn phase_two_pulls_pure_base_outputs() {
        // One token UTXO satisfies phase 1 but the change minimum forces
        // a second, pure-base input.
        let utxos = vec![utxo(1, 2_000_000, 5000), utxo(2, 3_000_000, 0)];
        let t = targets(1000, 200_000, 1_200_000, 1_200_000);
        let selection = select_utxos(&utxos, TOKEN, &t).unwrap();
        assert_eq!(selection.selected.len(), 2);
        assert_eq!(selection.accumulated_base, 5_000_000);
        assert_eq!(selection.accumulated_token, 5000);

        let plan = build_outputs(&selection, &t).unwrap();
        assert_eq!(plan.recipient.base_asset, 1_200_000);
        assert_eq!(plan.recipient.token, Some(1000));
        assert_eq!(plan.change.base_asset, 3_600_000);
        assert_eq!(plan.change.token, Some(4000));
    }

    #[test]
    fn reports_exact_shortfall_when_unfundable() {
        let utxos = vec![utxo(1, 1_000_000, 300)];
        let t = targets(1000, 200_000, 1_200_000, 1_200_000);
        let err = select_utxos(&utxos, TOKEN, &t).unwrap_err();
        match err {
            SelectionError::InsufficientBalance {
                base_shortfall,
                token_shortfall,
            } => {
                assert_eq!(base_shortfall, 2_600_000 - 1_000_000);
                assert_eq!(token_shortfall, 700);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn never_selects_the_same_output_twice() {
        // A single output that covers the token but not the base target must
        // not be re-pulled in phase 2.
        let utxos = vec![utxo(1, 1_000_000, 5000)];
        let t = targets(1000, 200_000, 1_200_000, 1_200_000);
        let err = select_utxos(&utxos, TOKEN, &t).unwrap_err();
        assert!(matches!(err, SelectionError::InsufficientBalance { .. }));
    }

    #[test]
    fn output_conservation_holds() {
        let utxos = vec![utxo(1, 2_000_000, 5000), utxo(2, 3_000_000, 0)];
        let t = targets(1000, 200_000, 1_200_000, 1_200_000);
        let (selection, plan) = select_and_plan(&utxos, TOKEN, &t).unwrap();

        let token_out =
            plan.recipient.token.unwrap_or(0) + plan.change.token.unwrap_or(0);
        assert_eq!(token_out, selection.accumulated_token);

        let base_out = plan.recipient.base_asset + plan.change.base_asset;
        assert_eq!(base_out, selection.accumulated_base - t.fee);
    }

    #[test]
    fn drained_token_balance_yields_token_free_change() {
        let utxos = vec![utxo(1, 5_000_000, 1000)];
        let t = targets(1000, 200_000, 1_200_000, 1_200_000);
        let (_, plan) = select_and_plan(&utxos, TOKEN, &t).unwrap();
        assert_eq!(plan.recipient.token, Some(1000));
        assert_eq!(plan.change.token, None);
        assert_eq!(plan.change.base_asset, 3_600_000);
    }

    #[test]
    fn build_outputs_rejects_overdraw() {
        let selection = CoinSelection {
            selected: vec![utxo(1, 5_000_000, 500)],
            accumulated_base: 5_000_000,
            accumulated_token: 500,
        };
        let t = targets(1000, 200_000, 1_200_000, 1_200_000);
        let err = build_outputs(&selection, &t).unwrap_err();
        assert!(matches!(
            err,
            SelectionError::TokenBalanceTooLow {
                held: 500,
                required: 1000
            }
        ));
    }
}

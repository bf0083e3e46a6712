// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! On-chain data, UTXO selection, and transaction construction seams.

pub mod codec;
pub mod provider;
pub mod selection;
pub mod types;

pub use codec::{BuiltTransaction, CodecError, TxCodec, TxCodecClient, VkeyWitness};
pub use provider::{ChainData, ChainDataClient, ChainDataError};
pub use selection::{
    build_outputs, select_and_plan, select_utxos, CoinSelection, PlannedOutput, SelectionError,
    SelectionTargets, TransferPlan,
};
pub use types::{AssetQuantity, TokenId, Utxo, BASE_ASSET_UNIT};

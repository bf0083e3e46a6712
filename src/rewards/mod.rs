// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Rewards platform integration: REST client, claims cache, redemption
//! workflow, and the scavenger-hunt proof-of-work solver.

pub mod api;
pub mod cache;
pub mod mining;
pub mod redemption;

pub use api::{
    AllocationProof, ClaimReceipt, ClaimRecord, DonationReceipt, PhaseConfig, RedemptionApi,
    RegistrationReceipt, RewardsApiError, RewardsClient, SolutionReceipt, SubmittedRedemption,
    ThawEntry, ThawStatus, TransactionStatus,
};
pub use cache::ClaimsCache;
pub use mining::{matches_difficulty, solve, MiningChallenge, MiningError, MiningSolution};
pub use redemption::{RedemptionError, RedemptionWindow, RedemptionWorkflow};

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Scavenger-hunt proof-of-work solver.
//!
//! Iterates nonces over a keyed hash until the digest satisfies the
//! challenge's difficulty mask. CPU-bound; callers run it on a blocking
//! worker and hand it a cancellation token, checked every nonce.
//!
//! The difficulty test inspects only the first 32 bits of digest and mask.
//! That matches the server-side verifier; a wider mask would make this
//! check under-constraining and needs a coordinated change here and there.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use utoipa::ToSchema;

type HmacSha256 = Hmac<Sha256>;

/// Minimum delay between progress callback invocations.
const PROGRESS_INTERVAL: Duration = Duration::from_secs(1);

/// A mining challenge issued by the scavenger-hunt service.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MiningChallenge {
    pub challenge_id: String,
    /// Difficulty mask, hex.
    pub difficulty: String,
    /// Key for the challenge's keyed hash.
    pub anti_premine_token: String,
    pub issued_at: DateTime<Utc>,
    /// Hash of the most recent accepted submission.
    pub latest_submission: String,
    /// Challenge hour counter, part of the preimage.
    pub anti_premine_hour: u32,
}

/// A found solution plus search statistics.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MiningSolution {
    /// Winning nonce, 16 hex digits, zero-padded.
    pub nonce: String,
    /// Digest of the winning preimage, hex.
    pub hash: String,
    pub attempts: u64,
    #[serde(serialize_with = "serialize_elapsed_ms")]
    #[schema(value_type = u64)]
    pub elapsed: Duration,
}

fn serialize_elapsed_ms<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

#[derive(Debug, thiserror::Error)]
pub enum MiningError {
    #[error("challenge difficulty is not usable: {0}")]
    InvalidDifficulty(String),

    #[error("no solution within {attempts} attempts")]
    AttemptsExhausted { attempts: u64 },

    #[error("mining cancelled after {attempts} attempts")]
    Cancelled { attempts: u64 },
}

/// True iff the digest satisfies the mask: a zero bit in the mask demands
/// a zero bit in the digest. Only the first 32 bits are compared.
pub fn matches_difficulty(hash: &[u8], difficulty: &[u8]) -> bool {
    if hash.len() < 4 || difficulty.len() < 4 {
        return false;
    }
    let hash_bits = u32::from_be_bytes([hash[0], hash[1], hash[2], hash[3]]);
    let difficulty_bits =
        u32::from_be_bytes([difficulty[0], difficulty[1], difficulty[2], difficulty[3]]);
    (hash_bits | difficulty_bits) == difficulty_bits
}

/// Deterministic preimage for one nonce attempt.
fn preimage(nonce: u64, address: &str, challenge: &MiningChallenge) -> String {
    format!(
        "{nonce:016x}{address}{}{}{}{}{}",
        challenge.challenge_id,
        challenge.difficulty,
        challenge.anti_premine_token,
        challenge.latest_submission,
        challenge.anti_premine_hour,
    )
}

/// Search for a nonce whose keyed hash satisfies the challenge mask.
///
/// `progress`, when given, is invoked at most once per second with the
/// attempt count and the instantaneous hash rate.
pub fn solve(
    address: &str,
    challenge: &MiningChallenge,
    max_attempts: Option<u64>,
    cancel: &CancellationToken,
    mut progress: Option<&mut dyn FnMut(u64, f64)>,
) -> Result<MiningSolution, MiningError> {
    let difficulty = hex::decode(&challenge.difficulty)
        .map_err(|e| MiningError::InvalidDifficulty(e.to_string()))?;
    if difficulty.len() < 4 {
        return Err(MiningError::InvalidDifficulty(format!(
            "mask is {} bytes, need at least 4",
            difficulty.len()
        )));
    }

    let mac_seed = HmacSha256::new_from_slice(challenge.anti_premine_token.as_bytes())
        .map_err(|e| MiningError::InvalidDifficulty(format!("bad hash key: {e}")))?;

    let started = Instant::now();
    let mut last_report = started;
    let mut last_report_attempts: u64 = 0;

    info!(
        challenge_id = %challenge.challenge_id,
        difficulty = %challenge.difficulty,
        address = %address,
        "mining search starting"
    );

    let mut attempts: u64 = 0;
    for nonce in 0u64.. {
        if cancel.is_cancelled() {
            return Err(MiningError::Cancelled { attempts });
        }
        if let Some(max) = max_attempts {
            if attempts >= max {
                return Err(MiningError::AttemptsExhausted { attempts });
            }
        }
        attempts += 1;

        let mut mac = mac_seed.clone();
        mac.update(preimage(nonce, address, challenge).as_bytes());
        let digest = mac.finalize().into_bytes();

        if matches_difficulty(&digest, &difficulty) {
            let solution = MiningSolution {
                nonce: format!("{nonce:016x}"),
                hash: hex::encode(digest),
                attempts,
                elapsed: started.elapsed(),
            };
            info!(
                challenge_id = %challenge.challenge_id,
                nonce = %solution.nonce,
                attempts,
                elapsed_ms = solution.elapsed.as_millis() as u64,
                "mining solution found"
            );
            return Ok(solution);
        }

        if let Some(callback) = progress.as_deref_mut() {
            let now = Instant::now();
            if now.duration_since(last_report) >= PROGRESS_INTERVAL {
                let window = now.duration_since(last_report).as_secs_f64();
                let rate = (attempts - last_report_attempts) as f64 / window;
                callback(attempts, rate);
                debug!(attempts, rate, "mining progress");
                last_report = now;
                last_report_attempts = attempts;
            }
        }
    }

    // Unreachable in practice; the nonce space outlives any caller.
    Err(MiningError::AttemptsExhausted { attempts })
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment once at startup. Missing
//! credentials are fatal before any operation runs.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DATA_DIR` | Root directory for the audit trail | `/data` |
//! | `CUSTODY_API_URL` | Custody service base URL | Required |
//! | `CUSTODY_API_KEY` | Custody API key | Required |
//! | `CUSTODY_SECRET_PATH` | Path to the RSA PEM signing the custody JWTs | Required |
//! | `CHAIN_DATA_URL` | On-chain data provider base URL | Required |
//! | `CHAIN_DATA_PROJECT_ID` | Data provider project id | Required |
//! | `TX_CODEC_URL` | Transaction construction sidecar base URL | Required |
//! | `REWARDS_API_URL` | Rewards platform base URL | Required |
//! | `TOKEN_POLICY_ID` | Reward token minting policy id | Required |
//! | `TOKEN_ASSET_NAME` | Reward token asset name | Required |
//! | `TRANSFER_FEE` | Fee estimate per transfer, base units | `200000` |
//! | `RECIPIENT_MIN` | Minimum base asset on the recipient output | `1200000` |
//! | `CHANGE_MIN` | Minimum base asset on the change output | `1200000` |
//! | `POOL_CAPACITY` | Max pooled custody integrations | `32` |
//! | `POOL_IDLE_TIMEOUT_SECS` | Idle handle lifetime | `900` |
//! | `POOL_SWEEP_INTERVAL_SECS` | Sweep pass interval | `60` |
//! | `SIGNING_POLL_INTERVAL_MS` | Custody status poll delay | `1000` |
//! | `SIGNING_TIMEOUT_SECS` | Per-operation signing deadline | `600` |
//! | `MINING_MAX_ATTEMPTS` | Attempt cap for the PoW solver | unbounded |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info` |

use std::path::PathBuf;
use std::time::Duration;

use crate::chain::TokenId;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    Missing(&'static str),

    #[error("environment variable {var} is invalid: {detail}")]
    Invalid { var: &'static str, detail: String },

    #[error("failed to read {var} file {path}: {detail}")]
    Unreadable {
        var: &'static str,
        path: String,
        detail: String,
    },
}

/// Fully resolved service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,

    pub custody_api_url: String,
    pub custody_api_key: String,
    pub custody_secret_pem: Vec<u8>,

    pub chain_data_url: String,
    pub chain_data_project_id: String,
    pub tx_codec_url: String,
    pub rewards_api_url: String,

    pub token: TokenId,
    pub transfer_fee: u128,
    pub recipient_min: u128,
    pub change_min: u128,

    pub pool_capacity: usize,
    pub pool_idle_timeout: Duration,
    pub pool_sweep_interval: Duration,

    pub signing_poll_interval: Duration,
    pub signing_timeout: Duration,

    pub mining_max_attempts: Option<u64>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let secret_path = required("CUSTODY_SECRET_PATH")?;
        let custody_secret_pem =
            std::fs::read(&secret_path).map_err(|e| ConfigError::Unreadable {
                var: "CUSTODY_SECRET_PATH",
                path: secret_path.clone(),
                detail: e.to_string(),
            })?;

        Ok(Self {
            host: or_default("HOST", "0.0.0.0"),
            port: parse_or("PORT", 8080)?,
            data_dir: PathBuf::from(or_default("DATA_DIR", "/data")),

            custody_api_url: required_url("CUSTODY_API_URL")?,
            custody_api_key: required("CUSTODY_API_KEY")?,
            custody_secret_pem,

            chain_data_url: required_url("CHAIN_DATA_URL")?,
            chain_data_project_id: required("CHAIN_DATA_PROJECT_ID")?,
            tx_codec_url: required_url("TX_CODEC_URL")?,
            rewards_api_url: required_url("REWARDS_API_URL")?,

            token: TokenId::new(required("TOKEN_POLICY_ID")?, required("TOKEN_ASSET_NAME")?),
            transfer_fee: parse_or("TRANSFER_FEE", 200_000u128)?,
            recipient_min: parse_or("RECIPIENT_MIN", 1_200_000u128)?,
            change_min: parse_or("CHANGE_MIN", 1_200_000u128)?,

            pool_capacity: parse_or("POOL_CAPACITY", 32usize)?,
            pool_idle_timeout: Duration::from_secs(parse_or("POOL_IDLE_TIMEOUT_SECS", 900u64)?),
            pool_sweep_interval: Duration::from_secs(parse_or("POOL_SWEEP_INTERVAL_SECS", 60u64)?),

            signing_poll_interval: Duration::from_millis(parse_or(
                "SIGNING_POLL_INTERVAL_MS",
                1000u64,
            )?),
            signing_timeout: Duration::from_secs(parse_or("SIGNING_TIMEOUT_SECS", 600u64)?),

            mining_max_attempts: parse_opt("MINING_MAX_ATTEMPTS")?,
        })
    }
}

fn required(var: &'static str) -> Result<String, ConfigError> {
    match std::env::var(var) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::Missing(var)),
    }
}

fn required_url(var: &'static str) -> Result<String, ConfigError> {
    let value = required(var)?;
    url::Url::parse(&value).map_err(|e| ConfigError::Invalid {
        var,
        detail: e.to_string(),
    })?;
    Ok(value)
}

fn or_default(var: &str, default: &str) -> String {
    std::env::var(var)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_or<T: std::str::FromStr>(var: &'static str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(var) {
        Ok(v) if !v.trim().is_empty() => v.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            detail: e.to_string(),
        }),
        _ => Ok(default),
    }
}

fn parse_opt<T: std::str::FromStr>(var: &'static str) -> Result<Option<T>, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(var) {
        Ok(v) if !v.trim().is_empty() => v
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::Invalid {
                var,
                detail: e.to_string(),
            }),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_or_uses_default_when_unset() {
        std::env::remove_var("TEST_PARSE_OR_UNSET");
        let v: u64 = parse_or("TEST_PARSE_OR_UNSET", 42).unwrap();
        assert_eq!(v, 42);
    }

    #[test]
    fn parse_or_rejects_garbage() {
        std::env::set_var("TEST_PARSE_OR_BAD", "not-a-number");
        let err = parse_or::<u64>("TEST_PARSE_OR_BAD", 42).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "TEST_PARSE_OR_BAD", .. }));
        std::env::remove_var("TEST_PARSE_OR_BAD");
    }

    #[test]
    fn required_url_rejects_non_urls() {
        std::env::set_var("TEST_REQUIRED_URL", "not a url");
        assert!(matches!(
            required_url("TEST_REQUIRED_URL"),
            Err(ConfigError::Invalid { var: "TEST_REQUIRED_URL", .. })
        ));
        std::env::set_var("TEST_REQUIRED_URL", "https://api.example.com/v1");
        assert!(required_url("TEST_REQUIRED_URL").is_ok());
        std::env::remove_var("TEST_REQUIRED_URL");
    }

    #[test]
    fn required_rejects_empty_values() {
        std::env::set_var("TEST_REQUIRED_EMPTY", "  ");
        assert!(matches!(
            required("TEST_REQUIRED_EMPTY"),
            Err(ConfigError::Missing("TEST_REQUIRED_EMPTY"))
        ));
        std::env::remove_var("TEST_REQUIRED_EMPTY");
    }
}

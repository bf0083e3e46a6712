// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use reward_vault_server::{
    api::router,
    chain::{ChainDataClient, TxCodecClient},
    config::Config,
    custody::CustodyClient,
    orchestrator::Orchestrator,
    rewards::RewardsClient,
    state::AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = Config::from_env()?;

    let custody = Arc::new(CustodyClient::new(
        &config.custody_api_url,
        &config.custody_api_key,
        &config.custody_secret_pem,
    )?);
    let chain_data = Arc::new(ChainDataClient::new(
        &config.chain_data_url,
        &config.chain_data_project_id,
    )?);
    let codec = Arc::new(TxCodecClient::new(&config.tx_codec_url)?);
    let rewards = Arc::new(RewardsClient::new(&config.rewards_api_url)?);

    let orchestrator = Orchestrator::new(&config, custody, chain_data, codec, rewards);
    orchestrator.start_background_tasks();

    let state = AppState::new(orchestrator);
    let app = router(state.clone());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!(%addr, "reward vault server listening (docs at /docs)");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state))
        .await?;

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal(state: AppState) {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
    state.orchestrator.shutdown();
}

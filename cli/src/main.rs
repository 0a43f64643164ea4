use std::env;
use std::process::ExitCode;

use swap_engine::config::{Role, SwapConfig};
use swap_engine::lp_orchestrator::{run_lp_swap, LpState};
use swap_engine::node::BitcoinNodeClient;
use swap_engine::rln::RlnClient;
use swap_engine::store::HodlStore;
use swap_engine::user_orchestrator::{run_user_swap, UserState};
use swap_engine::channel::SubmarineChannelServer;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            tracing::error!(error = %e, "fatal error before a terminal state was reached");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<ExitCode> {
    let config = SwapConfig::load()?;
    tracing::info!(role = ?config.role, network = ?config.network, "thunder-swap starting");

    let node = BitcoinNodeClient::new(
        &config.bitcoin_rpc_url,
        &config.bitcoin_rpc_user,
        &config.bitcoin_rpc_pass,
    )?;
    let rln = RlnClient::new(&config.rln_base_url, config.rln_api_key.clone())?;

    match config.role {
        Role::User => {
            let amount_sat: u64 = env::var("AMOUNT_SAT")
                .ok()
                .and_then(|v| v.parse().ok())
                .ok_or_else(|| anyhow::anyhow!("missing or invalid AMOUNT_SAT"))?;
            let amt_msat: u64 = env::var("AMT_MSAT")
                .ok()
                .and_then(|v| v.parse().ok())
                .ok_or_else(|| anyhow::anyhow!("missing or invalid AMT_MSAT"))?;

            let store = HodlStore::new(config.hodl_store_path.as_deref())?;
            let channel = SubmarineChannelServer::new();
            let port = config.client_comm_port;
            let server_channel = channel.clone();
            tokio::spawn(async move {
                if let Err(e) = server_channel.serve(port).await {
                    tracing::error!(error = %e, "submarine-data server exited");
                }
            });

            let outcome = run_user_swap(&config, &node, &rln, &store, &channel, amount_sat, amt_msat).await?;
            match outcome.final_state {
                UserState::Settled => {
                    tracing::info!(payment_hash = %outcome.payment_hash, txid = ?outcome.deposit_txid, "swap settled");
                    eprintln!("SETTLED payment_hash={} txid={:?}", outcome.payment_hash, outcome.deposit_txid);
                    Ok(ExitCode::SUCCESS)
                }
                other => {
                    tracing::warn!(state = ?other, payment_hash = %outcome.payment_hash, error = ?outcome.error_message, "swap ended without settling");
                    eprintln!(
                        "{:?} payment_hash={} message={}",
                        other,
                        outcome.payment_hash,
                        outcome.error_message.unwrap_or_default()
                    );
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Role::Lp => {
            let user_comm_url = config
                .user_comm_url
                .clone()
                .ok_or_else(|| anyhow::anyhow!("USER_COMM_URL is required for CLIENT_ROLE=LP"))?;

            let outcome = run_lp_swap(&config, &node, &rln, &user_comm_url).await?;
            match outcome.final_state {
                LpState::Claimed => {
                    tracing::info!(payment_hash = ?outcome.payment_hash, txid = ?outcome.claim_txid, "htlc claimed");
                    eprintln!(
                        "CLAIMED payment_hash={:?} txid={:?}",
                        outcome.payment_hash, outcome.claim_txid
                    );
                    Ok(ExitCode::SUCCESS)
                }
                other => {
                    tracing::warn!(state = ?other, payment_hash = ?outcome.payment_hash, error = ?outcome.error_message, "swap ended without claiming");
                    eprintln!(
                        "{:?} payment_hash={:?} message={}",
                        other,
                        outcome.payment_hash,
                        outcome.error_message.unwrap_or_default()
                    );
                    Ok(ExitCode::FAILURE)
                }
            }
        }
    }
}

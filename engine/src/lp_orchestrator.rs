use std::time::Duration;

use swap_primitives::error::{SwapError, SwapResult};
use swap_primitives::hash::sha256;
use swap_primitives::htlc::HtlcTemplate;

use crate::channel::SubmarineChannelClient;
use crate::claim::claim_htlc;
use crate::config::SwapConfig;
use crate::node::BitcoinNodeClient;
use crate::rln::{PayStatus, PreimageStatus, RlnClient};
use crate::verifier::{verify_htlc_output, x_only_from_compressed_hex};

const AWAITING_DATA_MAX_ATTEMPTS: u32 = 1800;
const AWAITING_DATA_INTERVAL: Duration = Duration::from_millis(2000);
const PAYMENT_SETTLED_MAX_ATTEMPTS: u32 = 120;
const PAYMENT_SETTLED_INTERVAL: Duration = Duration::from_millis(5000);

/// LP-side state machine. `AWAITING_DATA` through `CLAIMED` in
/// order, or a terminal `Failed`/`TimedOut`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LpState {
    AwaitingData,
    Verified,
    Paying,
    PaymentSettled,
    Claimed,
    Failed,
    TimedOut,
}

#[derive(Debug, Clone)]
pub struct LpSwapOutcome {
    pub final_state: LpState,
    pub payment_hash: Option<String>,
    pub claim_txid: Option<String>,
    pub error_message: Option<String>,
}

/// Drives one full swap from the LP side: AWAITING_DATA -> ... -> CLAIMED
/// (or a terminal failure/timeout). `user_comm_url` is where the submarine-
/// data channel is fetched from (the `USER_COMM_URL` environment variable).
pub async fn run_lp_swap(
    config: &SwapConfig,
    node: &BitcoinNodeClient,
    rln: &RlnClient,
    user_comm_url: &str,
) -> SwapResult<LpSwapOutcome> {
    tracing::info!(role = "LP", state = ?LpState::AwaitingData, "waiting for submarine data");
    let channel_client = SubmarineChannelClient::new(user_comm_url)?;
    let data = match channel_client
        .poll_until_ready(AWAITING_DATA_MAX_ATTEMPTS, AWAITING_DATA_INTERVAL)
        .await
    {
        Ok(data) => data,
        Err(_) => {
            return Ok(LpSwapOutcome {
                final_state: LpState::TimedOut,
                payment_hash: None,
                claim_txid: None,
                error_message: Some("submarine data never became available".into()),
            });
        }
    };

    // VERIFIED
    let decoded = rln.decode(&data.invoice).await?;
    tracing::info!(role = "LP", state = ?LpState::Verified, payment_hash = %decoded.payment_hash, "submarine data received, verifying");

    let payment_hash_bytes: [u8; 32] = hex::decode(&decoded.payment_hash)
        .map_err(|e| SwapError::InvalidInput(format!("bad payment hash hex: {e}")))?
        .try_into()
        .map_err(|_| SwapError::InvalidInput("payment hash must be 32 bytes".into()))?;

    let lp_x_only = x_only_from_compressed_hex(&config.lp_pubkey_hex)?;
    let user_x_only = x_only_from_compressed_hex(&data.user_refund_pubkey_hex)?;

    let template = HtlcTemplate {
        payment_hash: payment_hash_bytes,
        lp_pubkey_x_only: lp_x_only,
        user_pubkey_x_only: user_x_only,
        t_lock: data.t_lock,
    };

    let funding_info = match verify_htlc_output(
        node,
        &data.funding_txid,
        data.funding_vout,
        &template,
        decoded.amt_msat,
        config.min_confs,
    )
    .await
    {
        Ok(info) => info,
        Err(e) => {
            return Ok(LpSwapOutcome {
                final_state: LpState::Failed,
                payment_hash: Some(decoded.payment_hash),
                claim_txid: None,
                error_message: Some(format!("htlc verification failed: {e}")),
            });
        }
    };

    // PAYING
    tracing::info!(role = "LP", state = ?LpState::Paying, payment_hash = %decoded.payment_hash, "paying invoice");
    let pay_result = rln.pay(&data.invoice).await?;
    if pay_result.status == PayStatus::Failed {
        return Ok(LpSwapOutcome {
            final_state: LpState::Failed,
            payment_hash: Some(decoded.payment_hash),
            claim_txid: None,
            error_message: Some("rln payment failed".into()),
        });
    }

    // PAYMENT_SETTLED
    tracing::info!(role = "LP", state = ?LpState::PaymentSettled, payment_hash = %decoded.payment_hash, "awaiting preimage");
    let mut preimage_hex: Option<String> = None;
    for attempt in 0..PAYMENT_SETTLED_MAX_ATTEMPTS {
        let preimage_result = rln.get_payment_preimage(&decoded.payment_hash).await?;
        match preimage_result.status {
            PreimageStatus::Succeeded => {
                if let Some(p) = preimage_result.preimage {
                    preimage_hex = Some(p);
                    break;
                }
            }
            PreimageStatus::Cancelled | PreimageStatus::Failed | PreimageStatus::Timeout => {
                return Ok(LpSwapOutcome {
                    final_state: LpState::Failed,
                    payment_hash: Some(decoded.payment_hash),
                    claim_txid: None,
                    error_message: Some(format!("preimage fetch ended in {:?}", preimage_result.status)),
                });
            }
            PreimageStatus::Pending | PreimageStatus::Claimable => {}
        }
        if attempt + 1 == PAYMENT_SETTLED_MAX_ATTEMPTS {
            return Ok(LpSwapOutcome {
                final_state: LpState::TimedOut,
                payment_hash: Some(decoded.payment_hash),
                claim_txid: None,
                error_message: Some("preimage never became available".into()),
            });
        }
        tokio::time::sleep(PAYMENT_SETTLED_INTERVAL).await;
    }

    let preimage_hex = preimage_hex.ok_or_else(|| {
        SwapError::InternalError("preimage poll loop exited without a preimage".into())
    })?;
    let preimage_bytes: [u8; 32] = hex::decode(&preimage_hex)
        .map_err(|e| SwapError::InvalidInput(format!("bad preimage hex: {e}")))?
        .try_into()
        .map_err(|_| SwapError::InvalidInput("preimage must be 32 bytes".into()))?;
    if sha256(&preimage_bytes) != payment_hash_bytes {
        return Ok(LpSwapOutcome {
            final_state: LpState::Failed,
            payment_hash: Some(decoded.payment_hash),
            claim_txid: None,
            error_message: Some("preimage does not hash to the expected payment hash".into()),
        });
    }

    // CLAIMED
    let claim_result = claim_htlc(
        node,
        &config.wif,
        config.network,
        &template,
        &preimage_bytes,
        &data.funding_txid,
        data.funding_vout,
        funding_info.amount_sat,
        config.fee_rate_sat_per_vb,
    )
    .await?;
    tracing::info!(role = "LP", state = ?LpState::Claimed, payment_hash = %decoded.payment_hash, txid = %claim_result.txid, "htlc claimed");

    Ok(LpSwapOutcome {
        final_state: LpState::Claimed,
        payment_hash: Some(decoded.payment_hash),
        claim_txid: Some(claim_result.txid),
        error_message: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preimage_mismatch_is_detected_before_claiming() {
        let preimage = [9u8; 32];
        let wrong_hash = sha256(&[1u8; 32]);
        assert_ne!(sha256(&preimage), wrong_hash);
    }
}

use std::time::Duration;

use rand::RngCore;

use swap_primitives::error::{SwapError, SwapResult};
use swap_primitives::hash::sha256;
use swap_primitives::htlc::{htlc_address, HtlcTemplate};
use swap_primitives::keys::derive_from_wif;

use crate::channel::{SubmarineChannelServer, SubmarineData};
use crate::config::SwapConfig;
use crate::deposit::build_and_broadcast_deposit;
use crate::node::BitcoinNodeClient;
use crate::rln::{InboundPaymentStatus, InvoiceStatus, RlnClient};
use crate::store::{HodlRecord, HodlStore};
use crate::verifier::x_only_from_compressed_hex;

const PUBLISHED_MAX_ATTEMPTS: u32 = 120;
const PUBLISHED_INTERVAL: Duration = Duration::from_millis(5000);

/// USER-side state machine. `DRAFT` through `SETTLED` in order,
/// or a terminal `Failed`/`TimedOut`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserState {
    Draft,
    Invoiced,
    FundingBuilt,
    FundingConfirmed,
    Published,
    WaitingClaimable,
    Settling,
    Settled,
    Failed,
    TimedOut,
}

#[derive(Debug, Clone)]
pub struct UserSwapOutcome {
    pub final_state: UserState,
    pub payment_hash: String,
    pub deposit_txid: Option<String>,
    pub error_message: Option<String>,
}

/// Drives one full swap from the USER side: DRAFT -> ... -> SETTLED (or a
/// terminal failure/timeout). `amount_sat` is the on-chain deposit amount;
/// `amt_msat` is the invoice amount, which callers must keep consistent
/// with it per the msat-to-sat conversion rule (round for amounts, ceiling for minimums).
pub async fn run_user_swap(
    config: &SwapConfig,
    node: &BitcoinNodeClient,
    rln: &RlnClient,
    store: &HodlStore,
    channel: &SubmarineChannelServer,
    amount_sat: u64,
    amt_msat: u64,
) -> SwapResult<UserSwapOutcome> {
    // DRAFT
    if (config.locktime_blocks as u64) * 600 <= config.hodl_expiry_sec + 3600 {
        return Err(SwapError::ConfigError(
            "LOCKTIME_BLOCKS * 600s must exceed HODL_EXPIRY_SEC + 3600s".into(),
        ));
    }

    let mut preimage = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut preimage);
    let payment_hash = sha256(&preimage);
    let payment_hash_hex = hex::encode(payment_hash);

    tracing::info!(role = "USER", state = ?UserState::Draft, payment_hash = %payment_hash_hex, "starting swap");

    let hodl_invoice = rln
        .invoice_hodl(&payment_hash_hex, config.hodl_expiry_sec, amt_msat)
        .await?;

    let now_ms = chrono::Utc::now().timestamp_millis().max(0) as u64;
    store.put(HodlRecord {
        payment_hash: payment_hash_hex.clone(),
        preimage: hex::encode(preimage),
        amount_msat: amt_msat,
        expiry_sec: config.hodl_expiry_sec,
        invoice: hodl_invoice.invoice.clone(),
        payment_secret: hodl_invoice.payment_secret.clone(),
        created_at_ms: now_ms,
    })?;

    // INVOICED
    tracing::info!(role = "USER", state = ?UserState::Invoiced, payment_hash = %payment_hash_hex, "hodl invoice created");
    let chain_tip = node.get_block_count().await?;
    let t_lock = (chain_tip as u32).saturating_add(config.locktime_blocks);

    let user_keys = derive_from_wif(&config.wif, config.network)?;
    let lp_x_only = x_only_from_compressed_hex(&config.lp_pubkey_hex)?;

    let template = HtlcTemplate {
        payment_hash,
        lp_pubkey_x_only: lp_x_only,
        user_pubkey_x_only: user_keys.x_only_pubkey,
        t_lock,
    };
    let address = htlc_address(&template, config.network)?;

    // FUNDING_BUILT
    tracing::info!(role = "USER", state = ?UserState::FundingBuilt, payment_hash = %payment_hash_hex, address = %address, "htlc address built");
    let deposit = build_and_broadcast_deposit(
        node,
        &config.wif,
        config.network,
        &address,
        amount_sat,
        config.fee_rate_sat_per_vb,
    )
    .await?;
    tracing::debug!(txid = %deposit.txid, "deposit broadcast");

    for attempt in 0..PUBLISHED_MAX_ATTEMPTS {
        let raw = node.get_raw_transaction(&deposit.txid).await?;
        if raw.confirmations >= config.min_confs {
            break;
        }
        if attempt + 1 == PUBLISHED_MAX_ATTEMPTS {
            return Ok(UserSwapOutcome {
                final_state: UserState::TimedOut,
                payment_hash: payment_hash_hex,
                deposit_txid: Some(deposit.txid),
                error_message: Some("deposit never reached MIN_CONFS confirmations".into()),
            });
        }
        tokio::time::sleep(PUBLISHED_INTERVAL).await;
    }

    // FUNDING_CONFIRMED
    tracing::info!(role = "USER", state = ?UserState::FundingConfirmed, payment_hash = %payment_hash_hex, "deposit confirmed");
    channel
        .publish(SubmarineData {
            invoice: hodl_invoice.invoice.clone(),
            funding_txid: deposit.txid.clone(),
            funding_vout: 0,
            user_refund_pubkey_hex: hex::encode(user_keys.compressed_pubkey.serialize()),
            t_lock,
        })
        .await;

    // PUBLISHED / WAITING_CLAIMABLE
    tracing::info!(role = "USER", state = ?UserState::Published, payment_hash = %payment_hash_hex, "submarine data published");
    let mut settled_already = false;
    let mut reached_claimable = false;
    for attempt in 0..PUBLISHED_MAX_ATTEMPTS {
        let payment = rln.get_payment(&payment_hash_hex).await?;
        if !payment.payment.inbound {
            tokio::time::sleep(PUBLISHED_INTERVAL).await;
            continue;
        }
        match payment.payment.status {
            InboundPaymentStatus::Claimable => {
                reached_claimable = true;
                break;
            }
            InboundPaymentStatus::Succeeded => {
                settled_already = true;
                break;
            }
            InboundPaymentStatus::Cancelled | InboundPaymentStatus::Failed => {
                return Ok(UserSwapOutcome {
                    final_state: UserState::Failed,
                    payment_hash: payment_hash_hex,
                    deposit_txid: Some(deposit.txid),
                    error_message: Some(format!("inbound payment ended in {:?}", payment.payment.status)),
                });
            }
            InboundPaymentStatus::Pending => {}
        }
        if attempt + 1 == PUBLISHED_MAX_ATTEMPTS {
            return Ok(UserSwapOutcome {
                final_state: UserState::TimedOut,
                payment_hash: payment_hash_hex,
                deposit_txid: Some(deposit.txid),
                error_message: Some("inbound payment never became claimable".into()),
            });
        }
        tokio::time::sleep(PUBLISHED_INTERVAL).await;
    }

    if reached_claimable {
        tracing::info!(role = "USER", state = ?UserState::WaitingClaimable, payment_hash = %payment_hash_hex, "payment is claimable, settling");
        // SETTLING
        rln.invoice_settle(&payment_hash_hex, &hex::encode(preimage)).await?;
    }

    // SETTLED
    tracing::info!(role = "USER", state = ?UserState::Settled, payment_hash = %payment_hash_hex, "swap settled");
    let _ = settled_already;
    for attempt in 0..PUBLISHED_MAX_ATTEMPTS {
        let status = rln.invoice_status(&hodl_invoice.invoice).await?;
        if matches!(
            status,
            InvoiceStatus::Succeeded | InvoiceStatus::Cancelled | InvoiceStatus::Failed | InvoiceStatus::Expired
        ) {
            tracing::info!(role = "USER", payment_hash = %payment_hash_hex, ?status, "invoice reached terminal status");
            break;
        }
        if attempt + 1 == PUBLISHED_MAX_ATTEMPTS {
            tracing::warn!(role = "USER", payment_hash = %payment_hash_hex, "invoice status never reached terminal state");
            break;
        }
        tokio::time::sleep(PUBLISHED_INTERVAL).await;
    }

    Ok(UserSwapOutcome {
        final_state: UserState::Settled,
        payment_hash: payment_hash_hex,
        deposit_txid: Some(deposit.txid),
        error_message: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locktime_safety_rule() {
        // LOCKTIME_BLOCKS=6 at 600s/block is 3600s, which does not exceed
        // HODL_EXPIRY_SEC(86400) + 3600 -- must be rejected (S5).
        let locktime_blocks: u64 = 6;
        let hodl_expiry_sec: u64 = 86_400;
        assert!(locktime_blocks * 600 <= hodl_expiry_sec + 3600);
    }

    #[test]
    fn locktime_288_blocks_is_safe_for_default_expiry() {
        let locktime_blocks: u64 = 288;
        let hodl_expiry_sec: u64 = 86_400;
        assert!(locktime_blocks * 600 > hodl_expiry_sec + 3600);
    }
}

use std::str::FromStr;

use bitcoin::taproot::LeafVersion;
use bitcoin::{Address, Amount, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Witness};

use swap_primitives::error::{SwapError, SwapResult};
use swap_primitives::htlc::{build_htlc, refund_control_block, HtlcTemplate, LEAF_VERSION};
use swap_primitives::utxo::{AddressKind, TX_OVERHEAD_VBYTES};

use crate::claim::estimate_fee_for_witness;

/// An unsigned skeleton for the refund-leaf spend: `nLockTime = tLock`,
/// an enabled-CLTV sequence, the refund tapleaf and control block
/// attached, and one output to the user's refund address. The caller
/// signs the tapscript input once `tLock` has matured and finalizes the
/// witness with `[sig, refundScript, controlBlock]` — there is no source
/// reference implementation for that last step, so this
/// builder stops at the unsigned transaction.
#[derive(Debug, Clone)]
pub struct RefundSkeleton {
    pub unsigned_tx: Transaction,
    pub refund_script: ScriptBuf,
    pub control_block: Vec<u8>,
    pub fee_sat: u64,
}

pub fn build_refund_skeleton(
    template: &HtlcTemplate,
    funding_txid: &str,
    funding_vout: u32,
    utxo_value_sat: u64,
    refund_address: &Address,
    fee_rate: f64,
) -> SwapResult<RefundSkeleton> {
    let parts = build_htlc(template)?;
    let control_block = refund_control_block(&parts);

    // No preimage element in the refund witness: script + control block only.
    let fee_sat = estimate_fee_for_witness(fee_rate, TX_OVERHEAD_VBYTES + 120.0 + 43.0 - 32.0);
    if utxo_value_sat <= fee_sat {
        return Err(SwapError::DustAfterFee(0));
    }
    let output_value = utxo_value_sat - fee_sat;
    if output_value < AddressKind::P2tr.dust_limit() {
        return Err(SwapError::DustAfterFee(output_value));
    }

    let funding_txid = bitcoin::Txid::from_str(funding_txid)
        .map_err(|e| SwapError::InvalidInput(format!("bad funding txid: {e}")))?;

    let _ = LeafVersion::from_consensus(LEAF_VERSION)
        .map_err(|e| SwapError::InternalError(format!("invalid leaf version: {e}")))?;

    let unsigned_tx = Transaction {
        version: bitcoin::transaction::Version::TWO,
        lock_time: bitcoin::absolute::LockTime::from_consensus(template.t_lock),
        input: vec![TxIn {
            previous_output: OutPoint {
                txid: funding_txid,
                vout: funding_vout,
            },
            script_sig: ScriptBuf::new(),
            // Strictly less than 0xffffffff to let nLockTime take effect.
            sequence: Sequence(0xffff_fffe),
            witness: Witness::new(),
        }],
        output: vec![TxOut {
            value: Amount::from_sat(output_value),
            script_pubkey: refund_address.script_pubkey(),
        }],
    };

    Ok(RefundSkeleton {
        unsigned_tx,
        refund_script: parts.refund_script,
        control_block,
        fee_sat,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::secp256k1::XOnlyPublicKey;
    use swap_primitives::htlc::INTERNAL_KEY;

    fn sample_template() -> HtlcTemplate {
        HtlcTemplate {
            payment_hash: swap_primitives::hash::sha256(b"refund-test"),
            lp_pubkey_x_only: *INTERNAL_KEY,
            user_pubkey_x_only: XOnlyPublicKey::from_slice(&[7u8; 32]).unwrap_or(*INTERNAL_KEY),
            t_lock: 800_000,
        }
    }

    #[test]
    fn locktime_matches_template_and_sequence_is_not_final() {
        let template = sample_template();
        let address = bitcoin::Address::p2tr(
            &bitcoin::secp256k1::Secp256k1::new(),
            *INTERNAL_KEY,
            None,
            bitcoin::KnownHrp::Regtest,
        );
        let skeleton =
            build_refund_skeleton(&template, &"11".repeat(32), 0, 100_000, &address, 5.0).unwrap();
        assert_eq!(
            skeleton.unsigned_tx.lock_time,
            bitcoin::absolute::LockTime::from_consensus(800_000)
        );
        assert!(skeleton.unsigned_tx.input[0].sequence.0 < 0xffff_ffff);
    }
}

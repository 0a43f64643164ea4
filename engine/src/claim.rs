use std::str::FromStr;

use bitcoin::key::Secp256k1;
use bitcoin::secp256k1::Message;
use bitcoin::sighash::{Prevouts, SighashCache, TapSighashType};
use bitcoin::taproot::LeafVersion;
use bitcoin::{Amount, OutPoint, ScriptBuf, Sequence, TapLeafHash, Transaction, TxIn, TxOut, Witness};

use swap_primitives::error::{SwapError, SwapResult};
use swap_primitives::hash::sha256;
use swap_primitives::htlc::{build_htlc, claim_control_block, HtlcTemplate, LEAF_VERSION};
use swap_primitives::keys::derive_from_wif;
use swap_primitives::network::NetworkTag;
use swap_primitives::utxo::{AddressKind, TX_OVERHEAD_VBYTES};

use crate::node::BitcoinNodeClient;

#[derive(Debug, Clone)]
pub struct ClaimResult {
    pub txid: String,
    pub hex: String,
    pub lp_address: String,
    pub fee_sat: u64,
}

/// Script-path spends the claim leaf, paying `utxo_value_sat` (minus fee)
/// to the LP's own Taproot address.
#[allow(clippy::too_many_arguments)]
pub async fn claim_htlc(
    node: &BitcoinNodeClient,
    lp_wif: &str,
    network: NetworkTag,
    template: &HtlcTemplate,
    preimage: &[u8; 32],
    funding_txid: &str,
    funding_vout: u32,
    utxo_value_sat: u64,
    fee_rate: f64,
) -> SwapResult<ClaimResult> {
    if sha256(preimage) != template.payment_hash {
        return Err(SwapError::PreimageMismatch);
    }

    let signer = derive_from_wif(lp_wif, network)?;
    let secp = Secp256k1::new();
    // `supports_schnorr` is a capability check: any valid secp256k1 secret
    // key can produce a BIP-340 keypair, so this never actually fails for
    // keys that passed `derive_from_wif`.
    if !swap_primitives::crypto::supports_schnorr(&secp, &signer.private_key) {
        return Err(SwapError::InvalidInput(
            "signer does not support Schnorr signing".into(),
        ));
    }

    let parts = build_htlc(template)?;
    let control_block = claim_control_block(&parts);

    let overhead_vbytes = TX_OVERHEAD_VBYTES + 120.0 + 43.0;
    let fee_sat = estimate_fee_for_witness(fee_rate, overhead_vbytes);
    if utxo_value_sat <= fee_sat {
        return Err(SwapError::DustAfterFee(0));
    }
    let output_value = utxo_value_sat - fee_sat;
    if output_value < AddressKind::P2tr.dust_limit() {
        return Err(SwapError::DustAfterFee(output_value));
    }

    let funding_txid = bitcoin::Txid::from_str(funding_txid)
        .map_err(|e| SwapError::InvalidInput(format!("bad funding txid: {e}")))?;

    let mut tx = Transaction {
        version: bitcoin::transaction::Version::TWO,
        lock_time: bitcoin::absolute::LockTime::ZERO,
        input: vec![TxIn {
            previous_output: OutPoint {
                txid: funding_txid,
                vout: funding_vout,
            },
            script_sig: ScriptBuf::new(),
            sequence: Sequence::ENABLE_RBF_NO_LOCKTIME,
            witness: Witness::new(),
        }],
        output: vec![TxOut {
            value: Amount::from_sat(output_value),
            script_pubkey: signer.taproot_address.script_pubkey(),
        }],
    };

    let prevouts = [TxOut {
        value: Amount::from_sat(utxo_value_sat),
        script_pubkey: parts.script_pubkey.clone(),
    }];

    let leaf_hash = TapLeafHash::from_script(&parts.claim_script, LeafVersion::from_consensus(LEAF_VERSION)
        .map_err(|e| SwapError::InternalError(format!("invalid leaf version: {e}")))?);

    let tx_snapshot = tx.clone();
    let mut cache = SighashCache::new(&tx_snapshot);
    let sighash = cache
        .taproot_script_spend_signature_hash(0, &Prevouts::All(&prevouts), leaf_hash, TapSighashType::Default)
        .map_err(|e| SwapError::InternalError(format!("sighash computation failed: {e}")))?;
    let message = Message::from_digest_slice(sighash.as_ref())
        .map_err(|e| SwapError::InternalError(format!("invalid sighash message: {e}")))?;

    let keypair = bitcoin::key::Keypair::from_secret_key(&secp, &signer.private_key);
    let signature = secp.sign_schnorr_no_aux_rand(&message, &keypair);

    // Witness stack order is exactly {sig, preimage, claimScript, controlBlock}.
    let mut witness = Witness::new();
    witness.push(signature.as_ref());
    witness.push(preimage);
    witness.push(parts.claim_script.as_bytes());
    witness.push(&control_block);
    tx.input[0].witness = witness;

    let hex = hex::encode(bitcoin::consensus::serialize(&tx));
    let txid = node.send_raw_transaction(&hex).await?;

    Ok(ClaimResult {
        txid,
        hex,
        lp_address: signer.taproot_address.to_string(),
        fee_sat,
    })
}

/// `max(1000, ceil(feeRate * overheadVbytes))`. Shared
/// with the refund builder, whose witness differs only by the missing
/// preimage element.
pub(crate) fn estimate_fee_for_witness(fee_rate: f64, overhead_vbytes: f64) -> u64 {
    ((fee_rate * overhead_vbytes).ceil() as u64).max(1000)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fee_never_below_minimum() {
        assert!(estimate_fee_for_witness(0.1, 163.0) >= 1000);
    }
}

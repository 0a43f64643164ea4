use bitcoin::key::Secp256k1;
use bitcoin::secp256k1::Message;
use bitcoin::sighash::{Prevouts, SighashCache, TapSighashType};
use bitcoin::{
    Address, Amount, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid, Witness,
};
use std::str::FromStr;

use swap_primitives::error::{SwapError, SwapResult};
use swap_primitives::keys::{derive_from_wif, tweak_key_path_private_key, DerivedKeys};
use swap_primitives::network::NetworkTag;
use swap_primitives::utxo::{select_utxos, AddressKind, CandidateUtxo};

use crate::node::BitcoinNodeClient;

/// Result of building, signing and broadcasting the on-chain deposit.
#[derive(Debug, Clone)]
pub struct DepositResult {
    pub txid: String,
    pub fee_sat: u64,
    pub change_sat: u64,
    pub change_address: Option<String>,
    pub input_count: usize,
    pub unsigned_tx_hex: String,
}

/// Builds, signs (key-path) and broadcasts the deposit transaction that
/// funds `htlc_address` with `amount_sat`, spending the signer's own
/// Taproot UTXOs.
pub async fn build_and_broadcast_deposit(
    node: &BitcoinNodeClient,
    wif: &str,
    network: NetworkTag,
    htlc_address: &Address,
    amount_sat: u64,
    fee_rate: f64,
) -> SwapResult<DepositResult> {
    let signer = derive_from_wif(wif, network)?;

    let script_hex = hex::encode(signer.taproot_address.script_pubkey().as_bytes());
    let scanned = node.scan_utxos_by_script(&script_hex).await?;
    let mut candidates = Vec::with_capacity(scanned.len());
    for u in scanned {
        let txid = Txid::from_str(&u.txid)
            .map_err(|e| SwapError::RpcError(format!("bad txid from scan: {e}")))?;
        candidates.push(CandidateUtxo {
            outpoint: OutPoint { txid, vout: u.vout },
            value_sat: u.value_sat,
            script_hex: u.script_hex,
        });
    }

    let selection = select_utxos(candidates, amount_sat, fee_rate, AddressKind::P2tr)?;

    let mut inputs = Vec::with_capacity(selection.selected.len());
    let mut input_values = Vec::with_capacity(selection.selected.len());
    let mut prevout_scripts = Vec::with_capacity(selection.selected.len());
    for utxo in &selection.selected {
        inputs.push(TxIn {
            previous_output: utxo.outpoint,
            script_sig: ScriptBuf::new(),
            sequence: Sequence::ENABLE_RBF_NO_LOCKTIME,
            witness: Witness::new(),
        });
        input_values.push(utxo.value_sat);
        prevout_scripts.push(signer.taproot_address.script_pubkey());
    }

    let mut outputs = vec![TxOut {
        value: Amount::from_sat(amount_sat),
        script_pubkey: htlc_address.script_pubkey(),
    }];
    let change_address = if selection.change_sat > 0 {
        outputs.push(TxOut {
            value: Amount::from_sat(selection.change_sat),
            script_pubkey: signer.taproot_address.script_pubkey(),
        });
        Some(signer.taproot_address.to_string())
    } else {
        None
    };

    let mut tx = Transaction {
        version: bitcoin::transaction::Version::TWO,
        lock_time: bitcoin::absolute::LockTime::ZERO,
        input: inputs,
        output: outputs,
    };

    sign_key_path_inputs(&mut tx, &signer, &prevout_scripts, &input_values)?;

    let unsigned_tx_hex = hex::encode(bitcoin::consensus::serialize(&tx));
    let txid = node.send_raw_transaction(&unsigned_tx_hex).await?;

    Ok(DepositResult {
        txid,
        fee_sat: selection.fee_sat,
        change_sat: selection.change_sat,
        change_address,
        input_count: selection.selected.len(),
        unsigned_tx_hex,
    })
}

/// Key-path-signs every input of `tx` in place using the tweaked signer
/// key (`privkey + TapTweak(xOnly, None)`), BIP-86 style.
fn sign_key_path_inputs(
    tx: &mut Transaction,
    signer: &DerivedKeys,
    prevout_scripts: &[ScriptBuf],
    input_values: &[u64],
) -> SwapResult<()> {
    let secp = Secp256k1::new();
    let tweaked_sk = tweak_key_path_private_key(&signer.private_key, &signer.x_only_pubkey)?;
    let keypair = bitcoin::key::Keypair::from_secret_key(&secp, &tweaked_sk);

    let prevouts: Vec<TxOut> = prevout_scripts
        .iter()
        .zip(input_values)
        .map(|(script, value)| TxOut {
            value: Amount::from_sat(*value),
            script_pubkey: script.clone(),
        })
        .collect();

    let tx_snapshot = tx.clone();
    let mut cache = SighashCache::new(&tx_snapshot);
    let mut witnesses = Vec::with_capacity(prevouts.len());
    for i in 0..prevouts.len() {
        let sighash = cache
            .taproot_key_spend_signature_hash(i, &Prevouts::All(&prevouts), TapSighashType::Default)
            .map_err(|e| SwapError::InternalError(format!("sighash computation failed: {e}")))?;
        let message = Message::from_digest_slice(sighash.as_ref())
            .map_err(|e| SwapError::InternalError(format!("invalid sighash message: {e}")))?;
        let signature = secp.sign_schnorr_no_aux_rand(&message, &keypair);

        let mut witness = Witness::new();
        witness.push(signature.as_ref());
        witnesses.push(witness);
    }

    for (input, witness) in tx.input.iter_mut().zip(witnesses) {
        input.witness = witness;
    }
    Ok(())
}

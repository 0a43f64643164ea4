use crate::crypto::is_valid_x_only_point;
use crate::error::{SwapError, SwapResult};
use crate::hash::{tap_branch_hash, tap_leaf_hash, tap_tweak_hash};
use bitcoin::hashes::Hash;
use bitcoin::opcodes::all::{
    OP_CHECKLOCKTIMEVERIFY, OP_CHECKSIG, OP_DROP, OP_EQUALVERIFY, OP_SHA256,
};
use bitcoin::script::Builder;
use bitcoin::secp256k1::XOnlyPublicKey;
use bitcoin::ScriptBuf;
use once_cell::sync::Lazy;

/// Leaf version used for both tapleaves, per BIP-342.
pub const LEAF_VERSION: u8 = 0xc0;

const INTERNAL_KEY_SEED: &[u8] = b"HODL_INVOICE_P2TR_HTLC_INTERNAL_KEY_v0";

/// The deterministic, provably-unspendable internal key shared by every
/// HTLC this engine builds. Found by SHA-256'ing the seed (and, on
/// subsequent attempts, the seed with a big-endian attempt counter
/// appended) until the digest is a valid x-only curve point.
pub static INTERNAL_KEY: Lazy<XOnlyPublicKey> =
    Lazy::new(|| derive_internal_key().expect("a valid internal key must exist within 256 attempts"));

fn derive_internal_key() -> SwapResult<XOnlyPublicKey> {
    use sha2::{Digest, Sha256};

    for attempt in 0u32..256 {
        let digest: [u8; 32] = if attempt == 0 {
            Sha256::digest(INTERNAL_KEY_SEED).into()
        } else {
            let mut data = INTERNAL_KEY_SEED.to_vec();
            data.extend_from_slice(&attempt.to_be_bytes());
            Sha256::digest(&data).into()
        };
        if is_valid_x_only_point(&digest) {
            return Ok(XOnlyPublicKey::from_slice(&digest)
                .expect("validated above"));
        }
    }
    Err(SwapError::InternalError(
        "no valid internal key found in 256 attempts".into(),
    ))
}

/// The data needed to fully reconstruct one HTLC's scripts and address.
#[derive(Debug, Clone)]
pub struct HtlcTemplate {
    pub payment_hash: [u8; 32],
    pub lp_pubkey_x_only: XOnlyPublicKey,
    pub user_pubkey_x_only: XOnlyPublicKey,
    pub t_lock: u32,
}

/// `OP_SHA256 <paymentHash> OP_EQUALVERIFY <lpPubkeyXOnly> OP_CHECKSIG`
pub fn claim_script(template: &HtlcTemplate) -> ScriptBuf {
    Builder::new()
        .push_opcode(OP_SHA256)
        .push_slice(template.payment_hash)
        .push_opcode(OP_EQUALVERIFY)
        .push_slice(template.lp_pubkey_x_only.serialize())
        .push_opcode(OP_CHECKSIG)
        .into_script()
}

/// `<tLock> OP_CHECKLOCKTIMEVERIFY OP_DROP <userPubkeyXOnly> OP_CHECKSIG`
pub fn refund_script(template: &HtlcTemplate) -> ScriptBuf {
    Builder::new()
        .push_int(template.t_lock as i64)
        .push_opcode(OP_CHECKLOCKTIMEVERIFY)
        .push_opcode(OP_DROP)
        .push_slice(template.user_pubkey_x_only.serialize())
        .push_opcode(OP_CHECKSIG)
        .into_script()
}

#[derive(Debug, Clone)]
pub struct HtlcAddressParts {
    pub claim_script: ScriptBuf,
    pub refund_script: ScriptBuf,
    pub claim_leaf_hash: [u8; 32],
    pub refund_leaf_hash: [u8; 32],
    pub merkle_root: [u8; 32],
    pub output_key: XOnlyPublicKey,
    pub output_key_parity_odd: bool,
    pub script_pubkey: ScriptBuf,
}

/// Builds the full set of derived values for an HTLC template: both leaf
/// scripts, the merkle root, the tweaked output key, and the 34-byte
/// scriptPubKey (`0x51 || outputKey`).
pub fn build_htlc(template: &HtlcTemplate) -> SwapResult<HtlcAddressParts> {
    let claim = claim_script(template);
    let refund = refund_script(template);

    let claim_leaf_hash = tap_leaf_hash(LEAF_VERSION, claim.as_bytes());
    let refund_leaf_hash = tap_leaf_hash(LEAF_VERSION, refund.as_bytes());
    let merkle_root = tap_branch_hash(&claim_leaf_hash, &refund_leaf_hash);

    let internal_key = *INTERNAL_KEY;
    let tweak = tap_tweak_hash(&internal_key.serialize(), Some(&merkle_root));

    let secp = bitcoin::secp256k1::Secp256k1::new();
    let (output_key, parity) = internal_key
        .add_tweak(&secp, &bitcoin::secp256k1::Scalar::from_be_bytes(tweak)
            .map_err(|e| SwapError::InternalError(format!("invalid tweak scalar: {e}")))?)
        .map_err(|e| SwapError::InternalError(format!("output key tweak failed: {e}")))?;

    let mut script_pubkey_bytes = vec![0x51u8];
    script_pubkey_bytes.extend_from_slice(&output_key.serialize());
    let script_pubkey = ScriptBuf::from_bytes(script_pubkey_bytes);

    Ok(HtlcAddressParts {
        claim_script: claim,
        refund_script: refund,
        claim_leaf_hash,
        refund_leaf_hash,
        merkle_root,
        output_key,
        output_key_parity_odd: parity == bitcoin::secp256k1::Parity::Odd,
        script_pubkey,
    })
}

/// The Taproot address for this HTLC on `network`.
pub fn htlc_address(
    template: &HtlcTemplate,
    network: crate::network::NetworkTag,
) -> SwapResult<bitcoin::Address> {
    let parts = build_htlc(template)?;
    let secp = bitcoin::secp256k1::Secp256k1::new();
    Ok(bitcoin::Address::p2tr(
        &secp,
        *INTERNAL_KEY,
        Some(bitcoin::taproot::TapNodeHash::from_byte_array(parts.merkle_root)),
        network.known_hrp(),
    ))
}

/// Control block for spending via the claim leaf:
/// `0xc0|parity(outputKey) || internalKey || siblingLeafHash`.
pub fn claim_control_block(parts: &HtlcAddressParts) -> Vec<u8> {
    let mut cb = Vec::with_capacity(65);
    let version_parity = LEAF_VERSION | (parts.output_key_parity_odd as u8);
    cb.push(version_parity);
    cb.extend_from_slice(&INTERNAL_KEY.serialize());
    cb.extend_from_slice(&parts.refund_leaf_hash);
    cb
}

/// Control block for spending via the refund leaf (mirror of the claim one).
pub fn refund_control_block(parts: &HtlcAddressParts) -> Vec<u8> {
    let mut cb = Vec::with_capacity(65);
    let version_parity = LEAF_VERSION | (parts.output_key_parity_odd as u8);
    cb.push(version_parity);
    cb.extend_from_slice(&INTERNAL_KEY.serialize());
    cb.extend_from_slice(&parts.claim_leaf_hash);
    cb
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_template() -> HtlcTemplate {
        let lp = XOnlyPublicKey::from_slice(&[1u8; 32]).unwrap_or_else(|_| *INTERNAL_KEY);
        let user = XOnlyPublicKey::from_slice(&[2u8; 32]).unwrap_or_else(|_| *INTERNAL_KEY);
        HtlcTemplate {
            payment_hash: crate::hash::sha256(b"preimage"),
            lp_pubkey_x_only: lp,
            user_pubkey_x_only: user,
            t_lock: 700_000,
        }
    }

    #[test]
    fn internal_key_is_deterministic_and_valid() {
        let key1 = derive_internal_key().unwrap();
        let key2 = derive_internal_key().unwrap();
        assert_eq!(key1, key2);
        assert_eq!(key1, *INTERNAL_KEY);
    }

    #[test]
    fn script_pubkey_is_34_bytes_starting_with_op_1() {
        let parts = build_htlc(&sample_template()).unwrap();
        let bytes = parts.script_pubkey.as_bytes();
        assert_eq!(bytes.len(), 34);
        assert_eq!(bytes[0], 0x51);
    }

    #[test]
    fn merkle_root_is_leaf_order_independent() {
        let a = crate::hash::sha256(b"leaf-claim");
        let b = crate::hash::sha256(b"leaf-refund");
        assert_eq!(tap_branch_hash(&a, &b), tap_branch_hash(&b, &a));
    }

    #[test]
    fn claim_script_contains_payment_hash_and_lp_pubkey() {
        let template = sample_template();
        let script = claim_script(&template);
        let bytes = script.as_bytes();
        assert!(windows_contain(bytes, &template.payment_hash));
        assert!(windows_contain(bytes, &template.lp_pubkey_x_only.serialize()));
    }

    fn windows_contain(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }
}

use crate::error::{SwapError, SwapResult};
use bitcoin::secp256k1::{PublicKey, Secp256k1, Verification, XOnlyPublicKey};

/// Parses a 66-hex-character compressed secp256k1 public key (0x02/0x03 prefix).
pub fn parse_compressed_pubkey_hex(hex_str: &str) -> SwapResult<PublicKey> {
    let bytes = hex::decode(hex_str)
        .map_err(|e| SwapError::InvalidInput(format!("pubkey hex: {e}")))?;
    if bytes.len() != 33 || (bytes[0] != 0x02 && bytes[0] != 0x03) {
        return Err(SwapError::InvalidInput(
            "compressed pubkey must be 33 bytes with a 0x02/0x03 prefix".into(),
        ));
    }
    PublicKey::from_slice(&bytes).map_err(|e| SwapError::InvalidInput(format!("pubkey: {e}")))
}

/// Drops the compression-sign byte and returns the x-only point, validating it lies on the curve.
pub fn compressed_to_x_only(pubkey: &PublicKey) -> XOnlyPublicKey {
    pubkey.x_only_public_key().0
}

pub fn parse_x_only_hex(hex_str: &str) -> SwapResult<XOnlyPublicKey> {
    let bytes = hex::decode(hex_str)
        .map_err(|e| SwapError::InvalidInput(format!("x-only pubkey hex: {e}")))?;
    XOnlyPublicKey::from_slice(&bytes)
        .map_err(|e| SwapError::InvalidInput(format!("x-only pubkey: {e}")))
}

/// Returns `true` when `candidate` is a valid x-only secp256k1 curve point.
pub fn is_valid_x_only_point(candidate: &[u8; 32]) -> bool {
    XOnlyPublicKey::from_slice(candidate).is_ok()
}

pub fn assert_valid_payment_hash(hex_str: &str) -> SwapResult<[u8; 32]> {
    let bytes = hex::decode(hex_str)
        .map_err(|e| SwapError::InvalidInput(format!("payment hash hex: {e}")))?;
    bytes
        .try_into()
        .map_err(|_| SwapError::InvalidInput("payment hash must be 32 bytes".into()))
}

/// A signer "supports Schnorr" when it can produce a BIP-340 keypair from its
/// secret key; every `bitcoin::secp256k1::SecretKey` can, so this amounts to
/// validating the key material rather than probing optional capability.
pub fn supports_schnorr<C: Verification>(
    secp: &Secp256k1<C>,
    secret_key: &bitcoin::secp256k1::SecretKey,
) -> bool {
    let _ = bitcoin::key::Keypair::from_secret_key(secp, secret_key);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_uncompressed_prefix() {
        let fake = "04".to_string() + &"00".repeat(64);
        assert!(parse_compressed_pubkey_hex(&fake).is_err());
    }

    #[test]
    fn rejects_wrong_length_payment_hash() {
        assert!(assert_valid_payment_hash("aabb").is_err());
    }
}

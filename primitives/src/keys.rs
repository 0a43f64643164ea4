use crate::error::{SwapError, SwapResult};
use crate::hash::tap_tweak_hash;
use crate::network::NetworkTag;
use bitcoin::secp256k1::{PublicKey, Secp256k1, SecretKey, XOnlyPublicKey};
use bitcoin::{Address, PrivateKey};

/// Everything derivable from a single WIF-encoded signing key.
#[derive(Debug, Clone)]
pub struct DerivedKeys {
    pub private_key: SecretKey,
    pub compressed_pubkey: PublicKey,
    pub x_only_pubkey: XOnlyPublicKey,
    pub taproot_address: Address,
}

/// Parses a WIF string and derives the compressed pubkey, x-only pubkey, and
/// the key-path-only (BIP-86) Taproot address for `network`.
pub fn derive_from_wif(wif: &str, network: NetworkTag) -> SwapResult<DerivedKeys> {
    let secp = Secp256k1::new();
    let private_key = PrivateKey::from_wif(wif)
        .map_err(|e| SwapError::InvalidInput(format!("invalid WIF: {e}")))?;
    if !private_key.compressed {
        return Err(SwapError::InvalidInput(
            "uncompressed WIF keys are not supported".into(),
        ));
    }

    let secret_key = private_key.inner;
    let compressed_pubkey = PublicKey::from_secret_key(&secp, &secret_key);
    let (x_only_pubkey, _parity) = compressed_pubkey.x_only_public_key();

    let taproot_address = Address::p2tr(&secp, x_only_pubkey, None, network.known_hrp());

    Ok(DerivedKeys {
        private_key: secret_key,
        compressed_pubkey,
        x_only_pubkey,
        taproot_address,
    })
}

/// Tweaks a private key for key-path spending of a Taproot output whose
/// internal key is this key's x-only point and whose merkle root is `None`
/// (BIP-86): `privkey' = privkey + TaggedHash("TapTweak", xOnly)`, negating
/// first if the untweaked x-only key had odd parity (BIP-341 key-path rule).
pub fn tweak_key_path_private_key(
    secret_key: &SecretKey,
    x_only: &XOnlyPublicKey,
) -> SwapResult<SecretKey> {
    tweak_private_key(secret_key, x_only, None)
}

/// General private-key tweak for a given internal key and optional script
/// merkle root, used for both key-path (merkle_root = None) and any future
/// script-tree-aware key-path spends.
pub fn tweak_private_key(
    secret_key: &SecretKey,
    x_only: &XOnlyPublicKey,
    merkle_root: Option<&[u8; 32]>,
) -> SwapResult<SecretKey> {
    let secp = Secp256k1::new();
    let keypair = bitcoin::key::Keypair::from_secret_key(&secp, secret_key);
    let (_, parity) = keypair.x_only_public_key();
    let secret_key = if parity == bitcoin::secp256k1::Parity::Odd {
        secret_key.negate()
    } else {
        *secret_key
    };

    let tweak = tap_tweak_hash(&x_only.serialize(), merkle_root);
    secret_key
        .add_tweak(
            &bitcoin::secp256k1::Scalar::from_be_bytes(tweak)
                .map_err(|e| SwapError::InternalError(format!("invalid tweak scalar: {e}")))?,
        )
        .map_err(|e| SwapError::InternalError(format!("tweak addition failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_taproot_address_for_regtest() {
        // A valid regtest WIF for a throwaway test key.
        let wif = "cVpPVruEDdmutPzisEsYvtST1usBR3ntr8pXSyt6D2YYqXRyPcFW";
        let derived = derive_from_wif(wif, NetworkTag::Regtest).unwrap();
        assert!(derived.taproot_address.to_string().starts_with("bcrt1p"));
    }

    #[test]
    fn rejects_uncompressed_wif() {
        let wif = "5HueCGU8rMjxEXxiPuD5BDku4MkFqeZyd4dZ1jvhTVqvbTLvyTJ";
        assert!(derive_from_wif(wif, NetworkTag::Mainnet).is_err());
    }
}

use sha2::{Digest, Sha256};

/// Plain SHA-256.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// BIP-340 tagged hash: `SHA256(SHA256(tag) || SHA256(tag) || msg)`.
pub fn tagged_hash(tag: &str, msg: &[u8]) -> [u8; 32] {
    let tag_hash = sha256(tag.as_bytes());
    let mut hasher = Sha256::new();
    hasher.update(tag_hash);
    hasher.update(tag_hash);
    hasher.update(msg);
    hasher.finalize().into()
}

pub fn tap_leaf_hash(leaf_version: u8, script: &[u8]) -> [u8; 32] {
    let mut buf = Vec::with_capacity(1 + 9 + script.len());
    buf.push(leaf_version);
    push_compact_size(&mut buf, script.len() as u64);
    buf.extend_from_slice(script);
    tagged_hash("TapLeaf", &buf)
}

pub fn tap_branch_hash(a: &[u8; 32], b: &[u8; 32]) -> [u8; 32] {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    let mut buf = [0u8; 64];
    buf[..32].copy_from_slice(lo);
    buf[32..].copy_from_slice(hi);
    tagged_hash("TapBranch", &buf)
}

/// `merkle_root` is `None` for a key-path-only (BIP-86) output, in which
/// case the tweak is taken over the internal key alone (BIP-341 `h` is the
/// empty byte string, not 32 zero bytes).
pub fn tap_tweak_hash(internal_key: &[u8; 32], merkle_root: Option<&[u8; 32]>) -> [u8; 32] {
    match merkle_root {
        Some(root) => {
            let mut buf = [0u8; 64];
            buf[..32].copy_from_slice(internal_key);
            buf[32..].copy_from_slice(root);
            tagged_hash("TapTweak", &buf)
        }
        None => tagged_hash("TapTweak", internal_key),
    }
}

fn push_compact_size(buf: &mut Vec<u8>, n: u64) {
    // Scripts here never approach 0xfd bytes, but implement the general rule.
    if n < 0xfd {
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(0xfd);
        buf.extend_from_slice(&(n as u16).to_le_bytes());
    } else if n <= 0xffff_ffff {
        buf.push(0xfe);
        buf.extend_from_slice(&(n as u32).to_le_bytes());
    } else {
        buf.push(0xff);
        buf.extend_from_slice(&n.to_le_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_known_vector() {
        let digest = sha256(b"");
        assert_eq!(
            hex::encode(digest),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn tap_branch_is_order_independent() {
        let a = sha256(b"leaf-a");
        let b = sha256(b"leaf-b");
        assert_eq!(tap_branch_hash(&a, &b), tap_branch_hash(&b, &a));
    }
}

use crate::error::{SwapError, SwapResult};
use std::fmt;
use std::str::FromStr;

/// The network tags this protocol is configured for, distinct from
/// `bitcoin::Network` so the engine controls the exact set of accepted
/// environment values independent of upstream crate additions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkTag {
    Regtest,
    Signet,
    Testnet,
    Mainnet,
}

impl NetworkTag {
    pub fn address_hrp(&self) -> &'static str {
        match self {
            NetworkTag::Regtest => "bcrt",
            NetworkTag::Signet | NetworkTag::Testnet => "tb",
            NetworkTag::Mainnet => "bc",
        }
    }

    pub fn as_bitcoin_network(&self) -> bitcoin::Network {
        match self {
            NetworkTag::Regtest => bitcoin::Network::Regtest,
            NetworkTag::Signet => bitcoin::Network::Signet,
            NetworkTag::Testnet => bitcoin::Network::Testnet,
            NetworkTag::Mainnet => bitcoin::Network::Bitcoin,
        }
    }

    pub fn known_hrp(&self) -> bitcoin::KnownHrp {
        bitcoin::KnownHrp::from(self.as_bitcoin_network())
    }
}

impl fmt::Display for NetworkTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NetworkTag::Regtest => "regtest",
            NetworkTag::Signet => "signet",
            NetworkTag::Testnet => "testnet",
            NetworkTag::Mainnet => "mainnet",
        };
        f.write_str(s)
    }
}

impl FromStr for NetworkTag {
    type Err = SwapError;

    fn from_str(s: &str) -> SwapResult<Self> {
        match s {
            "regtest" => Ok(NetworkTag::Regtest),
            "signet" => Ok(NetworkTag::Signet),
            "testnet" => Ok(NetworkTag::Testnet),
            "mainnet" => Ok(NetworkTag::Mainnet),
            other => Err(SwapError::ConfigError(format!(
                "unknown NETWORK value: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hrp_matches_network() {
        assert_eq!(NetworkTag::Regtest.address_hrp(), "bcrt");
        assert_eq!(NetworkTag::Mainnet.address_hrp(), "bc");
        assert_eq!(NetworkTag::Testnet.address_hrp(), "tb");
    }

    #[test]
    fn unknown_tag_is_config_error() {
        assert!(matches!(
            "devnet".parse::<NetworkTag>(),
            Err(SwapError::ConfigError(_))
        ));
    }
}

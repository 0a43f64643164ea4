use std::env;
use std::str::FromStr;

use swap_primitives::error::{SwapError, SwapResult};
use swap_primitives::network::NetworkTag;

/// The role a process is running as, selected by `CLIENT_ROLE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Lp,
}

impl FromStr for Role {
    type Err = SwapError;

    fn from_str(s: &str) -> SwapResult<Self> {
        match s {
            "USER" => Ok(Role::User),
            "LP" => Ok(Role::Lp),
            other => Err(SwapError::ConfigError(format!(
                "CLIENT_ROLE must be USER or LP, got {other}"
            ))),
        }
    }
}

/// Everything a role needs at process start, loaded once from the
/// environment and immutable thereafter.
#[derive(Debug, Clone)]
pub struct SwapConfig {
    pub role: Role,
    pub bitcoin_rpc_url: String,
    pub bitcoin_rpc_user: String,
    pub bitcoin_rpc_pass: String,
    pub wif: String,
    pub network: NetworkTag,
    pub min_confs: u32,
    pub locktime_blocks: u32,
    pub fee_rate_sat_per_vb: f64,
    pub lp_pubkey_hex: String,
    pub rln_base_url: String,
    pub rln_api_key: Option<String>,
    pub hodl_expiry_sec: u64,
    pub client_comm_port: u16,
    pub user_comm_url: Option<String>,
    pub hodl_store_path: Option<String>,
}

fn required(key: &str) -> SwapResult<String> {
    env::var(key).map_err(|_| SwapError::ConfigError(format!("missing environment variable {key}")))
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn parse_numeric<T: FromStr>(key: &str, raw: &str) -> SwapResult<T> {
    raw.parse::<T>()
        .map_err(|_| SwapError::ConfigError(format!("invalid value for {key}: {raw}")))
}

impl SwapConfig {
    /// Reads and validates every key of the environment contract. Role-
    /// conditional requirements (`USER_COMM_URL` only for `CLIENT_ROLE=LP`)
    /// are enforced here rather than deferred to first use.
    pub fn load() -> SwapResult<Self> {
        let role: Role = required("CLIENT_ROLE")?.parse()?;
        let network: NetworkTag = required("NETWORK")?.parse()?;

        let min_confs = parse_numeric("MIN_CONFS", &required("MIN_CONFS")?)?;
        let locktime_blocks = parse_numeric("LOCKTIME_BLOCKS", &required("LOCKTIME_BLOCKS")?)?;
        let fee_rate_sat_per_vb: f64 =
            parse_numeric("FEE_RATE_SAT_PER_VB", &required("FEE_RATE_SAT_PER_VB")?)?;
        if fee_rate_sat_per_vb <= 0.0 {
            return Err(SwapError::ConfigError(
                "FEE_RATE_SAT_PER_VB must be positive".into(),
            ));
        }

        let lp_pubkey_hex = required("LP_PUBKEY_HEX")?;
        swap_primitives::crypto::parse_compressed_pubkey_hex(&lp_pubkey_hex)?;

        let hodl_expiry_sec = optional("HODL_EXPIRY_SEC")
            .map(|v| parse_numeric("HODL_EXPIRY_SEC", &v))
            .transpose()?
            .unwrap_or(86_400);

        let client_comm_port = optional("CLIENT_COMM_PORT")
            .map(|v| parse_numeric("CLIENT_COMM_PORT", &v))
            .transpose()?
            .unwrap_or(9999);

        let user_comm_url = optional("USER_COMM_URL");
        if role == Role::Lp && user_comm_url.is_none() {
            return Err(SwapError::ConfigError(
                "USER_COMM_URL is required when CLIENT_ROLE=LP".into(),
            ));
        }

        Ok(Self {
            role,
            bitcoin_rpc_url: required("BITCOIN_RPC_URL")?,
            bitcoin_rpc_user: required("BITCOIN_RPC_USER")?,
            bitcoin_rpc_pass: required("BITCOIN_RPC_PASS")?,
            wif: required("WIF")?,
            network,
            min_confs,
            locktime_blocks,
            fee_rate_sat_per_vb,
            lp_pubkey_hex,
            rln_base_url: required("RLN_BASE_URL")?,
            rln_api_key: optional("RLN_API_KEY"),
            hodl_expiry_sec,
            client_comm_port,
            user_comm_url,
            hodl_store_path: optional("HODL_STORE_PATH"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parses_from_exact_case() {
        assert_eq!("USER".parse::<Role>().unwrap(), Role::User);
        assert_eq!("LP".parse::<Role>().unwrap(), Role::Lp);
        assert!("user".parse::<Role>().is_err());
    }
}

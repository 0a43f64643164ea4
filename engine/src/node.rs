use jsonrpc::Client;
use serde::Deserialize;
use serde_json::value::to_raw_value;

use swap_primitives::error::{SwapError, SwapResult};

/// The narrow set of `bitcoind` JSON-RPC operations the engine consumes.
/// Wraps the `jsonrpc` crate's synchronous client.
pub struct BitcoinNodeClient {
    client: Client,
}

#[derive(Debug, Clone)]
pub struct RawTxInfo {
    pub confirmations: u32,
    pub vout: Vec<RawTxOut>,
}

#[derive(Debug, Clone)]
pub struct RawTxOut {
    pub n: u32,
    pub value_btc: f64,
    pub script_pubkey_hex: String,
}

#[derive(Debug, Clone)]
pub struct TxOutResult {
    pub value_btc: f64,
    pub script_pubkey_hex: String,
}

#[derive(Debug, Clone)]
pub struct ScannedUtxo {
    pub txid: String,
    pub vout: u32,
    pub value_sat: u64,
    pub script_hex: String,
}

#[derive(Debug, Deserialize)]
struct RawTransactionResponse {
    confirmations: Option<u32>,
    vout: Vec<RawVoutResponse>,
}

#[derive(Debug, Deserialize)]
struct RawVoutResponse {
    value: f64,
    n: u32,
    #[serde(rename = "scriptPubKey")]
    script_pub_key: ScriptPubKeyResponse,
}

#[derive(Debug, Deserialize)]
struct ScriptPubKeyResponse {
    hex: String,
}

#[derive(Debug, Deserialize)]
struct GetTxOutResponse {
    value: f64,
    #[serde(rename = "scriptPubKey")]
    script_pub_key: ScriptPubKeyResponse,
}

#[derive(Debug, Deserialize)]
struct ScanTxOutSetResponse {
    unspents: Vec<ScanUnspent>,
}

#[derive(Debug, Deserialize)]
struct ScanUnspent {
    txid: String,
    vout: u32,
    #[serde(rename = "scriptPubKey")]
    script_pub_key: String,
    amount: f64,
}

impl BitcoinNodeClient {
    pub fn new(url: &str, user: &str, pass: &str) -> SwapResult<Self> {
        let client = Client::simple_http(url, Some(user.to_string()), Some(pass.to_string()))
            .map_err(|e| SwapError::RpcError(format!("failed to build bitcoin rpc client: {e}")))?;
        Ok(Self { client })
    }

    fn call<T: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        params: Option<&serde_json::value::RawValue>,
    ) -> SwapResult<T> {
        self.client
            .call(method, params)
            .map_err(|e| SwapError::RpcError(format!("{method} failed: {e}")))
    }

    pub async fn get_block_count(&self) -> SwapResult<u64> {
        self.call("getblockcount", None)
    }

    pub async fn get_raw_transaction(&self, txid: &str) -> SwapResult<RawTxInfo> {
        let params = to_raw_value(&(txid, true)).map_err(|e| SwapError::RpcError(e.to_string()))?;
        let resp: RawTransactionResponse = self.call("getrawtransaction", Some(&params))?;
        Ok(RawTxInfo {
            confirmations: resp.confirmations.unwrap_or(0),
            vout: resp
                .vout
                .into_iter()
                .map(|v| RawTxOut {
                    n: v.n,
                    value_btc: v.value,
                    script_pubkey_hex: v.script_pub_key.hex,
                })
                .collect(),
        })
    }

    /// `gettxout`; returns `None` when the output does not exist or is
    /// already spent (matching the node's own `requireUnspent` semantics).
    pub async fn get_transaction_output(&self, txid: &str, vout: u32) -> SwapResult<Option<TxOutResult>> {
        let params = to_raw_value(&(txid, vout)).map_err(|e| SwapError::RpcError(e.to_string()))?;
        let resp: Option<GetTxOutResponse> = self.call("gettxout", Some(&params))?;
        Ok(resp.map(|r| TxOutResult {
            value_btc: r.value,
            script_pubkey_hex: r.script_pub_key.hex,
        }))
    }

    pub async fn send_raw_transaction(&self, tx_hex: &str) -> SwapResult<String> {
        let params = to_raw_value(&[tx_hex]).map_err(|e| SwapError::RpcError(e.to_string()))?;
        self.call("sendrawtransaction", Some(&params))
    }

    /// `scantxoutset("start", ["raw(<script_hex>)"])`.
    pub async fn scan_utxos_by_script(&self, script_hex: &str) -> SwapResult<Vec<ScannedUtxo>> {
        let descriptor = format!("raw({script_hex})");
        let params =
            to_raw_value(&("start", [descriptor])).map_err(|e| SwapError::RpcError(e.to_string()))?;
        let resp: ScanTxOutSetResponse = self.call("scantxoutset", Some(&params))?;
        Ok(resp
            .unspents
            .into_iter()
            .map(|u| ScannedUtxo {
                txid: u.txid,
                vout: u.vout,
                value_sat: btc_to_sat(u.amount),
                script_hex: u.script_pub_key,
            })
            .collect())
    }
}

/// `round(btc * 1e8)`.
pub fn btc_to_sat(btc: f64) -> u64 {
    (btc * 1e8).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn btc_to_sat_rounds() {
        assert_eq!(btc_to_sat(0.0002), 20_000);
        assert_eq!(btc_to_sat(0.00019999), 20_000);
    }
}

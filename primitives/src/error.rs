use thiserror::Error;

/// The single error carrier shared by every layer of the swap engine.
///
/// Adapter modules wrap their native errors into one of these variants at
/// the boundary; nothing downstream matches on `reqwest`/`jsonrpc`/io types
/// directly.
#[derive(Debug, Error)]
pub enum SwapError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("funds unavailable: {0}")]
    FundsUnavailable(String),

    #[error("no utxos available for {0}")]
    NoUtxos(String),

    #[error("template mismatch: {0}")]
    TemplateMismatch(String),

    #[error("scriptPubKey mismatch: {0}")]
    ScriptPubKeyMismatch(String),

    #[error("amount too low: {0}")]
    AmountTooLow(String),

    #[error("output is dust after fee: {0} sat")]
    DustAfterFee(u64),

    #[error("preimage does not hash to the expected payment hash")]
    PreimageMismatch,

    #[error("bitcoin rpc error: {0}")]
    RpcError(String),

    #[error("rln error: {0}")]
    RlnError(String),

    #[error("operation timed out: {0}")]
    NetworkTimeout(String),

    #[error("internal error: {0}")]
    InternalError(String),

    #[error("hodl store error: {0}")]
    StoreError(String),

    #[error("submarine-data channel error: {0}")]
    ChannelError(String),
}

pub type SwapResult<T> = Result<T, SwapError>;

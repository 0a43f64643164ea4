use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use swap_primitives::error::{SwapError, SwapResult};

/// The minimal record USER publishes and LP fetches. Field names are
/// exact. `tLock` must flow verbatim: LP never recomputes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmarineData {
    pub invoice: String,
    #[serde(rename = "fundingTxid")]
    pub funding_txid: String,
    #[serde(rename = "fundingVout")]
    pub funding_vout: u32,
    #[serde(rename = "userRefundPubkeyHex")]
    pub user_refund_pubkey_hex: String,
    #[serde(rename = "tLock")]
    pub t_lock: u32,
}

/// USER-side publisher: a tiny `axum` server exposing `GET
/// /submarine-data`, 404 until `publish` is called, 200 + JSON after.
/// Publication happens exactly once, in-process.
#[derive(Clone)]
pub struct SubmarineChannelServer {
    data: Arc<RwLock<Option<SubmarineData>>>,
}

impl SubmarineChannelServer {
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(None)),
        }
    }

    pub async fn publish(&self, data: SubmarineData) {
        let mut guard = self.data.write().await;
        *guard = Some(data);
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/submarine-data", get(get_submarine_data))
            .with_state(self.clone())
    }

    pub async fn serve(&self, port: u16) -> SwapResult<()> {
        let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
            .await
            .map_err(|e| SwapError::ChannelError(format!("binding port {port}: {e}")))?;
        axum::serve(listener, self.router())
            .await
            .map_err(|e| SwapError::ChannelError(format!("submarine-data server exited: {e}")))
    }
}

impl Default for SubmarineChannelServer {
    fn default() -> Self {
        Self::new()
    }
}

async fn get_submarine_data(State(server): State<SubmarineChannelServer>) -> impl IntoResponse {
    match server.data.read().await.clone() {
        Some(data) => (StatusCode::OK, Json(data)).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// LP-side poller: polls `{base_url}/submarine-data` until it returns
/// 200, up to `max_attempts` times, `interval` apart.
pub struct SubmarineChannelClient {
    client: reqwest::Client,
    base_url: String,
}

impl SubmarineChannelClient {
    pub fn new(base_url: &str) -> SwapResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| SwapError::ChannelError(format!("failed to build http client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// One fetch attempt. `Ok(None)` means "not ready yet" (404).
    pub async fn fetch_once(&self) -> SwapResult<Option<SubmarineData>> {
        let url = format!("{}/submarine-data", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| SwapError::ChannelError(format!("fetching submarine data: {e}")))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(SwapError::ChannelError(format!(
                "submarine-data fetch returned {}",
                response.status()
            )));
        }
        let data = response
            .json::<SubmarineData>()
            .await
            .map_err(|e| SwapError::ChannelError(format!("unexpected submarine-data body: {e}")))?;
        Ok(Some(data))
    }

    pub async fn poll_until_ready(
        &self,
        max_attempts: u32,
        interval: Duration,
    ) -> SwapResult<SubmarineData> {
        for attempt in 0..max_attempts {
            if let Some(data) = self.fetch_once().await? {
                return Ok(data);
            }
            tracing::debug!(attempt, "submarine-data not ready yet");
            tokio::time::sleep(interval).await;
        }
        Err(SwapError::NetworkTimeout(
            "submarine-data channel never became ready".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn not_yet_published_is_none() {
        let server = SubmarineChannelServer::new();
        assert!(server.data.read().await.is_none());
    }

    #[tokio::test]
    async fn publish_makes_data_visible() {
        let server = SubmarineChannelServer::new();
        let data = SubmarineData {
            invoice: "lnbcrt1...".into(),
            funding_txid: "00".repeat(32),
            funding_vout: 0,
            user_refund_pubkey_hex: "02".to_string() + &"00".repeat(32),
            t_lock: 123,
        };
        server.publish(data.clone()).await;
        let stored = server.data.read().await.clone().unwrap();
        assert_eq!(stored.invoice, data.invoice);
    }
}

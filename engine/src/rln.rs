use std::time::Duration;

use serde::{Deserialize, Serialize};

use swap_primitives::error::{SwapError, SwapResult};

/// Typed, transport-agnostic facade over the RLN node's HTTP surface.
/// Every operation is one POST against a fixed path, JSON in and out.
pub struct RlnClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum PayStatus {
    Succeeded,
    Failed,
    Pending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum InboundPaymentStatus {
    Pending,
    Claimable,
    Succeeded,
    Cancelled,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum PreimageStatus {
    Pending,
    Claimable,
    Succeeded,
    Cancelled,
    Failed,
    Timeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum InvoiceStatus {
    Pending,
    Succeeded,
    Cancelled,
    Failed,
    Expired,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DecodedInvoice {
    pub payment_hash: String,
    pub amt_msat: u64,
    pub expires_at: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PayResult {
    pub status: PayStatus,
    pub payment_hash: String,
    pub payment_secret: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentInfo {
    pub inbound: bool,
    pub status: InboundPaymentStatus,
    pub preimage: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GetPaymentResult {
    pub payment: PaymentInfo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PreimageResult {
    pub status: PreimageStatus,
    pub preimage: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HodlInvoiceResult {
    pub invoice: String,
    pub payment_secret: String,
}

impl RlnClient {
    pub fn new(base_url: &str, api_key: Option<String>) -> SwapResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| SwapError::RlnError(format!("failed to build http client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    async fn post<B: Serialize, R: for<'de> Deserialize<'de>>(&self, path: &str, body: &B) -> SwapResult<R> {
        let mut request = self.client.post(format!("{}{}", self.base_url, path)).json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request
            .send()
            .await
            .map_err(|e| SwapError::RlnError(format!("{path} request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(SwapError::RlnError(format!(
                "{path} returned {status}: {text}"
            )));
        }

        response
            .json::<R>()
            .await
            .map_err(|e| SwapError::RlnError(format!("{path} returned unexpected body: {e}")))
    }

    pub async fn decode(&self, invoice: &str) -> SwapResult<DecodedInvoice> {
        self.post("/decodelninvoice", &serde_json::json!({ "invoice": invoice }))
            .await
    }

    pub async fn pay(&self, invoice: &str) -> SwapResult<PayResult> {
        self.post("/sendpayment", &serde_json::json!({ "invoice": invoice }))
            .await
    }

    pub async fn get_payment(&self, payment_hash: &str) -> SwapResult<GetPaymentResult> {
        self.post(
            "/getpayment",
            &serde_json::json!({ "paymentHash": payment_hash }),
        )
        .await
    }

    pub async fn get_payment_preimage(&self, payment_hash: &str) -> SwapResult<PreimageResult> {
        self.post(
            "/getpaymentpreimage",
            &serde_json::json!({ "paymentHash": payment_hash }),
        )
        .await
    }

    pub async fn invoice_hodl(
        &self,
        payment_hash: &str,
        expiry_sec: u64,
        amt_msat: u64,
    ) -> SwapResult<HodlInvoiceResult> {
        self.post(
            "/invoice/hodl",
            &serde_json::json!({
                "paymentHash": payment_hash,
                "expirySec": expiry_sec,
                "amtMsat": amt_msat,
            }),
        )
        .await
    }

    pub async fn invoice_settle(&self, payment_hash: &str, preimage: &str) -> SwapResult<()> {
        let _: serde_json::Value = self
            .post(
                "/invoice/settle",
                &serde_json::json!({
                    "paymentHash": payment_hash,
                    "paymentPreimage": preimage,
                }),
            )
            .await?;
        Ok(())
    }

    pub async fn invoice_cancel(&self, payment_hash: &str) -> SwapResult<()> {
        let _: serde_json::Value = self
            .post(
                "/invoice/cancel",
                &serde_json::json!({ "paymentHash": payment_hash }),
            )
            .await?;
        Ok(())
    }

    pub async fn invoice_status(&self, invoice: &str) -> SwapResult<InvoiceStatus> {
        #[derive(Deserialize)]
        struct Resp {
            status: InvoiceStatus,
        }
        let resp: Resp = self
            .post("/invoicestatus", &serde_json::json!({ "invoice": invoice }))
            .await?;
        Ok(resp.status)
    }
}

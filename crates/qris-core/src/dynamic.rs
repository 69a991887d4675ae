//! Boundary types for the remote dynamic-QRIS service
//!
//! The service embeds a transaction amount into a merchant's static
//! payload. Transport is up to the host page; this module only shapes the
//! request query and reads the response JSON.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("response carries no QR payload")]
    MissingPayload,
    #[error("invalid response JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Request parameters for one dynamic code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DynamicRequest<'a> {
    /// The merchant's static payload, which the service uses as identifier.
    pub qris: &'a str,
    /// Target amount in whole rupiah, service fee included.
    pub amount: u64,
}

impl DynamicRequest<'_> {
    /// Query string for the service endpoint.
    pub fn to_query(&self) -> String {
        format!(
            "qris={}&nominal={}",
            urlencoding::encode(self.qris),
            self.amount
        )
    }
}

/// A usable service response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DynamicQris {
    pub payload: String,
    /// Display-name override some gateways return.
    pub merchant: Option<String>,
}

#[derive(Deserialize)]
struct RawResponse {
    #[serde(rename = "QR")]
    qr_upper: Option<String>,
    qr: Option<String>,
    qris: Option<String>,
    merchant: Option<String>,
}

/// Reads a service response. The payload may arrive under `QR`, `qr` or
/// `qris`, in that priority. When all three are absent the request failed;
/// the caller should keep showing its last static payload.
pub fn parse_response(json: &str) -> Result<DynamicQris, ServiceError> {
    let raw: RawResponse = serde_json::from_str(json)?;
    let payload = raw
        .qr_upper
        .or(raw.qr)
        .or(raw.qris)
        .ok_or(ServiceError::MissingPayload)?;

    Ok(DynamicQris {
        payload,
        merchant: raw.merchant,
    })
}

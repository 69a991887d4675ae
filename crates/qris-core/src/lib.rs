//! QRIS Display Core
//!
//! Library behind a merchant-facing QRIS (Indonesian EMV QR) payment
//! display:
//! - EMV TLV codec: field extraction and the canonical static rebuild
//! - CRC16 engine for the tag-63 checksum
//! - Merchant configuration and service-fee math
//! - Boundaries for the dynamic-QRIS service, QR rendering and decoding

pub mod config;
pub mod crc;
pub mod decode;
pub mod dynamic;
pub mod fee;
pub mod payload;
pub mod render;
pub mod tlv;

pub use config::{ConfigError, MerchantConfig, ServiceFeeConfig, CONFIG_KEY};
pub use decode::DecodeError;
pub use dynamic::{DynamicQris, DynamicRequest, ServiceError};
pub use fee::{quote, AmountError, FeeBreakdown};
pub use payload::{
    find_tag, is_static, merchant_name, to_static, validate_crc, PayloadError, QrisData,
};
pub use render::{render_image, render_png, ErrorCorrection, RenderError, RenderOptions};
pub use tlv::{TlvError, TlvRecord, TlvStream};

use thiserror::Error;

/// Aggregate error for the display flow.
#[derive(Error, Debug)]
pub enum QrisError {
    #[error(transparent)]
    Payload(#[from] PayloadError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Amount(#[from] AmountError),
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Display-page flow with the merchant config threaded explicitly.
///
/// Holds no other state: every payload shown to a customer is derived from
/// the config on demand, and a failed dynamic request leaves the static
/// payload untouched.
pub struct QrisDisplay {
    config: MerchantConfig,
    render: RenderOptions,
}

impl Default for QrisDisplay {
    fn default() -> Self {
        Self::new(MerchantConfig::default())
    }
}

impl QrisDisplay {
    pub fn new(config: MerchantConfig) -> Self {
        Self {
            config,
            render: RenderOptions::default(),
        }
    }

    pub fn with_render_options(config: MerchantConfig, render: RenderOptions) -> Self {
        Self { config, render }
    }

    pub fn config(&self) -> &MerchantConfig {
        &self.config
    }

    /// The payload shown at rest: always the canonical static form, even
    /// when the configured string was dynamic or carried a stale CRC.
    pub fn static_payload(&self) -> String {
        payload::to_static(&self.config.qris_static)
    }

    /// Merchant name embedded in the payload, falling back to the
    /// configured name when the payload carries no tag 59.
    pub fn merchant_name(&self) -> String {
        match payload::merchant_name(&self.config.qris_static) {
            Ok(name) => name.to_string(),
            Err(e) => {
                log::warn!("no merchant name in payload ({e}), using configured name");
                self.config.merchant_name.clone()
            }
        }
    }

    /// PNG of the static code.
    pub fn render_static(&self) -> Result<Vec<u8>, QrisError> {
        Ok(render::render_png(&self.static_payload(), &self.render)?)
    }

    /// Fee breakdown for a customer-entered amount.
    pub fn quote(&self, amount: u64) -> Result<FeeBreakdown, QrisError> {
        Ok(fee::quote(&self.config, amount)?)
    }

    /// Request query for the dynamic-QRIS service: the static identifier
    /// plus the fee-adjusted total.
    pub fn dynamic_query(&self, amount: u64) -> Result<String, QrisError> {
        let breakdown = fee::quote(&self.config, amount)?;
        let static_payload = self.static_payload();
        let request = DynamicRequest {
            qris: &static_payload,
            amount: breakdown.total,
        };
        Ok(request.to_query())
    }

    /// Reads a dynamic-service response. On failure the last static
    /// payload stays valid; nothing is cleared here.
    pub fn accept_dynamic(&self, response_json: &str) -> Result<DynamicQris, QrisError> {
        Ok(dynamic::parse_response(response_json)?)
    }
}

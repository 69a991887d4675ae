//! Merchant configuration
//!
//! The display and setup pages share one persisted record: a JSON object
//! stored under the `qrisConfig` key of a key-value store (localStorage in
//! the browser build). Absent or unparsable data falls back to the
//! built-in default. The config is always passed explicitly; nothing in
//! this crate caches it globally.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::payload::{self, PayloadError};

/// Key the config record is stored under.
pub const CONFIG_KEY: &str = "qrisConfig";

/// Built-in fallback payload, a real static QRIS.
pub const DEFAULT_QRIS: &str = "00020101021126650013ID.CO.BCA.WWW011893600014000205735802150008850020573580303UMI51440014ID.CO.QRIS.WWW0215ID10232795448530303UMI5204581453033605802ID5918SATE LOK LOK KOREA6006MALANG61056515362070703A0163047EA0";

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("static QRIS payload must not be empty")]
    EmptyPayload,
    #[error("could not read a merchant name from the payload: {0}")]
    MerchantName(PayloadError),
    #[error("minimum transaction must be at least 1")]
    MinTransaction,
    #[error("service fee percentage {0} outside 0-100")]
    FeePercentage(f64),
}

/// Service-fee rule: `percentage` percent on amounts of at least
/// `min_amount`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceFeeConfig {
    pub min_amount: u64,
    pub percentage: f64,
}

/// Per-merchant settings, persisted as camelCase JSON.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MerchantConfig {
    pub merchant_name: String,
    pub qris_static: String,
    pub min_transaction: u64,
    pub service_fee: ServiceFeeConfig,
}

impl Default for MerchantConfig {
    fn default() -> Self {
        Self {
            merchant_name: "SATE LOK-LOK KOREA".to_string(),
            qris_static: DEFAULT_QRIS.to_string(),
            min_transaction: 1,
            service_fee: ServiceFeeConfig {
                min_amount: 500_000,
                percentage: 0.7,
            },
        }
    }
}

impl MerchantConfig {
    /// Loads a stored record, falling back to the default when the record
    /// is absent or does not deserialize.
    pub fn load(stored: Option<&str>) -> Self {
        match stored {
            Some(json) => match serde_json::from_str(json) {
                Ok(config) => config,
                Err(e) => {
                    log::warn!("stored config unreadable, using default: {e}");
                    Self::default()
                }
            },
            None => Self::default(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.qris_static.trim().is_empty() {
            return Err(ConfigError::EmptyPayload);
        }
        if self.min_transaction < 1 {
            return Err(ConfigError::MinTransaction);
        }
        if !(0.0..=100.0).contains(&self.service_fee.percentage) {
            return Err(ConfigError::FeePercentage(self.service_fee.percentage));
        }
        Ok(())
    }

    /// Builds the canonical config from setup-form input.
    ///
    /// The submitted payload (hand-typed or decoded from a photo) is
    /// rewritten to its static form and the merchant name is read back out
    /// of the result, so whatever gets persisted is already the payload
    /// the display page will render.
    pub fn from_submitted(
        raw_qris: &str,
        min_transaction: u64,
        service_fee: ServiceFeeConfig,
    ) -> Result<Self, ConfigError> {
        let trimmed = raw_qris.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::EmptyPayload);
        }

        let qris_static = payload::to_static(trimmed);
        let merchant_name = payload::merchant_name(&qris_static)
            .map_err(ConfigError::MerchantName)?
            .to_string();

        let config = Self {
            merchant_name,
            qris_static,
            min_transaction,
            service_fee,
        };
        config.validate()?;
        Ok(config)
    }
}

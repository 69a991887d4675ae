//! Service-fee math for dynamic payments
//!
//! The fee is charged to the customer on top of the entered amount, so the
//! dynamic code embeds `total`, not `amount`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::MerchantConfig;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountError {
    #[error("amount {amount} is below the minimum transaction of {minimum}")]
    BelowMinimum { amount: u64, minimum: u64 },
}

/// What the customer ends up paying.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FeeBreakdown {
    pub amount: u64,
    pub service_fee: u64,
    pub total: u64,
}

impl FeeBreakdown {
    pub fn has_fee(&self) -> bool {
        self.service_fee > 0
    }
}

/// Applies the configured service fee to a payment amount.
///
/// The fee kicks in at `service_fee.min_amount` and is rounded up to the
/// next whole rupiah. Amounts below the merchant's transaction minimum are
/// rejected.
pub fn quote(config: &MerchantConfig, amount: u64) -> Result<FeeBreakdown, AmountError> {
    if amount < config.min_transaction {
        return Err(AmountError::BelowMinimum {
            amount,
            minimum: config.min_transaction,
        });
    }

    let service_fee = if amount >= config.service_fee.min_amount {
        let rate = config.service_fee.percentage / 100.0;
        (amount as f64 * rate).ceil() as u64
    } else {
        0
    };

    Ok(FeeBreakdown {
        amount,
        service_fee,
        total: amount + service_fee,
    })
}

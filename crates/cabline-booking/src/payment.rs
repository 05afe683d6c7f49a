// SPDX-FileCopyrightText: 2026 Cabline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! UPI payment links and inbound payment confirmation.

use std::sync::Arc;
use std::time::Duration;

use cabline_config::model::PaymentConfig;
use cabline_core::model::{PaymentStatus, Ride};
use cabline_core::{CablineError, NotificationGateway, PaymentLinks, StorageAdapter};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use tracing::info;

use crate::messages;
use crate::reply::deliver_all;

/// Builds `upi://pay` deep links addressed to the configured VPA.
#[derive(Debug, Clone)]
pub struct UpiPaymentLinks {
    vpa: String,
    payee_name: String,
}

impl UpiPaymentLinks {
    pub fn new(vpa: impl Into<String>, payee_name: impl Into<String>) -> Self {
        Self {
            vpa: vpa.into(),
            payee_name: payee_name.into(),
        }
    }

    pub fn from_config(config: &PaymentConfig) -> Self {
        Self::new(&config.upi_vpa, &config.upi_payee_name)
    }
}

impl PaymentLinks for UpiPaymentLinks {
    fn create_payment_reference(
        &self,
        phone: &str,
        amount: f64,
        ride_id: i64,
    ) -> Result<String, CablineError> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(CablineError::Payment(format!(
                "invalid amount {amount} for ride {ride_id}"
            )));
        }
        Ok(format!(
            "upi://pay?pa={}&pn={}&am={amount:.2}&cu=INR&tr=RIDE{ride_id}&tn={}",
            encode_query_value(&self.vpa),
            encode_query_value(&self.payee_name),
            encode_query_value(&format!("Ride {ride_id} for {phone}")),
        ))
    }
}

/// Everything outside the URI unreserved set, except `@` which VPAs carry.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'@');

fn encode_query_value(value: &str) -> String {
    utf8_percent_encode(value, QUERY_VALUE).to_string()
}

/// Marks the payer's most recent ride paid and thanks the customer.
///
/// Returns the ride that was updated, or `None` when the phone has no ride.
pub async fn record_online_payment(
    storage: &Arc<dyn StorageAdapter>,
    notifier: &Arc<dyn NotificationGateway>,
    phone: &str,
    timeout: Duration,
) -> Result<Option<Ride>, CablineError> {
    let Some(mut ride) = storage.latest_ride_for_phone(phone).await? else {
        return Ok(None);
    };
    if ride.payment_status != PaymentStatus::Paid {
        storage.set_payment_status(ride.id, PaymentStatus::Paid).await?;
        ride.payment_status = PaymentStatus::Paid;
        info!(ride_id = ride.id, "online payment recorded");
        deliver_all(notifier.as_ref(), &[messages::payment_received(&ride)], timeout).await;
    }
    Ok(Some(ride))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upi_link_carries_amount_and_ride() {
        let links = UpiPaymentLinks::new("cabline@upi", "Cabline Cabs");
        let link = links
            .create_payment_reference("919000000001", 126.0, 42)
            .unwrap();
        assert!(link.starts_with("upi://pay?pa=cabline@upi&pn=Cabline%20Cabs&am=126.00&cu=INR"));
        assert!(link.contains("tr=RIDE42"));
        assert!(link.contains("tn=Ride%2042%20for%20919000000001"));
    }

    #[test]
    fn non_positive_amount_is_rejected() {
        let links = UpiPaymentLinks::new("cabline@upi", "Cabline");
        assert!(matches!(
            links.create_payment_reference("9190", 0.0, 1),
            Err(CablineError::Payment(_))
        ));
        assert!(links.create_payment_reference("9190", f64::NAN, 1).is_err());
    }
}

// SPDX-FileCopyrightText: 2026 Cabline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fare and invoice arithmetic.
//!
//! Money is handled in integer paise internally so that tax and totals never
//! drift by a rounding step. Public values are rupees rounded to two places.

use serde::{Deserialize, Serialize};

/// Rounds a rupee amount to whole paise.
fn to_paise(rupees: f64) -> i64 {
    (rupees * 100.0).round() as i64
}

fn to_rupees(paise: i64) -> f64 {
    paise as f64 / 100.0
}

/// Fare for a route: `distance_km * rate_per_km`, rounded to two decimals.
pub fn compute_fare(distance_km: f64, rate_per_km: f64) -> f64 {
    to_rupees(to_paise(distance_km * rate_per_km))
}

/// Breakdown shown to the customer and on the admin invoice view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub fare: f64,
    /// Coupon amount, capped at the fare. Tax applies after it.
    #[serde(default)]
    pub discount: f64,
    pub tax_rate_percent: f64,
    pub tax: f64,
    pub total: f64,
}

impl Invoice {
    pub fn new(fare: f64, tax_rate_percent: f64) -> Self {
        Self::with_discount(fare, 0.0, tax_rate_percent)
    }

    pub fn with_discount(fare: f64, discount: f64, tax_rate_percent: f64) -> Self {
        let fare_paise = to_paise(fare);
        let discount_paise = to_paise(discount).clamp(0, fare_paise.max(0));
        let taxable = fare_paise - discount_paise;
        let tax_paise = (taxable as f64 * tax_rate_percent / 100.0).round() as i64;
        Self {
            fare: to_rupees(fare_paise),
            discount: to_rupees(discount_paise),
            tax_rate_percent,
            tax: to_rupees(tax_paise),
            total: to_rupees(taxable + tax_paise),
        }
    }
}

/// Formats a rupee amount the way it appears in chat messages, e.g. `₹126.00`.
pub fn format_inr(amount: f64) -> String {
    format!("₹{amount:.2}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn ten_km_sedan_fare() {
        assert_eq!(compute_fare(10.0, 12.0), 120.0);
    }

    #[test]
    fn fare_rounds_to_paise() {
        assert_eq!(compute_fare(12.345, 10.0), 123.45);
        assert_eq!(compute_fare(3.3333, 15.0), 50.0);
    }

    #[test]
    fn invoice_adds_five_percent_tax() {
        let invoice = Invoice::new(120.0, 5.0);
        assert_eq!(invoice.fare, 120.0);
        assert_eq!(invoice.tax, 6.0);
        assert_eq!(invoice.total, 126.0);
    }

    #[test]
    fn discount_comes_off_before_tax() {
        let invoice = Invoice::with_discount(120.0, 20.0, 5.0);
        assert_eq!(invoice.discount, 20.0);
        assert_eq!(invoice.tax, 5.0);
        assert_eq!(invoice.total, 105.0);
    }

    #[test]
    fn discount_never_exceeds_fare() {
        let invoice = Invoice::with_discount(24.0, 30.0, 5.0);
        assert_eq!(invoice.discount, 24.0);
        assert_eq!(invoice.tax, 0.0);
        assert_eq!(invoice.total, 0.0);
    }

    #[test]
    fn format_inr_uses_two_decimals() {
        assert_eq!(format_inr(126.0), "₹126.00");
        assert_eq!(format_inr(49.5), "₹49.50");
    }

    proptest! {
        #[test]
        fn total_is_fare_plus_tax(fare_paise in 0i64..10_000_000, rate in 0u32..30) {
            let invoice = Invoice::new(fare_paise as f64 / 100.0, rate as f64);
            let sum = to_paise(invoice.fare) - to_paise(invoice.discount) + to_paise(invoice.tax);
            prop_assert_eq!(to_paise(invoice.total), sum);
            prop_assert!(invoice.tax >= 0.0);
        }
    }
}

// SPDX-FileCopyrightText: 2026 Cabline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Payment reference generation.

use crate::error::CablineError;

/// Produces an opaque payment link or reference for a ride total.
pub trait PaymentLinks: Send + Sync + 'static {
    fn create_payment_reference(
        &self,
        phone: &str,
        amount: f64,
        ride_id: i64,
    ) -> Result<String, CablineError>;
}

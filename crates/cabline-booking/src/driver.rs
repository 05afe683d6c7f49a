// SPDX-FileCopyrightText: 2026 Cabline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Driver trip workflow: assigned → enroute → at pickup → in progress → completed.
//!
//! Each button press is a compare-and-set on the ride status scoped to the
//! pressing driver, so stale or foreign buttons change nothing.

use cabline_core::{CablineError, Invoice};
use cabline_intent::DriverStep;
use tracing::{debug, info};

use crate::engine::ConversationEngine;
use crate::messages;
use crate::reply::Outbound;

impl ConversationEngine {
    pub(crate) async fn driver_action(
        &self,
        phone: &str,
        step: DriverStep,
        ride_id: i64,
    ) -> Result<Vec<Outbound>, CablineError> {
        let storage = &self.services.storage;
        let Some(driver) = storage.get_driver_by_phone(phone).await? else {
            debug!(phone, "driver button from unknown phone");
            return Ok(vec![messages::drivers_only(phone)]);
        };

        let advanced = storage
            .advance_ride(
                ride_id,
                Some(driver.id),
                step.from_status(),
                step.to_status(),
                self.services.clock.now(),
            )
            .await?;
        let Some(ride) = advanced else {
            info!(ride_id, driver_id = driver.id, step = %step, "driver step rejected");
            return Ok(vec![messages::driver_step_rejected(phone, ride_id)]);
        };

        info!(ride_id, driver_id = driver.id, status = %ride.status, "driver step recorded");
        let invoice = (step == DriverStep::Paid).then(|| {
            Invoice::with_discount(ride.fare, ride.discount, self.settings.tax_rate_percent)
        });
        Ok(vec![
            messages::driver_step_done(phone, step, ride_id),
            messages::customer_step_notice(&ride, step, invoice.as_ref()),
        ])
    }
}

// SPDX-FileCopyrightText: 2026 Cabline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Driver and vehicle allocation.
//!
//! All claims go through the storage adapter's transactional primitives,
//! which compare-and-set the driver and vehicle status. A lost race is
//! reported as "nothing available" rather than as an error, so the immediate
//! booking path and the background sweep can share the same calls.

use std::sync::Arc;

use cabline_core::model::{AssignedRide, ManualAssignOutcome, NewRide, Ride};
use cabline_core::{CablineError, Clock, NotificationGateway, StorageAdapter, normalize_phone};
use tracing::{debug, info, warn};

use crate::messages;
use crate::reply::{Outbound, deliver_all};
use crate::settings::BookingSettings;

pub struct AssignmentEngine {
    storage: Arc<dyn StorageAdapter>,
    notifier: Arc<dyn NotificationGateway>,
    clock: Arc<dyn Clock>,
    settings: BookingSettings,
}

impl AssignmentEngine {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        notifier: Arc<dyn NotificationGateway>,
        clock: Arc<dyn Clock>,
        settings: BookingSettings,
    ) -> Self {
        Self {
            storage,
            notifier,
            clock,
            settings,
        }
    }

    /// Creates the ride already bound to a free driver and vehicle.
    ///
    /// Returns `None`, with no ride row written, when no pair is free. The
    /// caller owns customer messaging; the driver is notified later, once the
    /// customer picks a payment mode.
    pub async fn assign_immediate(
        &self,
        ride: &NewRide,
    ) -> Result<Option<AssignedRide>, CablineError> {
        let assigned = self.storage.create_assigned_ride(ride).await?;
        match &assigned {
            Some(a) => info!(
                ride_id = a.ride.id,
                driver_id = a.driver.id,
                car_id = a.vehicle.id,
                "ride assigned on booking"
            ),
            None => info!(car_type = %ride.car_type, "no free driver for immediate booking"),
        }
        Ok(assigned)
    }

    /// Binds an existing unassigned ride to any free pair and notifies both
    /// the customer and the driver.
    pub async fn assign_existing(
        &self,
        ride_id: i64,
    ) -> Result<Option<AssignedRide>, CablineError> {
        let Some(assigned) = self.storage.assign_ride(ride_id).await? else {
            debug!(ride_id, "no free driver for ride");
            return Ok(None);
        };
        info!(
            ride_id,
            driver_id = assigned.driver.id,
            car_id = assigned.vehicle.id,
            "ride assigned"
        );
        self.notify_assignment(&assigned).await;
        Ok(Some(assigned))
    }

    /// Operator-chosen assignment. Only a fresh assignment sends
    /// notifications; repeating the call is a silent no-op.
    pub async fn manual_assign(
        &self,
        ride_id: i64,
        driver_id: i64,
        car_id: i64,
    ) -> Result<ManualAssignOutcome, CablineError> {
        let outcome = self
            .storage
            .manual_assign(ride_id, driver_id, car_id)
            .await?;
        match &outcome {
            ManualAssignOutcome::Assigned(assigned) => {
                info!(ride_id, driver_id, car_id, "ride assigned manually");
                self.notify_assignment(assigned).await;
            }
            other => info!(
                ride_id,
                driver_id,
                car_id,
                outcome = ?other,
                "manual assignment not applied"
            ),
        }
        Ok(outcome)
    }

    /// Closes an active ride from the admin side and frees its resources.
    pub async fn complete(&self, ride_id: i64) -> Result<Option<Ride>, CablineError> {
        let completed = self.storage.complete_ride(ride_id, self.clock.now()).await?;
        if completed.is_some() {
            info!(ride_id, "ride completed by operator");
        }
        Ok(completed)
    }

    /// Cancels a ride that has not finished. The customer is told, and so is
    /// the driver when one was on it.
    pub async fn cancel(&self, ride_id: i64) -> Result<Option<Ride>, CablineError> {
        let Some(ride) = self.storage.cancel_ride(ride_id).await? else {
            return Ok(None);
        };
        info!(ride_id, driver_id = ?ride.driver_id, "ride cancelled by operator");
        let mut messages = vec![messages::customer_ride_cancelled(&ride)];
        if let Some(driver_id) = ride.driver_id
            && let Some(driver) = self.storage.get_driver(driver_id).await?
        {
            messages.push(messages::driver_ride_cancelled(&driver.phone, ride_id));
        }
        self.send(&messages).await;
        Ok(Some(ride))
    }

    /// Owner phones plus the configured admin phones, without repeats.
    ///
    /// An owner lookup failure falls back to the configured list.
    pub async fn alert_recipients(&self) -> Vec<String> {
        let owners = match self.storage.owner_phones().await {
            Ok(phones) => phones,
            Err(e) => {
                warn!(error = %e, "owner phones unavailable");
                Vec::new()
            }
        };
        let mut recipients: Vec<String> = Vec::new();
        for phone in owners
            .iter()
            .map(|p| normalize_phone(p))
            .chain(self.settings.admin_phones.iter().cloned())
        {
            if !phone.is_empty() && !recipients.contains(&phone) {
                recipients.push(phone);
            }
        }
        recipients
    }

    /// Customer notice plus driver job card for a new assignment.
    pub async fn notify_assignment(&self, assigned: &AssignedRide) {
        let messages = [
            messages::customer_assigned(assigned, self.settings.utc_offset),
            messages::driver_job(assigned, self.settings.utc_offset),
        ];
        self.send(&messages).await;
    }

    /// Driver job card only; the customer has just been told in-chat.
    pub fn driver_job(&self, assigned: &AssignedRide) -> Outbound {
        messages::driver_job(assigned, self.settings.utc_offset)
    }

    async fn send(&self, messages: &[Outbound]) {
        deliver_all(self.notifier.as_ref(), messages, self.settings.external_timeout).await;
    }
}

// SPDX-FileCopyrightText: 2026 Cabline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Booking handlers, one per awaiting state, from the date choice through
//! the payment mode.
//!
//! Each handler checks that the fields it reads were written by an earlier
//! step; a session missing them restarts the booking at the date choice.

use cabline_core::model::{
    AssignedRide, ConfirmationType, ConversationSession, ConversationState, NewRide,
    PaymentStatus, Ride, RideStatus,
};
use cabline_core::{CablineError, Invoice, compute_fare};
use cabline_intent::{DateOption, PaymentMode};
use chrono::{DateTime, TimeDelta, Utc};
use tracing::{info, warn};

use crate::engine::{ConversationEngine, Turn};
use crate::messages::{self, FareQuote};
use crate::reply::Outbound;
use crate::timeparse::{format_local, local_today, parse_date, parse_time, to_utc};

/// Everything the confirmation step needs from the draft.
struct Draft {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    pickup: String,
    destination: String,
    car_type: String,
    distance_km: f64,
    duration_minutes: i64,
    fare: f64,
}

impl ConversationEngine {
    /// Entry into the booking flow, gated on registration.
    pub(crate) async fn start_booking(&self, turn: &mut Turn) -> Result<(), CablineError> {
        let phone = turn.phone().to_string();
        if self.services.storage.get_user(&phone).await?.is_none() {
            turn.session.reset_booking();
            turn.session.clear_otp();
            turn.goto(ConversationState::AwaitingRegistrationName);
            turn.reply(messages::ask_name(&phone));
            return Ok(());
        }
        self.begin_draft(turn);
        Ok(())
    }

    /// Fresh draft at the date choice; earlier rides stay as history.
    pub(crate) fn begin_draft(&self, turn: &mut Turn) {
        turn.session.reset_booking();
        turn.goto(ConversationState::AwaitingBookingDateOption);
        let phone = turn.phone().to_string();
        turn.reply(messages::date_options(&phone));
    }

    fn restart_draft(&self, turn: &mut Turn) {
        warn!(state = %turn.session.state, "booking draft incomplete, restarting");
        let phone = turn.phone().to_string();
        turn.reply(Outbound::text(&phone, "Let's start that booking again."));
        self.begin_draft(turn);
    }

    fn today(&self) -> chrono::NaiveDate {
        local_today(self.services.clock.now(), self.settings.utc_offset)
    }

    pub(crate) fn choose_date(&self, turn: &mut Turn, option: DateOption) {
        let phone = turn.phone().to_string();
        let today = self.today();
        let date = match option {
            DateOption::Today => today,
            DateOption::Tomorrow => match today.succ_opt() {
                Some(date) => date,
                None => {
                    turn.reply(messages::ask_specific_date(&phone));
                    turn.goto(ConversationState::AwaitingSpecificDate);
                    return;
                }
            },
            DateOption::Later => {
                turn.goto(ConversationState::AwaitingSpecificDate);
                turn.reply(messages::ask_specific_date(&phone));
                return;
            }
        };
        turn.session.booking_date = Some(date);
        turn.goto(ConversationState::AwaitingBookingTime);
        turn.reply(messages::ask_time(&phone));
    }

    pub(crate) fn specific_date(&self, turn: &mut Turn, text: &str) {
        let phone = turn.phone().to_string();
        let today = self.today();
        match parse_date(text, today) {
            None => turn.reply(messages::ask_specific_date(&phone)),
            Some(date) if date < today => turn.reply(messages::date_in_past(&phone)),
            Some(date) => {
                turn.session.booking_date = Some(date);
                turn.goto(ConversationState::AwaitingBookingTime);
                turn.reply(messages::ask_time(&phone));
            }
        }
    }

    pub(crate) fn booking_time(&self, turn: &mut Turn, text: &str) {
        let phone = turn.phone().to_string();
        let Some(date) = turn.session.booking_date else {
            self.restart_draft(turn);
            return;
        };
        let Some(start) = parse_time(text).and_then(|t| to_utc(date, t, self.settings.utc_offset))
        else {
            turn.reply(messages::ask_time(&phone));
            return;
        };
        if start <= self.services.clock.now() {
            turn.reply(messages::time_in_past(&phone));
            return;
        }
        turn.session.start_time = Some(start);
        turn.goto(ConversationState::AwaitingPickup);
        turn.reply(messages::ask_pickup(&phone));
    }

    pub(crate) fn pickup(&self, turn: &mut Turn, text: &str) {
        let phone = turn.phone().to_string();
        if turn.session.start_time.is_none() {
            self.restart_draft(turn);
            return;
        }
        let pickup = self.services.locations.correct_location(text);
        if pickup.trim().is_empty() {
            turn.reply(messages::ask_pickup(&phone));
            return;
        }
        turn.reply(messages::ask_destination(&phone, &pickup));
        turn.session.pickup = Some(pickup);
        turn.goto(ConversationState::AwaitingDestination);
    }

    pub(crate) async fn destination(
        &self,
        turn: &mut Turn,
        text: &str,
    ) -> Result<(), CablineError> {
        let phone = turn.phone().to_string();
        let Some(pickup) = turn.session.pickup.clone() else {
            self.restart_draft(turn);
            return Ok(());
        };
        let destination = self.services.locations.correct_location(text);
        if destination.trim().is_empty() {
            turn.reply(messages::reprompt(&phone, ConversationState::AwaitingDestination));
            return Ok(());
        }
        if destination == pickup {
            turn.reply(messages::same_pickup_and_destination(&phone));
            return Ok(());
        }

        let types = self.services.storage.available_car_types().await?;
        if types.is_empty() {
            self.no_cars(turn);
            return Ok(());
        }
        turn.session.destination = Some(destination);
        turn.goto(ConversationState::AwaitingCarType);
        turn.reply(messages::car_types(&phone, &types));
        Ok(())
    }

    fn no_cars(&self, turn: &mut Turn) {
        let phone = turn.phone().to_string();
        turn.session.reset_booking();
        turn.goto(ConversationState::AwaitingIntent);
        turn.reply(messages::no_cars_available(&phone));
    }

    pub(crate) async fn car_type(&self, turn: &mut Turn, choice: &str) -> Result<(), CablineError> {
        let phone = turn.phone().to_string();
        let (Some(start), Some(pickup), Some(destination)) = (
            turn.session.start_time,
            turn.session.pickup.clone(),
            turn.session.destination.clone(),
        ) else {
            self.restart_draft(turn);
            return Ok(());
        };

        let storage = &self.services.storage;
        let types = storage.available_car_types().await?;
        if types.is_empty() {
            self.no_cars(turn);
            return Ok(());
        }
        let choice = choice.trim().to_lowercase();
        let rate = if types.contains(&choice) {
            storage.rate_for_type(&choice).await?
        } else {
            None
        };
        let Some(rate) = rate else {
            turn.reply(Outbound::text(
                &phone,
                format!("'{choice}' isn't available right now."),
            ));
            turn.reply(messages::car_types(&phone, &types));
            return Ok(());
        };

        let route = match self
            .bounded(self.services.routes.get_route(&pickup, &destination))
            .await
        {
            Ok(route) => route,
            Err(CablineError::Route { message }) => {
                turn.reply(Outbound::text(&phone, message));
                return Ok(());
            }
            Err(e @ CablineError::Timeout { .. }) => return Err(e),
            Err(e) => {
                warn!(error = %e, "route lookup failed");
                turn.reply(Outbound::text(
                    &phone,
                    "⚠️ We couldn't calculate the route right now. Please try again.",
                ));
                return Ok(());
            }
        };

        let fare = compute_fare(route.distance_km, rate);
        let quote = FareQuote {
            pickup: &pickup,
            destination: &destination,
            car_type: &choice,
            distance_km: route.distance_km,
            duration_minutes: route.duration_minutes,
            fare,
            when: format_local(start, self.settings.utc_offset),
        };
        turn.reply(messages::fare_quote(&phone, &quote));

        turn.session.car_type = Some(choice);
        turn.session.route_distance_km = Some(route.distance_km);
        turn.session.route_duration_minutes = Some(route.duration_minutes);
        turn.session.fare = Some(fare);
        turn.session.coupon_code = None;
        turn.session.discount = None;
        turn.session.end_time = Some(start + TimeDelta::minutes(route.duration_minutes));
        turn.goto(ConversationState::AwaitingConfirmation);
        Ok(())
    }

    /// Checks a coupon against the quoted fare. The code is only redeemed
    /// when the ride is created; a rejected code keeps any earlier one.
    pub(crate) async fn apply_coupon(
        &self,
        turn: &mut Turn,
        code: &str,
    ) -> Result<(), CablineError> {
        let phone = turn.phone().to_string();
        let Some(fare) = turn.session.fare else {
            self.restart_draft(turn);
            return Ok(());
        };
        match self.services.storage.get_coupon(code).await? {
            Some(coupon) if !coupon.used => {
                let discount = coupon.discount.min(fare);
                info!(code = %coupon.code, discount, "coupon applied to quote");
                turn.reply(messages::coupon_applied(&phone, &coupon.code, discount, fare));
                turn.session.coupon_code = Some(coupon.code);
                turn.session.discount = Some(discount);
            }
            _ => turn.reply(messages::coupon_invalid(&phone, code)),
        }
        Ok(())
    }

    fn draft(&self, turn: &Turn) -> Option<Draft> {
        let s = &turn.session;
        Some(Draft {
            start: s.start_time?,
            end: s.end_time?,
            pickup: s.pickup.clone()?,
            destination: s.destination.clone()?,
            car_type: s.car_type.clone()?,
            distance_km: s.route_distance_km?,
            duration_minutes: s.route_duration_minutes?,
            fare: s.fare?,
        })
    }

    /// Final confirmation: creates the ride and, when it is urgent and
    /// auto-assignment is on, claims a driver in the same step.
    pub(crate) async fn confirm(&self, turn: &mut Turn) -> Result<(), CablineError> {
        let phone = turn.phone().to_string();
        let Some(draft) = self.draft(turn) else {
            self.restart_draft(turn);
            return Ok(());
        };

        let now = self.services.clock.now();
        let urgent = draft.start - now <= self.settings.immediate_window;
        let storage = &self.services.storage;
        let mut new_ride = NewRide {
            customer_phone: phone.clone(),
            pickup: draft.pickup,
            destination: draft.destination,
            distance_km: draft.distance_km,
            duration_minutes: draft.duration_minutes,
            fare: draft.fare,
            car_type: draft.car_type,
            status: RideStatus::Prebooked,
            start_time: draft.start,
            end_time: Some(draft.end),
            coupon_code: turn.session.coupon_code.clone(),
        };

        let booked = if urgent && storage.auto_assignment_enabled().await? {
            new_ride.status = RideStatus::Assigned;
            self.assignment.assign_immediate(&new_ride).await.map(|assigned| {
                assigned.map(|a| {
                    let headline = messages::assigned_headline(&a);
                    turn.session.assigned_driver = Some(a.driver.id);
                    turn.session.assigned_car = Some(a.vehicle.id);
                    (a.ride, ConfirmationType::ImmediateAssigned, headline)
                })
            })
        } else if urgent {
            new_ride.status = RideStatus::Pending;
            storage.create_ride(&new_ride).await.map(|ride| {
                let headline = messages::MANUAL_HEADLINE.to_string();
                Some((ride, ConfirmationType::ManualAssignment, headline))
            })
        } else {
            storage.create_ride(&new_ride).await.map(|ride| {
                let when = format_local(ride.start_time, self.settings.utc_offset);
                let headline = messages::prebooked_headline(&when);
                Some((ride, ConfirmationType::FuturePrebooking, headline))
            })
        };

        let (ride, confirmation, headline): (Ride, ConfirmationType, String) = match booked {
            Ok(Some(booked)) => booked,
            Ok(None) => {
                turn.session.reset_booking();
                turn.goto(ConversationState::AwaitingIntent);
                turn.reply(messages::all_cabs_busy(&phone));
                return Ok(());
            }
            Err(CablineError::Validation(reason)) if new_ride.coupon_code.is_some() => {
                let code = new_ride.coupon_code.unwrap_or_default();
                warn!(%code, %reason, "coupon lost before booking");
                turn.session.coupon_code = None;
                turn.session.discount = None;
                turn.reply(messages::coupon_invalid(&phone, &code));
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        info!(
            ride_id = ride.id,
            status = %ride.status,
            confirmation = %confirmation,
            discount = ride.discount,
            "ride booked"
        );

        if confirmation == ConfirmationType::ManualAssignment {
            for admin in self.assignment.alert_recipients().await {
                let offset = self.settings.utc_offset;
                turn.reply(messages::admin_manual_alert(&admin, &ride, offset));
            }
        }

        // The ride exists from here on; a missing link only disables the
        // online option, it never undoes the booking.
        let invoice =
            Invoice::with_discount(ride.fare, ride.discount, self.settings.tax_rate_percent);
        let reference = match self.services.payments.create_payment_reference(
            &phone,
            invoice.total,
            ride.id,
        ) {
            Ok(reference) => Some(reference),
            Err(e) => {
                warn!(ride_id = ride.id, error = %e, "no payment link for ride");
                None
            }
        };

        turn.reply(messages::payment_options(&phone, ride.id, &headline, &invoice));
        turn.session.ride_id = Some(ride.id);
        turn.session.confirmation_type = Some(confirmation);
        turn.session.payment_reference = reference;
        turn.session.invoice_total = Some(invoice.total);
        turn.goto(ConversationState::AwaitingPaymentOption);
        Ok(())
    }

    pub(crate) async fn payment(
        &self,
        turn: &mut Turn,
        mode: PaymentMode,
    ) -> Result<(), CablineError> {
        let phone = turn.phone().to_string();
        let Some(ride_id) = turn.session.ride_id else {
            self.restart_draft(turn);
            return Ok(());
        };
        let storage = &self.services.storage;
        let total = turn
            .session
            .invoice_total
            .or(turn.session.fare)
            .unwrap_or_default();

        match mode {
            PaymentMode::Cash => {
                storage.set_payment_status(ride_id, PaymentStatus::Cash).await?;
                turn.reply(messages::cash_payment(&phone, total));
            }
            PaymentMode::Online => {
                let link = match turn.session.payment_reference.clone() {
                    Some(link) => Ok(link),
                    None => self
                        .services
                        .payments
                        .create_payment_reference(&phone, total, ride_id),
                };
                match link {
                    Ok(link) => turn.reply(messages::online_payment(&phone, total, &link)),
                    Err(e) => {
                        warn!(ride_id, error = %e, "online payment unavailable");
                        turn.reply(messages::payment_link_unavailable(&phone));
                        return Ok(());
                    }
                }
            }
        }

        let confirmation = turn.session.confirmation_type;
        turn.reply(messages::ride_confirmed(
            &phone,
            confirmation == Some(ConfirmationType::FuturePrebooking),
        ));

        if confirmation == Some(ConfirmationType::ImmediateAssigned)
            && let Some(assigned) = self.load_assignment(ride_id, &turn.session).await?
        {
            turn.reply(self.assignment.driver_job(&assigned));
        }

        info!(ride_id, mode = %mode, "payment mode chosen");
        turn.session.assigned_driver = None;
        turn.session.assigned_car = None;
        turn.goto(ConversationState::RideConfirmed);
        Ok(())
    }

    /// Ride, driver and vehicle remembered from the immediate assignment.
    async fn load_assignment(
        &self,
        ride_id: i64,
        session: &ConversationSession,
    ) -> Result<Option<AssignedRide>, CablineError> {
        let (Some(driver_id), Some(car_id)) = (session.assigned_driver, session.assigned_car) else {
            return Ok(None);
        };
        let storage = &self.services.storage;
        let (Some(ride), Some(driver), Some(vehicle)) = (
            storage.get_ride(ride_id).await?,
            storage.get_driver(driver_id).await?,
            storage.get_vehicle(car_id).await?,
        ) else {
            return Ok(None);
        };
        Ok(Some(AssignedRide {
            ride,
            driver,
            vehicle,
        }))
    }
}

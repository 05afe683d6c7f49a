// SPDX-FileCopyrightText: 2026 Cabline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat copy. Every customer- and driver-facing string lives here.

use cabline_core::model::{AssignedRide, ConversationState, Ride};
use cabline_core::{Button, Invoice, format_inr};
use cabline_intent::DriverStep;
use chrono::FixedOffset;

use crate::reply::Outbound;
use crate::timeparse::format_local;

pub fn main_menu(to: &str, service_name: &str, name: Option<&str>) -> Outbound {
    let greeting = match name {
        Some(name) => format!("👋 Hi {name}, welcome back to {service_name}!"),
        None => format!("👋 Welcome to {service_name}!"),
    };
    Outbound::buttons(
        to,
        format!("{greeting}\nWhat would you like to do?"),
        vec![
            Button::new("book_ride", "Book a ride"),
            Button::new("my_rides", "My rides"),
        ],
    )
}

pub fn date_options(to: &str) -> Outbound {
    Outbound::buttons(
        to,
        "📅 When do you need the cab?",
        vec![
            Button::new("date_today", "Today"),
            Button::new("date_tomorrow", "Tomorrow"),
            Button::new("date_later", "Later date"),
        ],
    )
}

pub fn ask_specific_date(to: &str) -> Outbound {
    Outbound::text(to, "📅 Please type the date (DD/MM/YYYY), e.g. 25/10/2026.")
}

pub fn date_in_past(to: &str) -> Outbound {
    Outbound::text(to, "⚠️ That date has already passed. Please enter a future date (DD/MM/YYYY).")
}

pub fn ask_time(to: &str) -> Outbound {
    Outbound::text(to, "⏰ What time should the cab arrive? e.g. 6:30 PM or 18:30.")
}

pub fn time_in_past(to: &str) -> Outbound {
    Outbound::text(
        to,
        "⚠️ That time has already passed. Please enter a later time, e.g. 6:30 PM or 18:30.",
    )
}

pub fn ask_pickup(to: &str) -> Outbound {
    Outbound::text(to, "📍 Please share your pickup location.")
}

pub fn ask_destination(to: &str, pickup: &str) -> Outbound {
    Outbound::text(to, format!("Pickup: {pickup}\n🏁 Now share your drop location."))
}

pub fn same_pickup_and_destination(to: &str) -> Outbound {
    Outbound::text(to, "⚠️ Drop location must be different from pickup. Please share your drop location.")
}

pub fn car_types(to: &str, types: &[String]) -> Outbound {
    let body = "🚗 Choose a car type:";
    if types.len() <= 3 {
        let buttons = types
            .iter()
            .map(|t| Button::new(format!("car_{t}"), capitalize(t)))
            .collect();
        Outbound::buttons(to, body, buttons)
    } else {
        let list = types.iter().map(|t| capitalize(t)).collect::<Vec<_>>().join(", ");
        Outbound::text(to, format!("{body} {list}"))
    }
}

pub fn no_cars_available(to: &str) -> Outbound {
    Outbound::text(
        to,
        "😔 Sorry, no cabs are available right now. Please try again later. Type 'book' to start over.",
    )
}

pub struct FareQuote<'a> {
    pub pickup: &'a str,
    pub destination: &'a str,
    pub car_type: &'a str,
    pub distance_km: f64,
    pub duration_minutes: i64,
    pub fare: f64,
    pub when: String,
}

pub fn fare_quote(to: &str, quote: &FareQuote<'_>) -> Outbound {
    Outbound::buttons(
        to,
        format!(
            "🛣 {} → {}\n🚗 {}\n🕒 {}\n📏 {:.1} km, about {} min\n💰 Fare: {}\n\n\
             Have a coupon? Type 'coupon CODE'.\nConfirm this booking?",
            quote.pickup,
            quote.destination,
            capitalize(quote.car_type),
            quote.when,
            quote.distance_km,
            quote.duration_minutes,
            format_inr(quote.fare),
        ),
        confirm_buttons(),
    )
}

fn confirm_buttons() -> Vec<Button> {
    vec![
        Button::new("confirm_ride", "Confirm"),
        Button::new("cancel_booking", "Cancel"),
    ]
}

pub fn coupon_applied(to: &str, code: &str, discount: f64, fare: f64) -> Outbound {
    Outbound::buttons(
        to,
        format!(
            "🏷 Coupon {code} applied: {} off. Fare now {} before tax.\nConfirm this booking?",
            format_inr(discount),
            format_inr((fare - discount).max(0.0)),
        ),
        confirm_buttons(),
    )
}

pub fn coupon_invalid(to: &str, code: &str) -> Outbound {
    Outbound::buttons(
        to,
        format!("⚠️ Coupon {code} is not valid or has already been used. Confirm without it?"),
        confirm_buttons(),
    )
}

pub fn all_cabs_busy(to: &str) -> Outbound {
    Outbound::text(
        to,
        "😔 All our cabs are busy right now, so we couldn't book this ride. Please try again in a little while.",
    )
}

pub fn booking_cancelled(to: &str) -> Outbound {
    Outbound::text(to, "❌ Booking cancelled. Type 'book' whenever you need a ride.")
}

pub fn payment_options(to: &str, ride_id: i64, headline: &str, invoice: &Invoice) -> Outbound {
    let discount = if invoice.discount > 0.0 {
        format!("\nDiscount: -{}", format_inr(invoice.discount))
    } else {
        String::new()
    };
    Outbound::buttons(
        to,
        format!(
            "{headline}\nRide #{ride_id}\n\nFare: {}{discount}\nTax ({}%): {}\nTotal: {}\n\nHow would you like to pay?",
            format_inr(invoice.fare),
            invoice.tax_rate_percent,
            format_inr(invoice.tax),
            format_inr(invoice.total),
        ),
        vec![
            Button::new("pay_online", "Pay online"),
            Button::new("pay_cash", "Pay cash"),
        ],
    )
}

pub fn assigned_headline(assigned: &AssignedRide) -> String {
    format!(
        "✅ Cab booked! Driver {} ({}) will pick you up in {} {}.",
        assigned.driver.name,
        assigned.driver.phone,
        assigned.vehicle.model,
        assigned.vehicle.plate_number,
    )
}

pub const MANUAL_HEADLINE: &str =
    "✅ Booking received! Our team is assigning a driver and will update you shortly.";

pub fn prebooked_headline(when: &str) -> String {
    format!("✅ Ride pre-booked for {when}. We'll assign a driver closer to pickup time.")
}

pub fn online_payment(to: &str, total: f64, link: &str) -> Outbound {
    Outbound::text(
        to,
        format!("💳 Please pay {} using this UPI link:\n{link}", format_inr(total)),
    )
}

pub fn payment_link_unavailable(to: &str) -> Outbound {
    Outbound::buttons(
        to,
        "⚠️ Online payment isn't available for this ride. You can pay in cash to your driver.",
        vec![Button::new("pay_cash", "Pay cash")],
    )
}

pub fn cash_payment(to: &str, total: f64) -> Outbound {
    Outbound::text(
        to,
        format!("💵 Please pay {} in cash to your driver at the end of the trip.", format_inr(total)),
    )
}

pub fn ride_confirmed(to: &str, prebooked: bool) -> Outbound {
    let body = if prebooked {
        "🎉 All set! You'll get your driver's details before pickup. Type 'my rides' to see your bookings."
    } else {
        "🎉 All set! Your driver has been notified. Type 'my rides' to see your bookings."
    };
    Outbound::text(to, body)
}

pub fn my_rides(to: &str, rides: &[Ride], offset: FixedOffset) -> Outbound {
    if rides.is_empty() {
        return Outbound::text(to, "You have no rides yet. Type 'book' to book one.");
    }
    let lines = rides
        .iter()
        .map(|r| {
            format!(
                "#{} {} → {} | {} | {} | {}",
                r.id,
                r.pickup,
                r.destination,
                format_local(r.start_time, offset),
                r.status,
                format_inr(r.fare),
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    Outbound::text(to, format!("🧾 Your recent rides:\n{lines}"))
}

/// Re-prompt for whatever the given state is waiting for.
pub fn reprompt(to: &str, state: ConversationState) -> Outbound {
    match state {
        ConversationState::AwaitingBookingDateOption => date_options(to),
        ConversationState::AwaitingSpecificDate => ask_specific_date(to),
        ConversationState::AwaitingBookingTime => ask_time(to),
        ConversationState::AwaitingPickup => ask_pickup(to),
        ConversationState::AwaitingDestination => {
            Outbound::text(to, "🏁 Please share your drop location.")
        }
        ConversationState::AwaitingCarType => {
            Outbound::text(to, "🚗 Please pick one of the car types listed above.")
        }
        ConversationState::AwaitingConfirmation => Outbound::buttons(
            to,
            "Please confirm or cancel your booking.",
            confirm_buttons(),
        ),
        ConversationState::AwaitingPaymentOption => Outbound::buttons(
            to,
            "Please choose how you'd like to pay.",
            vec![
                Button::new("pay_online", "Pay online"),
                Button::new("pay_cash", "Pay cash"),
            ],
        ),
        ConversationState::AwaitingRegistrationName => ask_name(to),
        ConversationState::AwaitingRegistrationEmail => ask_email(to),
        ConversationState::AwaitingRegistrationPassword => ask_password(to),
        ConversationState::AwaitingNewPassword => {
            Outbound::text(to, "🔑 Please choose a new password (at least 6 characters).")
        }
        ConversationState::AwaitingRegistrationOtp | ConversationState::AwaitingResetOtp => {
            Outbound::text(to, "🔢 Please enter the 6-digit code we emailed you.")
        }
        ConversationState::AwaitingIntent | ConversationState::RideConfirmed => Outbound::text(
            to,
            "Type 'book' to book a cab or 'my rides' to see your bookings.",
        ),
    }
}

pub fn ask_name(to: &str) -> Outbound {
    Outbound::text(to, "📝 Let's get you registered first. What's your full name?")
}

pub fn ask_email(to: &str) -> Outbound {
    Outbound::text(to, "📧 What's your email address?")
}

pub fn ask_password(to: &str) -> Outbound {
    Outbound::text(to, "🔑 Choose a password (at least 6 characters).")
}

pub fn otp_sent(to: &str, email: &str) -> Outbound {
    Outbound::text(to, format!("📨 We've sent a 6-digit code to {email}. Please enter it here."))
}

pub fn otp_mismatch(to: &str) -> Outbound {
    Outbound::text(to, "❌ That code doesn't match. Please try again.")
}

pub fn otp_reissued(to: &str) -> Outbound {
    Outbound::text(to, "🔒 Too many wrong codes. We've emailed you a new one.")
}

pub fn otp_expired(to: &str) -> Outbound {
    Outbound::text(to, "⌛ That code has expired. We've emailed you a new one.")
}

pub fn mail_failed(to: &str) -> Outbound {
    Outbound::text(to, "⚠️ We couldn't send the verification email. Please try again shortly.")
}

pub fn registered(to: &str, name: &str) -> Outbound {
    Outbound::text(to, format!("🎉 Welcome aboard, {name}! Your account is ready."))
}

pub fn no_account(to: &str) -> Outbound {
    Outbound::text(to, "We couldn't find an account for this number. Type 'book' to register.")
}

pub fn password_updated(to: &str) -> Outbound {
    Outbound::text(to, "✅ Your password has been updated.")
}

pub fn timed_out(to: &str) -> Outbound {
    Outbound::text(to, "⌛ That took too long on our side. Please send your last message again.")
}

pub fn internal_error(to: &str) -> Outbound {
    Outbound::text(to, "⚠️ Something went wrong on our side. Please try again.")
}

pub fn drivers_only(to: &str) -> Outbound {
    Outbound::text(to, "This action is only available to registered drivers.")
}

// --- Driver workflow ---

/// Job card sent to a driver when a ride is assigned to them.
pub fn driver_job(assigned: &AssignedRide, offset: FixedOffset) -> Outbound {
    let ride = &assigned.ride;
    Outbound::buttons(
        &assigned.driver.phone,
        format!(
            "🚖 New ride #{}\nCustomer: {}\nPickup: {}\nDrop: {}\nTime: {}\nVehicle: {} {}\nFare: {}",
            ride.id,
            ride.customer_phone,
            ride.pickup,
            ride.destination,
            format_local(ride.start_time, offset),
            assigned.vehicle.model,
            assigned.vehicle.plate_number,
            format_inr(ride.fare),
        ),
        vec![step_button(DriverStep::Enroute, ride.id)],
    )
}

/// Customer notice when a ride gets a driver after booking.
pub fn customer_assigned(assigned: &AssignedRide, offset: FixedOffset) -> Outbound {
    Outbound::text(
        &assigned.ride.customer_phone,
        format!(
            "🚖 Driver assigned for ride #{} at {}: {} ({}), {} {}.",
            assigned.ride.id,
            format_local(assigned.ride.start_time, offset),
            assigned.driver.name,
            assigned.driver.phone,
            assigned.vehicle.model,
            assigned.vehicle.plate_number,
        ),
    )
}

pub fn admin_manual_alert(to: &str, ride: &Ride, offset: FixedOffset) -> Outbound {
    Outbound::text(
        to,
        format!(
            "🚨 Ride #{} needs a manual assignment: {} → {} at {} ({}), customer {}.",
            ride.id,
            ride.pickup,
            ride.destination,
            format_local(ride.start_time, offset),
            ride.car_type,
            ride.customer_phone,
        ),
    )
}

pub fn customer_ride_cancelled(ride: &Ride) -> Outbound {
    Outbound::text(
        &ride.customer_phone,
        format!(
            "❌ Your ride #{} from {} to {} has been cancelled. Type 'book' to book again.",
            ride.id, ride.pickup, ride.destination
        ),
    )
}

pub fn driver_ride_cancelled(to: &str, ride_id: i64) -> Outbound {
    Outbound::text(
        to,
        format!("❌ Ride #{ride_id} has been cancelled. You're free for the next trip."),
    )
}

pub fn step_button(step: DriverStep, ride_id: i64) -> Button {
    let title = match step {
        DriverStep::Enroute => "On the way",
        DriverStep::Arrived => "Arrived",
        DriverStep::Start => "Start trip",
        DriverStep::Paid => "Trip done & paid",
    };
    Button::new(step.payload(ride_id), title)
}

pub fn driver_step_done(to: &str, step: DriverStep, ride_id: i64) -> Outbound {
    match step.next() {
        Some(next) => Outbound::buttons(
            to,
            format!("👍 Ride #{ride_id} updated. Tap when ready for the next step."),
            vec![step_button(next, ride_id)],
        ),
        None => Outbound::text(to, format!("✅ Ride #{ride_id} completed. You're free for the next trip.")),
    }
}

pub fn driver_step_rejected(to: &str, ride_id: i64) -> Outbound {
    Outbound::text(
        to,
        format!("⚠️ Ride #{ride_id} is not assigned to you or is not at that step. No change made."),
    )
}

pub fn customer_step_notice(ride: &Ride, step: DriverStep, invoice: Option<&Invoice>) -> Outbound {
    let body = match step {
        DriverStep::Enroute => format!("🚖 Your driver is on the way to {}.", ride.pickup),
        DriverStep::Arrived => "📍 Your driver has arrived at the pickup point.".to_string(),
        DriverStep::Start => format!("🛣 Your trip to {} has started. Have a safe ride!", ride.destination),
        DriverStep::Paid => match invoice {
            Some(invoice) => format!(
                "🏁 Trip completed. Total paid: {}. Thank you for riding with us!",
                format_inr(invoice.total)
            ),
            None => "🏁 Trip completed. Thank you for riding with us!".to_string(),
        },
    };
    Outbound::text(&ride.customer_phone, body)
}

pub fn payment_received(ride: &Ride) -> Outbound {
    Outbound::text(
        &ride.customer_phone,
        format!("✅ Payment received for ride #{}. Thank you!", ride.id),
    )
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_type_lists_become_buttons() {
        let msg = car_types("9190", &["sedan".into(), "suv".into()]);
        match msg {
            Outbound::Buttons { buttons, .. } => {
                assert_eq!(buttons[0], Button::new("car_sedan", "Sedan"));
                assert_eq!(buttons[1], Button::new("car_suv", "Suv"));
            }
            other => panic!("expected buttons, got {other:?}"),
        }
    }

    #[test]
    fn long_type_lists_become_text() {
        let types: Vec<String> = ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect();
        assert!(matches!(car_types("9190", &types), Outbound::Text { .. }));
    }

    #[test]
    fn payment_options_show_invoice_breakdown() {
        let invoice = Invoice::new(120.0, 5.0);
        let body = payment_options("9190", 3, "Booked", &invoice).body().to_string();
        assert!(body.contains("Fare: ₹120.00"));
        assert!(body.contains("Tax (5%): ₹6.00"));
        assert!(body.contains("Total: ₹126.00"));
        assert!(!body.contains("Discount"));

        let invoice = Invoice::with_discount(120.0, 20.0, 5.0);
        let body = payment_options("9190", 3, "Booked", &invoice).body().to_string();
        assert!(body.contains("Discount: -₹20.00"));
        assert!(body.contains("Total: ₹105.00"));
    }

    #[test]
    fn coupon_reply_shows_reduced_fare() {
        let body = coupon_applied("9190", "SAVE20", 20.0, 120.0).body().to_string();
        assert!(body.contains("SAVE20"));
        assert!(body.contains("Fare now ₹100.00"));
    }

    #[test]
    fn every_state_has_a_reprompt() {
        use std::str::FromStr;
        for name in [
            "awaiting_intent",
            "awaiting_booking_date_option",
            "awaiting_specific_date",
            "awaiting_booking_time",
            "awaiting_pickup",
            "awaiting_destination",
            "awaiting_car_type",
            "awaiting_confirmation",
            "awaiting_payment_option",
            "ride_confirmed",
        ] {
            let state = ConversationState::from_str(name).unwrap();
            assert!(!reprompt("9190", state).body().is_empty());
        }
    }

    #[test]
    fn driver_step_chain_offers_next_button() {
        match driver_step_done("9191", DriverStep::Arrived, 4) {
            Outbound::Buttons { buttons, .. } => assert_eq!(buttons[0].id, "drv_start_4"),
            other => panic!("expected buttons, got {other:?}"),
        }
        assert!(matches!(
            driver_step_done("9191", DriverStep::Paid, 4),
            Outbound::Text { .. }
        ));
    }
}

// SPDX-FileCopyrightText: 2026 Cabline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rule-based intent classification.
//!
//! Maps a raw chat message, an optional button payload and the caller's
//! current conversation state to a symbolic [`Intent`]. Exact keyword sets,
//! Jaro-Winkler spelling correction and a per-state fallback; no model call.

use cabline_core::model::{ConversationState, RideStatus};
use strsim::jaro_winkler;

/// Date choice offered after a booking starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum DateOption {
    Today,
    Tomorrow,
    Later,
}

/// How the customer wants to pay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum PaymentMode {
    Online,
    Cash,
}

/// One step of the driver trip workflow, carried by `drv_<step>_<ride_id>` buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum DriverStep {
    /// Driver has left for the pickup point.
    Enroute,
    /// Driver is waiting at the pickup point.
    Arrived,
    /// Customer is on board.
    Start,
    /// Trip finished and fare collected.
    Paid,
}

impl DriverStep {
    /// Ride status the step may be applied from.
    pub fn from_status(self) -> RideStatus {
        match self {
            DriverStep::Enroute => RideStatus::Assigned,
            DriverStep::Arrived => RideStatus::EnroutePickup,
            DriverStep::Start => RideStatus::AtPickup,
            DriverStep::Paid => RideStatus::InProgress,
        }
    }

    /// Ride status after the step.
    pub fn to_status(self) -> RideStatus {
        match self {
            DriverStep::Enroute => RideStatus::EnroutePickup,
            DriverStep::Arrived => RideStatus::AtPickup,
            DriverStep::Start => RideStatus::InProgress,
            DriverStep::Paid => RideStatus::Completed,
        }
    }

    /// The step the driver is offered after this one.
    pub fn next(self) -> Option<DriverStep> {
        match self {
            DriverStep::Enroute => Some(DriverStep::Arrived),
            DriverStep::Arrived => Some(DriverStep::Start),
            DriverStep::Start => Some(DriverStep::Paid),
            DriverStep::Paid => None,
        }
    }

    /// Button id for this step on the given ride.
    pub fn payload(self, ride_id: i64) -> String {
        format!("drv_{self}_{ride_id}")
    }
}

/// Symbolic meaning of one inbound message.
#[derive(Debug, Clone, PartialEq, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Intent {
    Greeting,
    BookRide,
    ConfirmRide,
    CancelBooking,
    MyRides,
    ForgotPassword,
    BookingDateOption(DateOption),
    SpecificDate(String),
    BookingTime(String),
    Pickup(String),
    Destination(String),
    CarSelection(String),
    PaymentOption(PaymentMode),
    /// Discount code typed at the fare quote, upper-cased.
    ApplyCoupon(String),
    RegistrationName(String),
    RegistrationEmail(String),
    Password(String),
    Otp(String),
    DriverAction { step: DriverStep, ride_id: i64 },
    /// Button id with no known meaning, kept verbatim.
    Other(String),
    Unknown,
}

impl Intent {
    /// Short label for logs; never includes user-supplied text.
    pub fn label(&self) -> &'static str {
        self.into()
    }
}

/// Exact greetings, matched before any correction.
const GREETINGS: &[&str] = &["hi", "hello", "hey", "hii", "namaste", "start", "menu"];

const BOOK_WORDS: &[&str] = &["book", "ride", "cab", "taxi"];

const CONFIRM_WORDS: &[&str] = &["confirm", "yes", "ok", "okay"];

const CANCEL_WORDS: &[&str] = &["cancel", "no"];

/// Leading word that marks the rest of the message as a discount code.
const COUPON_WORDS: &[&str] = &["coupon", "code", "promo"];

/// Correction targets. Tokens shorter than [`MIN_CORRECTABLE_LEN`] are only
/// ever matched exactly.
const VOCABULARY: &[&str] = &[
    "book", "ride", "taxi", "confirm", "okay", "cancel", "today", "tomorrow", "later", "online",
    "cash", "rides", "forgot", "password",
];

const MIN_CORRECTABLE_LEN: usize = 4;

/// Rule-based classifier with a configurable spelling-correction threshold.
pub struct IntentClassifier {
    correction_threshold: f64,
}

impl IntentClassifier {
    pub fn new() -> Self {
        Self {
            correction_threshold: 0.88,
        }
    }

    pub fn with_threshold(correction_threshold: f64) -> Self {
        Self {
            correction_threshold,
        }
    }

    /// Classify one inbound message.
    ///
    /// Order of precedence: exact greeting, button payload, keyword sets on
    /// the corrected tokens, then a fallback chosen by `state`. Credential
    /// states (name, email, password, OTP) skip the keyword sets so that
    /// a password such as "booking1" is never read as a command.
    pub fn classify(
        &self,
        text: &str,
        payload: Option<&str>,
        state: ConversationState,
    ) -> Intent {
        let trimmed = text.trim();
        let lower = trimmed.to_lowercase();

        if GREETINGS.contains(&lower.as_str()) {
            return Intent::Greeting;
        }

        if let Some(id) = payload.map(str::trim).filter(|id| !id.is_empty()) {
            return classify_payload(id);
        }

        if state.is_registration() || state.is_password_reset() {
            return contextual(trimmed, &[], state);
        }

        if state == ConversationState::AwaitingConfirmation
            && let Some(code) = coupon_code(trimmed)
        {
            return Intent::ApplyCoupon(code);
        }

        let tokens = self.corrected_tokens(&lower);

        if any_of(&tokens, &["forgot"]) && any_of(&tokens, &["password"]) {
            return Intent::ForgotPassword;
        }
        if any_of(&tokens, &["my"]) && any_of(&tokens, &["rides"]) {
            return Intent::MyRides;
        }
        if any_of(&tokens, BOOK_WORDS) {
            return Intent::BookRide;
        }
        if any_of(&tokens, CONFIRM_WORDS) {
            return Intent::ConfirmRide;
        }

        contextual(trimmed, &tokens, state)
    }

    /// Lowercased alphanumeric tokens, each replaced by its closest
    /// vocabulary word when similar enough.
    fn corrected_tokens(&self, lower: &str) -> Vec<String> {
        lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(|t| self.correct(t))
            .collect()
    }

    fn correct(&self, token: &str) -> String {
        if token.len() < MIN_CORRECTABLE_LEN
            || VOCABULARY.contains(&token)
            || !token.chars().all(char::is_alphabetic)
        {
            return token.to_string();
        }
        VOCABULARY
            .iter()
            .map(|word| (*word, jaro_winkler(token, word)))
            .filter(|(_, score)| *score >= self.correction_threshold)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(word, _)| word.to_string())
            .unwrap_or_else(|| token.to_string())
    }
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Classify with the default correction threshold.
pub fn classify(text: &str, payload: Option<&str>, state: ConversationState) -> Intent {
    IntentClassifier::new().classify(text, payload, state)
}

fn classify_payload(id: &str) -> Intent {
    match id {
        "book_ride" => return Intent::BookRide,
        "confirm_ride" | "confirm_booking" => return Intent::ConfirmRide,
        "cancel_booking" => return Intent::CancelBooking,
        "my_rides" => return Intent::MyRides,
        "main_menu" => return Intent::Greeting,
        "forgot_password" => return Intent::ForgotPassword,
        "pay_online" => return Intent::PaymentOption(PaymentMode::Online),
        "pay_cash" => return Intent::PaymentOption(PaymentMode::Cash),
        _ => {}
    }

    if let Some(car) = id.strip_prefix("car_")
        && !car.is_empty()
    {
        return Intent::CarSelection(car.to_lowercase());
    }
    if let Some(option) = id.strip_prefix("date_")
        && let Ok(option) = option.parse::<DateOption>()
    {
        return Intent::BookingDateOption(option);
    }
    if let Some(rest) = id.strip_prefix("drv_")
        && let Some((step, ride_id)) = rest.rsplit_once('_')
        && let (Ok(step), Ok(ride_id)) = (step.parse::<DriverStep>(), ride_id.parse::<i64>())
    {
        return Intent::DriverAction { step, ride_id };
    }

    Intent::Other(id.to_string())
}

/// `coupon SAVE20`, `code: save20` and `promo SAVE20` all yield `SAVE20`.
fn coupon_code(text: &str) -> Option<String> {
    let mut words = text.split(|c: char| c.is_whitespace() || c == ':');
    let lead = words.next()?.to_lowercase();
    if !COUPON_WORDS.contains(&lead.as_str()) {
        return None;
    }
    let mut rest = words.filter(|w| !w.is_empty());
    let code = rest.next()?;
    if rest.next().is_some() || !code.chars().all(char::is_alphanumeric) {
        return None;
    }
    Some(code.to_uppercase())
}

fn any_of(tokens: &[String], set: &[&str]) -> bool {
    tokens.iter().any(|t| set.contains(&t.as_str()))
}

fn contextual(text: &str, tokens: &[String], state: ConversationState) -> Intent {
    let has = |word: &str| any_of(tokens, &[word]);
    if text.is_empty() {
        return Intent::Unknown;
    }
    let owned = || text.to_string();

    match state {
        ConversationState::AwaitingBookingDateOption => {
            for option in [DateOption::Today, DateOption::Tomorrow, DateOption::Later] {
                if has(option.to_string().as_str()) {
                    return Intent::BookingDateOption(option);
                }
            }
            Intent::Unknown
        }
        ConversationState::AwaitingSpecificDate => Intent::SpecificDate(owned()),
        ConversationState::AwaitingBookingTime => Intent::BookingTime(owned()),
        ConversationState::AwaitingPickup => Intent::Pickup(owned()),
        ConversationState::AwaitingDestination => Intent::Destination(owned()),
        ConversationState::AwaitingCarType => Intent::CarSelection(text.to_lowercase()),
        ConversationState::AwaitingConfirmation => {
            if any_of(tokens, CANCEL_WORDS) {
                Intent::CancelBooking
            } else {
                Intent::Unknown
            }
        }
        ConversationState::AwaitingPaymentOption => {
            if has("online") {
                Intent::PaymentOption(PaymentMode::Online)
            } else if has("cash") {
                Intent::PaymentOption(PaymentMode::Cash)
            } else {
                Intent::Unknown
            }
        }
        ConversationState::AwaitingRegistrationName => Intent::RegistrationName(owned()),
        ConversationState::AwaitingRegistrationEmail => Intent::RegistrationEmail(owned()),
        ConversationState::AwaitingRegistrationPassword
        | ConversationState::AwaitingNewPassword => Intent::Password(owned()),
        ConversationState::AwaitingRegistrationOtp | ConversationState::AwaitingResetOtp => {
            Intent::Otp(owned())
        }
        ConversationState::AwaitingIntent | ConversationState::RideConfirmed => Intent::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn c(text: &str, state: ConversationState) -> Intent {
        classify(text, None, state)
    }

    #[test]
    fn greetings_are_exact_and_case_insensitive() {
        for g in ["hi", "Hello", " HEY ", "hii", "Namaste", "start", "MENU"] {
            assert_eq!(c(g, ConversationState::AwaitingIntent), Intent::Greeting, "{g}");
        }
        // Greetings win even mid-flow.
        assert_eq!(c("hi", ConversationState::AwaitingPickup), Intent::Greeting);
        assert_ne!(c("hi there", ConversationState::AwaitingIntent), Intent::Greeting);
    }

    #[test]
    fn payload_beats_text() {
        let state = ConversationState::AwaitingConfirmation;
        assert_eq!(
            classify("book a cab", Some("cancel_booking"), state),
            Intent::CancelBooking
        );
        assert_eq!(
            classify("", Some("car_SUV"), ConversationState::AwaitingCarType),
            Intent::CarSelection("suv".into())
        );
        assert_eq!(
            classify("", Some("date_tomorrow"), state),
            Intent::BookingDateOption(DateOption::Tomorrow)
        );
        assert_eq!(
            classify("", Some("pay_cash"), state),
            Intent::PaymentOption(PaymentMode::Cash)
        );
    }

    #[test]
    fn driver_payloads_parse_step_and_ride() {
        assert_eq!(
            classify("", Some("drv_enroute_42"), ConversationState::AwaitingIntent),
            Intent::DriverAction {
                step: DriverStep::Enroute,
                ride_id: 42
            }
        );
        assert_eq!(
            classify("", Some("drv_paid_7"), ConversationState::RideConfirmed),
            Intent::DriverAction {
                step: DriverStep::Paid,
                ride_id: 7
            }
        );
        assert_eq!(
            classify("", Some("drv_fly_7"), ConversationState::AwaitingIntent),
            Intent::Other("drv_fly_7".into())
        );
        assert_eq!(
            classify("", Some("drv_start_x"), ConversationState::AwaitingIntent),
            Intent::Other("drv_start_x".into())
        );
    }

    #[test]
    fn coupon_codes_at_the_quote() {
        let s = ConversationState::AwaitingConfirmation;
        assert_eq!(c("coupon save20", s), Intent::ApplyCoupon("SAVE20".into()));
        assert_eq!(c("Code: WELCOME10", s), Intent::ApplyCoupon("WELCOME10".into()));
        assert_eq!(c("promo RIDE", s), Intent::ApplyCoupon("RIDE".into()));
        assert_eq!(c("coupon", s), Intent::Unknown);
        assert_eq!(c("coupon two words", s), Intent::Unknown);
        assert_eq!(
            c("coupon save20", ConversationState::AwaitingPickup),
            Intent::Pickup("coupon save20".into())
        );
    }

    #[test]
    fn unknown_payload_is_kept_verbatim() {
        assert_eq!(
            classify("", Some("promo_diwali"), ConversationState::AwaitingIntent),
            Intent::Other("promo_diwali".into())
        );
        assert_eq!(
            classify("", Some("date_someday"), ConversationState::AwaitingIntent),
            Intent::Other("date_someday".into())
        );
    }

    #[test]
    fn book_words_and_misspellings() {
        let s = ConversationState::AwaitingIntent;
        assert_eq!(c("I want to book a cab", s), Intent::BookRide);
        assert_eq!(c("need a taxi", s), Intent::BookRide);
        assert_eq!(c("boook", s), Intent::BookRide);
        assert_eq!(c("taxii please", s), Intent::BookRide);
    }

    #[test]
    fn confirm_words_and_misspellings() {
        let s = ConversationState::AwaitingConfirmation;
        assert_eq!(c("yes", s), Intent::ConfirmRide);
        assert_eq!(c("Confrim", s), Intent::ConfirmRide);
        assert_eq!(c("okay", s), Intent::ConfirmRide);
        assert_eq!(c("no", s), Intent::CancelBooking);
    }

    #[test]
    fn my_rides_is_not_a_booking() {
        assert_eq!(c("my rides", ConversationState::AwaitingIntent), Intent::MyRides);
        assert_eq!(c("show my ridess", ConversationState::RideConfirmed), Intent::MyRides);
    }

    #[test]
    fn forgot_password_phrase() {
        assert_eq!(
            c("I forgot my pasword", ConversationState::AwaitingIntent),
            Intent::ForgotPassword
        );
    }

    #[test]
    fn contextual_fallback_per_state() {
        assert_eq!(
            c("Koramangala 5th block", ConversationState::AwaitingPickup),
            Intent::Pickup("Koramangala 5th block".into())
        );
        assert_eq!(
            c("airport", ConversationState::AwaitingDestination),
            Intent::Destination("airport".into())
        );
        assert_eq!(
            c("6:30 PM", ConversationState::AwaitingBookingTime),
            Intent::BookingTime("6:30 PM".into())
        );
        assert_eq!(
            c("25/10/2026", ConversationState::AwaitingSpecificDate),
            Intent::SpecificDate("25/10/2026".into())
        );
        assert_eq!(
            c("Sedan", ConversationState::AwaitingCarType),
            Intent::CarSelection("sedan".into())
        );
        assert_eq!(
            c("tommorow", ConversationState::AwaitingBookingDateOption),
            Intent::BookingDateOption(DateOption::Tomorrow)
        );
        assert_eq!(
            c("cash please", ConversationState::AwaitingPaymentOption),
            Intent::PaymentOption(PaymentMode::Cash)
        );
        assert_eq!(
            c("onlin", ConversationState::AwaitingPaymentOption),
            Intent::PaymentOption(PaymentMode::Online)
        );
    }

    #[test]
    fn credential_states_skip_keywords() {
        assert_eq!(
            c("booking1", ConversationState::AwaitingRegistrationPassword),
            Intent::Password("booking1".into())
        );
        assert_eq!(
            c("Ride Kumar", ConversationState::AwaitingRegistrationName),
            Intent::RegistrationName("Ride Kumar".into())
        );
        assert_eq!(
            c("493021", ConversationState::AwaitingResetOtp),
            Intent::Otp("493021".into())
        );
        assert_eq!(
            c("a@b.in", ConversationState::AwaitingRegistrationEmail),
            Intent::RegistrationEmail("a@b.in".into())
        );
    }

    #[test]
    fn unrecognized_without_context_is_unknown() {
        assert_eq!(c("what is this", ConversationState::AwaitingIntent), Intent::Unknown);
        assert_eq!(c("   ", ConversationState::AwaitingPickup), Intent::Unknown);
        assert_eq!(c("maybe", ConversationState::AwaitingConfirmation), Intent::Unknown);
    }

    #[test]
    fn driver_step_chain_ends_at_completed() {
        let mut step = DriverStep::Enroute;
        assert_eq!(step.from_status(), RideStatus::Assigned);
        while let Some(next) = step.next() {
            assert_eq!(step.to_status(), next.from_status());
            step = next;
        }
        assert_eq!(step.to_status(), RideStatus::Completed);
        assert_eq!(DriverStep::Arrived.payload(9), "drv_arrived_9");
    }

    #[test]
    fn labels_do_not_leak_text() {
        assert_eq!(Intent::Pickup("secret".into()).label(), "pickup");
        assert_eq!(Intent::BookRide.label(), "book_ride");
    }

    proptest! {
        #[test]
        fn classify_never_panics(text in ".{0,64}", payload in proptest::option::of("[a-z_0-9]{0,16}")) {
            let _ = classify(&text, payload.as_deref(), ConversationState::AwaitingIntent);
            let _ = classify(&text, payload.as_deref(), ConversationState::AwaitingCarType);
        }

        #[test]
        fn driver_payload_round_trips(ride_id in 1i64..1_000_000) {
            for step in [DriverStep::Enroute, DriverStep::Arrived, DriverStep::Start, DriverStep::Paid] {
                let payload = step.payload(ride_id);
                let intent = classify("", Some(&payload), ConversationState::AwaitingIntent);
                prop_assert_eq!(intent, Intent::DriverAction { step, ride_id });
            }
        }
    }
}

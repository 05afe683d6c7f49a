// SPDX-FileCopyrightText: 2026 Cabline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-phone conversation controller.
//!
//! Each inbound message is one turn: load the session, classify, run the
//! handler for the current state, persist the new session, then send the
//! queued replies. Turns for the same phone are serialized by a per-phone
//! mutex, dropped again once no turn holds it. A turn that fails or times
//! out leaves the stored session as it was and tells the sender to retry; a
//! ride booked by a turn whose session could not be saved is deleted again.

use std::future::Future;
use std::sync::Arc;

use cabline_core::model::{ConversationSession, ConversationState};
use cabline_core::{
    CablineError, Clock, InboundMessage, LocationNormalizer, NotificationGateway, OtpMailer,
    PaymentLinks, RouteLookup, StorageAdapter,
};
use cabline_intent::{Intent, IntentClassifier};
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::assignment::AssignmentEngine;
use crate::messages;
use crate::reply::{Outbound, deliver_all};
use crate::settings::BookingSettings;

/// External collaborators the engine talks to.
#[derive(Clone)]
pub struct Services {
    pub storage: Arc<dyn StorageAdapter>,
    pub notifier: Arc<dyn NotificationGateway>,
    pub routes: Arc<dyn RouteLookup>,
    pub locations: Arc<dyn LocationNormalizer>,
    pub payments: Arc<dyn PaymentLinks>,
    pub mailer: Arc<dyn OtpMailer>,
    pub clock: Arc<dyn Clock>,
}

/// Summary of one processed message.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnReport {
    pub intent: Intent,
    /// State the sender's session is in after the turn.
    pub state: ConversationState,
    pub ride_id: Option<i64>,
    /// Messages accepted by the gateway.
    pub sent: usize,
}

/// Working copy of a session plus the replies a handler has queued.
pub(crate) struct Turn {
    pub session: ConversationSession,
    pub replies: Vec<Outbound>,
}

impl Turn {
    pub fn phone(&self) -> &str {
        &self.session.phone
    }

    pub fn reply(&mut self, message: Outbound) {
        self.replies.push(message);
    }

    pub fn goto(&mut self, state: ConversationState) {
        self.session.state = state;
    }
}

pub struct ConversationEngine {
    pub(crate) services: Services,
    pub(crate) assignment: Arc<AssignmentEngine>,
    pub(crate) settings: BookingSettings,
    classifier: IntentClassifier,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl ConversationEngine {
    pub fn new(
        services: Services,
        assignment: Arc<AssignmentEngine>,
        settings: BookingSettings,
    ) -> Self {
        Self {
            services,
            assignment,
            settings,
            classifier: IntentClassifier::new(),
            locks: DashMap::new(),
        }
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn assignment(&self) -> &Arc<AssignmentEngine> {
        &self.assignment
    }

    pub fn settings(&self) -> &BookingSettings {
        &self.settings
    }

    fn lock_for(&self, phone: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(phone.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Phones with a turn lock currently allocated.
    pub fn active_turn_locks(&self) -> usize {
        self.locks.len()
    }

    /// Process one inbound message end to end.
    pub async fn handle_message(
        &self,
        message: &InboundMessage,
    ) -> Result<TurnReport, CablineError> {
        let phone = message.phone.as_str();
        let lock = self.lock_for(phone);
        let report = {
            let _guard = lock.lock().await;
            self.run_turn(message).await
        };
        drop(lock);
        // Only the map still holds the mutex when no other turn is queued.
        self.locks.remove_if(phone, |_, lock| Arc::strong_count(lock) == 1);
        report
    }

    async fn run_turn(&self, message: &InboundMessage) -> Result<TurnReport, CablineError> {
        let phone = message.phone.as_str();
        let stored = self
            .services
            .storage
            .get_session(phone)
            .await?
            .unwrap_or_else(|| ConversationSession::new(phone));
        let before = stored.state;
        let intent = self
            .classifier
            .classify(&message.text, message.payload.as_deref(), before);
        debug!(phone, intent = intent.label(), state = %before, "inbound message");

        if let Intent::DriverAction { step, ride_id } = intent {
            let replies = match self.driver_action(phone, step, ride_id).await {
                Ok(replies) => replies,
                Err(e) => vec![self.failure_reply(phone, &e)],
            };
            let sent = self.send(&replies).await;
            return Ok(TurnReport {
                intent,
                state: before,
                ride_id: Some(ride_id),
                sent,
            });
        }

        let mut turn = Turn {
            session: stored.clone(),
            replies: Vec::new(),
        };

        let (state, ride_id, replies) = match self.dispatch(&mut turn, &intent).await {
            Ok(()) => {
                turn.session.updated_at = Some(self.services.clock.now());
                if let Err(e) = self.services.storage.save_session(&turn.session).await {
                    error!(error = %e, "session save failed");
                    let booked = turn.session.ride_id.filter(|id| stored.ride_id != Some(*id));
                    if let Some(ride_id) = booked {
                        self.discard_ride(ride_id).await;
                    }
                    self.send(&[messages::internal_error(phone)]).await;
                    return Err(e);
                }
                if turn.session.state != before {
                    info!(
                        from = %before,
                        to = %turn.session.state,
                        intent = intent.label(),
                        "conversation advanced"
                    );
                }
                (turn.session.state, turn.session.ride_id, turn.replies)
            }
            Err(e) => (
                before,
                stored.ride_id,
                vec![self.failure_reply(phone, &e)],
            ),
        };

        let sent = self.send(&replies).await;
        Ok(TurnReport {
            intent,
            state,
            ride_id,
            sent,
        })
    }

    /// Undoes a booking the customer will never hear about.
    async fn discard_ride(&self, ride_id: i64) {
        match self.services.storage.delete_ride(ride_id).await {
            Ok(Some(_)) => warn!(ride_id, "ride discarded after failed session save"),
            Ok(None) => debug!(ride_id, "ride already gone"),
            Err(e) => error!(ride_id, error = %e, "could not discard ride"),
        }
    }

    fn failure_reply(&self, phone: &str, error: &CablineError) -> Outbound {
        match error {
            CablineError::Timeout { duration } => {
                warn!(?duration, "turn aborted by timeout");
                messages::timed_out(phone)
            }
            other => {
                error!(error = %other, "turn failed");
                messages::internal_error(phone)
            }
        }
    }

    async fn dispatch(&self, turn: &mut Turn, intent: &Intent) -> Result<(), CablineError> {
        match intent {
            Intent::Greeting => self.show_menu(turn).await,
            Intent::BookRide => self.start_booking(turn).await,
            Intent::MyRides => self.list_rides(turn).await,
            Intent::ForgotPassword => self.start_password_reset(turn).await,
            Intent::CancelBooking => self.cancel_booking(turn).await,
            _ => self.handle_in_state(turn, intent).await,
        }
    }

    async fn handle_in_state(&self, turn: &mut Turn, intent: &Intent) -> Result<(), CablineError> {
        use ConversationState as S;

        match (turn.session.state, intent) {
            (S::AwaitingBookingDateOption, Intent::BookingDateOption(option)) => {
                self.choose_date(turn, *option);
                Ok(())
            }
            (S::AwaitingSpecificDate, Intent::SpecificDate(text)) => {
                self.specific_date(turn, text);
                Ok(())
            }
            (S::AwaitingBookingTime, Intent::BookingTime(text)) => {
                self.booking_time(turn, text);
                Ok(())
            }
            (S::AwaitingPickup, Intent::Pickup(text)) => {
                self.pickup(turn, text);
                Ok(())
            }
            (S::AwaitingDestination, Intent::Destination(text)) => {
                self.destination(turn, text).await
            }
            (S::AwaitingCarType, Intent::CarSelection(choice)) => self.car_type(turn, choice).await,
            (S::AwaitingConfirmation, Intent::ConfirmRide) => self.confirm(turn).await,
            (S::AwaitingConfirmation, Intent::ApplyCoupon(code)) => {
                self.apply_coupon(turn, code).await
            }
            (S::AwaitingPaymentOption, Intent::PaymentOption(mode)) => {
                self.payment(turn, *mode).await
            }
            (S::AwaitingRegistrationName, Intent::RegistrationName(name)) => {
                self.registration_name(turn, name);
                Ok(())
            }
            (S::AwaitingRegistrationEmail, Intent::RegistrationEmail(email)) => {
                self.registration_email(turn, email);
                Ok(())
            }
            (S::AwaitingRegistrationPassword, Intent::Password(password)) => {
                self.registration_password(turn, password).await
            }
            (S::AwaitingRegistrationOtp, Intent::Otp(code)) => {
                self.registration_otp(turn, code).await
            }
            (S::AwaitingResetOtp, Intent::Otp(code)) => self.reset_otp(turn, code).await,
            (S::AwaitingNewPassword, Intent::Password(password)) => {
                self.new_password(turn, password).await
            }
            (state, _) if state.awaits_input() => {
                let phone = turn.phone().to_string();
                turn.reply(messages::reprompt(&phone, state));
                Ok(())
            }
            _ => self.show_menu(turn).await,
        }
    }

    /// Main menu; abandons any draft.
    pub(crate) async fn show_menu(&self, turn: &mut Turn) -> Result<(), CablineError> {
        let user = self.services.storage.get_user(turn.phone()).await?;
        turn.session.reset_booking();
        turn.session.clear_otp();
        turn.goto(ConversationState::AwaitingIntent);
        let phone = turn.phone().to_string();
        turn.reply(messages::main_menu(
            &phone,
            &self.settings.service_name,
            user.as_ref().map(|u| u.name.as_str()),
        ));
        Ok(())
    }

    async fn list_rides(&self, turn: &mut Turn) -> Result<(), CablineError> {
        let rides = self
            .services
            .storage
            .rides_for_phone(turn.phone(), self.settings.my_rides_limit)
            .await?;
        let phone = turn.phone().to_string();
        turn.reply(messages::my_rides(&phone, &rides, self.settings.utc_offset));
        Ok(())
    }

    async fn cancel_booking(&self, turn: &mut Turn) -> Result<(), CablineError> {
        use ConversationState as S;

        let state = turn.session.state;
        let draft = matches!(
            state,
            S::AwaitingBookingDateOption
                | S::AwaitingSpecificDate
                | S::AwaitingBookingTime
                | S::AwaitingPickup
                | S::AwaitingDestination
                | S::AwaitingCarType
                | S::AwaitingConfirmation
        );
        if draft {
            turn.session.reset_booking();
            turn.goto(S::AwaitingIntent);
            let phone = turn.phone().to_string();
            turn.reply(messages::booking_cancelled(&phone));
            return Ok(());
        }
        if state.awaits_input() {
            let phone = turn.phone().to_string();
            turn.reply(messages::reprompt(&phone, state));
            return Ok(());
        }
        self.show_menu(turn).await
    }

    /// Runs an external call under the configured timeout.
    pub(crate) async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, CablineError>>,
    ) -> Result<T, CablineError> {
        let duration = self.settings.external_timeout;
        tokio::time::timeout(duration, call)
            .await
            .map_err(|_| CablineError::Timeout { duration })?
    }

    async fn send(&self, messages: &[Outbound]) -> usize {
        deliver_all(
            self.services.notifier.as_ref(),
            messages,
            self.settings.external_timeout,
        )
        .await
    }
}

// SPDX-FileCopyrightText: 2026 Cabline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Registration and forgot-password sub-flows.

use cabline_core::CablineError;
use cabline_core::model::{ConversationState, NewUser};
use tracing::{info, warn};

use crate::credentials::{self, MIN_PASSWORD_LEN, OtpCheck};
use crate::engine::{ConversationEngine, Turn};
use crate::messages;
use crate::reply::Outbound;

const MAX_NAME_LEN: usize = 80;

/// Why a code is being mailed; picks the accompanying reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Issue {
    First,
    Expired,
    TooManyAttempts,
}

impl ConversationEngine {
    pub(crate) fn registration_name(&self, turn: &mut Turn, name: &str) {
        let phone = turn.phone().to_string();
        let name = name.trim();
        if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
            turn.reply(messages::ask_name(&phone));
            return;
        }
        turn.session.new_user_name = Some(name.to_string());
        turn.goto(ConversationState::AwaitingRegistrationEmail);
        turn.reply(messages::ask_email(&phone));
    }

    pub(crate) fn registration_email(&self, turn: &mut Turn, email: &str) {
        let phone = turn.phone().to_string();
        if !credentials::looks_like_email(email) {
            turn.reply(Outbound::text(&phone, "That doesn't look like a valid email address."));
            turn.reply(messages::ask_email(&phone));
            return;
        }
        turn.session.new_user_email = Some(email.trim().to_lowercase());
        turn.goto(ConversationState::AwaitingRegistrationPassword);
        turn.reply(messages::ask_password(&phone));
    }

    pub(crate) async fn registration_password(
        &self,
        turn: &mut Turn,
        password: &str,
    ) -> Result<(), CablineError> {
        let phone = turn.phone().to_string();
        let (Some(name), Some(email)) = (
            turn.session.new_user_name.clone(),
            turn.session.new_user_email.clone(),
        ) else {
            self.restart_registration(turn);
            return Ok(());
        };
        if password.chars().count() < MIN_PASSWORD_LEN {
            turn.reply(messages::ask_password(&phone));
            return Ok(());
        }

        turn.session.new_user_password_hash = Some(hash_off_thread(password).await?);
        if self.issue_otp(turn, &email, &name, Issue::First).await? {
            turn.goto(ConversationState::AwaitingRegistrationOtp);
        }
        Ok(())
    }

    pub(crate) async fn registration_otp(
        &self,
        turn: &mut Turn,
        code: &str,
    ) -> Result<(), CablineError> {
        let phone = turn.phone().to_string();
        let (Some(name), Some(email), Some(password_hash)) = (
            turn.session.new_user_name.clone(),
            turn.session.new_user_email.clone(),
            turn.session.new_user_password_hash.clone(),
        ) else {
            self.restart_registration(turn);
            return Ok(());
        };

        match self.check_code(turn, code) {
            OtpCheck::Valid => {
                let user = self
                    .services
                    .storage
                    .create_user(&NewUser {
                        phone: phone.clone(),
                        name: name.clone(),
                        email,
                        password_hash,
                    })
                    .await?;
                info!(user_id = user.id, "customer registered");
                turn.session.clear_otp();
                turn.reply(messages::registered(&phone, &name));
                self.begin_draft(turn);
            }
            OtpCheck::Mismatch => self.wrong_code(turn, &email, &name).await?,
            OtpCheck::Expired => {
                self.issue_otp(turn, &email, &name, Issue::Expired).await?;
            }
            OtpCheck::Missing => self.restart_registration(turn),
        }
        Ok(())
    }

    fn restart_registration(&self, turn: &mut Turn) {
        let phone = turn.phone().to_string();
        turn.session.clear_otp();
        turn.goto(ConversationState::AwaitingRegistrationName);
        turn.reply(messages::ask_name(&phone));
    }

    pub(crate) async fn start_password_reset(&self, turn: &mut Turn) -> Result<(), CablineError> {
        let phone = turn.phone().to_string();
        turn.session.reset_booking();
        turn.session.clear_otp();
        let Some(user) = self.services.storage.get_user(&phone).await? else {
            turn.goto(ConversationState::AwaitingIntent);
            turn.reply(messages::no_account(&phone));
            return Ok(());
        };
        let next = if self.issue_otp(turn, &user.email, &user.name, Issue::First).await? {
            ConversationState::AwaitingResetOtp
        } else {
            ConversationState::AwaitingIntent
        };
        turn.goto(next);
        Ok(())
    }

    pub(crate) async fn reset_otp(&self, turn: &mut Turn, code: &str) -> Result<(), CablineError> {
        let phone = turn.phone().to_string();
        match self.check_code(turn, code) {
            OtpCheck::Valid => {
                turn.session.clear_otp();
                turn.goto(ConversationState::AwaitingNewPassword);
                turn.reply(messages::reprompt(&phone, ConversationState::AwaitingNewPassword));
            }
            check @ (OtpCheck::Mismatch | OtpCheck::Expired) => match self
                .services
                .storage
                .get_user(&phone)
                .await?
            {
                Some(user) if check == OtpCheck::Mismatch => {
                    self.wrong_code(turn, &user.email, &user.name).await?;
                }
                Some(user) => {
                    self.issue_otp(turn, &user.email, &user.name, Issue::Expired).await?;
                }
                None => {
                    turn.session.clear_otp();
                    turn.goto(ConversationState::AwaitingIntent);
                    turn.reply(messages::no_account(&phone));
                }
            },
            OtpCheck::Missing => return self.show_menu(turn).await,
        }
        Ok(())
    }

    pub(crate) async fn new_password(
        &self,
        turn: &mut Turn,
        password: &str,
    ) -> Result<(), CablineError> {
        let phone = turn.phone().to_string();
        if password.chars().count() < MIN_PASSWORD_LEN {
            turn.reply(messages::reprompt(&phone, ConversationState::AwaitingNewPassword));
            return Ok(());
        }
        let hash = hash_off_thread(password).await?;
        self.services.storage.update_password(&phone, &hash).await?;
        info!("password reset completed");
        turn.reply(messages::password_updated(&phone));
        self.show_menu(turn).await
    }

    fn check_code(&self, turn: &Turn, code: &str) -> OtpCheck {
        credentials::check_otp(
            turn.session.otp.as_deref(),
            turn.session.otp_timestamp,
            code,
            self.services.clock.now(),
            self.settings.otp_ttl,
        )
    }

    /// Counts a wrong code; the last allowed miss replaces the code with a
    /// freshly mailed one.
    async fn wrong_code(
        &self,
        turn: &mut Turn,
        email: &str,
        name: &str,
    ) -> Result<(), CablineError> {
        turn.session.otp_attempts += 1;
        if turn.session.otp_attempts < self.settings.otp_max_attempts {
            let phone = turn.phone().to_string();
            turn.reply(messages::otp_mismatch(&phone));
            return Ok(());
        }
        warn!(attempts = turn.session.otp_attempts, "too many wrong codes, reissuing");
        self.issue_otp(turn, email, name, Issue::TooManyAttempts).await?;
        Ok(())
    }

    /// Mails a fresh code and records it on the session.
    ///
    /// Returns `false` when the mail could not be sent; the customer has
    /// been told and the caller should not advance.
    async fn issue_otp(
        &self,
        turn: &mut Turn,
        email: &str,
        name: &str,
        issue: Issue,
    ) -> Result<bool, CablineError> {
        let phone = turn.phone().to_string();
        let code = credentials::generate_otp();
        match self
            .bounded(self.services.mailer.send_otp(email, name, &code))
            .await
        {
            Ok(()) => {}
            Err(e @ CablineError::Timeout { .. }) => return Err(e),
            Err(e) => {
                warn!(error = %e, "OTP mail failed");
                turn.reply(messages::mail_failed(&phone));
                return Ok(false);
            }
        }
        turn.session.otp = Some(code);
        turn.session.otp_timestamp = Some(self.services.clock.now());
        turn.session.otp_attempts = 0;
        turn.reply(match issue {
            Issue::First => messages::otp_sent(&phone, email),
            Issue::Expired => messages::otp_expired(&phone),
            Issue::TooManyAttempts => messages::otp_reissued(&phone),
        });
        Ok(true)
    }
}

async fn hash_off_thread(password: &str) -> Result<String, CablineError> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || credentials::hash_password(&password))
        .await
        .map_err(|e| CablineError::Internal(format!("password hashing task failed: {e}")))?
}

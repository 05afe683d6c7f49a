// SPDX-FileCopyrightText: 2026 Cabline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One-time passcode mail for registration and password reset.
//!
//! [`SmtpOtpMailer`] sends through the configured relay with lettre.
//! [`LogOtpMailer`] is used when no SMTP host is configured and only logs.

use async_trait::async_trait;
use cabline_config::model::EmailConfig;
use cabline_core::types::{AdapterType, HealthStatus};
use cabline_core::{CablineError, OtpMailer, PluginAdapter};
use lettre::message::header::ContentType;
use lettre::message::{Mailbox, Message};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use tracing::{debug, warn};

/// Subject line of the passcode mail.
pub fn otp_subject(service_name: &str) -> String {
    format!("Your {service_name} verification code")
}

/// Plain-text body of the passcode mail.
pub fn otp_body(service_name: &str, name: &str, code: &str) -> String {
    format!(
        "Hi {name},\n\n\
         Your {service_name} verification code is {code}.\n\
         It expires in a few minutes. If you did not request it, you can ignore this mail.\n\n\
         - Team {service_name}\n"
    )
}

/// Sends passcodes through an SMTP relay.
pub struct SmtpOtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    service_name: String,
}

impl SmtpOtpMailer {
    /// Port 465 uses implicit TLS, port 25 plain SMTP (local relays only),
    /// anything else STARTTLS.
    pub fn new(config: &EmailConfig, service_name: &str) -> Result<Self, CablineError> {
        let host = config
            .smtp_host
            .as_deref()
            .ok_or_else(|| CablineError::Config("email.smtp_host is required for SMTP".into()))?;
        let from: Mailbox = config.from_address.parse().map_err(|e| {
            CablineError::Config(format!(
                "invalid email.from_address '{}': {e}",
                config.from_address
            ))
        })?;

        let mut builder = match config.smtp_port {
            465 => AsyncSmtpTransport::<Tokio1Executor>::relay(host),
            25 => Ok(AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)),
            _ => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host),
        }
        .map_err(|e| CablineError::Config(format!("invalid SMTP relay '{host}': {e}")))?
        .port(config.smtp_port);

        if let (Some(user), Some(pass)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from,
            service_name: service_name.to_string(),
        })
    }

    fn message(&self, email: &str, name: &str, code: &str) -> Result<Message, CablineError> {
        let address: Address = email
            .parse()
            .map_err(|e| CablineError::Mail(format!("invalid recipient '{email}': {e}")))?;
        Message::builder()
            .from(self.from.clone())
            .to(Mailbox::new(Some(name.to_string()), address))
            .subject(otp_subject(&self.service_name))
            .header(ContentType::TEXT_PLAIN)
            .body(otp_body(&self.service_name, name, code))
            .map_err(|e| CablineError::Mail(format!("failed to build mail: {e}")))
    }
}

#[async_trait]
impl PluginAdapter for SmtpOtpMailer {
    fn name(&self) -> &str {
        "smtp"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Mail
    }

    async fn health_check(&self) -> Result<HealthStatus, CablineError> {
        match self.transport.test_connection().await {
            Ok(true) => Ok(HealthStatus::Healthy),
            Ok(false) => Ok(HealthStatus::Degraded("SMTP relay refused NOOP".into())),
            Err(e) => Ok(HealthStatus::Unhealthy(format!("SMTP relay unreachable: {e}"))),
        }
    }

    async fn shutdown(&self) -> Result<(), CablineError> {
        Ok(())
    }
}

#[async_trait]
impl OtpMailer for SmtpOtpMailer {
    async fn send_otp(&self, email: &str, name: &str, code: &str) -> Result<(), CablineError> {
        let message = self.message(email, name, code)?;
        self.transport.send(message).await.map_err(|e| {
            warn!(error = %e, "SMTP send failed");
            CablineError::Mail(format!("SMTP send failed: {e}"))
        })?;
        debug!("verification code mailed");
        Ok(())
    }
}

/// Development stand-in: the code goes to the log instead of a mailbox.
#[derive(Debug, Default)]
pub struct LogOtpMailer;

#[async_trait]
impl PluginAdapter for LogOtpMailer {
    fn name(&self) -> &str {
        "log-mailer"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Mail
    }

    async fn health_check(&self) -> Result<HealthStatus, CablineError> {
        Ok(HealthStatus::Degraded(
            "email.smtp_host not set, codes are only logged".into(),
        ))
    }

    async fn shutdown(&self) -> Result<(), CablineError> {
        Ok(())
    }
}

#[async_trait]
impl OtpMailer for LogOtpMailer {
    async fn send_otp(&self, email: &str, name: &str, code: &str) -> Result<(), CablineError> {
        debug!(email, name, code, "verification code (SMTP not configured)");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> EmailConfig {
        EmailConfig {
            smtp_host: Some("smtp.example.com".into()),
            smtp_port: 587,
            username: Some("bot".into()),
            password: Some("pw".into()),
            from_address: "Cabline <no-reply@example.com>".into(),
        }
    }

    #[test]
    fn body_names_customer_and_code() {
        let body = otp_body("Cabline", "Asha", "482913");
        assert!(body.starts_with("Hi Asha,"));
        assert!(body.contains("verification code is 482913"));
        assert_eq!(otp_subject("Cabline"), "Your Cabline verification code");
    }

    #[tokio::test]
    async fn builds_message_for_valid_recipient() {
        let mailer = SmtpOtpMailer::new(&config(), "Cabline").unwrap();
        let message = mailer.message("asha@example.com", "Asha", "482913").unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("To: Asha <asha@example.com>"));
        assert!(raw.contains("Subject: Your Cabline verification code"));
    }

    #[tokio::test]
    async fn invalid_recipient_is_mail_error() {
        let mailer = SmtpOtpMailer::new(&config(), "Cabline").unwrap();
        assert!(matches!(
            mailer.message("not-an-address", "Asha", "1"),
            Err(CablineError::Mail(_))
        ));
    }

    #[test]
    fn missing_host_or_bad_sender_is_config_error() {
        let mut no_host = config();
        no_host.smtp_host = None;
        assert!(matches!(
            SmtpOtpMailer::new(&no_host, "Cabline"),
            Err(CablineError::Config(_))
        ));

        let mut bad_from = config();
        bad_from.from_address = "nobody".into();
        assert!(matches!(
            SmtpOtpMailer::new(&bad_from, "Cabline"),
            Err(CablineError::Config(_))
        ));
    }

    #[tokio::test]
    async fn log_mailer_always_succeeds() {
        LogOtpMailer.send_otp("a@example.com", "A", "123456").await.unwrap();
    }
}

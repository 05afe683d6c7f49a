// SPDX-FileCopyrightText: 2026 Cabline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Cabline booking service.

use thiserror::Error;

/// The primary error type used across all Cabline adapter traits and core operations.
#[derive(Debug, Error)]
pub enum CablineError {
    /// Configuration errors (invalid TOML, missing credentials, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Outbound messaging errors (API failure, rejected payload, rate limiting).
    #[error("notification error: {message}")]
    Notification {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Route lookup failed. The message is safe to show to the customer.
    #[error("{message}")]
    Route { message: String },

    /// Payment reference creation or payment callback handling failed.
    #[error("payment error: {0}")]
    Payment(String),

    /// OTP mail delivery failed.
    #[error("mail error: {0}")]
    Mail(String),

    /// A referenced entity does not exist.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// Request or input rejected by a domain rule.
    #[error("validation error: {0}")]
    Validation(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CablineError {
    /// Shorthand for a route error carrying a customer-facing message.
    pub fn route(message: impl Into<String>) -> Self {
        CablineError::Route {
            message: message.into(),
        }
    }

    /// Shorthand for a storage error wrapping a plain message.
    pub fn storage_msg(message: impl Into<String>) -> Self {
        CablineError::Storage {
            source: message.into().into(),
        }
    }
}

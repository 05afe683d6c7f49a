// SPDX-FileCopyrightText: 2026 Cabline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One-time-password delivery.

use async_trait::async_trait;

use crate::error::CablineError;
use crate::traits::adapter::PluginAdapter;

#[async_trait]
pub trait OtpMailer: PluginAdapter {
    /// Sends `code` to `email`, addressed to `name`.
    async fn send_otp(&self, email: &str, name: &str, code: &str) -> Result<(), CablineError>;
}

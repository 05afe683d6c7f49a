// SPDX-FileCopyrightText: 2026 Cabline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Base trait shared by every external collaborator.

use async_trait::async_trait;

use crate::error::CablineError;
use crate::types::{AdapterType, HealthStatus};

/// Identity, lifecycle and health check for an adapter (storage, messaging,
/// routing, mail).
#[async_trait]
pub trait PluginAdapter: Send + Sync + 'static {
    /// Human-readable name of this adapter instance.
    fn name(&self) -> &str;

    fn version(&self) -> semver::Version;

    fn adapter_type(&self) -> AdapterType;

    async fn health_check(&self) -> Result<HealthStatus, CablineError>;

    /// Releases held resources. Called once during shutdown.
    async fn shutdown(&self) -> Result<(), CablineError>;
}

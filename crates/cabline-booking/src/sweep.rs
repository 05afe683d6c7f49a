// SPDX-FileCopyrightText: 2026 Cabline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Periodic assignment of pre-booked rides.
//!
//! Every tick, while auto-assignment is enabled, the sweep picks up
//! prebooked rides without a driver whose start time falls inside the
//! lookahead window and tries to claim a pair for each. Rides that cannot
//! be served yet are left for the next tick; one failing ride never stops
//! the others.

use std::sync::Arc;

use cabline_core::{CablineError, Clock, StorageAdapter};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::assignment::AssignmentEngine;
use crate::settings::SweepSettings;

/// What one sweep tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Auto-assignment was switched off; nothing was read.
    pub disabled: bool,
    pub considered: usize,
    pub assigned: usize,
    /// No pair free; retried next tick.
    pub deferred: usize,
    pub failed: usize,
}

pub struct AssignmentSweep {
    storage: Arc<dyn StorageAdapter>,
    assignment: Arc<AssignmentEngine>,
    clock: Arc<dyn Clock>,
    settings: SweepSettings,
}

impl AssignmentSweep {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        assignment: Arc<AssignmentEngine>,
        clock: Arc<dyn Clock>,
        settings: SweepSettings,
    ) -> Self {
        Self {
            storage,
            assignment,
            clock,
            settings,
        }
    }

    /// Runs a single tick.
    pub async fn run_once(&self) -> Result<SweepReport, CablineError> {
        if !self.storage.auto_assignment_enabled().await? {
            debug!("auto-assignment disabled, sweep skipped");
            return Ok(SweepReport {
                disabled: true,
                ..SweepReport::default()
            });
        }

        let now = self.clock.now();
        let due = self
            .storage
            .prebooked_due(now, now + self.settings.lookahead)
            .await?;

        let mut report = SweepReport::default();
        for ride in due.iter().filter(|r| r.driver_id.is_none()) {
            report.considered += 1;
            match self.assignment.assign_existing(ride.id).await {
                Ok(Some(_)) => report.assigned += 1,
                Ok(None) => report.deferred += 1,
                Err(e) => {
                    report.failed += 1;
                    warn!(ride_id = ride.id, error = %e, "sweep assignment failed");
                }
            }
        }

        if report.considered > 0 {
            info!(
                considered = report.considered,
                assigned = report.assigned,
                deferred = report.deferred,
                failed = report.failed,
                "assignment sweep finished"
            );
        }
        Ok(report)
    }

    /// Ticks every `interval` until `cancel` fires. Tick errors are logged
    /// and never end the loop.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.settings.interval);
        // Skip the first immediate tick.
        interval.tick().await;

        info!(
            interval_secs = self.settings.interval.as_secs(),
            lookahead_minutes = self.settings.lookahead.num_minutes(),
            "assignment sweep started"
        );
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.run_once().await {
                        warn!(error = %e, "assignment sweep tick failed (non-fatal)");
                    }
                }
                _ = cancel.cancelled() => {
                    info!("assignment sweep shutting down");
                    break;
                }
            }
        }
    }
}

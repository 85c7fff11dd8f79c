//! Background jobs: weekend duty rotation and the yearly vacation reset.
//!
//! The loop wakes every `tick` and checks whether a job is due. Both checks
//! consult the database first, so a restart or an extra tick on the same
//! day does not run a job twice.

use std::time::Duration;

use chrono::{Datelike, NaiveDate, Weekday};
use tokio_util::sync::CancellationToken;

use crate::{
    common::{error::AppError, today},
    services::{duty_service::DutyService, period_service::PeriodService, store::LeaveStore},
};

#[derive(Debug, Clone, Copy)]
pub struct ScheduleConfig {
    pub tick: Duration,
    pub rotation_weekday: Weekday,
    pub reset_window_days: u32,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub rotated: bool,
    pub reset: bool,
}

/// First day of the year `today` falls in, while still inside the window.
pub fn period_boundary(today: NaiveDate, window_days: u32) -> Option<NaiveDate> {
    if today.ordinal0() >= window_days {
        return None;
    }
    NaiveDate::from_ymd_opt(today.year(), 1, 1)
}

pub struct Scheduler<S> {
    duty: DutyService<S>,
    periods: PeriodService<S>,
    config: ScheduleConfig,
}

impl<S: LeaveStore> Scheduler<S> {
    pub fn new(duty: DutyService<S>, periods: PeriodService<S>, config: ScheduleConfig) -> Self {
        Self { duty, periods, config }
    }

    pub async fn run_once(&self, today: NaiveDate) -> TickReport {
        let rotated = match self.rotate_if_due(today).await {
            Ok(rotated) => rotated,
            Err(AppError::EmptyRoster) => false,
            Err(e) => {
                tracing::error!(error = %e, "Scheduler: duty rotation failed");
                false
            }
        };
        let reset = match self.reset_if_due(today).await {
            Ok(reset) => reset,
            Err(e) => {
                tracing::error!(error = %e, "Scheduler: period reset failed");
                false
            }
        };
        TickReport { rotated, reset }
    }

    async fn rotate_if_due(&self, today: NaiveDate) -> Result<bool, AppError> {
        if today.weekday() != self.config.rotation_weekday || self.duty.covers_upcoming_weekend(today).await? {
            return Ok(false);
        }
        self.duty.advance(today).await?;
        Ok(true)
    }

    async fn reset_if_due(&self, today: NaiveDate) -> Result<bool, AppError> {
        let Some(boundary) = period_boundary(today, self.config.reset_window_days) else {
            return Ok(false);
        };
        if self.periods.reset_recorded(boundary).await? {
            return Ok(false);
        }
        self.periods.reset(boundary).await?;
        Ok(true)
    }

    /// Runs until `cancel` is triggered.
    pub async fn run(self, cancel: CancellationToken) {
        tracing::info!(
            tick_secs = self.config.tick.as_secs(),
            rotation_weekday = %self.config.rotation_weekday,
            reset_window_days = self.config.reset_window_days,
            "Scheduler started"
        );

        let mut interval = tokio::time::interval(self.config.tick);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Scheduler stopping");
                    break;
                }
                _ = interval.tick() => {
                    let report = self.run_once(today()).await;
                    if report.rotated || report.reset {
                        tracing::info!(rotated = report.rotated, reset = report.reset, "Scheduler: jobs ran");
                    } else {
                        tracing::debug!("Scheduler: nothing due");
                    }
                }
            }
        }
    }
}

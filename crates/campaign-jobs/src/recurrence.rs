//! Recurring schedules.
//!
//! Each recurring job owns at most one schedule, keyed by its schedule hook.
//! Creating one is check-then-act against the queue; a rare duplicate is
//! harmless because every handler tolerates being invoked twice.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use tracing;

use campaign_core::result::AppResult;
use campaign_queue::{NextRun, TaskQueue};

use crate::job::{RecurringJob, ScheduleAnchor};

/// Result of [`Recurrence::schedule_recurring`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleOutcome {
    /// A new schedule was created with this first run.
    Scheduled(DateTime<Utc>),
    /// A schedule already exists; nothing changed.
    AlreadyScheduled,
    /// The job is disabled; any schedule was canceled.
    Disabled,
}

/// Creates, cancels and repairs recurring schedules.
#[derive(Debug, Clone)]
pub struct Recurrence {
    /// Queue holding the schedules.
    queue: Arc<dyn TaskQueue>,
    /// Site timezone for midnight-anchored schedules.
    tz: Tz,
}

impl Recurrence {
    /// Create a new recurrence manager.
    pub fn new(queue: Arc<dyn TaskQueue>, tz: Tz) -> Self {
        Self { queue, tz }
    }

    /// Site timezone.
    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Ensure `job` has exactly one schedule if enabled, none otherwise.
    pub async fn schedule_recurring(&self, job: &dyn RecurringJob) -> AppResult<ScheduleOutcome> {
        if !job.is_enabled() {
            self.cancel_recurring(job).await?;
            return Ok(ScheduleOutcome::Disabled);
        }

        let hook = job.schedule_hook();
        if self.queue.next_scheduled(&hook, None).await?.is_some() {
            return Ok(ScheduleOutcome::AlreadyScheduled);
        }

        let first_run = self.first_run(job.anchor(), job.interval(), Utc::now());
        self.queue
            .schedule_recurring(&hook, job.schedule_args(), first_run, job.interval())
            .await?;

        tracing::info!(
            "Scheduled recurring job '{}' on '{}': first run {}, every {}s",
            job.name(),
            hook,
            first_run,
            job.interval().num_seconds()
        );
        Ok(ScheduleOutcome::Scheduled(first_run))
    }

    /// Remove the schedule of `job`. In-flight tasks keep running.
    pub async fn cancel_recurring(&self, job: &dyn RecurringJob) -> AppResult<usize> {
        let hook = job.schedule_hook();
        let canceled = self.queue.cancel(&hook).await?;
        if canceled > 0 {
            tracing::info!("Canceled recurring schedule for job '{}'", job.name());
        }
        Ok(canceled)
    }

    /// First run of a schedule created at `now`.
    pub fn first_run(
        &self,
        anchor: ScheduleAnchor,
        interval: Duration,
        now: DateTime<Utc>,
    ) -> DateTime<Utc> {
        match anchor {
            ScheduleAnchor::Interval => now + interval,
            ScheduleAnchor::LocalMidnight => next_local_midnight(now, self.tz),
        }
    }

    /// Check that a midnight-anchored schedule still lands on local midnight
    /// and reschedule it if it drifted (DST changes, timezone edits) or
    /// disappeared. A disabled job loses its schedule instead.
    ///
    /// Returns whether a new schedule was created.
    pub async fn verify_midnight_schedule(&self, job: &dyn RecurringJob) -> AppResult<bool> {
        if job.anchor() != ScheduleAnchor::LocalMidnight {
            return Ok(false);
        }
        if !job.is_enabled() {
            self.cancel_recurring(job).await?;
            return Ok(false);
        }

        let hook = job.schedule_hook();
        match self.queue.next_scheduled(&hook, None).await? {
            Some(NextRun::At(at)) if is_local_midnight(at, self.tz) => Ok(false),
            Some(NextRun::InProgress) => Ok(false),
            Some(NextRun::At(at)) => {
                tracing::warn!(
                    "Schedule for job '{}' drifted to {} ({}), rescheduling at local midnight",
                    job.name(),
                    at.with_timezone(&self.tz),
                    self.tz
                );
                self.queue.cancel(&hook).await?;
                Ok(matches!(
                    self.schedule_recurring(job).await?,
                    ScheduleOutcome::Scheduled(_)
                ))
            }
            None => {
                tracing::warn!("Schedule for job '{}' is missing, recreating", job.name());
                Ok(matches!(
                    self.schedule_recurring(job).await?,
                    ScheduleOutcome::Scheduled(_)
                ))
            }
        }
    }
}

/// The first instant of the next local day in `tz`.
///
/// Where a DST transition skips midnight, the first valid hour of that day
/// is used instead.
pub fn next_local_midnight(now: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
    let today = now.with_timezone(&tz).date_naive();
    let Some(tomorrow) = today.succ_opt() else {
        return now + Duration::days(1);
    };

    (0..4)
        .filter_map(|hour| NaiveTime::from_hms_opt(hour, 0, 0))
        .find_map(|time| tz.from_local_datetime(&tomorrow.and_time(time)).earliest())
        .map(|local| local.with_timezone(&Utc))
        .unwrap_or_else(|| now + Duration::days(1))
}

/// Whether `at` is the start of a local day in `tz`.
pub fn is_local_midnight(at: DateTime<Utc>, tz: Tz) -> bool {
    next_local_midnight(at - Duration::seconds(1), tz) == at
}

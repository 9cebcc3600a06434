//! Job service: process-wide wiring of jobs into the task queue.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::Value;
use tracing;

use campaign_core::config::AppConfig;
use campaign_core::error::AppError;
use campaign_core::result::AppResult;
use campaign_core::types::{Item, JobArgs};
use campaign_queue::TaskQueue;

use crate::batch::BatchController;
use crate::hooks::{self, HookAction};
use crate::job::{Job, ScheduleAnchor};
use crate::message::JobMessage;
use crate::monitor::JobMonitor;
use crate::recurrence::{Recurrence, ScheduleOutcome};
use crate::registry::JobRegistry;
use crate::router::{HookRoutes, JobRouter};

/// Summary of an [`JobService::init`] pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitReport {
    /// Jobs whose hooks were wired.
    pub jobs: usize,
    /// Recurring schedules created by this pass.
    pub scheduled: usize,
    /// Recurring schedules that already existed.
    pub already_scheduled: usize,
    /// Recurring jobs that are disabled.
    pub disabled: usize,
    /// Jobs that could not be wired or scheduled.
    pub failed: usize,
}

/// Owns the job registry and everything needed to run its jobs.
#[derive(Debug)]
pub struct JobService {
    /// Queue all job tasks go through.
    queue: Arc<dyn TaskQueue>,
    /// Registered jobs.
    registry: Arc<JobRegistry>,
    /// Task router (holds the controller and recurrence manager).
    router: JobRouter,
    /// Interval of the midnight self-check.
    midnight_check_interval: Duration,
}

impl JobService {
    /// Build the service for `registry` on top of `queue`.
    pub fn new(
        queue: Arc<dyn TaskQueue>,
        registry: Arc<JobRegistry>,
        config: &AppConfig,
    ) -> AppResult<Self> {
        let monitor = JobMonitor::new(Arc::clone(&queue), &config.jobs)?;
        let controller = BatchController::new(Arc::clone(&queue), monitor, &config.jobs);
        let recurrence = Recurrence::new(Arc::clone(&queue), config.site.tz()?);
        let router = JobRouter::new(Arc::clone(&registry), controller, recurrence);
        let midnight_check_interval = Duration::try_seconds(
            config.jobs.midnight_check_interval_seconds,
        )
        .ok_or_else(|| {
            AppError::configuration("jobs.midnight_check_interval_seconds is out of range")
        })?;

        Ok(Self {
            queue,
            registry,
            router,
            midnight_check_interval,
        })
    }

    /// Wire every job's hooks and schedule every recurring job.
    ///
    /// Safe to call repeatedly: routes are re-registered as no-ops and
    /// existing schedules are left alone. A job that fails to initialize is
    /// logged and counted in [`InitReport::failed`]; the others still run.
    pub async fn init(&self) -> AppResult<InitReport> {
        let mut report = InitReport::default();
        let mut has_midnight_jobs = false;

        for job in self.registry.all() {
            let outcome = match self.init_job(job.as_ref()).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!(
                        job = %job.name(),
                        code = e.kind.code(),
                        "Failed to initialize job: {}",
                        e
                    );
                    report.failed += 1;
                    continue;
                }
            };
            report.jobs += 1;

            match outcome {
                Some(ScheduleOutcome::Scheduled(_)) => report.scheduled += 1,
                Some(ScheduleOutcome::AlreadyScheduled) => report.already_scheduled += 1,
                Some(ScheduleOutcome::Disabled) => report.disabled += 1,
                None => {}
            }

            if let Some(recurring) = job.as_recurring() {
                if recurring.anchor() == ScheduleAnchor::LocalMidnight && recurring.is_enabled() {
                    has_midnight_jobs = true;
                }
            }
        }

        if has_midnight_jobs {
            self.schedule_midnight_check().await?;
        }

        tracing::info!(
            "Job service initialized: {} job(s), {} schedule(s) created, {} existing, {} disabled, {} failed",
            report.jobs,
            report.scheduled,
            report.already_scheduled,
            report.disabled,
            report.failed
        );
        Ok(report)
    }

    /// Cancel every recurring schedule, including the midnight self-check.
    ///
    /// Tasks already dispatched keep running. Returns the number of pending
    /// tasks canceled.
    pub async fn deactivate(&self) -> AppResult<usize> {
        let mut canceled = 0;
        for job in self.registry.all() {
            if let Some(recurring) = job.as_recurring() {
                canceled += self.router.recurrence().cancel_recurring(recurring).await?;
            }
        }
        canceled += self.queue.cancel(&hooks::midnight_check()).await?;

        tracing::info!("Job service deactivated, {} scheduled task(s) canceled", canceled);
        Ok(canceled)
    }

    /// Look up a job by name.
    pub fn get_job(&self, name: &str) -> AppResult<Arc<dyn Job>> {
        self.registry.get(name)
    }

    /// Start a batched job now. Returns `Ok(false)` when the start was a
    /// no-op because the job is already running or has nothing to do.
    pub async fn start_batched(&self, name: &str, args: JobArgs) -> AppResult<bool> {
        let job = self.registry.get(name)?;
        let batched = job.as_batched().ok_or_else(|| {
            AppError::invalid_argument(format!("Job '{name}' is not a batched job"))
        })?;
        self.router.controller().start(batched, args).await
    }

    /// Start a one-time job over `items`. Returns the number of item tasks
    /// enqueued.
    pub async fn start_one_time(&self, name: &str, items: Vec<Item>) -> AppResult<usize> {
        let job = self.registry.get(name)?;
        let one_time = job.as_one_time().ok_or_else(|| {
            AppError::invalid_argument(format!("Job '{name}' is not a one-time job"))
        })?;
        self.router.controller().start_one_time(one_time, items).await
    }

    /// Start a job asynchronously by enqueueing a task on its start hook.
    pub async fn enqueue_start(&self, name: &str, args: JobArgs) -> AppResult<()> {
        self.registry.get(name)?;
        let message = JobMessage::Start { args };
        self.queue
            .schedule_immediate(&hooks::start(name), message.into_task_args())
            .await?;
        Ok(())
    }

    /// Deliver a task dispatched by the queue.
    pub async fn dispatch(&self, hook: &str, args: &[Value]) -> AppResult<()> {
        self.router.dispatch(hook, args).await
    }

    /// Repair midnight-anchored schedules. Returns how many were recreated.
    pub async fn verify_midnight_schedules(&self) -> AppResult<usize> {
        self.router.verify_midnight_schedules().await
    }

    /// The route table.
    pub fn routes(&self) -> &HookRoutes {
        self.router.routes()
    }

    /// The job registry.
    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    /// The failure-rate monitor.
    pub fn monitor(&self) -> &JobMonitor {
        self.router.controller().monitor()
    }

    /// Wire one job and, if it recurs, make sure it is scheduled.
    async fn init_job(&self, job: &dyn Job) -> AppResult<Option<ScheduleOutcome>> {
        self.wire(job)?;
        match job.as_recurring() {
            Some(recurring) => Ok(Some(
                self.router.recurrence().schedule_recurring(recurring).await?,
            )),
            None => Ok(None),
        }
    }

    /// Register the capability hooks of `job`, then let it add its own.
    fn wire(&self, job: &dyn Job) -> AppResult<()> {
        let routes = self.router.routes();
        let name = job.name();

        if job.as_batched().is_some() {
            routes.register(&hooks::start(name), name, HookAction::Start)?;
            routes.register(&hooks::create_batch(name), name, HookAction::CreateBatch)?;
            routes.register(&hooks::process_item(name), name, HookAction::ProcessItem)?;
        } else if job.as_one_time().is_some() {
            routes.register(&hooks::process_item(name), name, HookAction::ProcessItem)?;
        }

        if job.as_runnable().is_some() {
            routes.register(&hooks::run(name), name, HookAction::Run)?;
            routes.register(&hooks::start(name), name, HookAction::Start)?;
        }

        if let Some(on_hook) = job.as_start_on_hook() {
            routes.register(&on_hook.start_hook(), name, HookAction::Start)?;
        }

        job.init(routes)?;
        tracing::debug!("Wired hooks for job '{}'", name);
        Ok(())
    }

    async fn schedule_midnight_check(&self) -> AppResult<()> {
        self.router.routes().register_midnight_check()?;

        let hook = hooks::midnight_check();
        if self.queue.next_scheduled(&hook, None).await?.is_some() {
            return Ok(());
        }

        let first_run = Utc::now() + self.midnight_check_interval;
        self.queue
            .schedule_recurring(&hook, Vec::new(), first_run, self.midnight_check_interval)
            .await?;
        tracing::info!(
            "Scheduled midnight schedule check every {}s",
            self.midnight_check_interval.num_seconds()
        );
        Ok(())
    }
}

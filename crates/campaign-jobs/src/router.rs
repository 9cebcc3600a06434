//! Hook router: maps hook names to jobs and decodes task payloads into
//! typed messages.

use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;
use tracing::{debug, info};

use campaign_core::error::AppError;
use campaign_core::result::AppResult;

use crate::batch::BatchController;
use crate::hooks::{self, HookAction};
use crate::message::JobMessage;
use crate::recurrence::Recurrence;
use crate::registry::JobRegistry;

/// Where a hook is delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// A hook belonging to one job.
    Job {
        /// Target job name.
        job: String,
        /// Hook kind.
        action: HookAction,
    },
    /// The midnight schedule self-check.
    MidnightCheck,
}

/// Hook name → route table.
#[derive(Debug, Default)]
pub struct HookRoutes {
    /// Registered routes.
    routes: DashMap<String, Route>,
}

impl HookRoutes {
    /// Create an empty route table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Route `hook` to `action` on `job`.
    ///
    /// Re-registering the same route is a no-op. A hook already routed to
    /// something else is a conflict.
    pub fn register(&self, hook: &str, job: &str, action: HookAction) -> AppResult<()> {
        self.insert(
            hook,
            Route::Job {
                job: job.to_string(),
                action,
            },
        )
    }

    /// Route the midnight self-check hook.
    pub fn register_midnight_check(&self) -> AppResult<()> {
        self.insert(&hooks::midnight_check(), Route::MidnightCheck)
    }

    /// Look up the route for `hook`.
    pub fn get(&self, hook: &str) -> Option<Route> {
        self.routes.get(hook).map(|entry| entry.value().clone())
    }

    /// Whether `hook` is routed.
    pub fn contains(&self, hook: &str) -> bool {
        self.routes.contains_key(hook)
    }

    /// All routed hook names, sorted.
    pub fn hooks(&self) -> Vec<String> {
        let mut hooks: Vec<String> = self.routes.iter().map(|e| e.key().clone()).collect();
        hooks.sort();
        hooks
    }

    fn insert(&self, hook: &str, route: Route) -> AppResult<()> {
        if let Some(existing) = self.routes.get(hook) {
            if *existing.value() == route {
                return Ok(());
            }
            return Err(AppError::conflict(format!(
                "Hook '{hook}' is already routed to {:?}",
                existing.value()
            )));
        }

        debug!(hook = %hook, route = ?route, "Hook route registered");
        self.routes.insert(hook.to_string(), route);
        Ok(())
    }
}

/// Dispatches queue tasks to the typed job handlers.
#[derive(Debug)]
pub struct JobRouter {
    /// Jobs by name.
    registry: Arc<JobRegistry>,
    /// Batched/one-time run control.
    controller: BatchController,
    /// Recurring schedule management.
    recurrence: Recurrence,
    /// Route table filled in by the service.
    routes: HookRoutes,
}

impl JobRouter {
    /// Create a router with an empty route table.
    pub fn new(registry: Arc<JobRegistry>, controller: BatchController, recurrence: Recurrence) -> Self {
        Self {
            registry,
            controller,
            recurrence,
            routes: HookRoutes::new(),
        }
    }

    /// The route table.
    pub fn routes(&self) -> &HookRoutes {
        &self.routes
    }

    /// The batch controller.
    pub fn controller(&self) -> &BatchController {
        &self.controller
    }

    /// The recurrence manager.
    pub fn recurrence(&self) -> &Recurrence {
        &self.recurrence
    }

    /// Deliver one task.
    pub async fn dispatch(&self, hook: &str, task_args: &[Value]) -> AppResult<()> {
        let route = self.routes.get(hook).ok_or_else(|| {
            AppError::invalid_argument(format!("No handler registered for hook '{hook}'"))
        })?;

        match route {
            Route::MidnightCheck => {
                let rescheduled = self.verify_midnight_schedules().await?;
                if rescheduled > 0 {
                    info!("Midnight check rescheduled {} job(s)", rescheduled);
                }
                Ok(())
            }
            Route::Job { job, action } => {
                let message = JobMessage::decode(action, task_args)?;
                self.deliver(&job, message).await
            }
        }
    }

    /// Deliver a typed message to the job called `job_name`.
    pub async fn deliver(&self, job_name: &str, message: JobMessage) -> AppResult<()> {
        let job = self.registry.get(job_name)?;

        if matches!(message, JobMessage::Start { .. } | JobMessage::Run) {
            if let Some(recurring) = job.as_recurring() {
                if !recurring.is_enabled() {
                    self.recurrence.cancel_recurring(recurring).await?;
                    info!("Job '{}' is disabled, skipping run", job_name);
                    return Ok(());
                }
            }
        }

        match message {
            JobMessage::Start { args } => {
                if let Some(batched) = job.as_batched() {
                    self.controller.start(batched, args).await?;
                    Ok(())
                } else if let Some(runnable) = job.as_runnable() {
                    runnable.run().await
                } else {
                    Err(unsupported(job_name, HookAction::Start))
                }
            }
            JobMessage::CreateBatch { batch_number, args } => {
                let batched = job
                    .as_batched()
                    .ok_or_else(|| unsupported(job_name, HookAction::CreateBatch))?;
                self.controller
                    .handle_create_batch(batched, batch_number, args)
                    .await?;
                Ok(())
            }
            JobMessage::ProcessItem { item, args } => {
                if let Some(batched) = job.as_batched() {
                    self.controller.handle_process_item(batched, &item, &args).await
                } else if let Some(one_time) = job.as_one_time() {
                    self.controller.handle_one_time_item(one_time, &item).await
                } else {
                    Err(unsupported(job_name, HookAction::ProcessItem))
                }
            }
            JobMessage::Run => job
                .as_runnable()
                .ok_or_else(|| unsupported(job_name, HookAction::Run))?
                .run()
                .await,
        }
    }

    /// Verify every midnight-anchored schedule. Returns how many were
    /// recreated.
    pub async fn verify_midnight_schedules(&self) -> AppResult<usize> {
        let mut rescheduled = 0;
        for job in self.registry.all() {
            if let Some(recurring) = job.as_recurring() {
                if self.recurrence.verify_midnight_schedule(recurring).await? {
                    rescheduled += 1;
                }
            }
        }
        Ok(rescheduled)
    }
}

fn unsupported(job_name: &str, action: HookAction) -> AppError {
    AppError::invalid_argument(format!(
        "Job '{job_name}' does not handle '{action}' tasks"
    ))
}

//! Job registry: the fixed set of jobs for the process, looked up by name.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use tracing;

use campaign_core::error::AppError;
use campaign_core::result::AppResult;

use crate::hooks::{self, MIDNIGHT_CHECK_JOB};
use crate::job::Job;

/// Produces a list of jobs to register.
type JobSource = Box<dyn Fn() -> Vec<Arc<dyn Job>> + Send + Sync>;

/// The loaded job set.
struct LoadedJobs {
    /// Jobs in registration order.
    ordered: Vec<Arc<dyn Job>>,
    /// Jobs by name.
    by_name: HashMap<String, Arc<dyn Job>>,
}

/// Registry of every job in the process.
///
/// Jobs are built lazily from the registered sources the first time the
/// registry is read, then frozen. Extensions append to the list; a job
/// whose name is already taken is skipped rather than replacing the
/// earlier registration.
pub struct JobRegistry {
    /// Core source first, then extensions in order.
    sources: Vec<JobSource>,
    /// Built on first read.
    loaded: OnceLock<LoadedJobs>,
}

impl JobRegistry {
    /// Create a registry whose core jobs come from `source`.
    pub fn new<F>(source: F) -> Self
    where
        F: Fn() -> Vec<Arc<dyn Job>> + Send + Sync + 'static,
    {
        Self {
            sources: vec![Box::new(source)],
            loaded: OnceLock::new(),
        }
    }

    /// Create a registry with no core jobs.
    pub fn empty() -> Self {
        Self {
            sources: Vec::new(),
            loaded: OnceLock::new(),
        }
    }

    /// Append jobs from a third-party source.
    ///
    /// Fails once the registry has been read.
    pub fn extend<F>(&mut self, source: F) -> AppResult<()>
    where
        F: Fn() -> Vec<Arc<dyn Job>> + Send + Sync + 'static,
    {
        if self.is_frozen() {
            return Err(AppError::conflict(
                "Job registry is frozen; extensions must be added before first use",
            ));
        }
        self.sources.push(Box::new(source));
        Ok(())
    }

    /// Whether the job list has been built.
    pub fn is_frozen(&self) -> bool {
        self.loaded.get().is_some()
    }

    /// All jobs in registration order.
    pub fn all(&self) -> &[Arc<dyn Job>] {
        &self.load().ordered
    }

    /// Look up a job by name.
    pub fn get(&self, name: &str) -> AppResult<Arc<dyn Job>> {
        self.load()
            .by_name
            .get(name)
            .cloned()
            .ok_or_else(|| AppError::job_not_found(name))
    }

    /// Whether a job with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.load().by_name.contains_key(name)
    }

    /// Names of all jobs in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.all().iter().map(|job| job.name()).collect()
    }

    fn load(&self) -> &LoadedJobs {
        self.loaded.get_or_init(|| {
            let mut ordered: Vec<Arc<dyn Job>> = Vec::new();
            let mut by_name = HashMap::new();

            for job in self.sources.iter().flat_map(|source| source()) {
                let name = job.name().to_string();

                if !hooks::is_valid_job_name(&name) || name == MIDNIGHT_CHECK_JOB {
                    tracing::warn!("Skipping job with invalid or reserved name '{}'", name);
                    continue;
                }
                if by_name.contains_key(&name) {
                    tracing::warn!("Skipping duplicate job '{}'; first registration wins", name);
                    continue;
                }

                by_name.insert(name, Arc::clone(&job));
                ordered.push(job);
            }

            tracing::info!("Job registry loaded with {} job(s)", ordered.len());
            LoadedJobs { ordered, by_name }
        })
    }
}

impl fmt::Debug for JobRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("JobRegistry");
        s.field("sources", &self.sources.len());
        match self.loaded.get() {
            Some(loaded) => s.field(
                "jobs",
                &loaded.ordered.iter().map(|j| j.name()).collect::<Vec<_>>(),
            ),
            None => s.field("jobs", &"<not loaded>"),
        };
        s.finish()
    }
}

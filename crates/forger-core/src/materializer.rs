//! Bounded-concurrency template materialization.
//!
//! Turns a [`Manifest`] into files on disk. Every task runs
//! fetch -> substitute -> create parent directories -> write, independently
//! of its siblings. At most `concurrency_limit` tasks are in flight: a permit
//! is taken from a semaphore before a task is spawned and released when it
//! finishes. Outcomes are stored by manifest index, so the result is the same
//! whatever order tasks complete in.
//!
//! Two tasks writing the same destination race; the last write wins.
//!
//! The materializer does not log or print; everything it observed is in the
//! returned [`MaterializationResult`].

use crate::error::{Error, Result, TaskError};
use crate::source::TemplateSource;
use crate::substitute::Substituter;
use crate::types::{CopyTask, Manifest, MaterializationResult, TaskOutcome, TaskReport};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// In-flight bound used when none is configured
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Executes manifests against a template source
#[derive(Debug, Clone)]
pub struct Materializer {
    concurrency_limit: usize,
    require_tasks: bool,
    cancel: Option<CancellationToken>,
}

impl Default for Materializer {
    fn default() -> Self {
        Self::new(DEFAULT_CONCURRENCY)
    }
}

impl Materializer {
    /// Create a materializer; the limit is validated when materializing
    pub fn new(concurrency_limit: usize) -> Self {
        Self {
            concurrency_limit,
            require_tasks: false,
            cancel: None,
        }
    }

    /// Reject empty manifests with [`Error::EmptyManifest`]
    pub fn require_tasks(mut self, require: bool) -> Self {
        self.require_tasks = require;
        self
    }

    /// Stop dispatching new tasks once `token` is cancelled.
    ///
    /// Tasks already running are allowed to finish; tasks never started are
    /// reported as [`TaskError::Cancelled`].
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn concurrency_limit(&self) -> usize {
        self.concurrency_limit
    }

    /// Materialize every task of `manifest` from `source`.
    ///
    /// Returns once all dispatched tasks have completed. Per-task failures are
    /// recorded in the result; only an invalid limit or a disallowed empty
    /// manifest produce an `Err`.
    pub async fn materialize<S>(
        &self,
        manifest: Manifest,
        source: Arc<S>,
    ) -> Result<MaterializationResult>
    where
        S: TemplateSource + ?Sized + 'static,
    {
        if self.concurrency_limit < 1 {
            return Err(Error::invalid_concurrency(self.concurrency_limit));
        }
        if self.require_tasks && manifest.is_empty() {
            return Err(Error::EmptyManifest);
        }

        let tasks: Vec<CopyTask> = manifest.into_iter().collect();
        let mut outcomes: Vec<Option<TaskOutcome>> = tasks.iter().map(|_| None).collect();

        let semaphore = Arc::new(Semaphore::new(self.concurrency_limit));
        let mut join_set = JoinSet::new();
        let mut spawned: HashMap<tokio::task::Id, usize> = HashMap::new();

        for (index, task) in tasks.iter().enumerate() {
            let Some(permit) = self.admit(&semaphore).await else {
                outcomes[index] = Some(TaskOutcome::Failure(TaskError::Cancelled));
                continue;
            };

            let source = Arc::clone(&source);
            let task = task.clone();
            let handle = join_set.spawn(async move {
                let outcome = run_task(&task, source.as_ref()).await;
                drop(permit);
                (index, outcome)
            });
            spawned.insert(handle.id(), index);
        }

        while let Some(joined) = join_set.join_next_with_id().await {
            match joined {
                Ok((_, (index, outcome))) => outcomes[index] = Some(outcome),
                Err(e) => {
                    if let Some(&index) = spawned.get(&e.id()) {
                        outcomes[index] = Some(TaskOutcome::Failure(TaskError::Panicked {
                            message: join_error_message(e),
                        }));
                    }
                }
            }
        }

        let reports = tasks
            .into_iter()
            .zip(outcomes)
            .enumerate()
            .map(|(index, (task, outcome))| TaskReport {
                index,
                task,
                // Every index is either dispatched and joined or marked cancelled
                outcome: outcome.unwrap_or(TaskOutcome::Failure(TaskError::Cancelled)),
            })
            .collect();

        Ok(MaterializationResult::from_reports(reports))
    }

    /// Wait for an admission slot, or `None` if cancelled first
    async fn admit(&self, semaphore: &Arc<Semaphore>) -> Option<OwnedSemaphorePermit> {
        match &self.cancel {
            Some(token) => {
                if token.is_cancelled() {
                    return None;
                }
                tokio::select! {
                    biased;
                    _ = token.cancelled() => None,
                    permit = Arc::clone(semaphore).acquire_owned() => permit.ok(),
                }
            }
            None => Arc::clone(semaphore).acquire_owned().await.ok(),
        }
    }
}

/// Materialize `manifest` with a default [`Materializer`] bounded to `concurrency_limit`
pub async fn materialize<S>(
    manifest: Manifest,
    source: Arc<S>,
    concurrency_limit: usize,
) -> Result<MaterializationResult>
where
    S: TemplateSource + ?Sized + 'static,
{
    Materializer::new(concurrency_limit)
        .materialize(manifest, source)
        .await
}

async fn run_task<S>(task: &CopyTask, source: &S) -> TaskOutcome
where
    S: TemplateSource + ?Sized,
{
    match copy_one(task, source).await {
        Ok(bytes_written) => TaskOutcome::Success { bytes_written },
        Err(e) => TaskOutcome::Failure(e),
    }
}

async fn copy_one<S>(task: &CopyTask, source: &S) -> std::result::Result<usize, TaskError>
where
    S: TemplateSource + ?Sized,
{
    let raw = source.fetch(task.source_key()).await?;

    let substituter =
        Substituter::new(task.substitutions()).map_err(|e| TaskError::Substitute {
            key: task.source_key().to_string(),
            message: e.to_string(),
        })?;
    let content = substituter.apply(&raw);

    let destination = task.destination();
    if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| TaskError::CreateDirectory {
                path: parent.to_path_buf(),
                source,
            })?;
    }

    tokio::fs::write(destination, &content)
        .await
        .map_err(|source| TaskError::Write {
            path: destination.to_path_buf(),
            source,
        })?;

    Ok(content.len())
}

fn join_error_message(err: tokio::task::JoinError) -> String {
    if err.is_cancelled() {
        return "task was aborted".to_string();
    }

    let payload = err.into_panic();
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

//! Task lifecycle controller.
//!
//! Presents Qarnot tasks as Deadline instances. Creation builds a draft, binds
//! the shared buckets, injects the Deadline constants and submits it. Stop
//! aborts a task and terminate deletes it. Start and reboot have no provider
//! counterpart and are implemented by deleting the task and submitting a new
//! one under the same name and profile (see [`TaskLifecycle::start`]).
//!
//! Every operation over a collection is best effort: each item is settled on
//! its own and reported as an [`ItemOutcome`] in input order. Items may run
//! concurrently up to [`LifecycleOptions::concurrency`].

mod naming;
mod outcome;
mod restart;

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::environment::EnvironmentSettings;
use crate::instance::{Instance, PROVIDER_TAG};
use crate::provider::{DeleteOptions, Provider, ProviderError, TaskDraft, TaskRecord};
use crate::provision::ResourceProvisioner;
use crate::status::map_status;

use naming::NameReservations;

pub use naming::{MAX_NAME_ATTEMPTS, candidate_name};
pub use outcome::{BatchReport, FailureKind, ItemFailure, ItemOutcome};

/// Substring identifying tasks and profiles that belong to this plugin.
pub const TASK_PREFIX: &str = "deadline";

const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Tuning knobs for lifecycle operations.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct LifecycleOptions {
    /// Upper bound for each individual provider call.
    pub call_timeout: Duration,
    /// Number of batch items processed at once. Zero is treated as one.
    pub concurrency: usize,
}

impl LifecycleOptions {
    /// Effective concurrency, never below one.
    #[must_use]
    pub const fn concurrency(&self) -> usize {
        if self.concurrency == 0 {
            1
        } else {
            self.concurrency
        }
    }
}

impl Default for LifecycleOptions {
    fn default() -> Self {
        Self {
            call_timeout: DEFAULT_CALL_TIMEOUT,
            concurrency: 1,
        }
    }
}

/// Drives instance lifecycle operations against one provider handle.
#[derive(Debug)]
pub struct TaskLifecycle<'a, P> {
    provider: &'a P,
    environment: &'a EnvironmentSettings,
    options: LifecycleOptions,
}

impl<'a, P: Provider> TaskLifecycle<'a, P> {
    /// Creates a controller for an authenticated provider handle.
    #[must_use]
    pub const fn new(
        provider: &'a P,
        environment: &'a EnvironmentSettings,
        options: LifecycleOptions,
    ) -> Self {
        Self {
            provider,
            environment,
            options,
        }
    }

    /// Lists the instances backed by plugin tasks.
    ///
    /// Tasks whose name does not contain [`TASK_PREFIX`] were not created by
    /// this plugin and are left out.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] when the task listing fails.
    pub async fn list_active(&self) -> Result<Vec<Instance>, ProviderError> {
        let tasks = self.bounded("list tasks", self.provider.list_tasks()).await?;
        Ok(tasks
            .iter()
            .filter(|task| task.name.contains(TASK_PREFIX))
            .map(|task| self.instance_from(task))
            .collect())
    }

    /// Submits `count` new tasks running `image_id`.
    ///
    /// A failed item neither rolls back earlier submissions nor stops later
    /// ones. A zero count returns immediately without provider calls.
    pub async fn create(&self, image_id: &str, count: usize) -> BatchReport<Instance> {
        if count == 0 {
            return BatchReport::default();
        }
        if image_id.trim().is_empty() {
            return (0..count)
                .map(|_| {
                    ItemOutcome::Failed(ItemFailure::new(
                        FailureKind::NotAttempted,
                        "blank image id",
                    ))
                })
                .collect();
        }

        let names = self.name_reservations().await;
        self.fan_out(0..count, |_| self.submit_fresh(image_id, &names))
            .await
    }

    /// Submits `count` copies of `source`, using its image id as profile.
    pub async fn clone_instance(&self, source: &Instance, count: usize) -> BatchReport<Instance> {
        self.create(&source.image_id, count).await
    }

    /// Deletes the task behind each id. Results are not purged.
    ///
    /// Each distinct id is settled once; repeated ids share its outcome.
    pub async fn terminate(&self, ids: &[String]) -> BatchReport<String> {
        let unique = distinct(ids);
        let settled = self
            .fan_out(unique.iter().copied(), |id| self.terminate_one(id))
            .await;
        project(ids, &unique, &settled)
    }

    /// Aborts the task behind each id. Aborted tasks stay listed as stopped.
    ///
    /// Each distinct id is settled once; repeated ids share its outcome.
    pub async fn stop(&self, ids: &[String]) -> BatchReport<String> {
        let unique = distinct(ids);
        let settled = self
            .fan_out(unique.iter().copied(), |id| self.stop_one(id))
            .await;
        project(ids, &unique, &settled)
    }

    async fn terminate_one(&self, id: &str) -> ItemOutcome<String> {
        if let Some(skipped) = skip_blank(id) {
            return skipped;
        }
        let result = async {
            let task = self.retrieve(id).await?;
            self.bounded(
                "delete task",
                self.provider.delete_task(&task.uuid, DeleteOptions::default()),
            )
            .await?;
            Ok::<_, ProviderError>(task.uuid)
        }
        .await;
        if result.is_ok() {
            info!(instance_id = %id, "terminated instance");
        }
        settle("terminate", id, result)
    }

    async fn stop_one(&self, id: &str) -> ItemOutcome<String> {
        if let Some(skipped) = skip_blank(id) {
            return skipped;
        }
        let result = async {
            let task = self.retrieve(id).await?;
            self.bounded("abort task", self.provider.abort_task(&task.uuid))
                .await?;
            Ok::<_, ProviderError>(task.uuid)
        }
        .await;
        if result.is_ok() {
            info!(instance_id = %id, "stopped instance");
        }
        settle("stop", id, result)
    }

    async fn submit_fresh(&self, profile: &str, names: &NameReservations) -> ItemOutcome<Instance> {
        for _ in 0..MAX_NAME_ATTEMPTS {
            let Some(name) = names.reserve(profile) else {
                break;
            };
            let mut draft = TaskDraft::new(name.as_str(), profile);
            match self.prepare_and_submit(&mut draft).await {
                Ok(instance) => {
                    info!(instance_id = %instance.id, name = %instance.name, "submitted task");
                    return ItemOutcome::Succeeded(instance);
                }
                Err(err) if err.is_conflict() => {
                    debug!(%name, "task name already taken, retrying with a new suffix");
                }
                Err(err) => {
                    warn!(%name, %profile, error = %err, "failed to create instance");
                    return ItemOutcome::Failed(ItemFailure::from(&err));
                }
            }
        }
        warn!(%profile, "no free task name after {MAX_NAME_ATTEMPTS} attempts");
        ItemOutcome::Failed(ItemFailure::new(
            FailureKind::NameExhausted,
            format!("no free task name for profile {profile} after {MAX_NAME_ATTEMPTS} attempts"),
        ))
    }

    async fn prepare_and_submit(&self, draft: &mut TaskDraft) -> Result<Instance, ProviderError> {
        self.prepare(draft).await?;
        let record = self
            .bounded("submit task", self.provider.submit_task(draft))
            .await?;
        Ok(self.instance_from(&record))
    }

    /// Binds buckets and injects constants; nothing is submitted.
    async fn prepare(&self, draft: &mut TaskDraft) -> Result<(), ProviderError> {
        self.bounded(
            "provision buckets",
            ResourceProvisioner::new(self.provider).provision(draft),
        )
        .await?;
        self.environment.inject(draft);
        Ok(())
    }

    async fn retrieve(&self, id: &str) -> Result<TaskRecord, ProviderError> {
        self.bounded("retrieve task", self.provider.retrieve_task(id))
            .await
    }

    async fn name_reservations(&self) -> NameReservations {
        match self.bounded("list tasks", self.provider.list_tasks()).await {
            Ok(tasks) => NameReservations::new(tasks.into_iter().map(|task| task.name)),
            Err(err) => {
                warn!(error = %err, "could not list existing task names; relying on submit conflicts");
                NameReservations::default()
            }
        }
    }

    fn instance_from(&self, task: &TaskRecord) -> Instance {
        Instance {
            id: task.uuid.clone(),
            name: task.name.clone(),
            provider: PROVIDER_TAG.to_owned(),
            status: map_status(&task.state),
            hostname: self.provider.cluster().to_owned(),
            image_id: task.profile.clone(),
        }
    }

    async fn bounded<T>(
        &self,
        action: &str,
        call: impl Future<Output = Result<T, ProviderError>>,
    ) -> Result<T, ProviderError> {
        timeout(self.options.call_timeout, call)
            .await
            .unwrap_or_else(|_| {
                Err(ProviderError::Timeout {
                    action: action.to_owned(),
                })
            })
    }

    async fn fan_out<I, T, F, Fut>(&self, items: I, op: F) -> BatchReport<T>
    where
        I: IntoIterator,
        F: FnMut(I::Item) -> Fut,
        Fut: Future<Output = ItemOutcome<T>>,
    {
        stream::iter(items)
            .map(op)
            .buffered(self.options.concurrency())
            .collect::<Vec<_>>()
            .await
            .into()
    }
}

/// Ids in first-seen order with repeats removed.
fn distinct(ids: &[String]) -> Vec<&str> {
    let mut seen = BTreeSet::new();
    ids.iter()
        .map(String::as_str)
        .filter(|id| seen.insert(*id))
        .collect()
}

/// Spreads outcomes settled per distinct id back over the original input.
fn project<T: Clone>(
    ids: &[String],
    unique: &[&str],
    settled: &BatchReport<T>,
) -> BatchReport<T> {
    let by_id: BTreeMap<&str, &ItemOutcome<T>> =
        unique.iter().copied().zip(settled.outcomes()).collect();
    ids.iter()
        .map(|id| {
            by_id.get(id.as_str()).map_or_else(
                || {
                    ItemOutcome::Failed(ItemFailure::new(
                        FailureKind::NotAttempted,
                        "instance id was not settled",
                    ))
                },
                |outcome| (*outcome).clone(),
            )
        })
        .collect()
}

fn skip_blank<T>(id: &str) -> Option<ItemOutcome<T>> {
    id.trim().is_empty().then(|| {
        ItemOutcome::Failed(ItemFailure::new(
            FailureKind::NotAttempted,
            "blank instance id",
        ))
    })
}

fn settle<T>(action: &str, id: &str, result: Result<T, ProviderError>) -> ItemOutcome<T> {
    match result {
        Ok(value) => ItemOutcome::Succeeded(value),
        Err(err) => {
            warn!(instance_id = %id, error = %err, "failed to {action} instance");
            ItemOutcome::Failed(ItemFailure::from(&err))
        }
    }
}

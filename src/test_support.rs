//! Test support utilities shared across unit and integration tests.
//!
//! [`FakeProvider`] keeps tasks and buckets in memory, counts every call and
//! lets tests inject failures per call or per task. [`FakeConnector`] hands
//! out clones of one fake so the state survives session refreshes.

use std::collections::{BTreeMap, BTreeSet};
use std::future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::provider::{
    Bucket, Connector, DeleteOptions, Provider, ProviderError, ProviderFuture, TaskDraft,
    TaskRecord,
};
use crate::session::Credentials;

/// Cluster address reported by [`FakeProvider::new`].
pub const FAKE_CLUSTER: &str = "https://api.qarnot.test";

/// Number of calls made to each provider primitive.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ProviderCalls {
    /// Authenticated reads.
    pub user_info: usize,
    /// Profile listings.
    pub list_profiles: usize,
    /// Task listings.
    pub list_tasks: usize,
    /// Single task lookups.
    pub retrieve_task: usize,
    /// Bucket get-or-create requests.
    pub create_bucket: usize,
    /// Task submissions.
    pub submit_task: usize,
    /// Task aborts.
    pub abort_task: usize,
    /// Task deletions.
    pub delete_task: usize,
}

impl ProviderCalls {
    /// Sum of all recorded calls.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.user_info
            + self.list_profiles
            + self.list_tasks
            + self.retrieve_task
            + self.create_bucket
            + self.submit_task
            + self.abort_task
            + self.delete_task
    }
}

#[derive(Debug, Default)]
struct FakeState {
    tasks: BTreeMap<String, TaskRecord>,
    buckets: BTreeSet<String>,
    profiles: Vec<String>,
    next_id: usize,
    calls: ProviderCalls,
    submitted: Vec<TaskDraft>,
    aborted: Vec<String>,
    deleted: Vec<String>,
    reject_credentials: bool,
    fail_buckets: bool,
    fail_task_listing: bool,
    fail_profile_listing: bool,
    failing_submissions: BTreeSet<usize>,
    conflicting_submissions: usize,
    failing_aborts: BTreeSet<String>,
    failing_deletes: BTreeSet<String>,
    stalled_lookups: BTreeSet<String>,
}

/// In-memory provider that records every call.
#[derive(Clone, Debug)]
pub struct FakeProvider {
    state: Arc<Mutex<FakeState>>,
    cluster: String,
}

impl Default for FakeProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn transport(message: &str) -> ProviderError {
    ProviderError::Transport {
        message: message.to_owned(),
    }
}

fn ready<'a, T: Send + 'a>(result: Result<T, ProviderError>) -> ProviderFuture<'a, T> {
    Box::pin(future::ready(result))
}

impl FakeProvider {
    /// Creates an empty fake reporting [`FAKE_CLUSTER`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeState::default())),
            cluster: FAKE_CLUSTER.to_owned(),
        }
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds profiles returned by [`Provider::list_profiles`].
    pub fn add_profiles(&self, profiles: &[&str]) {
        self.state()
            .profiles
            .extend(profiles.iter().map(|profile| (*profile).to_owned()));
    }

    /// Stores an existing task.
    pub fn seed_task(&self, uuid: &str, name: &str, profile: &str, state: &str) {
        self.state().tasks.insert(
            uuid.to_owned(),
            TaskRecord {
                uuid: uuid.to_owned(),
                name: name.to_owned(),
                profile: profile.to_owned(),
                state: state.to_owned(),
            },
        );
    }

    /// Makes the authenticated read fail with [`ProviderError::Unauthorized`].
    pub fn reject_credentials(&self) {
        self.state().reject_credentials = true;
    }

    /// Makes every bucket request fail.
    pub fn fail_buckets(&self) {
        self.state().fail_buckets = true;
    }

    /// Makes task listing fail.
    pub fn fail_task_listing(&self) {
        self.state().fail_task_listing = true;
    }

    /// Makes profile listing fail.
    pub fn fail_profile_listing(&self) {
        self.state().fail_profile_listing = true;
    }

    /// Fails the `nth` submission (1-based) with a transport error.
    pub fn fail_submission(&self, nth: usize) {
        self.state().failing_submissions.insert(nth);
    }

    /// Rejects the next `count` submissions as name conflicts.
    pub fn conflict_next_submissions(&self, count: usize) {
        self.state().conflicting_submissions = count;
    }

    /// Fails aborts of the given task.
    pub fn fail_abort(&self, uuid: &str) {
        self.state().failing_aborts.insert(uuid.to_owned());
    }

    /// Fails deletions of the given task.
    pub fn fail_delete(&self, uuid: &str) {
        self.state().failing_deletes.insert(uuid.to_owned());
    }

    /// Makes lookups of the given task never complete.
    pub fn stall_lookup(&self, uuid: &str) {
        self.state().stalled_lookups.insert(uuid.to_owned());
    }

    /// Call counters so far.
    #[must_use]
    pub fn calls(&self) -> ProviderCalls {
        self.state().calls
    }

    /// Drafts accepted by [`Provider::submit_task`], in order.
    #[must_use]
    pub fn submitted(&self) -> Vec<TaskDraft> {
        self.state().submitted.clone()
    }

    /// UUIDs aborted so far, in order.
    #[must_use]
    pub fn aborted(&self) -> Vec<String> {
        self.state().aborted.clone()
    }

    /// UUIDs deleted so far, in order.
    #[must_use]
    pub fn deleted(&self) -> Vec<String> {
        self.state().deleted.clone()
    }

    /// Names of the buckets that exist, sorted.
    #[must_use]
    pub fn bucket_names(&self) -> Vec<String> {
        self.state().buckets.iter().cloned().collect()
    }

    /// Looks up a stored task without counting a call.
    #[must_use]
    pub fn task(&self, uuid: &str) -> Option<TaskRecord> {
        self.state().tasks.get(uuid).cloned()
    }

    /// All stored tasks, ordered by UUID.
    #[must_use]
    pub fn tasks(&self) -> Vec<TaskRecord> {
        self.state().tasks.values().cloned().collect()
    }

    fn submit(&self, draft: &TaskDraft) -> Result<TaskRecord, ProviderError> {
        let mut state = self.state();
        state.calls.submit_task += 1;
        let attempt = state.calls.submit_task;
        if state.conflicting_submissions > 0 {
            state.conflicting_submissions -= 1;
            return Err(ProviderError::Conflict {
                resource: format!("task {}", draft.name()),
            });
        }
        if state.failing_submissions.contains(&attempt) {
            return Err(transport("submission refused"));
        }
        if state.tasks.values().any(|task| task.name == draft.name()) {
            return Err(ProviderError::Conflict {
                resource: format!("task {}", draft.name()),
            });
        }
        state.next_id += 1;
        let record = TaskRecord {
            uuid: format!("task-{}", state.next_id),
            name: draft.name().to_owned(),
            profile: draft.profile().to_owned(),
            state: String::from("Submitted"),
        };
        state.tasks.insert(record.uuid.clone(), record.clone());
        state.submitted.push(draft.clone());
        Ok(record)
    }
}

impl Provider for FakeProvider {
    fn cluster(&self) -> &str {
        &self.cluster
    }

    fn user_info(&self) -> ProviderFuture<'_, ()> {
        let mut state = self.state();
        state.calls.user_info += 1;
        let result = if state.reject_credentials {
            Err(ProviderError::Unauthorized {
                message: String::from("invalid token"),
            })
        } else {
            Ok(())
        };
        ready(result)
    }

    fn list_profiles(&self) -> ProviderFuture<'_, Vec<String>> {
        let mut state = self.state();
        state.calls.list_profiles += 1;
        let result = if state.fail_profile_listing {
            Err(transport("profile listing unavailable"))
        } else {
            Ok(state.profiles.clone())
        };
        ready(result)
    }

    fn list_tasks(&self) -> ProviderFuture<'_, Vec<TaskRecord>> {
        let mut state = self.state();
        state.calls.list_tasks += 1;
        let result = if state.fail_task_listing {
            Err(transport("task listing unavailable"))
        } else {
            Ok(state.tasks.values().cloned().collect())
        };
        ready(result)
    }

    fn retrieve_task<'a>(&'a self, uuid: &'a str) -> ProviderFuture<'a, TaskRecord> {
        let mut state = self.state();
        state.calls.retrieve_task += 1;
        if state.stalled_lookups.contains(uuid) {
            return Box::pin(future::pending());
        }
        let result = state
            .tasks
            .get(uuid)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound {
                resource: format!("task {uuid}"),
            });
        ready(result)
    }

    fn create_bucket<'a>(&'a self, name: &'a str) -> ProviderFuture<'a, Bucket> {
        let mut state = self.state();
        state.calls.create_bucket += 1;
        if state.fail_buckets {
            return ready(Err(transport("bucket service unavailable")));
        }
        state.buckets.insert(name.to_owned());
        ready(Ok(Bucket::new(name)))
    }

    fn submit_task<'a>(&'a self, draft: &'a TaskDraft) -> ProviderFuture<'a, TaskRecord> {
        ready(self.submit(draft))
    }

    fn abort_task<'a>(&'a self, uuid: &'a str) -> ProviderFuture<'a, ()> {
        let mut guard = self.state();
        let state = &mut *guard;
        state.calls.abort_task += 1;
        if state.failing_aborts.contains(uuid) {
            return ready(Err(transport("abort refused")));
        }
        let result = match state.tasks.get_mut(uuid) {
            Some(task) => {
                task.state = String::from("Cancelled");
                state.aborted.push(uuid.to_owned());
                Ok(())
            }
            None => Err(ProviderError::NotFound {
                resource: format!("task {uuid}"),
            }),
        };
        ready(result)
    }

    fn delete_task<'a>(
        &'a self,
        uuid: &'a str,
        _options: DeleteOptions,
    ) -> ProviderFuture<'a, ()> {
        let mut state = self.state();
        state.calls.delete_task += 1;
        if state.failing_deletes.contains(uuid) {
            return ready(Err(transport("delete refused")));
        }
        let result = if state.tasks.remove(uuid).is_some() {
            state.deleted.push(uuid.to_owned());
            Ok(())
        } else {
            Err(ProviderError::NotFound {
                resource: format!("task {uuid}"),
            })
        };
        ready(result)
    }
}

/// Connector handing out clones of one [`FakeProvider`].
#[derive(Clone, Debug, Default)]
pub struct FakeConnector {
    provider: FakeProvider,
    connects: Arc<AtomicUsize>,
}

impl FakeConnector {
    /// Wraps `provider`.
    #[must_use]
    pub fn new(provider: FakeProvider) -> Self {
        Self {
            provider,
            connects: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of handles opened so far.
    #[must_use]
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

impl Connector for FakeConnector {
    type Provider = FakeProvider;

    fn connect(&self, _credentials: &Credentials) -> Result<Self::Provider, ProviderError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(self.provider.clone())
    }
}

/// Credentials accepted by [`FakeConnector`].
#[must_use]
pub fn fake_credentials() -> Credentials {
    Credentials {
        token: String::from("token"),
        cluster: FAKE_CLUSTER.to_owned(),
        cluster_unsafe: false,
    }
}

//! Provider abstraction for submitting and controlling compute tasks.
//!
//! The [`Provider`] trait mirrors the primitives the Qarnot API offers. Task
//! creation is local: a [`TaskDraft`] accumulates its name, profile, buckets
//! and constants and only reaches the provider when submitted.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use crate::session::Credentials;

/// Named data container bound to a task as input or output.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Bucket {
    /// Bucket name; unique per account.
    pub name: String,
}

impl Bucket {
    /// Wraps a bucket name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Client-side task under construction.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TaskDraft {
    name: String,
    profile: String,
    instance_count: u32,
    resources: Vec<Bucket>,
    results: Option<Bucket>,
    constants: BTreeMap<String, String>,
}

impl TaskDraft {
    /// Starts a single-instance task draft.
    #[must_use]
    pub fn new(name: impl Into<String>, profile: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            profile: profile.into(),
            instance_count: 1,
            resources: Vec::new(),
            results: None,
            constants: BTreeMap::new(),
        }
    }

    /// Task name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Provider profile the task runs.
    #[must_use]
    pub fn profile(&self) -> &str {
        &self.profile
    }

    /// Number of provider instances requested; always one for this plugin.
    #[must_use]
    pub const fn instance_count(&self) -> u32 {
        self.instance_count
    }

    /// Buckets mounted as task inputs.
    #[must_use]
    pub fn resources(&self) -> &[Bucket] {
        &self.resources
    }

    /// Bucket receiving task outputs, if bound.
    #[must_use]
    pub const fn results(&self) -> Option<&Bucket> {
        self.results.as_ref()
    }

    /// Constants injected into the task environment.
    #[must_use]
    pub const fn constants(&self) -> &BTreeMap<String, String> {
        &self.constants
    }

    /// Replaces the input bucket set.
    pub fn bind_resources(&mut self, buckets: Vec<Bucket>) {
        self.resources = buckets;
    }

    /// Replaces the output bucket.
    pub fn bind_results(&mut self, bucket: Bucket) {
        self.results = Some(bucket);
    }

    /// Sets a constant, overwriting any previous value for `key`.
    pub fn set_constant(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.constants.insert(key.into(), value.into());
    }
}

/// Task as reported by the provider.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TaskRecord {
    /// Provider issued UUID.
    pub uuid: String,
    /// Task name.
    pub name: String,
    /// Profile the task runs.
    pub profile: String,
    /// Provider state string, for example `FullyExecuting`.
    pub state: String,
}

/// Flags forwarded with a task deletion.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct DeleteOptions {
    /// Delete the result bucket contents along with the task.
    pub purge_results: bool,
    /// Delete even when the provider reports the task as busy.
    pub force: bool,
}

/// Errors raised by a single provider call.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ProviderError {
    /// The requested task or bucket does not exist.
    #[error("{resource} not found")]
    NotFound {
        /// Resource that was looked up.
        resource: String,
    },
    /// The provider rejected the credentials.
    #[error("authentication rejected: {message}")]
    Unauthorized {
        /// Message returned by the provider.
        message: String,
    },
    /// The resource already exists, for example a duplicate task name.
    #[error("{resource} already exists")]
    Conflict {
        /// Resource that collided.
        resource: String,
    },
    /// The call did not complete within the configured bound.
    #[error("timeout waiting for {action}")]
    Timeout {
        /// Provider call that timed out.
        action: String,
    },
    /// The request never produced a response.
    #[error("transport error: {message}")]
    Transport {
        /// Underlying transport message.
        message: String,
    },
    /// The provider answered with an unexpected status.
    #[error("provider returned {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body or summary.
        message: String,
    },
}

impl ProviderError {
    /// Returns `true` when the resource is missing.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` when the resource already exists.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_timeout() {
            return Self::Timeout {
                action: value
                    .url()
                    .map_or_else(|| String::from("request"), |url| url.path().to_owned()),
            };
        }
        Self::Transport {
            message: value.to_string(),
        }
    }
}

/// Future returned by provider operations.
pub type ProviderFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ProviderError>> + Send + 'a>>;

/// Authenticated handle onto the task provider.
pub trait Provider: Send + Sync {
    /// Cluster address the handle talks to.
    fn cluster(&self) -> &str;

    /// Performs a cheap authenticated read used to verify credentials.
    fn user_info(&self) -> ProviderFuture<'_, ()>;

    /// Lists the profile names available to the account.
    fn list_profiles(&self) -> ProviderFuture<'_, Vec<String>>;

    /// Lists every task visible to the account.
    fn list_tasks(&self) -> ProviderFuture<'_, Vec<TaskRecord>>;

    /// Fetches a single task by UUID.
    fn retrieve_task<'a>(&'a self, uuid: &'a str) -> ProviderFuture<'a, TaskRecord>;

    /// Returns the named bucket, creating it when missing. Requesting an
    /// existing bucket must not fail.
    fn create_bucket<'a>(&'a self, name: &'a str) -> ProviderFuture<'a, Bucket>;

    /// Submits a draft and returns the task the provider created.
    fn submit_task<'a>(&'a self, draft: &'a TaskDraft) -> ProviderFuture<'a, TaskRecord>;

    /// Aborts a running task; it stays queryable in a terminal state.
    fn abort_task<'a>(&'a self, uuid: &'a str) -> ProviderFuture<'a, ()>;

    /// Deletes a task.
    fn delete_task<'a>(&'a self, uuid: &'a str, options: DeleteOptions)
    -> ProviderFuture<'a, ()>;
}

/// Builds authenticated provider handles from credentials.
pub trait Connector: Send + Sync {
    /// Handle type produced by this connector.
    type Provider: Provider;

    /// Opens a fresh handle. Implementations must not cache handles across
    /// calls so that rotated credentials take effect immediately.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] when the transport cannot be initialised.
    fn connect(&self, credentials: &Credentials) -> Result<Self::Provider, ProviderError>;
}

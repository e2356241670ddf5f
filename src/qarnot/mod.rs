//! Qarnot REST transport.
//!
//! [`QarnotConnector`] opens a [`QarnotClient`] per session refresh. The
//! client speaks the task and bucket endpoints of the Qarnot API over
//! `reqwest` and folds HTTP statuses into [`ProviderError`].

mod types;

use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::provider::{
    Bucket, Connector, DeleteOptions, Provider, ProviderError, ProviderFuture, TaskDraft,
    TaskRecord,
};
use crate::session::Credentials;

use self::types::{BucketCreateBody, TaskBody, TaskCreateBody, TaskCreated};

/// Request timeout applied when none is configured.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// State reported for a task the API has just accepted.
const SUBMITTED_STATE: &str = "Submitted";

/// Builds [`QarnotClient`] handles from credentials.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct QarnotConnector {
    timeout: Duration,
}

impl QarnotConnector {
    /// Creates a connector whose clients give up on requests after `timeout`.
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for QarnotConnector {
    fn default() -> Self {
        Self::new(DEFAULT_HTTP_TIMEOUT)
    }
}

impl Connector for QarnotConnector {
    type Provider = QarnotClient;

    fn connect(&self, credentials: &Credentials) -> Result<Self::Provider, ProviderError> {
        QarnotClient::new(credentials, self.timeout)
    }
}

/// Authenticated handle onto one Qarnot cluster.
#[derive(Clone, Debug)]
pub struct QarnotClient {
    http: reqwest::Client,
    cluster: String,
    token: String,
}

impl QarnotClient {
    /// Builds a client for `credentials.cluster`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Transport`] when the cluster is not an
    /// `http(s)` URL or the TLS stack cannot be initialised.
    pub fn new(credentials: &Credentials, timeout: Duration) -> Result<Self, ProviderError> {
        let cluster = normalise_cluster(&credentials.cluster)?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(credentials.cluster_unsafe)
            .build()?;
        Ok(Self {
            http,
            cluster,
            token: credentials.token.trim().to_owned(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.cluster)
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.http
            .get(self.url(path))
            .header(AUTHORIZATION, &self.token)
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.http
            .post(self.url(path))
            .header(AUTHORIZATION, &self.token)
    }

    fn delete(&self, path: &str) -> RequestBuilder {
        self.http
            .delete(self.url(path))
            .header(AUTHORIZATION, &self.token)
    }

    async fn fetch<T: DeserializeOwned>(
        request: RequestBuilder,
        resource: &str,
    ) -> Result<T, ProviderError> {
        let response = send(request, resource).await?;
        Ok(response.json::<T>().await?)
    }

    async fn bucket(&self, name: &str) -> Result<Bucket, ProviderError> {
        let resource = format!("bucket {name}");
        match send(self.get(&format!("/buckets/{name}")), &resource).await {
            Ok(_) => return Ok(Bucket::new(name)),
            Err(err) if err.is_not_found() => {}
            Err(err) => return Err(err),
        }

        debug!(bucket = %name, "creating bucket");
        let body = BucketCreateBody {
            bucket_name: name.to_owned(),
        };
        match send(self.post("/buckets").json(&body), &resource).await {
            Ok(_) => Ok(Bucket::new(name)),
            Err(err) if err.is_conflict() => Ok(Bucket::new(name)),
            Err(err) => Err(err),
        }
    }

    async fn submit(&self, draft: &TaskDraft) -> Result<TaskRecord, ProviderError> {
        let body = TaskCreateBody::from(draft);
        let resource = format!("task {}", draft.name());
        let created: TaskCreated = Self::fetch(self.post("/tasks").json(&body), &resource).await?;
        debug!(task = %created.uuid, name = %draft.name(), "task submitted");
        Ok(TaskRecord {
            uuid: created.uuid,
            name: draft.name().to_owned(),
            profile: draft.profile().to_owned(),
            state: SUBMITTED_STATE.to_owned(),
        })
    }
}

impl Provider for QarnotClient {
    fn cluster(&self) -> &str {
        &self.cluster
    }

    fn user_info(&self) -> ProviderFuture<'_, ()> {
        Box::pin(async move {
            send(self.get("/info"), "user info").await?;
            Ok(())
        })
    }

    fn list_profiles(&self) -> ProviderFuture<'_, Vec<String>> {
        Box::pin(async move { Self::fetch(self.get("/profiles"), "profiles").await })
    }

    fn list_tasks(&self) -> ProviderFuture<'_, Vec<TaskRecord>> {
        Box::pin(async move {
            let tasks: Vec<TaskBody> = Self::fetch(self.get("/tasks"), "tasks").await?;
            Ok(tasks.into_iter().map(TaskRecord::from).collect())
        })
    }

    fn retrieve_task<'a>(&'a self, uuid: &'a str) -> ProviderFuture<'a, TaskRecord> {
        Box::pin(async move {
            let task: TaskBody =
                Self::fetch(self.get(&format!("/tasks/{uuid}")), &format!("task {uuid}")).await?;
            Ok(TaskRecord::from(task))
        })
    }

    fn create_bucket<'a>(&'a self, name: &'a str) -> ProviderFuture<'a, Bucket> {
        Box::pin(self.bucket(name))
    }

    fn submit_task<'a>(&'a self, draft: &'a TaskDraft) -> ProviderFuture<'a, TaskRecord> {
        Box::pin(self.submit(draft))
    }

    fn abort_task<'a>(&'a self, uuid: &'a str) -> ProviderFuture<'a, ()> {
        Box::pin(async move {
            send(
                self.post(&format!("/tasks/{uuid}/abort")),
                &format!("task {uuid}"),
            )
            .await?;
            Ok(())
        })
    }

    fn delete_task<'a>(
        &'a self,
        uuid: &'a str,
        options: DeleteOptions,
    ) -> ProviderFuture<'a, ()> {
        Box::pin(async move {
            let request = self.delete(&format!("/tasks/{uuid}")).query(&[
                ("purge", options.purge_results),
                ("force", options.force),
            ]);
            send(request, &format!("task {uuid}")).await?;
            Ok(())
        })
    }
}

async fn send(request: RequestBuilder, resource: &str) -> Result<Response, ProviderError> {
    let response = request.send().await?;
    let status = response.status();
    debug!(%resource, %status, url = %response.url(), "qarnot response");
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(error_for_status(status, resource, body))
}

/// Maps a non-success HTTP status onto a [`ProviderError`].
fn error_for_status(status: StatusCode, resource: &str, body: String) -> ProviderError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::Unauthorized {
            message: if body.trim().is_empty() {
                status.to_string()
            } else {
                body
            },
        },
        StatusCode::NOT_FOUND => ProviderError::NotFound {
            resource: resource.to_owned(),
        },
        StatusCode::CONFLICT => ProviderError::Conflict {
            resource: resource.to_owned(),
        },
        other => ProviderError::Api {
            status: other.as_u16(),
            message: body,
        },
    }
}

fn normalise_cluster(cluster: &str) -> Result<String, ProviderError> {
    let trimmed = cluster.trim().trim_end_matches('/');
    if trimmed.starts_with("https://") || trimmed.starts_with("http://") {
        return Ok(trimmed.to_owned());
    }
    Err(ProviderError::Transport {
        message: format!("cluster must be an http(s) URL, got '{}'", cluster.trim()),
    })
}

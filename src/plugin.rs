//! Host-facing surface of the Deadline cloud plugin.
//!
//! [`DeadlinePlugin`] implements the calls Deadline's cloud framework makes.
//! Batch operations return a [`BatchReport`] aligned with their input;
//! Deadline's own shapes are projections of it:
//!
//! | Deadline call | Projection |
//! |---|---|
//! | `TerminateInstances`, `StopInstances`, `StartInstances` | [`BatchReport::flags`] |
//! | `CreateInstances`, `RebootInstances` | [`BatchReport::into_successes`] |
//! | `CloneInstance` | [`BatchReport::into_successes`] (task ids) |
//!
//! Empty id lists and zero counts return an empty report without touching
//! the provider. Everything else refreshes the session first and, except for
//! listing active instances, verifies the credentials.

use std::sync::{Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, info};

use crate::config::PluginConfig;
use crate::controller::{BatchReport, ItemOutcome, LifecycleOptions, TASK_PREFIX, TaskLifecycle};
use crate::environment::EnvironmentSettings;
use crate::instance::{HardwareType, Instance, OsImage};
use crate::provider::{Connector, Provider, ProviderError};
use crate::session::{CredentialError, Credentials, Session};

/// Single hardware type advertised to Deadline.
pub const DEFAULT_HARDWARE_TYPE: &str = "hardware";

/// Errors surfaced to the host as an outright operation failure.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum PluginError {
    /// Credentials are missing, malformed or rejected.
    #[error(transparent)]
    Credential(#[from] CredentialError),
    /// Hardware or image enumeration failed.
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of the enumeration failure.
        message: String,
    },
    /// A listing call failed; no partial result is meaningful.
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Deadline cloud plugin backed by Qarnot tasks.
#[derive(Debug)]
pub struct DeadlinePlugin<C> {
    session: Session<C>,
    environment: EnvironmentSettings,
    options: LifecycleOptions,
    started: Mutex<Vec<Instance>>,
}

impl<C: Connector> DeadlinePlugin<C> {
    /// Creates a plugin; the provider is not contacted until the first call.
    #[must_use]
    pub const fn new(
        connector: C,
        credentials: Credentials,
        environment: EnvironmentSettings,
        options: LifecycleOptions,
    ) -> Self {
        Self {
            session: Session::new(connector, credentials),
            environment,
            options,
            started: Mutex::new(Vec::new()),
        }
    }

    /// Creates a plugin from layered configuration.
    #[must_use]
    pub fn from_config(connector: C, config: &PluginConfig) -> Self {
        Self::new(
            connector,
            config.credentials(),
            config.environment(),
            config.lifecycle_options(),
        )
    }

    /// Checks whether the configured credentials are accepted.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Credential`] when the token or cluster is
    /// missing; a rejected token yields `Ok(false)`.
    pub async fn verify_access(&self) -> Result<bool, PluginError> {
        Ok(self.session.verify().await?)
    }

    /// Hardware types offered to the scheduler.
    #[must_use]
    pub fn available_hardware_types(&self) -> Vec<HardwareType> {
        vec![HardwareType {
            id: DEFAULT_HARDWARE_TYPE.to_owned(),
            name: DEFAULT_HARDWARE_TYPE.to_owned(),
        }]
    }

    /// One image per provider profile whose name contains the task prefix.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Credential`] when verification fails and
    /// [`PluginError::Configuration`] when profiles cannot be listed.
    pub async fn available_os_images(&self) -> Result<Vec<OsImage>, PluginError> {
        let provider = self.session.verified().await?;
        let profiles = timeout(self.options.call_timeout, provider.list_profiles())
            .await
            .map_err(|_| PluginError::Configuration {
                message: String::from("timeout listing profiles"),
            })?
            .map_err(|err| PluginError::Configuration {
                message: format!("can't list profiles: {err}"),
            })?;
        Ok(profiles
            .iter()
            .filter(|profile| profile.contains(TASK_PREFIX))
            .map(|profile| OsImage::for_profile(profile))
            .collect())
    }

    /// Instances backed by plugin tasks.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Credential`] when the session cannot be
    /// refreshed and [`PluginError::Provider`] when listing fails.
    pub async fn active_instances(&self) -> Result<Vec<Instance>, PluginError> {
        let provider = self.session.refresh()?;
        Ok(self.lifecycle(&provider).list_active().await?)
    }

    /// Submits `count` tasks running profile `image_id`.
    ///
    /// `hardware_id` is accepted for interface compatibility; Qarnot picks
    /// hardware from the profile.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Credential`] when verification fails.
    pub async fn create_instances(
        &self,
        hardware_id: &str,
        image_id: &str,
        count: usize,
    ) -> Result<BatchReport<Instance>, PluginError> {
        if count == 0 {
            return Ok(BatchReport::default());
        }
        let provider = self.session.verified().await?;
        debug!(%hardware_id, %image_id, count, "creating instances");
        let report = self.lifecycle(&provider).create(image_id, count).await;
        self.remember(&report);
        Ok(report)
    }

    /// Deletes the tasks behind `ids`.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Credential`] when verification fails.
    pub async fn terminate_instances(
        &self,
        ids: &[String],
    ) -> Result<BatchReport<String>, PluginError> {
        if ids.is_empty() {
            return Ok(BatchReport::default());
        }
        let provider = self.session.verified().await?;
        Ok(self.lifecycle(&provider).terminate(ids).await)
    }

    /// Aborts the tasks behind `ids`.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Credential`] when verification fails.
    pub async fn stop_instances(&self, ids: &[String]) -> Result<BatchReport<String>, PluginError> {
        if ids.is_empty() {
            return Ok(BatchReport::default());
        }
        let provider = self.session.verified().await?;
        Ok(self.lifecycle(&provider).stop(ids).await)
    }

    /// Replaces the tasks behind `ids` with freshly submitted ones.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Credential`] when verification fails.
    pub async fn start_instances(
        &self,
        ids: &[String],
    ) -> Result<BatchReport<Instance>, PluginError> {
        if ids.is_empty() {
            return Ok(BatchReport::default());
        }
        let provider = self.session.verified().await?;
        Ok(self.lifecycle(&provider).start(ids).await)
    }

    /// Reboots the instances behind `ids` by delete-and-resubmit.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Credential`] when verification fails.
    pub async fn reboot_instances(
        &self,
        ids: &[String],
    ) -> Result<BatchReport<Instance>, PluginError> {
        if ids.is_empty() {
            return Ok(BatchReport::default());
        }
        let provider = self.session.verified().await?;
        Ok(self.lifecycle(&provider).reboot(ids).await)
    }

    /// Submits `count` copies of `source` and reports the new task ids.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Credential`] when verification fails.
    pub async fn clone_instance(
        &self,
        source: &Instance,
        count: usize,
    ) -> Result<BatchReport<String>, PluginError> {
        if count == 0 {
            return Ok(BatchReport::default());
        }
        let provider = self.session.verified().await?;
        let report = self.lifecycle(&provider).clone_instance(source, count).await;
        self.remember(&report);
        Ok(report.map(|instance| instance.id))
    }

    /// Instances this plugin created during its lifetime.
    ///
    /// Advisory only; the provider remains the source of truth.
    #[must_use]
    pub fn started_instances(&self) -> Vec<Instance> {
        self.started().clone()
    }

    /// Forgets the instances recorded by [`Self::started_instances`].
    pub fn cleanup(&self) {
        self.started().clear();
        info!("plugin state cleared");
    }

    fn lifecycle<'a>(&'a self, provider: &'a C::Provider) -> TaskLifecycle<'a, C::Provider> {
        TaskLifecycle::new(provider, &self.environment, self.options)
    }

    fn remember(&self, report: &BatchReport<Instance>) {
        let created = report
            .outcomes()
            .iter()
            .filter_map(|outcome| match outcome {
                ItemOutcome::Succeeded(instance) if instance.is_submitted() => {
                    Some(instance.clone())
                }
                ItemOutcome::Succeeded(_) | ItemOutcome::Failed(_) => None,
            });
        self.started().extend(created);
    }

    fn started(&self) -> MutexGuard<'_, Vec<Instance>> {
        self.started.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

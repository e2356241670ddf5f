//! Configuration loading via `ortho-config`.

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::controller::LifecycleOptions;
use crate::environment::EnvironmentSettings;
use crate::session::Credentials;

/// Smallest per-call timeout handed to the transport and the controller.
pub const MIN_CALL_TIMEOUT_SECS: u64 = 1;

/// Plugin settings derived from environment variables, configuration files
/// and CLI flags.
///
/// Every value defaults to empty so that a missing token or cluster surfaces
/// as a credential error when the plugin is used rather than as a load
/// failure.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(
    prefix = "QARNOT",
    discovery(
        app_name = "qarnot-deadline",
        env_var = "QARNOT_DEADLINE_CONFIG_PATH",
        config_file_name = "qarnot-deadline.toml",
        dotfile_name = ".qarnot-deadline.toml",
        project_file_name = "qarnot-deadline.toml"
    )
)]
pub struct PluginConfig {
    /// Qarnot API token.
    #[ortho_config(default = String::new())]
    pub token: String,
    /// Qarnot cluster endpoint, for example `https://api.qarnot.com`.
    #[ortho_config(default = String::new())]
    pub cluster: String,
    /// Skip TLS certificate verification for the cluster endpoint.
    #[ortho_config(default = false)]
    pub cluster_unsafe: bool,
    /// Deadline repository location written into each task.
    #[ortho_config(default = String::new())]
    pub repository: String,
    /// Deadline license server address.
    #[ortho_config(default = String::new())]
    pub license_server: String,
    /// Deadline license mode.
    #[ortho_config(default = String::new())]
    pub license_mode: String,
    /// Proxy certificate in PEM form.
    #[ortho_config(default = String::new())]
    pub proxy_certificate: String,
    /// Repository proxy SSL setting.
    #[ortho_config(default = String::new())]
    pub ssl: String,
    /// Upper bound in seconds for each provider call. Zero is treated as one.
    #[ortho_config(default = 30)]
    pub call_timeout_secs: u64,
    /// Number of batch items processed concurrently.
    #[ortho_config(default = 1)]
    pub concurrency: usize,
}

impl PluginConfig {
    /// Loads configuration using the `ortho-config` derive. Values merge
    /// defaults, configuration files, environment variables and CLI flags in
    /// that order of precedence.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the loader fails to merge sources.
    pub fn load_from_sources() -> Result<Self, ConfigError> {
        Self::load().map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Loads configuration without attempting to parse CLI arguments.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([std::ffi::OsString::from("qarnot-deadline")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Session credentials.
    #[must_use]
    pub fn credentials(&self) -> Credentials {
        Credentials {
            token: self.token.trim().to_owned(),
            cluster: self.cluster.trim().to_owned(),
            cluster_unsafe: self.cluster_unsafe,
        }
    }

    /// Values injected into every task.
    #[must_use]
    pub fn environment(&self) -> EnvironmentSettings {
        EnvironmentSettings {
            repository: self.repository.clone(),
            ssl: self.ssl.clone(),
            license_mode: self.license_mode.clone(),
            license_server: self.license_server.clone(),
            proxy_certificate: self.proxy_certificate.clone(),
        }
    }

    /// Timeout and concurrency settings for lifecycle operations.
    ///
    /// The call timeout never drops below [`MIN_CALL_TIMEOUT_SECS`].
    #[must_use]
    pub const fn lifecycle_options(&self) -> LifecycleOptions {
        let secs = if self.call_timeout_secs < MIN_CALL_TIMEOUT_SECS {
            MIN_CALL_TIMEOUT_SECS
        } else {
            self.call_timeout_secs
        };
        LifecycleOptions {
            call_timeout: Duration::from_secs(secs),
            concurrency: self.concurrency,
        }
    }
}

/// Errors raised during configuration loading.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
}

impl From<ortho_config::OrthoError> for ConfigError {
    fn from(value: ortho_config::OrthoError) -> Self {
        Self::Parse(value.to_string())
    }
}

//! Authenticated connection to the provider.
//!
//! A [`Session`] holds credentials and a [`Connector`], never a live handle.
//! Every privileged operation asks for a fresh handle so rotated tokens are
//! picked up without a restart.

use thiserror::Error;
use tracing::{debug, warn};

use crate::provider::{Connector, Provider};

/// Credentials used to reach the provider.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Credentials {
    /// API token.
    pub token: String,
    /// Cluster endpoint URL, for example `https://api.qarnot.com`.
    pub cluster: String,
    /// Skip TLS certificate verification for the cluster endpoint.
    pub cluster_unsafe: bool,
}

impl Credentials {
    /// Checks that the token and cluster are present.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::MissingToken`] or
    /// [`CredentialError::MissingCluster`] when either value is blank.
    pub fn validate(&self) -> Result<(), CredentialError> {
        if self.token.trim().is_empty() {
            return Err(CredentialError::MissingToken);
        }
        if self.cluster.trim().is_empty() {
            return Err(CredentialError::MissingCluster);
        }
        Ok(())
    }
}

/// Errors raised while establishing or verifying a session.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum CredentialError {
    /// No API token was configured.
    #[error("Invalid credential: set QARNOT_TOKEN or add token to qarnot-deadline.toml")]
    MissingToken,
    /// No cluster endpoint was configured.
    #[error("Invalid cluster: set QARNOT_CLUSTER or add cluster to qarnot-deadline.toml")]
    MissingCluster,
    /// The cluster endpoint could not be used to build a connection.
    #[error("Invalid cluster: {message}")]
    InvalidCluster {
        /// Reason reported by the transport.
        message: String,
    },
    /// The provider refused the credentials or could not be reached.
    #[error("Invalid credential: {message}")]
    Rejected {
        /// Reason reported by the provider.
        message: String,
    },
}

/// Credentials plus the means to turn them into provider handles.
#[derive(Clone, Debug)]
pub struct Session<C> {
    connector: C,
    credentials: Credentials,
}

impl<C: Connector> Session<C> {
    /// Creates a session; nothing is contacted until the first refresh.
    #[must_use]
    pub const fn new(connector: C, credentials: Credentials) -> Self {
        Self {
            connector,
            credentials,
        }
    }

    /// Credentials this session authenticates with.
    #[must_use]
    pub const fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Opens a fresh provider handle.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError`] when the token or cluster is blank, before
    /// any network activity, or when the connector rejects the cluster.
    pub fn refresh(&self) -> Result<C::Provider, CredentialError> {
        self.credentials.validate()?;
        debug!(cluster = %self.credentials.cluster, "refreshing provider session");
        self.connector
            .connect(&self.credentials)
            .map_err(|err| CredentialError::InvalidCluster {
                message: err.to_string(),
            })
    }

    /// Refreshes the session and performs one authenticated read.
    ///
    /// Authentication and transport failures are expected conditions and
    /// yield `Ok(false)`.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError`] only when [`Self::refresh`] fails.
    pub async fn verify(&self) -> Result<bool, CredentialError> {
        match self.verified().await {
            Ok(_) => Ok(true),
            Err(CredentialError::Rejected { message }) => {
                warn!(cluster = %self.credentials.cluster, %message, "credential verification failed");
                Ok(false)
            }
            Err(other) => Err(other),
        }
    }

    /// Refreshes the session and returns the handle once the provider has
    /// accepted the credentials.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Rejected`] when the authenticated read
    /// fails, or any error from [`Self::refresh`].
    pub async fn verified(&self) -> Result<C::Provider, CredentialError> {
        let provider = self.refresh()?;
        provider
            .user_info()
            .await
            .map_err(|err| CredentialError::Rejected {
                message: err.to_string(),
            })?;
        Ok(provider)
    }
}

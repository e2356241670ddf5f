//! Core library for the Qarnot cloud plugin for the Deadline render farm
//! scheduler.
//!
//! Deadline manages elastic capacity through a generic "cloud instance"
//! abstraction (create, list, stop, start, reboot, terminate, clone). Qarnot
//! exposes submitted compute tasks instead, each with its own state machine,
//! data buckets and constants. This crate reconciles the two: provider tasks
//! are created, mutated and torn down so that they behave like persistent,
//! controllable instances.
//!
//! The provider has no native resume, so starting or rebooting an instance
//! deletes its task and resubmits a fresh one under the same name and
//! profile. Results accumulated by the old task are not carried forward.

pub mod config;
pub mod controller;
pub mod environment;
pub mod instance;
pub mod plugin;
pub mod provider;
pub mod provision;
pub mod qarnot;
pub mod session;
pub mod status;
pub mod test_support;

pub use config::{ConfigError, PluginConfig};
pub use controller::{
    BatchReport, FailureKind, ItemFailure, ItemOutcome, LifecycleOptions, TaskLifecycle,
};
pub use environment::EnvironmentSettings;
pub use instance::{HardwareType, Instance, InstanceStatus, OsImage, Platform};
pub use plugin::{DeadlinePlugin, PluginError};
pub use provider::{
    Bucket, Connector, DeleteOptions, Provider, ProviderError, ProviderFuture, TaskDraft,
    TaskRecord,
};
pub use provision::ResourceProvisioner;
pub use qarnot::{QarnotClient, QarnotConnector};
pub use session::{CredentialError, Credentials, Session};
pub use status::map_status;

//! Command-line interface definitions for the `qarnot-deadline` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.

use clap::{Args, Parser};

/// Top-level CLI for the `qarnot-deadline` binary.
#[derive(Debug, Parser)]
#[command(
    name = "qarnot-deadline",
    about = "Drive Deadline cloud instances backed by Qarnot tasks",
    arg_required_else_help = true
)]
pub(crate) enum Cli {
    /// Check that the configured token is accepted by the cluster.
    #[command(name = "verify", about = "Check the configured Qarnot credentials")]
    Verify,
    /// List the hardware types offered to Deadline.
    #[command(name = "hardware", about = "List available hardware types")]
    Hardware,
    /// List the OS images derived from Qarnot profiles.
    #[command(name = "images", about = "List available OS images")]
    Images,
    /// List the tasks currently backing Deadline instances.
    #[command(name = "list", about = "List active instances")]
    List,
    /// Submit new tasks.
    #[command(name = "create", about = "Create instances from an image")]
    Create(CreateCommand),
    /// Delete tasks.
    #[command(name = "terminate", about = "Terminate instances")]
    Terminate(InstanceIds),
    /// Abort tasks.
    #[command(name = "stop", about = "Stop instances")]
    Stop(InstanceIds),
    /// Replace tasks with freshly submitted ones.
    #[command(name = "start", about = "Start instances by resubmitting them")]
    Start(InstanceIds),
    /// Delete and resubmit tasks.
    #[command(name = "reboot", about = "Reboot instances by resubmitting them")]
    Reboot(InstanceIds),
    /// Submit copies of an existing task.
    #[command(name = "clone", about = "Clone an instance")]
    Clone(CloneCommand),
}

/// Arguments for `qarnot-deadline create`.
#[derive(Debug, Args)]
pub(crate) struct CreateCommand {
    /// Image (Qarnot profile) the new tasks run.
    #[arg(long, value_name = "IMAGE")]
    pub(crate) image: String,
    /// Number of tasks to submit.
    #[arg(long, default_value_t = 1, value_name = "N")]
    pub(crate) count: usize,
    /// Hardware type; accepted for compatibility and otherwise ignored.
    #[arg(long, default_value = "hardware", value_name = "ID")]
    pub(crate) hardware: String,
}

/// Instance identifiers targeted by a batch command.
#[derive(Debug, Args)]
pub(crate) struct InstanceIds {
    /// Task UUIDs.
    #[arg(required = true, value_name = "ID")]
    pub(crate) ids: Vec<String>,
}

/// Arguments for `qarnot-deadline clone`.
#[derive(Debug, Args)]
pub(crate) struct CloneCommand {
    /// Task UUID to copy.
    #[arg(value_name = "ID")]
    pub(crate) id: String,
    /// Number of copies to submit.
    #[arg(long, default_value_t = 1, value_name = "N")]
    pub(crate) count: usize,
}

//! Scheduler-facing view of elastic compute capacity.

use serde::Serialize;

/// Provider tag reported on every instance.
pub const PROVIDER_TAG: &str = "Qarnot";

/// Lifecycle state of a cloud instance as Deadline understands it.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize)]
pub enum InstanceStatus {
    /// The provider state could not be interpreted.
    #[default]
    Unknown,
    /// Submitted or dispatched but not yet executing.
    Pending,
    /// Executing on provider hardware.
    Running,
    /// Restarting in place.
    Rebooting,
    /// Winding down, for example while results are downloaded.
    Stopping,
    /// Finished, cancelled or failed; the task is still queryable.
    Stopped,
    /// Gone for good.
    Terminated,
}

/// A unit of compute backed by at most one provider task.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Instance {
    /// Task UUID assigned by the provider at submission. Empty before then.
    pub id: String,
    /// Display name; identical to the backing task name.
    pub name: String,
    /// Provider tag, always [`PROVIDER_TAG`].
    pub provider: String,
    /// Lifecycle status derived from the task state.
    pub status: InstanceStatus,
    /// Cluster address the task was submitted to.
    pub hostname: String,
    /// Provider profile the task runs, used as the image identifier.
    pub image_id: String,
}

impl Instance {
    /// Returns `true` once the provider has assigned an identifier.
    #[must_use]
    pub fn is_submitted(&self) -> bool {
        !self.id.is_empty()
    }
}

/// Hardware flavour offered to the scheduler.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct HardwareType {
    /// Identifier passed back on instance creation.
    pub id: String,
    /// Display name.
    pub name: String,
}

/// Operating system family of an image.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum Platform {
    /// Linux images; every Qarnot profile runs Linux containers.
    Linux,
}

/// Image offered to the scheduler; one per matching provider profile.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct OsImage {
    /// Profile name.
    pub id: String,
    /// Human readable description (the profile name as well).
    pub description: String,
    /// Word size of the image.
    pub bitness: u8,
    /// Operating system family.
    pub platform: Platform,
}

impl OsImage {
    /// Builds the image entry advertised for a provider profile.
    #[must_use]
    pub fn for_profile(profile: &str) -> Self {
        Self {
            id: profile.to_owned(),
            description: profile.to_owned(),
            bitness: 64,
            platform: Platform::Linux,
        }
    }
}

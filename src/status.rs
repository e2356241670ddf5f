//! Translation of Qarnot task states into Deadline instance states.

use crate::instance::InstanceStatus;

const PENDING: &[&str] = &[
    "PartiallyDispatched",
    "FullyDispatched",
    "UnSubmitted",
    "Submitted",
];
const RUNNING: &[&str] = &["PartiallyExecuting", "FullyExecuting"];
const REBOOTING: &[&str] = &[];
const STOPPING: &[&str] = &["DownloadingResults"];
const STOPPED: &[&str] = &["Cancelled", "Success", "Failure"];
const TERMINATED: &[&str] = &[];

/// Maps a provider task state onto an [`InstanceStatus`].
///
/// The mapping is total: anything the table does not recognise, including
/// differently cased spellings, becomes [`InstanceStatus::Unknown`].
#[must_use]
pub fn map_status(provider_state: &str) -> InstanceStatus {
    let table = [
        (PENDING, InstanceStatus::Pending),
        (RUNNING, InstanceStatus::Running),
        (REBOOTING, InstanceStatus::Rebooting),
        (STOPPING, InstanceStatus::Stopping),
        (STOPPED, InstanceStatus::Stopped),
        (TERMINATED, InstanceStatus::Terminated),
    ];
    table
        .into_iter()
        .find(|(states, _)| states.contains(&provider_state))
        .map_or(InstanceStatus::Unknown, |(_, status)| status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("PartiallyDispatched", InstanceStatus::Pending)]
    #[case("FullyDispatched", InstanceStatus::Pending)]
    #[case("UnSubmitted", InstanceStatus::Pending)]
    #[case("Submitted", InstanceStatus::Pending)]
    #[case("PartiallyExecuting", InstanceStatus::Running)]
    #[case("FullyExecuting", InstanceStatus::Running)]
    #[case("DownloadingResults", InstanceStatus::Stopping)]
    #[case("Cancelled", InstanceStatus::Stopped)]
    #[case("Success", InstanceStatus::Stopped)]
    #[case("Failure", InstanceStatus::Stopped)]
    fn maps_known_states(#[case] state: &str, #[case] expected: InstanceStatus) {
        assert_eq!(map_status(state), expected);
    }

    #[rstest]
    #[case("")]
    #[case("submitted")]
    #[case("Executing")]
    #[case("Terminated")]
    #[case(" Success")]
    fn unknown_states_map_to_unknown(#[case] state: &str) {
        assert_eq!(map_status(state), InstanceStatus::Unknown);
    }
}

//! Start and reboot through delete-and-resubmit.
//!
//! Qarnot tasks cannot be paused or resumed. Restarting one is a compensating
//! transaction: the replacement draft is prepared first (buckets bound,
//! constants injected) so that bucket failures leave the old task alone, then
//! the old task is deleted and the draft submitted under the same name and
//! profile. Results produced by the old task are not copied forward.

use tracing::{info, warn};

use crate::instance::Instance;
use crate::provider::{DeleteOptions, Provider, ProviderError, TaskDraft};

use super::{
    BatchReport, FailureKind, ItemFailure, ItemOutcome, TaskLifecycle, settle, skip_blank,
};

impl<P: Provider> TaskLifecycle<'_, P> {
    /// Restarts each instance by replacing its task.
    ///
    /// The replacement carries a new id; the outcome holds the new instance.
    pub async fn start(&self, ids: &[String]) -> BatchReport<Instance> {
        self.fan_out(ids, |id| self.resubmit_one("start", id)).await
    }

    /// Reboots each instance; identical to [`Self::start`] on this provider.
    pub async fn reboot(&self, ids: &[String]) -> BatchReport<Instance> {
        self.fan_out(ids, |id| self.resubmit_one("reboot", id)).await
    }

    async fn resubmit_one(&self, action: &str, id: &str) -> ItemOutcome<Instance> {
        if let Some(skipped) = skip_blank(id) {
            return skipped;
        }

        let prepared = async {
            let old = self.retrieve(id).await?;
            let mut draft = TaskDraft::new(old.name.as_str(), old.profile.as_str());
            self.prepare(&mut draft).await?;
            self.bounded(
                "delete task",
                self.provider.delete_task(&old.uuid, DeleteOptions::default()),
            )
            .await?;
            Ok::<_, ProviderError>((old.uuid, draft))
        }
        .await;
        let (old_uuid, draft) = match prepared {
            Ok(prepared) => prepared,
            Err(err) => return settle(action, id, Err(err)),
        };

        match self
            .bounded("submit task", self.provider.submit_task(&draft))
            .await
        {
            Ok(record) => {
                let instance = self.instance_from(&record);
                info!(
                    instance_id = %id,
                    replacement_id = %instance.id,
                    name = %instance.name,
                    "{action} resubmitted task"
                );
                ItemOutcome::Succeeded(instance)
            }
            Err(err) => {
                warn!(
                    instance_id = %id,
                    name = %draft.name(),
                    error = %err,
                    "task deleted but resubmission failed during {action}"
                );
                let failure = ItemFailure::from(&err);
                let kind = match failure.kind {
                    FailureKind::Lookup => FailureKind::Transport,
                    other => other,
                };
                ItemOutcome::Failed(ItemFailure::new(
                    kind,
                    format!("task {old_uuid} deleted but resubmission failed: {err}"),
                ))
            }
        }
    }
}

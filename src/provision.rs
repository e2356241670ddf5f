//! Input and output bucket provisioning for tasks.

use crate::provider::{Bucket, Provider, ProviderError, TaskDraft};

/// Well-known bucket shared by every task as its input resource set.
pub const INPUT_BUCKET: &str = "deadline-input";

/// Well-known bucket receiving every task's results.
pub const OUTPUT_BUCKET: &str = "deadline-output";

/// Binds the shared input and output buckets to task drafts.
#[derive(Clone, Copy, Debug)]
pub struct ResourceProvisioner<'a, P> {
    provider: &'a P,
}

impl<'a, P: Provider> ResourceProvisioner<'a, P> {
    /// Creates a provisioner using `provider` for bucket requests.
    #[must_use]
    pub const fn new(provider: &'a P) -> Self {
        Self { provider }
    }

    /// Gets or creates both buckets and binds them to `draft`.
    ///
    /// The draft ends up with exactly one resource bucket and one result
    /// bucket, however often this is called. The draft is not submitted.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] when a bucket request fails; the draft is left
    /// untouched in that case.
    pub async fn provision(&self, draft: &mut TaskDraft) -> Result<(Bucket, Bucket), ProviderError> {
        let input = self.provider.create_bucket(INPUT_BUCKET).await?;
        let output = self.provider.create_bucket(OUTPUT_BUCKET).await?;
        draft.bind_results(output.clone());
        draft.bind_resources(vec![input.clone()]);
        Ok((input, output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeProvider;

    #[tokio::test]
    async fn binds_input_and_output_buckets() {
        let provider = FakeProvider::new();
        let mut draft = TaskDraft::new("deadline-linux-0A0B0C", "deadline-linux");

        let (input, output) = ResourceProvisioner::new(&provider)
            .provision(&mut draft)
            .await
            .expect("provisioning should succeed");

        assert_eq!(input, Bucket::new(INPUT_BUCKET));
        assert_eq!(output, Bucket::new(OUTPUT_BUCKET));
        assert_eq!(draft.resources(), [Bucket::new(INPUT_BUCKET)].as_slice());
        assert_eq!(draft.results(), Some(&Bucket::new(OUTPUT_BUCKET)));
    }

    #[tokio::test]
    async fn repeated_provisioning_reuses_existing_buckets() {
        let provider = FakeProvider::new();
        let provisioner = ResourceProvisioner::new(&provider);
        let mut draft = TaskDraft::new("deadline-linux-0A0B0C", "deadline-linux");

        let first = provisioner.provision(&mut draft).await.expect("first pass");
        let second = provisioner.provision(&mut draft).await.expect("second pass");

        assert_eq!(first, second);
        assert_eq!(draft.resources().len(), 1);
        assert_eq!(provider.calls().create_bucket, 4);
        assert_eq!(provider.bucket_names(), vec![INPUT_BUCKET, OUTPUT_BUCKET]);
    }

    #[tokio::test]
    async fn failed_bucket_request_leaves_draft_unbound() {
        let provider = FakeProvider::new();
        provider.fail_buckets();
        let mut draft = TaskDraft::new("deadline-linux-0A0B0C", "deadline-linux");

        let err = ResourceProvisioner::new(&provider)
            .provision(&mut draft)
            .await
            .expect_err("bucket failure should surface");

        assert!(matches!(err, ProviderError::Transport { .. }));
        assert!(draft.resources().is_empty());
        assert!(draft.results().is_none());
    }
}

//! Per-item results of batch lifecycle operations.

use serde::Serialize;

use crate::provider::ProviderError;

/// Why a single item of a batch did not succeed.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum FailureKind {
    /// The item was skipped without contacting the provider.
    NotAttempted,
    /// The instance id does not match a retrievable task.
    Lookup,
    /// A provider call failed in transit or was refused.
    Transport,
    /// A provider call exceeded its time bound.
    Timeout,
    /// No unused task name could be found.
    NameExhausted,
}

/// Structured failure details for one batch item.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ItemFailure {
    /// Failure category.
    pub kind: FailureKind,
    /// Human readable detail.
    pub message: String,
}

impl ItemFailure {
    /// Builds a failure of the given kind.
    #[must_use]
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Returns `true` when retrying the same item may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            FailureKind::Transport | FailureKind::Timeout | FailureKind::NameExhausted
        )
    }
}

impl From<&ProviderError> for ItemFailure {
    fn from(value: &ProviderError) -> Self {
        let kind = match value {
            ProviderError::NotFound { .. } => FailureKind::Lookup,
            ProviderError::Timeout { .. } => FailureKind::Timeout,
            ProviderError::Unauthorized { .. }
            | ProviderError::Conflict { .. }
            | ProviderError::Transport { .. }
            | ProviderError::Api { .. } => FailureKind::Transport,
        };
        Self::new(kind, value.to_string())
    }
}

/// Result of one item in a batch.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub enum ItemOutcome<T> {
    /// The item completed; carries the resulting entity.
    Succeeded(T),
    /// The item failed; siblings are unaffected.
    Failed(ItemFailure),
}

impl<T> ItemOutcome<T> {
    /// Returns `true` for [`ItemOutcome::Succeeded`].
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }

    /// Failure details, if the item failed.
    #[must_use]
    pub const fn failure(&self) -> Option<&ItemFailure> {
        match self {
            Self::Succeeded(_) => None,
            Self::Failed(failure) => Some(failure),
        }
    }

    /// Transforms the success payload.
    #[must_use]
    pub fn map<U>(self, op: impl FnOnce(T) -> U) -> ItemOutcome<U> {
        match self {
            Self::Succeeded(value) => ItemOutcome::Succeeded(op(value)),
            Self::Failed(failure) => ItemOutcome::Failed(failure),
        }
    }

    /// Converts the outcome into an `Option`, dropping failure details.
    #[must_use]
    pub fn succeeded(self) -> Option<T> {
        match self {
            Self::Succeeded(value) => Some(value),
            Self::Failed(_) => None,
        }
    }
}

/// Outcomes of a batch, aligned with the order of its inputs.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct BatchReport<T> {
    outcomes: Vec<ItemOutcome<T>>,
}

impl<T> Default for BatchReport<T> {
    fn default() -> Self {
        Self {
            outcomes: Vec::new(),
        }
    }
}

impl<T> BatchReport<T> {
    /// Outcomes in input order.
    #[must_use]
    pub fn outcomes(&self) -> &[ItemOutcome<T>] {
        &self.outcomes
    }

    /// Number of items in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// Returns `true` for an empty batch.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Projects each outcome onto a success flag, preserving order.
    #[must_use]
    pub fn flags(&self) -> Vec<bool> {
        self.outcomes.iter().map(ItemOutcome::is_success).collect()
    }

    /// Failure details of the failed items, in input order.
    pub fn failures(&self) -> impl Iterator<Item = &ItemFailure> {
        self.outcomes.iter().filter_map(ItemOutcome::failure)
    }

    /// Transforms every success payload.
    #[must_use]
    pub fn map<U>(self, mut op: impl FnMut(T) -> U) -> BatchReport<U> {
        BatchReport {
            outcomes: self
                .outcomes
                .into_iter()
                .map(|outcome| outcome.map(&mut op))
                .collect(),
        }
    }

    /// Keeps the successful payloads, dropping failures.
    #[must_use]
    pub fn into_successes(self) -> Vec<T> {
        self.outcomes
            .into_iter()
            .filter_map(ItemOutcome::succeeded)
            .collect()
    }
}

impl<T> From<Vec<ItemOutcome<T>>> for BatchReport<T> {
    fn from(outcomes: Vec<ItemOutcome<T>>) -> Self {
        Self { outcomes }
    }
}

impl<T> FromIterator<ItemOutcome<T>> for BatchReport<T> {
    fn from_iter<I: IntoIterator<Item = ItemOutcome<T>>>(iter: I) -> Self {
        Self {
            outcomes: iter.into_iter().collect(),
        }
    }
}

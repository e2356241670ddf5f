//! Wire shapes for the Qarnot REST API.

use serde::{Deserialize, Serialize};

use crate::provider::{TaskDraft, TaskRecord};

/// Key/value pair in a task's constant list.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub(crate) struct ConstantBody {
    pub(crate) key: String,
    pub(crate) value: String,
}

/// Body of `POST /tasks`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TaskCreateBody {
    pub(crate) name: String,
    pub(crate) profile: String,
    pub(crate) instance_count: u32,
    pub(crate) resource_buckets: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) result_bucket: Option<String>,
    pub(crate) constants: Vec<ConstantBody>,
}

impl From<&TaskDraft> for TaskCreateBody {
    fn from(draft: &TaskDraft) -> Self {
        Self {
            name: draft.name().to_owned(),
            profile: draft.profile().to_owned(),
            instance_count: draft.instance_count(),
            resource_buckets: draft
                .resources()
                .iter()
                .map(|bucket| bucket.name.clone())
                .collect(),
            result_bucket: draft.results().map(|bucket| bucket.name.clone()),
            constants: draft
                .constants()
                .iter()
                .map(|(key, value)| ConstantBody {
                    key: key.clone(),
                    value: value.clone(),
                })
                .collect(),
        }
    }
}

/// Response of `POST /tasks`.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub(crate) struct TaskCreated {
    pub(crate) uuid: String,
}

/// Task summary returned by `GET /tasks` and `GET /tasks/{uuid}`.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub(crate) struct TaskBody {
    pub(crate) uuid: String,
    #[serde(default)]
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) profile: String,
    #[serde(default)]
    pub(crate) state: String,
}

impl From<TaskBody> for TaskRecord {
    fn from(body: TaskBody) -> Self {
        Self {
            uuid: body.uuid,
            name: body.name,
            profile: body.profile,
            state: body.state,
        }
    }
}

/// Body of `POST /buckets`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BucketCreateBody {
    pub(crate) bucket_name: String,
}

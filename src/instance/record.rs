use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

/// Version marker carried by records on the unversioned ingestion path
/// (e.g. bulk re-sync). Any other value, or no value, is not "unversioned".
pub const UNVERSIONED_SENTINEL: i64 = -1;

/// Persisted description of one cluster member.
///
/// Unknown fields at either level are kept in `metadata` / `attributes` and
/// written back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerInstance {
    pub detail: InstanceDetail,

    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceDetail {
    /// Globally unique, immutable once set
    pub container_instance_arn: String,

    /// Short cluster name or fully-qualified cluster resource name
    pub cluster_arn: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    /// Monotonically increasing per instance
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,

    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl ContainerInstance {
    pub fn new(
        container_instance_arn: impl Into<String>,
        cluster_arn: impl Into<String>,
        status: impl Into<String>,
        version: Option<i64>,
    ) -> Self {
        Self {
            detail: InstanceDetail {
                container_instance_arn: container_instance_arn.into(),
                cluster_arn: cluster_arn.into(),
                status: Some(status.into()),
                version,
                attributes: Map::new(),
            },
            metadata: Map::new(),
        }
    }

    #[inline]
    pub fn instance_arn(&self) -> &str {
        &self.detail.container_instance_arn
    }

    #[inline]
    pub fn cluster_arn(&self) -> &str {
        &self.detail.cluster_arn
    }

    #[inline]
    pub fn status(&self) -> Option<&str> {
        self.detail.status.as_deref()
    }

    #[inline]
    pub fn version(&self) -> Option<i64> {
        self.detail.version
    }

    pub fn is_unversioned(&self) -> bool {
        self.detail.version == Some(UNVERSIONED_SENTINEL)
    }
}

/// Wire shape used while decoding; every field is optional so that missing
/// values can be reported precisely instead of as a generic syntax error.
#[derive(Debug, Deserialize)]
pub(super) struct RawInstance {
    #[serde(default)]
    pub(super) detail: Option<RawDetail>,

    #[serde(flatten)]
    pub(super) metadata: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RawDetail {
    #[serde(default)]
    pub(super) container_instance_arn: Option<String>,

    #[serde(default)]
    pub(super) cluster_arn: Option<String>,

    #[serde(default)]
    pub(super) status: Option<String>,

    #[serde(default)]
    pub(super) version: Option<i64>,

    #[serde(flatten)]
    pub(super) attributes: Map<String, Value>,
}

//! Record codec
//!
//! Converts between the backend's string values and [`ContainerInstance`].
//! Decoding enforces the identity invariants: the detail block exists and
//! both `containerInstanceArn` and `clusterArn` are non-empty.

use tracing::trace;

use super::record::RawInstance;
use super::ContainerInstance;
use super::InstanceDetail;
use crate::CodecError;

pub const INSTANCE_ARN_FIELD: &str = "containerInstanceArn";
pub const CLUSTER_ARN_FIELD: &str = "clusterArn";

pub fn decode_instance(document: &str) -> Result<ContainerInstance, CodecError> {
    let raw: RawInstance = serde_json::from_str(document)?;
    let detail = raw.detail.ok_or(CodecError::MissingDetail)?;

    let container_instance_arn = non_empty(detail.container_instance_arn, INSTANCE_ARN_FIELD)?;
    let cluster_arn = non_empty(detail.cluster_arn, CLUSTER_ARN_FIELD)?;

    trace!(instance = %container_instance_arn, cluster = %cluster_arn, "decoded instance");

    Ok(ContainerInstance {
        detail: InstanceDetail {
            container_instance_arn,
            cluster_arn,
            status: detail.status,
            version: detail.version,
            attributes: detail.attributes,
        },
        metadata: raw.metadata,
    })
}

pub fn encode_instance(instance: &ContainerInstance) -> Result<String, CodecError> {
    Ok(serde_json::to_string(instance)?)
}

fn non_empty(
    value: Option<String>,
    field: &'static str,
) -> Result<String, CodecError> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(CodecError::MissingField(field)),
    }
}

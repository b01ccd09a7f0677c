//! Stateless validation predicates shared by the write, read and filter paths.

use std::collections::HashMap;

use super::keys::cluster_short_name;
use super::ContainerInstance;
use super::UNVERSIONED_SENTINEL;
use crate::Error;
use crate::Result;

pub const STATUS_FILTER: &str = "status";
pub const CLUSTER_FILTER: &str = "cluster";

pub fn require_non_empty(
    name: &str,
    value: &str,
) -> Result<()> {
    if value.is_empty() {
        return Err(Error::InvalidInput(format!("{} cannot be empty", name)));
    }
    Ok(())
}

/// Fields every accepted write must carry beyond the decoder's identity checks.
pub fn validate_for_write(instance: &ContainerInstance) -> Result<()> {
    match instance.status() {
        Some(status) if !status.is_empty() => Ok(()),
        _ => Err(Error::InvalidInput(format!(
            "status of instance {} cannot be empty",
            instance.instance_arn()
        ))),
    }
}

/// The versioned path needs a real, non-negative version to order writes by.
/// [`UNVERSIONED_SENTINEL`] and other negative values are rejected.
pub fn validate_versioned(instance: &ContainerInstance) -> Result<()> {
    match instance.version() {
        None => Err(Error::InvalidInput(format!(
            "version of instance {} cannot be empty; use the unversioned add for re-syncs",
            instance.instance_arn()
        ))),
        Some(v) if v < 0 => Err(Error::InvalidInput(format!(
            "instance {} carries version {}, which is not a real version",
            instance.instance_arn(),
            v
        ))),
        Some(_) => Ok(()),
    }
}

/// The unversioned path only takes records explicitly marked with
/// [`UNVERSIONED_SENTINEL`]; anything else belongs on the versioned path.
pub fn validate_unversioned(instance: &ContainerInstance) -> Result<()> {
    match instance.version() {
        None => Err(Error::InvalidInput(format!(
            "version of unversioned instance {} must be set to {}",
            instance.instance_arn(),
            UNVERSIONED_SENTINEL
        ))),
        Some(v) if v != UNVERSIONED_SENTINEL => Err(Error::InvalidInput(format!(
            "instance {} carries version {}; versioned records must use the versioned add",
            instance.instance_arn(),
            v
        ))),
        Some(_) => Ok(()),
    }
}

/// Parsed, validated filter set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstanceFilter {
    pub status: Option<String>,
    pub cluster: Option<String>,
}

impl InstanceFilter {
    /// Rejects an empty map, unknown keys and empty values.
    pub fn parse(filters: &HashMap<String, String>) -> Result<Self> {
        if filters.is_empty() {
            return Err(Error::InvalidInput(
                "at least one filter is required; use list_instances for an unfiltered listing"
                    .into(),
            ));
        }

        let mut parsed = InstanceFilter::default();
        for (key, value) in filters {
            let slot = match key.as_str() {
                STATUS_FILTER => &mut parsed.status,
                CLUSTER_FILTER => &mut parsed.cluster,
                other => {
                    return Err(Error::InvalidInput(format!(
                        "unsupported filter key: {}",
                        other
                    )))
                }
            };
            require_non_empty(key, value)?;
            *slot = Some(value.clone());
        }

        Ok(parsed)
    }

    /// Exact, case-sensitive match on every filter present.
    pub fn matches(
        &self,
        instance: &ContainerInstance,
    ) -> bool {
        if let Some(status) = &self.status {
            if instance.status() != Some(status.as_str()) {
                return false;
            }
        }
        if let Some(cluster) = &self.cluster {
            if cluster_short_name(instance.cluster_arn()) != cluster_short_name(cluster) {
                return false;
            }
        }
        true
    }
}

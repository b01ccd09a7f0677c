//! Backend key schema
//!
//! One key per instance: `<prefix><clusterShortName>/<containerInstanceArn>`.
//! Cluster arguments may be either a bare name or a fully-qualified resource
//! name; both resolve to the same partition.

pub const INSTANCE_KEY_PREFIX: &str = "ecs/instance/";

/// Trailing name segment of a cluster identifier.
///
/// `arn:aws:ecs:us-east-1:123456789123:cluster/prod` and `prod` both yield `prod`.
pub fn cluster_short_name(cluster: &str) -> &str {
    match cluster.rsplit_once('/') {
        Some((_, name)) => name,
        None => cluster,
    }
}

pub fn instance_key(
    cluster: &str,
    instance_arn: &str,
) -> String {
    format!(
        "{}{}/{}",
        INSTANCE_KEY_PREFIX,
        cluster_short_name(cluster),
        instance_arn
    )
}

/// Prefix scoping a scan to one cluster. The trailing `/` keeps `c1` from
/// matching `c10`.
pub fn cluster_prefix(cluster: &str) -> String {
    format!("{}{}/", INSTANCE_KEY_PREFIX, cluster_short_name(cluster))
}

use std::collections::HashMap;

use cluster_state::instance_key;
use cluster_state::ContainerInstanceStore;
use cluster_state::DataStore;
use cluster_state::UNVERSIONED_SENTINEL;

use crate::common::*;
use crate::enable_logger;

#[tokio::test]
async fn test_add_get_delete_lifecycle() {
    enable_logger();
    for ts in all_stores() {
        let record = instance(INSTANCE_ARN_1, CLUSTER_NAME_1, "active", Some(1));

        ts.store.add_instance(&to_json(&record)).await.unwrap();
        let fetched = ts.store.get_instance(CLUSTER_NAME_1, INSTANCE_ARN_1).await.unwrap();
        assert_eq!(fetched, Some(record), "backend: {}", ts.name);

        ts.store.delete_instance(CLUSTER_NAME_1, INSTANCE_ARN_1).await.unwrap();
        let gone = ts.store.get_instance(CLUSTER_NAME_1, INSTANCE_ARN_1).await.unwrap();
        assert_eq!(gone, None, "backend: {}", ts.name);

        // Second delete is still a success
        ts.store.delete_instance(CLUSTER_NAME_1, INSTANCE_ARN_1).await.unwrap();
    }
}

#[tokio::test]
async fn test_round_trip_preserves_unknown_fields() {
    for ts in all_stores() {
        let mut record = instance(INSTANCE_ARN_1, CLUSTER_ARN_1, "ACTIVE", Some(7));
        record
            .detail
            .attributes
            .insert("runningTasksCount".into(), serde_json::json!(3));
        record
            .metadata
            .insert("region".into(), serde_json::json!("us-east-1"));

        ts.store.add_instance(&to_json(&record)).await.unwrap();
        let fetched = ts.store.get_instance(CLUSTER_ARN_1, INSTANCE_ARN_1).await.unwrap();

        assert_eq!(fetched, Some(record), "backend: {}", ts.name);
    }
}

#[tokio::test]
async fn test_lower_or_equal_version_never_replaces() {
    for ts in all_stores() {
        let newer = instance(INSTANCE_ARN_1, CLUSTER_ARN_1, "ACTIVE", Some(5));
        ts.store.add_instance(&to_json(&newer)).await.unwrap();

        for version in [1, 4, 5] {
            let stale = instance(INSTANCE_ARN_1, CLUSTER_ARN_1, "DRAINING", Some(version));
            ts.store.add_instance(&to_json(&stale)).await.unwrap();
        }

        let fetched = ts.store.get_instance(CLUSTER_ARN_1, INSTANCE_ARN_1).await.unwrap();
        assert_eq!(fetched, Some(newer), "backend: {}", ts.name);
    }
}

#[tokio::test]
async fn test_unversioned_write_overrides_versioned_record() {
    for ts in all_stores() {
        let versioned = instance(INSTANCE_ARN_1, CLUSTER_ARN_1, "ACTIVE", Some(5));
        ts.store.add_instance(&to_json(&versioned)).await.unwrap();

        let resync = instance(INSTANCE_ARN_1, CLUSTER_ARN_1, "INACTIVE", Some(UNVERSIONED_SENTINEL));
        ts.store.add_unversioned_instance(&to_json(&resync)).await.unwrap();

        let fetched = ts.store.get_instance(CLUSTER_ARN_1, INSTANCE_ARN_1).await.unwrap();
        assert_eq!(fetched, Some(resync), "backend: {}", ts.name);

        // Any real version beats the sentinel afterwards
        let next = instance(INSTANCE_ARN_1, CLUSTER_ARN_1, "ACTIVE", Some(1));
        ts.store.add_instance(&to_json(&next)).await.unwrap();
        let fetched = ts.store.get_instance(CLUSTER_ARN_1, INSTANCE_ARN_1).await.unwrap();
        assert_eq!(fetched, Some(next), "backend: {}", ts.name);
    }
}

#[tokio::test]
async fn test_invalid_filters_are_rejected() {
    for ts in all_stores() {
        let empty = ts.store.filter_instances(&HashMap::new()).await.unwrap_err();
        assert!(empty.is_invalid_input(), "backend: {}", ts.name);

        let bogus = ts.store.filter_instances(&filters(&[("bogus", "x")])).await.unwrap_err();
        assert!(bogus.is_invalid_input(), "backend: {}", ts.name);
    }
}

#[tokio::test]
async fn test_status_filter_is_subset_of_listing() {
    for ts in all_stores() {
        let records = [
            instance(INSTANCE_ARN_1, CLUSTER_ARN_1, "ACTIVE", Some(1)),
            instance(INSTANCE_ARN_2, CLUSTER_ARN_1, "DRAINING", Some(1)),
            instance(INSTANCE_ARN_1, CLUSTER_ARN_2, "ACTIVE", Some(1)),
            instance(INSTANCE_ARN_2, CLUSTER_ARN_2, "INACTIVE", Some(1)),
        ];
        for record in &records {
            ts.store.add_instance(&to_json(record)).await.unwrap();
        }

        let listed = ts.store.list_instances().await.unwrap();
        assert_eq!(listed.len(), records.len(), "backend: {}", ts.name);

        for status in ["ACTIVE", "DRAINING", "INACTIVE", "UNKNOWN"] {
            let mut expected: Vec<_> = listed
                .iter()
                .filter(|i| i.status() == Some(status))
                .map(|i| (i.cluster_arn().to_string(), i.instance_arn().to_string()))
                .collect();
            let mut actual: Vec<_> = ts
                .store
                .filter_instances(&filters(&[("status", status)]))
                .await
                .unwrap()
                .iter()
                .map(|i| (i.cluster_arn().to_string(), i.instance_arn().to_string()))
                .collect();
            expected.sort();
            actual.sort();
            assert_eq!(actual, expected, "backend: {}, status: {}", ts.name, status);
        }
    }
}

#[tokio::test]
async fn test_cluster_filter_scopes_to_one_cluster() {
    for ts in all_stores() {
        ts.store
            .add_instance(&to_json(&instance(INSTANCE_ARN_1, CLUSTER_ARN_1, "ACTIVE", Some(1))))
            .await
            .unwrap();
        ts.store
            .add_instance(&to_json(&instance(INSTANCE_ARN_2, CLUSTER_ARN_2, "ACTIVE", Some(1))))
            .await
            .unwrap();

        let result = ts
            .store
            .filter_instances(&filters(&[("cluster", CLUSTER_NAME_1)]))
            .await
            .unwrap();

        assert_eq!(result.len(), 1, "backend: {}", ts.name);
        assert_eq!(result[0].instance_arn(), INSTANCE_ARN_1);
    }
}

#[tokio::test]
async fn test_corrupt_record_fails_reads() {
    for ts in all_stores() {
        ts.backend
            .add(&instance_key(CLUSTER_NAME_1, INSTANCE_ARN_1), "{\"detail\":")
            .await
            .unwrap();

        let get = ts.store.get_instance(CLUSTER_NAME_1, INSTANCE_ARN_1).await.unwrap_err();
        assert!(get.is_malformed_record(), "backend: {}", ts.name);

        let list = ts.store.list_instances().await.unwrap_err();
        assert!(list.is_malformed_record(), "backend: {}", ts.name);

        let write = ts
            .store
            .add_instance(&to_json(&instance(INSTANCE_ARN_1, CLUSTER_NAME_1, "ACTIVE", Some(1))))
            .await
            .unwrap_err();
        assert!(write.is_malformed_record(), "backend: {}", ts.name);
    }
}

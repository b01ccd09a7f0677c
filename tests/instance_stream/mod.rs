use cluster_state::instance_key;
use cluster_state::ContainerInstanceStore;
use cluster_state::DataStore;
use tokio::time::timeout;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::common::*;
use crate::enable_logger;

#[tokio::test]
async fn test_stream_delivers_writes_in_commit_order() {
    enable_logger();
    for ts in all_stores() {
        let token = CancellationToken::new();
        let mut stream = ts.store.stream_instances(token.clone()).await.unwrap();

        let expected: Vec<_> = (1..=3)
            .map(|v| instance(INSTANCE_ARN_1, CLUSTER_ARN_1, "ACTIVE", Some(v)))
            .collect();
        for record in &expected {
            ts.store.add_instance(&to_json(record)).await.unwrap();
        }

        for record in &expected {
            let event = timeout(WAIT, stream.next()).await.expect("event in time");
            assert_eq!(event.unwrap().unwrap(), *record, "backend: {}", ts.name);
        }

        token.cancel();
        let end = timeout(WAIT, stream.next()).await.expect("close in time");
        assert!(end.is_none(), "backend: {}", ts.name);
    }
}

#[tokio::test]
async fn test_stream_cancel_before_any_event_closes_empty() {
    for ts in all_stores() {
        let token = CancellationToken::new();
        let mut stream = ts.store.stream_instances(token.clone()).await.unwrap();

        token.cancel();

        let end = timeout(WAIT, stream.next()).await.expect("close in time");
        assert!(end.is_none(), "backend: {}", ts.name);
    }
}

#[tokio::test]
async fn test_stream_malformed_document_ends_stream() {
    for ts in all_stores() {
        let token = CancellationToken::new();
        let mut stream = ts.store.stream_instances(token.clone()).await.unwrap();

        ts.backend
            .add(&instance_key(CLUSTER_NAME_1, INSTANCE_ARN_1), "not a document")
            .await
            .unwrap();

        let failure = timeout(WAIT, stream.next()).await.expect("event in time").unwrap();
        assert!(failure.unwrap_err().is_malformed_record(), "backend: {}", ts.name);

        // Backend watch is still open, but nothing else is published
        ts.store
            .add_instance(&to_json(&instance(INSTANCE_ARN_2, CLUSTER_ARN_1, "ACTIVE", Some(1))))
            .await
            .unwrap();
        let end = timeout(WAIT, stream.next()).await.expect("close in time");
        assert!(end.is_none(), "backend: {}", ts.name);

        token.cancel();
    }
}

#[tokio::test]
async fn test_stream_ignores_deletes() {
    for ts in all_stores() {
        ts.store
            .add_instance(&to_json(&instance(INSTANCE_ARN_1, CLUSTER_ARN_1, "ACTIVE", Some(1))))
            .await
            .unwrap();

        let token = CancellationToken::new();
        let mut stream = ts.store.stream_instances(token.clone()).await.unwrap();

        ts.store.delete_instance(CLUSTER_ARN_1, INSTANCE_ARN_1).await.unwrap();
        let later = instance(INSTANCE_ARN_2, CLUSTER_ARN_1, "ACTIVE", Some(1));
        ts.store.add_instance(&to_json(&later)).await.unwrap();

        let event = timeout(WAIT, stream.next()).await.expect("event in time");
        assert_eq!(event.unwrap().unwrap(), later, "backend: {}", ts.name);

        token.cancel();
    }
}

#[tokio::test]
async fn test_independent_streams_see_the_same_writes() {
    for ts in all_stores() {
        let first_token = CancellationToken::new();
        let second_token = CancellationToken::new();
        let mut first = ts.store.stream_instances(first_token.clone()).await.unwrap();
        let mut second = ts.store.stream_instances(second_token.clone()).await.unwrap();

        let record = instance(INSTANCE_ARN_1, CLUSTER_ARN_1, "ACTIVE", Some(1));
        ts.store.add_instance(&to_json(&record)).await.unwrap();

        let a = timeout(WAIT, first.next()).await.expect("event in time");
        let b = timeout(WAIT, second.next()).await.expect("event in time");
        assert_eq!(a.unwrap().unwrap(), record, "backend: {}", ts.name);
        assert_eq!(b.unwrap().unwrap(), record, "backend: {}", ts.name);

        // Cancelling one stream leaves the other running
        first_token.cancel();
        assert!(timeout(WAIT, first.next()).await.expect("close in time").is_none());

        let next = instance(INSTANCE_ARN_1, CLUSTER_ARN_1, "ACTIVE", Some(2));
        ts.store.add_instance(&to_json(&next)).await.unwrap();
        let b = timeout(WAIT, second.next()).await.expect("event in time");
        assert_eq!(b.unwrap().unwrap(), next, "backend: {}", ts.name);

        second_token.cancel();
    }
}

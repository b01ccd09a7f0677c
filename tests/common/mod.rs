use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use cluster_state::encode_instance;
use cluster_state::open_backend;
use cluster_state::Backend;
use cluster_state::BackendKind;
use cluster_state::ContainerInstance;
use cluster_state::DefaultContainerInstanceStore;
use cluster_state::StorageConfig;
use cluster_state::StreamConfig;
use tempfile::TempDir;

pub const CLUSTER_NAME_1: &str = "cluster1";
pub const CLUSTER_ARN_1: &str = "arn:aws:ecs:us-east-1:123456789123:cluster/cluster1";
pub const CLUSTER_ARN_2: &str = "arn:aws:ecs:us-east-1:123456789123:cluster/cluster2";
pub const INSTANCE_ARN_1: &str =
    "arn:aws:ecs:us-east-1:123456789123:container-instance/4b6d45ea-a4b4-4269-9d04-3af6ddfdc597";
pub const INSTANCE_ARN_2: &str =
    "arn:aws:ecs:us-east-1:123456789123:container-instance/a1b2c3d4-0000-4269-9d04-3af6ddfdc598";

pub const WAIT: Duration = Duration::from_secs(3);

pub type Store = DefaultContainerInstanceStore<dyn Backend, dyn Backend>;

/// Store wired to a live backend. Holds the sled directory open for the
/// duration of the test.
pub struct TestStore {
    pub name: &'static str,
    pub store: Store,
    pub backend: Arc<dyn Backend>,
    _dir: Option<TempDir>,
}

fn build(
    name: &'static str,
    config: StorageConfig,
    dir: Option<TempDir>,
) -> TestStore {
    let stream = StreamConfig::default();
    let backend = open_backend(&config, stream.watch_buffer_size).expect("backend should open");
    TestStore {
        name,
        store: DefaultContainerInstanceStore::new(backend.clone(), backend.clone(), stream),
        backend,
        _dir: dir,
    }
}

pub fn memory_store() -> TestStore {
    build("memory", StorageConfig::default(), None)
}

pub fn sled_store() -> TestStore {
    let dir = tempfile::tempdir().expect("temp dir");
    let config = StorageConfig {
        backend: BackendKind::Sled,
        db_path: dir.path().join("db"),
        ..StorageConfig::default()
    };
    build("sled", config, Some(dir))
}

/// One store per backend kind; every scenario runs against each.
pub fn all_stores() -> Vec<TestStore> {
    vec![memory_store(), sled_store()]
}

pub fn instance(
    instance_arn: &str,
    cluster_arn: &str,
    status: &str,
    version: Option<i64>,
) -> ContainerInstance {
    ContainerInstance::new(instance_arn, cluster_arn, status, version)
}

pub fn to_json(instance: &ContainerInstance) -> String {
    encode_instance(instance).expect("encode")
}

pub fn filters(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

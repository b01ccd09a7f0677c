use cluster_state::observability::init_observability;
use cluster_state::open_backend;
use cluster_state::ContainerInstanceStore;
use cluster_state::DefaultContainerInstanceStore;
use cluster_state::Error;
use cluster_state::Result;
use cluster_state::Settings;
use cluster_state::StorageError;
use tokio::signal::unix::signal;
use tokio::signal::unix::SignalKind;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::error;
use tracing::info;
use tracing::warn;

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<()> {
    let settings = Settings::new()?.validate()?;

    // Initializing Logs
    let _guard = init_observability(&settings.log)?;
    info!("{:?}", settings);

    let backend = open_backend(&settings.storage, settings.stream.watch_buffer_size)?;
    let store = DefaultContainerInstanceStore::new(backend.clone(), backend, settings.stream.clone());

    // Initializing Shutdown Signal
    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if let Err(e) = graceful_shutdown(shutdown).await {
                error!("Failed to shutdown: {:?}", e);
            }
        }
    });

    let instances = store.list_instances().await?;
    info!(count = instances.len(), "instances at startup");

    let mut events = store.stream_instances(shutdown.clone()).await?;
    info!("Application started. Waiting for CTRL+C signal...");

    while let Some(event) = events.next().await {
        match event {
            Ok(instance) => info!(
                instance = instance.instance_arn(),
                cluster = instance.cluster_arn(),
                status = ?instance.status(),
                version = ?instance.version(),
                "instance changed"
            ),
            Err(e) => warn!("instance stream failed: {}", e),
        }
    }

    println!("Exiting program.");
    Ok(())
}

async fn graceful_shutdown(shutdown: CancellationToken) -> Result<()> {
    let mut sigint = signal(SignalKind::interrupt()).map_err(io_error)?;
    let mut sigterm = signal(SignalKind::terminate()).map_err(io_error)?;
    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT detected.");
        },
        _ = sigterm.recv() => {
            info!("SIGTERM detected.");
        },
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl+C detected.");
        },
    }

    shutdown.cancel();
    info!("Shutdown completed");
    Ok(())
}

fn io_error(e: std::io::Error) -> Error {
    StorageError::IoError(e).into()
}


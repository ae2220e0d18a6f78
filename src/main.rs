use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use file_store::{
    api,
    auth::AuthChain,
    config::Config,
    gateway::{BlobGateway, ObjectBackend},
    object_store as obj,
    storage::Database,
    sweeper::ExpirationSweeper,
    AppState,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    match log_format.to_lowercase().as_str() {
        "gcp" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_stackdriver::layer())
                .init();
        }
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_span_list(false),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    info!(version = env!("CARGO_PKG_VERSION"), "file-store starting");

    // Load configuration
    let config = Config::load()?;

    // Initialize the metadata database
    let db = Database::open(&config.server.data_dir)?;
    info!("Database opened at: {}", config.server.data_dir);

    // The local backend always exists; it is the fallback upload target.
    let local = obj::LocalStore::new(&config.storage.local_storage_path)?;
    info!(
        "Local storage backend at: {}",
        config.storage.local_storage_path
    );

    // Attach the object-store backend only when it is enabled and its client
    // comes up. Uploads prefer it; a failure here degrades to local-only
    // while existing object:// locations keep routing by their own scheme.
    let object_backend = if config.storage.object_store.enabled {
        let bucket = config
            .storage
            .object_store
            .bucket
            .as_deref()
            .expect("OBJECT_STORE_BUCKET validated in config");
        match obj::GcsStore::new(
            bucket,
            config.storage.object_store.credentials_file.as_deref(),
        )
        .await
        {
            Ok(store) => {
                info!("Object storage backend attached, bucket: {}", bucket);
                Some(ObjectBackend {
                    bucket: bucket.to_string(),
                    store: Arc::new(store),
                })
            }
            Err(e) => {
                warn!(
                    error = %e,
                    "Object storage backend unreachable; new uploads fall back to local storage"
                );
                None
            }
        }
    } else {
        None
    };

    let gateway = Arc::new(BlobGateway::new(Arc::new(local), object_backend));

    let auth = AuthChain::new(&config.auth.jwt_secret, config.auth.api_keys.clone());

    // Start the expiration sweep
    let sweeper = ExpirationSweeper::new(
        db.clone(),
        Arc::clone(&gateway),
        Duration::from_secs(config.sweep_interval_secs),
    );
    let sweep_handle = tokio::spawn(sweeper.run());
    info!(
        interval_secs = config.sweep_interval_secs,
        "Expiration sweeper started"
    );

    // Create shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        gateway,
        auth,
    });

    // Build and start the HTTP server
    let app = api::create_router(Arc::clone(&state));
    let listener = tokio::net::TcpListener::bind(&config.server.bind_address).await?;
    info!("Listening on: {}", config.server.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down background tasks");
    sweep_handle.abort();

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
}

//! Tennis scoreboard backend entrypoint wiring the REST API to the selected document store.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::{Context, bail};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[cfg(feature = "couch-store")]
use tennis_scoreboard_back::dao::document_store::couchdb::{CouchConfig, CouchDocumentStore};
#[cfg(feature = "mongo-store")]
use tennis_scoreboard_back::dao::document_store::mongodb::{MongoConfig, MongoDocumentStore};
use tennis_scoreboard_back::{
    config::AppConfig,
    dao::{
        document_store::{DocumentStore, memory::MemoryDocumentStore},
        storage::StorageError,
    },
    routes,
    services::storage_supervisor,
    state::{AppState, SharedState},
};

/// Storage backend selected through `STORE_BACKEND`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Backend {
    #[cfg(feature = "mongo-store")]
    Mongo,
    #[cfg(feature = "couch-store")]
    Couch,
    Memory,
}

impl Backend {
    fn from_env() -> anyhow::Result<Self> {
        let Some(value) = env::var("STORE_BACKEND").ok().filter(|v| !v.is_empty()) else {
            return Ok(Self::default_backend());
        };
        match value.to_ascii_lowercase().as_str() {
            #[cfg(feature = "mongo-store")]
            "mongo" | "mongodb" => Ok(Self::Mongo),
            #[cfg(feature = "couch-store")]
            "couch" | "couchdb" => Ok(Self::Couch),
            "memory" => Ok(Self::Memory),
            other => bail!("unsupported STORE_BACKEND `{other}`"),
        }
    }

    #[cfg(feature = "mongo-store")]
    fn default_backend() -> Self {
        Self::Mongo
    }

    #[cfg(all(not(feature = "mongo-store"), feature = "couch-store"))]
    fn default_backend() -> Self {
        Self::Couch
    }

    #[cfg(not(any(feature = "mongo-store", feature = "couch-store")))]
    fn default_backend() -> Self {
        Self::Memory
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let backend = Backend::from_env()?;
    info!(?backend, "selected storage backend");

    let app_state = AppState::new(config);
    spawn_supervisor(app_state.clone(), backend);

    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Start the storage supervisor for `backend` in the background.
fn spawn_supervisor(state: SharedState, backend: Backend) {
    match backend {
        #[cfg(feature = "mongo-store")]
        Backend::Mongo => {
            let future_matches = state.config().collections.future_matches.clone();
            tokio::spawn(storage_supervisor::run(state, move || {
                connect_mongo(future_matches.clone())
            }));
        }
        #[cfg(feature = "couch-store")]
        Backend::Couch => {
            tokio::spawn(storage_supervisor::run(state, connect_couch));
        }
        Backend::Memory => {
            let store = MemoryDocumentStore::new();
            info!("using in-memory storage; data is lost on exit");
            tokio::spawn(storage_supervisor::run(state, move || {
                let store = store.clone();
                async move { Ok::<_, StorageError>(Arc::new(store) as Arc<dyn DocumentStore>) }
            }));
        }
    }
}

#[cfg(feature = "mongo-store")]
async fn connect_mongo(future_matches: String) -> Result<Arc<dyn DocumentStore>, StorageError> {
    let config = MongoConfig::from_env().await?;
    let store = MongoDocumentStore::connect(config).await?;
    store.ensure_index(&future_matches, "id").await?;
    Ok(Arc::new(store))
}

#[cfg(feature = "couch-store")]
async fn connect_couch() -> Result<Arc<dyn DocumentStore>, StorageError> {
    let config = CouchConfig::from_env()?;
    let store = CouchDocumentStore::connect(config).await?;
    Ok(Arc::new(store))
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to install SIGTERM handler; waiting for Ctrl+C");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

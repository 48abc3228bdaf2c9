//! Record lifecycle HTTP server.
//!
//! Serves the demo resources over `PostgreSQL`. Requests are authenticated
//! by a trusted proxy that sets `X-Actor-Id` and `X-Actor-Roles`.

mod config;
mod resources;

use anyhow::Context as _;
use axum::{Router, middleware::from_fn, routing::get};
use config::Config;
use record_lifecycle_core::environment::{Clock, SystemClock};
use record_lifecycle_core::messages::{MessageCatalog, Translator};
use record_lifecycle_core::resource::Resource;
use record_lifecycle_core::store::RecordStore;
use record_lifecycle_core::{LifecycleConfig, LifecycleController};
use record_lifecycle_postgres::PostgresRecordStore;
use record_lifecycle_web::middleware::trusted_actor_headers;
use record_lifecycle_web::{handlers, resource_router, with_boundary};
use resources::{Article, Category};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Collaborators shared by every resource controller.
struct Shared {
    store: Arc<dyn RecordStore>,
    translator: Arc<dyn Translator>,
    clock: Arc<dyn Clock>,
    config: LifecycleConfig,
}

impl Shared {
    fn controller<T: Resource>(&self) -> Arc<LifecycleController<T>> {
        Arc::new(
            LifecycleController::<T>::builder(self.store.clone())
                .translator(self.translator.clone())
                .clock(self.clock.clone())
                .config(self.config.clone())
                .build(),
        )
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let config = Config::from_env();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.server.log_level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting record lifecycle server");
    if config.lifecycle.dev_mode {
        warn!("Dev mode is on: internal traces are attached to server errors");
    }

    info!(max_connections = config.postgres.max_connections, "Connecting to database...");
    let store = PostgresRecordStore::connect(&config.postgres.url, config.postgres.max_connections)
        .await
        .context("connecting to PostgreSQL")?;
    for table in [Category::TABLE, Article::TABLE] {
        store
            .ensure_table(table)
            .await
            .with_context(|| format!("creating table {table}"))?;
    }
    info!("Database ready");

    let shared = Shared {
        store: Arc::new(store),
        translator: Arc::new(load_messages(config.lifecycle.messages_path.as_deref())?),
        clock: Arc::new(SystemClock),
        config: config.lifecycle_config(),
    };

    let api = Router::new()
        .nest("/api/categories", resource_router(shared.controller::<Category>()))
        .nest("/api/articles", resource_router(shared.controller::<Article>()))
        .layer(from_fn(trusted_actor_headers));
    let app = with_boundary(api.route("/health", get(handlers::health_check)));

    let addr = config.server_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;

    info!("Server stopped");
    Ok(())
}

/// Message catalog with overrides read from a JSON object of
/// `message key -> template`.
fn load_messages(path: Option<&str>) -> anyhow::Result<MessageCatalog> {
    let Some(path) = path else {
        return Ok(MessageCatalog::new());
    };
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
    let entries: HashMap<String, String> =
        serde_json::from_str(&raw).with_context(|| format!("parsing {path}"))?;
    info!(path, overrides = entries.len(), "Loaded message catalog");
    Ok(MessageCatalog::from_entries(entries))
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            },
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        () = terminate => {
            info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap
mod tests {
    use super::*;
    use record_lifecycle_core::messages::MessageKey;

    #[test]
    fn missing_messages_path_uses_defaults() {
        let catalog = load_messages(None).unwrap();
        assert_eq!(catalog.translate(MessageKey::Success, &[]), "Success.");
    }

    #[test]
    fn messages_file_overrides_defaults() {
        let path = std::env::temp_dir().join(format!("lifecycle-messages-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"response.success": "OK!"}"#).unwrap();

        let catalog = load_messages(path.to_str()).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(catalog.translate(MessageKey::Success, &[]), "OK!");
    }

    #[test]
    fn unreadable_messages_file_is_an_error() {
        let err = load_messages(Some("/nonexistent/messages.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/messages.json"));
    }
}

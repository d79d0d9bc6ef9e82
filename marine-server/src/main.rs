//! Marine Server - upload intake and piracy detection recording
//!
//! Serves the HTTP API and runs the detection consumer until a shutdown
//! signal arrives.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use marine_server::{
    create_router, AppState, Config, DetectionConsumer, KafkaFrameSource, KafkaPublisher, PgStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "marine_server=info,marine_core=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("Invalid configuration")?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %config.socket_addr(),
        "Starting Marine server"
    );

    let store = Arc::new(
        PgStore::connect(
            &config.database_url,
            config.database_min_connections,
            config.database_max_connections,
        )
        .await
        .context("Failed to connect to database")?,
    );

    let publisher = Arc::new(
        KafkaPublisher::new(&config.kafka_broker, &config.kafka_topic, config.frame_format)
            .context("Failed to create Kafka producer")?,
    );

    let source = Arc::new(
        KafkaFrameSource::new(
            &config.kafka_broker,
            &config.kafka_group_id,
            &config.kafka_topic,
        )
        .context("Failed to create Kafka consumer")?,
    );

    let state = AppState::from_config(&config, store.clone(), publisher)
        .context("Failed to initialize application state")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let consumer = DetectionConsumer::new(source, store, config.consumer_retry_interval);
    let consumer_task = tokio::spawn(consumer.run_until(wait_for(shutdown_rx.clone())));

    let app = create_router(state, &config);
    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Listening on http://{}", addr);

    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(wait_for(shutdown_rx))
    .await
    .context("Server error")?;

    if let Err(e) = consumer_task.await {
        tracing::error!(error = %e, "Detection consumer task failed");
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Resolve once the shutdown flag flips (or its sender is gone).
async fn wait_for(mut rx: watch::Receiver<bool>) {
    while !*rx.borrow() {
        if rx.changed().await.is_err() {
            break;
        }
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}

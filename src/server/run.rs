use std::sync::Arc;

use crate::config::{AppState, Config};
use crate::resources::{department, employee};
use crate::server::router::create_app;
use crate::store::Database;

/// Runs the server with configuration loaded from environment variables
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing to stdout
    use tracing_subscriber::{EnvFilter, fmt};

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(true)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    // A missing .env file is fine; the environment may already be set
    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!(error = %e, "No .env file loaded");
    }

    let config = Config::from_env()?;

    tracing::info!(
        port = config.port,
        front_end_origin = ?config.front_end_origin,
        database_uri = %config.database_uri,
        "Server configuration loaded"
    );

    let db = Database::connect(&config.database_uri).map_err(|e| {
        tracing::error!(error = %e, "Error connecting to document store");
        e
    })?;

    let departments = department::resource()?;
    let employees = employee::resource()?;

    for resource in [&departments, &employees] {
        tracing::debug!(
            collection = resource.collection,
            base_path = %resource.base_path(),
            fields = resource.schema.fields.len(),
            "Resource configuration"
        );
    }

    let state = AppState {
        departments: Arc::new(departments.bind(&db)),
        employees: Arc::new(employees.bind(&db)),
        allowed_origin: config.front_end_origin,
    };

    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(
        listener,
        axum::ServiceExt::<axum::extract::Request>::into_make_service(app),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    db.close().await;
    tracing::info!("Server stopped");

    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

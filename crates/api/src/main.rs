use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use casework_api::classification::{DisabledClassifier, DocumentClassifier, HttpClassifier};
use casework_api::config::ServerConfig;
use casework_api::router::build_app_router;
use casework_api::state::AppState;
use casework_db::template_cache::TemplateCache;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "casework_api=debug,casework_db=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = casework_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    casework_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    casework_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    let template_cache = Arc::new(TemplateCache::new());
    if config.template_cache_warm_on_start {
        let mut conn = pool.acquire().await.expect("Failed to acquire connection");
        template_cache
            .warm(&mut *conn, None)
            .await
            .expect("Failed to warm template cache");
    }

    let classifier: Arc<dyn DocumentClassifier> = match &config.classifier_url {
        Some(url) => {
            let classifier = HttpClassifier::new(
                url.clone(),
                Duration::from_secs(config.classifier_timeout_secs),
            )
            .expect("Failed to build classifier HTTP client");
            tracing::info!(url = %url, "Document classification enabled");
            Arc::new(classifier)
        }
        None => {
            tracing::warn!("CLASSIFIER_URL not set, uploads stay unclassified");
            Arc::new(DisabledClassifier)
        }
    };

    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        template_cache,
        classifier,
    };

    let app = build_app_router(state, &config);

    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
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
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}

use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL, AEP_JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = aep_api::config::config();
    tracing::info!("Starting AEP API in {:?} mode", config.environment);

    // Apply pending migrations when the database is reachable. A failure here
    // is logged rather than fatal: /health reports the degraded state.
    match aep_api::database::DatabaseManager::pool().await {
        Ok(pool) => match aep_api::database::migrations::run(&pool).await {
            Ok(applied) if applied.is_empty() => tracing::info!("Schema is up to date"),
            Ok(applied) => tracing::info!("Applied migrations: {:?}", applied),
            Err(e) => tracing::error!("Migration failure: {}", e),
        },
        Err(e) => tracing::error!("Database unavailable at startup: {}", e),
    }

    let app = aep_api::server::app();

    // Allow tests or deployments to override port via env
    let port = std::env::var("AEP_API_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    tracing::info!("AEP API listening on http://{}", bind_addr);

    axum::serve(listener, app).await.expect("server");
}

/**
 * Listlock Server Entry Point
 *
 * This is the main entry point for one edit-lock coordinator instance.
 * Run several behind a load balancer with the PostgreSQL store and
 * backplane to share locks between them.
 */

#[cfg(feature = "ssr")]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file if present
    dotenv::dotenv().ok();

    // Initialize tracing with INFO level by default
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&env_filter))
        .init();

    tracing::info!("[STARTUP] Server initialization started");

    let config = listlock::backend::server::ServerConfig::from_env()?;
    tracing::info!(
        "[STARTUP] Store: {:?}, backplane: {:?}",
        config.store,
        config.backplane
    );

    // Create the Axum app
    let app = listlock::backend::server::create_app(&config).await?;

    // Run the server
    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("[STARTUP] Listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("[STARTUP] Server stopped");
    Ok(())
}

#[cfg(feature = "ssr")]
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("[STARTUP] Failed to listen for shutdown signal: {}", e);
    }
}

#[cfg(not(feature = "ssr"))]
fn main() {
    eprintln!("Server requires the 'ssr' feature to be enabled.");
    eprintln!("Run with: cargo run --bin listlock-server --features ssr");
    std::process::exit(1);
}

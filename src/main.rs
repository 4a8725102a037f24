use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use weather_proxy_server::config::Config;
use weather_proxy_server::routes::{create_router, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "weather_proxy_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    if config.openweather_api_key.is_none() {
        tracing::warn!("OPENWEATHER_API_KEY not set, weather requests will fail until it is");
    }
    if let Some(dir) = &config.static_dir {
        tracing::info!("Serving client assets from {}", dir.display());
    }

    let port = config.port;
    let state = AppState::from_config(config)?;

    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!("Server starting on http://0.0.0.0:{}", port);

    axum::serve(listener, app).await?;

    Ok(())
}

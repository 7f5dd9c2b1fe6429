use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use market_price_backend::{
    Config, PriceServiceBuilder, RateService,
    api::{self, AppState},
    database::Database,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("🚀 Starting Market Price Backend...");

    let config = Config::from_env()?;
    if config.cmc_api_key.is_none() {
        tracing::warn!("CMC_API_KEY is not set, crypto prices will be unavailable");
    }

    let mut builder = PriceServiceBuilder::from_config(&config)?;

    // Asset enablement is optional; without it every known symbol is served
    let db = match &config.database_url {
        Some(url) => {
            tracing::info!("📊 Connecting to database...");
            let db = Arc::new(Database::new(url).await?);
            builder = builder.asset_directory(db.clone());
            Some(db)
        }
        None => {
            tracing::info!("No DATABASE_URL, serving all known symbols");
            None
        }
    };

    let prices = builder.build();
    let rates = Arc::new(RateService::new(prices.clone(), config.cache.rate_ttl));

    tracing::info!("Tracking {} symbols", prices.known_symbols().len());

    let app = api::create_router(AppState { prices, rates, db });

    let addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("🌐 Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

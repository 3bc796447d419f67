//! Ölföng commerce service: VAT, discounts and analytics.

use std::sync::Arc;

use anyhow::Result;
use olfong_commerce::{
    api::{self, AppState},
    config::Config,
    publisher::EventPublisher,
    store::PgStore,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();

    let store = PgStore::connect(&config.database_url, config.max_connections).await?;
    let events = EventPublisher::connect(config.nats_url.as_deref()).await;
    let app = api::router(AppState::new(Arc::new(store), events, config.pricing.clone()));

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("🚀 Ölföng commerce listening on {}", addr);
    axum::serve(tokio::net::TcpListener::bind(&addr).await?, app).await?;
    Ok(())
}

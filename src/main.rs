use std::sync::Arc;

use deal_aggregator::config::AppConfig;
use deal_aggregator::coupon_engine::CouponEngine;
use deal_aggregator::routes;
use deal_aggregator::sources::{MockSource, SourceFetcher};
use deal_aggregator::DealAggregator;
use tracing_subscriber::EnvFilter;

const MARKETPLACES: [&str; 4] = ["Mercado Livre", "Amazon", "Shopee", "AliExpress"];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env()?;

    let coupons = match &config.coupon_seed {
        Some(path) => CouponEngine::from_seed_file(path)?,
        None => CouponEngine::with_default_catalog()?,
    };

    let sources: Vec<Arc<dyn SourceFetcher>> = MARKETPLACES
        .iter()
        .map(|name| {
            let source = MockSource::new(*name, config.search.max_results_per_source)
                .with_latency(config.search.mock_latency());
            Arc::new(source) as Arc<dyn SourceFetcher>
        })
        .collect();

    let aggregator = Arc::new(DealAggregator::new(
        sources,
        Arc::new(coupons),
        config.search.clone(),
    ));

    let app = routes::router(aggregator);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr).await?;
    tracing::info!("Deal aggregator running on {}", config.server.bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

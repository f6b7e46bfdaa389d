pub mod coupons;
pub mod search;

use axum::{extract::Extension, response::Json, routing::get, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::aggregator::DealAggregator;

/// Full HTTP surface of the service.
pub fn router(aggregator: Arc<DealAggregator>) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(search::search_routes())
        .merge(coupons::coupon_routes())
        .layer(Extension(aggregator))
        .layer(CorsLayer::permissive())
}

async fn health(Extension(aggregator): Extension<Arc<DealAggregator>>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "deal-aggregator",
        "sources": aggregator.source_names(),
    }))
}

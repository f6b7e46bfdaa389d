use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::aggregator::DealAggregator;
use crate::matching::{grouping_stats, GroupingStats};
use crate::models::{AggregatedResult, Listing, ProductGroup};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub total_results: usize,
    pub search_time_ms: u128,
    pub timestamp: DateTime<Utc>,
    pub best_price: Option<Listing>,
    pub listings: Vec<Listing>,
}

impl From<AggregatedResult> for SearchResponse {
    fn from(result: AggregatedResult) -> Self {
        Self {
            best_price: result.best_price().cloned(),
            query: result.query,
            total_results: result.total_results,
            search_time_ms: result.search_time.as_millis(),
            timestamp: result.timestamp,
            listings: result.listings,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GroupsResponse {
    pub query: String,
    pub total_results: usize,
    pub group_count: usize,
    pub stats: GroupingStats,
    pub groups: IndexMap<String, ProductGroup>,
}

pub fn search_routes() -> Router {
    Router::new()
        .route("/search", get(search))
        .route("/search/groups", get(search_groups))
        .route("/search/:source", get(search_source))
}

async fn search(
    Extension(aggregator): Extension<Arc<DealAggregator>>,
    Query(params): Query<SearchQuery>,
) -> Json<SearchResponse> {
    let result = aggregator.search(&params.q).await;
    Json(result.into())
}

async fn search_groups(
    Extension(aggregator): Extension<Arc<DealAggregator>>,
    Query(params): Query<SearchQuery>,
) -> Json<GroupsResponse> {
    let result = aggregator.search(&params.q).await;
    let groups = aggregator.group_and_compare(&result);
    let stats = grouping_stats(&groups.values().cloned().collect::<Vec<_>>());

    Json(GroupsResponse {
        query: result.query,
        total_results: result.total_results,
        group_count: groups.len(),
        stats,
        groups,
    })
}

async fn search_source(
    Extension(aggregator): Extension<Arc<DealAggregator>>,
    Path(source): Path<String>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, StatusCode> {
    match aggregator.search_source(&params.q, &source).await {
        Some(result) => Ok(Json(result.into())),
        None => {
            tracing::warn!("Search requested for unknown source {}", source);
            Err(StatusCode::NOT_FOUND)
        }
    }
}

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::aggregator::DealAggregator;
use crate::coupon_engine::{Coupon, CouponApplication, CouponDraft};
use crate::error::CatalogError;

#[derive(Debug, Deserialize)]
pub struct BestCouponQuery {
    pub source: String,
    pub price: f64,
    pub category: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CouponsResponse {
    pub coupons: Vec<Coupon>,
    pub total: usize,
}

impl From<Vec<Coupon>> for CouponsResponse {
    fn from(coupons: Vec<Coupon>) -> Self {
        let total = coupons.len();
        Self { coupons, total }
    }
}

#[derive(Debug, Serialize)]
pub struct PruneResponse {
    pub removed: usize,
}

pub fn coupon_routes() -> Router {
    Router::new()
        .route("/coupons", get(list_coupons).post(add_coupon))
        .route("/coupons/prune", post(prune_coupons))
        .route("/coupons/best", get(best_coupon))
        .route("/coupons/:source", get(coupons_for_source))
        .route("/coupons/:source/:code", delete(remove_coupon))
}

async fn list_coupons(
    Extension(aggregator): Extension<Arc<DealAggregator>>,
) -> Json<CouponsResponse> {
    Json(aggregator.coupons().all_coupons().await.into())
}

async fn coupons_for_source(
    Extension(aggregator): Extension<Arc<DealAggregator>>,
    Path(source): Path<String>,
) -> Json<CouponsResponse> {
    Json(aggregator.coupons().coupons_for_source(&source).await.into())
}

async fn add_coupon(
    Extension(aggregator): Extension<Arc<DealAggregator>>,
    Json(draft): Json<CouponDraft>,
) -> Result<(StatusCode, Json<Coupon>), StatusCode> {
    let coupon = match draft.build() {
        Ok(coupon) => coupon,
        Err(e) => {
            tracing::warn!("Rejected coupon: {}", e);
            return Err(StatusCode::BAD_REQUEST);
        }
    };

    match aggregator.coupons().add(coupon.clone()).await {
        Ok(()) => Ok((StatusCode::CREATED, Json(coupon))),
        Err(CatalogError::DuplicateCoupon { code, source_name }) => {
            tracing::warn!("Coupon {} already exists for {}", code, source_name);
            Err(StatusCode::CONFLICT)
        }
        Err(e) => {
            tracing::error!("Failed to add coupon: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

async fn remove_coupon(
    Extension(aggregator): Extension<Arc<DealAggregator>>,
    Path((source, code)): Path<(String, String)>,
) -> StatusCode {
    if aggregator.coupons().remove(&code, &source).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

async fn prune_coupons(
    Extension(aggregator): Extension<Arc<DealAggregator>>,
) -> Json<PruneResponse> {
    let removed = aggregator.coupons().prune_expired().await;
    Json(PruneResponse { removed })
}

async fn best_coupon(
    Extension(aggregator): Extension<Arc<DealAggregator>>,
    Query(params): Query<BestCouponQuery>,
) -> Result<Json<CouponApplication>, StatusCode> {
    if !params.price.is_finite() || params.price <= 0.0 {
        return Err(StatusCode::BAD_REQUEST);
    }

    let application = aggregator
        .coupons()
        .apply_best(&params.source, params.price, params.category.as_deref())
        .await;
    Ok(Json(application))
}

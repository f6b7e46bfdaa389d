//! Multi-marketplace deal aggregation: concurrent source search, fuzzy
//! product grouping and per-marketplace coupon pricing.

pub mod aggregator;
pub mod config;
pub mod coupon_engine;
pub mod error;
pub mod matching;
pub mod models;
pub mod routes;
pub mod sources;

pub use aggregator::DealAggregator;
pub use config::AppConfig;
pub use coupon_engine::CouponEngine;
pub use models::{AggregatedResult, Listing, ProductGroup};

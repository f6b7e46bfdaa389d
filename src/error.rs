//! Error types shared across the aggregation pipeline

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Malformed input rejected at construction time.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("query too short: {0} chars (minimum 3)")]
    QueryTooShort(usize),
    #[error("query too long: {0} chars (maximum 100)")]
    QueryTooLong(usize),
    #[error("query contains forbidden character {0:?}")]
    ForbiddenCharacter(char),

    #[error("coupon code must not be empty")]
    EmptyCouponCode,
    #[error("coupon code too long: {0} chars (maximum 50)")]
    CouponCodeTooLong(usize),
    #[error("coupon source must not be empty")]
    EmptyCouponSource,
    #[error("unknown discount type: {0}")]
    UnknownDiscountType(String),
    #[error("discount value must be positive, got {0}")]
    NonPositiveDiscount(f64),
    #[error("percentage discount cannot exceed 100%, got {0}")]
    PercentageOutOfRange(f64),
    #[error("minimum purchase cannot be negative, got {0}")]
    NegativeMinimumPurchase(f64),
    #[error("maximum discount must be positive, got {0}")]
    NonPositiveMaximumDiscount(f64),
    #[error("coupon validity window ends before it starts")]
    InvertedValidityWindow,
    #[error("coupon description too long: {0} chars (maximum 200)")]
    DescriptionTooLong(usize),

    #[error("invalid listing: {0}")]
    InvalidListing(String),
}

/// A single source could not produce listings.
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    #[error("{source_name} unavailable: {reason}")]
    Unavailable { source_name: String, reason: String },
    #[error("{source_name} timed out after {after:?}")]
    Timeout { source_name: String, after: Duration },
}

impl SourceError {
    pub fn unavailable(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        SourceError::Unavailable {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("coupon {code} already exists for {source_name}")]
    DuplicateCoupon { code: String, source_name: String },
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("failed to read coupon seed {path}: {reason}")]
    Seed { path: PathBuf, reason: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid value for {key}: {value}")]
    InvalidEnv { key: &'static str, value: String },
    #[error("invalid config: {0}")]
    Invalid(String),
}

//! Product listings as returned by sources and annotated by the coupon engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::coupon_engine::CouponApplication;
use crate::error::ValidationError;

pub const DEFAULT_CURRENCY: &str = "BRL";
const MAX_NAME_CHARS: usize = 500;
const MAX_COUPON_CODE_CHARS: usize = 50;

/// Record shape every source fetcher produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawListing {
    pub external_id: String,
    pub title: String,
    pub price: f64,
    #[serde(default)]
    pub original_price: Option<f64>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
}

impl RawListing {
    pub fn new(external_id: impl Into<String>, title: impl Into<String>, price: f64) -> Self {
        Self {
            external_id: external_id.into(),
            title: title.into(),
            price,
            original_price: None,
            image_url: None,
            url: None,
            currency: None,
        }
    }
}

/// One offer from one source. Never mutated after construction: coupon
/// adjustment goes through [`Listing::with_coupon`], which returns a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    id: String,
    name: String,
    price: f64,
    original_price: Option<f64>,
    source: String,
    url: String,
    image_url: Option<String>,
    currency: String,
    coupon_code: Option<String>,
    discount_percentage: Option<f64>,
    fetched_at: DateTime<Utc>,
}

impl Listing {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        price: f64,
        source: impl Into<String>,
        url: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let id = id.into();
        let name = name.into();

        if id.trim().is_empty() {
            return Err(ValidationError::InvalidListing("empty id".into()));
        }
        if name.trim().is_empty() {
            return Err(ValidationError::InvalidListing("empty name".into()));
        }
        if name.chars().count() > MAX_NAME_CHARS {
            return Err(ValidationError::InvalidListing(format!(
                "name longer than {} chars",
                MAX_NAME_CHARS
            )));
        }
        if !price.is_finite() || price <= 0.0 {
            return Err(ValidationError::InvalidListing(format!(
                "price must be positive, got {}",
                price
            )));
        }

        Ok(Self {
            id,
            name,
            price,
            original_price: None,
            source: source.into(),
            url: url.into(),
            image_url: None,
            currency: DEFAULT_CURRENCY.to_string(),
            coupon_code: None,
            discount_percentage: None,
            fetched_at: Utc::now(),
        })
    }

    /// Convert a fetcher record into a listing attributed to `source`.
    pub fn from_raw(
        source: &str,
        url: String,
        raw: RawListing,
        fetched_at: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let mut listing = Self::new(raw.external_id, raw.title, raw.price, source, url)?;
        listing.original_price = raw.original_price.filter(|p| p.is_finite() && *p > 0.0);
        listing.image_url = raw.image_url;
        if let Some(currency) = raw.currency.filter(|c| !c.trim().is_empty()) {
            listing.currency = currency;
        }
        listing.fetched_at = fetched_at;
        Ok(listing)
    }

    pub fn with_original_price(mut self, original_price: f64) -> Self {
        self.original_price = Some(original_price);
        self
    }

    pub fn with_image_url(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = Some(image_url.into());
        self
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    /// Produce the coupon-adjusted replacement for this listing. The
    /// pre-coupon price becomes `original_price`.
    pub fn with_coupon(&self, application: &CouponApplication) -> Listing {
        if !application.applied {
            return self.clone();
        }

        let code = application.coupon_code.as_ref().map(|code| {
            code.chars().take(MAX_COUPON_CODE_CHARS).collect::<String>()
        });

        Listing {
            price: application.final_price,
            original_price: Some(application.original_price),
            coupon_code: code,
            discount_percentage: Some(application.discount_percentage.clamp(0.0, 100.0)),
            ..self.clone()
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current price; after coupon adjustment this is the adjusted price.
    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn original_price(&self) -> Option<f64> {
        self.original_price
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn image_url(&self) -> Option<&str> {
        self.image_url.as_deref()
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn coupon_code(&self) -> Option<&str> {
        self.coupon_code.as_deref()
    }

    pub fn discount_percentage(&self) -> Option<f64> {
        self.discount_percentage
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    pub fn has_discount(&self) -> bool {
        matches!(self.original_price, Some(original) if original > self.price)
    }

    pub fn savings(&self) -> f64 {
        match self.original_price {
            Some(original) if original > self.price => original - self.price,
            _ => 0.0,
        }
    }

    /// Discount relative to `original_price`, 0 when there is none.
    pub fn computed_discount_percentage(&self) -> f64 {
        match self.original_price {
            Some(original) if original > self.price => (original - self.price) / original * 100.0,
            _ => 0.0,
        }
    }
}

//! Coupon catalog and best-coupon selection
//!
//! The catalog lives behind an async `RwLock`. Lookups either read under the
//! lock or work on a [`CouponSnapshot`], so no reader ever sees a catalog that
//! is halfway through an `add` or `remove`.

pub mod seed;
pub mod validator;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{CatalogError, ValidationError};
pub use validator::{CouponDraft, Validator};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    Percentage,
    Fixed,
}

impl FromStr for DiscountType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "percentage" => Ok(DiscountType::Percentage),
            "fixed" => Ok(DiscountType::Fixed),
            _ => Err(ValidationError::UnknownDiscountType(s.to_string())),
        }
    }
}

impl fmt::Display for DiscountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscountType::Percentage => write!(f, "percentage"),
            DiscountType::Fixed => write!(f, "fixed"),
        }
    }
}

/// A validated discount rule scoped to one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CouponDraft")]
pub struct Coupon {
    code: String,
    source: String,
    discount_type: DiscountType,
    discount_value: f64,
    valid_from: DateTime<Utc>,
    valid_until: DateTime<Utc>,
    minimum_purchase: Option<f64>,
    maximum_discount: Option<f64>,
    categories: Option<Vec<String>>,
    description: Option<String>,
    is_active: bool,
}

impl TryFrom<CouponDraft> for Coupon {
    type Error = ValidationError;

    fn try_from(draft: CouponDraft) -> Result<Self, Self::Error> {
        let discount_type = Validator::new().validate(&draft)?;

        Ok(Coupon {
            code: draft.code.trim().to_string(),
            source: draft.source.trim().to_string(),
            discount_type,
            discount_value: draft.discount_value,
            valid_from: draft.valid_from,
            valid_until: draft.valid_until,
            minimum_purchase: draft.minimum_purchase,
            maximum_discount: draft.maximum_discount,
            categories: draft.categories,
            description: draft.description,
            is_active: draft.is_active,
        })
    }
}

impl Coupon {
    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn discount_type(&self) -> DiscountType {
        self.discount_type
    }

    pub fn discount_value(&self) -> f64 {
        self.discount_value
    }

    pub fn valid_from(&self) -> DateTime<Utc> {
        self.valid_from
    }

    pub fn valid_until(&self) -> DateTime<Utc> {
        self.valid_until
    }

    pub fn minimum_purchase(&self) -> Option<f64> {
        self.minimum_purchase
    }

    pub fn maximum_discount(&self) -> Option<f64> {
        self.maximum_discount
    }

    pub fn categories(&self) -> Option<&[String]> {
        self.categories.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.valid_from <= now && now <= self.valid_until
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.valid_until < now
    }

    pub fn can_apply_to_price(&self, price: f64) -> bool {
        self.can_apply_at(price, Utc::now())
    }

    pub fn can_apply_at(&self, price: f64, now: DateTime<Utc>) -> bool {
        if !self.is_valid_at(now) {
            return false;
        }

        match self.minimum_purchase {
            Some(minimum) => price >= minimum,
            None => true,
        }
    }

    /// Unrestricted coupons apply to every category.
    pub fn applies_to_category(&self, category: &str) -> bool {
        match &self.categories {
            None => true,
            Some(categories) if categories.is_empty() => true,
            Some(categories) => categories.iter().any(|c| c.eq_ignore_ascii_case(category)),
        }
    }

    pub fn calculate_discount(&self, price: f64) -> f64 {
        self.discount_at(price, Utc::now())
    }

    /// Discount for `price`, clamped to `[0, min(maximum_discount, price)]`.
    pub fn discount_at(&self, price: f64, now: DateTime<Utc>) -> f64 {
        if !self.can_apply_at(price, now) {
            return 0.0;
        }

        let mut discount = match self.discount_type {
            DiscountType::Percentage => price * self.discount_value / 100.0,
            DiscountType::Fixed => self.discount_value,
        };

        if let Some(cap) = self.maximum_discount {
            discount = discount.min(cap);
        }

        discount.min(price).max(0.0)
    }

    pub fn apply_to_price(&self, price: f64) -> f64 {
        (price - self.calculate_discount(price)).max(0.0)
    }

    fn matches(&self, code: &str, source: &str) -> bool {
        same_name(&self.code, code) && same_name(&self.source, source)
    }
}

fn same_name(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// Result of pricing one listing against the catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CouponApplication {
    pub original_price: f64,
    pub final_price: f64,
    pub discount_amount: f64,
    pub coupon_code: Option<String>,
    pub applied: bool,
    pub discount_percentage: f64,
}

impl CouponApplication {
    fn not_applied(price: f64) -> Self {
        Self {
            original_price: price,
            final_price: price,
            discount_amount: 0.0,
            coupon_code: None,
            applied: false,
            discount_percentage: 0.0,
        }
    }
}

/// Point-in-time copy of the catalog. Every lookup on a snapshot uses the
/// instant the snapshot was taken, so one search prices all of its listings
/// against the same coupons.
#[derive(Debug, Clone)]
pub struct CouponSnapshot {
    coupons: Vec<Coupon>,
    taken_at: DateTime<Utc>,
}

impl CouponSnapshot {
    pub fn new(coupons: Vec<Coupon>, taken_at: DateTime<Utc>) -> Self {
        Self { coupons, taken_at }
    }

    pub fn len(&self) -> usize {
        self.coupons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coupons.is_empty()
    }

    pub fn active_coupons(&self) -> Vec<Coupon> {
        active_in(&self.coupons, self.taken_at).cloned().collect()
    }

    pub fn coupons_for_source(&self, source: &str) -> Vec<Coupon> {
        for_source_in(&self.coupons, source, self.taken_at).cloned().collect()
    }

    pub fn best_coupon(&self, source: &str, price: f64, category: Option<&str>) -> Option<&Coupon> {
        best_in(&self.coupons, source, price, category, self.taken_at)
    }

    pub fn apply_best(&self, source: &str, price: f64, category: Option<&str>) -> CouponApplication {
        apply_best_in(&self.coupons, source, price, category, self.taken_at)
    }
}

fn active_in(coupons: &[Coupon], now: DateTime<Utc>) -> impl Iterator<Item = &Coupon> {
    coupons.iter().filter(move |c| c.is_valid_at(now))
}

fn for_source_in<'a, 'b>(
    coupons: &'a [Coupon],
    source: &'b str,
    now: DateTime<Utc>,
) -> impl Iterator<Item = &'a Coupon> + 'b
where
    'a: 'b,
{
    active_in(coupons, now).filter(move |c| same_name(&c.source, source))
}

fn best_in<'a>(
    coupons: &'a [Coupon],
    source: &str,
    price: f64,
    category: Option<&str>,
    now: DateTime<Utc>,
) -> Option<&'a Coupon> {
    let mut best: Option<(&Coupon, f64)> = None;

    for coupon in for_source_in(coupons, source, now) {
        if !coupon.can_apply_at(price, now) {
            continue;
        }
        if let Some(category) = category {
            if !coupon.applies_to_category(category) {
                continue;
            }
        }

        let discount = coupon.discount_at(price, now);
        // Strictly greater keeps the first maximum in catalog order.
        match best {
            Some((_, best_discount)) if discount <= best_discount => {}
            _ => best = Some((coupon, discount)),
        }
    }

    if let Some((coupon, discount)) = best {
        debug!(
            "Best coupon for {}: {} (saves {:.2})",
            source, coupon.code, discount
        );
    }

    best.map(|(coupon, _)| coupon)
}

fn apply_best_in(
    coupons: &[Coupon],
    source: &str,
    price: f64,
    category: Option<&str>,
    now: DateTime<Utc>,
) -> CouponApplication {
    let Some(coupon) = best_in(coupons, source, price, category, now) else {
        return CouponApplication::not_applied(price);
    };

    let discount = coupon.discount_at(price, now);
    let final_price = (price - discount).max(0.0);

    CouponApplication {
        original_price: price,
        final_price,
        discount_amount: discount,
        coupon_code: Some(coupon.code.clone()),
        applied: true,
        discount_percentage: if price > 0.0 { discount / price * 100.0 } else { 0.0 },
    }
}

/// Process-wide coupon catalog, constructed once at startup and shared by
/// reference.
pub struct CouponEngine {
    catalog: RwLock<Vec<Coupon>>,
}

impl CouponEngine {
    pub fn new(coupons: Vec<Coupon>) -> Result<Self, CatalogError> {
        let mut catalog: Vec<Coupon> = Vec::with_capacity(coupons.len());
        for coupon in coupons {
            ensure_unique(&catalog, &coupon)?;
            catalog.push(coupon);
        }

        info!("Coupon engine initialized with {} coupons", catalog.len());

        Ok(Self {
            catalog: RwLock::new(catalog),
        })
    }

    pub fn empty() -> Self {
        Self {
            catalog: RwLock::new(Vec::new()),
        }
    }

    pub async fn snapshot(&self) -> CouponSnapshot {
        let catalog = self.catalog.read().await;
        CouponSnapshot::new(catalog.clone(), Utc::now())
    }

    pub async fn len(&self) -> usize {
        self.catalog.read().await.len()
    }

    pub async fn all_coupons(&self) -> Vec<Coupon> {
        self.catalog.read().await.clone()
    }

    pub async fn active_coupons(&self) -> Vec<Coupon> {
        let catalog = self.catalog.read().await;
        active_in(&catalog, Utc::now()).cloned().collect()
    }

    pub async fn coupons_for_source(&self, source: &str) -> Vec<Coupon> {
        let catalog = self.catalog.read().await;
        for_source_in(&catalog, source, Utc::now()).cloned().collect()
    }

    pub async fn best_coupon(&self, source: &str, price: f64, category: Option<&str>) -> Option<Coupon> {
        let catalog = self.catalog.read().await;
        best_in(&catalog, source, price, category, Utc::now()).cloned()
    }

    pub async fn apply_best(&self, source: &str, price: f64, category: Option<&str>) -> CouponApplication {
        let catalog = self.catalog.read().await;
        apply_best_in(&catalog, source, price, category, Utc::now())
    }

    /// Rejects a coupon whose (code, source) pair is already in the catalog,
    /// compared case-insensitively. Nothing is overwritten.
    pub async fn add(&self, coupon: Coupon) -> Result<(), CatalogError> {
        let mut catalog = self.catalog.write().await;
        ensure_unique(&catalog, &coupon)?;

        info!("Added coupon: {} for {}", coupon.code, coupon.source);
        catalog.push(coupon);
        Ok(())
    }

    pub async fn remove(&self, code: &str, source: &str) -> bool {
        let mut catalog = self.catalog.write().await;
        match catalog.iter().position(|c| c.matches(code, source)) {
            Some(idx) => {
                catalog.remove(idx);
                info!("Removed coupon: {} for {}", code, source);
                true
            }
            None => false,
        }
    }

    /// Drop coupons whose validity window has ended.
    pub async fn prune_expired(&self) -> usize {
        let now = Utc::now();
        let mut catalog = self.catalog.write().await;
        let before = catalog.len();
        catalog.retain(|c| !c.is_expired_at(now));
        let removed = before - catalog.len();

        if removed > 0 {
            info!("Cleaned up {} expired coupons", removed);
        }

        removed
    }
}

fn ensure_unique(catalog: &[Coupon], coupon: &Coupon) -> Result<(), CatalogError> {
    if catalog.iter().any(|c| c.matches(&coupon.code, &coupon.source)) {
        return Err(CatalogError::DuplicateCoupon {
            code: coupon.code.clone(),
            source_name: coupon.source.clone(),
        });
    }
    Ok(())
}

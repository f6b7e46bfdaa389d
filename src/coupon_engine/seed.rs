//! Built-in marketplace coupons and JSON seed loading

use std::fs;
use std::path::Path;

use tracing::{info, warn};

use super::{Coupon, CouponDraft, CouponEngine};
use crate::error::{CatalogError, ValidationError};

/// Coupons shipped with the service, valid for 30 days either side of now.
pub fn default_coupons() -> Result<Vec<Coupon>, ValidationError> {
    let drafts = vec![
        CouponDraft::new("TECH10", "Mercado Livre", "percentage", 10.0)
            .minimum_purchase(500.0)
            .maximum_discount(100.0)
            .description("10% de desconto em eletrônicos acima de R$ 500"),
        CouponDraft::new("FRETEGRATIS", "Mercado Livre", "fixed", 20.0)
            .minimum_purchase(79.0)
            .description("Frete grátis em compras acima de R$ 79"),
        CouponDraft::new("PRIME15", "Amazon", "percentage", 15.0)
            .minimum_purchase(300.0)
            .maximum_discount(150.0)
            .description("15% OFF para membros Prime"),
        CouponDraft::new("SHOPEE20", "Shopee", "percentage", 20.0)
            .minimum_purchase(200.0)
            .maximum_discount(50.0)
            .description("20% de desconto limitado a R$ 50"),
        CouponDraft::new("ALI50", "AliExpress", "fixed", 50.0)
            .minimum_purchase(400.0)
            .description("R$ 50 OFF em compras acima de R$ 400"),
    ];

    drafts.into_iter().map(CouponDraft::build).collect()
}

/// Parse a JSON array of coupon drafts. Entries that fail validation are
/// skipped with a warning; a file that is not a JSON array is an error.
pub fn load_seed_file(path: &Path) -> Result<Vec<Coupon>, CatalogError> {
    let content = fs::read_to_string(path).map_err(|e| CatalogError::Seed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    parse_seed(&content).map_err(|reason| CatalogError::Seed {
        path: path.to_path_buf(),
        reason,
    })
}

fn parse_seed(content: &str) -> Result<Vec<Coupon>, String> {
    let entries: Vec<serde_json::Value> =
        serde_json::from_str(content).map_err(|e| e.to_string())?;

    let total = entries.len();
    let mut coupons = Vec::with_capacity(total);

    for (idx, entry) in entries.into_iter().enumerate() {
        let draft: CouponDraft = match serde_json::from_value(entry) {
            Ok(draft) => draft,
            Err(e) => {
                warn!("Skipping malformed coupon entry #{}: {}", idx, e);
                continue;
            }
        };

        let code = draft.code.clone();
        match draft.build() {
            Ok(coupon) => coupons.push(coupon),
            Err(e) => warn!("Skipping invalid coupon {}: {}", code, e),
        }
    }

    info!("Loaded {}/{} coupons from seed", coupons.len(), total);
    Ok(coupons)
}

impl CouponEngine {
    pub fn with_default_catalog() -> Result<Self, CatalogError> {
        Self::new(default_coupons()?)
    }

    pub fn from_seed_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        Self::new(load_seed_file(path.as_ref())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coupon_engine::DiscountType;

    #[test]
    fn test_default_coupons_are_valid() {
        let coupons = default_coupons().unwrap();
        assert_eq!(coupons.len(), 5);
        assert!(coupons.iter().all(Coupon::is_valid));

        let codes: Vec<&str> = coupons.iter().map(Coupon::code).collect();
        assert_eq!(codes, ["TECH10", "FRETEGRATIS", "PRIME15", "SHOPEE20", "ALI50"]);
    }

    #[tokio::test]
    async fn test_default_catalog_pricing() {
        let engine = CouponEngine::with_default_catalog().unwrap();

        // 20% of 1000 capped at 50
        let shopee = engine.apply_best("Shopee", 1000.0, None).await;
        assert_eq!(shopee.coupon_code.as_deref(), Some("SHOPEE20"));
        assert_eq!(shopee.final_price, 950.0);

        // TECH10 beats the shipping promo above R$ 500
        let ml = engine.apply_best("Mercado Livre", 600.0, None).await;
        assert_eq!(ml.coupon_code.as_deref(), Some("TECH10"));
        assert_eq!(ml.discount_amount, 60.0);

        let ml_small = engine.apply_best("Mercado Livre", 100.0, None).await;
        assert_eq!(ml_small.coupon_code.as_deref(), Some("FRETEGRATIS"));
        assert_eq!(ml_small.final_price, 80.0);
    }

    #[test]
    fn test_parse_seed_skips_invalid_entries() {
        let json = r#"[
            {"code": "OK10", "source": "Amazon", "discount_type": "percentage",
             "discount_value": 10, "valid_from": "2024-01-01T00:00:00Z",
             "valid_until": "2099-01-01T00:00:00Z"},
            {"code": "BAD", "source": "Amazon", "discount_type": "percentage",
             "discount_value": 300, "valid_from": "2024-01-01T00:00:00Z",
             "valid_until": "2099-01-01T00:00:00Z"},
            {"code": "NOFIELDS"},
            {"code": "FLAT", "source": "Shopee", "discount_type": "fixed",
             "discount_value": 15, "valid_from": "2024-01-01T00:00:00Z",
             "valid_until": "2099-01-01T00:00:00Z", "minimum_purchase": 100}
        ]"#;

        let coupons = parse_seed(json).unwrap();
        assert_eq!(coupons.len(), 2);
        assert_eq!(coupons[0].code(), "OK10");
        assert_eq!(coupons[1].discount_type(), DiscountType::Fixed);
        assert_eq!(coupons[1].minimum_purchase(), Some(100.0));
    }

    #[test]
    fn test_parse_seed_rejects_non_array() {
        assert!(parse_seed(r#"{"code": "X"}"#).is_err());
    }

    #[test]
    fn test_missing_seed_file() {
        let err = load_seed_file(Path::new("/nonexistent/coupons.json")).unwrap_err();
        assert!(matches!(err, CatalogError::Seed { .. }));
    }
}

//! Coupon validation: every coupon passes through here before it can exist

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::coupon_engine::{Coupon, DiscountType};
use crate::error::ValidationError;

const MAX_CODE_CHARS: usize = 50;
const MAX_DESCRIPTION_CHARS: usize = 200;
const DEFAULT_WINDOW_DAYS: i64 = 30;

/// Unvalidated coupon fields, as typed by an admin or read from a seed file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouponDraft {
    pub code: String,
    pub source: String,
    pub discount_type: String,
    pub discount_value: f64,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    #[serde(default)]
    pub minimum_purchase: Option<f64>,
    #[serde(default)]
    pub maximum_discount: Option<f64>,
    #[serde(default)]
    pub categories: Option<Vec<String>>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl CouponDraft {
    /// Draft valid from 30 days ago until 30 days from now.
    pub fn new(
        code: impl Into<String>,
        source: impl Into<String>,
        discount_type: impl Into<String>,
        discount_value: f64,
    ) -> Self {
        let now = Utc::now();
        Self {
            code: code.into(),
            source: source.into(),
            discount_type: discount_type.into(),
            discount_value,
            valid_from: now - Duration::days(DEFAULT_WINDOW_DAYS),
            valid_until: now + Duration::days(DEFAULT_WINDOW_DAYS),
            minimum_purchase: None,
            maximum_discount: None,
            categories: None,
            description: None,
            is_active: true,
        }
    }

    pub fn valid_between(mut self, from: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        self.valid_from = from;
        self.valid_until = until;
        self
    }

    pub fn minimum_purchase(mut self, amount: f64) -> Self {
        self.minimum_purchase = Some(amount);
        self
    }

    pub fn maximum_discount(mut self, amount: f64) -> Self {
        self.maximum_discount = Some(amount);
        self
    }

    pub fn categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = Some(categories.into_iter().map(Into::into).collect());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    pub fn build(self) -> Result<Coupon, ValidationError> {
        Coupon::try_from(self)
    }
}

pub struct Validator;

impl Validator {
    pub fn new() -> Self {
        Self
    }

    /// First problem found, checking fields in declaration order.
    pub fn validate(&self, draft: &CouponDraft) -> Result<DiscountType, ValidationError> {
        match self.validation_errors(draft).into_iter().next() {
            Some(err) => Err(err),
            None => draft.discount_type.parse(),
        }
    }

    /// Every problem with the draft.
    pub fn validation_errors(&self, draft: &CouponDraft) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if let Err(e) = self.validate_code(&draft.code) {
            errors.push(e);
        }

        if draft.source.trim().is_empty() {
            errors.push(ValidationError::EmptyCouponSource);
        }

        match draft.discount_type.parse::<DiscountType>() {
            Ok(kind) => {
                if let Err(e) = self.validate_discount(kind, draft.discount_value) {
                    errors.push(e);
                }
            }
            Err(e) => errors.push(e),
        }

        if draft.valid_until < draft.valid_from {
            errors.push(ValidationError::InvertedValidityWindow);
        }

        if let Some(minimum) = draft.minimum_purchase {
            if !minimum.is_finite() || minimum < 0.0 {
                errors.push(ValidationError::NegativeMinimumPurchase(minimum));
            }
        }

        if let Some(cap) = draft.maximum_discount {
            if !cap.is_finite() || cap <= 0.0 {
                errors.push(ValidationError::NonPositiveMaximumDiscount(cap));
            }
        }

        if let Some(description) = &draft.description {
            let len = description.chars().count();
            if len > MAX_DESCRIPTION_CHARS {
                errors.push(ValidationError::DescriptionTooLong(len));
            }
        }

        errors
    }

    fn validate_code(&self, code: &str) -> Result<(), ValidationError> {
        if code.trim().is_empty() {
            return Err(ValidationError::EmptyCouponCode);
        }

        let len = code.chars().count();
        if len > MAX_CODE_CHARS {
            return Err(ValidationError::CouponCodeTooLong(len));
        }

        Ok(())
    }

    fn validate_discount(&self, kind: DiscountType, value: f64) -> Result<(), ValidationError> {
        if !value.is_finite() || value <= 0.0 {
            return Err(ValidationError::NonPositiveDiscount(value));
        }

        if kind == DiscountType::Percentage && value > 100.0 {
            return Err(ValidationError::PercentageOutOfRange(value));
        }

        Ok(())
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_percentage_coupon() {
        let coupon = CouponDraft::new("TECH10", "Mercado Livre", "percentage", 10.0)
            .minimum_purchase(500.0)
            .maximum_discount(100.0)
            .build()
            .unwrap();
        assert_eq!(coupon.code(), "TECH10");
        assert_eq!(coupon.discount_type(), DiscountType::Percentage);
    }

    #[test]
    fn test_discount_type_is_case_insensitive() {
        let coupon = CouponDraft::new("ALI50", "AliExpress", "FIXED", 50.0).build().unwrap();
        assert_eq!(coupon.discount_type(), DiscountType::Fixed);
    }

    #[test]
    fn test_unknown_discount_type() {
        let err = CouponDraft::new("X1", "Amazon", "bogo", 10.0).build().unwrap_err();
        assert_eq!(err, ValidationError::UnknownDiscountType("bogo".into()));
    }

    #[test]
    fn test_percentage_over_100() {
        let err = CouponDraft::new("X1", "Amazon", "percentage", 150.0).build().unwrap_err();
        assert_eq!(err, ValidationError::PercentageOutOfRange(150.0));
    }

    #[test]
    fn test_non_positive_value() {
        let err = CouponDraft::new("X1", "Amazon", "fixed", 0.0).build().unwrap_err();
        assert_eq!(err, ValidationError::NonPositiveDiscount(0.0));
    }

    #[test]
    fn test_code_length() {
        assert_eq!(
            CouponDraft::new("", "Amazon", "fixed", 5.0).build().unwrap_err(),
            ValidationError::EmptyCouponCode
        );
        let long = "A".repeat(51);
        assert_eq!(
            CouponDraft::new(long, "Amazon", "fixed", 5.0).build().unwrap_err(),
            ValidationError::CouponCodeTooLong(51)
        );
    }

    #[test]
    fn test_inverted_window() {
        let now = Utc::now();
        let err = CouponDraft::new("X1", "Amazon", "fixed", 5.0)
            .valid_between(now, now - Duration::days(1))
            .build()
            .unwrap_err();
        assert_eq!(err, ValidationError::InvertedValidityWindow);
    }

    #[test]
    fn test_collects_every_error() {
        let draft = CouponDraft::new("", "", "weird", 1.0).maximum_discount(-5.0);
        let errors = Validator::new().validation_errors(&draft);
        assert_eq!(errors.len(), 4);
    }
}

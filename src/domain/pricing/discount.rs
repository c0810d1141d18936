//! Discount Resolver
//!
//! Picks the single applicable discount for a product and computes the
//! effective price. Candidate records are fetched by the caller; resolution
//! itself is pure.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::Money;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    Percentage,
    Fixed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "target_type", content = "target_id", rename_all = "snake_case")]
pub enum DiscountTarget {
    Product(Uuid),
    Category(Uuid),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Discount {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub kind: DiscountKind,
    pub value: Decimal,
    #[serde(flatten)]
    pub target: DiscountTarget,
    pub is_active: bool,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Discount {
    /// Value in range and window not inverted. Malformed discounts are
    /// excluded from candidacy, never applied and never a panic.
    pub fn is_well_formed(&self) -> bool {
        if self.value < Decimal::ZERO {
            return false;
        }
        if self.kind == DiscountKind::Percentage && self.value > Decimal::ONE_HUNDRED {
            return false;
        }
        match (self.starts_at, self.ends_at) {
            (Some(start), Some(end)) => start <= end,
            _ => true,
        }
    }

    pub fn is_within_window(&self, now: DateTime<Utc>) -> bool {
        self.starts_at.map_or(true, |start| start <= now)
            && self.ends_at.map_or(true, |end| end >= now)
    }

    pub fn is_applicable(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.is_well_formed() && self.is_within_window(now)
    }

    pub fn matches(&self, product_id: Uuid, category_id: Uuid) -> bool {
        match self.target {
            DiscountTarget::Product(id) => id == product_id,
            DiscountTarget::Category(id) => id == category_id,
        }
    }

    /// Absolute amount taken off `base_price`, used for same-scope tie-breaks.
    pub fn amount_off(&self, base_price: &Money) -> Decimal {
        base_price.amount() - effective_price(base_price, Some(self)).amount()
    }
}

/// Raw discount record as stored. Loosely typed fields are mapped into the
/// tagged enums at this boundary; rows with unknown variants are rejected.
#[derive(Clone, Debug, sqlx::FromRow)]
pub struct DiscountRow {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub discount_type: String,
    pub discount_value: Decimal,
    pub target_type: String,
    pub target_id: Uuid,
    pub is_active: bool,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<DiscountRow> for Discount {
    type Error = UnknownDiscountField;

    fn try_from(row: DiscountRow) -> Result<Self, Self::Error> {
        let kind = match row.discount_type.as_str() {
            "percentage" => DiscountKind::Percentage,
            "fixed" => DiscountKind::Fixed,
            other => return Err(UnknownDiscountField { field: "discount_type", value: other.to_string() }),
        };
        let target = match row.target_type.as_str() {
            "product" => DiscountTarget::Product(row.target_id),
            "category" => DiscountTarget::Category(row.target_id),
            other => return Err(UnknownDiscountField { field: "target_type", value: other.to_string() }),
        };
        Ok(Discount {
            id: row.id,
            name: row.name,
            description: row.description,
            kind,
            value: row.discount_value,
            target,
            is_active: row.is_active,
            starts_at: row.starts_at,
            ends_at: row.ends_at,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone)]
pub struct UnknownDiscountField {
    pub field: &'static str,
    pub value: String,
}
impl std::error::Error for UnknownDiscountField {}
impl std::fmt::Display for UnknownDiscountField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown {} value: {}", self.field, self.value)
    }
}

/// Resolves the single discount applying to a product.
///
/// Product-scoped discounts take precedence over category-scoped ones; among
/// equal scopes the largest absolute amount off `base_price` wins, remaining
/// ties go to the smallest id so resolution stays reproducible.
pub fn resolve_discount<'a>(
    candidates: &'a [Discount],
    product_id: Uuid,
    category_id: Uuid,
    base_price: &Money,
    now: DateTime<Utc>,
) -> Option<&'a Discount> {
    candidates
        .iter()
        .filter(|d| d.matches(product_id, category_id) && d.is_applicable(now))
        .min_by(|a, b| {
            scope_rank(a)
                .cmp(&scope_rank(b))
                .then_with(|| b.amount_off(base_price).cmp(&a.amount_off(base_price)))
                .then_with(|| a.id.cmp(&b.id))
        })
}

fn scope_rank(d: &Discount) -> u8 {
    match d.target {
        DiscountTarget::Product(_) => 0,
        DiscountTarget::Category(_) => 1,
    }
}

/// Effective unit price at full precision. Used during aggregation; rounding
/// happens once on the aggregated subtotal, not per item.
pub fn effective_price(base_price: &Money, discount: Option<&Discount>) -> Money {
    match discount {
        None => base_price.clone(),
        Some(d) => match d.kind {
            DiscountKind::Percentage => base_price.percent_off(d.value),
            DiscountKind::Fixed => base_price.sub_clamped(d.value),
        },
    }
}

/// Effective price rounded to the currency's minor unit (2dp, round-half-up).
/// This is the amount charged/displayed per unit.
pub fn apply_discount(base_price: &Money, discount: Option<&Discount>) -> Money {
    effective_price(base_price, discount).rounded()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn percent(value: i64, target: DiscountTarget) -> Discount {
        Discount {
            id: Uuid::new_v4(),
            name: "test".into(),
            description: None,
            kind: DiscountKind::Percentage,
            value: Decimal::new(value, 0),
            target,
            is_active: true,
            starts_at: None,
            ends_at: None,
            created_at: Utc::now(),
        }
    }

    fn fixed(value: i64, target: DiscountTarget) -> Discount {
        Discount { kind: DiscountKind::Fixed, value: Decimal::new(value, 0), ..percent(0, target) }
    }

    #[test]
    fn test_percentage_off() {
        let d = percent(20, DiscountTarget::Product(Uuid::new_v4()));
        let price = apply_discount(&Money::bdt(Decimal::new(500, 0)), Some(&d));
        assert_eq!(price.amount(), Decimal::new(400, 0));
    }

    #[test]
    fn test_fixed_floors_at_zero() {
        let d = fixed(150, DiscountTarget::Product(Uuid::new_v4()));
        let price = apply_discount(&Money::bdt(Decimal::new(100, 0)), Some(&d));
        assert_eq!(price.amount(), Decimal::ZERO);
        assert!(!price.is_negative());
    }

    #[test]
    fn test_none_passes_base_through_exactly() {
        let base = Money::bdt(Decimal::new(123456, 3));
        assert_eq!(effective_price(&base, None), base);
    }

    #[test]
    fn test_future_start_not_resolved() {
        let now = Utc::now();
        let product_id = Uuid::new_v4();
        let mut d = percent(20, DiscountTarget::Product(product_id));
        d.starts_at = Some(now + Duration::days(1));
        let candidates = vec![d];
        let base = Money::bdt(Decimal::new(500, 0));
        assert!(resolve_discount(&candidates, product_id, Uuid::new_v4(), &base, now).is_none());
    }

    #[test]
    fn test_past_end_not_resolved() {
        let now = Utc::now();
        let product_id = Uuid::new_v4();
        let mut d = percent(20, DiscountTarget::Product(product_id));
        d.ends_at = Some(now - Duration::hours(1));
        let candidates = vec![d];
        let base = Money::bdt(Decimal::new(500, 0));
        assert!(resolve_discount(&candidates, product_id, Uuid::new_v4(), &base, now).is_none());
    }

    #[test]
    fn test_inactive_flag_wins_over_window() {
        let now = Utc::now();
        let product_id = Uuid::new_v4();
        let mut d = percent(20, DiscountTarget::Product(product_id));
        d.is_active = false;
        let candidates = vec![d];
        let base = Money::bdt(Decimal::new(500, 0));
        assert!(resolve_discount(&candidates, product_id, Uuid::new_v4(), &base, now).is_none());
    }

    #[test]
    fn test_product_scope_beats_category_scope() {
        let now = Utc::now();
        let product_id = Uuid::new_v4();
        let category_id = Uuid::new_v4();
        // Category discount is bigger, product scope still wins.
        let product_d = percent(5, DiscountTarget::Product(product_id));
        let category_d = percent(50, DiscountTarget::Category(category_id));
        let candidates = vec![category_d, product_d.clone()];
        let base = Money::bdt(Decimal::new(100, 0));
        let resolved = resolve_discount(&candidates, product_id, category_id, &base, now).unwrap();
        assert_eq!(resolved.id, product_d.id);
    }

    #[test]
    fn test_same_scope_largest_amount_wins() {
        let now = Utc::now();
        let product_id = Uuid::new_v4();
        let small = percent(10, DiscountTarget::Product(product_id));
        let big = fixed(30, DiscountTarget::Product(product_id));
        let candidates = vec![small, big.clone()];
        // 10% of 200 = 20 < fixed 30
        let base = Money::bdt(Decimal::new(200, 0));
        let resolved = resolve_discount(&candidates, product_id, Uuid::new_v4(), &base, now).unwrap();
        assert_eq!(resolved.id, big.id);
    }

    #[test]
    fn test_equal_amount_smallest_id_wins() {
        let now = Utc::now();
        let product_id = Uuid::new_v4();
        let a = percent(10, DiscountTarget::Product(product_id));
        let b = percent(10, DiscountTarget::Product(product_id));
        let smallest = a.id.min(b.id);
        let candidates = vec![a, b];
        let base = Money::bdt(Decimal::new(100, 0));
        let resolved = resolve_discount(&candidates, product_id, Uuid::new_v4(), &base, now).unwrap();
        assert_eq!(resolved.id, smallest);
    }

    #[test]
    fn test_malformed_discounts_skipped() {
        let now = Utc::now();
        let product_id = Uuid::new_v4();
        let mut over_percent = percent(120, DiscountTarget::Product(product_id));
        over_percent.value = Decimal::new(120, 0);
        let mut inverted = percent(20, DiscountTarget::Product(product_id));
        inverted.starts_at = Some(now + Duration::days(1));
        inverted.ends_at = Some(now - Duration::days(1));
        let mut negative = fixed(0, DiscountTarget::Product(product_id));
        negative.value = Decimal::new(-5, 0);
        let candidates = vec![over_percent, inverted, negative];
        let base = Money::bdt(Decimal::new(500, 0));
        assert!(resolve_discount(&candidates, product_id, Uuid::new_v4(), &base, now).is_none());
    }

    #[test]
    fn test_row_mapping_rejects_unknown_variants() {
        let row = DiscountRow {
            id: Uuid::new_v4(),
            name: "weird".into(),
            description: None,
            discount_type: "bogo".into(),
            discount_value: Decimal::TEN,
            target_type: "product".into(),
            target_id: Uuid::new_v4(),
            is_active: true,
            starts_at: None,
            ends_at: None,
            created_at: Utc::now(),
        };
        assert!(Discount::try_from(row).is_err());
    }

    #[test]
    fn test_row_mapping_accepts_known_variants() {
        let target_id = Uuid::new_v4();
        let row = DiscountRow {
            id: Uuid::new_v4(),
            name: "eid sale".into(),
            description: None,
            discount_type: "percentage".into(),
            discount_value: Decimal::new(15, 0),
            target_type: "category".into(),
            target_id,
            is_active: true,
            starts_at: None,
            ends_at: None,
            created_at: Utc::now(),
        };
        let d = Discount::try_from(row).unwrap();
        assert_eq!(d.kind, DiscountKind::Percentage);
        assert_eq!(d.target, DiscountTarget::Category(target_id));
    }
}

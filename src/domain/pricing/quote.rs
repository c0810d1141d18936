//! Order Quote Aggregation
//!
//! Pure combination of priced line items and a delivery fee into an order
//! total. Summation runs on unrounded effective prices and the subtotal is
//! rounded exactly once, so rounding drift cannot accumulate across items.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::{Money, MoneyError, DEFAULT_CURRENCY};
use crate::{PricingError, Result};

/// One cart line, priced with its *unrounded* effective unit price.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QuoteItem {
    pub product_id: Uuid,
    pub quantity: u32,
    pub unit_price: Money,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OrderQuote {
    pub subtotal: Money,
    /// `None` while the delivery fee is still pending (address not yet
    /// classifiable); the total then omits it and the caller withholds the
    /// final amount.
    pub delivery_fee: Option<Money>,
    pub total: Money,
}

/// Aggregates line items and an optional delivery fee into an order quote.
///
/// A zero quantity or negative unit price is a caller bug and is rejected
/// rather than clamped; a pending (`None`) delivery fee contributes zero.
pub fn aggregate(items: &[QuoteItem], delivery_fee: Option<Money>) -> Result<OrderQuote> {
    let currency = items
        .first()
        .map(|i| i.unit_price.currency())
        .or_else(|| delivery_fee.as_ref().map(|f| f.currency()))
        .unwrap_or(DEFAULT_CURRENCY)
        .to_string();

    let mut subtotal = Money::zero(&currency);
    for item in items {
        if item.quantity == 0 {
            return Err(PricingError::InvalidQuantity(item.product_id));
        }
        if item.unit_price.is_negative() {
            return Err(PricingError::NegativePrice(item.product_id));
        }
        subtotal = subtotal.add(&item.unit_price.multiply(item.quantity)).map_err(money_err)?;
    }
    let subtotal = subtotal.rounded();

    let total = match &delivery_fee {
        Some(fee) => {
            if fee.is_negative() {
                return Err(PricingError::NegativeDeliveryFee);
            }
            subtotal.add(&fee.rounded()).map_err(money_err)?
        }
        None => subtotal.clone(),
    };

    Ok(OrderQuote { subtotal, delivery_fee: delivery_fee.map(|f| f.rounded()), total })
}

fn money_err(e: MoneyError) -> PricingError {
    match e {
        MoneyError::CurrencyMismatch(a, b) => PricingError::CurrencyMismatch(a, b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn item(amount: Decimal, quantity: u32) -> QuoteItem {
        QuoteItem { product_id: Uuid::new_v4(), quantity, unit_price: Money::bdt(amount) }
    }

    #[test]
    fn test_rounds_sum_not_terms() {
        // 9.995 * 3 = 29.985 -> 29.99; per-term rounding would give 30.00
        let quote = aggregate(&[item(Decimal::new(9995, 3), 3)], None).unwrap();
        assert_eq!(quote.subtotal.amount(), Decimal::new(2999, 2));
    }

    #[test]
    fn test_cart_with_fee() {
        let items = [item(Decimal::new(19999, 2), 2), item(Decimal::new(4950, 2), 1)];
        let fee = Money::bdt(Decimal::new(60, 0));
        let quote = aggregate(&items, Some(fee)).unwrap();
        assert_eq!(quote.subtotal.amount(), Decimal::new(44948, 2));
        assert_eq!(quote.total.amount(), Decimal::new(50948, 2));
    }

    #[test]
    fn test_pending_fee_excluded_from_total() {
        let quote = aggregate(&[item(Decimal::new(100, 0), 1)], None).unwrap();
        assert!(quote.delivery_fee.is_none());
        assert_eq!(quote.total, quote.subtotal);
    }

    #[test]
    fn test_total_never_below_subtotal() {
        let quote = aggregate(
            &[item(Decimal::new(100, 0), 2)],
            Some(Money::bdt(Decimal::new(60, 0))),
        )
        .unwrap();
        assert!(quote.total.amount() >= quote.subtotal.amount());
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let bad = item(Decimal::new(100, 0), 0);
        assert!(matches!(aggregate(&[bad], None), Err(PricingError::InvalidQuantity(_))));
    }

    #[test]
    fn test_negative_price_rejected() {
        let bad = item(Decimal::new(-100, 0), 1);
        assert!(matches!(aggregate(&[bad], None), Err(PricingError::NegativePrice(_))));
    }

    #[test]
    fn test_negative_fee_rejected() {
        let result = aggregate(
            &[item(Decimal::new(100, 0), 1)],
            Some(Money::bdt(Decimal::new(-60, 0))),
        );
        assert!(matches!(result, Err(PricingError::NegativeDeliveryFee)));
    }

    #[test]
    fn test_currency_mismatch_rejected() {
        let items = [
            item(Decimal::new(100, 0), 1),
            QuoteItem {
                product_id: Uuid::new_v4(),
                quantity: 1,
                unit_price: Money::new(Decimal::new(100, 0), "USD"),
            },
        ];
        assert!(matches!(aggregate(&items, None), Err(PricingError::CurrencyMismatch(..))));
    }

    #[test]
    fn test_empty_cart_is_zero() {
        let quote = aggregate(&[], None).unwrap();
        assert_eq!(quote.subtotal.amount(), Decimal::ZERO);
        assert_eq!(quote.total.amount(), Decimal::ZERO);
    }
}

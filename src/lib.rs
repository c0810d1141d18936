//! Storefront Pricing Engine
//!
//! Order pricing and discount resolution for an e-commerce storefront.
//!
//! ## Features
//! - Discount resolution (percentage/fixed, product- or category-scoped, time-windowed)
//! - Delivery fee calculation (zone classification + quantity tiering)
//! - Order quote aggregation (subtotal + delivery fee, rounded once)

use thiserror::Error;
use uuid::Uuid;

pub mod domain;

pub use domain::pricing::delivery::{calculate_delivery_fee, DeliveryConfig, DeliveryZone, WeightTier};
pub use domain::pricing::discount::{
    apply_discount, effective_price, resolve_discount, Discount, DiscountKind, DiscountTarget,
};
pub use domain::pricing::quote::{aggregate, OrderQuote, QuoteItem};
pub use domain::value_objects::Money;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum PricingError {
    #[error("invalid quantity for product {0}")]
    InvalidQuantity(Uuid),

    #[error("negative unit price for product {0}")]
    NegativePrice(Uuid),

    #[error("negative delivery fee")]
    NegativeDeliveryFee,

    #[error("currency mismatch: {0} vs {1}")]
    CurrencyMismatch(String, String),

    #[error("invalid delivery configuration: {0}")]
    InvalidDeliveryConfig(String),
}

pub type Result<T> = std::result::Result<T, PricingError>;

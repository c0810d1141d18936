//! Delivery Fee Calculator
//!
//! Classifies a free-text destination address into a delivery zone by keyword
//! lookup and maps total item quantity to a weight tier. Zones, tiers and
//! thresholds are configuration data, not code.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{Money, DEFAULT_CURRENCY};
use crate::PricingError;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeliveryZone {
    pub name: String,
    /// Case-insensitive substrings matched against the address.
    pub keywords: Vec<String>,
    pub base_fee: Decimal,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WeightTier {
    /// Inclusive upper quantity bound; `None` marks the catch-all tier.
    pub max_quantity: Option<u32>,
    pub surcharge: Decimal,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeliveryConfig {
    pub zones: Vec<DeliveryZone>,
    /// Zone for addresses no keyword matches. Carries the highest base fee:
    /// unknown destinations fail toward the expensive default, never free.
    pub fallback: DeliveryZone,
    pub tiers: Vec<WeightTier>,
    #[serde(default = "default_min_address_len")]
    pub min_address_len: usize,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_min_address_len() -> usize {
    8
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            zones: vec![DeliveryZone {
                name: "inside_city".into(),
                keywords: ["dhaka", "mirpur", "uttara", "gulshan", "banani", "dhanmondi", "mohammadpur"]
                    .map(String::from)
                    .to_vec(),
                base_fee: Decimal::new(50, 0),
            }],
            fallback: DeliveryZone {
                name: "outside_city".into(),
                keywords: vec![],
                base_fee: Decimal::new(100, 0),
            },
            tiers: vec![
                WeightTier { max_quantity: Some(5), surcharge: Decimal::new(10, 0) },
                WeightTier { max_quantity: Some(10), surcharge: Decimal::new(25, 0) },
                WeightTier { max_quantity: None, surcharge: Decimal::new(50, 0) },
            ],
            min_address_len: default_min_address_len(),
            currency: default_currency(),
        }
    }
}

impl DeliveryConfig {
    /// Checks the invariants the fee calculation relies on: bounded tiers in
    /// strictly increasing order before a single catch-all, surcharges
    /// non-negative and non-decreasing (fee never drops as quantity grows),
    /// no negative base fee, fallback at least as expensive as any zone.
    pub fn validate(&self) -> crate::Result<()> {
        let invalid = |msg: &str| PricingError::InvalidDeliveryConfig(msg.to_string());
        if self.zones.is_empty() {
            return Err(invalid("no delivery zones configured"));
        }
        if self.tiers.is_empty() {
            return Err(invalid("no weight tiers configured"));
        }
        let mut prev_bound: Option<u32> = None;
        let mut prev_surcharge = Decimal::MIN;
        for (i, tier) in self.tiers.iter().enumerate() {
            if tier.surcharge < Decimal::ZERO {
                return Err(invalid("negative tier surcharge"));
            }
            if tier.surcharge < prev_surcharge {
                return Err(invalid("tier surcharges must not decrease"));
            }
            prev_surcharge = tier.surcharge;
            match tier.max_quantity {
                Some(bound) => {
                    if i + 1 == self.tiers.len() {
                        return Err(invalid("last weight tier must be the catch-all"));
                    }
                    if prev_bound.is_some_and(|p| bound <= p) {
                        return Err(invalid("tier bounds must be strictly increasing"));
                    }
                    prev_bound = Some(bound);
                }
                None => {
                    if i + 1 != self.tiers.len() {
                        return Err(invalid("catch-all tier must come last"));
                    }
                }
            }
        }
        for zone in &self.zones {
            if zone.base_fee < Decimal::ZERO {
                return Err(invalid("negative zone base fee"));
            }
            if zone.base_fee > self.fallback.base_fee {
                return Err(invalid("fallback zone must carry the highest base fee"));
            }
        }
        Ok(())
    }

    /// First zone with a keyword contained in the address, else the fallback.
    pub fn classify_zone(&self, address: &str) -> &DeliveryZone {
        let haystack = address.to_lowercase();
        self.zones
            .iter()
            .find(|zone| zone.keywords.iter().any(|kw| haystack.contains(&kw.to_lowercase())))
            .unwrap_or(&self.fallback)
    }

    fn tier_surcharge(&self, total_quantity: u32) -> Decimal {
        self.tiers
            .iter()
            .find(|t| t.max_quantity.map_or(true, |max| total_quantity <= max))
            .map(|t| t.surcharge)
            .unwrap_or(Decimal::ZERO)
    }
}

/// Computes the delivery fee for a destination address and total item count.
///
/// Returns `None` while the address is blank or below the minimum meaningful
/// length: the caller must withhold the delivery-fee line rather than treat
/// it as free. Pure and deterministic per `(address, quantity)` input.
pub fn calculate_delivery_fee(
    config: &DeliveryConfig,
    address: &str,
    total_quantity: u32,
) -> Option<Money> {
    let trimmed = address.trim();
    if trimmed.is_empty() || trimmed.chars().count() < config.min_address_len {
        return None;
    }
    let zone = config.classify_zone(trimmed);
    let fee = zone.base_fee + config.tier_surcharge(total_quantity);
    Some(Money::new(fee, &config.currency))
}

//! Value Objects for Pricing

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default currency for the storefront.
pub const DEFAULT_CURRENCY: &str = "BDT";

/// Money value object
///
/// Amounts are kept at full precision; [`Money::rounded`] snaps to the
/// currency's minor unit (2 decimal places, round-half-up) and must only be
/// applied at display/persistence time, after aggregation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    amount: Decimal,
    currency: String,
}

impl Money {
    pub fn new(amount: Decimal, currency: &str) -> Self {
        Self { amount, currency: currency.to_string() }
    }
    pub fn bdt(amount: Decimal) -> Self { Self::new(amount, DEFAULT_CURRENCY) }
    pub fn zero(currency: &str) -> Self { Self::new(Decimal::ZERO, currency) }
    pub fn amount(&self) -> Decimal { self.amount }
    pub fn currency(&self) -> &str { &self.currency }
    pub fn is_negative(&self) -> bool { self.amount < Decimal::ZERO }

    pub fn add(&self, other: &Money) -> Result<Money, MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::CurrencyMismatch(self.currency.clone(), other.currency.clone()));
        }
        Ok(Money::new(self.amount + other.amount, &self.currency))
    }

    pub fn multiply(&self, qty: u32) -> Money {
        Money::new(self.amount * Decimal::from(qty), &self.currency)
    }

    /// Subtracts `value`, flooring at zero. Never goes negative.
    pub fn sub_clamped(&self, value: Decimal) -> Money {
        Money::new((self.amount - value).max(Decimal::ZERO), &self.currency)
    }

    /// Takes `percent` (0-100) off the amount, clamped to `[0, amount]`.
    pub fn percent_off(&self, percent: Decimal) -> Money {
        let factor = (Decimal::ONE - percent / Decimal::ONE_HUNDRED)
            .clamp(Decimal::ZERO, Decimal::ONE);
        Money::new(self.amount * factor, &self.currency)
    }

    /// Rounds to 2 decimal places, round-half-up.
    pub fn rounded(&self) -> Money {
        Money::new(
            self.amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
            &self.currency,
        )
    }
}

impl Default for Money {
    fn default() -> Self { Self::zero(DEFAULT_CURRENCY) }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}

#[derive(Debug, Clone)]
pub enum MoneyError { CurrencyMismatch(String, String) }
impl std::error::Error for MoneyError {}
impl fmt::Display for MoneyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CurrencyMismatch(a, b) => write!(f, "Currency mismatch: {} vs {}", a, b),
        }
    }
}

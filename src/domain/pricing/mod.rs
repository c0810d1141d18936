//! Pricing modules
//!
//! Discount resolution, delivery fee calculation and order quote aggregation.
//! All functions here are pure; candidate data is fetched by the caller.
pub mod delivery;
pub mod discount;
pub mod quote;

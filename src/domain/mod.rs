//! Domain layer
pub mod pricing;
pub mod value_objects;

//! Small, dependency-light building blocks shared by the dshop engine and its integrations.
pub mod helpers;
mod minor_units;
pub mod op;
mod secret;

pub use minor_units::{MinorUnits, MinorUnitsConversionError};
pub use secret::Secret;

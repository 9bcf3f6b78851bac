mod money;

pub mod op;
mod secret;

pub use money::{MicroUnit, MicroUnitConversionError};
pub use secret::Secret;

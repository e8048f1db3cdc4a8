mod rupees;

pub mod helpers;
pub mod op;
mod secret;

pub use rupees::{Rupees, RupeesConversionError, CURRENCY_CODE};
pub use secret::Secret;

//! Error handling foundation for speechkit.
//!
//! Only the `Result` alias lives here. Each crate owns its domain error
//! enums and wraps lower layers with `.context()` at its boundary.

use rootcause::Report;

/// A Result type alias using rootcause's Report for error handling.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;

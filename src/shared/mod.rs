pub mod errors;
pub mod json;

pub use errors::{AprError, FetchError, ScrapeError};
pub use json::null_as_default;

// Pure helpers shared by the user/tier stores and the admin tooling.

pub mod constants;
pub mod error;
pub mod ids;
pub mod types;
pub mod units;

pub use error::{UnitError, ValidationError};
pub use ids::TierId;
pub use types::{validate_tier_code, validate_username, Role};
pub use units::{format_duration, format_size, parse_duration, parse_size};

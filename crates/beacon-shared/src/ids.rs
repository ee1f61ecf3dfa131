use std::str::FromStr;

use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::constants::{TIER_ID_PREFIX, TIER_ID_RANDOM_LEN};
use crate::error::ValidationError;

/// Identifier of a tier record: `ti_` followed by random base-62 characters.
///
/// Generated once when the tier is created and never reassigned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TierId(String);

impl TierId {
    /// Generate a fresh id from the thread-local CSPRNG.
    pub fn generate() -> Self {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(TIER_ID_RANDOM_LEN)
            .map(char::from)
            .collect();
        Self(format!("{TIER_ID_PREFIX}{suffix}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TierId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// Accepts any alphanumeric suffix length so ids issued with older lengths
// still load.
impl FromStr for TierId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.strip_prefix(TIER_ID_PREFIX) {
            Some(suffix) if !suffix.is_empty() && suffix.chars().all(|c| c.is_ascii_alphanumeric()) => {
                Ok(Self(s.to_string()))
            }
            _ => Err(ValidationError::InvalidTierId(s.to_string())),
        }
    }
}

impl TryFrom<String> for TierId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TierId> for String {
    fn from(id: TierId) -> Self {
        id.0
    }
}

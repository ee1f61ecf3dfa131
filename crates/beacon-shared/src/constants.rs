/// Prefix of every generated tier identifier
pub const TIER_ID_PREFIX: &str = "ti_";

/// Number of random base-62 characters after the tier id prefix (~131 bits)
pub const TIER_ID_RANDOM_LEN: usize = 22;

/// Maximum length of usernames and tier codes
pub const MAX_KEY_LEN: usize = 64;

/// Default bcrypt cost for password hashes
pub const DEFAULT_BCRYPT_COST: u32 = 10;

/// Seconds per minute / hour / day
pub const SECS_PER_MINUTE: u64 = 60;
pub const SECS_PER_HOUR: u64 = 60 * SECS_PER_MINUTE;
pub const SECS_PER_DAY: u64 = 24 * SECS_PER_HOUR;

/// Largest quota value (bytes, seconds or count) SQLite can store
pub const MAX_QUANTITY: u64 = i64::MAX as u64;

//! Admin configuration loaded from environment variables.
//!
//! Every setting has a default, so the tool runs with zero configuration
//! against the database in the platform data directory.

use std::path::PathBuf;
use std::time::Duration;

use beacon_shared::parse_duration;
use beacon_store::StoreOptions;

/// Admin tool configuration.
#[derive(Clone)]
pub struct AdminConfig {
    /// Path of the user database.
    /// Env: `BEACON_AUTH_FILE`
    /// Default: none (platform data directory, see `Database::default_path`).
    pub auth_file: Option<PathBuf>,

    /// bcrypt cost for new password hashes.
    /// Env: `BEACON_BCRYPT_COST` (4..=31)
    /// Default: `10`
    pub bcrypt_cost: u32,

    /// How long to wait on a database locked by another writer.
    /// Env: `BEACON_BUSY_TIMEOUT` (e.g. `5s`, `1m`)
    /// Default: `5s`
    pub busy_timeout: Duration,

    /// Retries for a write that still found the database busy.
    /// Env: `BEACON_WRITE_RETRIES`
    /// Default: `3`
    pub write_retries: u32,

    /// Password for `user add` / `user change-pass`, skipping the prompt.
    /// Env: `BEACON_PASSWORD`
    pub password: Option<String>,
}

impl Default for AdminConfig {
    fn default() -> Self {
        let store = StoreOptions::default();
        Self {
            auth_file: None,
            bcrypt_cost: store.bcrypt_cost,
            busy_timeout: store.busy_timeout,
            write_retries: store.write_retries,
            password: None,
        }
    }
}

impl std::fmt::Debug for AdminConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminConfig")
            .field("auth_file", &self.auth_file)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("busy_timeout", &self.busy_timeout)
            .field("write_retries", &self.write_retries)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl AdminConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(path) = lookup("BEACON_AUTH_FILE").filter(|p| !p.is_empty()) {
            config.auth_file = Some(PathBuf::from(path));
        }

        if let Some(val) = lookup("BEACON_BCRYPT_COST") {
            match val.trim().parse::<u32>() {
                Ok(cost) if (4..=31).contains(&cost) => config.bcrypt_cost = cost,
                _ => tracing::warn!(value = %val, "Invalid BEACON_BCRYPT_COST, using default"),
            }
        }

        if let Some(val) = lookup("BEACON_BUSY_TIMEOUT") {
            match parse_duration(&val) {
                Ok(secs) => config.busy_timeout = Duration::from_secs(secs),
                Err(e) => tracing::warn!(
                    error = %e,
                    "Invalid BEACON_BUSY_TIMEOUT, using default"
                ),
            }
        }

        if let Some(val) = lookup("BEACON_WRITE_RETRIES") {
            if let Ok(n) = val.trim().parse::<u32>() {
                config.write_retries = n;
            } else {
                tracing::warn!(value = %val, "Invalid BEACON_WRITE_RETRIES, using default");
            }
        }

        if let Some(password) = lookup("BEACON_PASSWORD") {
            config.password = Some(password);
        }

        // RUST_LOG is read by tracing-subscriber's EnvFilter directly.

        config
    }

    /// Store tunables derived from this configuration.
    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            bcrypt_cost: self.bcrypt_cost,
            busy_timeout: self.busy_timeout,
            write_retries: self.write_retries,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_with(vars: &[(&str, &str)]) -> AdminConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AdminConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_config() {
        let config = config_with(&[]);
        assert_eq!(config.auth_file, None);
        assert_eq!(config.bcrypt_cost, 10);
        assert_eq!(config.busy_timeout, Duration::from_secs(5));
        assert_eq!(config.write_retries, 3);
        assert_eq!(config.password, None);
    }

    #[test]
    fn test_overrides() {
        let config = config_with(&[
            ("BEACON_AUTH_FILE", "/var/lib/beacon/user.db"),
            ("BEACON_BCRYPT_COST", "12"),
            ("BEACON_BUSY_TIMEOUT", "1m30s"),
            ("BEACON_WRITE_RETRIES", "0"),
            ("BEACON_PASSWORD", "mypass"),
        ]);
        assert_eq!(
            config.auth_file,
            Some(PathBuf::from("/var/lib/beacon/user.db"))
        );

        let options = config.store_options();
        assert_eq!(options.bcrypt_cost, 12);
        assert_eq!(options.busy_timeout, Duration::from_secs(90));
        assert_eq!(options.write_retries, 0);
        assert_eq!(config.password.as_deref(), Some("mypass"));
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = config_with(&[
            ("BEACON_BCRYPT_COST", "3"),
            ("BEACON_BUSY_TIMEOUT", "soon"),
            ("BEACON_WRITE_RETRIES", "-1"),
        ]);
        assert_eq!(config.bcrypt_cost, 10);
        assert_eq!(config.busy_timeout, Duration::from_secs(5));
        assert_eq!(config.write_retries, 3);
    }

    #[test]
    fn test_debug_hides_password() {
        let config = config_with(&[("BEACON_PASSWORD", "mypass")]);
        let debug = format!("{config:?}");
        assert!(!debug.contains("mypass"));
        assert!(debug.contains("<redacted>"));
    }
}

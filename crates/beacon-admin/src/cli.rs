//! Command-line arguments.

use std::path::PathBuf;

use beacon_shared::constants::MAX_QUANTITY;
use beacon_shared::{parse_duration, parse_size, Role};
use clap::{Args, Parser, Subcommand};

/// `beacon-admin` command arguments.
#[derive(Debug, Parser)]
#[command(
    name = "beacon-admin",
    about = "Manage users and tiers of a Beacon notification server",
    version
)]
pub struct Cli {
    /// Path of the user database. Falls back to `BEACON_AUTH_FILE`.
    #[arg(long = "auth-file", value_name = "path", global = true)]
    pub auth_file: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `warn,beacon_store=debug`. Wins over `RUST_LOG`.
    #[arg(long = "log-level", value_name = "level", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Add, remove and change users
    User {
        #[command(subcommand)]
        command: UserCommand,
    },
    /// Add, change and remove subscription tiers
    Tier {
        #[command(subcommand)]
        command: TierCommand,
    },
}

#[derive(Debug, Subcommand)]
pub enum UserCommand {
    /// Add a user; the password is prompted for twice
    Add {
        /// Role of the new user.
        #[arg(long, value_name = "user|admin", default_value_t = Role::User)]
        role: Role,
        username: String,
    },
    /// Show all users
    List,
    /// Delete a user
    #[command(alias = "remove")]
    Del { username: String },
    /// Change the password of a user
    ChangePass { username: String },
    /// Change the role of a user
    ChangeRole {
        username: String,
        #[arg(value_name = "user|admin")]
        role: Role,
    },
    /// Assign a tier to a user, or `none` to remove it
    ChangeTier {
        username: String,
        #[arg(value_name = "tier|none")]
        tier: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum TierCommand {
    /// Create a tier; unset limits start at zero
    Add {
        #[command(flatten)]
        flags: TierFlags,
        code: String,
    },
    /// Change the name, limits or prices of a tier
    Change {
        #[command(flatten)]
        flags: TierFlags,
        code: String,
    },
    /// Delete a tier; users on it are left without a tier
    #[command(alias = "del")]
    Remove { code: String },
    /// Show all tiers
    List,
}

/// Tier fields settable on `tier add` and `tier change`.
#[derive(Debug, Clone, Default, Args)]
pub struct TierFlags {
    /// Display name (defaults to the code on `add`).
    #[arg(long, value_name = "name")]
    pub name: Option<String>,

    /// Daily message limit.
    #[arg(long, value_name = "count", value_parser = clap::value_parser!(u64).range(..=MAX_QUANTITY))]
    pub message_limit: Option<u64>,

    /// How long messages are kept, e.g. `12h` or `2d`.
    #[arg(long, value_name = "duration", value_parser = parse_duration)]
    pub message_expiry_duration: Option<u64>,

    /// Daily email limit.
    #[arg(long, value_name = "count", value_parser = clap::value_parser!(u64).range(..=MAX_QUANTITY))]
    pub email_limit: Option<u64>,

    /// Number of topic reservations.
    #[arg(long, value_name = "count", value_parser = clap::value_parser!(u64).range(..=MAX_QUANTITY))]
    pub reservation_limit: Option<u64>,

    /// Per-file attachment size limit, e.g. `15m`.
    #[arg(long, value_name = "size", value_parser = parse_size)]
    pub attachment_file_size_limit: Option<u64>,

    /// How long attachments are kept, e.g. `3h`.
    #[arg(long, value_name = "duration", value_parser = parse_duration)]
    pub attachment_expiry_duration: Option<u64>,

    /// Total attachment storage per user, e.g. `1g`.
    #[arg(long, value_name = "size", value_parser = parse_size)]
    pub attachment_total_size_limit: Option<u64>,

    /// Daily attachment download bandwidth, e.g. `5g`.
    #[arg(long, value_name = "size", value_parser = parse_size)]
    pub attachment_bandwidth_limit: Option<u64>,

    /// Billing price id of the monthly plan.
    #[arg(long, value_name = "id")]
    pub stripe_monthly_price_id: Option<String>,

    /// Billing price id of the yearly plan.
    #[arg(long, value_name = "id")]
    pub stripe_yearly_price_id: Option<String>,
}

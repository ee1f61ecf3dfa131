//! Records persisted in the user database.
//!
//! Every struct derives `Serialize` and `Deserialize` so the service can hand
//! them to its API layer unchanged.

use beacon_shared::constants::MAX_QUANTITY;
use beacon_shared::{validate_tier_code, Role, TierId, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// A user account. The password hash is persisted but never loaded into
/// this struct.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    /// Unique, immutable login name.
    pub username: String,
    pub role: Role,
    /// Code of the assigned tier, if any.
    pub tier: Option<String>,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Tier
// ---------------------------------------------------------------------------

/// Quotas attached to a tier. Durations are seconds, sizes are bytes.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TierLimits {
    pub message_limit: u64,
    pub message_expiry_duration: u64,
    pub email_limit: u64,
    pub reservation_limit: u64,
    pub attachment_file_size_limit: u64,
    pub attachment_total_size_limit: u64,
    pub attachment_expiry_duration: u64,
    pub attachment_bandwidth_limit: u64,
}

impl TierLimits {
    /// Every limit must fit a signed 64-bit SQLite integer.
    pub(crate) fn validate(&self) -> Result<(), ValidationError> {
        validate_limit("message_limit", Some(self.message_limit))?;
        validate_limit("message_expiry_duration", Some(self.message_expiry_duration))?;
        validate_limit("email_limit", Some(self.email_limit))?;
        validate_limit("reservation_limit", Some(self.reservation_limit))?;
        validate_limit("attachment_file_size_limit", Some(self.attachment_file_size_limit))?;
        validate_limit("attachment_total_size_limit", Some(self.attachment_total_size_limit))?;
        validate_limit("attachment_expiry_duration", Some(self.attachment_expiry_duration))?;
        validate_limit("attachment_bandwidth_limit", Some(self.attachment_bandwidth_limit))
    }
}

/// A subscription plan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tier {
    /// Generated at creation, never reassigned.
    pub id: TierId,
    /// Unique lookup key chosen by the administrator, e.g. `pro`.
    pub code: String,
    /// Display name.
    pub name: String,
    pub limits: TierLimits,
    pub stripe_monthly_price_id: Option<String>,
    pub stripe_yearly_price_id: Option<String>,
}

/// Input for [`Database::add_tier`](crate::Database::add_tier).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTier {
    pub code: String,
    pub name: String,
    pub limits: TierLimits,
    pub stripe_monthly_price_id: Option<String>,
    pub stripe_yearly_price_id: Option<String>,
}

impl NewTier {
    /// A tier with all limits at zero and no prices.
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    pub(crate) fn validate(&self) -> Result<(), ValidationError> {
        validate_tier_code(&self.code)?;
        self.limits.validate()?;
        validate_price_id(self.stripe_monthly_price_id.as_deref())?;
        validate_price_id(self.stripe_yearly_price_id.as_deref())
    }
}

/// Partial update for [`Database::change_tier`](crate::Database::change_tier).
///
/// `None` leaves the stored value alone; `Some(0)` sets a limit to zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TierChange {
    pub name: Option<String>,
    pub message_limit: Option<u64>,
    pub message_expiry_duration: Option<u64>,
    pub email_limit: Option<u64>,
    pub reservation_limit: Option<u64>,
    pub attachment_file_size_limit: Option<u64>,
    pub attachment_total_size_limit: Option<u64>,
    pub attachment_expiry_duration: Option<u64>,
    pub attachment_bandwidth_limit: Option<u64>,
    pub stripe_monthly_price_id: Option<String>,
    pub stripe_yearly_price_id: Option<String>,
}

impl TierChange {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub(crate) fn validate(&self) -> Result<(), ValidationError> {
        validate_limit("message_limit", self.message_limit)?;
        validate_limit("message_expiry_duration", self.message_expiry_duration)?;
        validate_limit("email_limit", self.email_limit)?;
        validate_limit("reservation_limit", self.reservation_limit)?;
        validate_limit("attachment_file_size_limit", self.attachment_file_size_limit)?;
        validate_limit("attachment_total_size_limit", self.attachment_total_size_limit)?;
        validate_limit("attachment_expiry_duration", self.attachment_expiry_duration)?;
        validate_limit("attachment_bandwidth_limit", self.attachment_bandwidth_limit)?;
        validate_price_id(self.stripe_monthly_price_id.as_deref())?;
        validate_price_id(self.stripe_yearly_price_id.as_deref())
    }

    /// Merge the supplied fields into `tier`.
    pub(crate) fn apply_to(&self, tier: &mut Tier) {
        fn merge<T: Clone>(target: &mut T, value: &Option<T>) {
            if let Some(value) = value {
                *target = value.clone();
            }
        }

        merge(&mut tier.name, &self.name);

        let limits = &mut tier.limits;
        merge(&mut limits.message_limit, &self.message_limit);
        merge(&mut limits.message_expiry_duration, &self.message_expiry_duration);
        merge(&mut limits.email_limit, &self.email_limit);
        merge(&mut limits.reservation_limit, &self.reservation_limit);
        merge(&mut limits.attachment_file_size_limit, &self.attachment_file_size_limit);
        merge(&mut limits.attachment_total_size_limit, &self.attachment_total_size_limit);
        merge(&mut limits.attachment_expiry_duration, &self.attachment_expiry_duration);
        merge(&mut limits.attachment_bandwidth_limit, &self.attachment_bandwidth_limit);

        if self.stripe_monthly_price_id.is_some() {
            tier.stripe_monthly_price_id = self.stripe_monthly_price_id.clone();
        }
        if self.stripe_yearly_price_id.is_some() {
            tier.stripe_yearly_price_id = self.stripe_yearly_price_id.clone();
        }
    }
}

fn validate_limit(field: &'static str, value: Option<u64>) -> Result<(), ValidationError> {
    match value {
        Some(value) if value > MAX_QUANTITY => Err(ValidationError::LimitOutOfRange {
            field,
            value,
            max: MAX_QUANTITY,
        }),
        _ => Ok(()),
    }
}

fn validate_price_id(price_id: Option<&str>) -> Result<(), ValidationError> {
    match price_id {
        Some(id) if id.trim().is_empty() => Err(ValidationError::EmptyPriceId),
        _ => Ok(()),
    }
}

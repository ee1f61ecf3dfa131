//! CRUD operations for [`Tier`] records.

use beacon_shared::TierId;
use chrono::Utc;
use rusqlite::{params, OptionalExtension, Transaction};
use tracing::{debug, info};

use crate::database::Database;
use crate::error::{Entity, Result, StoreError};
use crate::models::{NewTier, Tier, TierChange, TierLimits};

const TIER_COLUMNS: &str = "id, code, name,
     message_limit, message_expiry_duration, email_limit, reservation_limit,
     attachment_file_size_limit, attachment_total_size_limit,
     attachment_expiry_duration, attachment_bandwidth_limit,
     stripe_monthly_price_id, stripe_yearly_price_id";

/// Fresh ids drawn before giving up on a collision streak.
const MAX_ID_ATTEMPTS: u32 = 8;

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Create a tier under a freshly issued id.
    ///
    /// Fails with `AlreadyExists` if the code is taken. Limits not set on
    /// `new` are stored as zero.
    pub fn add_tier(&self, new: &NewTier) -> Result<Tier> {
        new.validate()?;

        let tier = self.write(|tx| {
            if select_tier(tx, &new.code)?.is_some() {
                return Err(StoreError::already_exists(Entity::Tier, &new.code));
            }

            let tier = Tier {
                id: issue_tier_id(tx)?,
                code: new.code.clone(),
                name: new.name.clone(),
                limits: new.limits,
                stripe_monthly_price_id: new.stripe_monthly_price_id.clone(),
                stripe_yearly_price_id: new.stripe_yearly_price_id.clone(),
            };
            let l = &tier.limits;
            tx.execute(
                &format!("INSERT INTO tiers ({TIER_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"),
                params![
                    tier.id.as_str(),
                    tier.code,
                    tier.name,
                    l.message_limit,
                    l.message_expiry_duration,
                    l.email_limit,
                    l.reservation_limit,
                    l.attachment_file_size_limit,
                    l.attachment_total_size_limit,
                    l.attachment_expiry_duration,
                    l.attachment_bandwidth_limit,
                    tier.stripe_monthly_price_id,
                    tier.stripe_yearly_price_id,
                ],
            )
            .map_err(|e| StoreError::from_insert(e, Entity::Tier, &new.code))?;
            Ok(tier)
        })?;

        info!(code = %tier.code, id = %tier.id, "tier added");
        Ok(tier)
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch a single tier by code.
    pub fn get_tier(&self, code: &str) -> Result<Tier> {
        self.conn()?
            .query_row(
                &format!("SELECT {TIER_COLUMNS} FROM tiers WHERE code = ?1"),
                params![code],
                row_to_tier,
            )
            .optional()?
            .ok_or_else(|| StoreError::not_found(Entity::Tier, code))
    }

    /// List all tiers, ordered by code.
    pub fn list_tiers(&self) -> Result<Vec<Tier>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {TIER_COLUMNS} FROM tiers ORDER BY code ASC"
        ))?;
        let rows = stmt.query_map([], row_to_tier)?;

        let mut tiers = Vec::new();
        for row in rows {
            tiers.push(row?);
        }
        Ok(tiers)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Merge `change` into the tier with this code and return the result.
    ///
    /// The id and code never change.
    pub fn change_tier(&self, code: &str, change: &TierChange) -> Result<Tier> {
        change.validate()?;

        let tier = self.write(|tx| {
            let mut tier =
                select_tier(tx, code)?.ok_or_else(|| StoreError::not_found(Entity::Tier, code))?;
            change.apply_to(&mut tier);

            let l = &tier.limits;
            tx.execute(
                "UPDATE tiers SET
                    name = ?2,
                    message_limit = ?3,
                    message_expiry_duration = ?4,
                    email_limit = ?5,
                    reservation_limit = ?6,
                    attachment_file_size_limit = ?7,
                    attachment_total_size_limit = ?8,
                    attachment_expiry_duration = ?9,
                    attachment_bandwidth_limit = ?10,
                    stripe_monthly_price_id = ?11,
                    stripe_yearly_price_id = ?12
                 WHERE id = ?1",
                params![
                    tier.id.as_str(),
                    tier.name,
                    l.message_limit,
                    l.message_expiry_duration,
                    l.email_limit,
                    l.reservation_limit,
                    l.attachment_file_size_limit,
                    l.attachment_total_size_limit,
                    l.attachment_expiry_duration,
                    l.attachment_bandwidth_limit,
                    tier.stripe_monthly_price_id,
                    tier.stripe_yearly_price_id,
                ],
            )?;
            Ok(tier)
        })?;

        info!(code, "tier updated");
        Ok(tier)
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Delete a tier. Users assigned to it are left without a tier.
    pub fn remove_tier(&self, code: &str) -> Result<()> {
        let deleted = self.write(|tx| {
            Ok(tx.execute("DELETE FROM tiers WHERE code = ?1", params![code])?)
        })?;
        if deleted == 0 {
            return Err(StoreError::not_found(Entity::Tier, code));
        }

        info!(code, "tier removed");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn select_tier(tx: &Transaction<'_>, code: &str) -> Result<Option<Tier>> {
    Ok(tx
        .query_row(
            &format!("SELECT {TIER_COLUMNS} FROM tiers WHERE code = ?1"),
            params![code],
            row_to_tier,
        )
        .optional()?)
}

/// Draw a new id and record it in the ledger. An id already in the ledger
/// (even one whose tier is gone) is never handed out again.
fn issue_tier_id(tx: &Transaction<'_>) -> Result<TierId> {
    for attempt in 1..=MAX_ID_ATTEMPTS {
        let id = TierId::generate();
        let inserted = tx.execute(
            "INSERT OR IGNORE INTO tier_ids (id, issued_at) VALUES (?1, ?2)",
            params![id.as_str(), Utc::now().to_rfc3339()],
        )?;
        if inserted == 1 {
            return Ok(id);
        }
        debug!(attempt, "tier id collision, drawing again");
    }
    Err(StoreError::IdExhausted {
        attempts: MAX_ID_ATTEMPTS,
    })
}

/// Map a `rusqlite::Row` to a [`Tier`].
fn row_to_tier(row: &rusqlite::Row<'_>) -> rusqlite::Result<Tier> {
    let id_str: String = row.get(0)?;
    let id = id_str.parse::<TierId>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(Tier {
        id,
        code: row.get(1)?,
        name: row.get(2)?,
        limits: TierLimits {
            message_limit: row.get(3)?,
            message_expiry_duration: row.get(4)?,
            email_limit: row.get(5)?,
            reservation_limit: row.get(6)?,
            attachment_file_size_limit: row.get(7)?,
            attachment_total_size_limit: row.get(8)?,
            attachment_expiry_duration: row.get(9)?,
            attachment_bandwidth_limit: row.get(10)?,
        },
        stripe_monthly_price_id: row.get(11)?,
        stripe_yearly_price_id: row.get(12)?,
    })
}

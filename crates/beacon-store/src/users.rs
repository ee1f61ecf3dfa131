//! CRUD operations for [`User`] records.

use std::str::FromStr;

use beacon_shared::{validate_username, Role};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use tracing::{debug, info};

use crate::database::Database;
use crate::error::{Entity, Result, StoreError};
use crate::models::User;
use crate::password;

const SELECT_USER: &str = "SELECT u.username, u.role, t.code, u.created_at
     FROM users u
     LEFT JOIN tiers t ON t.id = u.tier_id";

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Add a user with a bcrypt-hashed password.
    ///
    /// Fails with `AlreadyExists` if the username is taken.
    pub fn add_user(&self, username: &str, password: &str, role: Role) -> Result<User> {
        validate_username(username)?;
        let hash = password::hash_password(password, self.options().bcrypt_cost)?;
        let created_at = Utc::now();

        self.write(|tx| {
            let taken = tx
                .query_row(
                    "SELECT 1 FROM users WHERE username = ?1",
                    params![username],
                    |_| Ok(()),
                )
                .optional()?
                .is_some();
            if taken {
                return Err(StoreError::already_exists(Entity::User, username));
            }

            tx.execute(
                "INSERT INTO users (username, password_hash, role, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![username, hash, role.as_str(), created_at.to_rfc3339()],
            )
            .map_err(|e| StoreError::from_insert(e, Entity::User, username))?;
            Ok(())
        })?;

        info!(username, %role, "user added");

        Ok(User {
            username: username.to_string(),
            role,
            tier: None,
            created_at,
        })
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch a single user by name.
    pub fn get_user(&self, username: &str) -> Result<User> {
        let sql = format!("{SELECT_USER} WHERE u.username = ?1");
        self.conn()?
            .query_row(&sql, params![username], row_to_user)
            .optional()?
            .ok_or_else(|| StoreError::not_found(Entity::User, username))
    }

    /// List all users, ordered by username.
    pub fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!("{SELECT_USER} ORDER BY u.username ASC"))?;
        let rows = stmt.query_map([], row_to_user)?;

        let mut users = Vec::new();
        for row in rows {
            users.push(row?);
        }
        Ok(users)
    }

    /// Check a login.
    ///
    /// Unknown users and wrong passwords both return `Ok(false)`, and both
    /// cost one bcrypt verification at the cost of the stored hashes, so the
    /// two cannot be told apart by timing either.
    pub fn verify_password(&self, username: &str, password: &str) -> Result<bool> {
        let (stored, newest) = {
            let conn = self.conn()?;
            let stored: Option<String> = conn
                .query_row(
                    "SELECT password_hash FROM users WHERE username = ?1",
                    params![username],
                    |row| row.get(0),
                )
                .optional()?;
            let newest: Option<String> = match stored {
                Some(_) => None,
                None => conn
                    .query_row(
                        "SELECT password_hash FROM users ORDER BY rowid DESC LIMIT 1",
                        [],
                        |row| row.get(0),
                    )
                    .optional()?,
            };
            (stored, newest)
        };

        let matches = match &stored {
            Some(hash) => password::check_password(password, hash)?,
            None => {
                let cost = newest
                    .as_deref()
                    .and_then(password::hash_cost)
                    .unwrap_or(self.options().bcrypt_cost);
                password::check_password(password, &self.dummy_hash(cost)?)?;
                false
            }
        };

        debug!(username, matches, "password verification");
        Ok(matches)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Replace the password hash of an existing user.
    pub fn change_password(&self, username: &str, password: &str) -> Result<()> {
        let hash = password::hash_password(password, self.options().bcrypt_cost)?;

        let updated = self.write(|tx| {
            Ok(tx.execute(
                "UPDATE users SET password_hash = ?1 WHERE username = ?2",
                params![hash, username],
            )?)
        })?;
        if updated == 0 {
            return Err(StoreError::not_found(Entity::User, username));
        }

        info!(username, "user password changed");
        Ok(())
    }

    /// Set the role of an existing user.
    pub fn change_role(&self, username: &str, role: Role) -> Result<()> {
        let updated = self.write(|tx| {
            Ok(tx.execute(
                "UPDATE users SET role = ?1 WHERE username = ?2",
                params![role.as_str(), username],
            )?)
        })?;
        if updated == 0 {
            return Err(StoreError::not_found(Entity::User, username));
        }

        info!(username, %role, "user role changed");
        Ok(())
    }

    /// Assign a tier (by code) to a user, or clear it with `None`.
    pub fn change_user_tier(&self, username: &str, tier_code: Option<&str>) -> Result<()> {
        self.write(|tx| {
            let tier_id: Option<String> = match tier_code {
                Some(code) => Some(
                    tx.query_row(
                        "SELECT id FROM tiers WHERE code = ?1",
                        params![code],
                        |row| row.get(0),
                    )
                    .optional()?
                    .ok_or_else(|| StoreError::not_found(Entity::Tier, code))?,
                ),
                None => None,
            };

            let updated = tx.execute(
                "UPDATE users SET tier_id = ?1 WHERE username = ?2",
                params![tier_id, username],
            )?;
            if updated == 0 {
                return Err(StoreError::not_found(Entity::User, username));
            }
            Ok(())
        })?;

        info!(username, tier = tier_code.unwrap_or("none"), "user tier changed");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Delete a user irrevocably.
    pub fn delete_user(&self, username: &str) -> Result<()> {
        let deleted = self.write(|tx| {
            Ok(tx.execute("DELETE FROM users WHERE username = ?1", params![username])?)
        })?;
        if deleted == 0 {
            return Err(StoreError::not_found(Entity::User, username));
        }

        info!(username, "user removed");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to a [`User`].
fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    let username: String = row.get(0)?;
    let role_str: String = row.get(1)?;
    let tier: Option<String> = row.get(2)?;
    let created_str: String = row.get(3)?;

    let role = Role::from_str(&role_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let created_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&created_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(User {
        username,
        role,
        tier,
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Barrier};

    use super::*;
    use crate::database::tests::test_options;
    use crate::database::StoreOptions;
    use crate::models::NewTier;

    fn open() -> Database {
        Database::open_in_memory(test_options()).unwrap()
    }

    #[test]
    fn test_add_and_get_user() {
        let db = open();
        let added = db.add_user("phil", "mypass", Role::User).unwrap();
        assert_eq!(added.role, Role::User);

        let user = db.get_user("phil").unwrap();
        assert_eq!(user.username, "phil");
        assert_eq!(user.role, Role::User);
        assert_eq!(user.tier, None);
        assert!(db.verify_password("phil", "mypass").unwrap());
    }

    #[test]
    fn test_add_admin() {
        let db = open();
        db.add_user("phil", "mypass", Role::Admin).unwrap();
        assert_eq!(db.get_user("phil").unwrap().role, Role::Admin);
    }

    #[test]
    fn test_add_twice_keeps_first() {
        let db = open();
        db.add_user("phil", "mypass", Role::User).unwrap();

        let err = db.add_user("phil", "otherpass", Role::Admin).unwrap_err();
        assert!(matches!(
            err,
            StoreError::AlreadyExists { entity: Entity::User, ref key } if key == "phil"
        ));
        assert_eq!(err.to_string(), "user phil already exists");

        let user = db.get_user("phil").unwrap();
        assert_eq!(user.role, Role::User);
        assert!(db.verify_password("phil", "mypass").unwrap());
        assert!(!db.verify_password("phil", "otherpass").unwrap());
    }

    #[test]
    fn test_invalid_username_rejected() {
        let db = open();
        assert!(matches!(
            db.add_user("phil b", "mypass", Role::User),
            Err(StoreError::Validation(_))
        ));
        assert!(db.list_users().unwrap().is_empty());
    }

    #[test]
    fn test_password_not_stored_in_plaintext() {
        let db = open();
        db.add_user("phil", "mypass", Role::User).unwrap();
        let hash: String = db
            .conn()
            .unwrap()
            .query_row(
                "SELECT password_hash FROM users WHERE username = 'phil'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert!(hash.starts_with("$2b$"));
        assert!(!hash.contains("mypass"));
    }

    #[test]
    fn test_change_password() {
        let db = open();
        db.add_user("phil", "mypass", Role::User).unwrap();
        db.change_password("phil", "newpass").unwrap();

        assert!(db.verify_password("phil", "newpass").unwrap());
        assert!(!db.verify_password("phil", "mypass").unwrap());

        assert!(matches!(
            db.change_password("ghost", "newpass"),
            Err(StoreError::NotFound { entity: Entity::User, .. })
        ));
    }

    #[test]
    fn test_change_role() {
        let db = open();
        db.add_user("phil", "mypass", Role::User).unwrap();
        db.change_role("phil", Role::Admin).unwrap();
        assert_eq!(db.get_user("phil").unwrap().role, Role::Admin);

        let err = db.change_role("ghost", Role::Admin).unwrap_err();
        assert_eq!(err.to_string(), "user ghost does not exist");
    }

    #[test]
    fn test_verify_unknown_user_is_false() {
        let db = open();
        db.add_user("phil", "mypass", Role::User).unwrap();
        assert!(!db.verify_password("ghost", "mypass").unwrap());
        assert!(!db.verify_password("phil", "wrong").unwrap());
    }

    #[test]
    fn test_unknown_user_checked_at_stored_cost() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user.db");
        let db = Database::open_at(&path, test_options()).unwrap();
        db.add_user("phil", "mypass", Role::User).unwrap();
        drop(db);

        // Reopened with a different cost than the stored hash
        let options = StoreOptions {
            bcrypt_cost: 5,
            ..test_options()
        };
        let db = Database::open_at(&path, options).unwrap();
        assert_eq!(db.dummy_costs(), [5]);

        assert!(!db.verify_password("ghost", "mypass").unwrap());
        assert_eq!(db.dummy_costs(), [4, 5]);
        assert!(db.verify_password("phil", "mypass").unwrap());
    }

    #[test]
    fn test_delete_user() {
        let db = open();
        db.add_user("phil", "mypass", Role::User).unwrap();
        db.delete_user("phil").unwrap();

        assert!(matches!(
            db.get_user("phil"),
            Err(StoreError::NotFound { .. })
        ));
        let err = db.delete_user("phil").unwrap_err();
        assert_eq!(err.to_string(), "user phil does not exist");
        assert!(!db.verify_password("phil", "mypass").unwrap());

        // Re-adding after delete takes the new values
        db.add_user("phil", "newpass", Role::Admin).unwrap();
        assert_eq!(db.get_user("phil").unwrap().role, Role::Admin);
        assert!(db.verify_password("phil", "newpass").unwrap());
    }

    #[test]
    fn test_list_users_sorted() {
        let db = open();
        for name in ["zoe", "ben", "mia"] {
            db.add_user(name, "pass", Role::User).unwrap();
        }
        let names: Vec<_> = db
            .list_users()
            .unwrap()
            .into_iter()
            .map(|u| u.username)
            .collect();
        assert_eq!(names, ["ben", "mia", "zoe"]);
    }

    #[test]
    fn test_change_user_tier() {
        let db = open();
        db.add_user("phil", "mypass", Role::User).unwrap();
        db.add_tier(&NewTier::new("pro", "Pro")).unwrap();

        db.change_user_tier("phil", Some("pro")).unwrap();
        assert_eq!(db.get_user("phil").unwrap().tier.as_deref(), Some("pro"));

        assert!(matches!(
            db.change_user_tier("phil", Some("gold")),
            Err(StoreError::NotFound { entity: Entity::Tier, .. })
        ));
        assert!(matches!(
            db.change_user_tier("ghost", Some("pro")),
            Err(StoreError::NotFound { entity: Entity::User, .. })
        ));

        db.change_user_tier("phil", None).unwrap();
        assert_eq!(db.get_user("phil").unwrap().tier, None);
    }

    #[test]
    fn test_removing_tier_clears_assignment() {
        let db = open();
        db.add_user("phil", "mypass", Role::User).unwrap();
        db.add_tier(&NewTier::new("pro", "Pro")).unwrap();
        db.change_user_tier("phil", Some("pro")).unwrap();

        db.remove_tier("pro").unwrap();
        assert_eq!(db.get_user("phil").unwrap().tier, None);
    }

    #[test]
    fn test_concurrent_add_same_user() {
        let db = Arc::new(open());
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let db = Arc::clone(&db);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    db.add_user("phil", &format!("pass{i}"), Role::User)
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let ok = results.iter().filter(|r| r.is_ok()).count();
        let exists = results
            .iter()
            .filter(|r| matches!(r, Err(StoreError::AlreadyExists { .. })))
            .count();
        assert_eq!(ok, 1);
        assert_eq!(exists, 7);
        assert_eq!(db.list_users().unwrap().len(), 1);
    }

    #[test]
    fn test_concurrent_add_from_separate_handles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user.db");
        // Create the schema once so both handles start from the same file.
        drop(Database::open_at(&path, test_options()).unwrap());

        let barrier = Arc::new(Barrier::new(2));
        let handles: Vec<_> = (0..2)
            .map(|_| {
                let path = path.clone();
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    let db = Database::open_at(&path, test_options()).unwrap();
                    barrier.wait();
                    db.add_user("phil", "mypass", Role::User)
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(StoreError::AlreadyExists { .. }))));
    }
}

//! v002 -- Tier assignment for users and the tier id ledger.

use rusqlite::Connection;

const UP_SQL: &str = r#"
-- Removing a tier drops users back to no tier
ALTER TABLE users ADD COLUMN tier_id TEXT REFERENCES tiers(id) ON DELETE SET NULL;

CREATE INDEX IF NOT EXISTS idx_users_tier_id ON users(tier_id);

-- Every tier id ever issued; rows are never deleted so ids are not reused
CREATE TABLE IF NOT EXISTS tier_ids (
    id        TEXT PRIMARY KEY NOT NULL,
    issued_at TEXT NOT NULL                     -- ISO-8601
);

INSERT OR IGNORE INTO tier_ids (id, issued_at)
    SELECT id, strftime('%Y-%m-%dT%H:%M:%SZ', 'now') FROM tiers;
"#;

pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}

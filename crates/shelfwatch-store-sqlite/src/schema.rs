//! SQL schema for the shelfwatch SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- The active set.
CREATE TABLE IF NOT EXISTS items (
    id               INTEGER PRIMARY KEY,
    package_key      TEXT NOT NULL UNIQUE,
    status           TEXT NOT NULL DEFAULT 'unknown', -- 'unknown' | 'ready' | 'banned'
    release_date     TEXT,                            -- YYYY-MM-DD
    not_found_since  TEXT,                            -- YYYY-MM-DD
    developer        TEXT
);

-- Cold storage for items banned past the staleness threshold.
CREATE TABLE IF NOT EXISTS archived_items (
    id               INTEGER PRIMARY KEY,
    package_key      TEXT NOT NULL,
    status           TEXT NOT NULL,
    release_date     TEXT,
    not_found_since  TEXT,
    developer        TEXT,
    last_checked     TEXT NOT NULL
);

-- Append-only change history. Identity keys are not UNIQUE here: duplicate
-- rows left by interrupted runs are removed by the dedup pass instead.
CREATE TABLE IF NOT EXISTS change_log (
    seq          INTEGER PRIMARY KEY AUTOINCREMENT,
    date         TEXT NOT NULL,
    kind         TEXT NOT NULL,
    item_id      INTEGER NOT NULL,
    package_key  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS change_log_item_idx ON change_log(item_id);

PRAGMA user_version = 1;
";

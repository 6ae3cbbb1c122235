//! SQL migration definitions for the octochat database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a set of SQL statements executed as one batch.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: bots, response_tables, response_entries",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version   INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- One status row per derived bot name
CREATE TABLE IF NOT EXISTS bots (
    name       TEXT PRIMARY KEY,
    stage      TEXT NOT NULL,
    faq_url    TEXT NOT NULL DEFAULT '',
    updated_at TEXT NOT NULL
);

-- Logical response tables, one per bot ("{bot}_intents")
CREATE TABLE IF NOT EXISTS response_tables (
    name       TEXT PRIMARY KEY,
    status     TEXT NOT NULL,
    created_at TEXT NOT NULL
);

-- Intent -> canned response, keyed by (intent, version) within a table
CREATE TABLE IF NOT EXISTS response_entries (
    table_name TEXT NOT NULL REFERENCES response_tables(name) ON DELETE CASCADE,
    intent     TEXT NOT NULL,
    version    TEXT NOT NULL,
    response   TEXT NOT NULL,
    PRIMARY KEY (table_name, intent, version)
);

CREATE INDEX IF NOT EXISTS idx_response_entries_table ON response_entries(table_name);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}

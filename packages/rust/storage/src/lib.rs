//! Turso Embedded / libSQL storage layer (offline mode).
//!
//! The [`Storage`] struct wraps a libSQL database holding the per-bot status
//! rows and the per-bot response tables. On top of the raw store sit the two
//! managers the pipeline talks to: [`ResponseStore`] and [`StatusTracker`].
//!
//! **Access rules:**
//! - Pipeline (CLI `build` / `delete`): read-write via [`Storage::open`]
//! - Runtime responder: read-only via [`Storage::open_readonly`]

mod migrations;
mod repository;
mod response_store;
mod status_tracker;

use std::path::Path;

use chrono::Utc;
use libsql::{Connection, Database, Row, params};
use octochat_shared::{
    BotRecord, OctochatError, ResponseEntry, Result, Stage, TableStatus,
};

pub use repository::{MAX_BATCH_WRITE, ResponseTables, StatusRecords};
pub use response_store::ResponseStore;
pub use status_tracker::StatusTracker;

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| OctochatError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(db_err)?;

        let conn = db.connect().map_err(db_err)?;

        let storage = Self {
            db,
            conn,
            readonly: false,
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open a database at `path` in read-only mode (for the runtime responder).
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(db_err)?;

        let conn = db.connect().map_err(db_err)?;

        Ok(Self {
            db,
            conn,
            readonly: true,
        })
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        OctochatError::Storage(format!(
                            "migration v{} failed: {e}",
                            migration.version
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    /// Ensure we're in read-write mode before writing.
    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(OctochatError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    async fn table_status(&self, table: &str) -> Result<Option<TableStatus>> {
        let mut rows = self
            .conn
            .query(
                "SELECT status FROM response_tables WHERE name = ?1",
                params![table],
            )
            .await
            .map_err(db_err)?;

        match rows.next().await.map_err(db_err)? {
            Some(row) => {
                let status: String = row.get(0).map_err(db_err)?;
                Ok(Some(parse_table_status(&status)?))
            }
            None => Ok(None),
        }
    }

    async fn require_table(&self, table: &str) -> Result<()> {
        match self.table_status(table).await? {
            Some(_) => Ok(()),
            None => Err(OctochatError::not_found(format!("response table {table}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Response tables
// ---------------------------------------------------------------------------

impl ResponseTables for Storage {
    async fn create_table(&self, table: &str) -> Result<()> {
        self.check_writable()?;
        let now = Utc::now().to_rfc3339();
        // Local tables are usable as soon as the row exists.
        let inserted = self
            .conn
            .execute(
                "INSERT INTO response_tables (name, status, created_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(name) DO NOTHING",
                params![table, table_status_str(TableStatus::Active), now.as_str()],
            )
            .await
            .map_err(db_err)?;

        if inserted == 0 {
            return Err(OctochatError::already_exists(format!("response table {table}")));
        }
        tracing::debug!(table, "response table created");
        Ok(())
    }

    async fn describe_table(&self, table: &str) -> Result<TableStatus> {
        self.table_status(table)
            .await?
            .ok_or_else(|| OctochatError::not_found(format!("response table {table}")))
    }

    async fn batch_write(&self, table: &str, entries: &[ResponseEntry]) -> Result<()> {
        self.check_writable()?;
        if entries.len() > MAX_BATCH_WRITE {
            return Err(OctochatError::validation(format!(
                "batch of {} entries exceeds the limit of {MAX_BATCH_WRITE}",
                entries.len()
            )));
        }
        self.require_table(table).await?;

        let tx = self.conn.transaction().await.map_err(db_err)?;
        for entry in entries {
            tx.execute(
                "INSERT INTO response_entries (table_name, intent, version, response)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(table_name, intent, version) DO UPDATE SET
                   response = excluded.response",
                params![
                    table,
                    entry.intent.as_str(),
                    entry.version.as_str(),
                    entry.response.as_str()
                ],
            )
            .await
            .map_err(db_err)?;
        }
        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn get_response(
        &self,
        table: &str,
        intent: &str,
        version: &str,
    ) -> Result<Option<String>> {
        let mut rows = self
            .conn
            .query(
                "SELECT response FROM response_entries
                 WHERE table_name = ?1 AND intent = ?2 AND version = ?3",
                params![table, intent, version],
            )
            .await
            .map_err(db_err)?;

        match rows.next().await.map_err(db_err)? {
            Some(row) => Ok(Some(row.get::<String>(0).map_err(db_err)?)),
            None => Ok(None),
        }
    }

    async fn scan_intents(&self, table: &str) -> Result<Vec<String>> {
        self.require_table(table).await?;
        let mut rows = self
            .conn
            .query(
                "SELECT DISTINCT intent FROM response_entries WHERE table_name = ?1 ORDER BY intent",
                params![table],
            )
            .await
            .map_err(db_err)?;

        let mut intents = Vec::new();
        while let Some(row) = rows.next().await.map_err(db_err)? {
            intents.push(row.get::<String>(0).map_err(db_err)?);
        }
        Ok(intents)
    }

    async fn delete_table(&self, table: &str) -> Result<()> {
        self.check_writable()?;
        self.require_table(table).await?;

        let tx = self.conn.transaction().await.map_err(db_err)?;
        tx.execute(
            "DELETE FROM response_entries WHERE table_name = ?1",
            params![table],
        )
        .await
        .map_err(db_err)?;
        tx.execute("DELETE FROM response_tables WHERE name = ?1", params![table])
            .await
            .map_err(db_err)?;
        tx.commit().await.map_err(db_err)?;
        tracing::debug!(table, "response table deleted");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Status records
// ---------------------------------------------------------------------------

impl StatusRecords for Storage {
    async fn get(&self, name: &str) -> Result<Option<BotRecord>> {
        let mut rows = self
            .conn
            .query(
                "SELECT name, stage, faq_url FROM bots WHERE name = ?1",
                params![name],
            )
            .await
            .map_err(db_err)?;

        match rows.next().await.map_err(db_err)? {
            Some(row) => Ok(Some(row_to_record(&row)?)),
            None => Ok(None),
        }
    }

    async fn put_if_absent(&self, record: &BotRecord) -> Result<bool> {
        self.check_writable()?;
        let now = Utc::now().to_rfc3339();
        let inserted = self
            .conn
            .execute(
                "INSERT INTO bots (name, stage, faq_url, updated_at) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(name) DO NOTHING",
                params![
                    record.name.as_str(),
                    record.stage.as_str(),
                    record.faq_url.as_str(),
                    now.as_str()
                ],
            )
            .await
            .map_err(db_err)?;
        Ok(inserted == 1)
    }

    async fn update_stage(&self, name: &str, stage: Stage) -> Result<()> {
        self.check_writable()?;
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO bots (name, stage, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(name) DO UPDATE SET
                   stage = excluded.stage,
                   updated_at = excluded.updated_at",
                params![name, stage.as_str(), now.as_str()],
            )
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn update_faq_url(&self, name: &str, faq_url: &str) -> Result<()> {
        self.check_writable()?;
        let now = Utc::now().to_rfc3339();
        let updated = self
            .conn
            .execute(
                "UPDATE bots SET faq_url = ?1, updated_at = ?2 WHERE name = ?3",
                params![faq_url, now.as_str(), name],
            )
            .await
            .map_err(db_err)?;
        if updated == 0 {
            return Err(OctochatError::not_found(format!("bot {name}")));
        }
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<()> {
        self.check_writable()?;
        self.conn
            .execute("DELETE FROM bots WHERE name = ?1", params![name])
            .await
            .map_err(db_err)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn db_err(e: libsql::Error) -> OctochatError {
    OctochatError::Storage(e.to_string())
}

fn row_to_record(row: &Row) -> Result<BotRecord> {
    let stage: String = row.get(1).map_err(db_err)?;
    Ok(BotRecord {
        name: row.get(0).map_err(db_err)?,
        stage: stage.parse()?,
        faq_url: row.get(2).map_err(db_err)?,
    })
}

fn table_status_str(status: TableStatus) -> &'static str {
    match status {
        TableStatus::Creating => "CREATING",
        TableStatus::Active => "ACTIVE",
        TableStatus::Deleting => "DELETING",
    }
}

fn parse_table_status(s: &str) -> Result<TableStatus> {
    match s {
        "CREATING" => Ok(TableStatus::Creating),
        "ACTIVE" => Ok(TableStatus::Active),
        "DELETING" => Ok(TableStatus::Deleting),
        other => Err(OctochatError::Storage(format!(
            "unknown table status '{other}'"
        ))),
    }
}

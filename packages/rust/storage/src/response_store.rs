//! Response store manager: table provisioning, population, and lookup.

use std::time::Duration;

use octochat_shared::{
    Intent, OctochatError, RESPONSE_VERSION, ResponseEntry, Result, RetryPolicy, TableStatus,
};
use tracing::{debug, info, instrument, warn};

use crate::repository::{MAX_BATCH_WRITE, ResponseTables};

/// Manages the per-bot response tables behind a [`ResponseTables`] store.
#[derive(Debug, Clone)]
pub struct ResponseStore<T> {
    tables: T,
    ready_policy: RetryPolicy,
}

impl<T: ResponseTables> ResponseStore<T> {
    /// `ready_policy` sets the polling interval (and default budget) used
    /// by [`wait_until_ready`](Self::wait_until_ready).
    pub fn new(tables: T, ready_policy: RetryPolicy) -> Self {
        Self {
            tables,
            ready_policy,
        }
    }

    /// Store used only for lookups; readiness polling makes a single check.
    pub fn reader(tables: T) -> Self {
        Self::new(tables, RetryPolicy::fixed(1, Duration::ZERO))
    }

    /// Create the table unless it exists.
    #[instrument(skip_all, fields(table = %table))]
    pub async fn ensure_table(&self, table: &str) -> Result<()> {
        match self.tables.create_table(table).await {
            Ok(()) => {
                info!("response table created");
                Ok(())
            }
            Err(OctochatError::AlreadyExists(_)) => {
                debug!("response table already exists");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Poll until the table is active, at most `max_attempts` times.
    ///
    /// Describe failures count as "not ready yet".
    #[instrument(skip_all, fields(table = %table, max_attempts = max_attempts))]
    pub async fn wait_until_ready(&self, table: &str, max_attempts: u32) -> bool {
        let tables = &self.tables;
        self.ready_policy
            .clone()
            .with_max_attempts(max_attempts)
            .poll("response_table_ready", move |attempt| async move {
                match tables.describe_table(table).await {
                    Ok(TableStatus::Active) => true,
                    Ok(status) => {
                        debug!(attempt, ?status, "response table not active yet");
                        false
                    }
                    Err(e) => {
                        debug!(attempt, error = %e, "describe failed, treating as not ready");
                        false
                    }
                }
            })
            .await
    }

    /// Write one entry per intent in batches of [`MAX_BATCH_WRITE`].
    ///
    /// Returns the number of batches written.
    #[instrument(skip_all, fields(table = %table, intents = intents.len()))]
    pub async fn populate(&self, table: &str, bot_name: &str, intents: &[Intent]) -> Result<usize> {
        let entries: Vec<ResponseEntry> = intents
            .iter()
            .map(|intent| ResponseEntry::for_intent(bot_name, intent))
            .collect();

        let mut batches = 0;
        for chunk in entries.chunks(MAX_BATCH_WRITE) {
            self.tables.batch_write(table, chunk).await?;
            batches += 1;
        }
        info!(entries = entries.len(), batches, "response table populated");
        Ok(batches)
    }

    /// Response for `intent`, or `None` on a miss or a failed read.
    #[instrument(skip_all, fields(table = %table, intent = %intent))]
    pub async fn lookup(&self, table: &str, intent: &str) -> Option<String> {
        match self
            .tables
            .get_response(table, intent, RESPONSE_VERSION)
            .await
        {
            Ok(Some(response)) => Some(response),
            Ok(None) => {
                debug!("no response stored for intent");
                None
            }
            Err(e) => {
                warn!(error = %e, "response lookup failed");
                None
            }
        }
    }

    /// Every intent key in the table; an absent table yields none.
    pub async fn intent_keys(&self, table: &str) -> Result<Vec<String>> {
        match self.tables.scan_intents(table).await {
            Ok(keys) => Ok(keys),
            Err(e) if e.is_not_found() => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    /// Delete the table; an absent table counts as deleted.
    #[instrument(skip_all, fields(table = %table))]
    pub async fn drop_table(&self, table: &str) -> Result<()> {
        match self.tables.delete_table(table).await {
            Ok(()) => {
                info!("response table deleted");
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                debug!("response table already gone");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

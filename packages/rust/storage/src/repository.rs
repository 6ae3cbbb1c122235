//! Store boundaries used by the pipeline and the responder.
//!
//! [`Storage`](crate::Storage) implements both; tests substitute in-memory
//! doubles.

use std::future::Future;
use std::sync::Arc;

use octochat_shared::{BotRecord, ResponseEntry, Result, Stage, TableStatus};

/// Most entries accepted by one [`ResponseTables::batch_write`] call.
pub const MAX_BATCH_WRITE: usize = 25;

/// Key-value tables mapping `(intent, version)` to a response.
///
/// Missing tables are reported as
/// [`OctochatError::NotFound`](octochat_shared::OctochatError::NotFound),
/// creating an existing one as
/// [`OctochatError::AlreadyExists`](octochat_shared::OctochatError::AlreadyExists).
pub trait ResponseTables: Send + Sync {
    fn create_table(&self, table: &str) -> impl Future<Output = Result<()>> + Send;

    fn describe_table(&self, table: &str) -> impl Future<Output = Result<TableStatus>> + Send;

    /// Write at most [`MAX_BATCH_WRITE`] entries atomically.
    fn batch_write(
        &self,
        table: &str,
        entries: &[ResponseEntry],
    ) -> impl Future<Output = Result<()>> + Send;

    fn get_response(
        &self,
        table: &str,
        intent: &str,
        version: &str,
    ) -> impl Future<Output = Result<Option<String>>> + Send;

    /// Every intent key stored in the table.
    fn scan_intents(&self, table: &str) -> impl Future<Output = Result<Vec<String>>> + Send;

    fn delete_table(&self, table: &str) -> impl Future<Output = Result<()>> + Send;
}

/// Per-bot status rows keyed by bot name.
pub trait StatusRecords: Send + Sync {
    fn get(&self, name: &str) -> impl Future<Output = Result<Option<BotRecord>>> + Send;

    /// Insert `record` unless a row for its name exists. Returns whether it
    /// was inserted.
    fn put_if_absent(&self, record: &BotRecord) -> impl Future<Output = Result<bool>> + Send;

    /// Set the stage, creating the row when absent.
    fn update_stage(&self, name: &str, stage: Stage) -> impl Future<Output = Result<()>> + Send;

    fn update_faq_url(&self, name: &str, faq_url: &str)
    -> impl Future<Output = Result<()>> + Send;

    /// Remove the row; a missing row is not an error.
    fn delete(&self, name: &str) -> impl Future<Output = Result<()>> + Send;
}

impl<T: ResponseTables> ResponseTables for Arc<T> {
    fn create_table(&self, table: &str) -> impl Future<Output = Result<()>> + Send {
        (**self).create_table(table)
    }

    fn describe_table(&self, table: &str) -> impl Future<Output = Result<TableStatus>> + Send {
        (**self).describe_table(table)
    }

    fn batch_write(
        &self,
        table: &str,
        entries: &[ResponseEntry],
    ) -> impl Future<Output = Result<()>> + Send {
        (**self).batch_write(table, entries)
    }

    fn get_response(
        &self,
        table: &str,
        intent: &str,
        version: &str,
    ) -> impl Future<Output = Result<Option<String>>> + Send {
        (**self).get_response(table, intent, version)
    }

    fn scan_intents(&self, table: &str) -> impl Future<Output = Result<Vec<String>>> + Send {
        (**self).scan_intents(table)
    }

    fn delete_table(&self, table: &str) -> impl Future<Output = Result<()>> + Send {
        (**self).delete_table(table)
    }
}

impl<T: StatusRecords> StatusRecords for Arc<T> {
    fn get(&self, name: &str) -> impl Future<Output = Result<Option<BotRecord>>> + Send {
        (**self).get(name)
    }

    fn put_if_absent(&self, record: &BotRecord) -> impl Future<Output = Result<bool>> + Send {
        (**self).put_if_absent(record)
    }

    fn update_stage(&self, name: &str, stage: Stage) -> impl Future<Output = Result<()>> + Send {
        (**self).update_stage(name, stage)
    }

    fn update_faq_url(
        &self,
        name: &str,
        faq_url: &str,
    ) -> impl Future<Output = Result<()>> + Send {
        (**self).update_faq_url(name, faq_url)
    }

    fn delete(&self, name: &str) -> impl Future<Output = Result<()>> + Send {
        (**self).delete(name)
    }
}

//! Knowledge extraction for octochat.
//!
//! Turns an FAQ web page into question/answer intents by handing the URL to
//! an external knowledge-base service, downloading the resulting TSV export,
//! and parsing it. The temporary knowledge base is always deleted afterwards.

mod client;
mod parser;

use std::future::Future;

use chrono::{DateTime, Local, TimeZone};
use octochat_shared::naming::convert_to_title;
use octochat_shared::{Intent, Result};
use tracing::{info, instrument, warn};

pub use client::QnaMakerClient;
pub use parser::{
    MAX_INTENT_NAME_LEN, duplicate_intent_names, parse_knowledge_base, question_to_intent_name,
    remove_invalid_punctuation,
};

/// Prefix of every temporary knowledge-base title.
const KB_TITLE_PREFIX: &str = "CAKB_";

// ---------------------------------------------------------------------------
// Service boundary
// ---------------------------------------------------------------------------

/// Remote knowledge-base service that can extract Q&A pairs from a page.
pub trait KnowledgeBaseService: Send + Sync {
    /// Create a knowledge base seeded from `faq_url`. Returns its id.
    fn create(
        &self,
        faq_url: &str,
        title: &str,
    ) -> impl Future<Output = Result<String>> + Send;

    /// URL from which the knowledge base can be downloaded.
    fn download_link(&self, kb_id: &str) -> impl Future<Output = Result<String>> + Send;

    /// Download the TSV export. A leading byte-order mark is removed.
    fn fetch(&self, link: &str) -> impl Future<Output = Result<String>> + Send;

    /// Delete the knowledge base.
    fn delete(&self, kb_id: &str) -> impl Future<Output = Result<()>> + Send;
}

// ---------------------------------------------------------------------------
// Extractor
// ---------------------------------------------------------------------------

/// Runs one create/download/parse/delete cycle per FAQ URL.
#[derive(Debug, Clone)]
pub struct KnowledgeExtractor<S> {
    service: S,
}

impl<S: KnowledgeBaseService> KnowledgeExtractor<S> {
    pub fn new(service: S) -> Self {
        Self { service }
    }

    /// Extract intents from the page at `faq_url`.
    ///
    /// Deletion of the temporary knowledge base is attempted even when the
    /// download or parse fails; a failed deletion is only logged.
    #[instrument(skip_all, fields(faq_url = %faq_url))]
    pub async fn extract(&self, faq_url: &str) -> Result<Vec<Intent>> {
        let title = knowledge_base_title(&Local::now());
        let kb_id = self.service.create(faq_url, &title).await?;
        info!(%kb_id, %title, "knowledge base created");

        let result = self.download_and_parse(&kb_id).await;

        if let Err(e) = self.service.delete(&kb_id).await {
            warn!(%kb_id, error = %e, "failed to delete knowledge base");
        }

        let intents = result?;
        info!(intents = intents.len(), "knowledge base parsed");
        Ok(intents)
    }

    async fn download_and_parse(&self, kb_id: &str) -> Result<Vec<Intent>> {
        let link = self.service.download_link(kb_id).await?;
        let content = self.service.fetch(&link).await?;
        parse_knowledge_base(&content)
    }
}

/// `CAKB_` followed by the title-cased local timestamp, e.g.
/// `CAKB_FriOct161200002026`.
pub fn knowledge_base_title<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let stamp = now.format("%a %b %e %H:%M:%S %Y").to_string();
    format!("{KB_TITLE_PREFIX}{}", convert_to_title(&stamp))
}

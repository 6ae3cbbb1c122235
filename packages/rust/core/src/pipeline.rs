//! Bot lifecycle pipeline: URL → knowledge base → response table → bot → alias.
//!
//! The build path claims the bot's status record, then writes each stage
//! before performing that stage's side effects, so a run that dies midway
//! leaves the record at the stage that was in flight. The teardown path is
//! idempotent: every step treats "already gone" as done.

use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use octochat_lex::{BotManager, BotPlatform};
use octochat_qnamaker::{KnowledgeBaseService, KnowledgeExtractor, duplicate_intent_names};
use octochat_shared::{
    AppConfig, BotRecord, ItemFailure, OctochatError, Result, Stage, derive_bot_name,
    response_table_name,
};
use octochat_storage::{ResponseStore, ResponseTables, StatusRecords, StatusTracker};

// ---------------------------------------------------------------------------
// Outcomes and reports
// ---------------------------------------------------------------------------

/// Coarse result of a build run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildOutcome {
    /// The bot is live behind its alias.
    Built,
    /// A record for the bot existed; carries its stage.
    AlreadyExists(Stage),
    /// The response table never became active. The bot stays at `STORING`.
    TableNotReady,
    /// The alias could not be bound. The bot stays at `PUBLISHING`.
    AliasNotAssigned,
}

impl BuildOutcome {
    /// Process exit code for the outcome.
    pub fn code(&self) -> u8 {
        match self {
            Self::Built => 0,
            Self::AlreadyExists(_) => 1,
            Self::TableNotReady => 2,
            Self::AliasNotAssigned => 3,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::Built => "Bot successfully built".into(),
            Self::AlreadyExists(stage) => format!("Bot already exists (stage {stage})"),
            Self::TableNotReady => "Creating intent table timed out".into(),
            Self::AliasNotAssigned => "Assigning bot alias timed out".into(),
        }
    }
}

/// What a build run did, successful or not.
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    /// Correlates the run's log lines.
    pub run_id: Uuid,
    pub bot_name: String,
    pub faq_url: String,
    pub outcome: BuildOutcome,
    #[serde(flatten)]
    pub details: BuildDetails,
    #[serde(skip)]
    pub elapsed: Duration,
}

/// Counters and per-item failures gathered along the build path.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildDetails {
    /// Intents extracted from the knowledge base.
    pub intents: usize,
    /// Batched writes issued against the response table.
    pub batches: usize,
    /// Intent names produced by more than one question.
    pub duplicate_intents: Vec<String>,
    /// Intents that failed registration or version publishing.
    pub failed_items: Vec<ItemFailure>,
    pub bot_version: Option<String>,
}

/// What a teardown run removed.
#[derive(Debug, Clone, Serialize)]
pub struct TeardownReport {
    pub bot_name: String,
    pub intents_deleted: usize,
    #[serde(skip)]
    pub elapsed: Duration,
}

/// Result of a status query.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub bot_name: String,
    pub stage: Stage,
    pub faq_url: Option<String>,
}

impl StatusReport {
    pub fn from_record(bot_name: String, record: Option<BotRecord>) -> Self {
        match record {
            Some(record) => Self {
                bot_name,
                stage: record.stage,
                faq_url: Some(record.faq_url),
            },
            None => Self {
                bot_name,
                stage: Stage::Dne,
                faq_url: None,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Progress reporting
// ---------------------------------------------------------------------------

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after a stage was persisted for `bot_name`.
    fn stage(&self, bot_name: &str, stage: Stage);
    /// Called when a build run completes.
    fn done(&self, report: &BuildReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn stage(&self, _bot_name: &str, _stage: Stage) {}
    fn done(&self, _report: &BuildReport) {}
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Sequences extraction, storage, and platform provisioning for one bot at
/// a time.
pub struct Pipeline<K, P, T, R> {
    extractor: KnowledgeExtractor<K>,
    bots: BotManager<P>,
    responses: ResponseStore<T>,
    status: StatusTracker<R>,
    table_ready_attempts: u32,
}

impl<K, P, T, R> Pipeline<K, P, T, R>
where
    K: KnowledgeBaseService,
    P: BotPlatform,
    T: ResponseTables,
    R: StatusRecords,
{
    pub fn new(knowledge_base: K, platform: P, tables: T, records: R, config: &AppConfig) -> Self {
        Self {
            extractor: KnowledgeExtractor::new(knowledge_base),
            bots: BotManager::new(platform, &config.platform, &config.retry),
            responses: ResponseStore::new(tables, config.retry.table_ready.policy()),
            status: StatusTracker::new(records),
            table_ready_attempts: config.retry.table_ready.max_attempts,
        }
    }

    /// Build and publish the bot for `faq_url`.
    ///
    /// Non-success outcomes that leave the bot in a known stage are returned
    /// as [`BuildOutcome`]s; everything else is an error, with the status
    /// record left at the stage that failed.
    #[instrument(skip_all, fields(faq_url = %faq_url))]
    pub async fn build(
        &self,
        faq_url: &str,
        progress: &dyn ProgressReporter,
    ) -> Result<BuildReport> {
        let start = Instant::now();
        let run_id = Uuid::now_v7();
        let bot_name = derive_bot_name(faq_url)?;
        let table = response_table_name(&bot_name);

        info!(%run_id, bot = %bot_name, %table, "starting build");

        let mut details = BuildDetails::default();
        let outcome = self
            .run_build(&bot_name, &table, faq_url, &mut details, progress)
            .await?;

        let report = BuildReport {
            run_id,
            bot_name,
            faq_url: faq_url.to_string(),
            outcome,
            details,
            elapsed: start.elapsed(),
        };

        info!(
            %run_id,
            bot = %report.bot_name,
            code = outcome.code(),
            intents = report.details.intents,
            failed = report.details.failed_items.len(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "build finished: {}",
            outcome.message()
        );
        progress.done(&report);
        Ok(report)
    }

    async fn run_build(
        &self,
        bot_name: &str,
        table: &str,
        faq_url: &str,
        details: &mut BuildDetails,
        progress: &dyn ProgressReporter,
    ) -> Result<BuildOutcome> {
        // --- DNE -> EXTRACTING (conditional create guards duplicate runs) ---
        if !self.status.claim(bot_name, faq_url).await? {
            let stage = self.status.get_stage(bot_name).await?;
            warn!(bot = bot_name, %stage, "bot already exists");
            return Ok(BuildOutcome::AlreadyExists(stage));
        }
        progress.stage(bot_name, Stage::Extracting);

        progress.phase("Extracting knowledge base");
        let intents = self.extractor.extract(faq_url).await?;
        details.intents = intents.len();
        details.duplicate_intents = duplicate_intent_names(&intents);
        if !details.duplicate_intents.is_empty() {
            warn!(
                duplicates = ?details.duplicate_intents,
                "several questions map to the same intent name"
            );
        }

        // --- EXTRACTING -> STORING ---
        self.enter(bot_name, Stage::Storing, progress).await?;
        progress.phase("Creating response table");
        self.responses.ensure_table(table).await?;
        if !self
            .responses
            .wait_until_ready(table, self.table_ready_attempts)
            .await
        {
            warn!(bot = bot_name, table, "response table never became active");
            return Ok(BuildOutcome::TableNotReady);
        }

        // --- STORING -> BUILDING ---
        self.enter(bot_name, Stage::Building, progress).await?;
        progress.phase("Storing responses");
        details.batches = self.responses.populate(table, bot_name, &intents).await?;

        progress.phase("Creating intents");
        let created = self.bots.create_intents(bot_name, &intents).await;
        details.failed_items.extend(created.failures);

        progress.phase("Publishing intent versions");
        let published = self.bots.publish_intent_versions(&created.succeeded).await;
        details.failed_items.extend(published.failures);

        progress.phase("Creating bot");
        self.bots.create_bot(bot_name, &published.succeeded).await?;
        let version = self.bots.publish_bot_version(bot_name).await?;
        details.bot_version = Some(version.clone());

        // --- BUILDING -> PUBLISHING ---
        self.enter(bot_name, Stage::Publishing, progress).await?;
        progress.phase("Assigning alias");
        if !self.bots.assign_alias(bot_name, &version).await? {
            return Ok(BuildOutcome::AliasNotAssigned);
        }

        // --- PUBLISHING -> READY ---
        self.enter(bot_name, Stage::Ready, progress).await?;
        Ok(BuildOutcome::Built)
    }

    async fn enter(&self, bot_name: &str, stage: Stage, progress: &dyn ProgressReporter) -> Result<()> {
        self.status.advance(bot_name, stage).await?;
        progress.stage(bot_name, stage);
        Ok(())
    }

    /// Tear down everything provisioned for `faq_url`.
    ///
    /// Safe to run on a bot that never existed or was partly built. The
    /// response table is kept until every intent it names was deleted, so a
    /// failed teardown can be re-run.
    #[instrument(skip_all, fields(faq_url = %faq_url))]
    pub async fn delete(
        &self,
        faq_url: &str,
        progress: &dyn ProgressReporter,
    ) -> Result<TeardownReport> {
        let start = Instant::now();
        let bot_name = derive_bot_name(faq_url)?;
        let table = response_table_name(&bot_name);
        info!(bot = %bot_name, "starting teardown");

        // Any stage may enter DELETING, including a bot with no record yet.
        self.status.set_stage(&bot_name, Stage::Deleting).await?;
        self.status.set_faq_url(&bot_name, faq_url).await?;
        progress.stage(&bot_name, Stage::Deleting);

        progress.phase("Deleting alias");
        self.bots.delete_alias(&bot_name).await?;

        progress.phase("Deleting bot");
        self.bots.delete_bot(&bot_name).await?;

        progress.phase("Deleting intents");
        let intent_names = self.responses.intent_keys(&table).await?;
        let deleted = self.bots.delete_intents(&intent_names).await;
        if !deleted.is_complete() {
            return Err(OctochatError::platform(
                "IntentDeleteFailed",
                format!(
                    "{} of {} intents could not be deleted",
                    deleted.failures.len(),
                    intent_names.len()
                ),
            ));
        }

        progress.phase("Deleting response table");
        self.responses.drop_table(&table).await?;

        self.status.delete(&bot_name).await?;
        progress.stage(&bot_name, Stage::Dne);

        let report = TeardownReport {
            bot_name,
            intents_deleted: deleted.succeeded.len(),
            elapsed: start.elapsed(),
        };
        info!(
            bot = %report.bot_name,
            intents = report.intents_deleted,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "teardown finished"
        );
        Ok(report)
    }

    /// Current stage and source URL of the bot for `faq_url`.
    pub async fn status(&self, faq_url: &str) -> Result<StatusReport> {
        let bot_name = derive_bot_name(faq_url)?;
        let record = self.status.record(&bot_name).await?;
        Ok(StatusReport::from_record(bot_name, record))
    }
}

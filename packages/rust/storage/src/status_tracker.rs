//! Status tracker: the persisted lifecycle stage of each bot.

use octochat_shared::{BotRecord, OctochatError, Result, Stage};
use tracing::{debug, info};

use crate::repository::StatusRecords;

/// Reads and transitions bot stages stored in a [`StatusRecords`] store.
#[derive(Debug, Clone)]
pub struct StatusTracker<R> {
    records: R,
}

impl<R: StatusRecords> StatusTracker<R> {
    pub fn new(records: R) -> Self {
        Self { records }
    }

    /// Current stage; [`Stage::Dne`] when no record exists.
    pub async fn get_stage(&self, bot_name: &str) -> Result<Stage> {
        Ok(self
            .records
            .get(bot_name)
            .await?
            .map_or(Stage::Dne, |record| record.stage))
    }

    pub async fn record(&self, bot_name: &str) -> Result<Option<BotRecord>> {
        self.records.get(bot_name).await
    }

    /// Write `stage` without checking the stored one.
    pub async fn set_stage(&self, bot_name: &str, stage: Stage) -> Result<()> {
        self.records.update_stage(bot_name, stage).await?;
        info!(bot = bot_name, %stage, "stage set");
        Ok(())
    }

    /// Move to `stage`, rejecting transitions the lifecycle does not allow.
    pub async fn advance(&self, bot_name: &str, stage: Stage) -> Result<()> {
        let current = self.get_stage(bot_name).await?;
        if !current.can_transition_to(stage) {
            return Err(OctochatError::validation(format!(
                "bot {bot_name} cannot move from {current} to {stage}"
            )));
        }
        self.records.update_stage(bot_name, stage).await?;
        info!(bot = bot_name, from = %current, to = %stage, "stage advanced");
        Ok(())
    }

    /// Create the record at [`Stage::Extracting`] unless one exists.
    ///
    /// Returns `false` when another run already owns the bot.
    pub async fn claim(&self, bot_name: &str, faq_url: &str) -> Result<bool> {
        let record = BotRecord {
            name: bot_name.to_string(),
            stage: Stage::Extracting,
            faq_url: faq_url.to_string(),
        };
        let claimed = self.records.put_if_absent(&record).await?;
        if claimed {
            info!(bot = bot_name, stage = %Stage::Extracting, "bot claimed");
        } else {
            debug!(bot = bot_name, "bot record already exists");
        }
        Ok(claimed)
    }

    pub async fn set_faq_url(&self, bot_name: &str, faq_url: &str) -> Result<()> {
        self.records.update_faq_url(bot_name, faq_url).await
    }

    /// Remove the record. The bot reads as [`Stage::Dne`] afterwards.
    pub async fn delete(&self, bot_name: &str) -> Result<()> {
        self.records.delete(bot_name).await?;
        info!(bot = bot_name, stage = %Stage::Dne, "bot record deleted");
        Ok(())
    }
}

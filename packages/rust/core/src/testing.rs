//! In-memory doubles for the pipeline's external boundaries.

use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

use octochat_lex::{BotDefinition, BotPlatform, IntentDefinition};
use octochat_qnamaker::KnowledgeBaseService;
use octochat_shared::{OctochatError, ResponseEntry, Result, TableStatus};
use octochat_storage::{ResponseTables, Storage};
use uuid::Uuid;

pub(crate) async fn temp_storage() -> Storage {
    let path = std::env::temp_dir().join(format!("octochat_core_test_{}.db", Uuid::now_v7()));
    Storage::open(&path).await.expect("open temp storage")
}

// ---------------------------------------------------------------------------
// Knowledge base
// ---------------------------------------------------------------------------

/// Serves a fixed TSV export, or fails every download.
pub(crate) struct FakeKnowledgeBase {
    export: Option<String>,
}

impl FakeKnowledgeBase {
    pub(crate) fn serving(export: &str) -> Self {
        Self {
            export: Some(export.to_string()),
        }
    }

    pub(crate) fn failing() -> Self {
        Self { export: None }
    }
}

impl KnowledgeBaseService for FakeKnowledgeBase {
    async fn create(&self, _faq_url: &str, _title: &str) -> Result<String> {
        Ok("kb-test".into())
    }

    async fn download_link(&self, kb_id: &str) -> Result<String> {
        Ok(format!("https://downloads.example/{kb_id}.tsv"))
    }

    async fn fetch(&self, _link: &str) -> Result<String> {
        self.export
            .clone()
            .ok_or_else(|| OctochatError::Network("download failed".into()))
    }

    async fn delete(&self, _kb_id: &str) -> Result<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Bot platform
// ---------------------------------------------------------------------------

/// Bot platform kept in memory; "not found" on missing resources.
#[derive(Default)]
pub(crate) struct FakePlatform {
    pub(crate) intents: Mutex<BTreeMap<String, IntentDefinition>>,
    pub(crate) bots: Mutex<BTreeMap<String, BotDefinition>>,
    pub(crate) aliases: Mutex<BTreeMap<String, String>>,
    pub(crate) failing_intents: HashSet<String>,
    /// Alias calls that fail before one succeeds.
    pub(crate) alias_failures: Mutex<u32>,
    /// Every intent delete fails with a non-"not found" error while set.
    pub(crate) refuse_intent_deletes: Mutex<bool>,
    pub(crate) calls: Mutex<Vec<String>>,
}

impl FakePlatform {
    pub(crate) fn failing_intent(name: &str) -> Self {
        Self {
            failing_intents: HashSet::from([name.to_string()]),
            ..Self::default()
        }
    }

    pub(crate) fn intent_names(&self) -> Vec<String> {
        self.intents.lock().unwrap().keys().cloned().collect()
    }

    pub(crate) fn bot_intents(&self, bot_name: &str) -> Vec<String> {
        self.bots
            .lock()
            .unwrap()
            .get(bot_name)
            .map(|bot| bot.intents.iter().map(|i| i.intent_name.clone()).collect())
            .unwrap_or_default()
    }

    pub(crate) fn has_bot(&self, bot_name: &str) -> bool {
        self.bots.lock().unwrap().contains_key(bot_name)
    }

    pub(crate) fn alias_version(&self, bot_name: &str, alias: &str) -> Option<String> {
        self.aliases
            .lock()
            .unwrap()
            .get(&format!("{bot_name}/{alias}"))
            .cloned()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub(crate) fn count(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

impl BotPlatform for FakePlatform {
    async fn put_intent(&self, intent: &IntentDefinition) -> Result<()> {
        self.record(format!("put_intent {}", intent.name));
        if self.failing_intents.contains(&intent.name) {
            return Err(OctochatError::platform("BadRequestException", "invalid utterance"));
        }
        self.intents
            .lock()
            .unwrap()
            .insert(intent.name.clone(), intent.clone());
        Ok(())
    }

    async fn create_intent_version(&self, name: &str) -> Result<String> {
        self.record(format!("create_intent_version {name}"));
        if self.intents.lock().unwrap().contains_key(name) {
            Ok("1".into())
        } else {
            Err(OctochatError::not_found(name))
        }
    }

    async fn put_bot(&self, bot: &BotDefinition) -> Result<()> {
        self.record(format!("put_bot {}", bot.name));
        self.bots.lock().unwrap().insert(bot.name.clone(), bot.clone());
        Ok(())
    }

    async fn create_bot_version(&self, name: &str) -> Result<String> {
        self.record(format!("create_bot_version {name}"));
        if self.bots.lock().unwrap().contains_key(name) {
            Ok("1".into())
        } else {
            Err(OctochatError::not_found(name))
        }
    }

    async fn put_bot_alias(&self, bot_name: &str, alias: &str, bot_version: &str) -> Result<()> {
        self.record(format!("put_bot_alias {bot_name}"));
        {
            let mut remaining = self.alias_failures.lock().unwrap();
            if *remaining > 0 {
                *remaining -= 1;
                return Err(OctochatError::platform("ConflictException", "bot is building"));
            }
        }
        self.aliases
            .lock()
            .unwrap()
            .insert(format!("{bot_name}/{alias}"), bot_version.to_string());
        Ok(())
    }

    async fn delete_bot_alias(&self, bot_name: &str, alias: &str) -> Result<()> {
        self.record(format!("delete_bot_alias {bot_name}"));
        let removed = self
            .aliases
            .lock()
            .unwrap()
            .remove(&format!("{bot_name}/{alias}"));
        removed
            .map(|_| ())
            .ok_or_else(|| OctochatError::not_found(format!("{bot_name}/{alias}")))
    }

    async fn delete_bot(&self, name: &str) -> Result<()> {
        self.record(format!("delete_bot {name}"));
        let removed = self.bots.lock().unwrap().remove(name);
        removed
            .map(|_| ())
            .ok_or_else(|| OctochatError::not_found(name))
    }

    async fn delete_intent(&self, name: &str) -> Result<()> {
        self.record(format!("delete_intent {name}"));
        if *self.refuse_intent_deletes.lock().unwrap() {
            return Err(OctochatError::platform("ResourceInUseException", "intent is in use"));
        }
        let removed = self.intents.lock().unwrap().remove(name);
        removed
            .map(|_| ())
            .ok_or_else(|| OctochatError::not_found(name))
    }
}

// ---------------------------------------------------------------------------
// Response tables
// ---------------------------------------------------------------------------

/// A table that is created but never leaves `CREATING`.
#[derive(Default)]
pub(crate) struct NeverReadyTables;

impl ResponseTables for NeverReadyTables {
    async fn create_table(&self, _table: &str) -> Result<()> {
        Ok(())
    }

    async fn describe_table(&self, _table: &str) -> Result<TableStatus> {
        Ok(TableStatus::Creating)
    }

    async fn batch_write(&self, table: &str, _entries: &[ResponseEntry]) -> Result<()> {
        Err(OctochatError::not_found(table))
    }

    async fn get_response(
        &self,
        _table: &str,
        _intent: &str,
        _version: &str,
    ) -> Result<Option<String>> {
        Ok(None)
    }

    async fn scan_intents(&self, _table: &str) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    async fn delete_table(&self, _table: &str) -> Result<()> {
        Ok(())
    }
}

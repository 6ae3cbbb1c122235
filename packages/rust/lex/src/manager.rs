//! Provisioning workflow over a [`BotPlatform`].

use octochat_shared::{
    Intent, ItemFailure, OctochatError, PlatformConfig, Result, RetryConfig, RetryPolicy,
    platform_intent_name,
};
use tracing::{info, instrument, warn};

use crate::BotPlatform;
use crate::model::{BotDefinition, FulfillmentActivity, IntentDefinition, IntentRef};

/// Items that went through plus the ones that failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome<T> {
    pub succeeded: Vec<T>,
    pub failures: Vec<ItemFailure>,
}

impl<T> Default for BatchOutcome<T> {
    fn default() -> Self {
        Self {
            succeeded: Vec::new(),
            failures: Vec::new(),
        }
    }
}

impl<T> BatchOutcome<T> {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Drives intent, bot, and alias provisioning on a [`BotPlatform`].
#[derive(Debug, Clone)]
pub struct BotManager<P> {
    platform: P,
    alias: String,
    fulfillment_uri: String,
    voice_id: String,
    locale: String,
    create_bot_policy: RetryPolicy,
    alias_policy: RetryPolicy,
    teardown_policy: RetryPolicy,
}

impl<P: BotPlatform> BotManager<P> {
    pub fn new(platform: P, config: &PlatformConfig, retry: &RetryConfig) -> Self {
        Self {
            platform,
            alias: config.alias.clone(),
            fulfillment_uri: config.fulfillment_uri.clone(),
            voice_id: config.voice_id.clone(),
            locale: config.locale.clone(),
            create_bot_policy: retry.create_bot.policy(),
            alias_policy: retry.alias.policy(),
            teardown_policy: retry.teardown.policy().absorbing_not_found(),
        }
    }

    // -----------------------------------------------------------------------
    // Build path
    // -----------------------------------------------------------------------

    /// Register every intent as `{bot}_{intent}` with a code-hook fulfillment.
    ///
    /// Returns the platform names that were registered.
    #[instrument(skip_all, fields(bot = %bot_name, intents = intents.len()))]
    pub async fn create_intents(&self, bot_name: &str, intents: &[Intent]) -> BatchOutcome<String> {
        let mut outcome = BatchOutcome::default();
        for intent in intents {
            let definition = IntentDefinition {
                name: platform_intent_name(bot_name, &intent.name),
                sample_utterances: intent.sample_utterances.clone(),
                fulfillment_activity: FulfillmentActivity::code_hook(&self.fulfillment_uri),
            };
            match self.platform.put_intent(&definition).await {
                Ok(()) => outcome.succeeded.push(definition.name),
                Err(e) => {
                    warn!(intent = %definition.name, error = %e, "failed to create intent");
                    outcome.failures.push(ItemFailure::new(definition.name, e));
                }
            }
        }
        info!(
            created = outcome.succeeded.len(),
            failed = outcome.failures.len(),
            "intents created"
        );
        outcome
    }

    /// Publish a version of each intent; only successes are returned.
    #[instrument(skip_all, fields(intents = names.len()))]
    pub async fn publish_intent_versions(&self, names: &[String]) -> BatchOutcome<IntentRef> {
        let mut outcome = BatchOutcome::default();
        for name in names {
            match self.platform.create_intent_version(name).await {
                Ok(version) => outcome.succeeded.push(IntentRef {
                    intent_name: name.clone(),
                    intent_version: version,
                }),
                Err(e) => {
                    warn!(intent = %name, error = %e, "failed to publish intent version");
                    outcome.failures.push(ItemFailure::new(name.clone(), e));
                }
            }
        }
        outcome
    }

    /// Create or update the bot with the fixed FAQ prompts.
    #[instrument(skip_all, fields(bot = %bot_name, intents = intents.len()))]
    pub async fn create_bot(&self, bot_name: &str, intents: &[IntentRef]) -> Result<()> {
        let definition = BotDefinition::faq_bot(
            bot_name,
            intents.to_vec(),
            self.voice_id.as_str(),
            self.locale.as_str(),
        );
        let platform = &self.platform;
        let definition = &definition;
        self.create_bot_policy
            .run("put_bot", move |_| platform.put_bot(definition))
            .await?;
        info!("bot definition saved");
        Ok(())
    }

    /// Publish a numbered bot version.
    #[instrument(skip_all, fields(bot = %bot_name))]
    pub async fn publish_bot_version(&self, bot_name: &str) -> Result<String> {
        let version = self.platform.create_bot_version(bot_name).await?;
        info!(%version, "bot version published");
        Ok(version)
    }

    /// Bind the alias to `version`, retrying while the platform builds the bot.
    ///
    /// Returns `false` when the retry budget ran out.
    #[instrument(skip_all, fields(bot = %bot_name, alias = %self.alias, version = %version))]
    pub async fn assign_alias(&self, bot_name: &str, version: &str) -> Result<bool> {
        let platform = &self.platform;
        let alias = self.alias.as_str();
        match self
            .alias_policy
            .run("put_bot_alias", move |_| {
                platform.put_bot_alias(bot_name, alias, version)
            })
            .await
        {
            Ok(_) => {
                info!("alias assigned");
                Ok(true)
            }
            Err(OctochatError::RetryExhausted { attempts, last, .. }) => {
                warn!(attempts, error = %last, "alias was never assigned");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    // -----------------------------------------------------------------------
    // Teardown path ("not found" counts as deleted)
    // -----------------------------------------------------------------------

    #[instrument(skip_all, fields(bot = %bot_name, alias = %self.alias))]
    pub async fn delete_alias(&self, bot_name: &str) -> Result<()> {
        let platform = &self.platform;
        let alias = self.alias.as_str();
        self.teardown_policy
            .run("delete_bot_alias", move |_| {
                platform.delete_bot_alias(bot_name, alias)
            })
            .await?;
        Ok(())
    }

    #[instrument(skip_all, fields(bot = %bot_name))]
    pub async fn delete_bot(&self, bot_name: &str) -> Result<()> {
        let platform = &self.platform;
        self.teardown_policy
            .run("delete_bot", move |_| platform.delete_bot(bot_name))
            .await?;
        Ok(())
    }

    /// Delete each intent. Every name is attempted; failures are collected.
    #[instrument(skip_all, fields(intents = names.len()))]
    pub async fn delete_intents(&self, names: &[String]) -> BatchOutcome<String> {
        let mut outcome = BatchOutcome::default();
        let platform = &self.platform;
        for name in names {
            let result = self
                .teardown_policy
                .run("delete_intent", move |_| platform.delete_intent(name))
                .await;
            match result {
                Ok(_) => outcome.succeeded.push(name.clone()),
                Err(e) => {
                    warn!(intent = %name, error = %e, "failed to delete intent");
                    outcome.failures.push(ItemFailure::new(name.clone(), e));
                }
            }
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    use octochat_shared::RetrySettings;

    use super::*;

    /// In-memory platform with scriptable failures.
    #[derive(Default)]
    struct FakePlatform {
        intents: Mutex<HashMap<String, IntentDefinition>>,
        bots: Mutex<HashMap<String, BotDefinition>>,
        failing_intents: HashSet<String>,
        put_bot_failures: Mutex<u32>,
        alias_failures: Mutex<u32>,
        delete_failures: Mutex<u32>,
        aliases: Mutex<HashMap<String, String>>,
        calls: Mutex<Vec<String>>,
    }

    impl FakePlatform {
        fn count(&self, prefix: &str) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|c| c.starts_with(prefix))
                .count()
        }

        fn record(&self, call: impl Into<String>) {
            self.calls.lock().unwrap().push(call.into());
        }

        fn take_failure(counter: &Mutex<u32>) -> bool {
            let mut remaining = counter.lock().unwrap();
            if *remaining > 0 {
                *remaining -= 1;
                true
            } else {
                false
            }
        }
    }

    impl BotPlatform for FakePlatform {
        async fn put_intent(&self, intent: &IntentDefinition) -> Result<()> {
            self.record(format!("put_intent {}", intent.name));
            if self.failing_intents.contains(&intent.name) {
                return Err(OctochatError::platform("BadRequestException", "bad utterance"));
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
                Err(OctochatError::NotFound(name.into()))
            }
        }

        async fn put_bot(&self, bot: &BotDefinition) -> Result<()> {
            self.record(format!("put_bot {}", bot.name));
            if Self::take_failure(&self.put_bot_failures) {
                return Err(OctochatError::platform("ConflictException", "busy"));
            }
            self.bots.lock().unwrap().insert(bot.name.clone(), bot.clone());
            Ok(())
        }

        async fn create_bot_version(&self, name: &str) -> Result<String> {
            self.record(format!("create_bot_version {name}"));
            Ok("1".into())
        }

        async fn put_bot_alias(&self, bot_name: &str, alias: &str, version: &str) -> Result<()> {
            self.record(format!("put_bot_alias {bot_name}"));
            if Self::take_failure(&self.alias_failures) {
                return Err(OctochatError::platform("ConflictException", "still building"));
            }
            self.aliases
                .lock()
                .unwrap()
                .insert(format!("{bot_name}/{alias}"), version.into());
            Ok(())
        }

        async fn delete_bot_alias(&self, bot_name: &str, alias: &str) -> Result<()> {
            self.record(format!("delete_bot_alias {bot_name}"));
            match self.aliases.lock().unwrap().remove(&format!("{bot_name}/{alias}")) {
                Some(_) => Ok(()),
                None => Err(OctochatError::NotFound(bot_name.into())),
            }
        }

        async fn delete_bot(&self, name: &str) -> Result<()> {
            self.record(format!("delete_bot {name}"));
            if Self::take_failure(&self.delete_failures) {
                return Err(OctochatError::Network("throttled".into()));
            }
            match self.bots.lock().unwrap().remove(name) {
                Some(_) => Ok(()),
                None => Err(OctochatError::NotFound(name.into())),
            }
        }

        async fn delete_intent(&self, name: &str) -> Result<()> {
            self.record(format!("delete_intent {name}"));
            match self.intents.lock().unwrap().remove(name) {
                Some(_) => Ok(()),
                None => Err(OctochatError::NotFound(name.into())),
            }
        }
    }

    fn instant_retry() -> RetryConfig {
        RetryConfig {
            table_ready: RetrySettings::new(20, 0),
            create_bot: RetrySettings::new(10, 0),
            alias: RetrySettings::new(5, 0),
            teardown: RetrySettings::new(3, 0),
        }
    }

    fn manager(platform: FakePlatform) -> BotManager<FakePlatform> {
        BotManager::new(platform, &PlatformConfig::default(), &instant_retry())
    }

    fn intent(name: &str) -> Intent {
        Intent {
            name: name.into(),
            sample_utterances: vec![format!("What is {name}")],
            response: format!("{name} is..."),
        }
    }

    #[tokio::test]
    async fn intents_get_prefixed_names_and_code_hook() {
        let manager = manager(FakePlatform::default());
        let outcome = manager
            .create_intents("Examplecomfa", &[intent("X"), intent("Y")])
            .await;

        assert!(outcome.is_complete());
        assert_eq!(outcome.succeeded, vec!["Examplecomfa_X", "Examplecomfa_Y"]);

        let stored = manager.platform.intents.lock().unwrap();
        let x = &stored["Examplecomfa_X"];
        assert_eq!(x.sample_utterances, vec!["What is X"]);
        assert_eq!(
            x.fulfillment_activity.code_hook.uri,
            PlatformConfig::default().fulfillment_uri
        );
    }

    #[tokio::test]
    async fn intent_failures_are_collected_not_fatal() {
        let platform = FakePlatform {
            failing_intents: HashSet::from(["Bot_Bad".to_string()]),
            ..FakePlatform::default()
        };
        let manager = manager(platform);
        let created = manager
            .create_intents("Bot", &[intent("Good"), intent("Bad"), intent("Fine")])
            .await;
        assert_eq!(created.succeeded, vec!["Bot_Good", "Bot_Fine"]);
        assert_eq!(created.failures.len(), 1);
        assert_eq!(created.failures[0].item, "Bot_Bad");

        // Versions are published only for what exists
        let names = vec!["Bot_Good".to_string(), "Bot_Bad".to_string()];
        let published = manager.publish_intent_versions(&names).await;
        assert_eq!(
            published.succeeded,
            vec![IntentRef {
                intent_name: "Bot_Good".into(),
                intent_version: "1".into()
            }]
        );
        assert_eq!(published.failures[0].item, "Bot_Bad");
    }

    #[tokio::test]
    async fn put_bot_is_retried() {
        let platform = FakePlatform {
            put_bot_failures: Mutex::new(2),
            ..FakePlatform::default()
        };
        let manager = manager(platform);
        manager.create_bot("Bot", &[]).await.unwrap();
        assert_eq!(manager.platform.count("put_bot"), 3);
        assert!(manager.platform.bots.lock().unwrap().contains_key("Bot"));
    }

    #[tokio::test]
    async fn put_bot_exhaustion_surfaces() {
        let platform = FakePlatform {
            put_bot_failures: Mutex::new(50),
            ..FakePlatform::default()
        };
        let manager = manager(platform);
        let err = manager.create_bot("Bot", &[]).await.unwrap_err();
        assert!(matches!(err, OctochatError::RetryExhausted { attempts: 10, .. }));
    }

    #[tokio::test]
    async fn alias_waits_for_build() {
        let platform = FakePlatform {
            alias_failures: Mutex::new(3),
            ..FakePlatform::default()
        };
        let manager = manager(platform);
        assert!(manager.assign_alias("Bot", "1").await.unwrap());
        assert_eq!(manager.platform.count("put_bot_alias"), 4);
        assert_eq!(
            manager.platform.aliases.lock().unwrap().get("Bot/DEV"),
            Some(&"1".to_string())
        );
    }

    #[tokio::test]
    async fn alias_exhaustion_reports_false() {
        let platform = FakePlatform {
            alias_failures: Mutex::new(100),
            ..FakePlatform::default()
        };
        let manager = manager(platform);
        assert!(!manager.assign_alias("Bot", "1").await.unwrap());
        assert_eq!(manager.platform.count("put_bot_alias"), 5);
    }

    #[tokio::test]
    async fn teardown_of_missing_resources_succeeds() {
        let manager = manager(FakePlatform::default());
        manager.delete_alias("Nope").await.unwrap();
        manager.delete_bot("Nope").await.unwrap();
        let outcome = manager.delete_intents(&["Nope_X".to_string()]).await;
        assert!(outcome.is_complete());

        // One call each: "not found" ends the retry loop
        assert_eq!(manager.platform.count("delete_"), 3);
    }

    #[tokio::test]
    async fn teardown_retries_transient_errors() {
        let platform = FakePlatform {
            delete_failures: Mutex::new(2),
            ..FakePlatform::default()
        };
        let manager = manager(platform);
        manager.create_bot("Bot", &[]).await.unwrap();
        manager.delete_bot("Bot").await.unwrap();
        assert_eq!(manager.platform.count("delete_bot"), 3);
        assert!(manager.platform.bots.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn teardown_exhaustion_is_an_error() {
        let platform = FakePlatform {
            delete_failures: Mutex::new(10),
            ..FakePlatform::default()
        };
        let err = manager(platform).delete_bot("Bot").await.unwrap_err();
        assert!(matches!(err, OctochatError::RetryExhausted { attempts: 3, .. }));
    }
}

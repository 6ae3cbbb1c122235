//! Bot platform provisioning for octochat.
//!
//! [`BotPlatform`] is the raw model-building API (one call per method);
//! [`BotManager`] layers the provisioning workflow on top of it: intent
//! registration, version publishing, bot definition, alias binding, and the
//! mirrored teardown, each wrapped in the configured retry policy.

mod client;
mod manager;
pub mod model;

use std::future::Future;
use std::sync::Arc;

use octochat_shared::Result;

pub use client::LexModelClient;
pub use manager::{BatchOutcome, BotManager};
pub use model::{BotDefinition, FulfillmentActivity, IntentDefinition, IntentRef};

/// The conversational platform's model-building API.
///
/// Implementations must report a missing resource as
/// [`OctochatError::NotFound`](octochat_shared::OctochatError::NotFound) so
/// teardown can treat it as already done.
pub trait BotPlatform: Send + Sync {
    /// Create or replace the `$LATEST` draft of an intent.
    fn put_intent(&self, intent: &IntentDefinition) -> impl Future<Output = Result<()>> + Send;

    /// Publish a numbered version of an intent. Returns the version.
    fn create_intent_version(&self, name: &str) -> impl Future<Output = Result<String>> + Send;

    /// Create or replace the `$LATEST` draft of a bot.
    fn put_bot(&self, bot: &BotDefinition) -> impl Future<Output = Result<()>> + Send;

    /// Publish a numbered version of a bot. Returns the version.
    fn create_bot_version(&self, name: &str) -> impl Future<Output = Result<String>> + Send;

    /// Point `alias` at `bot_version`.
    fn put_bot_alias(
        &self,
        bot_name: &str,
        alias: &str,
        bot_version: &str,
    ) -> impl Future<Output = Result<()>> + Send;

    fn delete_bot_alias(
        &self,
        bot_name: &str,
        alias: &str,
    ) -> impl Future<Output = Result<()>> + Send;

    fn delete_bot(&self, name: &str) -> impl Future<Output = Result<()>> + Send;

    fn delete_intent(&self, name: &str) -> impl Future<Output = Result<()>> + Send;
}

impl<T: BotPlatform> BotPlatform for Arc<T> {
    fn put_intent(&self, intent: &IntentDefinition) -> impl Future<Output = Result<()>> + Send {
        (**self).put_intent(intent)
    }

    fn create_intent_version(&self, name: &str) -> impl Future<Output = Result<String>> + Send {
        (**self).create_intent_version(name)
    }

    fn put_bot(&self, bot: &BotDefinition) -> impl Future<Output = Result<()>> + Send {
        (**self).put_bot(bot)
    }

    fn create_bot_version(&self, name: &str) -> impl Future<Output = Result<String>> + Send {
        (**self).create_bot_version(name)
    }

    fn put_bot_alias(
        &self,
        bot_name: &str,
        alias: &str,
        bot_version: &str,
    ) -> impl Future<Output = Result<()>> + Send {
        (**self).put_bot_alias(bot_name, alias, bot_version)
    }

    fn delete_bot_alias(
        &self,
        bot_name: &str,
        alias: &str,
    ) -> impl Future<Output = Result<()>> + Send {
        (**self).delete_bot_alias(bot_name, alias)
    }

    fn delete_bot(&self, name: &str) -> impl Future<Output = Result<()>> + Send {
        (**self).delete_bot(name)
    }

    fn delete_intent(&self, name: &str) -> impl Future<Output = Result<()>> + Send {
        (**self).delete_intent(name)
    }
}

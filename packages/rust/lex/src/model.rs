//! Request/response bodies of the model-building API.

use serde::{Deserialize, Serialize};

/// Message format for prompts and statements.
pub const PLAIN_TEXT: &str = "PlainText";

/// Payload version the fulfillment code hook is invoked with.
pub const CODE_HOOK_MESSAGE_VERSION: &str = "1.0";

pub const CLARIFICATION_MESSAGE: &str = "Sorry, can you repeat that?";
pub const CLARIFICATION_MAX_ATTEMPTS: u32 = 3;
pub const ABORT_MESSAGE: &str = "Sorry, I don't think I know how to help you.";
pub const IDLE_SESSION_TTL_SECS: u32 = 123;

// ---------------------------------------------------------------------------
// Intents
// ---------------------------------------------------------------------------

/// Body of a put-intent call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentDefinition {
    pub name: String,
    pub sample_utterances: Vec<String>,
    pub fulfillment_activity: FulfillmentActivity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FulfillmentActivity {
    #[serde(rename = "type")]
    pub kind: FulfillmentKind,
    pub code_hook: CodeHook,
}

impl FulfillmentActivity {
    /// Fulfil through the code hook at `uri`.
    pub fn code_hook(uri: impl Into<String>) -> Self {
        Self {
            kind: FulfillmentKind::CodeHook,
            code_hook: CodeHook {
                uri: uri.into(),
                message_version: CODE_HOOK_MESSAGE_VERSION.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FulfillmentKind {
    CodeHook,
    ReturnIntent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeHook {
    pub uri: String,
    pub message_version: String,
}

/// An intent pinned to a published version, as attached to a bot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentRef {
    pub intent_name: String,
    pub intent_version: String,
}

// ---------------------------------------------------------------------------
// Bots
// ---------------------------------------------------------------------------

/// Body of a put-bot call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotDefinition {
    pub name: String,
    pub intents: Vec<IntentRef>,
    pub clarification_prompt: Prompt,
    pub abort_statement: Statement,
    #[serde(rename = "idleSessionTTLInSeconds")]
    pub idle_session_ttl_in_seconds: u32,
    pub voice_id: String,
    pub locale: String,
    pub child_directed: bool,
}

impl BotDefinition {
    /// A bot with the fixed FAQ prompts attached to `intents`.
    pub fn faq_bot(
        name: impl Into<String>,
        intents: Vec<IntentRef>,
        voice_id: impl Into<String>,
        locale: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            intents,
            clarification_prompt: Prompt {
                messages: vec![Message::plain_text(CLARIFICATION_MESSAGE)],
                max_attempts: CLARIFICATION_MAX_ATTEMPTS,
                response_card: Some("Response card for clarificationPrompt".into()),
            },
            abort_statement: Statement {
                messages: vec![Message::plain_text(ABORT_MESSAGE)],
                response_card: Some("Response card for abortStatement".into()),
            },
            idle_session_ttl_in_seconds: IDLE_SESSION_TTL_SECS,
            voice_id: voice_id.into(),
            locale: locale.into(),
            child_directed: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prompt {
    pub messages: Vec<Message>,
    pub max_attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_card: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statement {
    pub messages: Vec<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_card: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub content_type: String,
    pub content: String,
}

impl Message {
    pub fn plain_text(content: impl Into<String>) -> Self {
        Self {
            content_type: PLAIN_TEXT.to_string(),
            content: content.into(),
        }
    }
}

/// Body of a put-bot-alias call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AliasDefinition {
    pub bot_version: String,
}

/// Response of a create-version call.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VersionCreated {
    pub version: String,
}

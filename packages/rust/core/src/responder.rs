//! Runtime responder: answers a recognized intent from the bot's response table.
//!
//! The platform invokes the fulfillment code hook with the bot and the
//! recognized intent; the reply closes the dialog with the stored answer.

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use octochat_lex::model::Message;
use octochat_shared::response_table_name;
use octochat_storage::{ResponseStore, ResponseTables};

/// Reply used when no answer could be read.
pub const LOOKUP_FAILED: &str = "Sorry, look up failed.";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Code-hook input. Fields the responder does not use are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationEvent {
    pub bot: NamedRef,
    pub current_intent: NamedRef,
}

impl ConversationEvent {
    pub fn new(bot_name: impl Into<String>, intent_name: impl Into<String>) -> Self {
        Self {
            bot: NamedRef {
                name: bot_name.into(),
            },
            current_intent: NamedRef {
                name: intent_name.into(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedRef {
    pub name: String,
}

/// Code-hook output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationResponse {
    pub dialog_action: DialogAction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogAction {
    #[serde(rename = "type")]
    pub kind: DialogActionKind,
    pub fulfillment_state: FulfillmentState,
    pub message: Message,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DialogActionKind {
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FulfillmentState {
    Fulfilled,
    Failed,
}

impl ConversationResponse {
    /// Close the dialog as fulfilled with a plain-text answer.
    pub fn close(content: impl Into<String>) -> Self {
        Self {
            dialog_action: DialogAction {
                kind: DialogActionKind::Close,
                fulfillment_state: FulfillmentState::Fulfilled,
                message: Message::plain_text(content),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Responder
// ---------------------------------------------------------------------------

/// Stateless lookup of `{bot}_intents` / `(intent, $LATEST)`.
pub struct Responder<T> {
    responses: ResponseStore<T>,
}

impl<T: ResponseTables> Responder<T> {
    pub fn new(tables: T) -> Self {
        Self {
            responses: ResponseStore::reader(tables),
        }
    }

    /// Answer the event. Misses and read failures produce [`LOOKUP_FAILED`].
    #[instrument(skip_all, fields(bot = %event.bot.name, intent = %event.current_intent.name))]
    pub async fn respond(&self, event: &ConversationEvent) -> ConversationResponse {
        let table = response_table_name(&event.bot.name);
        match self
            .responses
            .lookup(&table, &event.current_intent.name)
            .await
        {
            Some(answer) => {
                info!("answered from response table");
                ConversationResponse::close(answer)
            }
            None => ConversationResponse::close(LOOKUP_FAILED),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::testing::{NeverReadyTables, temp_storage};

    #[test]
    fn event_parses_platform_payload() {
        let event: ConversationEvent = serde_json::from_value(json!({
            "messageVersion": "1.0",
            "invocationSource": "FulfillmentCodeHook",
            "userId": "user-1",
            "bot": {"name": "Examplecomfa", "alias": "DEV", "version": "1"},
            "currentIntent": {"name": "Examplecomfa_X", "slots": {}, "confirmationStatus": "None"},
            "inputTranscript": "What is X"
        }))
        .unwrap();
        assert_eq!(event, ConversationEvent::new("Examplecomfa", "Examplecomfa_X"));
    }

    #[test]
    fn close_response_wire_shape() {
        assert_eq!(
            serde_json::to_value(ConversationResponse::close("X is...")).unwrap(),
            json!({
                "dialogAction": {
                    "type": "Close",
                    "fulfillmentState": "Fulfilled",
                    "message": {"contentType": "PlainText", "content": "X is..."}
                }
            })
        );
    }

    #[tokio::test]
    async fn stored_answer_is_returned() {
        use octochat_shared::ResponseEntry;

        let storage = temp_storage().await;
        storage.create_table("Examplecomfa_intents").await.unwrap();
        storage
            .batch_write(
                "Examplecomfa_intents",
                &[ResponseEntry {
                    intent: "Examplecomfa_X".into(),
                    version: "$LATEST".into(),
                    response: "X is...".into(),
                }],
            )
            .await
            .unwrap();

        let responder = Responder::new(storage);
        let reply = responder
            .respond(&ConversationEvent::new("Examplecomfa", "Examplecomfa_X"))
            .await;
        assert_eq!(reply, ConversationResponse::close("X is..."));
    }

    #[tokio::test]
    async fn missing_answer_falls_back() {
        let responder = Responder::new(NeverReadyTables);
        let reply = responder
            .respond(&ConversationEvent::new("Unknown", "Unknown_Q"))
            .await;
        assert_eq!(reply.dialog_action.message.content, LOOKUP_FAILED);
        assert_eq!(
            reply.dialog_action.fulfillment_state,
            FulfillmentState::Fulfilled
        );
    }
}

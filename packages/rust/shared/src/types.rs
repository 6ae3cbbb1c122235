//! Core domain types for octochat bots.

use serde::{Deserialize, Serialize};

/// Version key stored alongside every response entry.
pub const RESPONSE_VERSION: &str = "$LATEST";

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// Lifecycle stage of a bot, persisted by the status tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    /// No record exists for the bot.
    Dne,
    Extracting,
    Storing,
    Building,
    Publishing,
    Ready,
    Deleting,
}

impl Stage {
    /// Wire representation stored in the status record.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dne => "DNE",
            Self::Extracting => "EXTRACTING",
            Self::Storing => "STORING",
            Self::Building => "BUILDING",
            Self::Publishing => "PUBLISHING",
            Self::Ready => "READY",
            Self::Deleting => "DELETING",
        }
    }

    /// The next stage on the forward build path, if any.
    pub fn next(&self) -> Option<Stage> {
        match self {
            Self::Dne => Some(Self::Extracting),
            Self::Extracting => Some(Self::Storing),
            Self::Storing => Some(Self::Building),
            Self::Building => Some(Self::Publishing),
            Self::Publishing => Some(Self::Ready),
            Self::Ready | Self::Deleting => None,
        }
    }

    /// Whether moving from `self` to `to` is a legal lifecycle transition.
    ///
    /// Forward moves go one step at a time; any stage may enter `Deleting`,
    /// and `Deleting` only ever ends in `Dne` (record removal).
    pub fn can_transition_to(&self, to: Stage) -> bool {
        match to {
            Self::Deleting => true,
            Self::Dne => *self == Self::Deleting,
            _ => self.next() == Some(to),
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Stage {
    type Err = crate::OctochatError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "DNE" => Ok(Self::Dne),
            "EXTRACTING" => Ok(Self::Extracting),
            "STORING" => Ok(Self::Storing),
            "BUILDING" => Ok(Self::Building),
            "PUBLISHING" => Ok(Self::Publishing),
            "READY" => Ok(Self::Ready),
            "DELETING" => Ok(Self::Deleting),
            other => Err(crate::OctochatError::parse(format!(
                "unknown bot stage '{other}'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// The per-bot status row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotRecord {
    /// Derived bot name (primary key).
    pub name: String,
    /// Current lifecycle stage.
    pub stage: Stage,
    /// The FAQ page the bot was built from.
    pub faq_url: String,
}

/// One question/answer unit extracted from a knowledge base.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
    /// Letters-only name, at most 65 characters.
    pub name: String,
    /// Phrases that trigger the intent.
    pub sample_utterances: Vec<String>,
    /// Canned answer returned at conversation time.
    pub response: String,
}

/// A row in a bot's response table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseEntry {
    /// Platform intent name (`{bot}_{intent}`).
    pub intent: String,
    pub version: String,
    pub response: String,
}

impl ResponseEntry {
    /// Build the entry for `intent` as registered under `bot_name`.
    pub fn for_intent(bot_name: &str, intent: &Intent) -> Self {
        Self {
            intent: crate::naming::platform_intent_name(bot_name, &intent.name),
            version: RESPONSE_VERSION.to_string(),
            response: intent.response.clone(),
        }
    }
}

/// Lifecycle status of a response table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TableStatus {
    Creating,
    Active,
    Deleting,
}

/// An item that failed inside a batch which was allowed to continue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemFailure {
    /// Name of the item (usually a platform intent name).
    pub item: String,
    /// Rendered error.
    pub error: String,
}

impl ItemFailure {
    pub fn new(item: impl Into<String>, error: impl std::fmt::Display) -> Self {
        Self {
            item: item.into(),
            error: error.to_string(),
        }
    }
}

//! Shared types, error model, configuration, and naming for octochat.
//!
//! This crate is the foundation depended on by all other octochat crates.
//! It provides:
//! - [`OctochatError`], the unified error type
//! - Domain types ([`Stage`], [`BotRecord`], [`Intent`], [`ResponseEntry`])
//! - Bot/table name derivation ([`derive_bot_name`])
//! - The bounded [`RetryPolicy`] used around every eventually-consistent call
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod naming;
pub mod retry;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, PlatformConfig, QnaMakerConfig, RetryConfig, RetrySettings, StoreConfig,
    config_dir, config_file_path, init_config, load_config, load_config_from, platform_auth_token,
    validate_api_key,
};
pub use error::{OctochatError, Result};
pub use naming::{derive_bot_name, platform_intent_name, response_table_name};
pub use retry::{RetryPolicy, Verdict};
pub use types::{
    BotRecord, Intent, ItemFailure, RESPONSE_VERSION, ResponseEntry, Stage, TableStatus,
};

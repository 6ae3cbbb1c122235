//! Core orchestration for octochat.
//!
//! This crate ties together knowledge extraction, the response store, the
//! status tracker, and bot platform provisioning into the bot lifecycle
//! ([`pipeline`]), and answers conversations at runtime ([`responder`]).

pub mod pipeline;
pub mod responder;

#[cfg(test)]
mod testing;

pub use pipeline::{
    BuildDetails, BuildOutcome, BuildReport, Pipeline, ProgressReporter, SilentProgress,
    StatusReport, TeardownReport,
};
pub use responder::{ConversationEvent, ConversationResponse, LOOKUP_FAILED, Responder};

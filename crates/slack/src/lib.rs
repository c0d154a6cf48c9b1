//! Slack channel actions.
//!
//! Receives Events API callbacks and interactive button payloads, converts
//! them to conversation input, converts conversation output back to Slack
//! messages, and delivers those messages through `chat.postMessage`, one at a
//! time when a reply has several parts.

pub mod config;
pub mod multiple_post;
pub mod normalize;
pub mod post;
pub mod receive;

pub use {
    config::SlackAccountConfig,
    multiple_post::{SlackDispatchResult, SlackShaper, multiple_post},
    normalize::{conversation_to_slack, slack_to_conversation},
    post::SlackPoster,
    receive::{Receipt, receive},
};

/// Provider label carried in `raw_input_data`.
pub const PROVIDER: &str = "slack";

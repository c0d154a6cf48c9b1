//! Facebook Messenger channel actions.
//!
//! Handles the webhook subscription handshake and signed page callbacks,
//! converts messaging events to conversation input and conversation output
//! to Send API messages, and delivers multi-part replies in order, including
//! typing indicators.

pub mod config;
pub mod multiple_post;
pub mod normalize;
pub mod post;
pub mod receive;

pub use {
    config::FacebookAccountConfig,
    multiple_post::{FacebookDispatchResult, FacebookShaper, TaggedOutcome, multiple_post},
    normalize::{conversation_to_facebook, facebook_to_conversation},
    post::FacebookPoster,
    receive::{Receipt, receive, verify_signature},
};

/// Provider label carried in `raw_input_data`.
pub const PROVIDER: &str = "facebook";

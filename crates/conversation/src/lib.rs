//! Conversation service calls and the per-user context store.
//!
//! The client sends normalized channel input to the message endpoint of a
//! workspace. The context store keeps the returned dialog context between
//! turns, one document per `cloudant_context_key`.

pub mod client;
pub mod context;
pub mod error;

pub use {
    client::ConversationClient,
    context::{ContextStore, StoredContext, attach_context, persist_context},
    error::{Error, Result},
};

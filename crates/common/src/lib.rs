//! Shared types, error definitions, and utilities used across all relay crates.

pub mod error;
pub mod naming;
pub mod params;
pub mod status;

pub use {
    error::{Error, FromMessage, Result},
    naming::{ActionName, post_sequence_target},
    status::Status,
};

/// Parameters handed to an action: a flat JSON object.
pub type Params = serde_json::Map<String, serde_json::Value>;

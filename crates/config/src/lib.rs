//! Configuration loading, env substitution, and the typed config schema.
//!
//! Config files: `relay.toml`, `relay.yaml`, or `relay.json`
//! Searched in `./` then `~/.config/relay/`.
//!
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;

pub use {
    error::{Error, Result},
    loader::{config_dir, discover_and_load, load_config},
    schema::{
        ChannelsConfig, CloudantConfig, ConversationConfig, DeployConfig, HostConfig, RelayConfig,
    },
};

//! Config schema types (deployment, host, channels, conversation, database).

use {
    relay_common::ActionName,
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

use crate::error::{Error, Result};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub deploy: DeployConfig,
    pub host: HostConfig,
    pub channels: ChannelsConfig,
    pub conversation: ConversationConfig,
    pub cloudant: CloudantConfig,
}

/// Identifies which tenant deployment the actions run as.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    /// Explicit deployment name. Wins over `action_name` when both are set.
    pub name: Option<String>,

    /// Fully qualified name of the invoking action, e.g.
    /// `/org_space/acme_slack/multiple_post`.
    pub action_name: Option<String>,
}

impl DeployConfig {
    /// Resolve the deployment name from the explicit value or the action name.
    pub fn resolve_name(&self) -> Result<String> {
        if let Some(name) = self.name.as_deref().filter(|n| !n.is_empty()) {
            return Ok(name.to_string());
        }
        let action = self
            .action_name
            .as_deref()
            .ok_or_else(|| Error::message("deploy.name or deploy.action_name is required"))?;
        let parsed = ActionName::parse(action)?;
        Ok(parsed.deploy_name()?.to_string())
    }
}

/// Orchestration host that runs the downstream post-sequence action.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Base URL of the host's REST API.
    pub api_host: String,

    /// Namespace the deployment lives in. `_` is the caller's default namespace.
    pub namespace: String,

    /// `user:password` API key.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_option_secret"
    )]
    pub api_key: Option<Secret<String>>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            api_host: "https://openwhisk.ng.bluemix.net".into(),
            namespace: "_".into(),
            api_key: None,
        }
    }
}

impl std::fmt::Debug for HostConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostConfig")
            .field("api_host", &self.api_host)
            .field("namespace", &self.namespace)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Channel configuration. Each channel crate parses its own section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelsConfig {
    pub slack: Option<serde_json::Value>,
    pub facebook: Option<serde_json::Value>,
}

/// Conversation service credentials.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationConfig {
    pub url: String,
    pub username: String,
    #[serde(serialize_with = "serialize_secret")]
    pub password: Secret<String>,
    pub workspace_id: String,
    /// API version date sent as the `version` query parameter.
    pub version: String,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            url: "https://gateway.watsonplatform.net/conversation/api".into(),
            username: String::new(),
            password: Secret::new(String::new()),
            workspace_id: String::new(),
            version: "2017-05-26".into(),
        }
    }
}

impl std::fmt::Debug for ConversationConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("workspace_id", &self.workspace_id)
            .field("version", &self.version)
            .finish()
    }
}

/// Per-tenant document database holding conversation contexts.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudantConfig {
    pub url: String,
    pub username: String,
    #[serde(serialize_with = "serialize_secret")]
    pub password: Secret<String>,
    /// Database name. Defaults to `{deploy}_context` when empty.
    pub db_name: String,
    /// Total attempts made while the service answers 503.
    pub max_attempts: u32,
    /// Fixed delay between 503 retries.
    pub retry_delay_ms: u64,
}

impl CloudantConfig {
    /// Database name, falling back to one derived from the deployment.
    #[must_use]
    pub fn database_for(&self, deploy_name: &str) -> String {
        if self.db_name.is_empty() {
            format!("{deploy_name}_context")
        } else {
            self.db_name.clone()
        }
    }
}

impl Default for CloudantConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            username: String::new(),
            password: Secret::new(String::new()),
            db_name: String::new(),
            max_attempts: 10,
            retry_delay_ms: 1000,
        }
    }
}

impl std::fmt::Debug for CloudantConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudantConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("db_name", &self.db_name)
            .field("max_attempts", &self.max_attempts)
            .field("retry_delay_ms", &self.retry_delay_ms)
            .finish()
    }
}

// ── Serde helpers for Secret<String> ────────────────────────────────────────

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

fn serialize_option_secret<S: serde::Serializer>(
    secret: &Option<Secret<String>>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match secret {
        Some(s) => serializer.serialize_some(s.expose_secret()),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn explicit_deploy_name_wins() {
        let deploy = DeployConfig {
            name: Some("tenant".into()),
            action_name: Some("/ns/other_slack/post".into()),
        };
        assert_eq!(deploy.resolve_name().unwrap(), "tenant");
    }

    #[test]
    fn deploy_name_derived_from_action() {
        let deploy = DeployConfig {
            name: None,
            action_name: Some("/org_space/acme_slack/multiple_post".into()),
        };
        assert_eq!(deploy.resolve_name().unwrap(), "acme");
    }

    #[test]
    fn missing_deploy_name_is_an_error() {
        assert!(DeployConfig::default().resolve_name().is_err());
    }

    #[test]
    fn database_name_falls_back_to_deploy() {
        let cfg = CloudantConfig::default();
        assert_eq!(cfg.database_for("acme"), "acme_context");
        let cfg = CloudantConfig {
            db_name: "contexts".into(),
            ..CloudantConfig::default()
        };
        assert_eq!(cfg.database_for("acme"), "contexts");
    }

    #[test]
    fn debug_redacts_secrets() {
        let cfg = ConversationConfig {
            password: Secret::new("hunter2".into()),
            ..ConversationConfig::default()
        };
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("[REDACTED]"));
    }
}

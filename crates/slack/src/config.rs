use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Configuration for a single Slack app installation.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SlackAccountConfig {
    /// Base URL of the Slack Web API.
    pub api_url: String,

    /// Bot user OAuth token (`xoxb-...`).
    #[serde(serialize_with = "serialize_secret")]
    pub bot_access_token: Secret<String>,

    /// Legacy verification token sent with every Events API callback.
    /// Callbacks are not checked when unset.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_option_secret"
    )]
    pub verification_token: Option<Secret<String>>,

    /// The bot's own user ID; messages from it are ignored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bot_user_id: Option<String>,
}

impl std::fmt::Debug for SlackAccountConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackAccountConfig")
            .field("api_url", &self.api_url)
            .field("bot_access_token", &"[REDACTED]")
            .field(
                "verification_token",
                &self.verification_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("bot_user_id", &self.bot_user_id)
            .finish()
    }
}

impl Default for SlackAccountConfig {
    fn default() -> Self {
        Self {
            api_url: "https://slack.com/api".into(),
            bot_access_token: Secret::new(String::new()),
            verification_token: None,
            bot_user_id: None,
        }
    }
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

fn serialize_option_secret<S: serde::Serializer>(
    secret: &Option<Secret<String>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match secret {
        Some(s) => serializer.serialize_some(s.expose_secret()),
        None => serializer.serialize_none(),
    }
}
